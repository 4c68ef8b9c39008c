//! Crash-safe log ingestion: historical catch-up, then a live subscription,
//! plus a periodic heartbeat that bounds replay after idle periods
//! (`spec.md` §4.E).

mod cursor;
mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::chain::{ChainClient, ChainEvent};

pub use cursor::Cursor;
pub use error::IngestError;

/// `spec.md` §4.E — "successive half-open ranges of at most 10 000 blocks".
const MAX_RANGE_SIZE: u64 = 10_000;
/// `spec.md` §4.E — "Every 180 s".
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(180);

pub struct Ingester {
    chain: Arc<ChainClient>,
    cursor_path: PathBuf,
    cursor: Mutex<Cursor>,
}

impl Ingester {
    pub fn new(chain: Arc<ChainClient>, config_dir: &std::path::Path) -> Result<Self, IngestError> {
        let cursor_path = cursor::cursor_path(config_dir, chain.contract_address());
        let initial = cursor::read(&cursor_path)?;
        Ok(Self { chain, cursor_path, cursor: Mutex::new(initial) })
    }

    /// Historical replay from the persisted cursor up to the chain head at
    /// the moment this is called. Terminates once caught up.
    pub async fn catch_up(&self, tx: &mpsc::Sender<ChainEvent>) -> Result<(), IngestError> {
        let head = self.chain.current_block().await?;
        let mut from = {
            let cursor = *self.cursor.lock().await;
            if cursor.block == 0 { 1 } else { cursor.block }
        };

        if from > head {
            debug!(from, head, "cursor already past chain head, skipping catch-up");
            return Ok(());
        }

        info!(from, head, "starting catch-up");
        while from <= head {
            let to = (from + MAX_RANGE_SIZE - 1).min(head);
            if let Err(e) = self.scan_range(from, to, tx).await {
                warn!(from, to, error = %e, "catch-up range failed; cursor left unadvanced, continuing with next range");
            }
            from = to + 1;
        }
        info!(head, "catch-up complete");
        Ok(())
    }

    /// Query, filter, and deliver one range, then advance the cursor to
    /// mark the whole range as scanned — even if it contained no new
    /// events, so a crash mid-catch-up doesn't force re-scanning ranges
    /// that are already known to be dry.
    async fn scan_range(&self, from: u64, to: u64, tx: &mpsc::Sender<ChainEvent>) -> Result<(), IngestError> {
        let logs = self.chain.query_logs(from, to).await?;

        for log in logs {
            let mut cursor = self.cursor.lock().await;
            if cursor.is_before(log.block, log.log_index) {
                tx.send(log.event).await.map_err(|_| IngestError::ChannelClosed)?;
                *cursor = Cursor { block: log.block, log_index: log.log_index as i64 };
                cursor::persist(&self.cursor_path, *cursor)?;
            }
        }

        let mut cursor = self.cursor.lock().await;
        let end_of_range = Cursor::at_head(to);
        if *cursor < end_of_range {
            *cursor = end_of_range;
            cursor::persist(&self.cursor_path, *cursor)?;
        }
        Ok(())
    }

    /// Subscribe to live logs and deliver everything strictly past the
    /// cursor, forever. Meant to be spawned as its own task.
    pub async fn run_live(&self, tx: mpsc::Sender<ChainEvent>) -> Result<(), IngestError> {
        let mut stream = self.chain.subscribe_logs().await?;
        while let Some(log) = stream.next().await {
            let mut cursor = self.cursor.lock().await;
            if cursor.is_before(log.block, log.log_index) {
                tx.send(log.event).await.map_err(|_| IngestError::ChannelClosed)?;
                *cursor = Cursor { block: log.block, log_index: log.log_index as i64 };
                cursor::persist(&self.cursor_path, *cursor)?;
            }
        }
        Ok(())
    }

    /// Every 180 s, advance the cursor to the current head if it moved, so
    /// a long idle period doesn't leave a huge range to replay later.
    /// Meant to be spawned as its own task; runs until cancelled.
    pub async fn run_heartbeat(&self) -> Result<(), IngestError> {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            interval.tick().await;
            let head = self.chain.current_block().await?;
            let mut cursor = self.cursor.lock().await;
            if head > cursor.block {
                *cursor = Cursor::at_head(head);
                cursor::persist(&self.cursor_path, *cursor)?;
                debug!(head, "heartbeat advanced cursor");
            }
        }
    }
}
