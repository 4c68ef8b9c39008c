//! Chain-facing data types (`spec.md` §3, §6).

use alloy::primitives::{Address, U256};

use super::error::ChainError;

/// A request as read back from `getRequestInfo` (`spec.md` §3).
///
/// `platform` and `model` are already trimmed at the first NUL byte per the
/// `bytes32 → UTF-8` wire rule in §6; empty means "take from config".
#[derive(Debug, Clone)]
pub struct Request {
    pub platform: String,
    pub model: String,
    /// Lowercase hex SHA-256 digest, as looked up in the content store.
    pub prompt_hash: String,
    pub input: String,
    pub redundancy: u8,
    pub return_content_within_result_tag: bool,
    pub store_result_offchain: bool,
    pub caller: Address,
    pub callback: String,
    pub args: Vec<u8>,
}

/// The result of `checkSubmission(requestId, self)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Ok,
    RequestNotFound,
    Submitted,
    NoConsensus,
}

impl SubmissionStatus {
    pub fn parse(raw: &str) -> Result<Self, ChainError> {
        match raw {
            "OK" => Ok(Self::Ok),
            "request not found" => Ok(Self::RequestNotFound),
            "submitted" => Ok(Self::Submitted),
            "no consensus" => Ok(Self::NoConsensus),
            other => Err(ChainError::UnknownSubmissionStatus(other.to_string())),
        }
    }
}

/// One decoded log, tagged with the `(block, logIndex)` coordinates the
/// ingester's cursor is keyed on (`spec.md` §3, §4.E).
#[derive(Debug, Clone)]
pub struct DecodedLog {
    pub block: u64,
    pub log_index: u64,
    pub event: ChainEvent,
}

/// The events the node decodes; everything else on the contract is ignored
/// (`spec.md` §9 — "narrowed here: the ingester decodes by explicit event
/// signatures... and silently ignores others").
#[derive(Debug, Clone)]
pub enum ChainEvent {
    NewRequest { request_id: U256, redundancy: u8 },
    Processed { request_id: U256, success: bool },
    ResultSubmitted { request_id: U256, node: Address },
    NodeAdded { node: Address },
    NodeRemoved { node: Address },
}

/// Interpret a `bytes32` field as UTF-8, trimmed at the first NUL byte
/// (`spec.md` §6 — "decoded as `bytes32 → UTF-8` up to the first zero byte").
pub fn bytes32_to_trimmed_string(raw: &[u8; 32]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(32);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes32_trims_at_first_nul() {
        let mut raw = [0u8; 32];
        raw[..6].copy_from_slice(b"openai");
        assert_eq!(bytes32_to_trimmed_string(&raw), "openai");
    }

    #[test]
    fn bytes32_empty_is_empty_string() {
        let raw = [0u8; 32];
        assert_eq!(bytes32_to_trimmed_string(&raw), "");
    }

    #[test]
    fn submission_status_parses_known_strings() {
        assert_eq!(SubmissionStatus::parse("OK").unwrap(), SubmissionStatus::Ok);
        assert_eq!(
            SubmissionStatus::parse("request not found").unwrap(),
            SubmissionStatus::RequestNotFound
        );
        assert_eq!(SubmissionStatus::parse("submitted").unwrap(), SubmissionStatus::Submitted);
        assert_eq!(SubmissionStatus::parse("no consensus").unwrap(), SubmissionStatus::NoConsensus);
    }

    #[test]
    fn submission_status_rejects_unknown_strings() {
        assert!(SubmissionStatus::parse("maybe").is_err());
    }
}
