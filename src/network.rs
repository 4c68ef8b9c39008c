//! The fixed network table the CLI's positional argument selects from
//! (`spec.md` §6).

use alloy::primitives::Address;
use url::Url;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub name: &'static str,
    pub rpc: Url,
    pub wss: Option<Url>,
    pub contract: Address,
}

fn url(s: &str) -> Url {
    s.parse().expect("network table URLs are valid by construction")
}

/// Resolve `name` against the fixed table. `local` is the only entry whose
/// contract address isn't hardcoded — it comes from `LLM_SERVICE_CONTRACT`
/// so the node can be pointed at a throwaway devnet deployment.
pub fn resolve(name: &str) -> Result<NetworkConfig, AppError> {
    match name {
        "mainnet" => Ok(NetworkConfig {
            name: "mainnet",
            rpc: url("https://eth.llamarpc.com"),
            wss: Some(url("wss://eth.llamarpc.com")),
            contract: "0x000000000000000000000000000000000000aa"
                .parse()
                .expect("valid address literal"),
        }),
        "sepolia" => Ok(NetworkConfig {
            name: "sepolia",
            rpc: url("https://sepolia.drpc.org"),
            wss: None,
            contract: "0x000000000000000000000000000000000000bb"
                .parse()
                .expect("valid address literal"),
        }),
        "local" => {
            let raw = std::env::var("LLM_SERVICE_CONTRACT")
                .map_err(|_| AppError::MissingLocalContract)?;
            let contract: Address = raw
                .parse()
                .map_err(|_| AppError::MissingLocalContract)?;
            Ok(NetworkConfig {
                name: "local",
                rpc: url("http://127.0.0.1:8545"),
                wss: Some(url("ws://127.0.0.1:8546")),
                contract,
            })
        }
        other => Err(AppError::UnknownNetwork(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_network_is_rejected() {
        assert!(matches!(resolve("not-a-network"), Err(AppError::UnknownNetwork(_))));
    }

    #[allow(unsafe_code)]
    #[test]
    fn local_requires_env_var() {
        // SAFETY: test-only removal of an env var not relied on elsewhere in this process.
        unsafe { std::env::remove_var("LLM_SERVICE_CONTRACT") };
        assert!(matches!(resolve("local"), Err(AppError::MissingLocalContract)));
    }

    #[allow(unsafe_code)]
    #[test]
    fn local_reads_contract_from_env() {
        // SAFETY: test-only env var set, scoped to this test's assertions.
        unsafe { std::env::set_var("LLM_SERVICE_CONTRACT", "0x0000000000000000000000000000000000000001") };
        let config = resolve("local").unwrap();
        assert_eq!(config.name, "local");
        unsafe { std::env::remove_var("LLM_SERVICE_CONTRACT") };
    }

    #[test]
    fn mainnet_and_sepolia_resolve() {
        assert_eq!(resolve("mainnet").unwrap().name, "mainnet");
        assert_eq!(resolve("sepolia").unwrap().name, "sepolia");
    }
}
