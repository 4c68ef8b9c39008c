//! Signing key for this node's chain identity (`spec.md` §6 — "the key/wallet
//! store... the node loads or generates one signing key at startup").

use std::fs;
use std::io;
use std::path::Path;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("failed to read key file {0:?}: {1}")]
    Read(std::path::PathBuf, io::Error),
    #[error("failed to write key file {0:?}: {1}")]
    Write(std::path::PathBuf, io::Error),
    #[error("key file {0:?} does not contain a valid private key: {1}")]
    Parse(std::path::PathBuf, String),
}

/// Load the hex-encoded private key at `path`, or generate and persist a
/// new one if the file doesn't exist yet. Written with owner-only
/// permissions where the platform supports it.
pub fn load_or_generate(path: &Path) -> Result<(PrivateKeySigner, Address), WalletError> {
    let signer = match fs::read_to_string(path) {
        Ok(content) => parse_key(path, content.trim())?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let signer = PrivateKeySigner::random();
            persist(path, &signer)?;
            signer
        }
        Err(e) => return Err(WalletError::Read(path.to_path_buf(), e)),
    };

    let address = signer.address();
    Ok((signer, address))
}

fn parse_key(path: &Path, hex_key: &str) -> Result<PrivateKeySigner, WalletError> {
    hex_key
        .parse::<PrivateKeySigner>()
        .map_err(|e| WalletError::Parse(path.to_path_buf(), e.to_string()))
}

fn persist(path: &Path, signer: &PrivateKeySigner) -> Result<(), WalletError> {
    let hex_key = hex::encode(signer.to_bytes());
    fs::write(path, &hex_key).map_err(|e| WalletError::Write(path.to_path_buf(), e))?;
    restrict_permissions(path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), WalletError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| WalletError::Write(path.to_path_buf(), e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), WalletError> {
    Ok(())
}
