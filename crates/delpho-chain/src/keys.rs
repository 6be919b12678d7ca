//! Signing key loading.
//!
//! Security notes:
//! - Hex key material is decoded into zeroized buffers.
//! - Keys are loaded once at startup; no runtime key rotation.
//! - Never log private key material.

use std::path::PathBuf;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use thiserror::Error;
use zeroize::Zeroizing;

/// Source of the private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

impl KeySource {
    /// Where the key comes from, safe to log.
    pub fn describe(&self) -> String {
        match self {
            Self::EnvVar { var_name } => format!("env:{var_name}"),
            Self::File { path } => format!("file:{}", path.display()),
        }
    }
}

/// Key loading errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: Address, actual: Address },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyError {
    /// No key at the configured source: unset variable or absent file.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::EnvVarNotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let trimmed = hex_str.trim().trim_start_matches("0x");
    Ok(Zeroizing::new(hex::decode(trimmed)?))
}

/// Load the signing key from `source`.
///
/// When `expected_address` is given, the derived address must match it.
pub fn load_signer(
    source: &KeySource,
    expected_address: Option<Address>,
) -> Result<PrivateKeySigner, KeyError> {
    let secret_bytes = match source {
        KeySource::EnvVar { var_name } => {
            let hex = Zeroizing::new(
                std::env::var(var_name).map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
            );
            parse_hex_key(&hex)?
        }
        KeySource::File { path } => {
            let content = Zeroizing::new(std::fs::read_to_string(path)?);
            parse_hex_key(&content)?
        }
    };

    signer_from_bytes(&secret_bytes, expected_address)
}

/// Build a signer from raw key bytes.
pub fn signer_from_bytes(
    secret_bytes: &[u8],
    expected_address: Option<Address>,
) -> Result<PrivateKeySigner, KeyError> {
    let signer = PrivateKeySigner::from_slice(secret_bytes)
        .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

    if let Some(expected) = expected_address {
        if signer.address() != expected {
            return Err(KeyError::AddressMismatch {
                expected,
                actual: signer.address(),
            });
        }
    }

    Ok(signer)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test key (anvil account #0), never funded on mainnet.
    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_signer_from_bytes_checks_address() {
        let bytes = hex::decode(TEST_KEY).unwrap();
        let expected: Address = TEST_ADDRESS.parse().unwrap();

        let signer = signer_from_bytes(&bytes, Some(expected)).unwrap();
        assert_eq!(signer.address(), expected);

        let wrong = Address::repeat_byte(0x11);
        assert!(matches!(
            signer_from_bytes(&bytes, Some(wrong)),
            Err(KeyError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_env_var() {
        let source = KeySource::EnvVar {
            var_name: "DELPHO_TEST_KEY_THAT_DOES_NOT_EXIST".to_string(),
        };
        assert!(matches!(
            load_signer(&source, None),
            Err(KeyError::EnvVarNotFound(_))
        ));
        assert!(load_signer(&source, None).unwrap_err().is_missing());
        assert_eq!(source.describe(), "env:DELPHO_TEST_KEY_THAT_DOES_NOT_EXIST");
    }

    #[test]
    fn test_load_from_file_with_prefix_and_newline() {
        let path = std::env::temp_dir().join(format!("delpho-key-{}", std::process::id()));
        std::fs::write(&path, format!("0x{TEST_KEY}\n")).unwrap();

        let signer = load_signer(&KeySource::File { path: path.clone() }, None).unwrap();
        assert_eq!(signer.address(), TEST_ADDRESS.parse::<Address>().unwrap());

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_key_file() {
        let path = std::env::temp_dir().join("delpho-key-that-does-not-exist");
        let err = load_signer(&KeySource::File { path }, None).unwrap_err();
        assert!(matches!(err, KeyError::Io(_)));
        assert!(err.is_missing());
    }

    #[test]
    fn test_invalid_hex() {
        let err = parse_hex_key("0xzz").unwrap_err();
        assert!(matches!(err, KeyError::HexDecode(_)));
        assert!(!err.is_missing());
    }
}
