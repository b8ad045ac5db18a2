//! RS256 key management for JWT signing and verification

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{info, warn};
use zeroize::Zeroizing;

use qd_shared::config::JwtConfig;

use crate::errors::{DomainError, TokenError};

/// RSA modulus size for generated keys
pub const GENERATED_KEY_BITS: usize = 2048;

/// Where a key pair came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Loaded from PEM files
    Files { private: PathBuf, public: PathBuf },
    /// Parsed from PEM strings held in memory
    Memory,
    /// Generated at startup
    Generated,
}

/// Manager for the RS256 key pair used in JWT operations
///
/// Immutable once built. The token service owns one for the life of the
/// process and only reads from it.
#[derive(Clone)]
pub struct KeyManager {
    /// Private key for signing JWTs
    encoding_key: EncodingKey,
    /// Public key for verifying JWTs
    decoding_key: DecodingKey,
    /// PEM text kept so generated keys can be persisted
    private_key_pem: Zeroizing<String>,
    public_key_pem: String,
    source: KeySource,
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl KeyManager {
    /// Creates a key manager from key file paths
    ///
    /// # Arguments
    ///
    /// * `private_key_path` - Path to the PEM-encoded private key file
    /// * `public_key_path` - Path to the PEM-encoded public key file
    ///
    /// # Returns
    ///
    /// * `Ok(KeyManager)` - Key manager initialized successfully
    /// * `Err(DomainError)` - Failed to read or parse keys
    pub fn from_files<P: AsRef<Path>>(
        private_key_path: P,
        public_key_path: P,
    ) -> Result<Self, DomainError> {
        let private_key_path = private_key_path.as_ref().to_path_buf();
        let public_key_path = public_key_path.as_ref().to_path_buf();

        let private_key_pem = Zeroizing::new(
            fs::read_to_string(&private_key_path)
                .map_err(|e| key_error(format!("Failed to read private key: {}", e.kind())))?,
        );
        let public_key_pem = fs::read_to_string(&public_key_path)
            .map_err(|e| key_error(format!("Failed to read public key: {}", e.kind())))?;

        let mut manager = Self::from_pem_parts(private_key_pem, public_key_pem)?;
        manager.source = KeySource::Files {
            private: private_key_path,
            public: public_key_path,
        };
        Ok(manager)
    }

    /// Creates a key manager from PEM strings (useful for testing or embedded keys)
    ///
    /// # Arguments
    ///
    /// * `private_key_pem` - PEM-encoded private key (PKCS#1 or PKCS#8)
    /// * `public_key_pem` - PEM-encoded public key (SPKI or PKCS#1)
    ///
    /// # Returns
    ///
    /// * `Ok(KeyManager)` - Key manager initialized successfully
    /// * `Err(DomainError)` - Invalid key format
    pub fn from_pem_strings(
        private_key_pem: &str,
        public_key_pem: &str,
    ) -> Result<Self, DomainError> {
        Self::from_pem_parts(
            Zeroizing::new(private_key_pem.to_string()),
            public_key_pem.to_string(),
        )
    }

    /// Generates a fresh 2048-bit key pair
    pub fn generate() -> Result<Self, DomainError> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), GENERATED_KEY_BITS)
            .map_err(|e| key_error(format!("Key generation failed: {}", e)))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_key_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| key_error(format!("Private key encoding failed: {}", e)))?;
        let public_key_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| key_error(format!("Public key encoding failed: {}", e)))?;

        let mut manager = Self::from_pem_parts(private_key_pem, public_key_pem)?;
        manager.source = KeySource::Generated;
        Ok(manager)
    }

    /// Loads the configured key files, falling back to generation
    ///
    /// When both paths are configured the files are tried first. A load
    /// failure is logged and, if `auto_generate_keys` is set, a new pair is
    /// generated; otherwise the error is returned. Generated keys are written
    /// back to the configured paths when `persist_generated_keys` is set. A
    /// failed write is logged and does not fail startup.
    pub fn load_or_generate(config: &JwtConfig) -> Result<Self, DomainError> {
        if let (Some(private), Some(public)) = (&config.private_key_path, &config.public_key_path) {
            match Self::from_files(private, public) {
                Ok(manager) => {
                    info!(private_key = %private.display(), public_key = %public.display(), "Loaded RS256 key pair");
                    return Ok(manager);
                }
                Err(e) if config.auto_generate_keys => {
                    warn!(private_key = %private.display(), error = %e, "Could not load RS256 keys, generating a new pair");
                }
                Err(e) => return Err(e),
            }
        } else if !config.auto_generate_keys {
            return Err(key_error("No key paths configured and key generation is disabled"));
        }

        let manager = Self::generate()?;
        warn!("Using a generated RS256 key pair; tokens will not survive a restart unless persisted");

        if config.persist_generated_keys {
            if let (Some(private), Some(public)) = (&config.private_key_path, &config.public_key_path) {
                match manager.save_to_files(private, public) {
                    Ok(()) => info!(private_key = %private.display(), "Persisted generated RS256 key pair"),
                    Err(e) => warn!(private_key = %private.display(), error = %e, "Failed to persist generated keys"),
                }
            }
        }

        Ok(manager)
    }

    /// Writes the key pair as PEM files
    ///
    /// Parent directories are created as needed. On unix the private key is
    /// written with mode 0600 and the public key with 0644.
    pub fn save_to_files<P: AsRef<Path>>(
        &self,
        private_key_path: P,
        public_key_path: P,
    ) -> Result<(), DomainError> {
        write_key_file(private_key_path.as_ref(), self.private_key_pem.as_str(), 0o600)?;
        write_key_file(public_key_path.as_ref(), &self.public_key_pem, 0o644)?;
        Ok(())
    }

    /// Returns the encoding key for signing JWTs
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Returns the decoding key for verifying JWTs
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// PEM-encoded public key
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }

    fn from_pem_parts(
        private_key_pem: Zeroizing<String>,
        public_key_pem: String,
    ) -> Result<Self, DomainError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| key_error(format!("Invalid private key format: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| key_error(format!("Invalid public key format: {}", e)))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            private_key_pem,
            public_key_pem,
            source: KeySource::Memory,
        })
    }
}

fn key_error(message: impl Into<String>) -> DomainError {
    DomainError::Token(TokenError::KeyUnavailable {
        message: message.into(),
    })
}

fn write_key_file(path: &Path, contents: &str, mode: u32) -> Result<(), DomainError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| key_error(format!("Failed to create key directory: {}", e.kind())))?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options
        .open(path)
        .map_err(|e| key_error(format!("Failed to open key file: {}", e.kind())))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| key_error(format!("Failed to write key file: {}", e.kind())))?;

    // The mode passed to open only applies to newly created files.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| key_error(format!("Failed to set key permissions: {}", e.kind())))?;
    }

    Ok(())
}
