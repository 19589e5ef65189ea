// ABOUTME: Loads or generates the server's RSA keypair used to unwrap session-key envelopes
// ABOUTME: Read once at startup and held immutably for the process lifetime (spec §5 shared-resource policy)

use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::config::environment::AuthConfig;
use crate::errors::{AppError, AppResult};

const RSA_KEY_SIZE_BITS: usize = 2048;

/// The server's single asymmetric keypair, cached for the process lifetime.
pub struct KeyPair {
    pub key_id: String,
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
}

impl KeyPair {
    /// Load the keypair named in `config` from disk, generating and
    /// persisting a fresh one if neither file exists yet.
    ///
    /// # Errors
    /// Returns [`AppError::config`] when an existing private key file is
    /// unreadable or malformed, or when key generation/PEM encoding fails.
    pub fn load_or_generate(config: &AuthConfig) -> AppResult<Self> {
        let private_path = std::path::Path::new(&config.private_key_path);
        if private_path.exists() {
            return Self::load(config);
        }

        tracing::warn!(
            path = %config.private_key_path.display(),
            "no auth keypair found on disk, generating one for this run"
        );
        Self::generate_and_persist(config)
    }

    fn load(config: &AuthConfig) -> AppResult<Self> {
        let pem = std::fs::read_to_string(&config.private_key_path)
            .map_err(|e| AppError::config(format!("failed to read auth private key: {e}")))?;
        let private_key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .map_err(|e| AppError::config(format!("failed to parse auth private key PEM: {e}")))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(Self {
            key_id: config.key_id.clone(),
            private_key,
            public_key,
        })
    }

    fn generate_and_persist(config: &AuthConfig) -> AppResult<Self> {
        use rand::rngs::OsRng;

        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_SIZE_BITS)
            .map_err(|e| AppError::config(format!("failed to generate auth RSA keypair: {e}")))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_pem = private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| AppError::config(format!("failed to encode private key PEM: {e}")))?;
        let public_pem = public_key
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| AppError::config(format!("failed to encode public key PEM: {e}")))?;

        std::fs::write(&config.private_key_path, private_pem.as_str())?;
        std::fs::write(&config.public_key_path, &public_pem)?;

        Ok(Self {
            key_id: config.key_id.clone(),
            private_key,
            public_key,
        })
    }

    /// PEM encoding of the public half, served at `/api/v1/auth/public-key`.
    ///
    /// # Errors
    /// Returns [`AppError::internal`] if PEM encoding fails, which should
    /// not happen for a key this process itself holds valid.
    pub fn public_key_pem(&self) -> AppResult<String> {
        self.public_key
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| AppError::internal(format!("failed to encode public key: {e}")))
    }
}
