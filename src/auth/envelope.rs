// ABOUTME: Decrypts the RSA-OAEP + AES-256-GCM hybrid envelope clients POST to /api/v1/auth
// ABOUTME: sessionKey must be exactly 32 bytes, iv 12 bytes, authTag 16 bytes (spec §4.6)

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit};
use base64::Engine;
use rsa::{Oaep, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::auth::keys::KeyPair;
use crate::constants::auth_limits::{GCM_IV_LEN, GCM_TAG_LEN, SESSION_KEY_LEN};
use crate::errors::AppError;

/// Wire format of an encrypted credential envelope (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "keyId")]
    pub key_id: String,
    #[serde(rename = "encryptedSessionKey")]
    pub encrypted_session_key: String,
    pub iv: String,
    #[serde(rename = "authTag")]
    pub auth_tag: String,
    pub ciphertext: String,
}

/// Decoded request half of the envelope plaintext.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthRequest {
    pub host: String,
    pub duration: Option<i64>,
    pub poolstart: Option<u32>,
    pub poolmax: Option<u32>,
}

/// Decoded credentials half of the envelope plaintext.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopePayload {
    pub credentials: Credentials,
    pub request: AuthRequest,
}

/// Decrypt `envelope` against `keypair`, returning the parsed plaintext
/// request. Every failure mode here is client-caused and maps to
/// [`AppError::validation`] (spec §4.6 step 2-4 failure semantics).
///
/// # Errors
/// Returns [`AppError::validation`] for a `keyId` mismatch, malformed
/// base64, a session key that does not decrypt to exactly
/// [`SESSION_KEY_LEN`] bytes, an `iv`/`authTag` of the wrong length, AES-GCM
/// authentication failure, or invalid JSON in the decrypted plaintext.
pub fn decrypt(envelope: &Envelope, keypair: &KeyPair) -> Result<EnvelopePayload, AppError> {
    if envelope.key_id != keypair.key_id {
        return Err(AppError::validation(format!("unknown keyId '{}'", envelope.key_id)));
    }

    let session_key = decrypt_session_key(&envelope.encrypted_session_key, &keypair.private_key)?;
    if session_key.len() != SESSION_KEY_LEN {
        return Err(AppError::validation(format!(
            "decrypted session key must be {SESSION_KEY_LEN} bytes, got {}",
            session_key.len()
        )));
    }

    let iv = decode_b64(&envelope.iv, "iv")?;
    if iv.len() != GCM_IV_LEN {
        return Err(AppError::validation(format!("iv must be {GCM_IV_LEN} bytes, got {}", iv.len())));
    }
    let auth_tag = decode_b64(&envelope.auth_tag, "authTag")?;
    if auth_tag.len() != GCM_TAG_LEN {
        return Err(AppError::validation(format!(
            "authTag must be {GCM_TAG_LEN} bytes, got {}",
            auth_tag.len()
        )));
    }
    let ciphertext = decode_b64(&envelope.ciphertext, "ciphertext")?;

    let mut combined = ciphertext;
    combined.extend_from_slice(&auth_tag);

    let cipher = Aes256Gcm::new(GenericArray::from_slice(&session_key));
    let nonce = GenericArray::from_slice(&iv);
    let plaintext = cipher
        .decrypt(nonce, combined.as_ref())
        .map_err(|_| AppError::validation("envelope ciphertext failed authentication"))?;

    serde_json::from_slice(&plaintext)
        .map_err(|e| AppError::validation(format!("envelope plaintext is not valid JSON: {e}")))
}

fn decrypt_session_key(encoded: &str, private_key: &RsaPrivateKey) -> Result<Vec<u8>, AppError> {
    let encrypted = decode_b64(encoded, "encryptedSessionKey")?;
    let padding = Oaep::new::<Sha256>();
    private_key
        .decrypt(padding, &encrypted)
        .map_err(|_| AppError::validation("failed to RSA-decrypt session key"))
}

fn decode_b64(value: &str, field: &str) -> Result<Vec<u8>, AppError> {
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| AppError::validation(format!("field '{field}' is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn test_keypair() -> KeyPair {
        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = rsa::RsaPublicKey::from(&private_key);
        KeyPair {
            key_id: "test-key".to_owned(),
            private_key,
            public_key,
        }
    }

    fn build_envelope(keypair: &KeyPair, plaintext: &[u8]) -> Envelope {
        let mut session_key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut session_key);
        let mut iv = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut iv);

        let cipher = Aes256Gcm::new(GenericArray::from_slice(&session_key));
        let nonce = GenericArray::from_slice(&iv);
        let sealed = cipher.encrypt(nonce, plaintext).unwrap();
        let (ciphertext, tag) = sealed.split_at(sealed.len() - GCM_TAG_LEN);

        let padding = Oaep::new::<Sha256>();
        let encrypted_session_key = keypair
            .public_key
            .encrypt(&mut rand::rngs::OsRng, padding, &session_key)
            .unwrap();

        let b64 = base64::engine::general_purpose::STANDARD;
        Envelope {
            key_id: keypair.key_id.clone(),
            encrypted_session_key: b64.encode(encrypted_session_key),
            iv: b64.encode(iv),
            auth_tag: b64.encode(tag),
            ciphertext: b64.encode(ciphertext),
        }
    }

    #[test]
    fn round_trips_a_valid_envelope() {
        let keypair = test_keypair();
        let plaintext = br#"{"credentials":{"username":"u","password":"p"},"request":{"host":"h1","duration":3600,"poolstart":2,"poolmax":5}}"#;
        let envelope = build_envelope(&keypair, plaintext);

        let payload = decrypt(&envelope, &keypair).unwrap();
        assert_eq!(payload.credentials.username, "u");
        assert_eq!(payload.request.host, "h1");
        assert_eq!(payload.request.duration, Some(3600));
    }

    #[test]
    fn rejects_unknown_key_id() {
        let keypair = test_keypair();
        let mut envelope = build_envelope(&keypair, b"{}");
        envelope.key_id = "other-key".to_owned();
        assert!(decrypt(&envelope, &keypair).is_err());
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let keypair = test_keypair();
        let mut envelope = build_envelope(
            &keypair,
            br#"{"credentials":{"username":"u","password":"p"},"request":{"host":"h1"}}"#,
        );
        let mut raw = base64::engine::general_purpose::STANDARD.decode(&envelope.ciphertext).unwrap();
        if let Some(byte) = raw.first_mut() {
            *byte ^= 0xFF;
        }
        envelope.ciphertext = base64::engine::general_purpose::STANDARD.encode(raw);
        assert!(decrypt(&envelope, &keypair).is_err());
    }
}
