// ABOUTME: Auth issuance HTTP endpoints — public key retrieval and bearer token issuance
// ABOUTME: Accepts either the encrypted envelope or a Basic-auth alternative path (spec §6.1)

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use base64::Engine;
use serde::Serialize;

use crate::auth::envelope::{self, AuthRequest, Credentials, Envelope, EnvelopePayload};
use crate::auth::IssueResponse;
use crate::errors::{AppError, AppResult};
use crate::http::HttpState;

#[derive(Debug, Serialize)]
pub struct PublicKeyResponse {
    #[serde(rename = "keyId")]
    pub key_id: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// `GET /api/v1/auth/public-key` (spec §4.6 "Public key endpoint").
pub async fn public_key(State(state): State<Arc<HttpState>>) -> AppResult<Json<PublicKeyResponse>> {
    let keypair = state
        .keypair
        .as_ref()
        .ok_or_else(|| AppError::not_initialized("authenticated mode is not enabled"))?;

    Ok(Json(PublicKeyResponse {
        key_id: keypair.key_id.clone(),
        public_key: keypair.public_key_pem()?,
    }))
}

/// `POST /api/v1/auth` (spec §4.6 steps 1-10, §6.1).
///
/// Accepts either the RSA/AES-GCM envelope body, or an
/// `Authorization: Basic` header carrying credentials alongside a plain
/// JSON `{host, duration?, poolstart?, poolmax?}` body.
pub async fn issue_token(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<IssueResponse>)> {
    if !state.allow_http && !arrived_over_tls(&headers) {
        return Err(AppError::validation(
            "auth requests must arrive over TLS (set the HTTP allowance flag for development only)",
        ));
    }

    let Some(auth_manager) = state.auth_manager.as_ref() else {
        return Err(AppError::not_initialized("authenticated mode is not enabled"));
    };

    let payload = match basic_auth_credentials(&headers) {
        Some(credentials) => {
            let request: AuthRequest = serde_json::from_slice(&body)
                .map_err(|e| AppError::validation(format!("invalid request body: {e}")))?;
            EnvelopePayload { credentials, request }
        }
        None => {
            let keypair = state
                .keypair
                .as_ref()
                .ok_or_else(|| AppError::not_initialized("authenticated mode is not enabled"))?;
            let body: Envelope = serde_json::from_slice(&body)
                .map_err(|e| AppError::validation(format!("invalid envelope: {e}")))?;
            envelope::decrypt(&body, keypair)?
        }
    };

    let response = auth_manager.issue(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

fn arrived_over_tls(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("https"))
}

fn basic_auth_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some(Credentials {
        username: username.to_owned(),
        password: password.to_owned(),
    })
}
