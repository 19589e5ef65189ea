// ABOUTME: Auth Session Manager — token issuance/validation/revocation and per-token pool lifecycle
// ABOUTME: Owns all token and AuthPool state exclusively (spec §4.6, §5 shared-resource policy)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use rand::RngCore;

use crate::auth::envelope::{Credentials, EnvelopePayload};
use crate::auth::pool::AuthPool;
use crate::config::environment::AuthConfig;
use crate::constants::auth_limits;
use crate::constants::defaults;
use crate::errors::{AppError, AppResult};

/// A single issued bearer token and the credentials/pool it is bound to.
pub struct SessionRecord {
    pub credentials: Credentials,
    pub host: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub pool: Arc<AuthPool>,
}

/// Response body for a successful `POST /api/v1/auth` (spec §4.6 step 10).
#[derive(Debug, Clone, serde::Serialize)]
pub struct IssueResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

/// Owns every [`SessionRecord`] and its [`AuthPool`]. No other component
/// mutates token or auth-pool state (spec §5).
pub struct AuthSessionManager {
    sessions: DashMap<String, SessionRecord>,
    config: AuthConfig,
    active_count: AtomicUsize,
}

impl AuthSessionManager {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
            active_count: AtomicUsize::new(0),
        }
    }

    /// Issue a bearer token for `payload` (spec §4.6 steps 5-10).
    ///
    /// # Errors
    /// Returns [`AppError::validation`] for an out-of-range request field
    /// or when the concurrency cap is reached, and
    /// [`AppError::internal`] when the per-token pool fails to connect
    /// (the token is not stored in that case).
    pub async fn issue(&self, payload: EnvelopePayload) -> AppResult<IssueResponse> {
        let request = payload.request;

        if request.host.trim().is_empty() {
            return Err(AppError::validation("request.host must not be empty"));
        }
        let duration = request.duration.unwrap_or(defaults::TOKEN_TTL_SECONDS);
        if duration <= 0 || duration > auth_limits::MAX_DURATION_SECONDS {
            return Err(AppError::validation(format!(
                "request.duration must be in (0, {}]",
                auth_limits::MAX_DURATION_SECONDS
            )));
        }
        let poolstart = request.poolstart.unwrap_or(defaults::POOL_STARTING_SIZE);
        if !(auth_limits::MIN_POOL_START..=auth_limits::MAX_POOL_START).contains(&poolstart) {
            return Err(AppError::validation(format!(
                "request.poolstart must be in [{}, {}]",
                auth_limits::MIN_POOL_START,
                auth_limits::MAX_POOL_START
            )));
        }
        let poolmax = request.poolmax.unwrap_or(defaults::POOL_MAX_SIZE);
        if !(auth_limits::MIN_POOL_MAX..=auth_limits::MAX_POOL_MAX).contains(&poolmax) {
            return Err(AppError::validation(format!(
                "request.poolmax must be in [{}, {}]",
                auth_limits::MIN_POOL_MAX,
                auth_limits::MAX_POOL_MAX
            )));
        }
        if poolstart > poolmax {
            return Err(AppError::validation("request.poolstart must be <= request.poolmax"));
        }

        // Reserve a slot before dialing so two concurrent callers can't both
        // pass a check-then-act race and exceed the cap (spec §8 invariant
        // |active_sessions| <= max_concurrent_sessions at all times).
        let reserved = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        if reserved > self.config.max_concurrent_sessions {
            self.active_count.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::validation(format!(
                "concurrency cap reached: {} active sessions",
                self.config.max_concurrent_sessions
            )));
        }

        let pool = match AuthPool::connect(&request.host, &payload.credentials, poolstart, poolmax).await {
            Ok(pool) => pool,
            Err(e) => {
                self.active_count.fetch_sub(1, Ordering::SeqCst);
                return Err(AppError::internal(format!("failed to create auth pool: {e}")));
            }
        };

        let token = generate_token();
        let now = Utc::now();
        let expires_at = now + ChronoDuration::seconds(duration);

        self.sessions.insert(
            token.clone(),
            SessionRecord {
                credentials: payload.credentials,
                host: request.host,
                created_at: now,
                expires_at,
                last_used_at: now,
                pool: Arc::new(pool),
            },
        );

        tracing::info!(active_sessions = self.active_count.load(Ordering::SeqCst), "issued auth session");

        Ok(IssueResponse {
            access_token: token,
            token_type: "Bearer".to_owned(),
            expires_in: duration,
            expires_at,
        })
    }

    /// Validate `token`, updating `last_used_at` on success.
    ///
    /// # Errors
    /// Returns [`AppError::unauthorized`] when the token is missing or
    /// expired (an expired token is evicted as a side effect).
    pub fn validate(&self, token: &str) -> AppResult<Arc<AuthPool>> {
        let mut entry = self
            .sessions
            .get_mut(token)
            .ok_or_else(|| AppError::unauthorized("unknown bearer token"))?;

        if Utc::now() >= entry.expires_at {
            drop(entry);
            self.sessions.remove(token);
            self.active_count.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::unauthorized("bearer token has expired"));
        }

        entry.last_used_at = Utc::now();
        Ok(entry.pool.clone())
    }

    /// Revoke `token` immediately, closing its pool.
    pub async fn revoke(&self, token: &str) {
        if let Some((_, record)) = self.sessions.remove(token) {
            record.pool.close().await;
            self.active_count.fetch_sub(1, Ordering::SeqCst);
            tracing::info!("revoked auth session");
        }
    }

    /// Sweep expired tokens, closing and dropping their pools. Run
    /// periodically by [`crate::auth::reap_forever`]; errors here are
    /// logged and never propagate (spec §7 propagation rules).
    pub async fn reap_expired(&self) {
        let now = Utc::now();
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.expires_at < now)
            .map(|entry| entry.key().clone())
            .collect();

        for token in expired {
            if let Some((_, record)) = self.sessions.remove(&token) {
                record.pool.close().await;
                self.active_count.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Stop the reaper (caller's responsibility to abort the task handle),
    /// close every pool, and clear the token map.
    pub async fn shutdown(&self) {
        for entry in self.sessions.iter() {
            entry.value().pool.close().await;
        }
        self.sessions.clear();
        self.active_count.store(0, Ordering::SeqCst);
    }

    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.cleanup_interval_seconds)
    }
}

fn generate_token() -> String {
    let mut bytes = vec![0u8; auth_limits::TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Run [`AuthSessionManager::reap_expired`] on `manager`'s configured
/// interval until the returned task is aborted (spec §4.6 "Reaping").
pub async fn reap_forever(manager: Arc<AuthSessionManager>) {
    let mut ticker = tokio::time::interval(manager.cleanup_interval());
    loop {
        ticker.tick().await;
        manager.reap_expired().await;
    }
}
