// ABOUTME: Per-token connection pool created on auth issuance and torn down on revoke/expiry
// ABOUTME: Sized per the caller's poolstart/poolmax request, bounded by auth_limits (spec §4.6 step 9)

use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::auth::envelope::Credentials;

/// A connection pool scoped to a single bearer token.
pub struct AuthPool {
    pub pool: AnyPool,
}

impl AuthPool {
    /// Dial a pool against `host` using `credentials`, sized between
    /// `poolstart` and `poolmax` connections.
    ///
    /// # Errors
    /// Returns the driver's [`sqlx::Error`] on connection failure; callers
    /// map this to [`crate::errors::AppError::internal`] without storing
    /// the token (spec §4.6 failure semantics).
    pub async fn connect(
        host: &str,
        credentials: &Credentials,
        poolstart: u32,
        poolmax: u32,
    ) -> Result<Self, sqlx::Error> {
        let url = format!(
            "postgres://{}:{}@{}/{}",
            urlencode(&credentials.username),
            urlencode(&credentials.password),
            host,
            urlencode(&credentials.username),
        );
        let pool = AnyPoolOptions::new()
            .min_connections(poolstart)
            .max_connections(poolmax)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn urlencode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
