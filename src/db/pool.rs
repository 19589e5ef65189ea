// ABOUTME: Source Pool Manager — lazily initializes and caches a connection pool per named source
// ABOUTME: Single-flight on first use, cheap health checks, driver-agnostic via sqlx's Any backend

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::AnyPool;
use tokio::sync::Mutex;

use crate::config::schema::SourceDescriptor;
use crate::constants::defaults;
use crate::errors::{AppError, AppResult};

/// Liveness state of a source, as surfaced by `/healthz` (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

/// A named pool's last observed health, tracked alongside the pool itself.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceHealth {
    pub status: HealthStatus,
    #[serde(skip)]
    pub last_check: Option<Instant>,
    pub last_error: Option<String>,
}

impl Default for SourceHealth {
    fn default() -> Self {
        Self {
            status: HealthStatus::Unknown,
            last_check: None,
            last_error: None,
        }
    }
}

struct Slot {
    pool: Mutex<Option<AnyPool>>,
    health: Mutex<SourceHealth>,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            pool: Mutex::new(None),
            health: Mutex::new(SourceHealth::default()),
        }
    }
}

/// Owns one lazily-initialized [`AnyPool`] per declared source.
///
/// Connections are established on first use, not at startup (spec §4.5),
/// and concurrent first-use callers for the same source share a single
/// connection attempt rather than racing to dial twice.
pub struct SourcePoolManager {
    sources: DashMap<String, SourceDescriptor>,
    slots: DashMap<String, Arc<Slot>>,
}

impl SourcePoolManager {
    #[must_use]
    pub fn new(sources: std::collections::HashMap<String, SourceDescriptor>) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            slots: DashMap::new(),
        }
    }

    /// Swap in a new source set, e.g. after a config reload. Pools for
    /// sources that no longer exist are dropped; pools for sources whose
    /// descriptor is unchanged are left connected.
    pub fn replace_sources(&self, sources: std::collections::HashMap<String, SourceDescriptor>) {
        let removed: Vec<String> = self
            .sources
            .iter()
            .filter(|entry| !sources.contains_key(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        for name in removed {
            self.sources.remove(&name);
            self.slots.remove(&name);
        }
        for (name, descriptor) in sources {
            let changed = self
                .sources
                .get(&name)
                .map_or(true, |existing| *existing != descriptor);
            self.sources.insert(name.clone(), descriptor);
            if changed {
                self.slots.remove(&name);
            }
        }
    }

    /// Acquire the pool for `source_name`, dialing it on first use.
    ///
    /// # Errors
    /// Returns [`AppError::not_initialized`] when `source_name` is not a
    /// declared source, or [`AppError::database`] when the connection
    /// attempt fails.
    pub async fn pool(&self, source_name: &str) -> AppResult<AnyPool> {
        let descriptor = self
            .sources
            .get(source_name)
            .map(|entry| entry.clone())
            .ok_or_else(|| AppError::not_initialized(format!("unknown source '{source_name}'")))?;

        let slot = self
            .slots
            .entry(source_name.to_owned())
            .or_insert_with(|| Arc::new(Slot::default()))
            .clone();

        let mut guard = slot.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        tracing::info!(source = source_name, "dialing source pool for the first time");
        let pool = connect(&descriptor).await.map_err(|e| {
            tracing::warn!(source = source_name, error = %e, "failed to establish source pool");
            AppError::database(format!("failed to connect to source '{source_name}': {e}"))
        })?;
        *guard = Some(pool.clone());
        drop(guard);

        *slot.health.lock().await = SourceHealth {
            status: HealthStatus::Healthy,
            last_check: Some(Instant::now()),
            last_error: None,
        };

        Ok(pool)
    }

    /// Run a cheap liveness query against `source_name`'s pool, recording
    /// the outcome for `/healthz`. Does not dial a pool that has never
    /// been used.
    pub async fn check_health(&self, source_name: &str) -> SourceHealth {
        let Some(slot) = self.slots.get(source_name).map(|e| e.clone()) else {
            return SourceHealth::default();
        };
        let pool_guard = slot.pool.lock().await;
        let Some(pool) = pool_guard.as_ref() else {
            return SourceHealth::default();
        };

        let result: Result<AnyRow, sqlx::Error> =
            sqlx::query("SELECT 1").fetch_one(pool).await;
        let health = match result {
            Ok(_) => SourceHealth {
                status: HealthStatus::Healthy,
                last_check: Some(Instant::now()),
                last_error: None,
            },
            Err(e) => SourceHealth {
                status: HealthStatus::Unhealthy,
                last_check: Some(Instant::now()),
                last_error: Some(e.to_string()),
            },
        };
        *slot.health.lock().await = health.clone();
        health
    }

    /// Close every pool currently open, e.g. during graceful shutdown.
    pub async fn close_all(&self) {
        for entry in self.slots.iter() {
            if let Some(pool) = entry.value().pool.lock().await.take() {
                pool.close().await;
            }
        }
        self.slots.clear();
    }

    #[must_use]
    pub fn declared_sources(&self) -> Vec<String> {
        self.sources.iter().map(|e| e.key().clone()).collect()
    }
}

async fn connect(descriptor: &SourceDescriptor) -> Result<AnyPool, sqlx::Error> {
    let url = connection_url(descriptor);
    AnyPoolOptions::new()
        .min_connections(defaults::POOL_STARTING_SIZE)
        .max_connections(defaults::POOL_MAX_SIZE)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&url)
        .await
}

/// Build an `sqlx`-compatible connection URL from a [`SourceDescriptor`].
/// Grounded on the URL-detection scheme `sqlx::any` dispatches on: the
/// scheme prefix selects the driver, credentials and host make up the
/// authority.
fn connection_url(descriptor: &SourceDescriptor) -> String {
    let port = descriptor
        .port
        .map_or_else(String::new, |p| format!(":{p}"));
    format!(
        "postgres://{}:{}@{}{}/{}",
        urlencode(&descriptor.user),
        urlencode(&descriptor.password),
        descriptor.host,
        port,
        urlencode(&descriptor.user),
    )
}

fn urlencode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_escapes_special_characters() {
        assert_eq!(urlencode("p@ss:w/rd"), "p%40ss%3Aw%2Frd");
    }

    #[test]
    fn connection_url_includes_port_when_set() {
        let descriptor = SourceDescriptor {
            host: "db.example.com".into(),
            user: "svc".into(),
            password: "secret".into(),
            port: Some(8471),
            ignore_unauthorized: true,
        };
        assert!(connection_url(&descriptor).contains(":8471/"));
    }

    #[tokio::test]
    async fn unknown_source_is_not_initialized_error() {
        let manager = SourcePoolManager::new(std::collections::HashMap::new());
        let err = manager.pool("missing").await.unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::ServiceNotInitialized);
    }
}
