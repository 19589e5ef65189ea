// ABOUTME: Database connectivity — one lazily-initialized pool per declared source
// ABOUTME: Driver selection is delegated to sqlx's Any backend (spec §4.5)

pub mod pool;
pub mod rowconv;

pub use pool::{HealthStatus, SourceHealth, SourcePoolManager};
pub use rowconv::{column_metadata, row_to_json};
