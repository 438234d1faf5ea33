use std::path::PathBuf;
use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_LOG_PATH: &str = "urls.json";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for opening a [`HybridStore`](crate::HybridStore).
#[derive(Debug, Clone, TypedBuilder)]
pub struct StoreConfig {
    /// Path of the durable log.
    #[builder(default = PathBuf::from(DEFAULT_LOG_PATH), setter(into))]
    pub log_path: PathBuf,
    /// Relational backend DSN. `None` selects file-only mode.
    #[builder(default, setter(into))]
    pub database_dsn: Option<String>,
    #[builder(default = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
    /// How long a backend call may wait for a pooled connection.
    #[builder(default = DEFAULT_ACQUIRE_TIMEOUT)]
    pub acquire_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
