use std::path::PathBuf;

use async_trait::async_trait;
use checkout_core::{BackendConfig, BackendError, BackendFactory, MarketplaceBackend};
use tracing::info;

use crate::repository::SqliteBackend;

/// Resolve the seeds directory at runtime so it works in both development and
/// packaged distribution.
///
/// Resolution order:
/// 1. **`CHECKOUT_DB_SQLITE_SEEDS_DIR`** if set.
/// 2. **`./seeds`** if the directory exists in the current working directory.
/// 3. **Crate manifest dir**, `$CARGO_MANIFEST_DIR/seeds`, as a last resort.
pub fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHECKOUT_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// [`BackendFactory`] for SQLite.
///
/// Register this with a [`checkout_core::BackendRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use checkout_core::BackendRegistry;
/// use checkout_db_sqlite::SqliteBackendFactory;
///
/// let mut registry = BackendRegistry::new();
/// registry.register(Box::new(SqliteBackendFactory));
/// ```
pub struct SqliteBackendFactory;

#[async_trait]
impl BackendFactory for SqliteBackendFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string`, migrate it
    /// and apply the seed files.
    ///
    /// Accepted connection-string values:
    /// * A file path, e.g. `"marketplace.db"`. The file is created if it
    ///   does not exist.
    /// * `":memory:"` for an ephemeral database seeded with the demo cars.
    async fn create(
        &self,
        config: &BackendConfig,
    ) -> Result<Box<dyn MarketplaceBackend>, BackendError> {
        let backend = SqliteBackend::new(&config.connection_string, &config.checkout_base_url)
            .await
            .map_err(|e| BackendError::Connection(format!("{e:#}")))?;
        backend
            .run_migrations()
            .await
            .map_err(|e| BackendError::Database(format!("{e:#}")))?;
        let seeds = seeds_dir();
        backend
            .run_seeds(&seeds)
            .await
            .map_err(|e| BackendError::Database(format!("{e:#}")))?;
        info!(
            connection = %config.connection_string,
            seeds = %seeds.display(),
            "sqlite backend ready"
        );
        Ok(Box::new(backend))
    }
}
