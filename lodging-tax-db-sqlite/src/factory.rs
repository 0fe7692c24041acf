use std::path::PathBuf;

use async_trait::async_trait;
use lodging_tax_core::db::{DbConfig, RepositoryFactory};
use lodging_tax_core::{LodgingTaxRepository, RepositoryError};
use tracing::info;

use crate::repository::SqliteRepository;

/// Resolve the seeds directory at runtime so it works in both development and
/// packaged distribution.
///
/// Resolution order:
/// 1. **`LODGING_TAX_SEEDS_DIR`** if set.
/// 2. **`./seeds`** if the directory exists in the current working directory.
/// 3. **`$CARGO_MANIFEST_DIR/seeds`** when run from the build tree.
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LODGING_TAX_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// [`RepositoryFactory`] for SQLite.
///
/// ```rust,no_run
/// use lodging_tax_core::db::RepositoryRegistry;
/// use lodging_tax_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database named by `config.connection_string` (a file path,
    /// `:memory:`, or a `sqlite:` URL), migrate it, apply the settings seed
    /// files and install the default tax brackets on first run.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LodgingTaxRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        repo.run_seeds(&seeds_dir())
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        repo.seed_default_brackets().await?;

        info!(database = %config.connection_string, "opened sqlite repository");
        Ok(Box::new(repo))
    }
}
