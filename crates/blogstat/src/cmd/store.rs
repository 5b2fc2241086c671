//! Record store selection shared by the selector commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blogstat_analytics::{MemoryStore, RecordStore, SqlStore};
use blogstat_config::{Config, QueryConfig, StoreBackend};
use blogstat_query::{ClickHouseBackend, ClickHouseBackendConfig};
use clap::Args;
use tracing::info;

/// Store arguments
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// JSON dataset to load into memory (overrides [query] in the config)
    #[arg(short, long)]
    pub data: Option<PathBuf>,
}

/// Build the record store: `--data` wins, then the `[query]` section
pub fn build_store(args: &StoreArgs, config: &Config) -> Result<Arc<dyn RecordStore>> {
    if let Some(path) = &args.data {
        return memory_store(path);
    }

    let query = &config.query;
    match query.backend {
        StoreBackend::Memory => {
            let path = query.data_path.as_deref().context(
                "no dataset: pass --data or set [query] data_path in the config file",
            )?;
            memory_store(path)
        }
        StoreBackend::Clickhouse => clickhouse_store(query),
    }
}

fn memory_store(path: &Path) -> Result<Arc<dyn RecordStore>> {
    let store = MemoryStore::from_file(path)
        .with_context(|| format!("failed to load dataset {}", path.display()))?;
    info!(path = %path.display(), views = store.view_count(), "loaded dataset");
    Ok(Arc::new(store))
}

fn clickhouse_store(query: &QueryConfig) -> Result<Arc<dyn RecordStore>> {
    let url = query
        .url
        .as_deref()
        .context("[query] backend 'clickhouse' requires 'url'")?;

    let mut backend_config = ClickHouseBackendConfig::new(url, query.database.as_str())
        .with_max_execution_time(query.max_execution_time);
    if let (Some(username), Some(password)) = (&query.username, &query.password) {
        backend_config = backend_config.with_credentials(username.as_str(), password.as_str());
    }

    info!(url, database = %query.database, table = %query.table, "using clickhouse store");
    let backend = Arc::new(ClickHouseBackend::new(&backend_config));
    Ok(Arc::new(SqlStore::with_table(backend, query.table.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::str::FromStr;

    fn dataset() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"users": [{{"id": "u1"}}], "blogs": [{{"id": 1, "title": "t", "user_id": "u1"}}],
                "views": [{{"id": 1, "blog_id": 1, "viewed_at": "2024-01-01T00:00:00Z"}}]}}"#
        )
        .unwrap();
        file
    }

    #[test]
    fn test_data_flag_wins() {
        let file = dataset();
        let args = StoreArgs {
            data: Some(file.path().to_path_buf()),
        };
        let config = Config::from_str(
            "[query]\nbackend = \"clickhouse\"\nurl = \"http://localhost:8123\"",
        )
        .unwrap();
        let store = build_store(&args, &config).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn test_memory_from_config() {
        let file = dataset();
        let mut config = Config::default();
        config.query.data_path = Some(file.path().to_path_buf());
        let store = build_store(&StoreArgs::default(), &config).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn test_missing_dataset() {
        let err = build_store(&StoreArgs::default(), &Config::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("--data"));

        let args = StoreArgs {
            data: Some(PathBuf::from("/nonexistent/views.json")),
        };
        assert!(build_store(&args, &Config::default()).is_err());
    }

    #[test]
    fn test_clickhouse_from_config() {
        let config = Config::from_str(
            "[query]\nbackend = \"clickhouse\"\nurl = \"http://localhost:8123\"\ntable = \"views\"",
        )
        .unwrap();
        let store = build_store(&StoreArgs::default(), &config).unwrap();
        assert_eq!(store.name(), "sql");
    }
}
