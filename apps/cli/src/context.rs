//! Process-wide wiring: configuration, backend and session store.

use anyhow::{Context as _, Result};
use ragmaster_auth::{SessionStore, SupabaseBackend};
use ragmaster_config::{Config, Paths};
use ragmaster_storage::{create_storage, StateManager};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Everything a command or the terminal UI needs.
pub struct AppContext {
    pub backend: SupabaseBackend,
    pub store: Arc<SessionStore>,
}

/// Resolve paths and configuration. Fails when the backend is not configured.
pub fn load_config(base_dir: Option<PathBuf>) -> Result<(Paths, Config)> {
    let paths = match base_dir {
        Some(dir) => Paths::with_base_dir(dir),
        None => Paths::new()?,
    };
    paths
        .ensure_dirs()
        .with_context(|| format!("creating {}", paths.base_dir().display()))?;

    let config = Config::load(&paths)?;
    Ok((paths, config))
}

impl AppContext {
    /// Build the backend and open the session store over local storage.
    ///
    /// Must run inside the tokio runtime.
    pub async fn open(paths: &Paths, config: &Config) -> Result<Self> {
        let backend = SupabaseBackend::new(&config.supabase.url, &config.supabase.anon_key);
        let storage = create_storage(&paths.storage_dir())
            .with_context(|| format!("opening {}", paths.storage_dir().display()))?;

        let store = SessionStore::open(
            Arc::new(backend.clone()),
            StateManager::new(storage),
        )
        .await;
        debug!(url = %config.supabase.url, "Session store ready");

        Ok(Self {
            backend,
            store: Arc::new(store),
        })
    }
}
