use crate::cache::Cache;
use crate::credentials::CredentialStore;
use crate::manager::WikiManager;
use crate::wiki::Wiki;
use anyhow::Context;
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;
use wikirpc_client::{ClientConfig, WikiClient};

/// Catalog configuration
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Root for per-wiki data (credential files), one subdirectory per wiki key
    pub data_dir: PathBuf,
    /// Root for per-wiki caches, one subdirectory per wiki key
    pub cache_dir: PathBuf,
    /// Configuration applied to every wiki's HTTP client
    pub client: ClientConfig,
}

/// Hands out the single [`WikiManager`] per remote wiki, constructing it on
/// first access. One catalog is shared by all call sites; managers live
/// until the catalog is dropped, normally at process teardown.
pub struct WikiCatalog {
    config: CatalogConfig,
    managers: Mutex<IndexMap<Wiki, Arc<WikiManager>>>,
}

impl WikiCatalog {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config,
            managers: Mutex::new(IndexMap::new()),
        }
    }

    /// Returns the facade for `wiki`, constructing and storing it on first
    /// access. Construct-or-fetch is atomic as a unit: callers racing on the
    /// same identity all receive the one instance.
    pub fn get(&self, wiki: &Wiki) -> anyhow::Result<Arc<WikiManager>> {
        let mut managers = self.lock();

        if let Some(manager) = managers.get(wiki) {
            return Ok(Arc::clone(manager));
        }

        let manager = self
            .construct(wiki)
            .with_context(|| format!("Failed to set up wiki {}", wiki.url()))?;
        managers.insert(wiki.clone(), Arc::clone(&manager));

        Ok(manager)
    }

    /// Snapshot of all currently materialized facades. This is NOT the set
    /// of all known or configured wikis, only those accessed so far in this
    /// process.
    pub fn all(&self) -> Vec<Arc<WikiManager>> {
        self.lock().values().map(Arc::clone).collect()
    }

    fn construct(&self, wiki: &Wiki) -> anyhow::Result<Arc<WikiManager>> {
        info!(%wiki, key = wiki.key(), "setting up wiki");

        let store = CredentialStore::open(self.config.data_dir.join(wiki.key()))
            .context("Failed to open credential store")?;
        let client =
            WikiClient::http(wiki.url(), &self.config.client).context("Failed to build client")?;
        let cache = Cache::open(self.config.cache_dir.join(wiki.key()))
            .context("Failed to open cache directory")?;

        Ok(WikiManager::new(wiki.clone(), client, store, cache))
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<Wiki, Arc<WikiManager>>> {
        self.managers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
