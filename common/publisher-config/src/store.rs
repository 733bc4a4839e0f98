//! Durable JSON configuration store
//!
//! The store owns one file. Reads validate, migrate and repair; writes stamp
//! `lastUpdated`, re-validate and persist with write-to-temp-then-rename.
//! [`ConfigStore::update`] is the only sanctioned read-modify-write path: it
//! holds the advisory lock for the whole cycle, so concurrent updates from
//! any process serialize and never lose each other's changes.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::lock::{ConfigLock, MarkerLock};
use crate::migrate::migrate;
use crate::schema::{create_default, validate, validate_config, Configuration, DefaultOptions};

/// File name used under the home directory when no override is given
pub const CONFIG_FILE_NAME: &str = ".artifact-publisher.json";

/// Outcome of loading the file without any repair side effects
enum Loaded {
    Valid(Configuration),
    Missing,
    Corrupt,
}

/// Injectable handle to the configuration file
pub struct ConfigStore<L: ConfigLock = MarkerLock> {
    path: PathBuf,
    defaults: DefaultOptions,
    lock: Arc<L>,
}

impl<L: ConfigLock> Clone for ConfigStore<L> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            defaults: self.defaults.clone(),
            lock: Arc::clone(&self.lock),
        }
    }
}

impl<L: ConfigLock> std::fmt::Debug for ConfigStore<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl ConfigStore<MarkerLock> {
    /// Create a store for `path` using the default marker-file lock
    pub fn new(path: impl Into<PathBuf>, defaults: DefaultOptions) -> Self {
        Self::with_lock(path, defaults, MarkerLock::default())
    }

    /// `~/.artifact-publisher.json`, falling back to the working directory
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }
}

impl<L: ConfigLock> ConfigStore<L> {
    pub fn with_lock(path: impl Into<PathBuf>, defaults: DefaultOptions, lock: L) -> Self {
        Self {
            path: path.into(),
            defaults,
            lock: Arc::new(lock),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> &DefaultOptions {
        &self.defaults
    }

    /// Whether the file exists; never creates it
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Best-effort snapshot of the configuration
    ///
    /// A missing or corrupt file is replaced by a default document (under the
    /// lock) and that default is returned. Only I/O and lock failures surface.
    /// Never use the result as the basis of a later [`write`](Self::write).
    pub async fn read(&self) -> Result<Configuration> {
        if let Loaded::Valid(config) = self.load().await? {
            return Ok(config);
        }

        let _guard = self.lock.acquire(&self.path).await?;
        // Another caller may have bootstrapped or updated while we waited
        match self.load().await? {
            Loaded::Valid(config) => Ok(config),
            Loaded::Missing => {
                info!(path = %self.path.display(), "creating default configuration");
                self.persist(create_default(&self.defaults)).await
            }
            Loaded::Corrupt => {
                warn!(path = %self.path.display(), "replacing corrupt configuration with defaults");
                self.persist(create_default(&self.defaults)).await
            }
        }
    }

    /// Persist `config` without taking the lock
    ///
    /// Intended for bootstrap only; mutations go through [`update`](Self::update).
    /// Fails with a validation error if `config` violates the schema.
    pub async fn write(&self, config: Configuration) -> Result<Configuration> {
        self.persist(config).await
    }

    /// Lock, read, apply `f`, write, unlock
    pub async fn update<F>(&self, f: F) -> Result<Configuration>
    where
        F: FnOnce(Configuration) -> Result<Configuration> + Send,
    {
        self.update_with(|config| std::future::ready(f(config))).await
    }

    /// [`update`](Self::update) with an async transform
    pub async fn update_with<F, Fut>(&self, f: F) -> Result<Configuration>
    where
        F: FnOnce(Configuration) -> Fut + Send,
        Fut: Future<Output = Result<Configuration>> + Send,
    {
        // Released on every exit path when the guard drops
        let _guard = self.lock.acquire(&self.path).await?;

        let current = match self.load().await? {
            Loaded::Valid(config) => config,
            Loaded::Missing => {
                debug!(path = %self.path.display(), "no configuration yet, starting from defaults");
                create_default(&self.defaults)
            }
            Loaded::Corrupt => {
                warn!(path = %self.path.display(), "discarding corrupt configuration during update");
                create_default(&self.defaults)
            }
        };

        let next = f(current).await?;
        self.persist(next).await
    }

    async fn load(&self) -> Result<Loaded> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Loaded::Missing),
            Err(e) => return Err(ConfigError::io(&self.path, e)),
        };

        let raw: Value = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "configuration is not valid JSON");
                return Ok(Loaded::Corrupt);
            }
        };

        let config = match validate(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "configuration failed validation");
                return Ok(Loaded::Corrupt);
            }
        };

        let mut config = migrate(config);
        if config.sync_active_flags() {
            debug!(
                active = ?config.active_repository,
                "resynced repository flags from active pointer"
            );
        }
        Ok(Loaded::Valid(config))
    }

    async fn persist(&self, mut config: Configuration) -> Result<Configuration> {
        config.last_updated = Utc::now().max(config.last_updated);
        validate_config(&config)?;

        let mut json = serde_json::to_string_pretty(&config)?;
        json.push('\n');
        write_atomic(&self.path, json.as_bytes()).await?;

        debug!(
            path = %self.path.display(),
            repositories = config.repositories.len(),
            "configuration written"
        );
        Ok(config)
    }
}

/// Write `contents` to a unique sibling temp file, then rename it over `path`
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ConfigError::io(parent, e))?;
    }

    let tmp = temp_path(path);
    if let Err(e) = write_and_sync(&tmp, contents).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(ConfigError::io(&tmp, e));
    }

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(ConfigError::io(path, e));
    }
    Ok(())
}

async fn write_and_sync(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    Ok(())
}

/// Same directory as the target so the rename stays on one filesystem
fn temp_path(path: &Path) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        name,
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    ))
}
