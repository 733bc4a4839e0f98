//! Repository registry operations built on [`ConfigStore::update`]
//!
//! Every mutation runs inside a single locked update, so the active pointer
//! and the per-record flags always change together.

use std::path::PathBuf;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{ConfigError, Result};
use crate::lock::ConfigLock;
use crate::schema::{Configuration, Preferences, RepositoryRecord};
use crate::store::ConfigStore;

/// Partial update for a repository record
#[derive(Debug, Clone, Default)]
pub struct RepositoryPatch {
    pub local_path: Option<PathBuf>,
    pub remote_url: Option<String>,
    pub published_url: Option<String>,
    /// Merged key-wise into the existing metadata
    pub metadata: Map<String, Value>,
}

impl RepositoryPatch {
    fn apply(self, record: &mut RepositoryRecord) {
        if let Some(path) = self.local_path {
            record.local_path = path;
        }
        if let Some(url) = self.remote_url {
            record.remote_url = Some(url);
        }
        if let Some(url) = self.published_url {
            record.published_url = Some(url);
        }
        record.metadata.extend(self.metadata);
    }
}

/// Partial update for top-level settings and preferences
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub default_repo_name: Option<String>,
    pub auto_commit: Option<bool>,
    pub commit_message: Option<String>,
    pub debug: Option<bool>,
    /// `Some("")` clears the override
    pub local_template_path: Option<String>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.default_repo_name.is_none()
            && self.auto_commit.is_none()
            && self.commit_message.is_none()
            && self.debug.is_none()
            && self.local_template_path.is_none()
    }

    fn apply(self, config: &mut Configuration) {
        let prefs: &mut Preferences = &mut config.preferences;
        if let Some(name) = self.default_repo_name {
            prefs.default_repo_name = name;
        }
        if let Some(auto_commit) = self.auto_commit {
            prefs.auto_commit = auto_commit;
        }
        if let Some(message) = self.commit_message {
            prefs.commit_message = message;
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if let Some(path) = self.local_template_path {
            config.local_template_path = if path.is_empty() { None } else { Some(path) };
        }
    }
}

fn refresh_last_used(record: &mut RepositoryRecord) {
    record.last_used_at = Utc::now().max(record.last_used_at);
}

impl<L: ConfigLock> ConfigStore<L> {
    /// All records, in insertion order
    pub async fn get_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        Ok(self.read().await?.repositories)
    }

    pub async fn get_repository(&self, name: &str) -> Result<Option<RepositoryRecord>> {
        Ok(self.read().await?.find(name).cloned())
    }

    /// The selected repository, or `None` when nothing is selected
    pub async fn get_active_repository(&self) -> Result<Option<RepositoryRecord>> {
        Ok(self.read().await?.active().cloned())
    }

    /// Select `name`; fails with [`ConfigError::NotFound`] if it is unknown
    pub async fn set_active_repository(&self, name: &str) -> Result<RepositoryRecord> {
        let config = self
            .update(|mut config| {
                if config.find(name).is_none() {
                    return Err(ConfigError::not_found(name));
                }
                config.select(Some(name));
                Ok(config)
            })
            .await?;

        info!(repository = name, "active repository changed");
        config.find(name).cloned().ok_or_else(|| ConfigError::not_found(name))
    }

    /// Insert or merge a record by name
    ///
    /// A new record keeps its supplied timestamps and is never flagged active
    /// unless the registry was empty, in which case it becomes the active one.
    /// Merging keeps `createdAt` and the activation state of the existing record.
    pub async fn upsert_repository(&self, record: RepositoryRecord) -> Result<RepositoryRecord> {
        let name = record.name.clone();

        let config = self
            .update(|mut config| {
                let was_empty = config.repositories.is_empty();

                match config.find_mut(&record.name) {
                    Some(existing) => {
                        existing.local_path = record.local_path;
                        if record.remote_url.is_some() {
                            existing.remote_url = record.remote_url;
                        }
                        if record.published_url.is_some() {
                            existing.published_url = record.published_url;
                        }
                        existing.metadata.extend(record.metadata);
                        refresh_last_used(existing);
                    }
                    None => {
                        let mut record = record;
                        record.is_active = false;
                        config.repositories.push(record);
                        if was_empty {
                            config.select(Some(&name));
                        }
                    }
                }
                Ok(config)
            })
            .await?;

        config.find(&name).cloned().ok_or_else(|| ConfigError::not_found(&name))
    }

    /// Register a new record, failing with [`ConfigError::AlreadyExists`] if
    /// the name is taken
    ///
    /// The collision check and the insert share one locked update. With
    /// `activate` the record is selected; otherwise it only becomes active
    /// when the registry was empty.
    pub async fn insert_repository(
        &self,
        record: RepositoryRecord,
        activate: bool,
    ) -> Result<RepositoryRecord> {
        let name = record.name.clone();

        let config = self
            .update(|mut config| {
                if config.find(&name).is_some() {
                    return Err(ConfigError::AlreadyExists { name: name.clone() });
                }
                let select = activate || config.repositories.is_empty();
                let mut record = record;
                record.is_active = false;
                config.repositories.push(record);
                if select {
                    config.select(Some(&name));
                }
                Ok(config)
            })
            .await?;

        info!(repository = %name, "repository registered");
        config.find(&name).cloned().ok_or_else(|| ConfigError::not_found(&name))
    }

    /// Drop a record from the registry; the working copy on disk is untouched
    ///
    /// Removing the active repository promotes the first remaining one.
    /// Returns the removed record, or `None` if the name was unknown.
    pub async fn remove_repository(&self, name: &str) -> Result<Option<RepositoryRecord>> {
        let mut removed = None;

        self.update(|mut config| {
            let Some(index) = config.repositories.iter().position(|r| r.name == name) else {
                return Ok(config);
            };

            let record = config.repositories.remove(index);
            let was_active = config.active_repository.as_deref() == Some(name) || record.is_active;
            if was_active {
                let next = config.repositories.first().map(|r| r.name.clone());
                config.select(next.as_deref());
            }
            removed = Some(record);
            Ok(config)
        })
        .await?;

        if removed.is_some() {
            info!(repository = name, "repository removed from registry");
        }
        Ok(removed)
    }

    /// Refresh `lastUsedAt` on one record; unknown names are ignored
    pub async fn touch_repository(&self, name: &str) -> Result<()> {
        self.update(|mut config| {
            if let Some(record) = config.find_mut(name) {
                refresh_last_used(record);
            }
            Ok(config)
        })
        .await?;
        Ok(())
    }

    /// Merge `patch` onto an existing record and refresh `lastUsedAt`
    pub async fn update_repository(
        &self,
        name: &str,
        patch: RepositoryPatch,
    ) -> Result<Option<RepositoryRecord>> {
        let config = self
            .update(|mut config| {
                if let Some(record) = config.find_mut(name) {
                    patch.apply(record);
                    refresh_last_used(record);
                }
                Ok(config)
            })
            .await?;
        Ok(config.find(name).cloned())
    }

    /// Apply preference and setting changes in one update
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Configuration> {
        self.update(|mut config| {
            patch.apply(&mut config);
            Ok(config)
        })
        .await
    }
}
