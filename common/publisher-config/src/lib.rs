//! Durable JSON configuration for the artifact publisher
//!
//! A single JSON document holds the repository registry, the active
//! repository pointer and user preferences. [`ConfigStore`] owns the file:
//! reads self-heal a missing or corrupt document, writes go through a
//! temp-file rename, and every mutation runs under a cross-process lock.
//!
//! ```no_run
//! use publisher_config::{ConfigStore, DefaultOptions, RepositoryRecord};
//!
//! # async fn demo() -> publisher_config::Result<()> {
//! let store = ConfigStore::new(ConfigStore::default_path(), DefaultOptions::default());
//! store.upsert_repository(RepositoryRecord::new("gallery", "/home/me/gallery")).await?;
//! let active = store.get_active_repository().await?;
//! assert_eq!(active.map(|r| r.name), Some("gallery".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod lock;
pub mod migrate;
pub mod registry;
pub mod schema;
pub mod store;

pub use error::{ConfigError, Result, ValidationError, Violation};
pub use lock::{ConfigLock, LockOptions, MarkerGuard, MarkerLock};
pub use registry::{RepositoryPatch, SettingsPatch};
pub use schema::{
    create_default, validate, Configuration, DefaultOptions, Preferences, RepositoryRecord,
    CURRENT_VERSION,
};
pub use store::{write_atomic, ConfigStore, CONFIG_FILE_NAME};
