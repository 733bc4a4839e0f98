//! Cross-process advisory locking for the configuration file
//!
//! [`ConfigLock`] is the seam: acquire a scoped lock for a target path, with
//! bounded retry and stale-lock reclamation, and release it when the guard
//! drops. [`MarkerLock`] implements it with a sibling `<file>.lock` marker
//! created with create-new semantics, which works on every platform and
//! across processes that share the filesystem.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};

/// Acquire/release a scoped, host-wide lock on a file path
#[async_trait]
pub trait ConfigLock: Send + Sync {
    /// Held while the lock is owned; dropping it releases the lock
    type Guard: Send;

    /// Acquire the lock for `target`, retrying within the configured budget
    async fn acquire(&self, target: &Path) -> Result<Self::Guard>;
}

/// Retry and staleness settings for lock acquisition
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// Total acquisition attempts before giving up
    pub attempts: u32,
    /// Delay after the first failed attempt; doubles each time
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// A marker older than this is presumed abandoned
    pub stale_after: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            attempts: 10,
            min_delay: Duration::from_millis(25),
            max_delay: Duration::from_millis(500),
            stale_after: Duration::from_secs(10),
        }
    }
}

impl LockOptions {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.min_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Lock backed by a create-new marker file next to the target
#[derive(Debug, Clone, Default)]
pub struct MarkerLock {
    options: LockOptions,
}

impl MarkerLock {
    pub fn new(options: LockOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    /// Marker path for a target file: `<target>.lock`
    pub fn marker_path(target: &Path) -> PathBuf {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        target.with_file_name(name)
    }

    async fn is_stale(&self, marker: &Path) -> bool {
        let Ok(modified) = tokio::fs::metadata(marker).await.and_then(|m| m.modified()) else {
            return false;
        };
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age > self.options.stale_after)
            .unwrap_or(false)
    }

    /// Remove `marker` if it is stale, without ever deleting a live one
    ///
    /// The marker is first renamed to a name private to this waiter, so only
    /// one waiter can claim a given file. If the claimed file is not the stale
    /// marker we inspected, its owner replaced it in between and it is put
    /// back with a create-if-absent hard link.
    async fn reclaim_stale(&self, marker: &Path, token: &str) -> Result<()> {
        let observed = match tokio::fs::read_to_string(marker).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(ConfigError::io(marker, e)),
        };
        if !self.is_stale(marker).await {
            return Ok(());
        }

        let claimed = claim_path(marker, token);
        match tokio::fs::rename(marker, &claimed).await {
            Ok(()) => {}
            // Another waiter claimed it first
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(ConfigError::io(marker, e)),
        }

        let content = tokio::fs::read_to_string(&claimed).await.unwrap_or_default();
        if content == observed {
            warn!(marker = %marker.display(), "reclaimed stale configuration lock");
        } else {
            match tokio::fs::hard_link(&claimed, marker).await {
                Ok(()) => debug!(marker = %marker.display(), "restored live lock taken during reclaim"),
                Err(e) => warn!(
                    marker = %marker.display(),
                    error = %e,
                    "could not restore live lock taken during reclaim"
                ),
            }
        }
        let _ = tokio::fs::remove_file(&claimed).await;
        Ok(())
    }
}

#[async_trait]
impl ConfigLock for MarkerLock {
    type Guard = MarkerGuard;

    async fn acquire(&self, target: &Path) -> Result<MarkerGuard> {
        let marker = Self::marker_path(target);
        if let Some(parent) = marker.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::io(parent, e))?;
        }

        let token = owner_token();
        let attempts = self.options.attempts.max(1);

        for attempt in 0..attempts {
            match try_create(&marker, &token).await {
                Ok(()) => {
                    debug!(marker = %marker.display(), attempt, "lock acquired");
                    return Ok(MarkerGuard {
                        path: marker,
                        token,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if self.is_stale(&marker).await {
                        self.reclaim_stale(&marker, &token).await?;
                        continue;
                    }
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.options.delay_for_attempt(attempt)).await;
                    }
                }
                Err(e) => return Err(ConfigError::io(&marker, e)),
            }
        }

        Err(ConfigError::LockTimeout {
            path: marker,
            attempts,
        })
    }
}

async fn try_create(marker: &Path, token: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(marker)
        .await?;
    if let Err(e) = write_token(&mut file, token).await {
        drop(file);
        let _ = tokio::fs::remove_file(marker).await;
        return Err(e);
    }
    Ok(())
}

async fn write_token(file: &mut tokio::fs::File, token: &str) -> std::io::Result<()> {
    file.write_all(token.as_bytes()).await?;
    file.flush().await
}

/// `<marker>.<token>.stale`, unique to one waiter
fn claim_path(marker: &Path, token: &str) -> PathBuf {
    let mut name = marker
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.stale", token.replace(':', "-")));
    marker.with_file_name(name)
}

/// Unique per acquisition: pid plus a process-local sequence and clock nanos
fn owner_token() -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "{}:{}:{}",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed),
        nanos
    )
}

/// Owned marker; removed on drop if it still carries our token
#[derive(Debug)]
pub struct MarkerGuard {
    path: PathBuf,
    token: String,
}

impl MarkerGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MarkerGuard {
    fn drop(&mut self) {
        // A reclaimed-as-stale marker now belongs to someone else
        match fs::read_to_string(&self.path) {
            Ok(content) if content == self.token => {
                if let Err(e) = fs::remove_file(&self.path) {
                    if e.kind() != ErrorKind::NotFound {
                        warn!(marker = %self.path.display(), error = %e, "failed to release lock");
                    }
                }
                debug!(marker = %self.path.display(), "lock released");
            }
            Ok(_) => warn!(marker = %self.path.display(), "lock was reclaimed by another owner"),
            Err(_) => {}
        }
    }
}
