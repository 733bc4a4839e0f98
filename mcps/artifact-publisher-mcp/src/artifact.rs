//! Artifact validation and writing
//!
//! Artifacts live under `<repo>/src/artifacts/` as `<slug>.<ext>`, indexed by
//! a `manifest.json` array that the site reads to build its gallery.

use chrono::{DateTime, Utc};
use publisher_config::{write_atomic, ConfigError, ConfigLock, LockOptions, MarkerLock};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Upper bound on artifact source size
pub const MAX_ARTIFACT_BYTES: usize = 1024 * 1024;

/// Artifact directory relative to the repository root
pub const ARTIFACTS_REL: &str = "src/artifacts";

const MAX_SLUG_LEN: usize = 60;
const FALLBACK_SLUG: &str = "artifact";
const MANIFEST_FILE: &str = "manifest.json";
/// Publishes queue behind each other for up to a few seconds
const MANIFEST_LOCK_ATTEMPTS: u32 = 40;

/// Supported artifact formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    React,
    Html,
    Svg,
    Markdown,
    Mermaid,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::React => "jsx",
            Self::Html => "html",
            Self::Svg => "svg",
            Self::Markdown => "md",
            Self::Mermaid => "mmd",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::React => "react",
            Self::Html => "html",
            Self::Svg => "svg",
            Self::Markdown => "markdown",
            Self::Mermaid => "mermaid",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact title is required")]
    MissingTitle,

    #[error("artifact code is empty")]
    EmptyCode,

    #[error("artifact is too large ({size} bytes, limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("{kind} artifact {reason}")]
    Malformed {
        kind: ArtifactKind,
        reason: &'static str,
    },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] ConfigError),

    #[error("manifest at {} is unreadable: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Artifact submitted for publishing
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub title: String,
    pub kind: ArtifactKind,
    pub code: String,
    pub description: Option<String>,
}

/// One gallery entry in `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub slug: String,
    pub title: String,
    pub kind: ArtifactKind,
    #[serde(default)]
    pub description: Option<String>,
    /// Path relative to the repository root
    pub file: String,
    pub created_at: DateTime<Utc>,
}

/// Reject artifacts the site cannot render
pub fn validate(artifact: &NewArtifact) -> ArtifactResult<()> {
    if artifact.title.trim().is_empty() {
        return Err(ArtifactError::MissingTitle);
    }
    if artifact.code.trim().is_empty() {
        return Err(ArtifactError::EmptyCode);
    }
    if artifact.code.len() > MAX_ARTIFACT_BYTES {
        return Err(ArtifactError::TooLarge {
            size: artifact.code.len(),
            limit: MAX_ARTIFACT_BYTES,
        });
    }

    let malformed = |reason| ArtifactError::Malformed {
        kind: artifact.kind,
        reason,
    };
    match artifact.kind {
        ArtifactKind::React if !artifact.code.contains("export") => {
            Err(malformed("must export a component"))
        }
        ArtifactKind::Html if !artifact.code.contains('<') => Err(malformed("must contain markup")),
        ArtifactKind::Svg if !artifact.code.contains("<svg") => {
            Err(malformed("must contain an <svg> element"))
        }
        _ => Ok(()),
    }
}

/// URL-safe slug derived from a title
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// First of `base`, `base-2`, `base-3`, ... not in `taken`
pub fn unique_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

pub fn artifacts_dir(repo: &Path) -> PathBuf {
    repo.join(ARTIFACTS_REL)
}

/// Gallery entries for a repository; a missing manifest is an empty gallery
pub async fn read_manifest(repo: &Path) -> ArtifactResult<Vec<ManifestEntry>> {
    let path = artifacts_dir(repo).join(MANIFEST_FILE);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ArtifactError::io(&path, e)),
    };
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Manifest { path, source })
}

async fn write_manifest(repo: &Path, entries: &[ManifestEntry]) -> ArtifactResult<()> {
    let path = artifacts_dir(repo).join(MANIFEST_FILE);
    let mut json = serde_json::to_string_pretty(entries).map_err(|source| {
        ArtifactError::Manifest {
            path: path.clone(),
            source,
        }
    })?;
    json.push('\n');
    write_atomic(&path, json.as_bytes()).await?;
    Ok(())
}

fn manifest_lock() -> MarkerLock {
    MarkerLock::new(LockOptions {
        attempts: MANIFEST_LOCK_ATTEMPTS,
        ..LockOptions::default()
    })
}

/// Validate, write the artifact file and append it to the manifest
///
/// Slug selection, the file write and the manifest rewrite happen under a
/// lock on the manifest, so concurrent publishes to one repository neither
/// share a slug nor drop each other's entries.
pub async fn write_artifact(repo: &Path, artifact: NewArtifact) -> ArtifactResult<ManifestEntry> {
    validate(&artifact)?;

    let dir = artifacts_dir(repo);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ArtifactError::io(&dir, e))?;
    let _guard = manifest_lock().acquire(&dir.join(MANIFEST_FILE)).await?;

    let mut entries = read_manifest(repo).await?;
    let mut taken: HashSet<String> = entries.iter().map(|e| e.slug.clone()).collect();
    let mut listing = tokio::fs::read_dir(&dir)
        .await
        .map_err(|e| ArtifactError::io(&dir, e))?;
    while let Some(entry) = listing
        .next_entry()
        .await
        .map_err(|e| ArtifactError::io(&dir, e))?
    {
        if let Some(stem) = Path::new(&entry.file_name()).file_stem() {
            taken.insert(stem.to_string_lossy().into_owned());
        }
    }

    let slug = unique_slug(&slugify(&artifact.title), &taken);
    let file_name = format!("{slug}.{}", artifact.kind.extension());
    let path = dir.join(&file_name);
    tokio::fs::write(&path, &artifact.code)
        .await
        .map_err(|e| ArtifactError::io(&path, e))?;
    debug!(path = %path.display(), "artifact file written");

    let entry = ManifestEntry {
        slug,
        title: artifact.title.trim().to_string(),
        kind: artifact.kind,
        description: artifact.description.filter(|d| !d.trim().is_empty()),
        file: format!("{ARTIFACTS_REL}/{file_name}"),
        created_at: Utc::now(),
    };
    entries.push(entry.clone());
    if let Err(e) = write_manifest(repo, &entries).await {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(e);
    }

    info!(slug = %entry.slug, kind = %entry.kind, "artifact written");
    Ok(entry)
}

/// Public URL of an artifact page on the published site
pub fn artifact_url(published_url: &str, slug: &str) -> String {
    format!("{}/artifacts/{slug}", published_url.trim_end_matches('/'))
}
