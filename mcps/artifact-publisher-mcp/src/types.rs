//! Response types returned by the tools

use publisher_config::RepositoryRecord;
use serde::Serialize;

use crate::artifact::ManifestEntry;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    pub repository: RepositoryRecord,
    /// `local`, `remote` or `builtin`
    pub template: &'static str,
    pub active: bool,
    pub remote_created: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub repository: String,
    pub artifact: ManifestEntry,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    pub committed: bool,
    pub pushed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactListResponse {
    pub repository: String,
    pub total: usize,
    pub artifacts: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryListResponse {
    pub active: Option<String>,
    pub total: usize,
    pub repositories: Vec<RepositoryRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveResponse {
    pub removed: RepositoryRecord,
    pub active: Option<String>,
    /// The working copy is left on disk
    pub files_retained: bool,
}
