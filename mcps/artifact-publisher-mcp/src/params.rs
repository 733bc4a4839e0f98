//! Parameter definitions for artifact-publisher tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::artifact::ArtifactKind;

fn default_true() -> bool {
    true
}

// ============================================================================
// Repository Setup
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InitializeRepositoryParams {
    #[schemars(description = "Repository name (defaults to the configured default repository name)")]
    #[serde(default)]
    pub name: Option<String>,

    #[schemars(description = "Local directory for the new repository (defaults to ~/<name>)")]
    #[serde(default)]
    pub path: Option<String>,

    #[schemars(description = "Create a GitHub repository with gh and push to it (default: true)")]
    #[serde(default = "default_true")]
    pub create_remote: bool,

    #[schemars(description = "Make the GitHub repository private (default: false)")]
    #[serde(default)]
    pub private: bool,

    #[schemars(description = "Select the new repository as the active one (default: true)")]
    #[serde(default = "default_true")]
    pub activate: bool,
}

// ============================================================================
// Publishing
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PublishArtifactParams {
    #[schemars(description = "Artifact title, also used to derive the file slug")]
    pub title: String,

    #[schemars(description = "Artifact format: react, html, svg, markdown or mermaid")]
    pub kind: ArtifactKind,

    #[schemars(description = "Artifact source code")]
    pub code: String,

    #[schemars(description = "Short description shown in the gallery")]
    #[serde(default)]
    pub description: Option<String>,

    #[schemars(description = "Target repository name (defaults to the active repository)")]
    #[serde(default)]
    pub repository: Option<String>,

    #[schemars(description = "Commit the artifact (defaults to the autoCommit preference)")]
    #[serde(default)]
    pub commit: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListArtifactsParams {
    #[schemars(description = "Repository name (defaults to the active repository)")]
    #[serde(default)]
    pub repository: Option<String>,
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RepositoryNameParams {
    #[schemars(description = "Registered repository name")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateRepositoryParams {
    #[schemars(description = "Registered repository name")]
    pub name: String,

    #[schemars(description = "New local working copy path")]
    #[serde(default)]
    pub local_path: Option<String>,

    #[schemars(description = "Git remote URL")]
    #[serde(default)]
    pub remote_url: Option<String>,

    #[schemars(description = "Public URL of the published site")]
    #[serde(default)]
    pub published_url: Option<String>,

    #[schemars(description = "Metadata entries merged into the existing metadata")]
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConfigureParams {
    #[schemars(description = "Default name for initialize_repository")]
    #[serde(default)]
    pub default_repo_name: Option<String>,

    #[schemars(description = "Commit artifacts automatically after publishing")]
    #[serde(default)]
    pub auto_commit: Option<bool>,

    #[schemars(description = "Commit message prefix for published artifacts")]
    #[serde(default)]
    pub commit_message: Option<String>,

    #[schemars(description = "Enable debug mode")]
    #[serde(default)]
    pub debug: Option<bool>,

    #[schemars(description = "Local template directory; empty string clears it")]
    #[serde(default)]
    pub local_template_path: Option<String>,
}
