//! Handler implementations for artifact-publisher tools
//!
//! Each handler runs its domain logic as a `PublishResult` and converts the
//! outcome with [`respond`]: success becomes pretty JSON, domain failures an
//! in-band error result.

use std::path::{Path, PathBuf};

use publisher_config::{
    ConfigError, ConfigStore, Configuration, RepositoryPatch, RepositoryRecord, SettingsPatch,
};
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifact::{artifact_url, read_manifest, write_artifact, NewArtifact, ARTIFACTS_REL};
use crate::cli::{check_gh_available, run_gh, run_gh_json, run_git};
use crate::error::{PublishError, PublishResult};
use crate::params::*;
use crate::response::{failure, invalid_params, json_success};
use crate::template::{is_empty_dir, scaffold, TemplateSource};
use crate::types::*;

/// Everything a handler needs besides its parameters
#[derive(Debug, Clone)]
pub struct PublisherState {
    pub store: ConfigStore,
    /// Cloned when no local template is configured
    pub template_repo: Option<String>,
    /// Parent directory for repositories created without an explicit path
    pub home_dir: PathBuf,
}

impl PublisherState {
    pub fn new(store: ConfigStore, template_repo: Option<String>) -> Self {
        Self {
            store,
            template_repo,
            home_dir: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

fn respond<T: Serialize>(result: PublishResult<T>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(data) => json_success(&data),
        Err(e) => {
            warn!(error = %e, "tool call failed");
            Ok(failure(e))
        }
    }
}

/// The named repository, or the active one when no name is given
fn resolve_repository(
    config: &Configuration,
    name: Option<&str>,
) -> PublishResult<RepositoryRecord> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => config
            .find(name)
            .cloned()
            .ok_or_else(|| PublishError::UnknownRepository(name.to_string())),
        None => config.active().cloned().ok_or(PublishError::NoActiveRepository),
    }
}

fn expand_home(path: &str, home: &Path) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None if path == "~" => home.to_path_buf(),
        None => PathBuf::from(path),
    }
}

// ============================================================================
// Repository Setup
// ============================================================================

#[derive(Debug, Deserialize)]
struct GhOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhRepoView {
    name: String,
    owner: GhOwner,
}

fn pages_url(owner: &str, repo: &str) -> String {
    if repo.eq_ignore_ascii_case(&format!("{owner}.github.io")) {
        format!("https://{}.github.io/", owner.to_lowercase())
    } else {
        format!("https://{}.github.io/{repo}/", owner.to_lowercase())
    }
}

async fn create_remote(name: &str, path: &Path, private: bool) -> PublishResult<(String, String)> {
    check_gh_available().await?;

    let path_arg = path.to_string_lossy();
    let visibility = if private { "--private" } else { "--public" };
    run_gh(
        &["repo", "create", name, visibility, "--source", &path_arg, "--push"],
        Some(path),
    )
    .await?;

    let remote_url = run_git(&["remote", "get-url", "origin"], path).await?;
    let view: GhRepoView = run_gh_json(&["repo", "view"], &["name", "owner"], Some(path)).await?;
    Ok((remote_url, pages_url(&view.owner.login, &view.name)))
}

async fn initialize(
    state: &PublisherState,
    params: InitializeRepositoryParams,
) -> PublishResult<InitializeResponse> {
    let config = state.store.read().await?;

    let name = params
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| config.preferences.default_repo_name.clone());
    if config.find(&name).is_some() {
        return Err(PublishError::AlreadyRegistered(name));
    }

    let path = match params.path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => expand_home(p, &state.home_dir),
        None => state.home_dir.join(&name),
    };
    if !is_empty_dir(&path).await? {
        return Err(PublishError::TargetNotEmpty(path));
    }

    let source = TemplateSource::resolve(
        config.local_template_path.as_deref(),
        state.template_repo.as_deref(),
    );
    scaffold(&source, &path).await?;

    run_git(&["init"], &path).await?;
    let mut warnings = Vec::new();
    run_git(&["add", "-A"], &path).await?;
    if let Err(e) = run_git(&["commit", "-m", "Initial commit"], &path).await {
        warnings.push(format!("initial commit skipped: {e}"));
    }

    let mut record = RepositoryRecord::new(&name, &path);
    let mut remote_created = false;
    if params.create_remote {
        match create_remote(&name, &path, params.private).await {
            Ok((remote, published)) => {
                record = record.with_remote_url(remote).with_published_url(published);
                remote_created = true;
            }
            Err(e) => warnings.push(format!("remote not created: {e}")),
        }
    }

    // A concurrent call may have taken the name since the check above
    let repository = match state.store.insert_repository(record, params.activate).await {
        Ok(repository) => repository,
        Err(ConfigError::AlreadyExists { name }) => return Err(PublishError::AlreadyRegistered(name)),
        Err(e) => return Err(e.into()),
    };
    info!(repository = %name, path = %path.display(), "repository initialized");

    Ok(InitializeResponse {
        active: repository.is_active,
        repository,
        template: match source {
            TemplateSource::Local(_) => "local",
            TemplateSource::Remote(_) => "remote",
            TemplateSource::Builtin => "builtin",
        },
        remote_created,
        warnings,
    })
}

pub async fn initialize_repository(
    state: &PublisherState,
    params: InitializeRepositoryParams,
) -> Result<CallToolResult, McpError> {
    respond(initialize(state, params).await)
}

// ============================================================================
// Publishing
// ============================================================================

async fn commit_and_push(
    repo: &RepositoryRecord,
    file: &str,
    message: &str,
    warnings: &mut Vec<String>,
) -> (bool, bool) {
    let path = repo.local_path.as_path();
    let manifest = format!("{ARTIFACTS_REL}/manifest.json");

    let staged = run_git(&["add", "--", file, &manifest], path).await;
    let committed = match staged {
        Ok(_) => match run_git(&["commit", "-m", message], path).await {
            Ok(_) => true,
            Err(e) => {
                warnings.push(format!("commit failed: {e}"));
                false
            }
        },
        Err(e) => {
            warnings.push(format!("staging failed: {e}"));
            false
        }
    };

    let pushed = if committed && repo.remote_url.is_some() {
        match run_git(&["push"], path).await {
            Ok(_) => true,
            Err(e) => {
                warnings.push(format!("push failed: {e}"));
                false
            }
        }
    } else {
        false
    };
    (committed, pushed)
}

async fn publish(
    state: &PublisherState,
    params: PublishArtifactParams,
) -> PublishResult<PublishResponse> {
    let config = state.store.read().await?;
    let repo = resolve_repository(&config, params.repository.as_deref())?;
    if !tokio::fs::try_exists(&repo.local_path).await.unwrap_or(false) {
        return Err(PublishError::MissingWorkingCopy(repo.local_path));
    }

    let entry = write_artifact(
        &repo.local_path,
        NewArtifact {
            title: params.title,
            kind: params.kind,
            code: params.code,
            description: params.description,
        },
    )
    .await?;

    let mut warnings = Vec::new();
    let (committed, pushed) = if params.commit.unwrap_or(config.preferences.auto_commit) {
        let message = format!("{}: {}", config.preferences.commit_message, entry.title);
        commit_and_push(&repo, &entry.file, &message, &mut warnings).await
    } else {
        (false, false)
    };

    state.store.touch_repository(&repo.name).await?;

    Ok(PublishResponse {
        file_path: repo.local_path.join(&entry.file).display().to_string(),
        artifact_url: repo
            .published_url
            .as_deref()
            .map(|url| artifact_url(url, &entry.slug)),
        repository: repo.name,
        artifact: entry,
        committed,
        pushed,
        warnings,
    })
}

pub async fn publish_artifact(
    state: &PublisherState,
    params: PublishArtifactParams,
) -> Result<CallToolResult, McpError> {
    respond(publish(state, params).await)
}

async fn artifacts_for(
    state: &PublisherState,
    params: ListArtifactsParams,
) -> PublishResult<ArtifactListResponse> {
    let config = state.store.read().await?;
    let repo = resolve_repository(&config, params.repository.as_deref())?;
    let artifacts = read_manifest(&repo.local_path).await?;
    Ok(ArtifactListResponse {
        repository: repo.name,
        total: artifacts.len(),
        artifacts,
    })
}

pub async fn list_artifacts(
    state: &PublisherState,
    params: ListArtifactsParams,
) -> Result<CallToolResult, McpError> {
    respond(artifacts_for(state, params).await)
}

// ============================================================================
// Registry
// ============================================================================

async fn repository_list(state: &PublisherState) -> PublishResult<RepositoryListResponse> {
    let config = state.store.read().await?;
    let active = config.active().map(|r| r.name.clone());
    Ok(RepositoryListResponse {
        active,
        total: config.repositories.len(),
        repositories: config.repositories,
    })
}

pub async fn list_repositories(state: &PublisherState) -> Result<CallToolResult, McpError> {
    respond(repository_list(state).await)
}

pub async fn switch_repository(
    state: &PublisherState,
    params: RepositoryNameParams,
) -> Result<CallToolResult, McpError> {
    respond(
        state
            .store
            .set_active_repository(params.name.trim())
            .await
            .map_err(PublishError::from),
    )
}

async fn remove(state: &PublisherState, name: &str) -> PublishResult<RemoveResponse> {
    let removed = state
        .store
        .remove_repository(name)
        .await?
        .ok_or_else(|| PublishError::UnknownRepository(name.to_string()))?;
    let active = state.store.get_active_repository().await?.map(|r| r.name);
    Ok(RemoveResponse {
        removed,
        active,
        files_retained: true,
    })
}

pub async fn remove_repository(
    state: &PublisherState,
    params: RepositoryNameParams,
) -> Result<CallToolResult, McpError> {
    respond(remove(state, params.name.trim()).await)
}

async fn patch_repository(
    state: &PublisherState,
    name: &str,
    patch: RepositoryPatch,
) -> PublishResult<RepositoryRecord> {
    state
        .store
        .update_repository(name, patch)
        .await?
        .ok_or_else(|| PublishError::UnknownRepository(name.to_string()))
}

pub async fn update_repository(
    state: &PublisherState,
    params: UpdateRepositoryParams,
) -> Result<CallToolResult, McpError> {
    let patch = RepositoryPatch {
        local_path: params
            .local_path
            .as_deref()
            .map(|p| expand_home(p.trim(), &state.home_dir)),
        remote_url: params.remote_url,
        published_url: params.published_url,
        metadata: params.metadata.unwrap_or_default(),
    };
    respond(patch_repository(state, params.name.trim(), patch).await)
}

// ============================================================================
// Settings
// ============================================================================

pub async fn get_config(state: &PublisherState) -> Result<CallToolResult, McpError> {
    respond(state.store.read().await.map_err(PublishError::from))
}

pub async fn configure(
    state: &PublisherState,
    params: ConfigureParams,
) -> Result<CallToolResult, McpError> {
    let patch = SettingsPatch {
        default_repo_name: params.default_repo_name,
        auto_commit: params.auto_commit,
        commit_message: params.commit_message,
        debug: params.debug,
        local_template_path: params.local_template_path,
    };
    if patch.is_empty() {
        return Err(invalid_params("No settings provided"));
    }

    respond(
        state
            .store
            .update_settings(patch)
            .await
            .map_err(PublishError::from),
    )
}
