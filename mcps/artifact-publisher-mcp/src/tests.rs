//! Tests for artifact-publisher tool handlers

use publisher_config::{ConfigStore, DefaultOptions, RepositoryRecord};
use rmcp::model::{CallToolResult, RawContent};
use serde_json::Value;
use tempfile::TempDir;

use crate::artifact::ArtifactKind;
use crate::handlers::{self, PublisherState};
use crate::params::*;
use crate::response::NO_ACTIVE_REPOSITORY;

/// State rooted in a temp dir: config file and default repo parent both inside
fn create_test_state(dir: &TempDir) -> PublisherState {
    let store = ConfigStore::new(dir.path().join("config.json"), DefaultOptions::default());
    PublisherState {
        store,
        template_repo: None,
        home_dir: dir.path().join("home"),
    }
}

fn text_of(result: &CallToolResult) -> String {
    match &result.content[0].raw {
        RawContent::Text(t) => t.text.clone(),
        _ => String::new(),
    }
}

fn json_of(result: &CallToolResult) -> Value {
    assert!(!result.is_error.unwrap_or(false), "tool failed: {}", text_of(result));
    serde_json::from_str(&text_of(result)).unwrap()
}

fn assert_failure(result: &CallToolResult, expected: &str) {
    assert!(result.is_error.unwrap_or(false), "expected failure");
    assert_eq!(text_of(result), expected);
}

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Register a plain directory as a repository
async fn register(state: &PublisherState, dir: &TempDir, name: &str) -> RepositoryRecord {
    let path = dir.path().join(name);
    std::fs::create_dir_all(&path).unwrap();
    state
        .store
        .upsert_repository(RepositoryRecord::new(name, &path))
        .await
        .unwrap()
}

async fn disable_auto_commit(state: &PublisherState) {
    handlers::configure(
        state,
        ConfigureParams {
            auto_commit: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
}

fn publish_params(title: &str, kind: ArtifactKind, code: &str) -> PublishArtifactParams {
    PublishArtifactParams {
        title: title.to_string(),
        kind,
        code: code.to_string(),
        description: None,
        repository: None,
        commit: None,
    }
}

// ============================================================================
// No active repository
// ============================================================================

#[tokio::test]
async fn test_publish_without_active_repository_returns_guidance() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);

    let result = handlers::publish_artifact(&state, publish_params("A", ArtifactKind::Markdown, "# a"))
        .await
        .unwrap();
    assert_failure(&result, NO_ACTIVE_REPOSITORY);

    let result = handlers::list_artifacts(&state, ListArtifactsParams { repository: None })
        .await
        .unwrap();
    assert_failure(&result, NO_ACTIVE_REPOSITORY);
}

#[tokio::test]
async fn test_list_repositories_empty() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);

    let result = handlers::list_repositories(&state).await.unwrap();
    let json = json_of(&result);
    assert_eq!(json["total"], 0);
    assert!(json["active"].is_null());
    assert!(state.store.exists().await);
}

// ============================================================================
// Registry tools
// ============================================================================

#[tokio::test]
async fn test_switch_and_list_repositories() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    register(&state, &dir, "alpha").await;
    register(&state, &dir, "beta").await;

    let json = json_of(&handlers::list_repositories(&state).await.unwrap());
    assert_eq!(json["active"], "alpha");
    assert_eq!(json["total"], 2);

    let result = handlers::switch_repository(
        &state,
        RepositoryNameParams {
            name: "beta".to_string(),
        },
    )
    .await
    .unwrap();
    let json = json_of(&result);
    assert_eq!(json["name"], "beta");
    assert_eq!(json["isActive"], true);

    let json = json_of(&handlers::list_repositories(&state).await.unwrap());
    assert_eq!(json["active"], "beta");
    assert_eq!(json["repositories"][0]["isActive"], false);
}

#[tokio::test]
async fn test_switch_unknown_repository_fails() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    register(&state, &dir, "alpha").await;

    let result = handlers::switch_repository(
        &state,
        RepositoryNameParams {
            name: "ghost".to_string(),
        },
    )
    .await
    .unwrap();
    assert_failure(&result, "Operation failed: repository not found: ghost");
}

#[tokio::test]
async fn test_remove_active_repository_promotes_next() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    let alpha = register(&state, &dir, "alpha").await;
    register(&state, &dir, "beta").await;

    let result = handlers::remove_repository(
        &state,
        RepositoryNameParams {
            name: "alpha".to_string(),
        },
    )
    .await
    .unwrap();
    let json = json_of(&result);
    assert_eq!(json["removed"]["name"], "alpha");
    assert_eq!(json["active"], "beta");
    assert!(alpha.local_path.exists());

    let result = handlers::remove_repository(
        &state,
        RepositoryNameParams {
            name: "alpha".to_string(),
        },
    )
    .await
    .unwrap();
    assert_failure(&result, "Operation failed: repository not found: alpha");
}

#[tokio::test]
async fn test_update_repository() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    register(&state, &dir, "alpha").await;

    let mut metadata = serde_json::Map::new();
    metadata.insert("theme".to_string(), Value::from("dark"));
    let result = handlers::update_repository(
        &state,
        UpdateRepositoryParams {
            name: "alpha".to_string(),
            local_path: None,
            remote_url: Some("https://github.com/me/alpha.git".to_string()),
            published_url: Some("https://me.github.io/alpha/".to_string()),
            metadata: Some(metadata),
        },
    )
    .await
    .unwrap();
    let json = json_of(&result);
    assert_eq!(json["remoteUrl"], "https://github.com/me/alpha.git");
    assert_eq!(json["metadata"]["theme"], "dark");

    let result = handlers::update_repository(
        &state,
        UpdateRepositoryParams {
            name: "ghost".to_string(),
            local_path: None,
            remote_url: None,
            published_url: None,
            metadata: None,
        },
    )
    .await
    .unwrap();
    assert!(result.is_error.unwrap_or(false));
}

// ============================================================================
// Settings tools
// ============================================================================

#[tokio::test]
async fn test_configure_and_get_config() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);

    let result = handlers::configure(
        &state,
        ConfigureParams {
            default_repo_name: Some("my-gallery".to_string()),
            commit_message: Some("Add".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let json = json_of(&result);
    assert_eq!(json["preferences"]["defaultRepoName"], "my-gallery");

    let json = json_of(&handlers::get_config(&state).await.unwrap());
    assert_eq!(json["version"], "1.0.0");
    assert_eq!(json["preferences"]["commitMessage"], "Add");
    assert_eq!(json["preferences"]["autoCommit"], true);
    assert!(json["repositories"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_configure_without_fields_is_invalid() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);

    let result = handlers::configure(&state, ConfigureParams::default()).await;
    assert!(result.is_err());
}

// ============================================================================
// Publishing
// ============================================================================

#[tokio::test]
async fn test_publish_to_active_repository() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    let repo = register(&state, &dir, "alpha").await;
    disable_auto_commit(&state).await;
    state
        .store
        .update_repository(
            "alpha",
            publisher_config::RepositoryPatch {
                published_url: Some("https://me.github.io/alpha/".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = handlers::publish_artifact(
        &state,
        PublishArtifactParams {
            description: Some("A bar chart".to_string()),
            ..publish_params("Sales Chart", ArtifactKind::Svg, "<svg viewBox=\"0 0 1 1\"></svg>")
        },
    )
    .await
    .unwrap();
    let json = json_of(&result);

    assert_eq!(json["repository"], "alpha");
    assert_eq!(json["artifact"]["slug"], "sales-chart");
    assert_eq!(json["committed"], false);
    assert_eq!(json["artifactUrl"], "https://me.github.io/alpha/artifacts/sales-chart");
    assert!(repo.local_path.join("src/artifacts/sales-chart.svg").exists());

    let listed = json_of(
        &handlers::list_artifacts(&state, ListArtifactsParams { repository: None })
            .await
            .unwrap(),
    );
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["artifacts"][0]["description"], "A bar chart");

    let touched = state.store.get_repository("alpha").await.unwrap().unwrap();
    assert!(touched.last_used_at >= repo.last_used_at);
}

#[tokio::test]
async fn test_publish_to_named_repository() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    register(&state, &dir, "alpha").await;
    let beta = register(&state, &dir, "beta").await;
    disable_auto_commit(&state).await;

    let result = handlers::publish_artifact(
        &state,
        PublishArtifactParams {
            repository: Some("beta".to_string()),
            ..publish_params("Notes", ArtifactKind::Markdown, "# Notes")
        },
    )
    .await
    .unwrap();
    let json = json_of(&result);
    assert_eq!(json["repository"], "beta");
    assert!(beta.local_path.join("src/artifacts/notes.md").exists());

    let active = state.store.get_active_repository().await.unwrap().unwrap();
    assert_eq!(active.name, "alpha");

    let result = handlers::publish_artifact(
        &state,
        PublishArtifactParams {
            repository: Some("ghost".to_string()),
            ..publish_params("Notes", ArtifactKind::Markdown, "# Notes")
        },
    )
    .await
    .unwrap();
    assert_failure(&result, "Operation failed: repository not found: ghost");
}

#[tokio::test]
async fn test_publish_invalid_artifact_fails() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    register(&state, &dir, "alpha").await;

    let result = handlers::publish_artifact(&state, publish_params("Logo", ArtifactKind::Svg, "<div/>"))
        .await
        .unwrap();
    assert_failure(&result, "Operation failed: svg artifact must contain an <svg> element");
}

#[tokio::test]
async fn test_publish_to_missing_working_copy_fails() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    let repo = register(&state, &dir, "alpha").await;
    std::fs::remove_dir_all(&repo.local_path).unwrap();

    let result = handlers::publish_artifact(&state, publish_params("A", ArtifactKind::Markdown, "# a"))
        .await
        .unwrap();
    assert!(result.is_error.unwrap_or(false));
    assert!(text_of(&result).starts_with("Operation failed: repository working copy is missing"));
}

// ============================================================================
// Repository setup
// ============================================================================

#[tokio::test]
async fn test_initialize_refuses_non_empty_target() {
    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    let target = dir.path().join("occupied");
    std::fs::create_dir_all(&target).unwrap();
    std::fs::write(target.join("README.md"), "mine").unwrap();

    let result = handlers::initialize_repository(
        &state,
        InitializeRepositoryParams {
            name: Some("occupied".to_string()),
            path: Some(target.display().to_string()),
            create_remote: false,
            private: false,
            activate: true,
        },
    )
    .await
    .unwrap();
    assert!(result.is_error.unwrap_or(false));
    assert!(text_of(&result).contains("target directory is not empty"));
    assert_eq!(std::fs::read_to_string(target.join("README.md")).unwrap(), "mine");
    assert!(state.store.get_repositories().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_initialize_local_repository() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }

    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    register(&state, &dir, "existing").await;

    let result = handlers::initialize_repository(
        &state,
        InitializeRepositoryParams {
            name: None,
            path: None,
            create_remote: false,
            private: false,
            activate: true,
        },
    )
    .await
    .unwrap();
    let json = json_of(&result);

    let expected = dir.path().join("home").join("artifact-gallery");
    assert_eq!(json["repository"]["name"], "artifact-gallery");
    assert_eq!(json["template"], "builtin");
    assert_eq!(json["active"], true);
    assert_eq!(json["remoteCreated"], false);
    assert!(expected.join(".git").exists());
    assert!(expected.join("src/artifacts/manifest.json").exists());

    let active = state.store.get_active_repository().await.unwrap().unwrap();
    assert_eq!(active.name, "artifact-gallery");

    // Same name again is rejected
    let result = handlers::initialize_repository(
        &state,
        InitializeRepositoryParams {
            name: Some("artifact-gallery".to_string()),
            path: Some(dir.path().join("elsewhere").display().to_string()),
            create_remote: false,
            private: false,
            activate: true,
        },
    )
    .await
    .unwrap();
    assert_failure(&result, "Operation failed: repository already registered: artifact-gallery");
}

#[tokio::test]
async fn test_concurrent_initialize_registers_name_once() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }

    let dir = TempDir::new().unwrap();
    let state = create_test_state(&dir);
    let params = |path: &str| InitializeRepositoryParams {
        name: Some("gallery".to_string()),
        path: Some(dir.path().join(path).display().to_string()),
        create_remote: false,
        private: false,
        activate: true,
    };

    let (first, second) = tokio::join!(
        handlers::initialize_repository(&state, params("first")),
        handlers::initialize_repository(&state, params("second")),
    );
    let results = [first.unwrap(), second.unwrap()];
    let failed: Vec<&CallToolResult> = results
        .iter()
        .filter(|r| r.is_error.unwrap_or(false))
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(
        text_of(failed[0]),
        "Operation failed: repository already registered: gallery"
    );

    let repositories = state.store.get_repositories().await.unwrap();
    assert_eq!(repositories.len(), 1);
    let winner = results
        .iter()
        .find(|r| !r.is_error.unwrap_or(false))
        .map(json_of)
        .unwrap();
    assert_eq!(
        winner["repository"]["localPath"],
        repositories[0].local_path.display().to_string()
    );
}
