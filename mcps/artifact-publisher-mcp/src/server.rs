//! MCP Server implementation for artifact publishing
//!
//! This module defines the server that exposes repository setup, publishing
//! and registry management as tools. Handler implementations are in the
//! handlers module.

use publisher_config::ConfigStore;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError,
};

use crate::handlers::{self, PublisherState};
use crate::params::*;

/// The main Artifact Publisher MCP Server
#[derive(Clone)]
pub struct ArtifactPublisherServer {
    state: PublisherState,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Tool Router - Each tool delegates to its handler
// ============================================================================

#[tool_router]
impl ArtifactPublisherServer {
    pub fn new(store: ConfigStore, template_repo: Option<String>) -> Self {
        Self::with_state(PublisherState::new(store, template_repo))
    }

    pub fn with_state(state: PublisherState) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    pub fn state(&self) -> &PublisherState {
        &self.state
    }

    // ========================================================================
    // Repository Setup
    // ========================================================================

    #[tool(
        description = "Create a new artifact gallery repository from the site template, initialize git, optionally create and push a GitHub repository, and register it."
    )]
    async fn initialize_repository(
        &self,
        Parameters(params): Parameters<InitializeRepositoryParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::initialize_repository(&self.state, params).await
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    #[tool(
        description = "Publish a code artifact (react, html, svg, markdown, mermaid) to the active or named repository, update the gallery manifest, and commit/push it."
    )]
    async fn publish_artifact(
        &self,
        Parameters(params): Parameters<PublishArtifactParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::publish_artifact(&self.state, params).await
    }

    #[tool(description = "List artifacts published to the active or named repository")]
    async fn list_artifacts(
        &self,
        Parameters(params): Parameters<ListArtifactsParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::list_artifacts(&self.state, params).await
    }

    // ========================================================================
    // Registry
    // ========================================================================

    #[tool(description = "List registered repositories and the active one")]
    async fn list_repositories(&self) -> Result<CallToolResult, McpError> {
        handlers::list_repositories(&self.state).await
    }

    #[tool(description = "Select a registered repository as the active publishing target")]
    async fn switch_repository(
        &self,
        Parameters(params): Parameters<RepositoryNameParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::switch_repository(&self.state, params).await
    }

    #[tool(
        description = "Remove a repository from the registry. Files on disk and on GitHub are left untouched."
    )]
    async fn remove_repository(
        &self,
        Parameters(params): Parameters<RepositoryNameParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::remove_repository(&self.state, params).await
    }

    #[tool(description = "Update a repository's path, remote URL, published URL or metadata")]
    async fn update_repository(
        &self,
        Parameters(params): Parameters<UpdateRepositoryParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::update_repository(&self.state, params).await
    }

    // ========================================================================
    // Settings
    // ========================================================================

    #[tool(description = "Show the full publisher configuration")]
    async fn get_config(&self) -> Result<CallToolResult, McpError> {
        handlers::get_config(&self.state).await
    }

    #[tool(description = "Change preferences (default repo name, auto-commit, commit message), debug mode or the local template path")]
    async fn configure(
        &self,
        Parameters(params): Parameters<ConfigureParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::configure(&self.state, params).await
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for ArtifactPublisherServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Publishes code artifacts into a personal static-site repository. \
                 Run initialize_repository once to create a gallery, then publish_artifact \
                 to add artifacts to the active repository. Use switch_repository to change \
                 the target."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
