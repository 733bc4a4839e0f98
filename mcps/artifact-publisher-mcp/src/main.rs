//! Artifact Publisher MCP Server
//!
//! Publishes code artifacts into a personal static-site repository over the
//! MCP stdio transport.
//!
//! # Usage
//!
//! Run directly:
//! ```bash
//! artifact-publisher-mcp --template-repo https://github.com/me/gallery-template.git
//! ```
//!
//! Or configure in `.mcp.json`:
//! ```json
//! {
//!   "mcpServers": {
//!     "artifact-publisher": {
//!       "command": "artifact-publisher-mcp"
//!     }
//!   }
//! }
//! ```

use std::path::PathBuf;

use artifact_publisher_mcp::{cli, init::init_tracing, ArtifactPublisherServer};
use clap::Parser;
use publisher_config::{ConfigStore, DefaultOptions};
use rmcp::{transport::stdio, ServiceExt};

#[derive(Parser, Debug)]
#[command(name = "artifact-publisher-mcp")]
#[command(about = "MCP server that publishes code artifacts to a static-site repository")]
struct Cli {
    /// Configuration file (default: ~/.artifact-publisher.json)
    #[arg(long, env = "ARTIFACT_PUBLISHER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging and seed debug mode in a new configuration
    #[arg(long, env = "ARTIFACT_PUBLISHER_DEBUG")]
    debug: bool,

    /// Local template directory used when a new configuration is created
    #[arg(long, env = "ARTIFACT_PUBLISHER_TEMPLATE_PATH")]
    template_path: Option<String>,

    /// Template repository cloned when no local template is configured
    #[arg(long, env = "ARTIFACT_PUBLISHER_TEMPLATE_REPO")]
    template_repo: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug)?;

    tracing::info!("Starting Artifact Publisher MCP server");

    let defaults = DefaultOptions {
        debug: args.debug,
        local_template_path: args.template_path,
    };
    let path = args.config.unwrap_or_else(ConfigStore::default_path);
    let store = ConfigStore::new(path, defaults);
    tracing::info!(config = %store.path().display(), "using configuration file");

    // Errors are reported per tool call
    if let Err(e) = cli::check_gh_available().await {
        tracing::warn!("gh CLI check failed: {}", e);
    }

    let server = ArtifactPublisherServer::new(store, args.template_repo);
    let service = server.serve(stdio()).await?;

    tracing::info!("Server running, waiting for requests...");

    service.waiting().await?;

    tracing::info!("Server shutting down");
    Ok(())
}
