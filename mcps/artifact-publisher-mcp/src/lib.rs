//! Artifact Publisher MCP Library
//!
//! Publishes code artifacts (React components, HTML pages, SVG, Markdown,
//! Mermaid diagrams) into a personal static-site repository and keeps a
//! registry of those repositories in `~/.artifact-publisher.json`.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use artifact_publisher_mcp::ArtifactPublisherServer;
//! use publisher_config::{ConfigStore, DefaultOptions};
//!
//! let store = ConfigStore::new(ConfigStore::default_path(), DefaultOptions::default());
//! let server = ArtifactPublisherServer::new(store, None);
//! // Serve via stdio or an in-memory transport
//! ```

pub mod artifact;
pub mod cli;
pub mod error;
pub mod handlers;
pub mod init;
pub mod params;
pub mod response;
pub mod server;
pub mod template;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export main server type
pub use server::ArtifactPublisherServer;

// Re-export parameter types for direct API usage
pub use params::*;
