//! Error type shared by the tool handlers

use std::path::PathBuf;

use publisher_config::ConfigError;
use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::cli::CliError;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cli(#[from] CliError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("no active repository")]
    NoActiveRepository,

    #[error("repository not found: {0}")]
    UnknownRepository(String),

    #[error("repository already registered: {0}")]
    AlreadyRegistered(String),

    #[error("target directory is not empty: {}", .0.display())]
    TargetNotEmpty(PathBuf),

    #[error("repository working copy is missing: {}", .0.display())]
    MissingWorkingCopy(PathBuf),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type PublishResult<T> = Result<T, PublishError>;
