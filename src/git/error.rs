//! Git operation error types

use crate::error::DetectionError;
use crate::subprocess::ProcessError;
use thiserror::Error;

/// Git-specific errors
#[derive(Debug, Error)]
pub enum GitError {
    #[error("invalid repository URL {url}: {detail}")]
    InvalidUrl { url: String, detail: String },

    #[error("unsupported Git host: {0}")]
    UnsupportedHost(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Revision not found: {0}")]
    RevisionNotFound(String),

    #[error("Could not determine the default branch of {0}")]
    DefaultBranchUnknown(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Git command failed: {0}")]
    CommandFailed(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Failed to run git: {0}")]
    Process(#[from] ProcessError),
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Repository(err.message().to_string())
    }
}

/// Convert GitError to the user-facing taxonomy
impl From<GitError> for DetectionError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::InvalidUrl { url, detail } => DetectionError::invalid_url(&url, detail),
            GitError::UnsupportedHost(host) => DetectionError::unsupported_host(&host),
            GitError::AuthenticationFailed => DetectionError::authentication_failed(),
            other => DetectionError::internal(other.to_string()).with_source(other),
        }
    }
}
