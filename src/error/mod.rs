//! Error taxonomy for component detection
//!
//! Everything that can go wrong while analysing a repository ends up as a
//! [`DetectionError`]: a stable [`ErrorTag`] plus a user-actionable message.
//! Module-level errors (`GitError`, `LocatorError`, `FetchError`, ...) are
//! converted at the runner boundary through the `From` impls in their modules.

use std::fmt::Display;
use thiserror::Error;

pub mod codes;

pub use codes::{ErrorTag, UnknownTag};

/// User-facing detection failure
#[derive(Error, Debug)]
#[error("{message}")]
pub struct DetectionError {
    tag: ErrorTag,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DetectionError {
    fn new(tag: ErrorTag, message: impl Into<String>) -> Self {
        Self {
            tag,
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_url(url: &str, detail: impl Display) -> Self {
        Self::new(ErrorTag::InvalidUrl, format!("parse \"{url}\": {detail}"))
    }

    pub fn unsupported_host(host: &str) -> Self {
        Self::new(
            ErrorTag::UnsupportedHost,
            format!("unsupported Git host \"{host}\": only GitHub repositories are supported"),
        )
    }

    pub fn authentication_failed() -> Self {
        Self::new(ErrorTag::AuthenticationFailed, "authentication failed")
    }

    pub fn secret_not_found(name: &str) -> Self {
        Self::new(ErrorTag::SecretNotFound, format!("Secret \"{name}\" not found"))
    }

    pub fn devfile_fetch_failed(url: &str) -> Self {
        Self::new(
            ErrorTag::DevfileFetchFailed,
            format!("unable to GET from {url}"),
        )
    }

    pub fn invalid_devfile(detail: impl Display) -> Self {
        Self::new(
            ErrorTag::InvalidDevfile,
            format!("cannot unmarshal devfile content: {detail}"),
        )
    }

    pub fn invalid_outerloop(context: &str) -> Self {
        Self::new(
            ErrorTag::InvalidOuterloopDevfile,
            format!(
                "devfile at context \"{context}\" does not contain a valid outerloop definition"
            ),
        )
    }

    pub fn internal(detail: impl Display) -> Self {
        Self::new(ErrorTag::InternalError, format!("internal error: {detail}"))
    }

    /// Rebuild an error read back from a worker's `errorMap` entry.
    ///
    /// The message is kept verbatim; an unknown tag degrades to `InternalError`.
    pub fn from_tagged(tag: &str, message: impl Into<String>) -> Self {
        let tag = tag.parse().unwrap_or(ErrorTag::InternalError);
        Self::new(tag, message)
    }

    /// Attach the underlying cause
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn tag(&self) -> ErrorTag {
        self.tag
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message plus the cause chain, for logs only
    pub fn developer_message(&self) -> String {
        let mut msg = self.message.clone();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            msg.push_str(&format!(": {cause}"));
            source = cause.source();
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_follow_taxonomy() {
        assert_eq!(
            DetectionError::secret_not_found("git-token").to_string(),
            "Secret \"git-token\" not found"
        );
        assert_eq!(
            DetectionError::authentication_failed().to_string(),
            "authentication failed"
        );
        assert_eq!(
            DetectionError::devfile_fetch_failed("https://registry.devfile.io/devfiles/fake")
                .to_string(),
            "unable to GET from https://registry.devfile.io/devfiles/fake"
        );
        assert!(DetectionError::internal("boom")
            .to_string()
            .starts_with("internal error: "));
        assert!(DetectionError::invalid_outerloop("./")
            .to_string()
            .contains("does not contain a valid outerloop definition"));
    }

    #[test]
    fn test_from_tagged_keeps_message() {
        let err = DetectionError::from_tagged("AuthenticationFailed", "authentication failed");
        assert_eq!(err.tag(), ErrorTag::AuthenticationFailed);
        assert_eq!(err.message(), "authentication failed");

        let err = DetectionError::from_tagged("Bogus", "something odd");
        assert_eq!(err.tag(), ErrorTag::InternalError);
        assert_eq!(err.to_string(), "something odd");
    }

    #[test]
    fn test_developer_message_includes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = DetectionError::internal("clone failed").with_source(io);
        assert_eq!(
            err.developer_message(),
            "internal error: clone failed: disk on fire"
        );
    }
}
