use std::fmt;
use std::str::FromStr;

/// Stable tags for detection failures.
///
/// The string form of a tag is part of the controller's external contract: it
/// is the key of the single `errorMap` entry a worker writes and the `reason`
/// of a failed terminal condition. Never rename an existing tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorTag {
    InvalidUrl,
    UnsupportedHost,
    AuthenticationFailed,
    SecretNotFound,
    DevfileFetchFailed,
    InvalidDevfile,
    InvalidOuterloopDevfile,
    InternalError,
}

impl ErrorTag {
    pub const ALL: [ErrorTag; 8] = [
        ErrorTag::InvalidUrl,
        ErrorTag::UnsupportedHost,
        ErrorTag::AuthenticationFailed,
        ErrorTag::SecretNotFound,
        ErrorTag::DevfileFetchFailed,
        ErrorTag::InvalidDevfile,
        ErrorTag::InvalidOuterloopDevfile,
        ErrorTag::InternalError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::InvalidUrl => "InvalidURL",
            ErrorTag::UnsupportedHost => "UnsupportedHost",
            ErrorTag::AuthenticationFailed => "AuthenticationFailed",
            ErrorTag::SecretNotFound => "SecretNotFound",
            ErrorTag::DevfileFetchFailed => "DevfileFetchFailed",
            ErrorTag::InvalidDevfile => "InvalidDevfile",
            ErrorTag::InvalidOuterloopDevfile => "InvalidOuterloopDevfile",
            ErrorTag::InternalError => "InternalError",
        }
    }

    /// Whether the failure is caused by user input rather than the controller
    pub fn is_user_error(&self) -> bool {
        !matches!(self, ErrorTag::InternalError)
    }
}

impl fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error tag: {0}")]
pub struct UnknownTag(pub String);

impl FromStr for ErrorTag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorTag::ALL
            .iter()
            .find(|tag| tag.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_parse_back() {
        for tag in ErrorTag::ALL {
            assert_eq!(tag.as_str().parse::<ErrorTag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_unknown_tag() {
        let err = "Exploded".parse::<ErrorTag>().unwrap_err();
        assert_eq!(err.to_string(), "unknown error tag: Exploded");
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(ErrorTag::InvalidUrl.to_string(), "InvalidURL");
        assert!(!ErrorTag::InternalError.is_user_error());
        assert!(ErrorTag::SecretNotFound.is_user_error());
    }
}
