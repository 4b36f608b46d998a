//! GitHub repository URL handling

use super::error::GitError;
use url::Url;

const GITHUB_HOSTS: &[&str] = &["github.com", "www.github.com"];

/// A repository on GitHub, parsed from a user-supplied URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRepo {
    /// The URL as given, trimmed of surrounding whitespace
    pub url: String,
    pub owner: String,
    pub name: String,
}

impl GitHubRepo {
    pub fn parse(raw: &str) -> Result<Self, GitError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid(trimmed, "empty URL"));
        }

        check_escapes(trimmed).map_err(|detail| invalid(trimmed, detail))?;

        let parsed = Url::parse(trimmed).map_err(|e| invalid(trimmed, e))?;
        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(invalid(
                trimmed,
                format!("unsupported scheme \"{}\"", parsed.scheme()),
            ));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| invalid(trimmed, "missing host"))?
            .to_ascii_lowercase();
        if !GITHUB_HOSTS.contains(&host.as_str()) {
            return Err(GitError::UnsupportedHost(host));
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() < 2 {
            return Err(invalid(trimmed, "missing repository owner or name"));
        }

        let owner = segments[0].to_string();
        let name = segments[1].trim_end_matches(".git").to_string();
        if name.is_empty() {
            return Err(invalid(trimmed, "missing repository name"));
        }

        Ok(Self {
            url: trimmed.to_string(),
            owner,
            name,
        })
    }

    /// HTTPS clone URL, independent of how the user spelled the input
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.name)
    }

    /// Raw content URL for a file at `path` on `revision`
    pub fn raw_file_url(&self, revision: &str, path: &str) -> String {
        let path = path.trim_start_matches("./").trim_start_matches('/');
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            self.owner, self.name, revision, path
        )
    }
}

fn invalid(url: &str, detail: impl ToString) -> GitError {
    GitError::InvalidUrl {
        url: url.to_string(),
        detail: detail.to_string(),
    }
}

/// Reject `%` sequences that are not followed by two hex digits.
///
/// The `url` crate silently re-encodes malformed escapes, so they are checked
/// on the raw input.
fn check_escapes(s: &str) -> Result<(), String> {
    let bytes = s.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'%' {
            continue;
        }
        let valid = i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit();
        if !valid {
            let escape: String = s[i..].chars().take(3).collect();
            return Err(format!("invalid URL escape \"{escape}\""));
        }
    }
    Ok(())
}
