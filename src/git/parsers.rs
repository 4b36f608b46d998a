//! Git output parsers

use super::error::GitError;

/// Parse `git ls-remote --symref <url> HEAD` output for the default branch
///
/// Expected line: `ref: refs/heads/main\tHEAD`
pub fn parse_symref_head(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.strip_prefix("ref:")?.trim_start();
        let (target, name) = rest.split_once('\t')?;
        if name.trim() != "HEAD" {
            return None;
        }
        let branch = target.trim().strip_prefix("refs/heads/")?;
        (!branch.is_empty()).then(|| branch.to_string())
    })
}

/// Strip the `refs/heads/` prefix from a symbolic reference target
pub fn branch_from_symbolic_target(target: &str) -> Option<String> {
    target
        .strip_prefix("refs/heads/")
        .filter(|b| !b.is_empty())
        .map(str::to_string)
}

/// Map a failed clone or ls-remote to a typed error based on git's stderr
pub fn classify_failure(stderr: &str, revision: Option<&str>) -> GitError {
    let lower = stderr.to_ascii_lowercase();

    const AUTH_MARKERS: &[&str] = &[
        "authentication failed",
        "could not read username",
        "could not read password",
        "repository not found",
        "terminal prompts disabled",
        "error: 401",
        "error: 403",
        "returned error: 401",
        "returned error: 403",
    ];
    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        return GitError::AuthenticationFailed;
    }

    if lower.contains("remote branch") && lower.contains("not found")
        || lower.contains("couldn't find remote ref")
    {
        return GitError::RevisionNotFound(revision.unwrap_or("HEAD").to_string());
    }

    if lower.contains("could not resolve host")
        || lower.contains("failed to connect")
        || lower.contains("connection timed out")
        || lower.contains("connection reset")
    {
        return GitError::NetworkError(first_line(stderr));
    }

    GitError::CommandFailed(first_line(stderr))
}

fn first_line(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}
