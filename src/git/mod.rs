//! Repository access
//!
//! Fetches a shallow copy of a GitHub repository at a revision (or the
//! default branch) into a caller-owned directory, and resolves default
//! branches without cloning when only remote metadata is needed.

pub mod error;
pub mod parsers;
pub mod url;

pub use error::GitError;
pub use url::GitHubRepo;

use crate::subprocess::{ProcessCommandBuilder, ProcessOutput, ProcessRunner};
use async_trait::async_trait;
use base64::Engine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// A repository checked out on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRepo {
    /// Root of the working tree
    pub root: PathBuf,
    /// Revision the tree was taken from; the default branch name when none was requested
    pub revision: String,
}

/// Read-only access to remote repositories
#[async_trait]
pub trait GitAccessor: Send + Sync {
    /// Fetch `repo` at `revision` into `dest`, which must be empty or absent
    async fn fetch(
        &self,
        repo: &GitHubRepo,
        revision: Option<&str>,
        token: Option<&str>,
        dest: &Path,
    ) -> Result<FetchedRepo, GitError>;

    /// Name of the branch the remote HEAD points at
    async fn default_branch(
        &self,
        repo: &GitHubRepo,
        token: Option<&str>,
    ) -> Result<String, GitError>;
}

/// Production implementation backed by the `git` binary
pub struct GitCloner {
    process_runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl GitCloner {
    pub fn new(process_runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self {
            process_runner,
            timeout,
        }
    }

    /// Execute `git <subcommand>` against a remote
    async fn run_git_command(
        &self,
        subcommand: &str,
        args: Vec<String>,
        token: Option<&str>,
    ) -> Result<ProcessOutput, GitError> {
        let command = ProcessCommandBuilder::git(subcommand)
            .args(args)
            .envs(auth_env(token)?)
            .timeout(self.timeout)
            .build();

        Ok(self.process_runner.run(command).await?)
    }
}

/// Environment for authenticated git access.
///
/// The token travels as an extra HTTP header through git's environment
/// config so it never appears on the command line or in the clone's config.
fn auth_env(token: Option<&str>) -> Result<Vec<(String, String)>, GitError> {
    let mut env = Vec::new();

    if let Some(token) = token {
        if token.is_empty() {
            return Err(GitError::AuthenticationFailed);
        }
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("x-access-token:{token}"));
        env.extend([
            ("GIT_CONFIG_COUNT".to_string(), "1".to_string()),
            (
                "GIT_CONFIG_KEY_0".to_string(),
                "http.https://github.com/.extraheader".to_string(),
            ),
            (
                "GIT_CONFIG_VALUE_0".to_string(),
                format!("AUTHORIZATION: basic {credentials}"),
            ),
        ]);
    }

    Ok(env)
}

/// Read the branch a freshly cloned repository has checked out.
///
/// Uses the symbolic target of HEAD so repositories without any commits
/// still report their branch.
async fn checked_out_branch(root: &Path) -> Result<String, GitError> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let repo = git2::Repository::open(&root)?;
        let head = repo.find_reference("HEAD")?;
        head.symbolic_target()
            .and_then(parsers::branch_from_symbolic_target)
            .ok_or_else(|| GitError::DefaultBranchUnknown(root.display().to_string()))
    })
    .await
    .map_err(|e| GitError::Repository(format!("branch lookup task failed: {e}")))?
}

#[async_trait]
impl GitAccessor for GitCloner {
    async fn fetch(
        &self,
        repo: &GitHubRepo,
        revision: Option<&str>,
        token: Option<&str>,
        dest: &Path,
    ) -> Result<FetchedRepo, GitError> {
        let mut args: Vec<String> = vec![
            "--quiet".into(),
            "--depth".into(),
            "1".into(),
            "--single-branch".into(),
        ];
        if let Some(rev) = revision {
            args.push("--branch".into());
            args.push(rev.to_string());
        }
        args.push("--".into());
        args.push(repo.clone_url());
        args.push(dest.to_string_lossy().to_string());

        tracing::debug!(
            "Cloning {}/{} at {}",
            repo.owner,
            repo.name,
            revision.unwrap_or("default branch")
        );

        let output = self.run_git_command("clone", args, token).await?;
        if !output.status.success() {
            return Err(parsers::classify_failure(&output.stderr, revision));
        }

        let revision = match revision {
            Some(rev) => rev.to_string(),
            None => checked_out_branch(dest).await?,
        };

        Ok(FetchedRepo {
            root: dest.to_path_buf(),
            revision,
        })
    }

    async fn default_branch(
        &self,
        repo: &GitHubRepo,
        token: Option<&str>,
    ) -> Result<String, GitError> {
        let args = vec![
            "--symref".to_string(),
            repo.clone_url(),
            "HEAD".to_string(),
        ];

        let output = self.run_git_command("ls-remote", args, token).await?;
        if !output.status.success() {
            return Err(parsers::classify_failure(&output.stderr, None));
        }

        parsers::parse_symref_head(&output.stdout)
            .ok_or_else(|| GitError::DefaultBranchUnknown(repo.url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::MockProcessRunner;
    use tempfile::TempDir;

    fn repo() -> GitHubRepo {
        GitHubRepo::parse("https://github.com/devfile-samples/devfile-sample-python-basic")
            .unwrap()
    }

    fn init_at_last_arg(
        branch: &'static str,
    ) -> impl Fn(&crate::subprocess::ProcessCommand) + Send + Sync + 'static {
        move |cmd| {
            let dest = cmd.args.last().unwrap();
            let repo = git2::Repository::init(dest).unwrap();
            repo.set_head(&format!("refs/heads/{branch}")).unwrap();
        }
    }

    #[tokio::test]
    async fn test_fetch_reads_default_branch_of_empty_clone() {
        let mock = MockProcessRunner::new();
        mock.expect_git("clone")
            .with_side_effect(init_at_last_arg("trunk"))
            .returns_success()
            .finish();

        let temp = TempDir::new().unwrap();
        let cloner = GitCloner::new(Arc::new(mock.clone()), Duration::from_secs(5));
        let fetched = cloner
            .fetch(&repo(), None, None, temp.path())
            .await
            .unwrap();

        assert_eq!(fetched.revision, "trunk");
        assert_eq!(fetched.root, temp.path());

        let history = mock.call_history();
        assert_eq!(history[0].args[0], "clone");
        assert!(!history[0].args.contains(&"--branch".to_string()));
        assert_eq!(history[0].env.get("GIT_TERMINAL_PROMPT").unwrap(), "0");
        assert!(!history[0].env.contains_key("GIT_CONFIG_COUNT"));
    }

    #[tokio::test]
    async fn test_fetch_with_revision_and_token() {
        let mock = MockProcessRunner::new();
        mock.expect_git("clone").returns_success().finish();

        let temp = TempDir::new().unwrap();
        let cloner = GitCloner::new(Arc::new(mock.clone()), Duration::from_secs(5));
        let fetched = cloner
            .fetch(&repo(), Some("testbranch"), Some("s3cret"), temp.path())
            .await
            .unwrap();
        assert_eq!(fetched.revision, "testbranch");

        let call = &mock.call_history()[0];
        let branch_pos = call.args.iter().position(|a| a == "--branch").unwrap();
        assert_eq!(call.args[branch_pos + 1], "testbranch");
        assert!(call
            .args
            .contains(&"https://github.com/devfile-samples/devfile-sample-python-basic.git".to_string()));
        assert!(!call.args.iter().any(|a| a.contains("s3cret")));

        let header = call.env.get("GIT_CONFIG_VALUE_0").unwrap();
        let expected = base64::engine::general_purpose::STANDARD.encode("x-access-token:s3cret");
        assert_eq!(header, &format!("AUTHORIZATION: basic {expected}"));
    }

    #[tokio::test]
    async fn test_fetch_auth_failure() {
        let mock = MockProcessRunner::new();
        mock.expect_git("clone")
            .returns_exit_code(128)
            .returns_stderr("remote: Repository not found.\nfatal: Authentication failed for 'https://github.com/a/b.git/'\n")
            .finish();

        let temp = TempDir::new().unwrap();
        let cloner = GitCloner::new(Arc::new(mock), Duration::from_secs(5));
        let err = cloner
            .fetch(&repo(), None, Some("bad"), temp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_empty_token_rejected_before_running_git() {
        let mock = MockProcessRunner::new();
        let temp = TempDir::new().unwrap();
        let cloner = GitCloner::new(Arc::new(mock.clone()), Duration::from_secs(5));
        let err = cloner
            .fetch(&repo(), None, Some(""), temp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::AuthenticationFailed));
        assert_eq!(mock.git_calls("clone"), 0);
    }

    #[tokio::test]
    async fn test_default_branch_via_ls_remote() {
        let mock = MockProcessRunner::new();
        mock.expect_git("ls-remote")
            .returns_stdout("ref: refs/heads/main\tHEAD\nabc123\tHEAD\n")
            .finish();

        let cloner = GitCloner::new(Arc::new(mock.clone()), Duration::from_secs(5));
        let branch = cloner.default_branch(&repo(), None).await.unwrap();
        assert_eq!(branch, "main");
        assert_eq!(mock.git_calls("ls-remote"), 1);
        assert_eq!(mock.git_calls("clone"), 0);
    }

    #[tokio::test]
    async fn test_default_branch_unparseable() {
        let mock = MockProcessRunner::new();
        mock.expect_git("ls-remote").returns_stdout("").finish();

        let cloner = GitCloner::new(Arc::new(mock), Duration::from_secs(5));
        let err = cloner.default_branch(&repo(), None).await.unwrap_err();
        assert!(matches!(err, GitError::DefaultBranchUnknown(_)));
    }
}
