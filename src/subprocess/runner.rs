use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::error::ProcessError;

/// Variables passed through to git when set; proxies in both spellings
const FORWARDED_ENV: &[&str] = &[
    "HOME",
    "TMPDIR",
    "LANG",
    "SSL_CERT_FILE",
    "SSL_CERT_DIR",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
    "http_proxy",
    "https_proxy",
    "no_proxy",
];

#[derive(Debug, Clone)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl ProcessCommand {
    fn display(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error(i32),
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Error(code) => Some(*code),
            ExitStatus::Signal(_) => None,
        }
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError>;
}

pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// Log command execution details.
    ///
    /// Only environment keys are logged; values may carry credentials.
    fn log_command_start(command: &ProcessCommand) {
        tracing::debug!("Executing subprocess: {}", command.display());

        if !command.env.is_empty() {
            let mut keys: Vec<&str> = command.env.keys().map(String::as_str).collect();
            keys.sort_unstable();
            tracing::trace!("Environment keys: {}", keys.join(", "));
        }
    }

    fn configure_command(command: &ProcessCommand) -> Result<tokio::process::Command, ProcessError> {
        let mut cmd = tokio::process::Command::new(&command.program);

        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        cmd.args(&command.args);

        // Start from a clean environment so nothing from the controller's own
        // environment (service account tokens) leaks into git.
        cmd.env_clear();
        Self::preserve_essential_env(&mut cmd, &command.program)?;

        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);
        Ok(cmd)
    }

    fn preserve_essential_env(
        cmd: &mut tokio::process::Command,
        program: &str,
    ) -> Result<(), ProcessError> {
        let path = std::env::var("PATH").map_err(|_| {
            tracing::error!("PATH is not set, cannot run '{}'", program);
            ProcessError::MissingEnvironment("PATH".to_string())
        })?;
        cmd.env("PATH", path);

        for var in FORWARDED_ENV {
            if let Ok(value) = std::env::var(var) {
                cmd.env(var, value);
            }
        }

        Ok(())
    }

    async fn wait_with_timeout(
        child: tokio::process::Child,
        timeout: Option<Duration>,
    ) -> Result<std::process::Output, ProcessError> {
        match timeout {
            Some(duration) => {
                match tokio::time::timeout(duration, child.wait_with_output()).await {
                    Ok(result) => result.map_err(ProcessError::Io),
                    Err(_) => Err(ProcessError::Timeout(duration)),
                }
            }
            None => child.wait_with_output().await.map_err(ProcessError::Io),
        }
    }

    fn parse_exit_status(status: std::process::ExitStatus) -> ExitStatus {
        if status.success() {
            ExitStatus::Success
        } else if let Some(code) = status.code() {
            ExitStatus::Error(code)
        } else {
            Self::parse_signal_status(status)
        }
    }

    #[cfg(unix)]
    fn parse_signal_status(status: std::process::ExitStatus) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        match status.signal() {
            Some(signal) => ExitStatus::Signal(signal),
            None => ExitStatus::Error(1),
        }
    }

    #[cfg(not(unix))]
    fn parse_signal_status(_status: std::process::ExitStatus) -> ExitStatus {
        ExitStatus::Error(1)
    }

    fn log_result(result: &ProcessOutput, command: &ProcessCommand) {
        match &result.status {
            ExitStatus::Success => {
                tracing::debug!(
                    "Subprocess completed successfully in {:?}: {}",
                    result.duration,
                    command.display()
                );
            }
            ExitStatus::Error(code) => {
                tracing::debug!(
                    "Subprocess failed with exit code {} in {:?}: {}",
                    code,
                    result.duration,
                    command.display()
                );
                if !result.stderr.is_empty() {
                    tracing::trace!("Stderr: {}", result.stderr);
                }
            }
            ExitStatus::Signal(signal) => {
                tracing::warn!(
                    "Subprocess terminated by signal {} in {:?}: {}",
                    signal,
                    result.duration,
                    command.display()
                );
            }
        }
    }

    fn map_spawn_error(error: std::io::Error, program: &str) -> ProcessError {
        if error.kind() == std::io::ErrorKind::NotFound {
            ProcessError::CommandNotFound(program.to_string())
        } else {
            ProcessError::Io(error)
        }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let start = Instant::now();
        Self::log_command_start(&command);

        let mut cmd = Self::configure_command(&command)?;
        let child = cmd
            .spawn()
            .map_err(|e| Self::map_spawn_error(e, &command.program))?;

        let output = Self::wait_with_timeout(child, command.timeout).await?;

        let result = ProcessOutput {
            status: Self::parse_exit_status(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
        };
        Self::log_result(&result, &command);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_code() {
        assert_eq!(ExitStatus::Success.code(), Some(0));
        assert_eq!(ExitStatus::Error(128).code(), Some(128));
        assert_eq!(ExitStatus::Signal(9).code(), None);
        assert!(!ExitStatus::Signal(9).success());
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_exit_status() {
        use std::os::unix::process::ExitStatusExt;

        let status = std::process::ExitStatus::from_raw(0);
        assert_eq!(TokioProcessRunner::parse_exit_status(status), ExitStatus::Success);

        // Exit code 1 is encoded in the high byte
        let status = std::process::ExitStatus::from_raw(256);
        assert_eq!(TokioProcessRunner::parse_exit_status(status), ExitStatus::Error(1));

        let status = std::process::ExitStatus::from_raw(9);
        assert_eq!(TokioProcessRunner::parse_exit_status(status), ExitStatus::Signal(9));
    }

    #[test]
    fn test_map_spawn_error() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        assert!(matches!(
            TokioProcessRunner::map_spawn_error(err, "git"),
            ProcessError::CommandNotFound(ref p) if p == "git"
        ));
    }
}
