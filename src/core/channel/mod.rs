use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
pub(crate) mod fake;
mod shell;

pub use shell::{DEFAULT_SHELL, ShellChannel};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport failure on `{target}`: {reason}")]
    Transport { target: String, reason: String },

    #[error("`{command}` exited with status {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },
}

impl ChannelError {
    pub fn transport(target: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Transport {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

/// Elevated command execution and file access supplied by the host.
///
/// Every call is bounded by the implementation; callers treat a timeout
/// the same as any other transport failure.
#[async_trait]
pub trait PrivilegedChannel: Send + Sync {
    async fn run(&self, command: &str) -> Result<CommandOutput, ChannelError>;

    /// `Ok(None)` when the file does not exist.
    async fn read_file(&self, path: &str) -> Result<Option<String>, ChannelError>;

    async fn write_file(&self, path: &str, content: &str) -> Result<(), ChannelError>;
}

/// Runs `command` and returns its trimmed stdout. A non-zero exit is an error.
pub async fn run_checked(
    channel: &dyn PrivilegedChannel,
    command: &str,
) -> Result<String, ChannelError> {
    let out = channel.run(command).await?;
    if !out.success() {
        return Err(ChannelError::NonZeroExit {
            command: command.to_string(),
            code: out.exit_code,
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(out.stdout.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::fake::FakeChannel;
    use super::*;

    #[tokio::test]
    async fn run_checked_trims_stdout() {
        let channel = FakeChannel::new();
        channel.reply("uname -r", "5.10.0-android\n");

        let out = run_checked(&channel, "uname -r").await.unwrap();
        assert_eq!(out, "5.10.0-android");
    }

    #[tokio::test]
    async fn run_checked_rejects_non_zero_exit() {
        let channel = FakeChannel::new();
        channel.reply_with("pidof sys.azenith-service", 1, "");

        let err = run_checked(&channel, "pidof sys.azenith-service")
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NonZeroExit { code: 1, .. }));
    }
}
