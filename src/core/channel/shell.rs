use super::{ChannelError, CommandOutput, PrivilegedChannel};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

pub const DEFAULT_SHELL: &str = "sh";

/// Exit status the read script uses for a missing file.
const MISSING_FILE_EXIT: i32 = 44;

/// Channel backed by `<shell> -c`.
///
/// With the default `sh` the process is expected to hold the needed
/// privileges itself and files are accessed directly. Any other shell
/// (e.g. `su`) carries the file I/O as well, so commands and files always
/// run with the same rights.
pub struct ShellChannel {
    shell: String,
    timeout: Duration,
}

impl ShellChannel {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    fn files_through_shell(&self) -> bool {
        self.shell != DEFAULT_SHELL
    }

    async fn bounded<T, F>(&self, target: &str, fut: F) -> Result<T, ChannelError>
    where
        F: std::future::Future<Output = std::io::Result<T>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| {
                ChannelError::transport(
                    target,
                    format!("timed out after {}ms", self.timeout.as_millis()),
                )
            })?
            .map_err(|e| ChannelError::transport(target, e))
    }

    async fn exec(&self, command: &str, input: Option<&str>) -> Result<CommandOutput, ChannelError> {
        let mut cmd = TokioCommand::new(&self.shell);
        cmd.args(["-c", command])
            .kill_on_drop(true)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let out = self
            .bounded(command, async {
                let mut child = cmd.spawn()?;
                if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
                    stdin.write_all(input.as_bytes()).await?;
                }
                child.wait_with_output().await
            })
            .await?;

        Ok(CommandOutput {
            exit_code: out.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }

    async fn read_direct(&self, path: &str) -> Result<Option<String>, ChannelError> {
        match tokio::time::timeout(self.timeout, tokio::fs::read(path)).await {
            Err(_) => Err(ChannelError::transport(path, "read timed out")),
            Ok(Ok(bytes)) => Ok(Some(decode(path, bytes))),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Ok(Err(e)) => Err(ChannelError::transport(path, e)),
        }
    }

    async fn read_via_shell(&self, path: &str) -> Result<Option<String>, ChannelError> {
        let file = quote(path);
        let command = format!("[ -e {file} ] || exit {MISSING_FILE_EXIT}; cat {file}");
        let out = self.exec(&command, None).await?;
        match out.exit_code {
            0 => Ok(Some(out.stdout)),
            MISSING_FILE_EXIT => Ok(None),
            code => Err(ChannelError::NonZeroExit {
                command,
                code,
                stderr: out.stderr.trim().to_string(),
            }),
        }
    }

    async fn write_direct(&self, path: &str, content: &str) -> Result<(), ChannelError> {
        let target = Path::new(path);
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            self.bounded(path, tokio::fs::create_dir_all(parent)).await?;
        }

        let temp_path = format!("{}.tmp", path);
        self.bounded(path, tokio::fs::write(&temp_path, content))
            .await?;
        self.bounded(path, tokio::fs::rename(&temp_path, target))
            .await
    }

    async fn write_via_shell(&self, path: &str, content: &str) -> Result<(), ChannelError> {
        let temp = quote(&format!("{}.tmp", path));
        let mut command = String::new();
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            command.push_str(&format!("mkdir -p {} && ", quote(&parent.to_string_lossy())));
        }
        command.push_str(&format!("cat > {temp} && mv -f {temp} {}", quote(path)));

        let out = self.exec(&command, Some(content)).await?;
        if !out.success() {
            return Err(ChannelError::NonZeroExit {
                command,
                code: out.exit_code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Non-UTF-8 content is decoded lossily so it reaches the caller as
/// malformed content rather than as a transport failure.
fn decode(path: &str, bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        warn!(target: "azenith::channel", "{} is not valid UTF-8, decoding lossily", path);
        String::from_utf8_lossy(e.as_bytes()).into_owned()
    })
}

fn quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[async_trait]
impl PrivilegedChannel for ShellChannel {
    async fn run(&self, command: &str) -> Result<CommandOutput, ChannelError> {
        debug!(target: "azenith::channel", "exec: {}", command);
        self.exec(command, None).await
    }

    async fn read_file(&self, path: &str) -> Result<Option<String>, ChannelError> {
        if self.files_through_shell() {
            self.read_via_shell(path).await
        } else {
            self.read_direct(path).await
        }
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), ChannelError> {
        if self.files_through_shell() {
            self.write_via_shell(path, content).await?;
        } else {
            self.write_direct(path, content).await?;
        }
        debug!(target: "azenith::channel", "wrote {} bytes to {}", content.len(), path);
        Ok(())
    }
}
