use super::{ChannelError, CommandOutput, PrivilegedChannel};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory channel with scripted command replies.
#[derive(Default)]
pub(crate) struct FakeChannel {
    files: Mutex<HashMap<String, String>>,
    replies: Mutex<HashMap<String, Result<CommandOutput, String>>>,
    calls: Mutex<Vec<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    write_delay: Mutex<Option<Duration>>,
}

impl FakeChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_file(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    pub(crate) fn remove_file(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    pub(crate) fn file(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub(crate) fn reply(&self, command: &str, stdout: &str) {
        self.reply_with(command, 0, stdout);
    }

    pub(crate) fn reply_with(&self, command: &str, exit_code: i32, stdout: &str) {
        self.replies.lock().unwrap().insert(
            command.to_string(),
            Ok(CommandOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        );
    }

    pub(crate) fn fail_command(&self, command: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_string(), Err("channel unreachable".to_string()));
    }

    pub(crate) fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn call_count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }
}

#[async_trait]
impl PrivilegedChannel for FakeChannel {
    async fn run(&self, command: &str) -> Result<CommandOutput, ChannelError> {
        self.calls.lock().unwrap().push(command.to_string());
        let reply = self.replies.lock().unwrap().get(command).cloned();
        match reply {
            Some(Ok(out)) => Ok(out),
            Some(Err(reason)) => Err(ChannelError::transport(command, reason)),
            None => Err(ChannelError::transport(command, "unscripted command")),
        }
    }

    async fn read_file(&self, path: &str) -> Result<Option<String>, ChannelError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ChannelError::transport(path, "read refused"));
        }
        Ok(self.file(path))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), ChannelError> {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ChannelError::transport(path, "write refused"));
        }
        self.set_file(path, content);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
