use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command as TokioCommand};

use crate::engine::command::{ByteSource, Command, CommandFactory, ExitStatus, ProcessHandle};
use crate::error::{FactoryError, PipeError, StartError};
use crate::spec::ProcessSpec;

/// Factory producing real OS processes. This is the production backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFactory;

impl CommandFactory for OsFactory {
    fn create(&self, spec: &ProcessSpec) -> Result<Box<dyn Command>, FactoryError> {
        Ok(Box::new(OsCommand::new(spec.clone())))
    }
}

/// [`Command`] implementation over `tokio::process`.
///
/// The executable is resolved via PATH, arguments are passed verbatim,
/// stdin is connected to the null device.
pub struct OsCommand {
    spec: ProcessSpec,
    child: Option<Child>,
}

impl OsCommand {
    pub fn new(spec: ProcessSpec) -> Self {
        Self { spec, child: None }
    }

    fn take_stream(&mut self, stream: &'static str) -> Result<ByteSource, PipeError> {
        let child = self.child.as_mut().ok_or_else(|| PipeError {
            stream,
            message: "process not started".into(),
        })?;
        let source: Option<ByteSource> = match stream {
            "stdout" => child.stdout.take().map(|s| Box::new(s) as ByteSource),
            _ => child.stderr.take().map(|s| Box::new(s) as ByteSource),
        };
        source.ok_or_else(|| PipeError {
            stream,
            message: "stream not captured".into(),
        })
    }
}

#[async_trait]
impl Command for OsCommand {
    fn start(&mut self) -> Result<(), StartError> {
        let child = TokioCommand::new(&self.spec.command)
            .args(&self.spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(StartError)?;
        self.child = Some(child);
        Ok(())
    }

    fn take_stdout(&mut self) -> Result<ByteSource, PipeError> {
        self.take_stream("stdout")
    }

    fn take_stderr(&mut self) -> Result<ByteSource, PipeError> {
        self.take_stream("stderr")
    }

    async fn wait(&mut self) -> io::Result<ExitStatus> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| io::Error::other("process not started"))?;
        let status = child.wait().await?;
        Ok(convert_status(status))
    }

    fn handle(&self) -> Option<Box<dyn ProcessHandle>> {
        let pid = self.child.as_ref()?.id()?;
        Some(Box::new(PidHandle {
            pid: Pid::from_raw(pid as i32),
        }))
    }
}

fn convert_status(status: std::process::ExitStatus) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    if let Some(signal) = status.signal() {
        ExitStatus::from_signal(signal)
    } else {
        ExitStatus::from_code(status.code().unwrap_or(-1))
    }
}

/// Pid-based signal handle. Signaling an already-exited pid fails with
/// ESRCH, which callers discard.
struct PidHandle {
    pid: Pid,
}

impl ProcessHandle for PidHandle {
    fn terminate(&self) -> io::Result<()> {
        signal::kill(self.pid, Signal::SIGTERM).map_err(io::Error::from)
    }

    fn kill(&self) -> io::Result<()> {
        signal::kill(self.pid, Signal::SIGKILL).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::framer::LineFramer;

    fn shell(script: &str) -> ProcessSpec {
        ProcessSpec::new("test", "sh", ["-c", script])
    }

    #[tokio::test]
    async fn os_command_captures_stdout() {
        let mut cmd = OsCommand::new(shell("echo hello"));
        cmd.start().unwrap();
        let mut framer = LineFramer::new(cmd.take_stdout().unwrap());
        assert_eq!(framer.next_line().await.as_deref(), Some("hello"));
        assert!(cmd.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn os_command_captures_stderr() {
        let mut cmd = OsCommand::new(shell("echo oops >&2"));
        cmd.start().unwrap();
        let mut framer = LineFramer::new(cmd.take_stderr().unwrap());
        assert_eq!(framer.next_line().await.as_deref(), Some("oops"));
        let _ = cmd.wait().await.unwrap();
    }

    #[tokio::test]
    async fn os_command_start_fails_for_missing_executable() {
        let mut cmd = OsCommand::new(ProcessSpec::new("missing", "/nonexistent/command", Vec::<String>::new()));
        assert!(cmd.start().is_err());
    }

    #[tokio::test]
    async fn os_command_wait_reports_exit_code() {
        let mut cmd = OsCommand::new(shell("exit 42"));
        cmd.start().unwrap();
        let status = cmd.wait().await.unwrap();
        assert_eq!(status.code, Some(42));
        assert!(!status.success());
    }

    #[tokio::test]
    async fn os_command_wait_reports_terminating_signal() {
        let mut cmd = OsCommand::new(shell("sleep 30"));
        cmd.start().unwrap();
        let handle = cmd.handle().expect("started process has a handle");
        handle.kill().unwrap();
        let status = cmd.wait().await.unwrap();
        assert_eq!(status.signal, Some(9));
    }

    #[tokio::test]
    async fn os_command_streams_takeable_exactly_once() {
        let mut cmd = OsCommand::new(shell("true"));
        cmd.start().unwrap();
        assert!(cmd.take_stdout().is_ok());
        assert!(cmd.take_stdout().is_err());
        let _ = cmd.wait().await.unwrap();
    }

    #[test]
    fn os_command_has_no_handle_before_start() {
        let cmd = OsCommand::new(shell("true"));
        assert!(cmd.handle().is_none());
    }
}
