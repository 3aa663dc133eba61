mod command;
mod exec;
mod framer;

pub use command::{ByteSource, Command, CommandFactory, ExitStatus, ProcessHandle};
pub use exec::{OsCommand, OsFactory};
pub use framer::LineFramer;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::debug;

use crate::error::{PipeError, ProcessFailure};
use crate::event::ProcessEvent;
use crate::shutdown::ShutdownSignal;
use crate::spec::ProcessSpec;

/// Graceful shutdown window used when the configured timeout is zero.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a set of processes concurrently and emits their merged output as
/// [`ProcessEvent`]s.
///
/// One task per spec, each driving two line framers and a waiter. The event
/// channel closes only after every process has produced its terminal
/// `Exited` event; within one process `Exited` is always last, across
/// processes events interleave arbitrarily.
pub struct Engine {
    specs: Vec<ProcessSpec>,
    shutdown_timeout: Duration,
    factory: Arc<dyn CommandFactory>,
}

impl Engine {
    /// Engine over real OS processes.
    pub fn new(specs: Vec<ProcessSpec>, shutdown_timeout: Duration) -> Self {
        Self {
            specs,
            shutdown_timeout,
            factory: Arc::new(OsFactory),
        }
    }

    /// Swap the execution backend. Used by tests and alternative executors.
    pub fn with_factory(mut self, factory: Arc<dyn CommandFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Run all processes to completion.
    ///
    /// Consumes the sender; the receiver sees end-of-stream once every
    /// process has terminated. An empty spec list completes immediately.
    /// When `shutdown` fires, each process goes through the cooperative
    /// SIGTERM → timeout → SIGKILL sequence independently.
    pub async fn run(self, shutdown: ShutdownSignal, events: mpsc::Sender<ProcessEvent>) {
        let Self {
            specs,
            shutdown_timeout,
            factory,
        } = self;
        let timeout = if shutdown_timeout.is_zero() {
            DEFAULT_SHUTDOWN_TIMEOUT
        } else {
            shutdown_timeout
        };

        let mut tasks = JoinSet::new();
        for (index, spec) in specs.into_iter().enumerate() {
            let factory = Arc::clone(&factory);
            let shutdown = shutdown.clone();
            let events = events.clone();
            tasks.spawn(run_process(index, spec, factory, timeout, shutdown, events));
        }
        drop(events);

        // The channel closes when the last per-task sender clone drops,
        // which the JoinSet guarantees happens only after every task has
        // emitted its Exited event.
        while tasks.join_next().await.is_some() {}
    }
}

/// Drive one process from spawn to its terminal event.
///
/// Every path out of this function emits exactly one `Exited` for `index`:
/// factory failure, start failure, pipe failure, normal exit, graceful
/// termination, and forced kill.
async fn run_process(
    index: usize,
    spec: ProcessSpec,
    factory: Arc<dyn CommandFactory>,
    timeout: Duration,
    shutdown: ShutdownSignal,
    events: mpsc::Sender<ProcessEvent>,
) {
    let mut cmd = match factory.create(&spec) {
        Ok(cmd) => cmd,
        Err(err) => {
            emit_exited(&events, index, Some(err.into())).await;
            return;
        }
    };

    if let Err(err) = cmd.start() {
        emit_exited(&events, index, Some(err.into())).await;
        return;
    }

    let (stdout, stderr) = match take_streams(cmd.as_mut()) {
        Ok(streams) => streams,
        Err(err) => {
            // The process is already running at this point; don't orphan it.
            if let Some(handle) = cmd.handle() {
                let _ = handle.kill();
            }
            let _ = cmd.wait().await;
            emit_exited(&events, index, Some(err.into())).await;
            return;
        }
    };

    debug!(index, name = %spec.display_name(index), "process started");

    let stdout_pump = tokio::spawn(pump_lines(stdout, index, events.clone()));
    let stderr_pump = tokio::spawn(pump_lines(stderr, index, events.clone()));

    // Taken before the command moves into the waiter. None means the
    // process is not signalable (already gone).
    let handle = cmd.handle();

    // Stream close coincides with process exit: drain both pumps first so
    // no output is lost, then reap.
    let mut waiter = tokio::spawn(async move {
        let _ = future::join(stdout_pump, stderr_pump).await;
        cmd.wait().await
    });

    tokio::select! {
        // Biased toward the exit result: a process that has already exited
        // is never signaled.
        biased;
        result = &mut waiter => {
            emit_exited(&events, index, failure_from_wait(result)).await;
        }
        _ = shutdown.cancelled() => {
            shut_down(index, handle, &mut waiter, timeout, &shutdown, &events).await;
        }
    }
}

fn take_streams(cmd: &mut dyn Command) -> Result<(ByteSource, ByteSource), PipeError> {
    let stdout = cmd.take_stdout()?;
    let stderr = cmd.take_stderr()?;
    Ok((stdout, stderr))
}

/// Cooperative-then-forced termination sequence.
async fn shut_down(
    index: usize,
    handle: Option<Box<dyn ProcessHandle>>,
    waiter: &mut tokio::task::JoinHandle<io::Result<ExitStatus>>,
    timeout: Duration,
    shutdown: &ShutdownSignal,
    events: &mpsc::Sender<ProcessEvent>,
) {
    if let Some(cause) = shutdown.cause() {
        emit_line(events, index, format!("[cancellation: {cause}]")).await;
    }

    let Some(handle) = handle else {
        // Already exited concurrently with the cancellation; just wait for
        // the resolved exit result.
        let result = (&mut *waiter).await;
        emit_exited(events, index, failure_from_wait(result)).await;
        return;
    };

    emit_line(
        events,
        index,
        "[sending SIGTERM for graceful shutdown...]".into(),
    )
    .await;
    debug!(index, "sending SIGTERM");
    let _ = handle.terminate();

    tokio::select! {
        result = &mut *waiter => {
            emit_line(events, index, "[gracefully terminated]".into()).await;
            emit_exited(events, index, failure_from_wait(result)).await;
        }
        _ = tokio::time::sleep(timeout) => {
            emit_line(
                events,
                index,
                format!("[graceful shutdown timeout ({timeout:?}), force killing...]"),
            )
            .await;
            debug!(index, "graceful shutdown timed out, sending SIGKILL");
            let _ = handle.kill();

            // The kill makes the exit result unavoidable.
            let result = (&mut *waiter).await;
            emit_line(events, index, "[force killed]".into()).await;
            emit_exited(events, index, failure_from_wait(result)).await;
        }
    }
}

/// Forward every line of one stream as a `Line` event.
async fn pump_lines(source: ByteSource, index: usize, events: mpsc::Sender<ProcessEvent>) {
    let mut framer = LineFramer::new(source);
    while let Some(text) = framer.next_line().await {
        if events.send(ProcessEvent::Line { index, text }).await.is_err() {
            // Receiver gone; nothing left to deliver.
            break;
        }
    }
}

fn failure_from_wait(result: Result<io::Result<ExitStatus>, JoinError>) -> Option<ProcessFailure> {
    match result {
        Ok(Ok(status)) => failure_from_status(status),
        Ok(Err(err)) => Some(ProcessFailure::Wait(err.to_string())),
        Err(err) => Some(ProcessFailure::Wait(err.to_string())),
    }
}

fn failure_from_status(status: ExitStatus) -> Option<ProcessFailure> {
    if status.success() {
        return None;
    }
    if let Some(signal) = status.signal {
        return Some(ProcessFailure::Signaled { signal });
    }
    Some(ProcessFailure::ExitCode {
        code: status.code.unwrap_or(-1),
    })
}

async fn emit_line(events: &mpsc::Sender<ProcessEvent>, index: usize, text: String) {
    let _ = events.send(ProcessEvent::Line { index, text }).await;
}

async fn emit_exited(
    events: &mpsc::Sender<ProcessEvent>,
    index: usize,
    failure: Option<ProcessFailure>,
) {
    let _ = events.send(ProcessEvent::Exited { index, failure }).await;
}
