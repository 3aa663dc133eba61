use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::{CommandFactory, DEFAULT_SHUTDOWN_TIMEOUT, Engine, OsFactory};
use crate::render::{DEFAULT_PREFIX, IncrementalRenderer, ScreenRenderer, write_summary};
use crate::shutdown::ShutdownSignal;
use crate::spec::ProcessSpec;
use crate::state::{ProcessState, aggregate_exit_code, apply_event};

/// Default retained lines per process, overridable per spec.
pub const DEFAULT_MAX_LINES_PER_PROC: usize = 1000;

/// Capacity of the engine event channel. A slow terminal exerts
/// backpressure on line delivery through this bound.
const EVENT_CHANNEL_CAPACITY: usize = 128;

/// High-level configuration for one run.
///
/// Zero/empty values fall back to the documented defaults during
/// [`run`]; `is_tty: None` means autodetect from stdout.
#[derive(Debug, Clone)]
pub struct Config {
    pub specs: Vec<ProcessSpec>,
    /// Default retained lines per process; a spec's own cap wins.
    pub max_lines_per_proc: usize,
    /// Default retained bytes per process; 0 leaves the byte cap off.
    pub max_bytes_per_proc: usize,
    /// Graceful window between SIGTERM and SIGKILL.
    pub shutdown_timeout: Duration,
    pub is_tty: Option<bool>,
    /// Full-screen redraw view; forced off on non-TTY output.
    pub full_screen: bool,
    /// Final per-process summary on stderr.
    pub show_summary: bool,
    /// RFC3339 UTC timestamps on incremental output.
    pub show_timestamps: bool,
    /// Prefix template containing `{}` for the process name.
    pub log_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            specs: Vec::new(),
            max_lines_per_proc: DEFAULT_MAX_LINES_PER_PROC,
            max_bytes_per_proc: 0,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            is_tty: None,
            full_screen: true,
            show_summary: true,
            show_timestamps: false,
            log_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Run all configured processes over real OS commands and render their
/// output; returns the aggregate exit code (0 iff every process
/// succeeded).
pub async fn run(cfg: Config, shutdown: ShutdownSignal) -> i32 {
    run_with_factory(cfg, shutdown, Arc::new(OsFactory)).await
}

/// [`run`] with a custom execution backend.
pub async fn run_with_factory(
    mut cfg: Config,
    shutdown: ShutdownSignal,
    factory: Arc<dyn CommandFactory>,
) -> i32 {
    if cfg.max_lines_per_proc == 0 {
        cfg.max_lines_per_proc = DEFAULT_MAX_LINES_PER_PROC;
    }
    if cfg.shutdown_timeout.is_zero() {
        cfg.shutdown_timeout = DEFAULT_SHUTDOWN_TIMEOUT;
    }
    let is_tty = cfg.is_tty.unwrap_or_else(|| io::stdout().is_terminal());
    let full_screen = cfg.full_screen && is_tty;
    debug!(
        processes = cfg.specs.len(),
        full_screen,
        timeout = ?cfg.shutdown_timeout,
        "starting run"
    );

    let mut states: Vec<ProcessState> = cfg
        .specs
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let max_lines = if spec.max_lines > 0 {
                spec.max_lines
            } else {
                cfg.max_lines_per_proc
            };
            let max_bytes = if spec.max_bytes > 0 {
                spec.max_bytes
            } else {
                cfg.max_bytes_per_proc
            };
            ProcessState::new(spec.display_name(index), max_lines, max_bytes)
        })
        .collect();

    let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let engine = Engine::new(cfg.specs.clone(), cfg.shutdown_timeout).with_factory(factory);
    let engine_task = tokio::spawn(engine.run(shutdown, events_tx));

    let incremental = IncrementalRenderer::new(cfg.log_prefix.clone(), cfg.show_timestamps);
    let mut screen = full_screen.then(|| ScreenRenderer::new(io::stdout()));

    // Show every process as starting before the first event arrives.
    match screen.as_mut() {
        Some(screen) => {
            let _ = screen.render(&mut states);
        }
        None => incremental.render_starting(&cfg.specs),
    }

    while let Some(event) = events_rx.recv().await {
        apply_event(&mut states, &event);
        match screen.as_mut() {
            Some(screen) => {
                // Coalesce already-queued events into one redraw.
                while let Ok(next) = events_rx.try_recv() {
                    apply_event(&mut states, &next);
                }
                let _ = screen.render(&mut states);
            }
            None => incremental.render(&event, &cfg.specs),
        }
    }

    let _ = engine_task.await;

    // Make sure the last state made it onto the screen.
    if let Some(screen) = screen.as_mut() {
        let _ = screen.render(&mut states);
    }
    if cfg.show_summary {
        let _ = write_summary(&mut io::stderr(), &states);
    }

    aggregate_exit_code(&states)
}
