use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use multiproc::runner::{self, Config, DEFAULT_MAX_LINES_PER_PROC};
use multiproc::shutdown::ShutdownSignal;
use multiproc::spec::ProcessSpec;

/// Default seconds to wait between SIGTERM and SIGKILL.
const DEFAULT_SHUTDOWN_SECS: u64 = 5;

#[derive(Parser, Debug)]
#[command(
    name = "multiproc",
    author,
    version,
    about = "Run multiple commands concurrently with live output and graceful shutdown",
    long_about = None
)]
struct Args {
    /// Commands to run concurrently (each passed to `sh -c`)
    #[arg(required = true)]
    commands: Vec<String>,

    /// Maximum output lines retained per command
    #[arg(short = 'b', long, default_value_t = DEFAULT_MAX_LINES_PER_PROC)]
    max_lines: usize,

    /// Maximum output bytes retained per command (0 = no byte limit)
    #[arg(long, default_value_t = 0)]
    max_bytes: usize,

    /// Seconds to wait for graceful shutdown before force-killing
    #[arg(short = 't', long, default_value_t = DEFAULT_SHUTDOWN_SECS)]
    shutdown_timeout: u64,

    /// Prefix each output line with an RFC3339 UTC timestamp
    #[arg(long)]
    timestamps: bool,

    /// Prefix template for process names, e.g. "[{}]" or "{}:"
    #[arg(long, default_value = "[{}]")]
    prefix: String,

    /// Disable full-screen rendering even on a TTY
    #[arg(long)]
    no_fullscreen: bool,

    /// Suppress the final summary on stderr
    #[arg(long)]
    no_summary: bool,
}

/// Cancel the shared signal on Ctrl+C or SIGTERM, carrying the signal name
/// as the cause.
fn spawn_signal_listener(shutdown: ShutdownSignal) {
    tokio::spawn(async move {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(_) => return,
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                shutdown.cancel(Some("received signal: interrupt".into()));
            }
            _ = sigterm.recv() => {
                shutdown.cancel(Some("received signal: terminated".into()));
            }
        }
    });
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let specs: Vec<ProcessSpec> = args
        .commands
        .iter()
        .map(|command| ProcessSpec {
            name: command.clone(),
            command: "sh".into(),
            args: vec!["-c".into(), command.clone()],
            max_lines: 0,
            max_bytes: 0,
        })
        .collect();

    let shutdown = ShutdownSignal::new();
    spawn_signal_listener(shutdown.clone());

    let cfg = Config {
        specs,
        max_lines_per_proc: args.max_lines,
        max_bytes_per_proc: args.max_bytes,
        shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        is_tty: None,
        full_screen: !args.no_fullscreen,
        show_summary: !args.no_summary,
        show_timestamps: args.timestamps,
        log_prefix: args.prefix,
    };

    let code = runner::run(cfg, shutdown).await;
    std::process::exit(code);
}
