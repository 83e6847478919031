//! IDA worker gateway
//!
//! Runs the MCP server over stdio. At startup: wipe orphan sockets, signal
//! orphan worker processes, restore persisted sessions, then serve tool
//! calls and run the idle sweeper until shutdown.

use clap::Parser;
use ida_gateway::cache::CacheRegistry;
use ida_gateway::config::{
    GatewayConfig, SupervisorConfig, WorkerStdio, DEFAULT_MAX_IDLE, DEFAULT_READY_TIMEOUT,
    DEFAULT_SWEEP_INTERVAL,
};
use ida_gateway::{Gateway, SessionRegistry, WorkerSupervisor};
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "ida-gateway",
    version,
    about = "MCP gateway for headless IDA analysis workers"
)]
struct Cli {
    /// Worker program spawned per session (binary or interpreter).
    #[arg(long, default_value = "ida-worker")]
    worker: PathBuf,

    /// Extra argument placed before the worker's --socket/--binary flags
    /// (repeatable; e.g. the worker script when --worker is an interpreter).
    #[arg(long = "worker-arg")]
    worker_args: Vec<String>,

    /// Directory for per-session Unix sockets (default: system temp dir).
    #[arg(long)]
    socket_dir: Option<PathBuf>,

    /// Session registry file (default: ~/.ida-gateway/sessions.jsonl).
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Seconds a session may stay idle before being swept.
    #[arg(long, default_value_t = DEFAULT_MAX_IDLE.as_secs())]
    max_idle_secs: u64,

    /// Sweeper cadence in seconds.
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs())]
    sweep_interval_secs: u64,

    /// Worker socket readiness deadline in seconds.
    #[arg(long, default_value_t = DEFAULT_READY_TIMEOUT.as_secs())]
    ready_timeout_secs: u64,

    /// Discard worker stdout/stderr instead of inheriting it.
    #[arg(long)]
    quiet_workers: bool,
}

fn default_state_file() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".ida-gateway")
            .join("sessions.jsonl"),
        None => std::env::temp_dir().join("ida-gateway-sessions.jsonl"),
    }
}

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
            _ = tokio::signal::ctrl_c() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging goes to stderr; stdout carries the MCP protocol.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ida_gateway=info")),
        )
        .init();

    let cli = Cli::parse();
    let socket_dir = cli.socket_dir.unwrap_or_else(std::env::temp_dir);
    let state_file = cli.state_file.unwrap_or_else(default_state_file);

    let mut supervisor_config = SupervisorConfig::new(&cli.worker, &socket_dir);
    supervisor_config.worker_args = cli.worker_args;
    supervisor_config.ready_timeout = Duration::from_secs(cli.ready_timeout_secs);
    supervisor_config.stdio = if cli.quiet_workers {
        WorkerStdio::Discard
    } else {
        WorkerStdio::Inherit
    };
    let config = GatewayConfig {
        supervisor: supervisor_config,
        registry_path: state_file,
        max_idle: Duration::from_secs(cli.max_idle_secs),
        sweep_interval: Duration::from_secs(cli.sweep_interval_secs),
    };

    let registry = Arc::new(SessionRegistry::new(
        &config.registry_path,
        &config.supervisor.socket_dir,
    ));
    let workers = Arc::new(WorkerSupervisor::new(config.supervisor.clone()));
    let caches = Arc::new(CacheRegistry::new());

    // Reclaim leftovers from a previous instance before restoring sessions.
    workers.cleanup_orphan_sockets();
    workers.cleanup_orphan_processes();
    let restored = registry.restore_from_disk().await;
    info!(
        restored = restored.len(),
        state_file = %config.registry_path.display(),
        "Gateway state initialized"
    );

    let shutdown = CancellationToken::new();
    let sweeper = ida_gateway::sweeper::spawn_sweeper(
        registry.clone(),
        workers.clone(),
        caches.clone(),
        config.max_idle,
        config.sweep_interval,
        shutdown.clone(),
    );

    let gateway = Gateway::new(registry, workers.clone(), caches);
    info!("MCP gateway listening on stdio");
    let service = gateway.serve(stdio()).await?;

    tokio::select! {
        res = service.waiting() => {
            let _ = res?;
            info!("MCP transport closed");
        }
        _ = wait_for_shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    shutdown.cancel();
    workers.shutdown_all().await;
    let _ = sweeper.await;
    info!("Gateway stopped");
    Ok(())
}
