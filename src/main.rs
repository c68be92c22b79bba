#![forbid(unsafe_code)]

//! `session-warden` — runs the session lifecycle simulation.
//!
//! Loads configuration, builds a registry, drives it through the create
//! and update rounds, and prints the resulting summary as JSON.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use session_warden::orchestrator::simulation;
use session_warden::{AppError, GlobalConfig, Result, SessionRegistry};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "session-warden", about = "Session lifecycle simulator", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the active-session bound.
    #[arg(long)]
    max_concurrent: Option<u32>,

    /// Override the number of simulated sessions.
    #[arg(long)]
    sessions: Option<u32>,

    /// Override the number of update rounds.
    #[arg(long)]
    iterations: Option<u32>,

    /// Override the pause between rounds, in milliseconds.
    #[arg(long)]
    tick_millis: Option<u64>,
}

impl Cli {
    fn resolve_config(&self) -> Result<GlobalConfig> {
        let mut config = match &self.config {
            Some(path) => GlobalConfig::load_from_path(path)?,
            None => GlobalConfig::default(),
        };

        if let Some(max) = self.max_concurrent {
            config.max_concurrent_sessions = max;
        }
        if let Some(sessions) = self.sessions {
            config.simulation.session_count = sessions;
        }
        if let Some(iterations) = self.iterations {
            config.simulation.iterations = iterations;
        }
        if let Some(tick) = self.tick_millis {
            config.simulation.tick_millis = tick;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("session-warden bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = args.resolve_config()?;
    info!(
        max_concurrent_sessions = config.max_concurrent_sessions,
        "configuration loaded"
    );

    let registry = SessionRegistry::from_config(&config)?;

    let summary = tokio::select! {
        result = simulation::timed("simulation", simulation::run(&registry, &config.simulation)) => result?,
        () = shutdown_signal() => {
            warn!("shutdown signal received, reporting partial summary");
            registry.summary()
        }
    };

    let rendered = serde_json::to_string_pretty(&summary)
        .map_err(|err| AppError::Io(format!("failed to render summary: {err}")))?;
    println!("{rendered}");

    info!("session-warden finished");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
