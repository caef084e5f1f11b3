//! # gslbd - GSLB daemon
//!
//! Long-running entry point. Loads the configuration, registers the built-in
//! backends, health checkers and notifiers, starts one reconciliation loop
//! per origin and runs until SIGINT or SIGTERM.
//!
//! This is a thin integration layer: all control-plane logic lives in
//! `gslb-core` and the implementation crates.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use gslb_core::{ComponentRegistry, Config, Service};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy)]
enum GslbExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<GslbExitCode> for ExitCode {
    fn from(code: GslbExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "gslbd",
    about = "Keeps authoritative DNS records in sync with origin health"
)]
struct Args {
    /// Path to the configuration file, or a directory containing one
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(message) = init_tracing(&args.log_level) {
        eprintln!("{}", message);
        return GslbExitCode::ConfigError.into();
    }

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            return GslbExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to create tokio runtime: {}", err);
            return GslbExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => GslbExitCode::CleanShutdown,
            Err(err) => {
                error!("Daemon error: {}", err);
                match err {
                    gslb_core::Error::Config(_) => GslbExitCode::ConfigError,
                    _ => GslbExitCode::RuntimeError,
                }
            }
        }
    });

    code.into()
}

fn init_tracing(level: &str) -> Result<(), String> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("invalid log level: {}", other)),
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| format!("failed to set tracing subscriber: {}", err))
}

async fn run_daemon(config: Config) -> gslb_core::Result<()> {
    let registry = ComponentRegistry::new();
    gslb_backend_cloudflare::register(&registry);
    gslb_check_http::register(&registry);
    gslb_check_icmp::register(&registry);
    gslb_notify::register(&registry);

    let service = Service::new(config, &registry)?;
    info!("Managing {} origin(s)", service.origin_count());

    service.start().await;

    let signal = wait_for_shutdown().await?;
    info!("Received signal: {}", signal);

    service.stop().await;
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> gslb_core::Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for CTRL-C (non-Unix platforms)
#[cfg(not(unix))]
async fn wait_for_shutdown() -> gslb_core::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("SIGINT")
}
