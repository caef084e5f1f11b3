//! # gslb-oneshot
//!
//! Single-shot entry point: runs one reconciliation cycle for every
//! configured origin concurrently, waits for any triggered notifications to
//! finish, and exits with the aggregated result.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use gslb_core::{ComponentRegistry, Config, Service};

#[derive(Parser, Debug)]
#[command(
    name = "gslb-oneshot",
    about = "Runs one reconciliation cycle for every origin and exits"
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
        return ExitCode::from(1);
    }

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to create tokio runtime: {}", err);
            return ExitCode::from(2);
        }
    };

    rt.block_on(async {
        match run_oneshot(config).await {
            Ok(()) => {
                info!("One-shot health check completed successfully");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("Health check failed: {}", err);
                match err {
                    gslb_core::Error::Config(_) => ExitCode::from(1),
                    _ => ExitCode::from(2),
                }
            }
        }
    })
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

async fn run_oneshot(config: Config) -> gslb_core::Result<()> {
    let registry = ComponentRegistry::new();
    gslb_backend_cloudflare::register(&registry);
    gslb_check_http::register(&registry);
    gslb_check_icmp::register(&registry);
    gslb_notify::register(&registry);

    let service = Service::new(config, &registry)?;
    service.run_once().await
}
