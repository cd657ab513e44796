//! clientrest - entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clientrest::bootstrap::build_server;
use clientrest_config::{AppConfig, ConfigLoader};
use clientrest_telemetry::{init_logging, Logger};

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("clientrest {}", clientrest::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"clientrest - REST service

USAGE:
    clientrest [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    DEBUG                                     Any value selects the debug timeout profile
    LOG_LEVEL                                 Log filter directive (default: info)
    LOG_FORMAT                                json or pretty (default: json)
    LOG_FIELDS                                Static log fields, e.g. [env=prod,team=core]
    CLIENTREST__SERVER__ADDRESS               Bind address (default: 127.0.0.1)
    CLIENTREST__SERVER__PORT                  Bind port (default: 8080)
    CLIENTREST__SERVER__SHUTDOWN_TIMEOUT_SECS Drain deadline (default: 15)

A .env file in the working directory is loaded if present.
"
    );
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader
            .with_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }

    loader
        .with_dotenv()?
        .with_env()?
        .load()
        .context("invalid configuration")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("clientrest: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let log_config = config.log_config();
    if let Err(e) = init_logging(&log_config) {
        eprintln!("clientrest: {e}");
        return ExitCode::FAILURE;
    }
    let logger = Logger::new(&log_config);
    logger.info(format_args!("starting clientrest v{}", clientrest::VERSION));

    let server = build_server(&config, logger.clone());
    match server.listen().await {
        Ok(()) => {
            logger.info("shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => logger.fatal(e),
    }
}
