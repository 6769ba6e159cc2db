//! Notebook conversion service.
//!
//! # Architecture Overview
//!
//! ```text
//!     JSON-RPC client                         REST client
//!          │                                       │
//!          ▼                                       ▼
//!   ┌──────────────┐                      ┌────────────────┐
//!   │  rpc server  │                      │  http server   │
//!   │  POST /rpc   │                      │ <root>/api/v0/ │
//!   └──────┬───────┘                      └───────┬────────┘
//!          │                                      │
//!          └─────────────────┬────────────────────┘
//!                            ▼
//!                 ┌─────────────────────┐
//!                 │  tracing decorator  │
//!                 │  logging decorator  │
//!                 │  metrics decorator  │
//!                 │  notebook converter │
//!                 └─────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use notebook_service::config::{loader, ServiceConfig, TracingType};
use notebook_service::lifecycle;
use notebook_service::observability::logging;
use notebook_service::observability::tracing as otel;

#[derive(Parser)]
#[command(name = "notebook-service", version)]
#[command(about = "Renders Jupyter notebooks as HTML over JSON-RPC and REST", long_about = None)]
struct Cli {
    /// Explicit config file; skips the well-known search paths.
    #[arg(long, env = "NOTEBOOK_SERVICE_CONFIG_FILE", global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start both transports (default)
    Server(ServerArgs),
    /// Print the effective configuration as TOML
    Config(ServerArgs),
}

#[derive(Args, Default)]
struct ServerArgs {
    #[arg(long, env = "NOTEBOOK_SERVICE_LOG_LEVEL")]
    log_level: Option<String>,

    #[arg(long, env = "NOTEBOOK_SERVICE_LOG_PRETTY")]
    log_pretty: Option<bool>,

    #[arg(long, env = "NOTEBOOK_SERVICE_HTTP_ADDR")]
    http_addr: Option<String>,

    #[arg(long, env = "NOTEBOOK_SERVICE_HTTP_ROOT")]
    http_root: Option<String>,

    #[arg(long, env = "NOTEBOOK_SERVICE_HTTP_NAMESPACE")]
    http_namespace: Option<String>,

    #[arg(long, env = "NOTEBOOK_SERVICE_RPC_ADDR")]
    rpc_addr: Option<String>,

    #[arg(long, env = "NOTEBOOK_SERVICE_RPC_NAMESPACE")]
    rpc_namespace: Option<String>,

    #[arg(long, env = "NOTEBOOK_SERVICE_DEBUG_ADDR")]
    debug_addr: Option<String>,

    #[arg(long, env = "NOTEBOOK_SERVICE_TRACING_ENABLED")]
    tracing_enabled: Option<bool>,

    /// `jaeger` or `otlp`
    #[arg(long, env = "NOTEBOOK_SERVICE_TRACING_TYPE")]
    tracing_type: Option<TracingType>,

    #[arg(long, env = "NOTEBOOK_SERVICE_TRACING_ENDPOINT")]
    tracing_endpoint: Option<String>,

    /// Takes precedence over the endpoint when both are set.
    #[arg(long, env = "NOTEBOOK_SERVICE_TRACING_COLLECTOR")]
    tracing_collector: Option<String>,

    #[arg(long, env = "NOTEBOOK_SERVICE_TRACING_SERVICE")]
    tracing_service: Option<String>,

    #[arg(long, env = "NOTEBOOK_SERVICE_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,
}

impl ServerArgs {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if let Some(pretty) = self.log_pretty {
            config.log.pretty = pretty;
        }
        if let Some(addr) = self.http_addr {
            config.http.addr = addr;
        }
        if let Some(root) = self.http_root {
            config.http.root = root;
        }
        if let Some(namespace) = self.http_namespace {
            config.http.namespace = namespace;
        }
        if let Some(addr) = self.rpc_addr {
            config.rpc.addr = addr;
        }
        if let Some(namespace) = self.rpc_namespace {
            config.rpc.namespace = namespace;
        }
        if let Some(addr) = self.debug_addr {
            config.debug.addr = addr;
        }
        if let Some(enabled) = self.tracing_enabled {
            config.tracing.enabled = enabled;
        }
        if let Some(kind) = self.tracing_type {
            config.tracing.kind = kind;
        }
        if let Some(endpoint) = self.tracing_endpoint {
            config.tracing.endpoint = endpoint;
        }
        if let Some(collector) = self.tracing_collector {
            config.tracing.collector = collector;
        }
        if let Some(service) = self.tracing_service {
            config.tracing.service = service;
        }
        if let Some(secs) = self.request_timeout {
            config.timeouts.request_secs = secs;
        }
    }
}

fn load(
    config_file: Option<PathBuf>,
    args: ServerArgs,
) -> Result<(ServiceConfig, Option<PathBuf>), loader::ConfigError> {
    let path = config_file.or_else(|| loader::discover(&loader::search_paths()));
    let config = loader::load_config(path.as_deref(), |config| args.apply(config))?;
    Ok((config, path))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Server(ServerArgs::default()));

    match command {
        Commands::Config(args) => {
            let (config, _) = match load(cli.config_file, args) {
                Ok(loaded) => loaded,
                Err(err) => {
                    eprintln!("invalid configuration: {err}");
                    return ExitCode::FAILURE;
                }
            };
            match toml::to_string_pretty(&config) {
                Ok(text) => {
                    print!("{text}");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("failed to render configuration: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Server(args) => {
            let (config, path) = match load(cli.config_file, args) {
                Ok(loaded) => loaded,
                Err(err) => {
                    eprintln!("invalid configuration: {err}");
                    return ExitCode::FAILURE;
                }
            };

            if let Err(err) = logging::init_logging(&config.log, &config.tracing) {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }

            match &path {
                Some(path) => tracing::info!(path = %path.display(), "Configuration loaded"),
                None => tracing::info!("No configuration file found, using defaults"),
            }

            let result = lifecycle::run(config).await;
            otel::shutdown_tracer().await;

            if let Err(err) = result {
                tracing::error!(error = %err, "Service failed");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
    }
}
