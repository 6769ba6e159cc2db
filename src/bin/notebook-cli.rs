use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use notebook_service::client::{ClientError, HttpClient, RpcClient};
use notebook_service::rpc::Registration;

#[derive(Parser)]
#[command(name = "notebook-cli")]
#[command(about = "Client for the notebook conversion service", long_about = None)]
struct Cli {
    /// Service origin; defaults to the RPC or HTTP port for the chosen transport.
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Transport {
    Rpc,
    Http,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a notebook file to HTML
    Convert {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value = "rpc")]
        transport: Transport,

        /// Service name used in the RPC method
        #[arg(long, default_value = "NotebookConverter")]
        service: String,

        /// Mount root of the REST binding
        #[arg(long, default_value = "/")]
        root: String,

        /// Write the HTML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List endpoints registered by the RPC server
    Endpoints,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            file,
            transport,
            service,
            root,
            output,
        } => {
            let text = std::fs::read_to_string(&file)?;
            let document = Value::String(text);

            let result = match transport {
                Transport::Rpc => {
                    let url = cli.url.unwrap_or_else(|| "http://localhost:9106".to_string());
                    RpcClient::new(&url, &service).convert(document).await
                }
                Transport::Http => {
                    let url = cli.url.unwrap_or_else(|| "http://localhost:9105".to_string());
                    HttpClient::new(&url, &root).convert(document).await
                }
            };

            match result {
                Ok(rsp) => match output {
                    Some(path) => std::fs::write(path, rsp.html)?,
                    None => println!("{}", rsp.html),
                },
                Err(ClientError::Remote { kind, message }) => {
                    eprintln!("Error: conversion failed ({kind}): {message}");
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Endpoints => {
            let url = cli.url.unwrap_or_else(|| "http://localhost:9106".to_string());
            let res = reqwest::get(format!("{}/endpoints", url.trim_end_matches('/'))).await?;
            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: registry returned status {}", status);
                std::process::exit(1);
            }
            let registration: Registration = res.json().await?;
            println!("{} {}", registration.service, registration.version);
            for endpoint in registration.endpoints {
                println!(
                    "  {} {} {}",
                    endpoint.name,
                    endpoint.method.join(","),
                    endpoint.path.join(",")
                );
            }
        }
    }

    Ok(())
}
