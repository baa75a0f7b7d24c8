//! `direct-call` command line tool.
//!
//! Issues a single signed direct call using a TOML configuration, checks a
//! configuration file, or prints the auth headers a request would carry.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

use direct_call::config::{load_config, DirectCallConfig};
use direct_call::observability::logging::init_logging;
use direct_call::observability::metrics::{init_metrics, install_recorder};
use direct_call::observability::TraceContext;
use direct_call::security::headers::build_headers;
use direct_call::security::{HmacSigner, RequestSigner};
use direct_call::{CallContext, DirectRequest, DirectServiceClient, StaticDirectory};

#[derive(Parser)]
#[command(name = "direct-call")]
#[command(about = "Signed, resilient direct calls between internal services", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a service and print the response envelope
    Call {
        /// Logical service name
        service: String,
        /// Request path, e.g. /api/v1/notify
        path: String,
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// JSON request body
        #[arg(short = 'd', long)]
        body: Option<String>,
        /// Extra address for the service (repeatable)
        #[arg(short, long)]
        address: Vec<String>,
        /// Continue an existing trace
        #[arg(long)]
        trace_id: Option<String>,
        /// Per-call timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Print Prometheus metrics after the call
        #[arg(long)]
        print_metrics: bool,
    },
    /// Validate the configuration file
    CheckConfig,
    /// Print the headers a request would be sent with
    Sign {
        method: String,
        path: String,
        #[arg(short = 'd', long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DirectCallConfig::default(),
    };
    init_logging(&config.observability);

    match cli.command {
        Commands::Call {
            service,
            path,
            method,
            body,
            address,
            trace_id,
            timeout_ms,
            print_metrics,
        } => {
            let metrics = if print_metrics {
                Some(install_recorder()?)
            } else if cli.config.is_some() && config.observability.metrics_enabled {
                let addr = config.observability.metrics_address.parse()?;
                if let Err(e) = init_metrics(addr) {
                    tracing::warn!(error = %e, "Metrics exporter not started");
                }
                None
            } else {
                None
            };

            let directory = StaticDirectory::from_map(&config.services);
            if !address.is_empty() {
                let mut known = config.services.get(&service).cloned().unwrap_or_default();
                known.extend(address);
                directory.set_addresses(&service, known);
            }
            let client = DirectServiceClient::new(&config, Arc::new(directory));

            let mut request = DirectRequest::new(service, method, path);
            if let Some(body) = body {
                let value: Value = serde_json::from_str(&body)?;
                request = request.body(value);
            }
            if let Some(ms) = timeout_ms {
                request = request.timeout(Duration::from_millis(ms));
            }
            let mut ctx = match trace_id {
                Some(id) => CallContext::with_trace_id(id),
                None => CallContext::new(),
            };

            let envelope = client.call_value(&mut ctx, &request).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            if let Some(trace_id) = ctx.trace_id() {
                eprintln!("trace id: {}", trace_id);
            }
            if let Some(handle) = metrics {
                print!("{}", handle.render());
            }
        }
        Commands::CheckConfig => {
            let source = cli
                .config
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<defaults>".to_string());
            println!(
                "{}: ok ({} services, active = {})",
                source,
                config.services.len(),
                config.is_active()
            );
        }
        Commands::Sign { method, path, body } => {
            let signer = HmacSigner::new(&config.shared_secret)?;
            let body = body.unwrap_or_default();
            let auth = signer.sign(&method, &path, &body)?;
            let trace = TraceContext::resolve(&mut CallContext::new(), &config.source_service_name);
            for (name, value) in build_headers(&trace, Some(&auth)).iter() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
        }
    }

    Ok(())
}
