//! bth-trader CLI and server binary
//!
//! Entry point for the Kraken order gateway. Provides commands for
//! initializing and validating a configuration, and for starting the
//! gateway.

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{generate_default_config, load_config, save_config, validate_config, TraderConfig};
use kraken::{KrakenRestClient, KrakenWsClient};
use observability::{init_logging, init_metrics, LogFormat, TraderMetrics};
use orders::OrderCache;
use server::{GrpcServerBuilder, Server, ServerConfig, ShutdownController};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use trader::{Pipeline, PipelineSettings, ServiceSettings, TraderServer, TraderService};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Start {
            config,
            grpc,
            log_format,
        } => start_trader(config, grpc, log_format).await,
        Commands::Validate { config } => {
            init_logging("bth-trader", LogFormat::Pretty)?;
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Init { output } => {
            init_logging("bth-trader", LogFormat::Pretty)?;
            info!("Executing 'init' command");
            init_command(output).await
        }
    }
}

/// Load, override and validate the configuration used by `start`
fn prepare_config(
    config_path: &Path,
    grpc_override: Option<u16>,
    log_format_override: Option<String>,
) -> Result<TraderConfig> {
    let mut config = load_config(config_path)?;

    if let Some(port) = grpc_override {
        config.grpc.port = port;
    }
    if let Some(format) = log_format_override {
        config.service.log_format = format;
    }

    let report = validate_config(&config);
    if !report.is_valid() {
        for err in &report.errors {
            eprintln!("  [error] {}", err);
        }
        anyhow::bail!("Cannot start trader due to configuration errors");
    }

    let format = LogFormat::parse(&config.service.log_format).unwrap_or_default();
    init_logging(&config.service.name, format)?;

    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }

    Ok(config)
}

async fn start_trader<P: AsRef<Path>>(
    config_path: P,
    grpc_override: Option<u16>,
    log_format_override: Option<String>,
) -> Result<()> {
    let config = prepare_config(config_path.as_ref(), grpc_override, log_format_override)?;
    info!(service = %config.service.name, "bth-trader starting...");

    if config.metrics.enabled {
        init_metrics(&config.metrics.host, config.metrics.port)?;
    }
    let metrics = TraderMetrics::new();

    // Session token for the private channels
    let rest = KrakenRestClient::new(
        &config.kraken.rest_url,
        &config.kraken.api_key,
        &config.kraken.private_key,
        config.kraken.request_timeout(),
    )?;
    let token = rest
        .ws_token()
        .await
        .context("Failed to obtain Kraken WebSocket token")?;
    debug!(expires = token.expires, "Obtained WebSocket token");

    let (ws, feed) = KrakenWsClient::connect(&config.kraken.ws_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.kraken.ws_url))?;
    ws.subscribe_private(&token.token).await?;
    info!(url = %config.kraken.ws_url, "Subscribed to private channels");

    let shutdown = ShutdownController::with_ctrl_c();

    let cache = Arc::new(OrderCache::with_grace_period(config.orders.grace_period()));
    let pipeline = Pipeline::start(
        feed,
        cache.clone(),
        PipelineSettings {
            event_buffer: config.orders.event_buffer,
            gc_interval: config.orders.gc_interval(),
        },
        metrics.clone(),
        shutdown.child_token(),
    );

    let service = Arc::new(TraderService::new(
        Arc::new(ws),
        pipeline.orders(),
        cache,
        token.token,
        ServiceSettings {
            submit_timeout: config.orders.submit_timeout(),
            stream_buffer: config.orders.stream_buffer,
        },
        metrics,
        shutdown.child_token(),
    ));

    let grpc = GrpcServerBuilder::new(ServerConfig::new(&config.grpc.host, config.grpc.port))
        .with_tonic_server(move |mut builder| builder.add_service(TraderServer::from_arc(service.clone())))
        .build();

    info!(address = %config.grpc.listen_address(), "Starting gRPC server");
    let result = grpc.run(shutdown.token()).await;

    // The server also stops on its own errors; make sure the pipeline follows
    shutdown.shutdown();
    pipeline.join().await;

    match result {
        Ok(()) => {
            info!("bth-trader stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "gRPC server failed");
            Err(e.into())
        }
    }
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Service: {}", config.service.name);
    println!("gRPC: {}", config.grpc.listen_address());
    println!("Kraken WebSocket: {}", config.kraken.ws_url);
    println!("Kraken REST: {}", config.kraken.rest_url);
    println!(
        "Metrics: {}",
        if config.metrics.enabled {
            format!("{}:{}", config.metrics.host, config.metrics.port)
        } else {
            "disabled".to_string()
        }
    );

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Export BTH_KRAKEN_API_KEY and BTH_KRAKEN_PRIVATE_KEY");
    println!(
        "  2. Run 'bth-trader validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'bth-trader start --config {:?}' to start the gateway",
        output_path
    );

    Ok(())
}
