//! chanreplay - record/replay and simulation of interactive channel sessions
//!
//! The binary exposes:
//! - `serve`: run the catalog-driven simulation server until interrupted
//! - `catalog`: validate catalogs and look up the event served for an input
//! - `transcript`: inspect recorded transcripts and check they can be replayed

use clap::{Args, Parser, Subcommand};
use cr_common::OutputFormat;
use cr_config::ServerConfig;
use cr_core::catalog_cli::{run_catalog, CatalogArgs};
use cr_core::exit_codes::ExitCode;
use cr_core::logging::{self, LogFormat};
use cr_core::server::SimulationServer;
use cr_core::transcript_cli::{run_transcript, TranscriptArgs};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "chanreplay")]
#[command(version)]
#[command(about = "Record, replay and simulate interactive channel sessions")]
struct Cli {
    /// Output format for command results (json, summary)
    #[arg(long, global = true, default_value = "json")]
    format: OutputFormat,

    /// Log line format on stderr (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the simulation server
    Serve(ServeArgs),
    /// Inspect event catalogs
    Catalog(CatalogArgs),
    /// Inspect recorded transcripts
    Transcript(TranscriptArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Server config file (TOML); defaults to the user config directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override catalog path
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Override listen port
    #[arg(long)]
    port: Option<u16>,

    /// Override listen address
    #[arg(long)]
    address: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_format, cli.verbose);

    let code = match &cli.command {
        Commands::Serve(args) => run_serve(args),
        Commands::Catalog(args) => run_catalog(&cli.format, args),
        Commands::Transcript(args) => run_transcript(&cli.format, args),
    };
    std::process::exit(code.as_i32());
}

fn load_server_config(args: &ServeArgs) -> Result<ServerConfig, cr_common::Error> {
    let mut config = ServerConfig::resolve(args.config.as_deref())?;
    if let Some(catalog) = &args.catalog {
        config.catalog_path = catalog.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(address) = &args.address {
        config.listen_address = address.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run_serve(args: &ServeArgs) -> ExitCode {
    let config = match load_server_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("chanreplay serve: {}", e);
            return ExitCode::for_error(&e);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("chanreplay serve: failed to start runtime: {}", e);
            return ExitCode::InternalError;
        }
    };

    match runtime.block_on(serve(config)) {
        Ok(()) => ExitCode::Clean,
        Err(e) => {
            eprintln!("chanreplay serve: {}", e);
            ExitCode::for_error(&e)
        }
    }
}

async fn serve(config: ServerConfig) -> Result<(), cr_common::Error> {
    info!("Starting chanreplay v{}", env!("CARGO_PKG_VERSION"));

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let server = SimulationServer::from_config(&config, shutdown_rx).await?;
    let stats = server.stats();

    match server.local_addr() {
        Ok(addr) => info!(
            "Simulator ready on {} serving {}",
            addr,
            config.catalog_path.display()
        ),
        Err(e) => error!("Could not read listener address: {}", e),
    }

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Listener error: {}", e);
        }
    });

    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to wait for Ctrl+C: {}", e);
    } else {
        info!("Received Ctrl+C, initiating shutdown...");
    }

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    info!(
        "Shutdown complete. Total connections handled: {}",
        stats.connections_accepted.load(Ordering::Relaxed)
    );
    Ok(())
}
