use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grpclb_backends::config::{Config, ConfigError};
use grpclb_backends::utils::format_duration;
use grpclb_backends::Balancer;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grpclb-backends")]
#[command(about = "Backend pool reconciliation for client-side load balancing")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the backend pool in sync with the configured addresses
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/dev.toml")]
        config: PathBuf,
    },
    /// Connect the configured addresses once and print the server list
    Snapshot {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/dev.toml")]
        config: PathBuf,
    },
    /// Generate an example configuration file
    Config {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run(config).await,
        Commands::Snapshot { config } => snapshot(config).await,
        Commands::Config { output } => generate_config(output),
        Commands::Validate { config } => validate_config(config),
        Commands::Version => {
            show_version();
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_from_file(path)
        .with_context(|| format!("Failed to load config from {:?}", path))
}

async fn run(config_path: PathBuf) -> Result<()> {
    let config = load_config(&config_path)?;
    init_logging(&config);

    info!("Starting grpclb-backends v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {:?}", config_path);
    info!(
        "Target: {} ({} addresses, query interval {})",
        config.balancer.target,
        config.backends.addresses.len(),
        format_duration(config.balancer.query_interval())
    );

    let balancer = Balancer::new(config).with_config_path(&config_path);
    let summary = balancer.run(shutdown_signal()).await?;

    info!("Closed {} backends, shutdown complete", summary.removed.len());
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => warn!("Failed to listen for Ctrl-C, shutting down: {}", e),
    }
}

async fn snapshot(config_path: PathBuf) -> Result<()> {
    let config = load_config(&config_path)?;
    init_logging(&config);

    let balancer = Balancer::new(config);
    if let Err(e) = balancer.refresh().await {
        // partial pools are still worth printing
        warn!("{}", e);
    }

    let servers = balancer.servers().await;
    println!(
        "{} servers for {}:",
        servers.len(),
        balancer.config().balancer.target
    );
    for server in &servers {
        println!("  {}", server);
    }

    balancer.pool().shutdown().await?;
    Ok(())
}

fn generate_config(output: PathBuf) -> Result<()> {
    println!("Generating configuration file: {:?}", output);

    Config::create_example_config(&output).context("Failed to generate config")?;

    println!("Configuration file generated successfully!");
    println!("Edit the file to match your environment and run:");
    println!("  grpclb-backends run --config {:?}", output);

    Ok(())
}

fn validate_config(config_path: PathBuf) -> Result<()> {
    println!("Validating configuration file: {:?}", config_path);

    match Config::load_from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration file is valid");
            println!("  Target: {}", config.balancer.target);
            println!(
                "  Query interval: {}",
                format_duration(config.balancer.query_interval())
            );
            println!(
                "  Refresh interval: {}",
                format_duration(config.backends.refresh_interval())
            );
            println!(
                "  Connect timeout: {}",
                format_duration(config.backends.connect_timeout())
            );
            println!(
                "  Serialized reconcile: {}",
                config.balancer.serialize_reconcile
            );
            println!("  Backends: {} addresses", config.backends.addresses.len());
            for (i, addr) in config.backends.addresses.iter().enumerate() {
                println!("    {}: {}", i + 1, addr);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration file validation failed:");
            match &e {
                ConfigError::IoError(msg) => eprintln!("  File error: {}", msg),
                ConfigError::ParseError(msg) => eprintln!("  Parse error: {}", msg),
                ConfigError::ValidationError(msg) => eprintln!("  Validation error: {}", msg),
                ConfigError::SerializeError(msg) => eprintln!("  Serialization error: {}", msg),
            }
            Err(e.into())
        }
    }
}

fn show_version() {
    println!("grpclb-backends v{}", env!("CARGO_PKG_VERSION"));
    println!("Backend pool reconciliation for client-side load balancing");
    println!();
    println!("Target: {}", std::env::consts::ARCH);
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
