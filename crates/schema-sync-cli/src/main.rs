//! schema-sync CLI - reconcile declared collections with a live database.

use clap::{Parser, Subcommand};
use schema_sync::{
    connect, Config, DialectImpl, DialectAdapter, DropOptions, Driver, RecordingDriver, SyncError,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "schema-sync")]
#[command(about = "Create and update database tables from declared collections")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "schema.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing tables, columns and indexes
    Sync {
        /// Print the statements instead of running them
        #[arg(long)]
        dry_run: bool,

        /// Alter existing tables to match their declaration
        #[arg(long)]
        alter: bool,
    },

    /// Drop collections and their join tables
    Drop {
        /// Only drop this collection (repeatable)
        #[arg(long = "collection")]
        collections: Vec<String>,
    },

    /// Print the DDL a sync would run against an empty database
    Plan,

    /// Validate the configuration file
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), SyncError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(SyncError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Sync { dry_run, alter } => {
            if alter {
                config.sync.alter_existing = true;
            }
            if dry_run {
                plan(&config, cli.output_json).await
            } else {
                sync(&config, cli.output_json).await
            }
        }
        Commands::Drop { collections } => {
            let options = DropOptions {
                collections: (!collections.is_empty()).then_some(collections),
            };
            let driver = open(&config).await?;
            let report = config.synchronizer(driver)?.drop(&options).await?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for table in &report.tables {
                    println!("dropped {}", table);
                }
            }
            Ok(())
        }
        Commands::Plan => plan(&config, cli.output_json).await,
        Commands::Check => {
            check(&config, cli.output_json)?;
            Ok(())
        }
    }
}

async fn open(config: &Config) -> Result<Arc<dyn Driver>, SyncError> {
    connect(&config.connection, config.sync.timezone()?).await
}

async fn sync(config: &Config, output_json: bool) -> Result<(), SyncError> {
    let driver = open(config).await?;
    let report = config.synchronizer(driver)?.sync().await?;

    if output_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for entry in &report.collections {
            println!("{}: {:?}", entry.name, entry.outcome);
        }
        println!(
            "{} changes in {:.2}s",
            report.changes, report.duration_seconds
        );
    }
    Ok(())
}

/// Run the sync against a recording driver and print what it emitted.
async fn plan(config: &Config, output_json: bool) -> Result<(), SyncError> {
    let dialect = DialectImpl::from_dialect(&config.connection.dialect)?;
    let driver = Arc::new(
        RecordingDriver::new(dialect.name()).with_timezone(config.sync.timezone()?),
    );
    config.synchronizer(driver.clone())?.sync().await?;

    let statements = driver.ddl();
    if output_json {
        let out = serde_json::json!({ "statements": statements });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for statement in statements {
            println!("{};", statement);
        }
    }
    Ok(())
}

fn check(config: &Config, output_json: bool) -> Result<(), SyncError> {
    if output_json {
        let collections: Vec<_> = config
            .collections
            .iter()
            .map(|c| serde_json::json!({ "name": c.name, "properties": c.properties.len() }))
            .collect();
        let out = serde_json::json!({
            "dialect": config.connection.dialect,
            "collections": collections,
            "types": config.types.keys().collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Configuration OK (dialect: {})", config.connection.dialect);
    for collection in &config.collections {
        println!(
            "  {} ({} properties)",
            collection.name,
            collection.properties.len()
        );
    }
    for (name, sql) in &config.types {
        println!("  type {} -> {}", name, sql);
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Unknown verbosity '{}'", other)),
    };

    // stdout carries results (statements, JSON reports)
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Unknown log format '{}'", other)),
    }

    Ok(())
}
