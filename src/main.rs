//! Route file tooling.
//!
//! ```text
//! exproute check   routes.toml                 validate and compile
//! exproute resolve routes.toml GET /users/1    show the matching location
//! exproute print   routes.toml                 dump the compiled tree
//! exproute watch   routes.toml                 hot-reload until Ctrl-C
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use exproute::config::{load_config, ConfigWatcher};
use exproute::observability::{logging, metrics};
use exproute::routing::{HttpRequest, Location, RouteRequest, RouteTable};

#[derive(Parser)]
#[command(name = "exproute")]
#[command(about = "Compile, inspect and hot-reload expression route files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a route file
    Check { file: PathBuf },
    /// Show which location a request is routed to
    Resolve {
        file: PathBuf,
        method: String,
        url: String,
    },
    /// Print the compiled route tree
    Print { file: PathBuf },
    /// Keep the table in sync with the file until interrupted
    Watch { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file } => {
            let config = load_config(&file)?;
            logging::init_logging(&config.observability.log_level);
            let table = RouteTable::from_config(&config)?;
            println!("{}: {} locations OK", file.display(), table.len());
        }
        Commands::Resolve { file, method, url } => {
            let table = load_table(&file)?;
            let req = RouteRequest::parse(method, &url)?;
            match table.route(&req) {
                Some(location) => {
                    println!("{}", location.id());
                    if let Some(instructions) = location.instructions() {
                        println!("{}", serde_json::to_string_pretty(instructions)?);
                    }
                }
                None => {
                    eprintln!("no route for {} {}", req.method(), url);
                    std::process::exit(1);
                }
            }
        }
        Commands::Print { file } => {
            let table = load_table(&file)?;
            match table.router().snapshot() {
                Some(root) => print!("{}", root),
                None => println!("(empty)"),
            }
        }
        Commands::Watch { file } => watch(&file).await?,
    }

    Ok(())
}

fn load_table(file: &Path) -> Result<RouteTable, Box<dyn std::error::Error>> {
    let config = load_config(file)?;
    logging::init_logging(&config.observability.log_level);
    Ok(RouteTable::from_config(&config)?)
}

async fn watch(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(file)?;
    logging::init_logging(&config.observability.log_level);

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let table = RouteTable::from_config(&config)?;
    tracing::info!(locations = table.len(), path = %file.display(), "Routes loaded");

    let (watcher, mut updates) = ConfigWatcher::new(file);
    let _watcher = watcher.run()?;

    loop {
        tokio::select! {
            Some(update) = updates.recv() => {
                let applied = update
                    .map_err(|e| e.to_string())
                    .and_then(|config| table.apply(&config).map_err(|e| e.to_string()));
                match applied {
                    Ok(summary) if summary.is_noop() => {
                        tracing::debug!("Route file unchanged");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Failed to apply routes, keeping current table"
                        );
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
