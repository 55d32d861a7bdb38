//! berthd — the Berth control-plane daemon.
//!
//! Single binary that assembles the control plane:
//! - Record store (redb)
//! - Data-source catalog seeding
//! - REST API (public operations + internal callbacks)
//!
//! # Usage
//!
//! ```text
//! berthd standalone --port 8470 --data-dir /var/lib/berth --catalog catalog.toml
//! ```

mod catalog;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "berthd", about = "Berth control-plane daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control plane in a single process.
    Standalone {
        /// Port to listen on.
        #[arg(long, default_value = "8470")]
        port: u16,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/berth")]
        data_dir: PathBuf,

        /// Curated data-source catalog to seed at startup.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,berthd=debug,berth=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            port,
            data_dir,
            catalog,
        } => run_standalone(port, data_dir, catalog).await,
    }
}

async fn run_standalone(
    port: u16,
    data_dir: PathBuf,
    catalog: Option<PathBuf>,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(&data_dir)?;
    let store = berth_state::StateStore::open(&data_dir.join("berth.redb"))?;

    if let Some(path) = catalog {
        let seeded = catalog::seed_catalog(&store, &path)?;
        info!(?path, seeded, "data-source catalog seeded");
    }

    let router = berth_api::build_router(store);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "berthd listening");

    axum::serve(listener, router).await?;
    Ok(())
}
