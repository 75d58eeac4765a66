/// ENS Proof - deterministic proof-of-usage service
///
/// Resolves ENS names or raw addresses over Ethereum JSON-RPC and derives a
/// reproducible Keccak-256 proof record per (address, chain) pair, singly or
/// in batches.

mod api;
mod batch;
mod config;
mod context;
mod error;
mod identity;
mod jobs;
mod metrics;
mod proof;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::ProofResult;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ProofResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let json = config.logging.json;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ens_proof=debug,tower_http=debug".into()),
        )
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();

    // Print banner
    print_banner();

    // Create application context
    let ctx = Arc::new(AppContext::new(config)?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    let _jobs = scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ______  _   _  _____     ____                    __
   / ____/ / | / // ___/    / __ \_________  ____  / _/
  / __/   /  |/ / \__ \    / /_/ / ___/ __ \/ __ \/ /_
 / /___  / /|  / ___/ /   / ____/ /  / /_/ / /_/ / __/
/_____/ /_/ |_/ /____/   /_/   /_/   \____/\____/_/

        Deterministic proof-of-usage service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
