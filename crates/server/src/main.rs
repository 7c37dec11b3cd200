//! Standalone server binary.
//!
//! Loads `Dataset/movies.csv` and `Dataset/ratings.csv` and listens on port
//! 8080, unless a JSON config file is given as the only argument.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use catalog::Catalog;
use server::{RecommendationService, Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args_os().nth(1) {
        Some(path) => ServerConfig::from_json_file(&PathBuf::from(path))?,
        None => ServerConfig::default(),
    };

    let load = Catalog::load_from_files(&config.movies_path, &config.ratings_path);
    for error in &load.errors {
        warn!("Catalog file problem: {}", error);
    }

    let service = RecommendationService::from_config(Arc::new(load.catalog), &config);
    let server = Server::bind(config.bind_addr, service).await?;
    info!("Server listening on port {}", server.local_addr()?.port());

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}
