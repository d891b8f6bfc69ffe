//! nimage - serve JPEG/PNG images as cached WebP.
//!
//! This binary loads the configuration, prepares the cache directory and
//! starts the HTTP server.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nimage::{
    cache::CacheStore,
    config::{Cli, ServiceConfig},
    pipeline::ImageService,
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging is not up yet; report to stderr.
    let config = match ServiceConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.debug || cli.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    run_serve(config).await
}

async fn run_serve(config: ServiceConfig) -> ExitCode {
    print_banner();

    info!("Configuration:");
    info!("  Source root: {}", config.source_root.display());
    info!("  Cache folder: {}", config.cache_folder.display());
    info!("  WebP quality: {}", config.quality);
    info!("  Cache max-age: {}s", config.cache_max_age);
    match config.cors_origins {
        Some(ref origins) if origins.is_empty() => warn!("  CORS: all cross-origin requests refused"),
        Some(ref origins) => info!("  CORS: {}", origins.join(", ")),
        None => info!("  CORS: any origin"),
    }

    let cache = CacheStore::new(&config.cache_folder);
    if let Err(e) = cache.ensure_root().await {
        error!("Cannot prepare cache folder: {}", e);
        return ExitCode::FAILURE;
    }

    let image_service = ImageService::new(&config.source_root, cache, config.quality);
    let router = create_router(image_service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl -o out.webp http://{}/path/to/image.jpg", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("███╗   ██╗██╗███╗   ███╗ █████╗  ██████╗ ███████╗");
    info!("████╗  ██║██║████╗ ████║██╔══██╗██╔════╝ ██╔════╝");
    info!("██╔██╗ ██║██║██╔████╔██║███████║██║  ███╗█████╗  ");
    info!("██║╚██╗██║██║██║╚██╔╝██║██╔══██║██║   ██║██╔══╝  ");
    info!("██║ ╚████║██║██║ ╚═╝ ██║██║  ██║╚██████╔╝███████╗");
    info!("╚═╝  ╚═══╝╚═╝╚═╝     ╚═╝╚═╝  ╚═╝ ╚═════╝ ╚══════╝");
    info!("");
    info!("                      v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "nimage=debug,tower_http=debug"
    } else {
        "nimage=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the service configuration.
fn build_router_config(config: &ServiceConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(&config.cache_clear_key)
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(config.debug);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
