//! dualport: serve the viewer over HTTP and HTTPS.
//!
//! This is the application entry point. It initializes tracing, loads
//! configuration from a TOML file, makes sure TLS support is available, builds
//! the router and brings up both listeners.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dualport::config::{AppConfig, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER};
use dualport::http::{install_crypto_provider, setup_shutdown_handler, OnReady};
use dualport::routes::create_router;
use dualport::{AppState, Bootstrapper, RuntimeStatus};

/// dualport: serve one web application over HTTP and HTTPS
#[derive(Parser, Debug)]
#[command(name = "dualport", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log level filter (e.g., "dualport=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Bind address, overrides http.host
    #[arg(long)]
    host: Option<String>,

    /// Base port for the plaintext listener, overrides http.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)?;
    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));
    if config.logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(config = %args.config, "Loaded configuration");

    // TLS support must be present before anything touches the network
    if let Err(e) = install_crypto_provider() {
        tracing::error!(error = %e, "TLS support is unavailable, rebuild with a rustls crypto provider");
        std::process::exit(1);
    }

    let status = RuntimeStatus::new();
    let state = AppState::new(config.clone(), status.clone());
    let app = create_router(state);

    let bootstrapper = Bootstrapper::new(config.tls.clone()).with_status(status);
    let mut on_ready = OnReady::new(|scheme, address, port| {
        tracing::info!(%scheme, address, port, "Server ready");
        Ok(())
    });

    let runtime = bootstrapper
        .start(
            app,
            &config.http.host,
            config.http.port,
            config.http.verbose,
            Some(&mut on_ready),
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Error starting the server"))?;

    tracing::info!(
        plain = %runtime.plain(),
        secure = %runtime.secure(),
        self_signed = runtime.identity().is_self_signed(),
        "Listening"
    );

    setup_shutdown_handler(runtime.handles());
    runtime.wait().await?;

    Ok(())
}
