use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use voice_bridge::{http, upstream, AppState, Config};

#[derive(Parser)]
#[command(name = "voice-bridge")]
#[command(about = "Bridge µ-law telephony WebSocket clients to a PCM16 voice AI endpoint")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/voice-bridge")]
    config: String,

    /// Override server.bind
    #[arg(long)]
    bind: Option<String>,

    /// Override server.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Record upstream audio of every session
    #[arg(long)]
    record: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_bridge=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    if args.record {
        cfg.recording.enabled = true;
    }
    cfg.validate()?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    if cfg.recording.enabled {
        info!("Recording upstream audio to {}", cfg.recording.output_path);
    }
    if cfg.upstream.join_url.is_none() && cfg.upstream.resolved_api_key().is_none() {
        warn!(
            "No API key configured; sessions will be rejected until {} is set",
            voice_bridge::config::API_KEY_ENV
        );
    }

    let join_urls = upstream::from_config(&cfg.upstream)?;
    let addr = cfg.bind_addr();
    let state = AppState::new(cfg, join_urls);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);

    http::serve(listener, state, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
