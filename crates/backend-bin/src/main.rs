use std::path::PathBuf;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use gateway_lib::{
    config::Settings,
    router,
    storage::{MemSessionStore, MemUserStore},
    AppState,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Authenticated-session gateway
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, default_value = gateway_lib::config::CONFIG_FILE)]
    config: PathBuf,

    /// Override the bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

fn init_tracing(settings: &Settings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if settings.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_from(&args.config)?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }

    init_tracing(&settings);
    tracing::info!(?settings, "configuration loaded");

    let session_store = MemSessionStore::new(settings.session_ttl());
    let _reaper = session_store.spawn_reaper(settings.reaper_interval());

    let addr = settings.bind_addr;
    let state = Arc::new(AppState::new(
        settings,
        Arc::new(MemUserStore::new()),
        Arc::new(session_store),
    )?);

    let limiter = state.sign_in_limiter.clone();
    let interval = state.settings.reaper_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            limiter.cleanup();
        }
    });

    let app = router::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
