mod connectivity;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod tick_loop;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use state::{now_ms, AppState, SimState};
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use stellar_world::{build_initial_state, load_content, load_stars};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stellar_daemon", about = "Stellar simulation HTTP daemon")]
struct Args {
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Generation seed. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Milliseconds between ticks. 0 runs as fast as possible.
    #[arg(long, default_value_t = 1000)]
    tick_interval_ms: u64,
    /// Stop ticking after this many ticks; the server keeps serving.
    #[arg(long)]
    max_ticks: Option<u64>,
    #[arg(long, default_value_t = 3001)]
    port: u16,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
    /// Start with the tick loop paused.
    #[arg(long)]
    paused: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let content = load_content(&args.content_dir)?;
    let catalog = load_stars(&args.content_dir)?;
    let home = catalog
        .home_star()
        .context("home star missing from catalog")?
        .clone();
    let seed = args.seed.unwrap_or_else(rand::random);

    let mut ship = build_initial_state(&content, seed, &home, now_ms());
    // Chart the home neighbourhood on the first tick.
    ship.connectivity.pending_origin = Some(home.id.clone());

    let (event_tx, _) = tokio::sync::broadcast::channel(256);
    let app_state = AppState {
        sim: Arc::new(Mutex::new(SimState {
            ship,
            content,
            stars: catalog.stars,
        })),
        event_tx,
        paused: Arc::new(AtomicBool::new(args.paused)),
        tick_interval_ms: args.tick_interval_ms,
    };

    let router = routes::make_router_with_cors(app_state.clone(), &args.cors_origin)?;
    tokio::spawn(tick_loop::run_tick_loop(app_state, args.max_ticks));

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, seed, home = %home.id, "stellar_daemon listening");
    axum::serve(listener, router).await.context("serving HTTP")?;
    Ok(())
}
