use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use fontleak_core::FontCache;

mod browser;
mod config;
mod error;
mod orchestrator;
mod routes;
mod session;
mod store;

#[cfg(test)]
mod tests;

use config::{CliArgs, Settings};
use orchestrator::LeakOrchestrator;
use store::SessionStore;

/// Shared application state handed to every route handler via axum's
/// `State` extractor.
pub struct AppState {
    pub settings: Settings,
    pub orchestrator: LeakOrchestrator,
    next_sid: std::sync::atomic::AtomicU64,
}

impl AppState {
    pub fn next_sid(&self) -> String {
        let n = self
            .next_sid
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("s{n}")
    }
}

/// Idle sessions older than this are swept, bounding memory in long-running
/// processes (spec.md never garbage collects except at exit; this sweeper
/// is the ambient-concern addition documented in DESIGN.md).
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const MAX_IDLE: Duration = Duration::from_secs(3600);

fn main() -> Result<()> {
    env_logger::init();
    let args = CliArgs::parse();
    let settings = match Settings::from_args(args) {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(settings))
}

async fn run(settings: Settings) -> Result<()> {
    let listen: SocketAddr = settings.listen.parse()?;
    let enable_trace = settings.fastapi_logging;

    let store = Arc::new(SessionStore::new());
    let fonts = Arc::new(FontCache::new());
    let orchestrator = LeakOrchestrator::new(
        store.clone(),
        fonts,
        settings.host.clone(),
        settings.host_leak.clone(),
    );

    let state = Arc::new(AppState {
        settings,
        orchestrator,
        next_sid: std::sync::atomic::AtomicU64::new(1),
    });

    spawn_sweeper(store);

    let router = routes::build_router(state, enable_trace);
    log::info!("fontleak listening on {listen}");

    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn spawn_sweeper(store: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            log::trace!("sweeping idle sessions (store size: {})", store.len());
            store.sweep_idle(MAX_IDLE);
        }
    });
}
