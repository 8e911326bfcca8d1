//! Process entry point (§10). Logging, config, a multi-thread tokio
//! runtime, port binding, sidecar file, and graceful shutdown, all hosted
//! directly in `main` rather than inside an embedding app's own runtime.

use paneflow::{routes, server};
use paneflow_core::config::Config;
use paneflow_layout::AppState as LayoutState;
use paneflow_session::{ClientRegistry, PortablePtySpawner, SessionTable};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = load_config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("paneflow")
        .build()?;

    runtime.block_on(run(Arc::new(config)))
}

fn config_path() -> std::path::PathBuf {
    dirs::config_dir().unwrap_or_else(std::env::temp_dir).join("paneflow").join("config.yaml")
}

fn load_config() -> Config {
    Config::load_or_default(&config_path())
}

async fn run(config: Arc<Config>) -> anyhow::Result<()> {
    server::cleanup_stale_sidecar();

    let listener = server::bind(&config.bind_host, config.port_range_start, config.port_range_end).await?;
    let port = listener.local_addr()?.port();
    log::info!("paneflow listening on {}:{port}", config.bind_host);

    if let Err(err) = server::write_sidecar(port) {
        log::warn!("failed to write sidecar file: {err}");
    }

    let spawner = Arc::new(PortablePtySpawner);
    let sessions = Arc::new(SessionTable::new(
        spawner,
        config.working_directory.clone(),
        Config::scrollback_lines_clamped(config.scrollback_lines),
        config.broadcast_capacity,
    ));
    let clients = Arc::new(ClientRegistry::new());
    let layout = Arc::new(Mutex::new(LayoutState::initial()));

    let state = routes::AppState { layout, sessions, clients, config };
    let app = routes::build_router(state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(server::watch_ctrl_c(shutdown_tx));

    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .with_graceful_shutdown(server::shutdown_signal(shutdown_rx))
        .await?;

    server::remove_sidecar();
    log::info!("paneflow shut down");
    Ok(())
}
