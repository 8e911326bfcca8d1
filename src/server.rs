//! Process bootstrap (§10): port binding, a sidecar file recording where
//! the server ended up listening, and graceful shutdown — a small range
//! of candidate ports tried first, OS-assigned as fallback, a
//! `watch`-driven shutdown signal driven directly by `main` since this
//! binary has no embedding app lifecycle of its own to hook into.

use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Try `start..=end` first, then fall back to an OS-assigned port.
pub async fn bind(bind_host: &str, start: u16, end: u16) -> anyhow::Result<TcpListener> {
    let host: std::net::IpAddr = bind_host.parse().context("invalid bind_host")?;
    for port in start..=end {
        let addr = SocketAddr::new(host, port);
        if let Ok(listener) = TcpListener::bind(addr).await {
            return Ok(listener);
        }
    }
    let addr = SocketAddr::new(host, 0);
    TcpListener::bind(addr).await.context("failed to bind any port, including OS-assigned")
}

/// Wait until the shutdown signal fires.
pub async fn shutdown_signal(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// Wire `shutdown_tx` to Ctrl-C so a foreground run shuts down cleanly.
pub async fn watch_ctrl_c(shutdown_tx: watch::Sender<bool>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        log::info!("received interrupt, shutting down");
        let _ = shutdown_tx.send(true);
    }
}

fn sidecar_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(std::env::temp_dir).join("paneflow").join("paneflow.json")
}

/// Write the sidecar file atomically (temp file + rename), `0o600` on
/// Unix, so a partially-written file is never observed (§10).
pub fn write_sidecar(port: u16) -> anyhow::Result<()> {
    let path = sidecar_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::json!({
        "port": port,
        "pid": std::process::id(),
    });

    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, serde_json::to_string_pretty(&content)?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

pub fn remove_sidecar() {
    let path = sidecar_path();
    if path.exists() {
        let _ = std::fs::remove_file(&path);
    }
}

/// Remove a sidecar left behind by a process that no longer exists.
pub fn cleanup_stale_sidecar() {
    let path = sidecar_path();
    let Ok(data) = std::fs::read_to_string(&path) else { return };
    let Ok(json) = serde_json::from_str::<serde_json::Value>(&data) else {
        let _ = std::fs::remove_file(&path);
        return;
    };
    if let Some(pid) = json.get("pid").and_then(|v| v.as_u64()) {
        if !is_process_alive(pid as u32) {
            log::info!("removing stale sidecar (pid {pid} is dead)");
            let _ = std::fs::remove_file(&path);
        }
    }
}

fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}
