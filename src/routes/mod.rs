//! Route assembly (§4.G, §10): a typed `AppState`, CORS, and a body size
//! limit. No auth middleware — the wire protocol has no pairing/token
//! handshake anywhere, so there is nothing for one to guard.

pub mod action;
pub mod legacy;
pub mod mux;

use paneflow_core::config::Config;
use paneflow_layout::AppState as LayoutState;
use paneflow_session::{ClientRegistry, SessionTable};
use parking_lot::Mutex;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared state available to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub layout: Arc<Mutex<LayoutState>>,
    pub sessions: Arc<SessionTable>,
    pub clients: Arc<ClientRegistry>,
    pub config: Arc<Config>,
}

pub fn build_router(state: AppState) -> axum::Router {
    let api = axum::Router::new()
        .route("/ws", axum::routing::get(dispatch_ws))
        .route("/action", axum::routing::post(action::post_action));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    api.fallback(serve_asset)
        .layer(cors)
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}

/// `/ws?mode=mux&cols=&rows=` is the Mux Protocol Endpoint (§4.G);
/// `/ws?cols=&rows=` with no `mode` is the legacy per-session endpoint
/// (§6). Both share a path so a single reverse-proxy rule covers them.
#[derive(serde::Deserialize)]
struct WsQuery {
    #[serde(default)]
    mode: Option<String>,
    cols: Option<u16>,
    rows: Option<u16>,
}

async fn dispatch_ws(
    state: axum::extract::State<AppState>,
    query: axum::extract::Query<WsQuery>,
    ws: axum::extract::WebSocketUpgrade,
) -> axum::response::Response {
    use axum::response::IntoResponse;
    match query.mode.as_deref() {
        Some("mux") => mux::ws_handler(state, ws).await.into_response(),
        _ => legacy::ws_handler(state, query.cols, query.rows, ws).await.into_response(),
    }
}

async fn serve_asset(uri: axum::http::Uri) -> axum::response::Response {
    crate::assets::serve(uri.path()).await
}
