//! Action submission (§6 Rust realization: "a future HTTP/WS
//! action-submission endpoint" driving the same tagged-enum `Action`
//! vocabulary used in-process). The reducer (component C) and the Mux
//! Protocol Endpoint (component G) are independent per §2's dependency
//! list; this is the view boundary where the two meet, guarded only by
//! the process-wide layout lock, never touching session state directly.

use super::AppState;
use axum::extract::State;
use axum::Json;
use paneflow_core::action::Action;

pub async fn post_action(State(state): State<AppState>, Json(action): Json<Action>) -> Json<serde_json::Value> {
    let mut layout = state.layout.lock();
    *layout = paneflow_layout::reduce(&layout, action);
    Json(serde_json::to_value(&*layout).expect("AppState always serializes"))
}
