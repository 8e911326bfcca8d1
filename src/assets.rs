//! Embedded web UI assets (§10), via `rust-embed` over a `build.rs`-created
//! placeholder directory, so the binary stays a single self-contained
//! executable. Served directly over HTTP.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "web/dist"]
pub struct Assets;

/// Serve an embedded asset by path, falling back to `index.html` for any
/// path with no exact match (client-side routing), and a 404 if even that
/// is missing.
pub async fn serve(path: &str) -> Response {
    let path = path.trim_start_matches('/');
    if let Some(file) = Assets::get(path) {
        return asset_response(path, file.data);
    }
    if let Some(index) = Assets::get("index.html") {
        return asset_response("index.html", index.data);
    }
    StatusCode::NOT_FOUND.into_response()
}

fn asset_response(path: &str, data: std::borrow::Cow<'static, [u8]>) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .body(Body::from(data.into_owned()))
        .expect("static response is always well-formed")
}
