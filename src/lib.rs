//! Library surface backing the `paneflow` binary, split out so the route
//! assembly (§4.G, §6) can be exercised end-to-end by an integration test
//! driving real `tokio-tungstenite` clients against a bound
//! `TcpListener`, rather than only through unit tests of its inner
//! pieces.

pub mod assets;
pub mod routes;
pub mod server;
