//! Handler chain composition.
//!
//! The listener's own management routes are consulted first; a request that
//! matches one is answered there and stops. Everything else falls through to
//! the caller's handler untouched.

use axum::routing::get;
use axum::Router;
use http::header;

/// Compose the management routes with the caller's handler.
pub fn compose(ca_pem: String, handler: Router) -> Router {
    internal_router(ca_pem).fallback_service(handler)
}

/// Management routes served by the listener itself. `GET /cacerts` returns
/// the active CA certificate PEM so clients can bootstrap trust.
fn internal_router(ca_pem: String) -> Router {
    Router::new().route(
        "/cacerts",
        get(move || {
            let body = ca_pem.clone();
            async move { ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body) }
        }),
    )
}
