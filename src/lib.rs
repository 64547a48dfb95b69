//! dynlistener - HTTP/HTTPS listener orchestration.
//!
//! Given two ports and an axum `Router`, [`listen_and_serve`] starts zero,
//! one, or two listeners: a TLS-terminated HTTPS listener whose certificates
//! are issued on demand per SNI name from a local CA, and a plain HTTP
//! listener that redirects to HTTPS when both are active. A shared
//! cancellation token tears both down gracefully.
//!
//! The crate emits `tracing` events but never installs a subscriber; that is
//! the embedding application's job.

pub mod cert;
pub mod error;
pub mod http;
pub mod opts;

pub use error::ServerError;
pub use http::listen_and_serve;
pub use opts::{FatalHook, ListenOpts, ListenerKind};
