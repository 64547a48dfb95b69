//! HTTP/HTTPS listener orchestration.
//!
//! `listen_and_serve` starts up to two listeners:
//! - an HTTPS listener with on-demand certificate issuance
//! - a plain HTTP listener, redirecting to HTTPS when both are active
//!
//! Both shut down gracefully when the shared cancellation token fires.

mod chain;
mod redirect;
mod server;
mod shutdown;

pub use server::listen_and_serve;
