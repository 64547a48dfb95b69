//! Setup-phase error type.
//!
//! Only failures that occur before the listener tasks are spawned surface as
//! `ServerError`. Failures inside a running serve loop go through the fatal
//! hook on `ListenOpts` instead and never propagate back to the caller.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind listener: {0}")]
    Bind(#[from] io::Error),

    #[error("CA certificate error: {0}")]
    Ca(String),

    #[error("Failed to build TLS configuration: {0}")]
    TlsConfig(String),
}
