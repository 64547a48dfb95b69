//! Listener options.
//!
//! `ListenOpts` bundles everything `listen_and_serve` accepts beyond the two
//! ports and the handler. Every field is optional; the resolution order for
//! each is "supplied value, else default" and is documented on the field.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cert::TlsStorage;

/// Directory the auto-generated CA is persisted to when `ca_dir` is not set.
pub const DEFAULT_CA_DIR: &str = "certs";

/// Which listener a runtime failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Http,
    Https,
}

impl std::fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerKind::Http => f.write_str("http"),
            ListenerKind::Https => f.write_str("https"),
        }
    }
}

/// Callback invoked when a serve loop fails for any reason other than
/// graceful shutdown. The default hook logs the error and exits the process.
pub type FatalHook = Arc<dyn Fn(ListenerKind, io::Error) + Send + Sync>;

/// Optional configuration for `listen_and_serve`.
#[derive(Default)]
pub struct ListenOpts {
    /// CA certificate PEM. Used only when `ca_key` is also set; a partial
    /// pair is treated as absent and falls back to load-or-generate.
    pub ca_cert: Option<String>,

    /// CA private key PEM, matching `ca_cert`.
    pub ca_key: Option<String>,

    /// Where the load-or-generate fallback persists the CA.
    /// Defaults to [`DEFAULT_CA_DIR`].
    pub ca_dir: Option<PathBuf>,

    /// Storage for issued leaf certificates. Defaults to a fresh in-memory
    /// store, so certificates are reissued after a restart.
    pub storage: Option<Arc<dyn TlsStorage>>,

    /// Runtime-failure callback. Defaults to log-and-exit.
    pub on_fatal: Option<FatalHook>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_kind_display() {
        assert_eq!(ListenerKind::Http.to_string(), "http");
        assert_eq!(ListenerKind::Https.to_string(), "https");
    }

    #[test]
    fn test_default_opts_are_empty() {
        let opts = ListenOpts::default();
        assert!(opts.ca_cert.is_none());
        assert!(opts.ca_key.is_none());
        assert!(opts.ca_dir.is_none());
        assert!(opts.storage.is_none());
        assert!(opts.on_fatal.is_none());
    }
}
