//! Listener orchestration.
//!
//! `listen_and_serve` resolves the CA and storage, binds the requested ports,
//! and spawns one serve task plus one shutdown watcher per listener. It
//! returns as soon as the tasks are scheduled. All binds and TLS construction
//! happen up front, so a setup failure returns an error with no background
//! task running and no socket serving.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio_util::sync::CancellationToken;

use crate::cert::{self, CaPair, DynamicResolver, MemoryStorage, TlsStorage};
use crate::error::ServerError;
use crate::opts::{FatalHook, ListenOpts, ListenerKind, DEFAULT_CA_DIR};

use super::{chain, redirect, shutdown};

/// Start the requested listeners and return once they are scheduled.
///
/// A port of `0` disables the corresponding listener; both being `0` starts
/// nothing and succeeds. When both listeners start, the HTTP listener serves
/// a permanent redirect to the HTTPS port; otherwise it serves `handler`
/// directly. Cancelling `cancel` shuts both listeners down gracefully.
pub async fn listen_and_serve(
    cancel: CancellationToken,
    https_port: u16,
    http_port: u16,
    handler: Router,
    opts: ListenOpts,
) -> Result<(), ServerError> {
    let on_fatal = opts.on_fatal.clone().unwrap_or_else(default_fatal_hook);

    let mut http_handler = handler.clone();

    let https = if https_port > 0 {
        let ca = Arc::new(resolve_ca(&opts)?);
        let storage: Arc<dyn TlsStorage> = opts
            .storage
            .clone()
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));

        let listener = bind(https_port).await?;
        let resolver = DynamicResolver::new(ca.clone(), storage);
        let tls_config = build_tls_config(resolver)?;

        // Management routes first, caller's handler as the fallthrough. The
        // HTTP listener gets the redirect-wrapped variant of the same chain.
        let composed = chain::compose(ca.cert_pem.clone(), handler);
        http_handler = redirect::wrap(composed.clone(), https_port);

        Some((listener, tls_config, composed))
    } else {
        None
    };

    let http = if http_port > 0 {
        Some((bind(http_port).await?, http_handler))
    } else {
        None
    };

    if let Some((listener, tls_config, app)) = https {
        let handle = Handle::new();
        shutdown::watch(handle.clone(), cancel.clone(), ListenerKind::Https);

        let on_fatal = on_fatal.clone();
        tokio::spawn(async move {
            tracing::info!(port = https_port, "Listening on 0.0.0.0 (https)");
            let result = axum_server::from_tcp_rustls(listener, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await;
            if let Err(err) = result {
                on_fatal(ListenerKind::Https, err);
            }
        });
    }

    if let Some((listener, app)) = http {
        let handle = Handle::new();
        shutdown::watch(handle.clone(), cancel, ListenerKind::Http);

        tokio::spawn(async move {
            tracing::info!(port = http_port, "Listening on 0.0.0.0 (http)");
            let result = axum_server::from_tcp(listener)
                .handle(handle)
                .serve(app.into_make_service())
                .await;
            if let Err(err) = result {
                on_fatal(ListenerKind::Http, err);
            }
        });
    }

    Ok(())
}

/// Resolve the CA pair: a fully supplied PEM pair wins, anything else falls
/// back to load-or-generate under `ca_dir`.
fn resolve_ca(opts: &ListenOpts) -> Result<CaPair, ServerError> {
    match (&opts.ca_cert, &opts.ca_key) {
        (Some(cert_pem), Some(key_pem)) => CaPair::from_pem(cert_pem, key_pem),
        (None, None) => load_default_ca(opts),
        _ => {
            tracing::warn!(
                "CA certificate and key must be supplied together; falling back to load-or-generate"
            );
            load_default_ca(opts)
        }
    }
}

fn load_default_ca(opts: &ListenOpts) -> Result<CaPair, ServerError> {
    let dir = opts
        .ca_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CA_DIR));
    cert::load_or_gen(&dir)
}

/// Bind a listening socket on all interfaces. The returned std listener is
/// already in non-blocking mode.
async fn bind(port: u16) -> Result<std::net::TcpListener, ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    Ok(listener.into_std()?)
}

fn build_tls_config(resolver: DynamicResolver) -> Result<RustlsConfig, ServerError> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ServerError::TlsConfig(e.to_string()))?
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(resolver));
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(RustlsConfig::from_config(Arc::new(config)))
}

/// A listener that dies while serving is unrecoverable for the process.
fn default_fatal_hook() -> FatalHook {
    Arc::new(|kind, err| {
        tracing::error!(listener = %kind, error = %err, "Listener failed, exiting");
        std::process::exit(1);
    })
}
