//! Graceful shutdown wiring.

use axum_server::Handle;
use tokio_util::sync::CancellationToken;

use crate::opts::ListenerKind;

/// Spawn a watcher that waits for `cancel` and then asks the listener behind
/// `handle` to shut down gracefully.
///
/// The shutdown itself carries no deadline: the listener stops accepting new
/// connections immediately and in-flight requests are allowed to drain. The
/// token that triggered the shutdown cannot pre-empt it.
pub fn watch(handle: Handle, cancel: CancellationToken, kind: ListenerKind) {
    tokio::spawn(async move {
        cancel.cancelled().await;
        tracing::info!(listener = %kind, "Cancellation received, initiating graceful shutdown");
        handle.graceful_shutdown(None);
    });
}
