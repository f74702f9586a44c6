//! Bounded drain after a shutdown signal

use std::time::Duration;

use tokio::sync::oneshot;

/// Resolves `timeout` after `signalled` fires.
///
/// Pending forever if the sender is dropped without sending, so a server that
/// stops on its own is never cut short.
pub async fn drain_deadline(signalled: oneshot::Receiver<()>, timeout: Duration) {
    if signalled.await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::info!("Waiting up to {:?} for connections to close", timeout);
    tokio::time::sleep(timeout).await;
}
