//! Signal handling for cooperative cancellation
//!
//! A run can be cancelled through a broadcast channel. [`SignalHandler`] feeds
//! CTRL-C and SIGTERM into that channel; the aggregator polls its receiver at
//! every state transition and stops with whatever it has collected.

use tokio::signal;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Signal handler for graceful shutdown coordination
pub struct SignalHandler {
    shutdown_tx: broadcast::Sender<()>,
}

impl SignalHandler {
    /// Create a new signal handler with the given shutdown broadcaster
    pub fn new(shutdown_tx: broadcast::Sender<()>) -> Self {
        Self { shutdown_tx }
    }

    /// Setup signal handling for graceful shutdown (CTRL-C, SIGTERM)
    ///
    /// Returns a handle to the background task that monitors for signals.
    /// When a signal is received, it broadcasts shutdown to all subscribers.
    pub fn setup(&self) -> JoinHandle<()> {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                match signal::ctrl_c().await {
                    Ok(()) => info!("Ctrl+C signal received"),
                    Err(e) => {
                        warn!("Failed to install Ctrl+C handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                        info!("SIGTERM signal received");
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, cancelling run");
                },
                _ = terminate => {
                    info!("Received terminate signal, cancelling run");
                },
            }

            // Broadcast shutdown signal to all listeners
            let _ = shutdown_tx.send(());
        })
    }
}

/// Create a shutdown signal broadcaster
///
/// Returns a tuple of (sender, receiver) for shutdown coordination.
pub fn create_shutdown_channel() -> (broadcast::Sender<()>, broadcast::Receiver<()>) {
    broadcast::channel(1)
}

/// Non-blocking latch over a shutdown receiver
///
/// Once a shutdown has been observed it stays observed. A closed channel
/// means nobody can cancel any more, which is not a cancellation.
#[derive(Debug, Default)]
pub struct CancellationToken {
    receiver: Option<broadcast::Receiver<()>>,
    cancelled: bool,
}

impl CancellationToken {
    pub fn new(receiver: Option<broadcast::Receiver<()>>) -> Self {
        Self {
            receiver,
            cancelled: false,
        }
    }

    /// Poll the channel without waiting
    pub fn is_cancelled(&mut self) -> bool {
        if self.cancelled {
            return true;
        }
        if let Some(receiver) = self.receiver.as_mut() {
            match receiver.try_recv() {
                Ok(()) | Err(TryRecvError::Lagged(_)) => self.cancelled = true,
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => self.receiver = None,
            }
        }
        self.cancelled
    }
}
