//! Ctrl+C delivery.
//!
//! Once the watcher is installed the process no longer dies on SIGINT; the
//! session decides what an interrupt means (cancel the pending call, or quit
//! when idle).

use tokio::sync::mpsc;

pub struct Interrupts {
    rx: mpsc::UnboundedReceiver<()>,
}

impl Interrupts {
    /// Forward every Ctrl+C the process receives.
    pub fn ctrl_c() -> Self {
        let (tx, interrupts) = Self::channel();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupt received");
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        interrupts
    }

    /// Interrupts raised by hand through the returned sender.
    pub fn channel() -> (mpsc::UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the next interrupt. Never resolves once every sender is gone.
    /// Cancel safe.
    pub async fn recv(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    /// Drop interrupts that arrived while something else won the race.
    pub fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, timeout};

    #[tokio::test]
    async fn test_recv_sees_raised_interrupt() {
        let (tx, mut interrupts) = Interrupts::channel();
        tx.send(()).unwrap();
        assert!(timeout(Duration::from_millis(100), interrupts.recv()).await.is_ok());
    }

    #[tokio::test]
    async fn test_drain_discards_stale_interrupts() {
        let (tx, mut interrupts) = Interrupts::channel();
        tx.send(()).unwrap();
        tx.send(()).unwrap();
        interrupts.drain();
        assert!(timeout(Duration::from_millis(50), interrupts.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_source_never_fires() {
        let (tx, mut interrupts) = Interrupts::channel();
        drop(tx);
        assert!(timeout(Duration::from_millis(50), interrupts.recv()).await.is_err());
    }
}
