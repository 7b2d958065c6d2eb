use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative cancellation handle.
///
/// Clones share one flag. Once cancelled it stays cancelled.
#[derive(Clone, Debug)]
pub struct Cancellation {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            sender: Arc::new(tx),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`Cancellation::cancel`] has been called.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.sender.subscribe();
        async move {
            let _ = rx.wait_for(|cancelled| *cancelled).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let cancel = Cancellation::new();
        let waiter = cancel.cancelled();

        let handle = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });

        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_after_the_fact() {
        let cancel = Cancellation::new();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), cancel.cancelled()).await.unwrap();
    }
}
