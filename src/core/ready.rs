// One-shot readiness signal for a tracking session

use std::sync::Arc;
use tokio::sync::watch;

/// Producer side. Cloneable; firing more than once is a no-op.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Resolves the signal. Returns `true` only for the call that resolved it.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> Ready {
        Ready {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side. Can be awaited any number of times, or never.
#[derive(Debug, Clone)]
pub struct Ready {
    rx: watch::Receiver<bool>,
}

impl Ready {
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once the signal fires, or once every producer is gone.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|ready| *ready).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fire_once() {
        let signal = ReadySignal::new();
        let ready = signal.subscribe();
        assert!(!ready.is_ready());
        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(ready.is_ready());
        ready.clone().wait().await;
        ready.wait().await;
    }

    #[tokio::test]
    async fn test_wait_before_fire() {
        let signal = ReadySignal::new();
        let waiter = tokio::spawn(signal.subscribe().wait());
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.fire();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("ready never resolved")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_producer_releases_waiters() {
        let signal = ReadySignal::new();
        let ready = signal.subscribe();
        drop(signal);
        tokio::time::timeout(Duration::from_secs(1), ready.wait())
            .await
            .expect("waiter hung after producer dropped");
    }
}
