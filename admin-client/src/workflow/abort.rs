use std::future::Future;

use shared::{Result, ServiceError};
use tokio::sync::watch;

/// Owner side of a cancellation channel. Aborting is permanent.
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the handle aborts. Never resolves if the handle is dropped first.
    pub async fn aborted(&mut self) {
        if self.rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Runs `request` unless the signal fires first.
pub async fn abortable<T, F>(mut signal: AbortSignal, request: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if signal.is_aborted() {
        return Err(ServiceError::Cancelled);
    }

    tokio::select! {
        result = request => result,
        _ = signal.aborted() => Err(ServiceError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_request_completes_without_abort() {
        let handle = AbortHandle::new();
        let result = abortable(handle.signal(), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_abort_cancels_pending_request() {
        let handle = AbortHandle::new();
        let signal = handle.signal();

        let pending = tokio::spawn(abortable(signal, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }));

        tokio::task::yield_now().await;
        handle.abort();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(ServiceError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_aborted_short_circuits() {
        let handle = AbortHandle::new();
        handle.abort();
        assert!(handle.is_aborted());

        let result: Result<()> = abortable(handle.signal(), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Cancelled)));
    }
}
