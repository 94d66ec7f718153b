use std::future::Future;

use tokio::sync::watch;

use crate::error::{Error, Result};

/// Cancellation latches. Dropping the scope without cancelling never cancels.
#[derive(Debug)]
pub struct CancelScope {
    tx: watch::Sender<bool>,
}

impl CancelScope {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token whose scope is already gone, so it can never be cancelled.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Scope dropped without cancelling.
            std::future::pending::<()>().await;
        }
    }

    /// Drives `fut` to completion unless the scope is cancelled first, in
    /// which case `fut` is dropped and `Error::Cancelled` is returned.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Error::Cancelled),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_completes_when_not_cancelled() {
        let scope = CancelScope::new();
        let token = scope.token();

        let value = token.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_future() {
        let scope = CancelScope::new();
        let token = scope.token();

        let (result, _) = tokio::join!(
            token.run(std::future::pending::<Result<()>>()),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                scope.cancel();
            }
        );

        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancellation_latches_for_late_tokens() {
        let scope = CancelScope::new();
        scope.cancel();

        let late = scope.token();
        assert!(late.is_cancelled());
        assert!(scope.is_cancelled());

        let result = late.run(async { Ok(()) }).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_dropped_scope_does_not_cancel() {
        let token = {
            let scope = CancelScope::new();
            scope.token()
        };

        assert!(!token.is_cancelled());
        assert_eq!(token.run(async { Ok("done") }).await.unwrap(), "done");
        assert_eq!(CancelToken::never().run(async { Ok(1) }).await.unwrap(), 1);
    }
}
