//! Cancellation shared between a program session and its suspension points.

use std::time::Duration;

use tokio::sync::watch;

/// Owner side: flips the flag the tokens observe.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelSource { tx }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Arm for a new session.
    pub fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token nobody can cancel.
    pub fn never() -> Self {
        CancelSource::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the source is gone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Sleep for `duration` unless cancelled first. Returns `false` on cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_without_cancellation() {
        let source = CancelSource::new();
        let token = source.token();
        let start = tokio::time::Instant::now();
        assert!(token.sleep(Duration::from_millis(300)).await);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(305));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_cuts_a_sleep_short() {
        let source = CancelSource::new();
        let token = source.token();
        let sleeper = tokio::spawn(async move { token.sleep(Duration::from_secs(10)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        source.cancel();
        source.cancel();

        assert!(!sleeper.await.unwrap());
        assert!(source.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_rearms_the_source() {
        let source = CancelSource::new();
        source.cancel();
        assert!(source.token().is_cancelled());
        source.reset();
        assert!(!source.token().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn never_token_does_not_fire() {
        let token = CancelToken::never();
        assert!(token.sleep(Duration::from_millis(5)).await);
    }
}
