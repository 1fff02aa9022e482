use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Cancellation and deadline scope threaded through every operation.
///
/// Cloning a context shares its token. [`Context::child`] derives a scope
/// that is cancelled with its parent but can also be cancelled on its own,
/// which is how a transfer stops its remaining chunks without touching the
/// caller's token.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token:    CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self { Self::default() }

    pub fn from_token(token: CancellationToken) -> Self { Self { token, deadline: None } }

    pub fn child(&self) -> Self {
        Self {
            token:    self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Child scope that expires after `timeout`, or earlier if the parent
    /// deadline comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self { self.with_deadline(Instant::now() + timeout) }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.child();
        child.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        child
    }

    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    pub fn token(&self) -> &CancellationToken { &self.token }

    pub fn cancel(&self) { self.token.cancel(); }

    pub fn is_cancelled(&self) -> bool { self.token.is_cancelled() }

    /// Fail fast when the scope is already cancelled or expired. An expired
    /// deadline cancels the token as well.
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            self.token.cancel();
            return Err(Error::Timeout);
        }
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn is_expired(&self) -> bool { self.deadline.is_some_and(|deadline| Instant::now() >= deadline) }

    /// Error for a scope whose token fired.
    fn ended(&self) -> Error {
        if self.is_expired() { Error::Timeout } else { Error::Cancelled }
    }

    /// Drive `fut` until it finishes or the scope ends.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(self.ended()),
                _ = tokio::time::sleep_until(deadline) => {
                    self.token.cancel();
                    Err(Error::Timeout)
                }
                out = fut => out,
            },
            None => tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(Error::Cancelled),
                out = fut => out,
            },
        }
    }

    /// Suspend the calling task, waking early on cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}
