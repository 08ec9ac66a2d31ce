//! Pauses between page requests.

use std::time::Duration;

use async_trait::async_trait;

/// Decides how long to wait before the next page request.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Suspends the caller until the next request may be sent.
    async fn pause(&self);
}

/// Waits a fixed duration between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::from_millis(crate::DEFAULT_DELAY_MS)
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// Never waits. For tests and local backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delay_is_half_a_second() {
        assert_eq!(FixedDelay::default().0, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn fixed_delay_sleeps_for_its_duration() {
        let start = std::time::Instant::now();
        FixedDelay::from_millis(20).pause().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn no_delay_returns_immediately() {
        NoDelay.pause().await;
    }
}
