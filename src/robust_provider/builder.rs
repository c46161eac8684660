use std::{pin::Pin, time::Duration};

use alloy::{network::Network, providers::RootProvider};

use crate::robust_provider::{IntoRootProvider, RobustProvider, provider::Error};

type PendingProvider<N> = Pin<Box<dyn Future<Output = Result<RootProvider<N>, Error>> + Send>>;

/// Default upper bound on a single RPC call, retries included.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of retries after the first failed attempt, for 3 attempts per call.
pub const DEFAULT_CLIENT_RETRIES: usize = 2;
/// Default base delay of the exponential backoff.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(500);

/// Builder for a [`RobustProvider`].
pub struct RobustProviderBuilder<N: Network, P: IntoRootProvider<N>> {
    primary: P,
    fallbacks: Vec<PendingProvider<N>>,
    call_timeout: Duration,
    max_retries: usize,
    min_delay: Duration,
}

impl<N: Network, P: IntoRootProvider<N>> RobustProviderBuilder<N, P> {
    /// Starts a builder around `provider` with the default retry policy.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            primary: provider,
            fallbacks: vec![],
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_retries: DEFAULT_CLIENT_RETRIES,
            min_delay: DEFAULT_MIN_DELAY,
        }
    }

    /// Starts a builder that never retries; only the call timeout applies.
    #[must_use]
    pub fn fragile(provider: P) -> Self {
        Self::new(provider).max_retries(0).min_delay(Duration::ZERO)
    }

    /// Adds a fallback provider, used once the primary has exhausted its retries.
    #[must_use]
    pub fn fallback<F: IntoRootProvider<N> + Send + 'static>(mut self, provider: F) -> Self {
        self.fallbacks.push(Box::pin(provider.into_root_provider()));
        self
    }

    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    /// Connects the primary and every fallback provider.
    ///
    /// # Errors
    ///
    /// Returns an error if any provider fails to connect.
    pub async fn build(self) -> Result<RobustProvider<N>, Error> {
        debug!(
            call_timeout_ms = self.call_timeout.as_millis(),
            max_retries = self.max_retries,
            fallback_count = self.fallbacks.len(),
            "Building RobustProvider"
        );

        let primary_provider = self.primary.into_root_provider().await?;

        let mut fallback_providers = Vec::with_capacity(self.fallbacks.len());
        for pending in self.fallbacks {
            fallback_providers.push(pending.await?);
        }

        Ok(RobustProvider {
            primary_provider,
            fallback_providers,
            call_timeout: self.call_timeout,
            max_retries: self.max_retries,
            min_delay: self.min_delay,
        })
    }
}

impl<N: Network, P: IntoRootProvider<N>> std::fmt::Debug for RobustProviderBuilder<N, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobustProviderBuilder")
            .field("fallbacks", &self.fallbacks.len())
            .field("call_timeout", &self.call_timeout)
            .field("max_retries", &self.max_retries)
            .field("min_delay", &self.min_delay)
            .finish_non_exhaustive()
    }
}
