use std::{fmt::Debug, sync::Arc, time::Duration};

use alloy::{
    eips::{BlockId, BlockNumberOrTag},
    network::{Ethereum, Network},
    providers::{Provider, RootProvider},
    rpc::types::{Filter, Log},
    transports::{RpcError, TransportErrorKind},
};
use backon::{ExponentialBuilder, Retryable};
use thiserror::Error;
use tokio::time::{error::Elapsed, timeout};

/// Errors returned by [`RobustProvider`] once retries and fallbacks are exhausted.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("operation timed out")]
    Timeout,
    #[error("RPC error: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),
    #[error("block not found, block id: {0}")]
    BlockNotFound(BlockId),
}

impl From<RpcError<TransportErrorKind>> for Error {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        Error::RpcError(Arc::new(err))
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::Timeout
    }
}

/// Provider wrapper that bounds, retries and fails over every RPC call it makes.
#[derive(Clone, Debug)]
pub struct RobustProvider<N: Network = Ethereum> {
    pub(crate) primary_provider: RootProvider<N>,
    pub(crate) fallback_providers: Vec<RootProvider<N>>,
    pub(crate) call_timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) min_delay: Duration,
}

impl<N: Network> RobustProvider<N> {
    /// Get a reference to the primary provider
    #[must_use]
    pub fn primary(&self) -> &RootProvider<N> {
        &self.primary_provider
    }

    /// Fetch a block header by number or tag.
    ///
    /// # Errors
    ///
    /// [`Error::BlockNotFound`] if the node has no such block, otherwise see
    /// [retry errors](#retry-errors).
    pub async fn get_block_by_number(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<N::BlockResponse, Error> {
        trace!(block = ?number, "eth_getBlockByNumber called");
        let result = self
            .try_operation_with_failover(move |provider| async move {
                provider.get_block_by_number(number).await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_getBlockByNumber failed");
        }
        result?.ok_or_else(|| Error::BlockNotFound(number.into()))
    }

    /// Fetch logs matching `filter`.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors).
    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, Error> {
        trace!("eth_getLogs called");
        let result = self
            .try_operation_with_failover(move |provider| async move {
                provider.get_logs(filter).await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_getLogs failed");
        }
        result
    }

    /// Runs `operation` against the primary provider, then against each fallback in turn.
    ///
    /// # Errors
    /// <a name="retry-errors"></a>
    ///
    /// * [`Error::Timeout`] if the last provider tried exceeded the call timeout.
    /// * [`Error::RpcError`] with the last provider's error once every provider has failed.
    pub(crate) async fn try_operation_with_failover<T: Debug, F, Fut>(
        &self,
        operation: F,
    ) -> Result<T, Error>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let primary = self.try_provider_with_timeout(&self.primary_provider, &operation).await;
        let mut last_error = match primary {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let total = self.fallback_providers.len();
        for (idx, provider) in self.fallback_providers.iter().enumerate() {
            info!(fallback = idx + 1, total = total, "Attempting fallback provider");
            match self.try_provider_with_timeout(provider, &operation).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    error!(fallback = idx + 1, error = %e, "Fallback provider failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn try_provider_with_timeout<T, F, Fut>(
        &self,
        provider: &RootProvider<N>,
        operation: F,
    ) -> Result<T, Error>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let backoff = ExponentialBuilder::default()
            .with_max_times(self.max_retries)
            .with_min_delay(self.min_delay);

        let attempt = (|| operation(provider.clone()))
            .retry(backoff)
            .notify(|err: &RpcError<TransportErrorKind>, after: Duration| {
                info!(error = %err, retry_in_ms = after.as_millis(), "RPC call failed, retrying");
            })
            .sleep(tokio::time::sleep);

        Ok(timeout(self.call_timeout, attempt).await??)
    }
}
