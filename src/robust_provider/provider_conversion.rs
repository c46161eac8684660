use alloy::{
    network::{Ethereum, Network},
    providers::{
        DynProvider, Provider, RootProvider,
        fillers::{FillProvider, TxFiller},
    },
    transports::http::reqwest::Url,
};

use crate::robust_provider::{RobustProvider, RobustProviderBuilder, provider::Error};

/// Types that can be turned into an Alloy [`RootProvider`].
///
/// Lets [`RobustProviderBuilder`] accept connected providers as well as plain endpoints.
pub trait IntoRootProvider<N: Network = Ethereum> {
    /// Convert `self` into a [`RootProvider`].
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be constructed or connected.
    fn into_root_provider(self) -> impl Future<Output = Result<RootProvider<N>, Error>> + Send;
}

impl<N: Network> IntoRootProvider<N> for RobustProvider<N> {
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(self.primary().to_owned())
    }
}

impl<N: Network> IntoRootProvider<N> for RootProvider<N> {
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(self)
    }
}

impl<N: Network> IntoRootProvider<N> for &str {
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(RootProvider::connect(self).await?)
    }
}

impl<N: Network> IntoRootProvider<N> for Url {
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(RootProvider::connect(self.as_str()).await?)
    }
}

impl<F, P, N> IntoRootProvider<N> for FillProvider<F, P, N>
where
    F: TxFiller<N>,
    P: Provider<N>,
    N: Network,
{
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(self.root().to_owned())
    }
}

impl<N: Network> IntoRootProvider<N> for DynProvider<N> {
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(self.root().to_owned())
    }
}

/// Types that can be turned into a [`RobustProvider`].
///
/// Anything convertible into a [`RootProvider`] qualifies and gets the default retry policy. A
/// [`RobustProvider`] passed here is rebuilt around its primary provider.
pub trait IntoRobustProvider<N: Network = Ethereum> {
    /// Convert `self` into a [`RobustProvider`].
    ///
    /// # Errors
    ///
    /// Returns an error if the primary or any fallback provider fails to connect.
    fn into_robust_provider(self) -> impl Future<Output = Result<RobustProvider<N>, Error>> + Send;
}

impl<N, P> IntoRobustProvider<N> for P
where
    N: Network,
    P: IntoRootProvider<N> + Send,
{
    async fn into_robust_provider(self) -> Result<RobustProvider<N>, Error> {
        RobustProviderBuilder::new(self).build().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{providers::mock::Asserter, rpc::client::RpcClient};

    #[tokio::test]
    async fn robust_provider_converts_with_default_policy() -> anyhow::Result<()> {
        let asserter = Asserter::new();
        let root = RootProvider::<Ethereum>::new(RpcClient::mocked(asserter.clone()));
        let fragile = RobustProviderBuilder::fragile(root).build().await?;

        let converted = fragile.into_robust_provider().await?;

        assert_eq!(converted.max_retries, crate::robust_provider::DEFAULT_CLIENT_RETRIES);
        assert!(converted.fallback_providers.is_empty());
        Ok(())
    }
}
