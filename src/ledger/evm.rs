//! [`LedgerClient`] for EVM chains, backed by a [`RobustProvider`].
//!
//! EVM nodes index logs natively, so a block span is loaded with a single `eth_getLogs` call
//! and the logs are regrouped into the transactions that emitted them.

use std::ops::RangeInclusive;

use alloy::{
    consensus::BlockHeader,
    eips::BlockNumberOrTag,
    network::{BlockResponse, Ethereum, Network, primitives::HeaderResponse},
    primitives::{Address, BlockNumber},
    rpc::types::{Filter, Log},
};

use crate::{
    error::LedgerError,
    ledger::{BlockHandle, LedgerClient, MessageKind, OutMessage, Transaction},
    robust_provider::{self, IntoRobustProvider, RobustProvider},
};

#[derive(Clone, Debug)]
pub struct EvmLedger<N: Network = Ethereum> {
    provider: RobustProvider<N>,
}

impl<N: Network> EvmLedger<N> {
    #[must_use]
    pub fn new(provider: RobustProvider<N>) -> Self {
        Self { provider }
    }

    /// Wraps anything convertible into a [`RobustProvider`], using its default retry policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to connect.
    pub async fn connect(provider: impl IntoRobustProvider<N>) -> Result<Self, LedgerError> {
        Ok(Self::new(provider.into_robust_provider().await?))
    }

    #[must_use]
    pub fn provider(&self) -> &RobustProvider<N> {
        &self.provider
    }
}

fn handle_of<N: Network>(block: &N::BlockResponse) -> BlockHandle {
    let header = block.header();
    BlockHandle::new(header.number(), header.hash())
}

impl<N: Network> LedgerClient for EvmLedger<N> {
    async fn head(&self) -> Result<BlockHandle, LedgerError> {
        let block = self.provider.get_block_by_number(BlockNumberOrTag::Latest).await?;
        Ok(handle_of::<N>(&block))
    }

    async fn block(&self, number: BlockNumber) -> Result<BlockHandle, LedgerError> {
        match self.provider.get_block_by_number(number.into()).await {
            Ok(block) => Ok(handle_of::<N>(&block)),
            Err(robust_provider::Error::BlockNotFound(_)) => {
                Err(LedgerError::BlockNotFound(number))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn transactions(
        &self,
        contract: Address,
        blocks: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let filter =
            Filter::new().address(contract).from_block(*blocks.start()).to_block(*blocks.end());
        let logs = self.provider.get_logs(&filter).await?;

        debug!(
            from_block = *blocks.start(),
            to_block = *blocks.end(),
            log_count = logs.len(),
            "Fetched contract logs"
        );

        Ok(group_by_transaction(logs))
    }
}

/// Folds consecutive logs of the same transaction into one [`Transaction`].
///
/// Nodes return logs ordered by block and log index, so a transaction's logs are contiguous.
fn group_by_transaction(logs: Vec<Log>) -> Vec<Transaction> {
    let mut txs: Vec<Transaction> = Vec::new();

    for log in logs.into_iter().filter(|log| !log.removed) {
        let hash = log.transaction_hash.unwrap_or_default();
        let block_number = log.block_number.unwrap_or_default();
        let message = OutMessage {
            kind: MessageKind::ExternalOut,
            topic: log.topics().first().copied(),
            payload: log.data().data.clone(),
        };

        match txs.last_mut() {
            Some(tx) if tx.hash == hash && tx.block_number == block_number => {
                tx.messages.push(message);
            }
            _ => txs.push(Transaction { hash, block_number, messages: vec![message] }),
        }
    }

    txs
}
