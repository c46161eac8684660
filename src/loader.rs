use alloy::primitives::Address;

use crate::{
    error::ConfirmError,
    ledger::{BlockRange, LedgerClient, Transaction},
    range_iterator::RangeIterator,
};

/// Blocks requested per transaction-load call.
pub const DEFAULT_TX_BATCH_SIZE: u64 = 100;

/// Loads the transactions touching a contract, one window of `batch_size` blocks at a time.
#[derive(Debug, Clone)]
pub struct TransactionLoader<C> {
    client: C,
    batch_size: u64,
}

impl<C: LedgerClient> TransactionLoader<C> {
    /// # Panics
    ///
    /// Panics if `batch_size` is 0.
    #[must_use]
    pub fn new(client: C, batch_size: u64) -> Self {
        assert!(batch_size >= 1, "batch_size must be at least 1");
        Self { client, batch_size }
    }

    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Every transaction in `range` that touched `contract`, in ledger order.
    ///
    /// # Errors
    ///
    /// [`ConfirmError::LoadTransactions`] naming the failed window. Nothing is returned from the
    /// windows that did load.
    pub async fn load(
        &self,
        range: &BlockRange,
        contract: Address,
    ) -> Result<Vec<Transaction>, ConfirmError> {
        let mut txs = Vec::new();

        for window in RangeIterator::new(range.blocks(), self.batch_size) {
            let (from_block, to_block) = (*window.start(), *window.end());
            let batch = self.client.transactions(contract, window).await.map_err(|source| {
                ConfirmError::LoadTransactions { from_block, to_block, source }
            })?;
            trace!(
                from_block = from_block,
                to_block = to_block,
                tx_count = batch.len(),
                "Loaded transaction batch"
            );
            txs.extend(batch);
        }

        Ok(txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::LedgerError,
        ledger::{BlockHandle, OutMessage},
        test_utils::{CONTRACT, MockLedger},
    };
    use alloy::primitives::{B256, BlockHash};

    fn range(from_exclusive: Option<u64>, to: u64) -> BlockRange {
        BlockRange {
            previous: from_exclusive.map(|n| BlockHandle::new(n, BlockHash::ZERO)),
            to: BlockHandle::new(to, BlockHash::ZERO),
        }
    }

    #[tokio::test]
    async fn loads_every_window_in_order() -> anyhow::Result<()> {
        let ledger = MockLedger::new();
        for n in 1..=7u8 {
            ledger.mine(CONTRACT, vec![OutMessage::log(B256::ZERO, vec![n])]);
        }
        let loader = TransactionLoader::new(ledger.clone(), 3);

        let txs = loader.load(&range(Some(1), 7), CONTRACT).await?;

        let blocks: Vec<_> = txs.iter().map(|tx| tx.block_number).collect();
        assert_eq!(blocks, vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(ledger.transaction_calls(), vec![2..=4, 5..=7]);
        Ok(())
    }

    #[tokio::test]
    async fn ignores_other_contracts() -> anyhow::Result<()> {
        let ledger = MockLedger::new();
        ledger.mine(Address::repeat_byte(0xee), vec![OutMessage::log(B256::ZERO, vec![1u8])]);
        let loader = TransactionLoader::new(ledger, 10);

        let txs = loader.load(&range(None, 1), CONTRACT).await?;

        assert!(txs.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn failure_is_reported_for_the_failing_window() {
        let ledger = MockLedger::new();
        ledger.mine_empty(10);
        ledger.fail_transactions(LedgerError::Unavailable("down".into()));
        let loader = TransactionLoader::new(ledger, 5);

        let err = loader.load(&range(Some(2), 10), CONTRACT).await.unwrap_err();

        assert!(matches!(err, ConfirmError::LoadTransactions { from_block: 3, to_block: 7, .. }));
    }
}
