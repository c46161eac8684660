//! Resolving the next span of blocks to scan.

use alloy::primitives::BlockNumber;

use crate::{
    error::ConfirmError,
    ledger::{BlockRange, LedgerClient},
};

/// Blocks scanned behind the head when a subscriber has no start block.
pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 50;

/// Computes the next range after `last_processed`.
///
/// `last_processed == 0` means nothing has been scanned yet and the range starts at genesis.
/// Returns `(None, head)` when the head has not moved past `last_processed`; the returned height
/// is the new checkpoint either way.
///
/// # Errors
///
/// [`ConfirmError::HeadHeight`] or [`ConfirmError::LookupBlock`] when the ledger cannot answer.
pub async fn resolve_next_range<C: LedgerClient>(
    client: &C,
    last_processed: BlockNumber,
) -> Result<(Option<BlockRange>, BlockNumber), ConfirmError> {
    let head = client.head().await.map_err(ConfirmError::HeadHeight)?;
    if head.number <= last_processed {
        trace!(head = head.number, last_processed = last_processed, "No new blocks");
        return Ok((None, head.number));
    }

    let previous = if last_processed > 0 {
        let handle = client
            .block(last_processed)
            .await
            .map_err(|source| ConfirmError::LookupBlock { number: last_processed, source })?;
        Some(handle)
    } else {
        None
    };

    Ok((Some(BlockRange { previous, to: head }), head.number))
}

/// `head - lookback`, or 0 when the head is within the lookback or cannot be fetched.
pub async fn start_block_with_lookback<C: LedgerClient>(client: &C, lookback: u64) -> BlockNumber {
    match client.head().await {
        Ok(head) => head.number.saturating_sub(lookback),
        Err(e) => {
            warn!(error = %e, "Failed to get head height for lookback, starting from block 0");
            0
        }
    }
}
