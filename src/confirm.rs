//! Caller-facing confirmation API.
//!
//! A [`Confirmer`] is bound to one destination ledger. Each call spawns its own subscriber, so
//! commit and execution can be confirmed concurrently against the same client.

use std::{collections::BTreeMap, time::Duration};

use alloy::primitives::{Address, BlockNumber};

use crate::{
    block_range::DEFAULT_LOOKBACK_BLOCKS,
    decoder::LedgerEvent,
    error::ConfirmError,
    events::{
        ChainSelector, CommitReportAccepted, ExecState, ExecutionStateChanged, SeqNum, SeqNumRange,
    },
    ledger::LedgerClient,
    loader::DEFAULT_TX_BATCH_SIZE,
    subscriber::{DEFAULT_POLL_INTERVAL, EventSubscriber},
    tracker::{CommitCoverageTracker, Coverage, ExecutionPendingTracker},
    wait::{DEFAULT_PROGRESS_INTERVAL, Progress, wait_until},
};

/// Largest range [`Confirmer::confirm_commit_and_execution`] will track.
pub const MAX_EXPECTED_SEQ_NUMS: u64 = 100_000;

/// Result of a successful commit confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitConfirmation {
    /// Reports seen, metadata-only ones included.
    pub reports_processed: usize,
    pub coverage: Coverage,
    pub elapsed: Duration,
}

/// Builder for a [`Confirmer`].
#[derive(Debug, Clone)]
pub struct ConfirmerBuilder {
    dest_chain: ChainSelector,
    poll_interval: Duration,
    lookback: u64,
    batch_size: u64,
    progress_interval: Duration,
}

impl Default for ConfirmerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dest_chain: 0,
            poll_interval: DEFAULT_POLL_INTERVAL,
            lookback: DEFAULT_LOOKBACK_BLOCKS,
            batch_size: DEFAULT_TX_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Selector of the ledger the client talks to. Only used to annotate errors and logs.
    #[must_use]
    pub fn dest_chain(mut self, selector: ChainSelector) -> Self {
        self.dest_chain = selector;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Blocks scanned behind the head when no start block is given.
    #[must_use]
    pub fn lookback(mut self, blocks: u64) -> Self {
        self.lookback = blocks;
        self
    }

    /// Blocks requested per transaction-load call.
    #[must_use]
    pub fn batch_size(mut self, blocks: u64) -> Self {
        self.batch_size = blocks;
        self
    }

    #[must_use]
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Binds the configuration to `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll interval, progress interval or batch size is zero.
    pub fn connect<C: LedgerClient>(self, client: C) -> Result<Confirmer<C>, ConfirmError> {
        if self.poll_interval.is_zero() {
            return Err(ConfirmError::InvalidPollInterval);
        }
        if self.progress_interval.is_zero() {
            return Err(ConfirmError::InvalidProgressInterval);
        }
        if self.batch_size == 0 {
            return Err(ConfirmError::InvalidBatchSize);
        }
        Ok(Confirmer { client, config: self })
    }
}

/// Confirms commit and execution of cross-chain messages on one destination ledger.
#[derive(Debug, Clone)]
pub struct Confirmer<C> {
    client: C,
    config: ConfirmerBuilder,
}

impl<C: LedgerClient> Confirmer<C> {
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    #[must_use]
    pub fn dest_chain(&self) -> ChainSelector {
        self.config.dest_chain
    }

    fn subscriber<T: LedgerEvent>(
        &self,
        contract: Address,
        start_block: Option<BlockNumber>,
    ) -> EventSubscriber<C, T> {
        EventSubscriber::new(self.client.clone(), contract)
            .start_block(start_block)
            .lookback(self.config.lookback)
            .poll_interval(self.config.poll_interval)
            .batch_size(self.config.batch_size)
            .progress_interval(self.config.progress_interval)
    }

    /// Waits until commit reports from `source_chain` cover `expected`, in one report or across
    /// several.
    ///
    /// Scanning starts `lookback` blocks behind the head.
    ///
    /// # Errors
    ///
    /// [`ConfirmError::CommitTimeout`] once `deadline` passes, or the ledger error that stopped
    /// the subscriber.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
    pub async fn confirm_commit(
        &self,
        source_chain: ChainSelector,
        contract: Address,
        expected: SeqNumRange,
        deadline: Duration,
    ) -> Result<CommitConfirmation, ConfirmError> {
        let dest_chain = self.config.dest_chain;
        info!(
            source_chain = source_chain,
            dest_chain = dest_chain,
            expected = %expected,
            "Waiting for commit report"
        );

        let mut tracker = CommitCoverageTracker::new(source_chain, expected);
        let mut reports_processed = 0usize;

        let subscriber = self.subscriber::<CommitReportAccepted>(contract, None);
        let result = wait_until(&subscriber, deadline, |report: CommitReportAccepted| {
            reports_processed += 1;

            if report.has_merkle_root() && report.source_chain_selector != source_chain {
                warn!(
                    expected_source = source_chain,
                    report_source = report.source_chain_selector,
                    "Ignoring commit report from another source chain"
                );
            }
            if let Some(range) = tracker.observe(&report) {
                info!(
                    source_chain = report.source_chain_selector,
                    seq_nums = %range,
                    "Received commit"
                );
            }

            match tracker.coverage() {
                Some(coverage) => {
                    info!(
                        expected = %expected,
                        coverage = ?coverage,
                        "All sequence numbers committed"
                    );
                    Progress::Done
                }
                None => Progress::Pending,
            }
        })
        .await;

        match result {
            Ok(summary) => {
                let coverage = match tracker.coverage() {
                    Some(Coverage::SingleReport) => Coverage::SingleReport,
                    _ => Coverage::AcrossReports,
                };
                Ok(CommitConfirmation { reports_processed, coverage, elapsed: summary.elapsed })
            }
            Err(ConfirmError::Timeout { elapsed }) => {
                error!(
                    dest_chain = dest_chain,
                    source_chain = source_chain,
                    expected = %expected,
                    reports_processed = reports_processed,
                    "Commit confirmation timed out"
                );
                Err(ConfirmError::CommitTimeout {
                    dest_chain,
                    source_chain,
                    expected,
                    reports_processed,
                    elapsed,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Waits until every sequence number in `expected` from `source_chain` has executed
    /// successfully, and returns their final states.
    ///
    /// Scanning starts after `start_block`, or `lookback` blocks behind the head when it is
    /// `None`.
    ///
    /// # Errors
    ///
    /// * [`ConfirmError::NoExpectedSeqNums`] if `expected` is empty.
    /// * [`ConfirmError::ExecutionFailed`] on the first failed execution of an expected number.
    /// * [`ConfirmError::ExecutionTimeout`] once `deadline` passes.
    /// * The ledger error that stopped the subscriber.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
    pub async fn confirm_execution(
        &self,
        source_chain: ChainSelector,
        contract: Address,
        start_block: Option<BlockNumber>,
        expected: &[SeqNum],
        deadline: Duration,
    ) -> Result<BTreeMap<SeqNum, ExecState>, ConfirmError> {
        if expected.is_empty() {
            return Err(ConfirmError::NoExpectedSeqNums);
        }

        let dest_chain = self.config.dest_chain;
        info!(
            source_chain = source_chain,
            dest_chain = dest_chain,
            expected = ?expected,
            "Waiting for execution"
        );

        let mut tracker = ExecutionPendingTracker::new(source_chain, expected.iter().copied());
        let mut events_processed = 0usize;

        let subscriber = self.subscriber::<ExecutionStateChanged>(contract, start_block);
        let result = wait_until(&subscriber, deadline, |event: ExecutionStateChanged| {
            events_processed += 1;

            let before = tracker.remaining();
            let progress = tracker.observe(&event);
            match &progress {
                Progress::Failed(_) => {
                    error!(
                        sequence_number = event.sequence_number,
                        message_id = %event.message_id,
                        "Execution failed"
                    );
                }
                _ if tracker.remaining() < before => {
                    info!(
                        sequence_number = event.sequence_number,
                        remaining = tracker.remaining(),
                        "Execution successful"
                    );
                }
                _ => {}
            }
            progress
        })
        .await;

        match result {
            Ok(_) => {
                info!(expected = ?expected, "All sequence numbers executed");
                Ok(tracker.into_resolved())
            }
            Err(ConfirmError::Timeout { elapsed }) => {
                let missing = tracker.missing();
                error!(
                    dest_chain = dest_chain,
                    source_chain = source_chain,
                    missing = ?missing,
                    successful = tracker.resolved().len(),
                    events_processed = events_processed,
                    "Execution confirmation timed out"
                );
                Err(ConfirmError::ExecutionTimeout {
                    dest_chain,
                    source_chain,
                    missing,
                    events_processed,
                    resolved: tracker.into_resolved(),
                    elapsed,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Runs [`confirm_commit`](Self::confirm_commit) and
    /// [`confirm_execution`](Self::confirm_execution) side by side.
    ///
    /// # Errors
    ///
    /// [`ConfirmError::ExpectationTooLarge`] if `expected` spans more than
    /// [`MAX_EXPECTED_SEQ_NUMS`], otherwise the first error either confirmation reports; the
    /// other one is then abandoned.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
    pub async fn confirm_commit_and_execution(
        &self,
        source_chain: ChainSelector,
        contract: Address,
        start_block: Option<BlockNumber>,
        expected: SeqNumRange,
        deadline: Duration,
    ) -> Result<(CommitConfirmation, BTreeMap<SeqNum, ExecState>), ConfirmError> {
        let count = expected.count();
        if count > MAX_EXPECTED_SEQ_NUMS {
            return Err(ConfirmError::ExpectationTooLarge {
                expected,
                count,
                max: MAX_EXPECTED_SEQ_NUMS,
            });
        }

        let seq_nums: Vec<SeqNum> = (expected.start()..=expected.end()).collect();
        tokio::try_join!(
            self.confirm_commit(source_chain, contract, expected, deadline),
            self.confirm_execution(source_chain, contract, start_block, &seq_nums, deadline),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockLedger;

    #[test]
    fn connect_rejects_zero_settings() {
        let ledger = MockLedger::new();

        assert!(matches!(
            ConfirmerBuilder::new().poll_interval(Duration::ZERO).connect(ledger.clone()),
            Err(ConfirmError::InvalidPollInterval)
        ));
        assert!(matches!(
            ConfirmerBuilder::new().batch_size(0).connect(ledger.clone()),
            Err(ConfirmError::InvalidBatchSize)
        ));
        assert!(matches!(
            ConfirmerBuilder::new().progress_interval(Duration::ZERO).connect(ledger),
            Err(ConfirmError::InvalidProgressInterval)
        ));
    }

    #[test]
    fn builder_defaults() {
        let builder = ConfirmerBuilder::default();

        assert_eq!(builder.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(builder.lookback, DEFAULT_LOOKBACK_BLOCKS);
        assert_eq!(builder.batch_size, DEFAULT_TX_BATCH_SIZE);
        assert_eq!(builder.progress_interval, DEFAULT_PROGRESS_INTERVAL);
    }

    #[tokio::test]
    async fn empty_expectation_is_rejected_up_front() -> anyhow::Result<()> {
        let ledger = MockLedger::new();
        let confirmer = ConfirmerBuilder::new().connect(ledger.clone())?;

        let result = confirmer
            .confirm_execution(1, Address::ZERO, None, &[], Duration::from_secs(1))
            .await;

        assert!(matches!(result, Err(ConfirmError::NoExpectedSeqNums)));
        assert!(ledger.transaction_calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn oversized_range_is_rejected_up_front() -> anyhow::Result<()> {
        let ledger = MockLedger::new();
        let confirmer = ConfirmerBuilder::new().connect(ledger.clone())?;

        let result = confirmer
            .confirm_commit_and_execution(
                1,
                Address::ZERO,
                None,
                SeqNumRange::new(0, u64::MAX),
                Duration::from_secs(5),
            )
            .await;

        assert!(matches!(
            result,
            Err(ConfirmError::ExpectationTooLarge {
                count: u64::MAX,
                max: MAX_EXPECTED_SEQ_NUMS,
                ..
            })
        ));
        assert!(ledger.transaction_calls().is_empty());
        Ok(())
    }
}
