//! Reconciling observed events against an expectation.
//!
//! Both trackers are idempotent: replaying an event, or receiving events out of order, never
//! changes the verdict. Neither deduplicates, since a repeated on-chain event is still a fact.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    error::ConfirmError,
    events::{
        ChainSelector, CommitReportAccepted, ExecState, ExecutionStateChanged, SeqNum, SeqNumRange,
    },
    wait::Progress,
};

/// How an expected range came to be covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// One report spans the whole range.
    SingleReport,
    /// The union of several reports spans it without gaps.
    AcrossReports,
}

/// Tracks which sequence numbers commit reports have attested.
#[derive(Debug, Clone)]
pub struct CommitCoverageTracker {
    source_chain: ChainSelector,
    expected: SeqNumRange,
    observed: HashMap<ChainSelector, Vec<SeqNumRange>>,
}

impl CommitCoverageTracker {
    #[must_use]
    pub fn new(source_chain: ChainSelector, expected: SeqNumRange) -> Self {
        Self { source_chain, expected, observed: HashMap::new() }
    }

    #[must_use]
    pub fn expected(&self) -> SeqNumRange {
        self.expected
    }

    /// Records the range `report` attests. Metadata-only reports are ignored.
    ///
    /// Returns the recorded range, if any.
    pub fn observe(&mut self, report: &CommitReportAccepted) -> Option<SeqNumRange> {
        let range = report.seq_num_range()?;
        self.observed.entry(report.source_chain_selector).or_default().push(range);
        Some(range)
    }

    #[must_use]
    pub fn is_fully_covered(&self) -> bool {
        self.coverage().is_some()
    }

    /// How the expected range is covered, or `None` while a gap remains.
    #[must_use]
    pub fn coverage(&self) -> Option<Coverage> {
        let ranges = self.observed.get(&self.source_chain)?;

        if ranges.iter().any(|range| range.covers(&self.expected)) {
            return Some(Coverage::SingleReport);
        }
        union_covers(ranges, self.expected).then_some(Coverage::AcrossReports)
    }
}

/// Walks `ranges` in start order, extending contiguous coverage from `expected.start()`.
fn union_covers(ranges: &[SeqNumRange], expected: SeqNumRange) -> bool {
    let mut sorted = ranges.to_vec();
    sorted.sort_unstable();

    let mut next_needed = expected.start();
    for range in sorted {
        if range.end() < next_needed {
            continue;
        }
        if range.start() > next_needed {
            return false;
        }
        if range.end() >= expected.end() {
            return true;
        }
        next_needed = range.end() + 1;
    }
    false
}

/// Tracks execution outcomes for a set of expected sequence numbers.
#[derive(Debug, Clone)]
pub struct ExecutionPendingTracker {
    source_chain: ChainSelector,
    pending: BTreeSet<SeqNum>,
    resolved: BTreeMap<SeqNum, ExecState>,
}

impl ExecutionPendingTracker {
    #[must_use]
    pub fn new(source_chain: ChainSelector, expected: impl IntoIterator<Item = SeqNum>) -> Self {
        Self { source_chain, pending: expected.into_iter().collect(), resolved: BTreeMap::new() }
    }

    /// Applies one execution event.
    ///
    /// Events from other chains, for unexpected or already resolved sequence numbers, and
    /// not-yet-final states leave the tracker untouched and return [`Progress::Pending`].
    /// [`Progress::Done`] is returned by the success that empties the pending set.
    pub fn observe(&mut self, event: &ExecutionStateChanged) -> Progress {
        if event.source_chain_selector != self.source_chain
            || !self.pending.contains(&event.sequence_number)
        {
            return Progress::Pending;
        }

        match event.state {
            ExecState::Untouched | ExecState::InProgress => Progress::Pending,
            ExecState::Failure => Progress::Failed(ConfirmError::ExecutionFailed {
                source_chain: event.source_chain_selector,
                sequence_number: event.sequence_number,
                message_id: event.message_id,
            }),
            ExecState::Success => {
                self.pending.remove(&event.sequence_number);
                self.resolved.insert(event.sequence_number, event.state);
                if self.pending.is_empty() { Progress::Done } else { Progress::Pending }
            }
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of sequence numbers still pending.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Sequence numbers still waiting for a success, ascending.
    #[must_use]
    pub fn missing(&self) -> Vec<SeqNum> {
        self.pending.iter().copied().collect()
    }

    #[must_use]
    pub fn resolved(&self) -> &BTreeMap<SeqNum, ExecState> {
        &self.resolved
    }

    #[must_use]
    pub fn into_resolved(self) -> BTreeMap<SeqNum, ExecState> {
        self.resolved
    }
}
