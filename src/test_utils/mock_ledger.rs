use std::{
    ops::RangeInclusive,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use alloy::primitives::{Address, BlockNumber, TxHash, keccak256};

use crate::{
    decoder::LedgerEvent,
    error::LedgerError,
    ledger::{BlockHandle, LedgerClient, OutMessage, Transaction},
};

#[derive(Debug)]
struct MockBlock {
    handle: BlockHandle,
    txs: Vec<(Address, Transaction)>,
}

#[derive(Debug, Default)]
struct State {
    blocks: Vec<MockBlock>,
    head_error: Option<LedgerError>,
    lookup_error: Option<LedgerError>,
    transactions_error: Option<LedgerError>,
    transaction_calls: Vec<RangeInclusive<BlockNumber>>,
}

/// An in-memory [`LedgerClient`].
///
/// Starts with an empty genesis block. Clones share the same chain, so a test can keep mining
/// while a subscriber polls. Injected failures persist until [`MockLedger::heal`] is called.
#[derive(Debug, Clone)]
pub struct MockLedger {
    state: Arc<Mutex<State>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn block_handle(number: BlockNumber) -> BlockHandle {
    BlockHandle::new(number, keccak256(number.to_be_bytes()))
}

impl MockLedger {
    #[must_use]
    pub fn new() -> Self {
        let genesis = MockBlock { handle: block_handle(0), txs: vec![] };
        let state = State { blocks: vec![genesis], ..State::default() };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn head_number(&self) -> BlockNumber {
        self.state().blocks.last().map_or(0, |block| block.handle.number)
    }

    /// Appends a block holding `txs` and returns its number.
    fn push_block(&self, txs: Vec<(Address, Vec<OutMessage>)>) -> BlockNumber {
        let mut state = self.state();
        let number = state.blocks.len() as BlockNumber;
        let txs = txs
            .into_iter()
            .enumerate()
            .map(|(index, (to, messages))| {
                let hash: TxHash =
                    keccak256([number.to_be_bytes(), (index as u64).to_be_bytes()].concat());
                (to, Transaction { hash, block_number: number, messages })
            })
            .collect();
        state.blocks.push(MockBlock { handle: block_handle(number), txs });
        number
    }

    /// Mines `count` empty blocks and returns the new head.
    pub fn mine_empty(&self, count: u64) -> BlockNumber {
        for _ in 0..count {
            self.push_block(vec![]);
        }
        self.head_number()
    }

    /// Mines a block with one transaction to `contract` carrying `messages`.
    pub fn mine(&self, contract: Address, messages: Vec<OutMessage>) -> BlockNumber {
        self.push_block(vec![(contract, messages)])
    }

    /// Mines a block with one transaction to `contract` that logs each of `events`.
    pub fn emit<T: LedgerEvent>(&self, contract: Address, events: &[T]) -> BlockNumber {
        let messages =
            events.iter().map(|event| OutMessage::log(T::topic(), event.encode())).collect();
        self.mine(contract, messages)
    }

    /// Mines a block with one transaction per event, all to `contract`.
    pub fn emit_each<T: LedgerEvent>(&self, contract: Address, events: &[T]) -> BlockNumber {
        let txs = events
            .iter()
            .map(|event| (contract, vec![OutMessage::log(T::topic(), event.encode())]))
            .collect();
        self.push_block(txs)
    }

    pub fn fail_head(&self, error: LedgerError) {
        self.state().head_error = Some(error);
    }

    pub fn fail_lookup(&self, error: LedgerError) {
        self.state().lookup_error = Some(error);
    }

    pub fn fail_transactions(&self, error: LedgerError) {
        self.state().transactions_error = Some(error);
    }

    /// Clears every injected failure.
    pub fn heal(&self) {
        let mut state = self.state();
        state.head_error = None;
        state.lookup_error = None;
        state.transactions_error = None;
    }

    /// Block spans passed to [`LedgerClient::transactions`] so far, in call order.
    #[must_use]
    pub fn transaction_calls(&self) -> Vec<RangeInclusive<BlockNumber>> {
        self.state().transaction_calls.clone()
    }

    fn current_head(&self) -> Result<BlockHandle, LedgerError> {
        let state = self.state();
        if let Some(error) = &state.head_error {
            return Err(error.clone());
        }
        state.blocks.last().map(|block| block.handle).ok_or(LedgerError::BlockNotFound(0))
    }

    fn lookup(&self, number: BlockNumber) -> Result<BlockHandle, LedgerError> {
        let state = self.state();
        if let Some(error) = &state.lookup_error {
            return Err(error.clone());
        }
        usize::try_from(number)
            .ok()
            .and_then(|index| state.blocks.get(index))
            .map(|block| block.handle)
            .ok_or(LedgerError::BlockNotFound(number))
    }

    fn load(
        &self,
        contract: Address,
        blocks: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let mut state = self.state();
        state.transaction_calls.push(blocks.clone());
        if let Some(error) = &state.transactions_error {
            return Err(error.clone());
        }
        Ok(state
            .blocks
            .iter()
            .filter(|block| blocks.contains(&block.handle.number))
            .flat_map(|block| &block.txs)
            .filter(|(to, _)| *to == contract)
            .map(|(_, tx)| tx.clone())
            .collect())
    }
}

impl LedgerClient for MockLedger {
    async fn head(&self) -> Result<BlockHandle, LedgerError> {
        self.current_head()
    }

    async fn block(&self, number: BlockNumber) -> Result<BlockHandle, LedgerError> {
        self.lookup(number)
    }

    async fn transactions(
        &self,
        contract: Address,
        blocks: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.load(contract, blocks)
    }
}
