//! Test fixtures: an in-memory ledger and stream assertions.

pub mod macros;
mod mock_ledger;

use alloy::primitives::{Address, address};

pub use mock_ledger::MockLedger;

/// Address the fixtures deploy the watched contract at.
pub const CONTRACT: Address = address!("0x00000000000000000000000000000000000c0ffe");
