//! Shared fixtures for integration tests.

#![allow(dead_code)]

use alloy_primitives::{keccak256, Address, U256};
use stakewatch::bootstrap::bootstrap;
use stakewatch::{
    BlockProvenance, CallResult, CallValue, ContractEvent, EventRouter, FaultPolicy, Getter,
    IndexedEvent, MemoryStore, MulticallReader, StateStore,
};

pub const MIN_DURATION: u64 = 86_400;
pub const MAX_DURATION: u64 = 31_536_000;

pub fn staking() -> Address {
    Address::repeat_byte(0x5a)
}

pub fn collateral() -> Address {
    Address::repeat_byte(0xc0)
}

pub fn owner() -> Address {
    Address::repeat_byte(0x01)
}

pub fn address(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

/// Provenance for log `log_index` of `block`, one second per block.
pub fn provenance(block: u64, log_index: u64) -> BlockProvenance {
    BlockProvenance {
        block_number: block,
        block_timestamp: block,
        transaction_hash: keccak256(format!("tx-{}-{}", block, log_index)),
        log_index,
    }
}

pub fn at(block: u64, log_index: u64, event: ContractEvent) -> IndexedEvent {
    let contract = match event {
        ContractEvent::NftTransfer { .. } => collateral(),
        _ => staking(),
    };
    IndexedEvent::new(contract, event, provenance(block, log_index))
}

/// Same as [`at`] with an explicit block timestamp.
pub fn at_time(block: u64, log_index: u64, timestamp: u64, event: ContractEvent) -> IndexedEvent {
    let mut indexed = at(block, log_index, event);
    indexed.provenance.block_timestamp = timestamp;
    indexed
}

pub fn staked(contract: Address, token_id: u64, staker: Address, duration: u64, stake_id: u64) -> ContractEvent {
    ContractEvent::NftStaked {
        nft_contract: contract,
        token_id: U256::from(token_id),
        staker,
        duration,
        stake_id: U256::from(stake_id),
    }
}

pub fn unstaked(stake_id: u64) -> ContractEvent {
    ContractEvent::NftUnstaked {
        stake_id: U256::from(stake_id),
    }
}

/// Multicall reader returning fixed bootstrap values.
pub struct StaticReader {
    pub results: Vec<CallResult>,
}

impl StaticReader {
    pub fn healthy() -> Self {
        Self {
            results: vec![
                Ok(CallValue::Uint(U256::from(MIN_DURATION))),
                Ok(CallValue::Uint(U256::from(MAX_DURATION))),
                Ok(CallValue::Address(owner())),
            ],
        }
    }
}

impl MulticallReader for StaticReader {
    fn multicall(&self, _contract: Address, _getters: &[Getter]) -> Result<Vec<CallResult>, String> {
        Ok(self.results.clone())
    }
}

pub fn bootstrapped<S: StateStore>(mut store: S) -> S {
    bootstrap(&mut store, &StaticReader::healthy(), staking()).unwrap();
    store
}

/// Route tracing output through the test harness capture.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn test_router(policy: FaultPolicy) -> EventRouter<MemoryStore> {
    init_tracing();
    EventRouter::new(bootstrapped(MemoryStore::new()), staking(), collateral(), policy).unwrap()
}
