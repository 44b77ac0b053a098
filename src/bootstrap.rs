//! One-time hydration of the GlobalState row from live contract reads.

use crate::entities::{GlobalState, User};
use crate::error::{IndexerError, Result};
use crate::id;
use crate::store::{StateStore, StoreTxn};
use alloy_primitives::{Address, U256};
use std::fmt;

/// Read-only getters of the staking contract used at bootstrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Getter {
    MinStakeDuration,
    MaxStakeDuration,
    Owner,
}

impl Getter {
    /// Solidity function name.
    pub fn function_name(&self) -> &'static str {
        match self {
            Getter::MinStakeDuration => "MIN_STAKE_DURATION",
            Getter::MaxStakeDuration => "MAX_STAKE_DURATION",
            Getter::Owner => "owner",
        }
    }
}

impl fmt::Display for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function_name())
    }
}

/// Decoded return value of a getter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallValue {
    Uint(U256),
    Address(Address),
}

/// Outcome of one sub-call of a multicall.
pub type CallResult = std::result::Result<CallValue, String>;

/// Batched read capability against a contract, supplied by the RPC client.
pub trait MulticallReader {
    /// Call every getter on `contract` in one batch. The returned vector
    /// holds one result per getter, in order; an `Err` for the whole batch
    /// means no sub-call result is available.
    fn multicall(&self, contract: Address, getters: &[Getter]) -> std::result::Result<Vec<CallResult>, String>;
}

/// The three bootstrap parameters, read as one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContractParameters {
    pub min_stake_duration: u64,
    pub max_stake_duration: u64,
    pub owner: Address,
}

const BOOTSTRAP_GETTERS: [Getter; 3] = [Getter::MinStakeDuration, Getter::MaxStakeDuration, Getter::Owner];

/// Read the bootstrap parameters; any failed or mistyped sub-read fails the
/// whole read.
pub fn read_parameters<R: MulticallReader + ?Sized>(
    reader: &R,
    staking_contract: Address,
) -> Result<ContractParameters> {
    let results = reader
        .multicall(staking_contract, &BOOTSTRAP_GETTERS)
        .map_err(IndexerError::BootstrapRead)?;

    if results.len() != BOOTSTRAP_GETTERS.len() {
        return Err(IndexerError::BootstrapRead(format!(
            "expected {} results, got {}",
            BOOTSTRAP_GETTERS.len(),
            results.len()
        )));
    }

    let mut values = Vec::with_capacity(results.len());
    for (getter, result) in BOOTSTRAP_GETTERS.iter().zip(results) {
        let value = result
            .map_err(|e| IndexerError::BootstrapRead(format!("{} failed: {}", getter, e)))?;
        values.push(value);
    }

    Ok(ContractParameters {
        min_stake_duration: seconds(Getter::MinStakeDuration, values[0])?,
        max_stake_duration: seconds(Getter::MaxStakeDuration, values[1])?,
        owner: match values[2] {
            CallValue::Address(owner) => owner,
            other => return Err(mistyped(Getter::Owner, other)),
        },
    })
}

fn seconds(getter: Getter, value: CallValue) -> Result<u64> {
    match value {
        CallValue::Uint(v) => u64::try_from(v).map_err(|_| {
            IndexerError::BootstrapRead(format!("{} returned {} which exceeds u64", getter, v))
        }),
        other => Err(mistyped(getter, other)),
    }
}

fn mistyped(getter: Getter, value: CallValue) -> IndexerError {
    IndexerError::BootstrapRead(format!("{} returned unexpected value {:?}", getter, value))
}

/// Seed the owner User and the GlobalState row for `staking_contract`.
///
/// Nothing is committed unless all three reads succeed. Fails with
/// `AlreadyExists` if the GlobalState row was already created.
pub fn bootstrap<S: StateStore, R: MulticallReader + ?Sized>(
    store: &mut S,
    reader: &R,
    staking_contract: Address,
) -> Result<GlobalState> {
    let params = read_parameters(reader, staking_contract)?;

    let owner_id = id::user_id(&params.owner);
    let global_state = GlobalState {
        id: id::global_state_id(&staking_contract),
        is_paused: false,
        min_stake_duration: params.min_stake_duration,
        max_stake_duration: params.max_stake_duration,
        owner_id,
    };

    let changes = {
        let mut txn = StoreTxn::new(&*store);
        txn.insert_if_absent(&User {
            id: owner_id,
            address: params.owner,
        })?;
        txn.create(&global_state)?;
        txn.into_changeset()
    };
    store.commit(changes)?;

    tracing::info!(
        contract = %staking_contract,
        min = params.min_stake_duration,
        max = params.max_stake_duration,
        owner = %params.owner,
        "bootstrapped global state"
    );
    Ok(global_state)
}
