//! Event-to-entity projection.
//!
//! Each event kind maps to a fixed sequence of store verbs: derive ids,
//! insert-if-absent the dimension rows, mutate the primary row, append the
//! history row. All of one event's writes go through a single [`StoreTxn`],
//! so the caller either commits them together or drops them together.
//!
//! Every event kind writes a history row keyed by its log coordinate.
//! Redelivery of a log whose history row already exists is reported as
//! [`Outcome::Duplicate`] before any write is staged.

mod admin;
mod collateral;
mod recovery;
mod staking;

use crate::entities::{Entity, User};
use crate::error::Result;
use crate::events::{ContractEvent, IndexedEvent};
use crate::id;
use crate::store::{StateStore, StoreTxn};
use crate::types::EntityId;
use alloy_primitives::Address;

/// Result of projecting one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The event's writes were staged.
    Applied,
    /// The event was already projected; nothing was staged.
    Duplicate,
}

/// Projects events of one staking contract (and its collateral NFT contract).
#[derive(Clone, Debug)]
pub struct Projector {
    staking_contract: Address,
    global_state_id: EntityId,
}

impl Projector {
    pub fn new(staking_contract: Address) -> Self {
        Self {
            staking_contract,
            global_state_id: id::global_state_id(&staking_contract),
        }
    }

    pub fn staking_contract(&self) -> Address {
        self.staking_contract
    }

    /// Id of the GlobalState row this projector maintains.
    pub fn global_state_id(&self) -> EntityId {
        self.global_state_id
    }

    /// Stage the writes for `event` into `txn`.
    pub fn project<S: StateStore>(
        &self,
        txn: &mut StoreTxn<'_, S>,
        event: &IndexedEvent,
    ) -> Result<Outcome> {
        let provenance = &event.provenance;
        match &event.event {
            ContractEvent::StakingDurationAdded { duration } => {
                admin::duration_added(txn, *duration, provenance)
            }
            ContractEvent::StakingDurationRemoved { duration } => {
                admin::duration_removed(txn, *duration, provenance)
            }
            ContractEvent::NftContractWhitelisted { nft_contract } => {
                admin::contract_whitelisted(txn, nft_contract, provenance)
            }
            ContractEvent::NftContractRemoved { nft_contract } => {
                admin::contract_removed(txn, nft_contract, provenance)
            }
            ContractEvent::NftStaked {
                nft_contract,
                token_id,
                staker,
                duration,
                stake_id,
            } => staking::nft_staked(
                txn,
                staking::StakeArgs {
                    nft_contract,
                    token_id: *token_id,
                    staker,
                    duration: *duration,
                    stake_id: *stake_id,
                },
                provenance,
            ),
            ContractEvent::NftUnstaked { stake_id } => {
                staking::nft_unstaked(txn, *stake_id, provenance)
            }
            ContractEvent::OwnershipTransferred {
                previous_owner,
                new_owner,
            } => admin::ownership_transferred(
                txn,
                &self.global_state_id,
                previous_owner,
                new_owner,
                provenance,
            ),
            ContractEvent::Paused => admin::pause_toggled(txn, &self.global_state_id, true, provenance),
            ContractEvent::Unpaused => {
                admin::pause_toggled(txn, &self.global_state_id, false, provenance)
            }
            ContractEvent::EthRecovered { recipient, amount } => {
                recovery::eth_recovered(txn, recipient, *amount, provenance)
            }
            ContractEvent::Erc20TokensRecovered {
                token,
                recipient,
                amount,
            } => recovery::erc20_recovered(txn, token, recipient, *amount, provenance),
            ContractEvent::Erc721TokensRecovered {
                token,
                recipient,
                token_id,
            } => recovery::erc721_recovered(txn, token, recipient, *token_id, provenance),
            ContractEvent::NftTransfer { from, to, token_id } => {
                collateral::nft_transferred(txn, from, to, *token_id, provenance)
            }
        }
    }
}

/// Whether the history row `id` of type `E` was already written.
fn already_recorded<E: Entity, S: StateStore>(txn: &StoreTxn<'_, S>, id: &EntityId) -> Result<bool> {
    let recorded = txn.exists(E::TABLE, id)?;
    if recorded {
        tracing::debug!(table = %E::TABLE, %id, "history row exists, skipping redelivered log");
    }
    Ok(recorded)
}

/// Insert-if-absent the User row for `address`, returning its id.
fn ensure_user<S: StateStore>(txn: &mut StoreTxn<'_, S>, address: &Address) -> Result<EntityId> {
    let user_id = id::user_id(address);
    txn.insert_if_absent(&User {
        id: user_id,
        address: *address,
    })?;
    Ok(user_id)
}
