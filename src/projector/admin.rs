//! Owner-driven configuration events: durations, whitelist, pause, ownership.

use super::{already_recorded, ensure_user, Outcome};
use crate::entities::{
    ContractPauseToggle, GlobalState, NftContract, NftContractAddition, NftContractRemoval,
    OwnershipTransfer, StakeDuration, StakingDurationAddition, StakingDurationRemoval,
};
use crate::error::Result;
use crate::id;
use crate::store::{FieldPatch, StateStore, StoreTxn};
use crate::types::{BlockProvenance, EntityId};
use alloy_primitives::Address;

pub(super) fn duration_added<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    duration: u64,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let addition_id = id::duration_addition_id(duration, &provenance.log_id());
    if already_recorded::<StakingDurationAddition, _>(txn, &addition_id)? {
        return Ok(Outcome::Duplicate);
    }

    // Re-adding a removed duration reactivates the existing row.
    let duration_id = id::duration_id(duration);
    let created = txn.insert_if_absent(&StakeDuration {
        id: duration_id,
        duration,
        is_active: true,
    })?;
    if !created {
        txn.update_fields::<StakeDuration>(&duration_id, &FieldPatch::new().set("isActive", true)?)?;
    }

    txn.create(&StakingDurationAddition {
        id: addition_id,
        duration_id,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn duration_removed<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    duration: u64,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let removal_id = id::duration_removal_id(duration, &provenance.log_id());
    if already_recorded::<StakingDurationRemoval, _>(txn, &removal_id)? {
        return Ok(Outcome::Duplicate);
    }

    let duration_id = id::duration_id(duration);
    txn.update_fields::<StakeDuration>(&duration_id, &FieldPatch::new().set("isActive", false)?)?;

    txn.create(&StakingDurationRemoval {
        id: removal_id,
        duration_id,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn contract_whitelisted<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    nft_contract: &Address,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let addition_id = id::nft_contract_addition_id(nft_contract, &provenance.log_id());
    if already_recorded::<NftContractAddition, _>(txn, &addition_id)? {
        return Ok(Outcome::Duplicate);
    }

    // A row first seen through an ERC-721 recovery, or removed earlier, only
    // has its flag set.
    let nft_contract_id = id::nft_contract_id(nft_contract);
    let created = txn.insert_if_absent(&NftContract {
        id: nft_contract_id,
        contract: *nft_contract,
        is_whitelisted: true,
    })?;
    if !created {
        txn.update_fields::<NftContract>(
            &nft_contract_id,
            &FieldPatch::new().set("isWhitelisted", true)?,
        )?;
    }

    txn.create(&NftContractAddition {
        id: addition_id,
        nft_contract_id,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn contract_removed<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    nft_contract: &Address,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let removal_id = id::nft_contract_removal_id(nft_contract, &provenance.log_id());
    if already_recorded::<NftContractRemoval, _>(txn, &removal_id)? {
        return Ok(Outcome::Duplicate);
    }

    let nft_contract_id = id::nft_contract_id(nft_contract);
    txn.update_fields::<NftContract>(
        &nft_contract_id,
        &FieldPatch::new().set("isWhitelisted", false)?,
    )?;

    txn.create(&NftContractRemoval {
        id: removal_id,
        nft_contract_id,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn pause_toggled<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    global_state_id: &EntityId,
    is_paused: bool,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let toggle_id = id::contract_pause_toggle_id(&provenance.log_id());
    if already_recorded::<ContractPauseToggle, _>(txn, &toggle_id)? {
        return Ok(Outcome::Duplicate);
    }

    txn.update_fields::<GlobalState>(global_state_id, &FieldPatch::new().set("isPaused", is_paused)?)?;

    txn.create(&ContractPauseToggle {
        id: toggle_id,
        is_paused,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn ownership_transferred<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    global_state_id: &EntityId,
    previous_owner: &Address,
    new_owner: &Address,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let transfer_id = id::ownership_transfer_id(new_owner, &provenance.log_id());
    if already_recorded::<OwnershipTransfer, _>(txn, &transfer_id)? {
        return Ok(Outcome::Duplicate);
    }

    let owner_id = ensure_user(txn, new_owner)?;
    txn.update_fields::<GlobalState>(global_state_id, &FieldPatch::new().set("ownerId", owner_id)?)?;

    txn.create(&OwnershipTransfer {
        id: transfer_id,
        previous_owner: *previous_owner,
        new_owner_id: owner_id,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}
