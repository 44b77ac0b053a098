//! Stake lifecycle: `NFTStaked` creates a Stake, `NFTUnstaked` ends it.

use super::{already_recorded, ensure_user, Outcome};
use crate::entities::{NftStaked, NftUnstaked, Stake};
use crate::error::{IndexerError, Result};
use crate::id;
use crate::store::{FieldPatch, StateStore, StoreTxn};
use crate::types::BlockProvenance;
use alloy_primitives::{Address, U256};

pub(super) struct StakeArgs<'a> {
    pub nft_contract: &'a Address,
    pub token_id: U256,
    pub staker: &'a Address,
    pub duration: u64,
    pub stake_id: U256,
}

pub(super) fn nft_staked<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    args: StakeArgs<'_>,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let staked_id = id::nft_staked_id(args.stake_id, &provenance.log_id());
    if already_recorded::<NftStaked, _>(txn, &staked_id)? {
        return Ok(Outcome::Duplicate);
    }

    let end_time = provenance
        .block_timestamp
        .checked_add(args.duration)
        .ok_or_else(|| {
            IndexerError::InvalidTransition(format!(
                "stake {} end time overflows ({} + {})",
                args.stake_id, provenance.block_timestamp, args.duration
            ))
        })?;

    let staker_id = ensure_user(txn, args.staker)?;
    let stake_id = id::stake_id(args.stake_id);

    // A reused contract stake id hits AlreadyExists here.
    txn.create(&Stake {
        id: stake_id,
        nft_contract_id: id::nft_contract_id(args.nft_contract),
        contract_stake_id: args.stake_id,
        nft_id: id::nft_id(args.nft_contract, args.token_id),
        staker_id,
        duration_id: id::duration_id(args.duration),
        start_time: provenance.block_timestamp,
        end_time,
        stake_duration: args.duration,
        is_staked: true,
        stake_tx_id: staked_id,
        unstake_tx_id: None,
    })?;

    txn.create(&NftStaked {
        id: staked_id,
        stake_id,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn nft_unstaked<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    contract_stake_id: U256,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let unstaked_id = id::nft_unstaked_id(contract_stake_id, &provenance.log_id());
    if already_recorded::<NftUnstaked, _>(txn, &unstaked_id)? {
        return Ok(Outcome::Duplicate);
    }

    let stake_id = id::stake_id(contract_stake_id);
    let stake: Stake = txn.require(&stake_id)?;
    if !stake.is_staked {
        return Err(IndexerError::InvalidTransition(format!(
            "stake {} is already unstaked",
            contract_stake_id
        )));
    }

    let patch = FieldPatch::new()
        .set("isStaked", false)?
        .set("unstakeTxId", unstaked_id)?;
    txn.update_fields::<Stake>(&stake_id, &patch)?;

    txn.create(&NftUnstaked {
        id: unstaked_id,
        stake_id,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}
