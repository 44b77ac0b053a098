//! Ownership of the collateral NFT collection.

use super::{already_recorded, ensure_user, Outcome};
use crate::entities::{NftOwnership, NftTransfer};
use crate::error::Result;
use crate::id;
use crate::store::{StateStore, StoreTxn};
use crate::types::BlockProvenance;
use alloy_primitives::{Address, U256};

/// Latest-value projection: the pointer row is overwritten on every transfer.
pub(super) fn nft_transferred<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    from: &Address,
    to: &Address,
    token_id: U256,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let transfer_id = id::nft_transfer_id(token_id, &provenance.log_id());
    if already_recorded::<NftTransfer, _>(txn, &transfer_id)? {
        return Ok(Outcome::Duplicate);
    }

    let owner_id = ensure_user(txn, to)?;
    let nft_ownership_id = id::nft_ownership_id(token_id);
    txn.upsert(&NftOwnership {
        id: nft_ownership_id,
        nft_token_id: token_id,
        owner_id,
    })?;

    txn.create(&NftTransfer {
        id: transfer_id,
        nft_ownership_id,
        from: *from,
        to_id: owner_id,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}
