//! Owner recovery of assets sent to the staking contract.

use super::{already_recorded, ensure_user, Outcome};
use crate::entities::{Erc20TokenRecovered, Erc721TokenRecovered, EthRecovered, Nft, NftContract};
use crate::error::Result;
use crate::id;
use crate::store::{StateStore, StoreTxn};
use crate::types::BlockProvenance;
use alloy_primitives::{Address, U256};

pub(super) fn eth_recovered<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    recipient: &Address,
    amount: U256,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let recovered_id = id::eth_recovered_id(amount, &provenance.log_id());
    if already_recorded::<EthRecovered, _>(txn, &recovered_id)? {
        return Ok(Outcome::Duplicate);
    }

    let recipient_id = ensure_user(txn, recipient)?;
    txn.create(&EthRecovered {
        id: recovered_id,
        recipient_id,
        amount,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn erc20_recovered<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    token: &Address,
    recipient: &Address,
    amount: U256,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let recovered_id = id::erc20_tokens_recovered_id(token, amount, &provenance.log_id());
    if already_recorded::<Erc20TokenRecovered, _>(txn, &recovered_id)? {
        return Ok(Outcome::Duplicate);
    }

    let recipient_id = ensure_user(txn, recipient)?;
    txn.create(&Erc20TokenRecovered {
        id: recovered_id,
        token_contract_address: *token,
        recipient_id,
        amount,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn erc721_recovered<S: StateStore>(
    txn: &mut StoreTxn<'_, S>,
    token: &Address,
    recipient: &Address,
    token_id: U256,
    provenance: &BlockProvenance,
) -> Result<Outcome> {
    let recovered_id = id::erc721_tokens_recovered_id(token, token_id, &provenance.log_id());
    if already_recorded::<Erc721TokenRecovered, _>(txn, &recovered_id)? {
        return Ok(Outcome::Duplicate);
    }

    let recipient_id = ensure_user(txn, recipient)?;

    // A contract first seen here was never whitelisted.
    let nft_contract_id = id::nft_contract_id(token);
    txn.insert_if_absent(&NftContract {
        id: nft_contract_id,
        contract: *token,
        is_whitelisted: false,
    })?;

    let nft_id = id::nft_id(token, token_id);
    txn.insert_if_absent(&Nft {
        id: nft_id,
        nft_contract_id,
        token_id,
    })?;

    txn.create(&Erc721TokenRecovered {
        id: recovered_id,
        nft_contract_id,
        recipient_id,
        nft_id,
        block_number: provenance.block_number,
        block_timestamp: provenance.block_timestamp,
        transaction_hash: provenance.transaction_hash,
    })?;
    Ok(Outcome::Applied)
}
