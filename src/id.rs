//! Deterministic identifier derivation.
//!
//! Every row is keyed by the Keccak-256 digest of a canonical string built
//! from a tag and the row's natural key. Addresses render as `0x` + lowercase
//! hex, integers as plain decimal, log coordinates in their canonical form;
//! parts are joined with `_`. None of the rendered parts can contain `_`.
//! Where one tag extends another (`nft`, `nft_contract`, `nft_transfer`), the
//! shorter tag's first part starts with `0x` and the extension does not, so
//! distinct keys give distinct strings.
//!
//! Mutable-entity keys match the `keccak256(utf8(key))` ids of the deployed
//! indexer. History keys embed [`LogId::canonical`], so history ids are only
//! stable within this crate.

use crate::types::{address_hex, EntityId, LogId};
use alloy_primitives::{keccak256, Address, U256};

/// Namespace of a derived identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdTag {
    GlobalState,
    User,
    Nft,
    NftContract,
    Duration,
    Stake,
    NftOwnership,
    ContractPauseToggle,
    NftContractAddition,
    NftContractRemoval,
    DurationAddition,
    DurationRemoval,
    NftStaked,
    NftUnstaked,
    EthRecovered,
    Erc20TokensRecovered,
    Erc721TokensRecovered,
    OwnershipTransfer,
    NftTransfer,
}

impl IdTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdTag::GlobalState => "global_state",
            IdTag::User => "user",
            IdTag::Nft => "nft",
            IdTag::NftContract => "nft_contract",
            IdTag::Duration => "duration",
            IdTag::Stake => "stake",
            IdTag::NftOwnership => "nft_ownership",
            IdTag::ContractPauseToggle => "contract_pause_toggle",
            IdTag::NftContractAddition => "nft_contract_addition",
            IdTag::NftContractRemoval => "nft_contract_removal",
            IdTag::DurationAddition => "duration_addition",
            IdTag::DurationRemoval => "duration_removal",
            IdTag::NftStaked => "nft_staked",
            IdTag::NftUnstaked => "nft_unstaked",
            IdTag::EthRecovered => "eth_recovered",
            IdTag::Erc20TokensRecovered => "erc20_tokens_recovered",
            IdTag::Erc721TokensRecovered => "erc721_tokens_recovered",
            IdTag::OwnershipTransfer => "ownership_transfer",
            IdTag::NftTransfer => "nft_transfer",
        }
    }
}

/// One field of a natural key.
#[derive(Clone, Copy, Debug)]
pub enum KeyPart<'a> {
    Address(&'a Address),
    Uint(U256),
    Log(&'a LogId),
}

impl KeyPart<'_> {
    fn render(&self) -> String {
        match self {
            KeyPart::Address(address) => address_hex(address),
            KeyPart::Uint(value) => value.to_string(),
            KeyPart::Log(log) => log.canonical(),
        }
    }
}

impl From<u64> for KeyPart<'_> {
    fn from(value: u64) -> Self {
        KeyPart::Uint(U256::from(value))
    }
}

/// Build the canonical key string that gets hashed.
pub fn canonical_key(tag: IdTag, parts: &[KeyPart<'_>]) -> String {
    let mut key = String::from(tag.as_str());
    for part in parts {
        key.push('_');
        key.push_str(&part.render());
    }
    key
}

/// Derive the identifier for `tag` and natural key `parts`.
pub fn derive_id(tag: IdTag, parts: &[KeyPart<'_>]) -> EntityId {
    EntityId(keccak256(canonical_key(tag, parts).as_bytes()))
}

// --- Mutable entities ---

pub fn global_state_id(staking_contract: &Address) -> EntityId {
    derive_id(IdTag::GlobalState, &[KeyPart::Address(staking_contract)])
}

pub fn user_id(address: &Address) -> EntityId {
    derive_id(IdTag::User, &[KeyPart::Address(address)])
}

pub fn nft_contract_id(contract: &Address) -> EntityId {
    derive_id(IdTag::NftContract, &[KeyPart::Address(contract)])
}

pub fn nft_id(contract: &Address, token_id: U256) -> EntityId {
    derive_id(
        IdTag::Nft,
        &[KeyPart::Address(contract), KeyPart::Uint(token_id)],
    )
}

pub fn duration_id(duration: u64) -> EntityId {
    derive_id(IdTag::Duration, &[duration.into()])
}

pub fn stake_id(contract_stake_id: U256) -> EntityId {
    derive_id(IdTag::Stake, &[KeyPart::Uint(contract_stake_id)])
}

pub fn nft_ownership_id(token_id: U256) -> EntityId {
    derive_id(IdTag::NftOwnership, &[KeyPart::Uint(token_id)])
}

// --- History rows (fold in the log coordinate) ---

pub fn contract_pause_toggle_id(log: &LogId) -> EntityId {
    derive_id(IdTag::ContractPauseToggle, &[KeyPart::Log(log)])
}

pub fn nft_contract_addition_id(contract: &Address, log: &LogId) -> EntityId {
    derive_id(
        IdTag::NftContractAddition,
        &[KeyPart::Address(contract), KeyPart::Log(log)],
    )
}

pub fn nft_contract_removal_id(contract: &Address, log: &LogId) -> EntityId {
    derive_id(
        IdTag::NftContractRemoval,
        &[KeyPart::Address(contract), KeyPart::Log(log)],
    )
}

pub fn duration_addition_id(duration: u64, log: &LogId) -> EntityId {
    derive_id(IdTag::DurationAddition, &[duration.into(), KeyPart::Log(log)])
}

pub fn duration_removal_id(duration: u64, log: &LogId) -> EntityId {
    derive_id(IdTag::DurationRemoval, &[duration.into(), KeyPart::Log(log)])
}

pub fn nft_staked_id(contract_stake_id: U256, log: &LogId) -> EntityId {
    derive_id(
        IdTag::NftStaked,
        &[KeyPart::Uint(contract_stake_id), KeyPart::Log(log)],
    )
}

pub fn nft_unstaked_id(contract_stake_id: U256, log: &LogId) -> EntityId {
    derive_id(
        IdTag::NftUnstaked,
        &[KeyPart::Uint(contract_stake_id), KeyPart::Log(log)],
    )
}

/// ETH recoveries are keyed like token recoveries, with the zero address as token.
pub fn eth_recovered_id(amount: U256, log: &LogId) -> EntityId {
    derive_id(
        IdTag::EthRecovered,
        &[
            KeyPart::Address(&Address::ZERO),
            KeyPart::Uint(amount),
            KeyPart::Log(log),
        ],
    )
}

pub fn erc20_tokens_recovered_id(token: &Address, amount: U256, log: &LogId) -> EntityId {
    derive_id(
        IdTag::Erc20TokensRecovered,
        &[
            KeyPart::Address(token),
            KeyPart::Uint(amount),
            KeyPart::Log(log),
        ],
    )
}

pub fn erc721_tokens_recovered_id(token: &Address, token_id: U256, log: &LogId) -> EntityId {
    derive_id(
        IdTag::Erc721TokensRecovered,
        &[
            KeyPart::Address(token),
            KeyPart::Uint(token_id),
            KeyPart::Log(log),
        ],
    )
}

pub fn ownership_transfer_id(new_owner: &Address, log: &LogId) -> EntityId {
    derive_id(
        IdTag::OwnershipTransfer,
        &[KeyPart::Address(new_owner), KeyPart::Log(log)],
    )
}

pub fn nft_transfer_id(token_id: U256, log: &LogId) -> EntityId {
    derive_id(
        IdTag::NftTransfer,
        &[KeyPart::Uint(token_id), KeyPart::Log(log)],
    )
}
