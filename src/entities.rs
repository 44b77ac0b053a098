//! Row types of the projected schema.
//!
//! Mutable rows carry the current state of an entity; history rows record one
//! event occurrence each and are never updated. Rows serialize with camelCase
//! field names, which are also the names accepted by field patches.

use crate::types::{decimal, EntityId};
use alloy_primitives::{Address, B256, U256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every table of the schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Table {
    GlobalState,
    User,
    NftContract,
    Nft,
    StakeDuration,
    Stake,
    NftOwnership,
    NftContractAddition,
    NftContractRemoval,
    StakingDurationAddition,
    StakingDurationRemoval,
    NftStaked,
    NftUnstaked,
    ContractPauseToggle,
    EthRecovered,
    Erc20TokenRecovered,
    Erc721TokenRecovered,
    OwnershipTransfer,
    NftTransfer,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::GlobalState => "global_state",
            Table::User => "user",
            Table::NftContract => "nft_contract",
            Table::Nft => "nft",
            Table::StakeDuration => "stake_duration",
            Table::Stake => "stake",
            Table::NftOwnership => "nft_ownership",
            Table::NftContractAddition => "nft_contract_addition",
            Table::NftContractRemoval => "nft_contract_removal",
            Table::StakingDurationAddition => "staking_duration_addition",
            Table::StakingDurationRemoval => "staking_duration_removal",
            Table::NftStaked => "nft_staked",
            Table::NftUnstaked => "nft_unstaked",
            Table::ContractPauseToggle => "contract_pause_toggle",
            Table::EthRecovered => "eth_recovered",
            Table::Erc20TokenRecovered => "erc20_token_recovered",
            Table::Erc721TokenRecovered => "erc721_token_recovered",
            Table::OwnershipTransfer => "ownership_transfer",
            Table::NftTransfer => "nft_transfer",
        }
    }

    /// History tables hold one immutable row per event occurrence.
    pub fn is_history(&self) -> bool {
        !matches!(
            self,
            Table::GlobalState
                | Table::User
                | Table::NftContract
                | Table::Nft
                | Table::StakeDuration
                | Table::Stake
                | Table::NftOwnership
        )
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A row type bound to its table.
pub trait Entity: Serialize + DeserializeOwned {
    const TABLE: Table;

    fn id(&self) -> EntityId;
}

macro_rules! entity {
    ($ty:ty, $table:expr) => {
        impl Entity for $ty {
            const TABLE: Table = $table;

            fn id(&self) -> EntityId {
                self.id
            }
        }
    };
}

// --- Mutable entities ---

/// Singleton state of one staking contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalState {
    pub id: EntityId,
    pub is_paused: bool,
    pub min_stake_duration: u64,
    pub max_stake_duration: u64,
    pub owner_id: EntityId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub address: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftContract {
    pub id: EntityId,
    pub contract: Address,
    pub is_whitelisted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nft {
    pub id: EntityId,
    pub nft_contract_id: EntityId,
    #[serde(with = "decimal")]
    pub token_id: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeDuration {
    pub id: EntityId,
    /// Seconds.
    pub duration: u64,
    pub is_active: bool,
}

/// One stake lifecycle, keyed by the contract-native stake identifier.
///
/// `end_time == start_time + stake_duration` holds for every row; field
/// patches never touch those three fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stake {
    pub id: EntityId,
    pub nft_contract_id: EntityId,
    #[serde(with = "decimal")]
    pub contract_stake_id: U256,
    pub nft_id: EntityId,
    pub staker_id: EntityId,
    pub duration_id: EntityId,
    pub start_time: u64,
    pub end_time: u64,
    pub stake_duration: u64,
    pub is_staked: bool,
    pub stake_tx_id: EntityId,
    pub unstake_tx_id: Option<EntityId>,
}

/// Latest known owner of a collateral NFT.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftOwnership {
    pub id: EntityId,
    #[serde(with = "decimal")]
    pub nft_token_id: U256,
    pub owner_id: EntityId,
}

entity!(GlobalState, Table::GlobalState);
entity!(User, Table::User);
entity!(NftContract, Table::NftContract);
entity!(Nft, Table::Nft);
entity!(StakeDuration, Table::StakeDuration);
entity!(Stake, Table::Stake);
entity!(NftOwnership, Table::NftOwnership);

// --- History rows ---

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftContractAddition {
    pub id: EntityId,
    pub nft_contract_id: EntityId,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftContractRemoval {
    pub id: EntityId,
    pub nft_contract_id: EntityId,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingDurationAddition {
    pub id: EntityId,
    pub duration_id: EntityId,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingDurationRemoval {
    pub id: EntityId,
    pub duration_id: EntityId,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftStaked {
    pub id: EntityId,
    pub stake_id: EntityId,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftUnstaked {
    pub id: EntityId,
    pub stake_id: EntityId,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPauseToggle {
    pub id: EntityId,
    pub is_paused: bool,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthRecovered {
    pub id: EntityId,
    pub recipient_id: EntityId,
    #[serde(with = "decimal")]
    pub amount: U256,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20TokenRecovered {
    pub id: EntityId,
    pub token_contract_address: Address,
    pub recipient_id: EntityId,
    #[serde(with = "decimal")]
    pub amount: U256,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721TokenRecovered {
    pub id: EntityId,
    pub nft_contract_id: EntityId,
    pub recipient_id: EntityId,
    pub nft_id: EntityId,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

/// Owner change of the staking contract.
///
/// The previous owner is kept as a raw address: the first transfer comes from
/// the zero address, which never gets a User row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipTransfer {
    pub id: EntityId,
    pub previous_owner: Address,
    pub new_owner_id: EntityId,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

/// Transfer of a collateral NFT.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftTransfer {
    pub id: EntityId,
    pub nft_ownership_id: EntityId,
    pub from: Address,
    pub to_id: EntityId,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

entity!(NftContractAddition, Table::NftContractAddition);
entity!(NftContractRemoval, Table::NftContractRemoval);
entity!(StakingDurationAddition, Table::StakingDurationAddition);
entity!(StakingDurationRemoval, Table::StakingDurationRemoval);
entity!(NftStaked, Table::NftStaked);
entity!(NftUnstaked, Table::NftUnstaked);
entity!(ContractPauseToggle, Table::ContractPauseToggle);
entity!(EthRecovered, Table::EthRecovered);
entity!(Erc20TokenRecovered, Table::Erc20TokenRecovered);
entity!(Erc721TokenRecovered, Table::Erc721TokenRecovered);
entity!(OwnershipTransfer, Table::OwnershipTransfer);
entity!(NftTransfer, Table::NftTransfer);
