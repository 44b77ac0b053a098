//! Decoded contract events, as delivered by the chain-data provider.

use crate::types::{BlockProvenance, LogCursor, LogId};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every event kind the projection handles.
///
/// Staking-contract events and the collateral contract's ERC-721 `Transfer`
/// share one closed enum, so dispatch is an exhaustive match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContractEvent {
    #[serde(rename_all = "camelCase")]
    StakingDurationAdded { duration: u64 },

    #[serde(rename_all = "camelCase")]
    StakingDurationRemoved { duration: u64 },

    #[serde(rename_all = "camelCase")]
    NftContractWhitelisted { nft_contract: Address },

    #[serde(rename_all = "camelCase")]
    NftContractRemoved { nft_contract: Address },

    #[serde(rename_all = "camelCase")]
    NftStaked {
        nft_contract: Address,
        token_id: U256,
        staker: Address,
        /// Seconds.
        duration: u64,
        stake_id: U256,
    },

    #[serde(rename_all = "camelCase")]
    NftUnstaked { stake_id: U256 },

    #[serde(rename_all = "camelCase")]
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },

    Paused,

    Unpaused,

    #[serde(rename_all = "camelCase")]
    EthRecovered { recipient: Address, amount: U256 },

    #[serde(rename_all = "camelCase")]
    Erc20TokensRecovered {
        token: Address,
        recipient: Address,
        amount: U256,
    },

    #[serde(rename_all = "camelCase")]
    Erc721TokensRecovered {
        token: Address,
        recipient: Address,
        token_id: U256,
    },

    /// ERC-721 `Transfer` on the collateral NFT contract.
    #[serde(rename_all = "camelCase")]
    NftTransfer {
        from: Address,
        to: Address,
        token_id: U256,
    },
}

/// Which monitored contract emits an event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventSource {
    Staking,
    CollateralNft,
}

impl ContractEvent {
    /// Stable name of the event kind, for logs and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            ContractEvent::StakingDurationAdded { .. } => "StakingDurationAdded",
            ContractEvent::StakingDurationRemoved { .. } => "StakingDurationRemoved",
            ContractEvent::NftContractWhitelisted { .. } => "NFTContractWhitelisted",
            ContractEvent::NftContractRemoved { .. } => "NFTContractRemoved",
            ContractEvent::NftStaked { .. } => "NFTStaked",
            ContractEvent::NftUnstaked { .. } => "NFTUnstaked",
            ContractEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            ContractEvent::Paused => "Paused",
            ContractEvent::Unpaused => "Unpaused",
            ContractEvent::EthRecovered { .. } => "EthRecovered",
            ContractEvent::Erc20TokensRecovered { .. } => "ERC20TokensRecovered",
            ContractEvent::Erc721TokensRecovered { .. } => "ERC721TokensRecovered",
            ContractEvent::NftTransfer { .. } => "Transfer",
        }
    }

    pub fn source(&self) -> EventSource {
        match self {
            ContractEvent::NftTransfer { .. } => EventSource::CollateralNft,
            _ => EventSource::Staking,
        }
    }
}

impl fmt::Display for ContractEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// A decoded event together with the contract that emitted it and its
/// position on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedEvent {
    /// Address of the emitting contract.
    pub contract: Address,
    pub event: ContractEvent,
    pub provenance: BlockProvenance,
}

impl IndexedEvent {
    pub fn new(contract: Address, event: ContractEvent, provenance: BlockProvenance) -> Self {
        Self {
            contract,
            event,
            provenance,
        }
    }

    pub fn log_id(&self) -> LogId {
        self.provenance.log_id()
    }

    pub fn cursor(&self) -> LogCursor {
        self.log_id().cursor()
    }
}
