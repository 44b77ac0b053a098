//! Indexer configuration.

use crate::error::{IndexerError, Result};
use alloy_primitives::Address;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_STAKING_ADDRESS: &str = "STAKEWATCH_STAKING_ADDRESS";
pub const ENV_NFT_CONTRACT_ADDRESS: &str = "STAKEWATCH_NFT_CONTRACT_ADDRESS";
pub const ENV_START_BLOCK: &str = "STAKEWATCH_START_BLOCK";
pub const ENV_NETWORK: &str = "STAKEWATCH_NETWORK";
pub const ENV_STORE_PATH: &str = "STAKEWATCH_STORE_PATH";
pub const ENV_FAULT_POLICY: &str = "STAKEWATCH_FAULT_POLICY";
pub const ENV_LANE_CAPACITY: &str = "STAKEWATCH_LANE_CAPACITY";

/// Chain the monitored contracts live on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    AbstractTestnet,
    AbstractMainnet,
    Anvil,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::AbstractTestnet => 11124,
            Network::AbstractMainnet => 2741,
            Network::Anvil => 260,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::AbstractTestnet => "abstract-testnet",
            Network::AbstractMainnet => "abstract-mainnet",
            Network::Anvil => "anvil",
        }
    }
}

impl FromStr for Network {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abstract-testnet" | "abstracttestnet" => Ok(Network::AbstractTestnet),
            "abstract-mainnet" | "abstractmainnet" => Ok(Network::AbstractMainnet),
            "anvil" => Ok(Network::Anvil),
            other => Err(IndexerError::Configuration(format!("unknown network {:?}", other))),
        }
    }
}

/// What the router does when an event fails to project.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Stop the stream and surface the error.
    #[default]
    Halt,
    /// Log the fault, leave the store untouched for that event, continue.
    Skip,
}

impl FromStr for FaultPolicy {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "halt" => Ok(FaultPolicy::Halt),
            "skip" => Ok(FaultPolicy::Skip),
            other => Err(IndexerError::Configuration(format!("unknown fault policy {:?}", other))),
        }
    }
}

/// Indexer configuration.
#[derive(Clone, Debug)]
pub struct IndexerConfig {
    /// Staking contract whose events are projected.
    pub staking_contract: Address,

    /// Collateral ERC-721 contract whose transfers are tracked.
    pub collateral_nft_contract: Address,

    /// First block to index.
    pub start_block: u64,

    pub network: Network,

    /// Directory of the journal store.
    pub store_path: PathBuf,

    pub fault_policy: FaultPolicy,

    /// Bounded channel capacity of each pipeline lane.
    pub lane_capacity: usize,
}

impl IndexerConfig {
    /// Configuration with the required values and defaults for the rest.
    pub fn new(
        staking_contract: Address,
        collateral_nft_contract: Address,
        start_block: u64,
        network: Network,
    ) -> Self {
        Self {
            staking_contract,
            collateral_nft_contract,
            start_block,
            network,
            store_path: PathBuf::from("./stakewatch-data"),
            fault_policy: FaultPolicy::Halt,
            lane_capacity: 1024,
        }
    }

    /// Load from `STAKEWATCH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup. Missing or unparsable required values are a
    /// `Configuration` error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| IndexerError::Configuration(format!("{} is not set", key)))
        };

        let mut config = Self::new(
            parse_address(ENV_STAKING_ADDRESS, &required(ENV_STAKING_ADDRESS)?)?,
            parse_address(ENV_NFT_CONTRACT_ADDRESS, &required(ENV_NFT_CONTRACT_ADDRESS)?)?,
            parse_number(ENV_START_BLOCK, &required(ENV_START_BLOCK)?)?,
            required(ENV_NETWORK)?.parse()?,
        );

        if let Some(path) = lookup(ENV_STORE_PATH) {
            config.store_path = PathBuf::from(path);
        }
        if let Some(policy) = lookup(ENV_FAULT_POLICY) {
            config.fault_policy = policy.parse()?;
        }
        if let Some(capacity) = lookup(ENV_LANE_CAPACITY) {
            config.lane_capacity = parse_number(ENV_LANE_CAPACITY, &capacity)?;
            if config.lane_capacity == 0 {
                return Err(IndexerError::Configuration(format!(
                    "{} must be positive",
                    ENV_LANE_CAPACITY
                )));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that hold across fields.
    ///
    /// Each monitored contract is its own lane, so the staking and collateral
    /// addresses must differ.
    pub fn validate(&self) -> Result<()> {
        if self.staking_contract == self.collateral_nft_contract {
            return Err(IndexerError::Configuration(format!(
                "{} and {} are both {}",
                ENV_STAKING_ADDRESS, ENV_NFT_CONTRACT_ADDRESS, self.staking_contract
            )));
        }
        Ok(())
    }
}

fn parse_address(key: &str, value: &str) -> Result<Address> {
    value
        .trim()
        .parse()
        .map_err(|e| IndexerError::Configuration(format!("{} is not an address: {}", key, e)))
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| IndexerError::Configuration(format!("{} is not a number: {}", key, e)))
}
