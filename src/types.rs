//! Core types shared by the store, the projectors and the router.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-addressed identifier of a row (Keccak-256 of its canonical key).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub B256);

impl EntityId {
    /// Convert to a `0x`-prefixed lowercase hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from a hex string, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(EntityId(B256::from(arr)))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}...)", &self.to_hex()[..10])
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Render an address in its single canonical form: `0x` + lowercase hex.
pub fn address_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Unique coordinate of one log in the input stream.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogId {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
}

impl LogId {
    /// Canonical text used when folding the coordinate into a history id.
    pub fn canonical(&self) -> String {
        format!(
            "{}-0x{}-{}",
            self.block_number,
            hex::encode(self.transaction_hash),
            self.log_index
        )
    }

    /// Position of this log in its contract's ordered stream.
    pub fn cursor(&self) -> LogCursor {
        LogCursor {
            block_number: self.block_number,
            log_index: self.log_index,
        }
    }
}

impl fmt::Debug for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogId({})", self.canonical())
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Stream position, ordered by (block number, log index).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct LogCursor {
    pub block_number: u64,
    pub log_index: u64,
}

impl fmt::Debug for LogCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({}:{})", self.block_number, self.log_index)
    }
}

impl fmt::Display for LogCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_number, self.log_index)
    }
}

/// Where a decoded event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockProvenance {
    pub block_number: u64,
    /// Seconds since Unix epoch.
    pub block_timestamp: u64,
    pub transaction_hash: B256,
    /// Index of the log within its block.
    pub log_index: u64,
}

impl BlockProvenance {
    pub fn log_id(&self) -> LogId {
        LogId {
            block_number: self.block_number,
            transaction_hash: self.transaction_hash,
            log_index: self.log_index,
        }
    }
}

/// Serde adapter rendering `U256` as a plain decimal string.
pub mod decimal {
    use alloy_primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(D::Error::custom)
    }
}
