//! # Stakewatch
//!
//! Projects the event log of an NFT-staking contract into current-state
//! entities plus an immutable history of the events that changed them.
//!
//! ## Core Concepts
//!
//! - **Content-addressed ids**: every row key is a Keccak-256 digest of a
//!   canonical natural key, so replaying an event derives the same keys
//! - **Store verbs**: insert-if-absent for dimension rows, create for
//!   primary and history rows, update-fields for state changes
//! - **Per-event atomicity**: one event's writes are staged in a transaction
//!   and committed as a single change set
//! - **Lanes**: each monitored contract is an ordered stream
//!
//! ## Example
//!
//! ```ignore
//! use stakewatch::{indexer, IndexerConfig, IndexedEvent};
//!
//! let config = IndexerConfig::from_env()?;
//! let store = indexer::open_store(&config, &rpc_reader)?;
//! let mut router = indexer::router(store, &config)?;
//!
//! for event in provider.events_since(config.start_block) {
//!     router.route(&event)?;
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod entities;
pub mod error;
pub mod events;
pub mod id;
pub mod indexer;
pub mod projector;
pub mod router;
pub mod store;
pub mod types;

// Re-exports
pub use bootstrap::{CallResult, CallValue, ContractParameters, Getter, MulticallReader};
pub use config::{FaultPolicy, IndexerConfig, Network};
pub use entities::*;
pub use error::{IndexerError, Result};
pub use events::{ContractEvent, EventSource, IndexedEvent};
pub use projector::{Outcome, Projector};
pub use router::{Disposition, EventRouter, Lane, LaneReport, Pipeline, RouterStats};
pub use store::{
    ChangeSet, FieldPatch, JournalConfig, JournalStore, MemoryStore, RowWrite, StateStore,
    StoreTxn,
};
pub use types::{BlockProvenance, EntityId, LogCursor, LogId};
