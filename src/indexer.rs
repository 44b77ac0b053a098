//! Wiring of configuration, store, bootstrap and routing.

use crate::bootstrap::{bootstrap, MulticallReader};
use crate::config::IndexerConfig;
use crate::entities::GlobalState;
use crate::error::Result;
use crate::events::EventSource;
use crate::id;
use crate::projector::Projector;
use crate::router::{EventRouter, Pipeline};
use crate::store::{JournalConfig, JournalStore, StateStore};
use parking_lot::Mutex;
use std::sync::Arc;

/// Seed GlobalState unless it already exists in `store`.
///
/// Returns the row and whether bootstrap ran.
pub fn ensure_bootstrapped<S: StateStore, R: MulticallReader + ?Sized>(
    store: &mut S,
    reader: &R,
    config: &IndexerConfig,
) -> Result<(GlobalState, bool)> {
    let global_state_id = id::global_state_id(&config.staking_contract);
    if let Some(existing) = store.get::<GlobalState>(&global_state_id)? {
        tracing::info!(contract = %config.staking_contract, "global state present, skipping bootstrap");
        return Ok((existing, false));
    }
    let created = bootstrap(store, reader, config.staking_contract)?;
    Ok((created, true))
}

/// Open the journal store named by `config` and bootstrap it if needed.
pub fn open_store<R: MulticallReader + ?Sized>(
    config: &IndexerConfig,
    reader: &R,
) -> Result<JournalStore> {
    config.validate()?;
    let mut store = JournalStore::open_or_create(JournalConfig {
        path: config.store_path.clone(),
        ..Default::default()
    })?;
    ensure_bootstrapped(&mut store, reader, config)?;
    tracing::info!(
        network = config.network.name(),
        chain_id = config.network.chain_id(),
        start_block = config.start_block,
        "store ready"
    );
    Ok(store)
}

/// Single-threaded router over a bootstrapped store.
pub fn router<S: StateStore>(store: S, config: &IndexerConfig) -> Result<EventRouter<S>> {
    EventRouter::new(
        store,
        config.staking_contract,
        config.collateral_nft_contract,
        config.fault_policy,
    )
}

/// Threaded pipeline with one lane per monitored contract.
pub fn pipeline<S: StateStore + Send + 'static>(
    store: S,
    config: &IndexerConfig,
) -> Result<Pipeline<S>> {
    Pipeline::spawn(
        Arc::new(Mutex::new(store)),
        Projector::new(config.staking_contract),
        &[
            (config.staking_contract, EventSource::Staking),
            (config.collateral_nft_contract, EventSource::CollateralNft),
        ],
        config.fault_policy,
        config.lane_capacity,
    )
}
