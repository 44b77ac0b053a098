//! Event routing.
//!
//! Each monitored contract is one ordered stream, handled by a [`Lane`] that
//! tracks the stream cursor. A lane projects one event at a time through a
//! fresh [`StoreTxn`] and commits the resulting change set, so the writes of
//! an event land together or not at all.
//!
//! An event older than the lane's cursor is only accepted when it turns out
//! to be a redelivery; anything else would apply state out of order and is
//! rejected with `OutOfOrder`.

mod pipeline;

pub use pipeline::{LaneReport, Pipeline};

use crate::config::FaultPolicy;
use crate::error::{IndexerError, Result};
use crate::events::{EventSource, IndexedEvent};
use crate::projector::{Outcome, Projector};
use crate::store::{StateStore, StoreTxn};
use crate::types::LogCursor;
use alloy_primitives::Address;
use std::collections::HashMap;

/// What happened to one delivered event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Applied,
    /// Redelivery of an already projected log.
    Duplicate,
    /// Integrity fault dropped under [`FaultPolicy::Skip`].
    Skipped,
}

/// Per-lane counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub applied: u64,
    pub duplicates: u64,
    pub skipped: u64,
}

impl RouterStats {
    pub fn total(&self) -> u64 {
        self.applied + self.duplicates + self.skipped
    }

    fn absorb(&mut self, other: &RouterStats) {
        self.applied += other.applied;
        self.duplicates += other.duplicates;
        self.skipped += other.skipped;
    }
}

/// Ordered handling of one contract's event stream.
#[derive(Debug)]
pub struct Lane {
    contract: Address,
    source: EventSource,
    cursor: Option<LogCursor>,
    policy: FaultPolicy,
    stats: RouterStats,
}

impl Lane {
    pub fn new(contract: Address, source: EventSource, policy: FaultPolicy) -> Self {
        Self {
            contract,
            source,
            cursor: None,
            policy,
            stats: RouterStats::default(),
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Position of the last event applied on this lane.
    pub fn cursor(&self) -> Option<LogCursor> {
        self.cursor
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    /// Project and commit `event`, applying the lane's fault policy.
    pub fn dispatch<S: StateStore>(
        &mut self,
        store: &mut S,
        projector: &Projector,
        event: &IndexedEvent,
    ) -> Result<Disposition> {
        match self.process(store, projector, event) {
            Ok(Outcome::Applied) => {
                self.stats.applied += 1;
                tracing::debug!(
                    contract = %self.contract,
                    kind = event.event.kind(),
                    log = %event.log_id(),
                    "applied event"
                );
                Ok(Disposition::Applied)
            }
            Ok(Outcome::Duplicate) => {
                self.stats.duplicates += 1;
                tracing::debug!(
                    contract = %self.contract,
                    kind = event.event.kind(),
                    log = %event.log_id(),
                    "absorbed redelivered event"
                );
                Ok(Disposition::Duplicate)
            }
            Err(e) if self.policy == FaultPolicy::Skip && e.is_integrity_fault() => {
                tracing::warn!(
                    contract = %self.contract,
                    kind = event.event.kind(),
                    log = %event.log_id(),
                    error = %e,
                    "skipping event"
                );
                if !matches!(e, IndexerError::OutOfOrder { .. }) {
                    self.advance(event.cursor());
                }
                self.stats.skipped += 1;
                Ok(Disposition::Skipped)
            }
            Err(e) => Err(e),
        }
    }

    fn process<S: StateStore>(
        &mut self,
        store: &mut S,
        projector: &Projector,
        event: &IndexedEvent,
    ) -> Result<Outcome> {
        if event.contract != self.contract || event.event.source() != self.source {
            return Err(IndexerError::UnknownSource(event.contract));
        }

        let got = event.cursor();
        let (outcome, changes) = {
            let mut txn = StoreTxn::new(&*store);
            let outcome = projector.project(&mut txn, event)?;
            if outcome == Outcome::Applied {
                if let Some(cursor) = self.cursor.filter(|cursor| got < *cursor) {
                    return Err(IndexerError::OutOfOrder {
                        contract: self.contract,
                        cursor,
                        got,
                    });
                }
            }
            (outcome, txn.into_changeset())
        };

        store.commit(changes)?;
        if outcome == Outcome::Applied {
            self.advance(got);
        }
        Ok(outcome)
    }

    fn advance(&mut self, to: LogCursor) {
        self.cursor = Some(self.cursor.map_or(to, |cursor| cursor.max(to)));
    }
}

/// Single-threaded router over the staking and collateral streams.
pub struct EventRouter<S: StateStore> {
    store: S,
    projector: Projector,
    lanes: HashMap<Address, Lane>,
}

impl<S: StateStore> EventRouter<S> {
    /// Fails with `Configuration` if both streams share one address.
    pub fn new(
        store: S,
        staking_contract: Address,
        collateral_nft_contract: Address,
        policy: FaultPolicy,
    ) -> Result<Self> {
        if staking_contract == collateral_nft_contract {
            return Err(IndexerError::Configuration(format!(
                "staking and collateral streams share address {}",
                staking_contract
            )));
        }

        let mut lanes = HashMap::new();
        lanes.insert(
            staking_contract,
            Lane::new(staking_contract, EventSource::Staking, policy),
        );
        lanes.insert(
            collateral_nft_contract,
            Lane::new(collateral_nft_contract, EventSource::CollateralNft, policy),
        );
        Ok(Self {
            store,
            projector: Projector::new(staking_contract),
            lanes,
        })
    }

    /// Route one event to its lane.
    pub fn route(&mut self, event: &IndexedEvent) -> Result<Disposition> {
        let lane = self
            .lanes
            .get_mut(&event.contract)
            .ok_or(IndexerError::UnknownSource(event.contract))?;
        lane.dispatch(&mut self.store, &self.projector, event)
    }

    /// Route events in order, stopping at the first error.
    pub fn route_all<'e>(&mut self, events: impl IntoIterator<Item = &'e IndexedEvent>) -> Result<RouterStats> {
        let mut stats = RouterStats::default();
        for event in events {
            match self.route(event)? {
                Disposition::Applied => stats.applied += 1,
                Disposition::Duplicate => stats.duplicates += 1,
                Disposition::Skipped => stats.skipped += 1,
            }
        }
        Ok(stats)
    }

    /// Counters summed over all lanes.
    pub fn stats(&self) -> RouterStats {
        let mut total = RouterStats::default();
        for lane in self.lanes.values() {
            total.absorb(lane.stats());
        }
        total
    }

    pub fn lane(&self, contract: &Address) -> Option<&Lane> {
        self.lanes.get(contract)
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
