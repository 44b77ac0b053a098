//! Threaded routing: one worker per contract stream.
//!
//! Lanes run in parallel but each lane consumes its bounded channel in
//! order, so events of one stream are never reordered. The store is shared
//! behind a mutex that is held for the projection and commit of one event.

use super::{Lane, RouterStats};
use crate::config::FaultPolicy;
use crate::error::{IndexerError, Result};
use crate::events::{EventSource, IndexedEvent};
use crate::projector::Projector;
use crate::store::StateStore;
use crate::types::LogCursor;
use alloy_primitives::Address;
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Final state of one lane after the pipeline is finished.
#[derive(Debug)]
pub struct LaneReport {
    pub contract: Address,
    pub stats: RouterStats,
    pub cursor: Option<LogCursor>,
    /// The error that halted the lane, if any.
    pub error: Option<IndexerError>,
}

struct LaneWorker {
    sender: Sender<IndexedEvent>,
    handle: JoinHandle<LaneReport>,
}

/// Parallel router over independent contract streams.
pub struct Pipeline<S: StateStore + Send + 'static> {
    store: Arc<Mutex<S>>,
    workers: HashMap<Address, LaneWorker>,
}

impl<S: StateStore + Send + 'static> Pipeline<S> {
    /// Spawn one lane per `(contract, source)` pair.
    pub fn spawn(
        store: Arc<Mutex<S>>,
        projector: Projector,
        sources: &[(Address, EventSource)],
        policy: FaultPolicy,
        capacity: usize,
    ) -> Result<Self> {
        for (i, (contract, _)) in sources.iter().enumerate() {
            if sources[..i].iter().any(|(other, _)| other == contract) {
                return Err(IndexerError::Configuration(format!(
                    "contract {} is assigned to more than one lane",
                    contract
                )));
            }
        }

        let mut workers = HashMap::new();
        for &(contract, source) in sources {
            let (sender, receiver) = bounded::<IndexedEvent>(capacity);
            let store = Arc::clone(&store);
            let projector = projector.clone();
            let mut lane = Lane::new(contract, source, policy);

            let handle = thread::Builder::new()
                .name(format!("lane-{:?}-{}", source, contract))
                .spawn(move || {
                    tracing::info!(%contract, ?source, "lane started");
                    let mut error = None;
                    for event in receiver {
                        let mut guard = store.lock();
                        if let Err(e) = lane.dispatch(&mut *guard, &projector, &event) {
                            tracing::error!(%contract, log = %event.log_id(), error = %e, "lane halted");
                            error = Some(e);
                            break;
                        }
                    }
                    tracing::info!(%contract, applied = lane.stats().applied, "lane stopped");
                    LaneReport {
                        contract,
                        stats: lane.stats().clone(),
                        cursor: lane.cursor(),
                        error,
                    }
                })?;

            workers.insert(contract, LaneWorker { sender, handle });
        }

        Ok(Self { store, workers })
    }

    /// Queue an event on its contract's lane, blocking while the lane is full.
    ///
    /// Fails with `PipelineClosed` once the lane has halted.
    pub fn submit(&self, event: IndexedEvent) -> Result<()> {
        let worker = self
            .workers
            .get(&event.contract)
            .ok_or(IndexerError::UnknownSource(event.contract))?;
        worker
            .sender
            .send(event)
            .map_err(|_| IndexerError::PipelineClosed)
    }

    /// Names of the lane threads, sorted.
    pub fn thread_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .workers
            .values()
            .filter_map(|worker| worker.handle.thread().name().map(str::to_owned))
            .collect();
        names.sort();
        names
    }

    /// Shared handle to the store.
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Close all lanes, wait for queued events to drain, and collect reports.
    pub fn finish(self) -> Result<Vec<LaneReport>> {
        let mut reports = Vec::with_capacity(self.workers.len());
        for (_, worker) in self.workers {
            drop(worker.sender);
            let report = worker
                .handle
                .join()
                .map_err(|_| IndexerError::PipelineClosed)?;
            reports.push(report);
        }
        reports.sort_by_key(|r| r.contract);
        Ok(reports)
    }
}
