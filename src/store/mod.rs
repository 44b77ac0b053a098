//! Keyed row storage.
//!
//! Backends implement [`StateStore`]: point reads, table scans and atomic
//! commit of a [`ChangeSet`]. Projectors never write to a backend directly;
//! they go through a [`StoreTxn`], which enforces the write verbs
//! (insert-if-absent, create, update-fields, upsert) against a staged view
//! and yields the change set for one event.

mod journal;
mod memory;
mod txn;

pub use journal::{JournalConfig, JournalStore};
pub use memory::MemoryStore;
pub use txn::{FieldPatch, StoreTxn};

use crate::entities::{Entity, Table};
use crate::error::{IndexerError, Result};
use crate::types::EntityId;
use serde::{Deserialize, Serialize};

/// A resolved row write, produced by a [`StoreTxn`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWrite {
    pub table: Table,
    pub id: EntityId,
    /// JSON-encoded row.
    pub row: Vec<u8>,
}

/// All row writes of one event, applied as a unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub writes: Vec<RowWrite>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }
}

/// Storage backend for projected rows.
pub trait StateStore {
    /// Read the JSON-encoded row stored under `id`.
    fn get_row(&self, table: Table, id: &EntityId) -> Result<Option<Vec<u8>>>;

    /// All rows of a table, in the order they were first written.
    fn scan_rows(&self, table: Table) -> Result<Vec<Vec<u8>>>;

    /// Apply every write of `changes`, or none of them.
    fn commit(&mut self, changes: ChangeSet) -> Result<()>;

    /// Typed point lookup.
    fn get<E: Entity>(&self, id: &EntityId) -> Result<Option<E>>
    where
        Self: Sized,
    {
        self.get_row(E::TABLE, id)?
            .map(|bytes| decode_row(&bytes))
            .transpose()
    }

    /// Typed point lookup that fails with `NotFound` on absence.
    fn require<E: Entity>(&self, id: &EntityId) -> Result<E>
    where
        Self: Sized,
    {
        self.get(id)?.ok_or(IndexerError::NotFound {
            table: E::TABLE,
            id: *id,
        })
    }

    /// Typed table scan, in first-write order.
    fn scan<E: Entity>(&self) -> Result<Vec<E>>
    where
        Self: Sized,
    {
        self.scan_rows(E::TABLE)?
            .iter()
            .map(|bytes| decode_row(bytes))
            .collect()
    }
}

impl<T: StateStore + ?Sized> StateStore for &mut T {
    fn get_row(&self, table: Table, id: &EntityId) -> Result<Option<Vec<u8>>> {
        (**self).get_row(table, id)
    }

    fn scan_rows(&self, table: Table) -> Result<Vec<Vec<u8>>> {
        (**self).scan_rows(table)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<()> {
        (**self).commit(changes)
    }
}

pub(crate) fn encode_row<E: Entity>(row: &E) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(row)?)
}

pub(crate) fn decode_row<E: Entity>(bytes: &[u8]) -> Result<E> {
    serde_json::from_slice(bytes).map_err(|e| IndexerError::Deserialization(e.to_string()))
}
