//! Per-event staging of row writes.

use super::{decode_row, encode_row, ChangeSet, RowWrite, StateStore};
use crate::entities::{Entity, Table};
use crate::error::{IndexerError, Result};
use crate::types::EntityId;
use serde::Serialize;
use std::collections::HashMap;

/// Named field assignments for [`StoreTxn::update_fields`].
///
/// Field names are the serialized (camelCase) row field names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldPatch {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `field`.
    pub fn set(mut self, field: &str, value: impl Serialize) -> Result<Self> {
        self.fields
            .insert(field.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge into `row`. Every named field must already be present, and the
    /// id is never reassigned.
    fn apply_to(&self, table: Table, row: &mut serde_json::Map<String, serde_json::Value>) -> Result<()> {
        for (field, value) in &self.fields {
            if field == "id" || !row.contains_key(field) {
                return Err(IndexerError::UnknownField {
                    table,
                    field: field.clone(),
                });
            }
            row.insert(field.clone(), value.clone());
        }
        Ok(())
    }
}

/// Write verbs over a staged view of a backend.
///
/// Reads see staged writes first, then the backend. Nothing reaches the
/// backend until the caller commits [`StoreTxn::into_changeset`]; dropping
/// the transaction discards every staged write.
pub struct StoreTxn<'a, S: StateStore> {
    base: &'a S,
    staged: HashMap<(Table, EntityId), Vec<u8>>,
    order: Vec<(Table, EntityId)>,
}

impl<'a, S: StateStore> StoreTxn<'a, S> {
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            staged: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn read_row(&self, table: Table, id: &EntityId) -> Result<Option<Vec<u8>>> {
        match self.staged.get(&(table, *id)) {
            Some(bytes) => Ok(Some(bytes.clone())),
            None => self.base.get_row(table, id),
        }
    }

    fn stage(&mut self, table: Table, id: EntityId, row: Vec<u8>) {
        if self.staged.insert((table, id), row).is_none() {
            self.order.push((table, id));
        }
    }

    /// Whether a row exists under `id`.
    pub fn exists(&self, table: Table, id: &EntityId) -> Result<bool> {
        Ok(self.read_row(table, id)?.is_some())
    }

    pub fn get<E: Entity>(&self, id: &EntityId) -> Result<Option<E>> {
        self.read_row(E::TABLE, id)?
            .map(|bytes| decode_row(&bytes))
            .transpose()
    }

    /// Point lookup failing with `NotFound` on absence.
    pub fn require<E: Entity>(&self, id: &EntityId) -> Result<E> {
        self.get(id)?.ok_or(IndexerError::NotFound {
            table: E::TABLE,
            id: *id,
        })
    }

    /// Create `row` unless its key is already present.
    ///
    /// Returns whether the row was created. An existing row is left untouched.
    pub fn insert_if_absent<E: Entity>(&mut self, row: &E) -> Result<bool> {
        let id = row.id();
        if self.exists(E::TABLE, &id)? {
            return Ok(false);
        }
        self.stage(E::TABLE, id, encode_row(row)?);
        Ok(true)
    }

    /// Create `row`, failing with `AlreadyExists` if its key is present.
    pub fn create<E: Entity>(&mut self, row: &E) -> Result<()> {
        let id = row.id();
        if self.exists(E::TABLE, &id)? {
            return Err(IndexerError::AlreadyExists { table: E::TABLE, id });
        }
        self.stage(E::TABLE, id, encode_row(row)?);
        Ok(())
    }

    /// Assign the fields named in `patch` on an existing row.
    ///
    /// Fails with `NotFound` if the row is absent and with `UnknownField` if
    /// the patch names a field the row does not carry. Returns the updated row.
    pub fn update_fields<E: Entity>(&mut self, id: &EntityId, patch: &FieldPatch) -> Result<E> {
        let bytes = self
            .read_row(E::TABLE, id)?
            .ok_or(IndexerError::NotFound {
                table: E::TABLE,
                id: *id,
            })?;

        let mut object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&bytes)
            .map_err(|e| IndexerError::Deserialization(e.to_string()))?;
        patch.apply_to(E::TABLE, &mut object)?;

        let updated: E = serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| IndexerError::Deserialization(e.to_string()))?;
        self.stage(E::TABLE, *id, encode_row(&updated)?);
        Ok(updated)
    }

    /// Write `row` whether or not its key is present, replacing all fields.
    pub fn upsert<E: Entity>(&mut self, row: &E) -> Result<()> {
        self.stage(E::TABLE, row.id(), encode_row(row)?);
        Ok(())
    }

    /// Number of distinct rows staged so far.
    pub fn staged_len(&self) -> usize {
        self.order.len()
    }

    /// Resolve the staged writes, in first-staged order.
    pub fn into_changeset(mut self) -> ChangeSet {
        let writes = self
            .order
            .into_iter()
            .filter_map(|key| {
                self.staged.remove(&key).map(|row| RowWrite {
                    table: key.0,
                    id: key.1,
                    row,
                })
            })
            .collect();
        ChangeSet { writes }
    }
}
