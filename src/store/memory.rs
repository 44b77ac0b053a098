//! In-process row storage.

use super::{ChangeSet, StateStore};
use crate::entities::Table;
use crate::error::Result;
use crate::types::EntityId;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct TableRows {
    rows: HashMap<EntityId, Vec<u8>>,
    /// First-write order.
    order: Vec<EntityId>,
}

/// Rows held in memory, grouped by table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<Table, TableRows>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in a table.
    pub fn row_count(&self, table: Table) -> usize {
        self.tables.get(&table).map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Total number of rows across all tables.
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(|t| t.rows.len()).sum()
    }

    pub(crate) fn apply(&mut self, changes: ChangeSet) {
        for write in changes.writes {
            let table = self.tables.entry(write.table).or_default();
            if table.rows.insert(write.id, write.row).is_none() {
                table.order.push(write.id);
            }
        }
    }
}

impl StateStore for MemoryStore {
    fn get_row(&self, table: Table, id: &EntityId) -> Result<Option<Vec<u8>>> {
        Ok(self
            .tables
            .get(&table)
            .and_then(|t| t.rows.get(id))
            .cloned())
    }

    fn scan_rows(&self, table: Table) -> Result<Vec<Vec<u8>>> {
        let Some(rows) = self.tables.get(&table) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .order
            .iter()
            .filter_map(|id| rows.rows.get(id).cloned())
            .collect())
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<()> {
        self.apply(changes);
        Ok(())
    }
}
