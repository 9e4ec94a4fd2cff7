use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use rowfs_types::{FieldCatalog, FieldId, RowId};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::group::Group;
use crate::traits::DataStore;

#[derive(Clone, Debug)]
struct Row {
    name: String,
    /// One cell per catalog field, in catalog order.
    cells: Vec<Value>,
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<RowId, Row>,
    last_id: u64,
}

impl Table {
    fn contains(&self, name: &str) -> bool {
        self.rows.values().any(|row| row.name == name)
    }

    /// The single row named `name`, or `None` when zero or several match.
    fn unique(&self, name: &str) -> Option<(RowId, &Row)> {
        let mut hits = self.rows.iter().filter(|(_, row)| row.name == name);
        let first = hits.next()?;
        if hits.next().is_some() {
            warn!(group = name, "ambiguous group name; treating as not found");
            return None;
        }
        Some((*first.0, first.1))
    }
}

/// In-memory, `BTreeMap`-based table.
///
/// Intended for tests and embedding. Rows live behind a `RwLock`; values are
/// JSON values, with every field of a new row starting as `null`. Written
/// bytes are kept as JSON strings, which is how a text column reads back.
///
/// Beyond [`DataStore`], the table can simulate what happens outside rowfs:
/// rows deleted by other clients ([`delete_group`](Self::delete_group)), rows
/// inserted without the uniqueness constraint ([`insert_row`](Self::insert_row)),
/// and an unreachable database ([`set_unavailable`](Self::set_unavailable)).
pub struct InMemoryDataStore {
    catalog: Arc<FieldCatalog>,
    table: RwLock<Table>,
    mutations: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryDataStore {
    /// Create an empty table with one column per catalog field.
    pub fn new(catalog: Arc<FieldCatalog>) -> Self {
        Self {
            catalog,
            table: RwLock::new(Table::default()),
            mutations: AtomicU64::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        self.table.read().expect("lock poisoned").rows.len()
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.table.read().expect("lock poisoned").rows.is_empty()
    }

    /// Number of `put_field` and `create_group` calls that changed the table.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Make every subsequent operation fail with `Unavailable` (or succeed
    /// again, with `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert a row with an explicit id, bypassing the name uniqueness check.
    ///
    /// `values` maps field names to stored values; fields left out are
    /// `null`. Used to seed fixtures and to model tables without a unique
    /// constraint on `name`.
    pub fn insert_row(
        &self,
        row_id: RowId,
        name: impl Into<String>,
        values: BTreeMap<String, Value>,
    ) -> StoreResult<()> {
        let mut cells = vec![Value::Null; self.catalog.len()];
        for (column, value) in values {
            let field = self
                .catalog
                .lookup(&column)
                .ok_or_else(|| StoreError::UnknownColumn(column.clone()))?;
            cells[field.index() as usize - 1] = value;
        }

        let mut table = self.table.write().expect("lock poisoned");
        table.last_id = table.last_id.max(row_id.get());
        table.rows.insert(
            row_id,
            Row {
                name: name.into(),
                cells,
            },
        );
        Ok(())
    }

    /// Delete every row named `name`, as another client would. Returns
    /// `true` if anything was removed.
    pub fn delete_group(&self, name: &str) -> bool {
        let mut table = self.table.write().expect("lock poisoned");
        let before = table.rows.len();
        table.rows.retain(|_, row| row.name != name);
        table.rows.len() != before
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }

    fn cell_index(&self, field: FieldId) -> StoreResult<usize> {
        self.catalog
            .column(field)
            .map(|_| field.index() as usize - 1)
            .ok_or(StoreError::UnknownField(field))
    }
}

impl DataStore for InMemoryDataStore {
    fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    fn list_groups(&self) -> StoreResult<Vec<Group>> {
        self.check_available()?;
        let table = self.table.read().expect("lock poisoned");
        Ok(table
            .rows
            .iter()
            .map(|(id, row)| Group::new(*id, row.name.clone()))
            .collect())
    }

    fn get_group(&self, name: &str) -> StoreResult<Option<Group>> {
        self.check_available()?;
        let table = self.table.read().expect("lock poisoned");
        Ok(table.unique(name).map(|(id, row)| Group::new(id, row.name.clone())))
    }

    fn get_field(&self, group: &str, field: FieldId) -> StoreResult<Option<Vec<u8>>> {
        let idx = self.cell_index(field)?;
        self.check_available()?;
        let table = self.table.read().expect("lock poisoned");
        match table.unique(group) {
            Some((_, row)) => Ok(Some(serde_json::to_vec(&row.cells[idx])?)),
            None => Ok(None),
        }
    }

    fn put_field(&self, group: &str, field: FieldId, raw: &[u8]) -> StoreResult<()> {
        let idx = self.cell_index(field)?;
        self.check_available()?;
        let text = std::str::from_utf8(raw).map_err(|_| StoreError::InvalidEncoding)?;

        let mut table = self.table.write().expect("lock poisoned");
        let mut updated = 0usize;
        for row in table.rows.values_mut().filter(|row| row.name == group) {
            row.cells[idx] = Value::String(text.to_string());
            updated += 1;
        }
        if updated == 0 {
            return Err(StoreError::GroupNotFound(group.to_string()));
        }

        self.mutations.fetch_add(1, Ordering::SeqCst);
        debug!(group, field = field.index(), len = raw.len(), updated, "field replaced");
        Ok(())
    }

    fn create_group(&self, name: &str) -> StoreResult<Group> {
        self.check_available()?;
        let mut table = self.table.write().expect("lock poisoned");
        if table.contains(name) {
            return Err(StoreError::DuplicateGroup(name.to_string()));
        }

        let row_id = RowId::new(table.last_id + 1)?;
        table.last_id = row_id.get();
        table.rows.insert(
            row_id,
            Row {
                name: name.to_string(),
                cells: vec![Value::Null; self.catalog.len()],
            },
        );

        self.mutations.fetch_add(1, Ordering::SeqCst);
        debug!(group = name, row = %row_id, "group created");
        Ok(Group::new(row_id, name))
    }
}

impl std::fmt::Debug for InMemoryDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDataStore")
            .field("fields", &self.catalog.len())
            .field("row_count", &self.len())
            .field("mutations", &self.mutation_count())
            .finish()
    }
}
