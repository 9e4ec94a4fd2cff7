use rowfs_types::{FieldCatalog, FieldId};
use tracing::debug;

use crate::error::StoreResult;
use crate::group::{DataEntry, Group};

/// Access to the backing table.
///
/// All implementations must satisfy these invariants:
/// - Each call is one independent statement; no locking spans calls.
/// - `get_group` and `get_field` return `Ok(None)` when zero rows, or more
///   than one row, match the name.
/// - `get_field` returns the JSON text of the stored value.
/// - `put_field` replaces the stored value with the given bytes verbatim.
/// - Connection and query failures surface as `StoreError::Unavailable`;
///   nothing is retried.
pub trait DataStore: Send + Sync {
    /// The catalog whose `FieldId`s this store accepts.
    fn catalog(&self) -> &FieldCatalog;

    /// All groups, ordered by row id. An empty table is a valid result.
    fn list_groups(&self) -> StoreResult<Vec<Group>>;

    /// Fetch one group by name.
    fn get_group(&self, name: &str) -> StoreResult<Option<Group>>;

    /// JSON text of one field of one group.
    fn get_field(&self, group: &str, field: FieldId) -> StoreResult<Option<Vec<u8>>>;

    /// Replace one field of one group with `raw`.
    ///
    /// Returns `StoreError::GroupNotFound` if no row has that name.
    fn put_field(&self, group: &str, field: FieldId, raw: &[u8]) -> StoreResult<()>;

    /// Insert a new row named `name`.
    ///
    /// Returns `StoreError::DuplicateGroup` if the name is taken.
    fn create_group(&self, name: &str) -> StoreResult<Group>;

    /// Files of a group's directory, in catalog order.
    ///
    /// Derived from the catalog once the group is confirmed to exist. A group
    /// that has disappeared yields an empty listing, not an error: the row may
    /// be deleted between the two phases of a directory listing.
    fn list_fields(&self, group: &str) -> StoreResult<Vec<DataEntry>> {
        let Some(found) = self.get_group(group)? else {
            debug!(group, "group vanished before its fields were listed");
            return Ok(Vec::new());
        };
        Ok(self
            .catalog()
            .iter()
            .map(|(field, ident)| DataEntry {
                row_id: found.row_id,
                field,
                name: ident.as_str().to_string(),
            })
            .collect())
    }
}

impl<T: DataStore + ?Sized> DataStore for std::sync::Arc<T> {
    fn catalog(&self) -> &FieldCatalog {
        (**self).catalog()
    }

    fn list_groups(&self) -> StoreResult<Vec<Group>> {
        (**self).list_groups()
    }

    fn get_group(&self, name: &str) -> StoreResult<Option<Group>> {
        (**self).get_group(name)
    }

    fn get_field(&self, group: &str, field: FieldId) -> StoreResult<Option<Vec<u8>>> {
        (**self).get_field(group, field)
    }

    fn put_field(&self, group: &str, field: FieldId, raw: &[u8]) -> StoreResult<()> {
        (**self).put_field(group, field, raw)
    }

    fn create_group(&self, name: &str) -> StoreResult<Group> {
        (**self).create_group(name)
    }

    fn list_fields(&self, group: &str) -> StoreResult<Vec<DataEntry>> {
        (**self).list_fields(group)
    }
}
