use rowfs_types::{FieldId, RowId};
use serde::{Deserialize, Serialize};

/// One row of the backing table, seen as a directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    pub row_id: RowId,
    pub name: String,
}

impl Group {
    pub fn new(row_id: RowId, name: impl Into<String>) -> Self {
        Self {
            row_id,
            name: name.into(),
        }
    }
}

/// One file inside a group's directory: a catalog field of that row.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DataEntry {
    pub row_id: RowId,
    pub field: FieldId,
    pub name: String,
}
