use std::fmt;

use crate::catalog::FieldId;

/// The semantic meaning of a namespace position.
///
/// Classified once, when an entry is first looked up, and carried with the
/// entry (and any session opened on it) from then on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// The mount root; its children are groups.
    Root,
    /// One table row, shown as a directory named after the row's key.
    Group { name: String },
    /// One configured field of one row, shown as a regular file.
    Data { group: String, field: FieldId },
}

/// Discriminant of an [`Address`], for dispatch and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressKind {
    Root,
    Group,
    Data,
}

impl Address {
    pub fn group(name: impl Into<String>) -> Self {
        Self::Group { name: name.into() }
    }

    pub fn data(group: impl Into<String>, field: FieldId) -> Self {
        Self::Data {
            group: group.into(),
            field,
        }
    }

    pub fn kind(&self) -> AddressKind {
        match self {
            Self::Root => AddressKind::Root,
            Self::Group { .. } => AddressKind::Group,
            Self::Data { .. } => AddressKind::Data,
        }
    }

    /// Levels below the root: 0, 1 or 2.
    pub fn depth(&self) -> usize {
        match self {
            Self::Root => 0,
            Self::Group { .. } => 1,
            Self::Data { .. } => 2,
        }
    }

    /// The row key this address belongs to, if any.
    pub fn group_name(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Group { name } => Some(name),
            Self::Data { group, .. } => Some(group),
        }
    }

    pub fn field(&self) -> Option<FieldId> {
        match self {
            Self::Data { field, .. } => Some(*field),
            _ => None,
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Group => write!(f, "group"),
            Self::Data => write!(f, "data"),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "/"),
            Self::Group { name } => write!(f, "/{name}"),
            Self::Data { group, field } => write!(f, "/{group}/#{}", field.index()),
        }
    }
}
