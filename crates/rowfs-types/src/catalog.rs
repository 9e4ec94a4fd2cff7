//! The field catalog: the closed, ordered set of columns exposed as files.
//!
//! A field's identity is its 1-based position in the catalog, not its name.
//! Inode numbers are derived from that position (see [`crate::inode`]), and
//! queries reach a column only through [`FieldCatalog::column`], which maps
//! a [`FieldId`] back to a validated [`Ident`].

use std::collections::HashSet;

use crate::error::{TypeError, TypeResult};
use crate::ident::Ident;
use crate::inode::{InodeAllocator, InodeBase};

/// 1-based position of a field in its [`FieldCatalog`].
///
/// There is no public constructor: the only way to get a `FieldId` is to
/// look a name up in a catalog (or decode an inode against one), so a
/// caller-supplied string can never stand in for a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(u32);

impl FieldId {
    pub(crate) fn from_index(index: u32) -> Self {
        debug_assert!(index > 0, "field ids are 1-based");
        Self(index)
    }

    /// The 1-based catalog position.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Immutable, ordered list of exposed field names.
///
/// Built once at startup and shared read-only afterwards. Construction
/// enforces `len() <= base - 1`, which keeps every data inode strictly
/// between its group's inode and the next group's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldCatalog {
    fields: Vec<Ident>,
    base: InodeBase,
}

impl FieldCatalog {
    /// Build a catalog from field names in display order.
    ///
    /// Fails if a name is not a valid identifier, a name repeats, or there
    /// are more names than `base` can number.
    pub fn new<I, S>(names: I, base: InodeBase) -> TypeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        for name in names {
            let ident = Ident::new(name)?;
            if !seen.insert(ident.clone()) {
                return Err(TypeError::DuplicateField(ident.into()));
            }
            fields.push(ident);
        }

        let max = base.max_fields();
        if fields.len() as u64 > max {
            return Err(TypeError::TooManyFields {
                count: fields.len(),
                base: base.get(),
                max,
            });
        }

        Ok(Self { fields, base })
    }

    /// Build a catalog numbered with [`InodeBase::DEFAULT`].
    pub fn with_default_base<I, S>(names: I) -> TypeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names, InodeBase::DEFAULT)
    }

    pub fn base(&self) -> InodeBase {
        self.base
    }

    /// Inode allocator using this catalog's stride.
    pub fn allocator(&self) -> InodeAllocator {
        InodeAllocator::new(self.base)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Map a field name to its id. Exact, case-sensitive match.
    pub fn lookup(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f.as_str() == name)
            .map(|pos| FieldId::from_index(pos as u32 + 1))
    }

    /// Column identifier for a field id, or `None` if the id is out of
    /// range for this catalog.
    pub fn column(&self, id: FieldId) -> Option<&Ident> {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|pos| self.fields.get(pos))
    }

    /// Field name for a field id.
    pub fn name(&self, id: FieldId) -> Option<&str> {
        self.column(id).map(Ident::as_str)
    }

    /// Fields in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &Ident)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(pos, ident)| (FieldId::from_index(pos as u32 + 1), ident))
    }

    /// Field names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Ident::as_str)
    }

    /// The field at 1-based `index`, if the catalog has one there.
    pub(crate) fn field_at(&self, index: u64) -> Option<FieldId> {
        if index == 0 || index > self.fields.len() as u64 {
            return None;
        }
        Some(FieldId::from_index(index as u32))
    }
}
