//! Deterministic inode numbering.
//!
//! ```text
//! group_ino(row)        = row * BASE
//! data_ino(row, field)  = row * BASE + field.index()     (1 <= index <= BASE-1)
//! ```
//!
//! Every number emitted for a namespace entry comes from here, so lookup,
//! enumeration and attribute queries always agree on an entry's identity.
//! Row ids are positive and `BASE >= 2`, so no group or data inode can equal
//! [`Ino::ROOT`].

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::catalog::{FieldCatalog, FieldId};
use crate::error::{TypeError, TypeResult};

/// Numbering stride separating a group's inode from its fields' inodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct InodeBase(u64);

impl InodeBase {
    /// Reference stride: 16, allowing up to 15 fields.
    pub const DEFAULT: Self = Self(16);

    pub fn new(base: u64) -> TypeResult<Self> {
        if base < 2 {
            return Err(TypeError::InvalidBase(base));
        }
        Ok(Self(base))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Largest catalog this stride can number.
    pub fn max_fields(self) -> u64 {
        self.0 - 1
    }
}

impl Default for InodeBase {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u64> for InodeBase {
    type Error = TypeError;

    fn try_from(value: u64) -> TypeResult<Self> {
        Self::new(value)
    }
}

impl From<InodeBase> for u64 {
    fn from(base: InodeBase) -> Self {
        base.0
    }
}

/// Storage identifier of a table row. Always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RowId(NonZeroU64);

impl RowId {
    pub fn new(id: u64) -> TypeResult<Self> {
        NonZeroU64::new(id).map(Self).ok_or(TypeError::ZeroRowId)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for RowId {
    type Error = TypeError;

    fn try_from(value: u64) -> TypeResult<Self> {
        Self::new(value)
    }
}

impl From<RowId> for u64 {
    fn from(row: RowId) -> Self {
        row.get()
    }
}

/// Numeric identity of a namespace entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ino(u64);

impl Ino {
    /// The mount root. Fixed by the kernel protocol.
    pub const ROOT: Self = Self(1);

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ino {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Ino> for u64 {
    fn from(ino: Ino) -> Self {
        ino.0
    }
}

/// Stateless `(row, field) -> inode` mapping for one stride.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InodeAllocator {
    base: InodeBase,
}

impl InodeAllocator {
    pub fn new(base: InodeBase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> InodeBase {
        self.base
    }

    /// Inode of the directory for `row`.
    pub fn group_ino(&self, row: RowId) -> TypeResult<Ino> {
        row.get()
            .checked_mul(self.base.get())
            .map(Ino)
            .ok_or(TypeError::InodeOverflow {
                row: row.get(),
                base: self.base.get(),
            })
    }

    /// Inode of the file for `field` inside `row`'s directory.
    pub fn data_ino(&self, row: RowId, field: FieldId) -> TypeResult<Ino> {
        let group = self.group_ino(row)?;
        debug_assert!(u64::from(field.index()) < self.base.get());
        group
            .0
            .checked_add(u64::from(field.index()))
            .map(Ino)
            .ok_or(TypeError::InodeOverflow {
                row: row.get(),
                base: self.base.get(),
            })
    }

    /// Inverse mapping: which row (and field, for data inodes) an inode
    /// names. Returns `None` for the root, for inodes below the stride, and
    /// for offsets the catalog has no field at.
    pub fn decode(&self, ino: Ino, catalog: &FieldCatalog) -> Option<(RowId, Option<FieldId>)> {
        let base = self.base.get();
        let row = RowId::new(ino.0 / base).ok()?;
        match ino.0 % base {
            0 => Some((row, None)),
            offset => catalog.field_at(offset).map(|field| (row, Some(field))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(id: u64) -> RowId {
        RowId::new(id).unwrap()
    }

    #[test]
    fn reference_numbering() {
        let catalog = FieldCatalog::with_default_base(["hoge", "fuga"]).unwrap();
        let alloc = catalog.allocator();
        let hoge = catalog.lookup("hoge").unwrap();
        let fuga = catalog.lookup("fuga").unwrap();

        assert_eq!(alloc.group_ino(row(3)).unwrap().get(), 48);
        assert_eq!(alloc.data_ino(row(3), hoge).unwrap().get(), 49);
        assert_eq!(alloc.data_ino(row(3), fuga).unwrap().get(), 50);
    }

    #[test]
    fn zero_row_rejected() {
        assert_eq!(RowId::new(0), Err(TypeError::ZeroRowId));
    }

    #[test]
    fn base_below_two_rejected() {
        assert!(InodeBase::new(0).is_err());
        assert!(InodeBase::new(1).is_err());
        assert_eq!(InodeBase::new(2).unwrap().max_fields(), 1);
    }

    #[test]
    fn group_inode_never_root() {
        let alloc = InodeAllocator::new(InodeBase::new(2).unwrap());
        assert_ne!(alloc.group_ino(row(1)).unwrap(), Ino::ROOT);
    }

    #[test]
    fn overflow_is_reported() {
        let alloc = InodeAllocator::new(InodeBase::DEFAULT);
        let err = alloc.group_ino(row(u64::MAX / 8)).unwrap_err();
        assert!(matches!(err, TypeError::InodeOverflow { base: 16, .. }));
    }

    #[test]
    fn decode_inverts_allocation() {
        let catalog = FieldCatalog::with_default_base(["hoge", "fuga"]).unwrap();
        let alloc = catalog.allocator();
        let fuga = catalog.lookup("fuga").unwrap();

        assert_eq!(alloc.decode(Ino(48), &catalog), Some((row(3), None)));
        assert_eq!(alloc.decode(Ino(50), &catalog), Some((row(3), Some(fuga))));
        // Offset 3 has no field in a two-field catalog.
        assert_eq!(alloc.decode(Ino(51), &catalog), None);
        assert_eq!(alloc.decode(Ino::ROOT, &catalog), None);
    }

    #[test]
    fn serde_rejects_invalid_base() {
        assert!(serde_json::from_str::<InodeBase>("1").is_err());
        let base: InodeBase = serde_json::from_str("32").unwrap();
        assert_eq!(base.get(), 32);
    }

    proptest! {
        #[test]
        fn data_never_collides_with_any_group(
            r1 in 1u64..1_000_000,
            r2 in 1u64..1_000_000,
            idx in 1u64..16,
        ) {
            let names: Vec<String> = (0..15).map(|i| format!("f{i}")).collect();
            let catalog = FieldCatalog::with_default_base(names).unwrap();
            let alloc = catalog.allocator();
            let field = catalog.field_at(idx).unwrap();

            let data = alloc.data_ino(row(r1), field).unwrap();
            let group = alloc.group_ino(row(r2)).unwrap();
            prop_assert_ne!(data, group);
        }

        #[test]
        fn data_inodes_are_unique(
            r1 in 1u64..1_000_000,
            r2 in 1u64..1_000_000,
            i in 1u64..16,
            j in 1u64..16,
        ) {
            prop_assume!((r1, i) != (r2, j));
            let names: Vec<String> = (0..15).map(|k| format!("f{k}")).collect();
            let catalog = FieldCatalog::with_default_base(names).unwrap();
            let alloc = catalog.allocator();

            let a = alloc.data_ino(row(r1), catalog.field_at(i).unwrap()).unwrap();
            let b = alloc.data_ino(row(r2), catalog.field_at(j).unwrap()).unwrap();
            prop_assert_ne!(a, b);
        }

        #[test]
        fn groups_are_unique(r1 in 1u64..1_000_000, r2 in 1u64..1_000_000, base in 2u64..1024) {
            prop_assume!(r1 != r2);
            let alloc = InodeAllocator::new(InodeBase::new(base).unwrap());
            prop_assert_ne!(alloc.group_ino(row(r1)).unwrap(), alloc.group_ino(row(r2)).unwrap());
        }

        #[test]
        fn decode_roundtrips(r in 1u64..1_000_000, idx in 0u64..16) {
            let names: Vec<String> = (0..15).map(|k| format!("f{k}")).collect();
            let catalog = FieldCatalog::with_default_base(names).unwrap();
            let alloc = catalog.allocator();
            let field = catalog.field_at(idx);
            let ino = match field {
                Some(f) => alloc.data_ino(row(r), f).unwrap(),
                None => alloc.group_ino(row(r)).unwrap(),
            };
            prop_assert_eq!(alloc.decode(ino, &catalog), Some((row(r), field)));
        }
    }
}
