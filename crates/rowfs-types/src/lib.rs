//! Foundation types for rowfs.
//!
//! rowfs projects the rows of a relational table as a two-level directory
//! tree: one directory per row ("group"), one file per configured column
//! ("data object"). This crate holds the pieces every other rowfs crate
//! shares.
//!
//! # Key Types
//!
//! - [`Ident`]: validated SQL identifier, the only string ever placed in a
//!   query's identifier position
//! - [`FieldCatalog`]: the immutable, ordered list of exposed columns
//! - [`FieldId`]: 1-based catalog position, obtainable only from a catalog
//! - [`InodeAllocator`]: deterministic `(row, field) -> inode` mapping
//! - [`Address`]: what a namespace position means: root, group, or data

pub mod address;
pub mod catalog;
pub mod error;
pub mod ident;
pub mod inode;

pub use address::{Address, AddressKind};
pub use catalog::{FieldCatalog, FieldId};
pub use error::{TypeError, TypeResult};
pub use ident::Ident;
pub use inode::{Ino, InodeAllocator, InodeBase, RowId};
