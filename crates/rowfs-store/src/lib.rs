//! Backing-table access for rowfs.
//!
//! The table has one row per group, a unique `name` key, a positive `id`,
//! and one column per configured field. Every operation is a single,
//! independent statement: nothing here spans a transaction, and nothing
//! here caches.
//!
//! # Backends
//!
//! All backends implement the [`DataStore`] trait:
//!
//! - [`InMemoryDataStore`] -- `BTreeMap`-based table for tests and embedding
//! - [`SqlDataStore`] -- composes SQL [`Statement`]s and hands them to an
//!   external driver through [`SqlExecutor`]
//!
//! # Design Rules
//!
//! 1. Fields are addressed by [`rowfs_types::FieldId`], never by string.
//!    A column name reaches SQL text only via `FieldCatalog::column`.
//! 2. Group names always travel as bound parameters.
//! 3. Reads serialize the stored value to JSON text; writes persist the
//!    caller's bytes verbatim as a full replace.
//! 4. Zero matching rows is `Ok(None)`, not an error. So is more than one:
//!    an ambiguous name is treated as not found.

pub mod error;
pub mod group;
pub mod memory;
pub mod sql;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use group::{DataEntry, Group};
pub use memory::InMemoryDataStore;
pub use sql::{Queries, SqlDataStore, SqlError, SqlExecutor, SqlParam, SqlRow, SqlValue, Statement};
pub use traits::DataStore;
