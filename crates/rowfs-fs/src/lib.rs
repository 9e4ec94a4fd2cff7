//! Filesystem projection for rowfs.
//!
//! Turns namespace requests (look up, enumerate, stat, open, read, write,
//! release) into [`rowfs_store::DataStore`] operations. The namespace is
//! exactly two levels deep:
//!
//! ```text
//! /                 root
//! /<group>/         one directory per table row
//! /<group>/<field>  one file per catalog field; content is the value as JSON
//! ```
//!
//! The kernel transport is not part of this crate. A protocol binding
//! drives [`TableFs`] with [`NodeId`]s and [`FileHandle`]s and maps
//! [`FsError::errno`] back onto its replies.

pub mod adapter;
pub mod attr;
pub mod error;
pub mod namespace;
pub mod resolver;
pub mod session;

pub use adapter::TableFs;
pub use attr::{DirEntry, FileAttr, FileKind, SetAttr};
pub use error::{FsError, FsResult};
pub use namespace::{Namespace, Node, NodeId};
pub use resolver::AddressResolver;
pub use session::{FileHandle, FileSession, FlushOutcome, SessionState, SessionTable};
