//! Namespace verbs over a [`DataStore`].
//!
//! [`TableFs`] is what a protocol binding calls. Entries are classified
//! once, at lookup, and the resulting [`Address`] is kept on the node (and
//! on any session opened from it); later calls read it back instead of
//! re-walking the tree. Every inode it reports comes from the catalog's
//! [`InodeAllocator`], so lookup, readdir and getattr always agree.

use std::sync::{Arc, RwLock};

use rowfs_store::DataStore;
use rowfs_types::{Address, FieldCatalog, FieldId, Ino, InodeAllocator};
use tracing::{debug, info};

use crate::attr::{DirEntry, FileAttr, FileKind, SetAttr};
use crate::error::{FsError, FsResult};
use crate::namespace::{Namespace, NodeId};
use crate::resolver::AddressResolver;
use crate::session::{FileHandle, FlushOutcome, SessionTable};

/// The filesystem projection of one backing table.
pub struct TableFs<S> {
    store: S,
    resolver: AddressResolver,
    allocator: InodeAllocator,
    namespace: RwLock<Namespace>,
    sessions: SessionTable,
}

impl<S: DataStore> TableFs<S> {
    pub fn new(store: S) -> Self {
        let catalog = Arc::new(store.catalog().clone());
        let allocator = catalog.allocator();
        info!(
            fields = catalog.len(),
            base = catalog.base().get(),
            "table filesystem ready"
        );
        Self {
            store,
            resolver: AddressResolver::new(catalog),
            allocator,
            namespace: RwLock::new(Namespace::new()),
            sessions: SessionTable::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &FieldCatalog {
        self.resolver.catalog()
    }

    /// Number of sessions not yet released.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// The node last reported under `ino`, if the namespace still holds it.
    pub fn node_for_ino(&self, ino: Ino) -> Option<NodeId> {
        self.namespace.read().expect("lock poisoned").by_ino(ino)
    }

    /// The address stored on `node`.
    pub fn address(&self, node: NodeId) -> FsResult<Address> {
        let ns = self.namespace.read().expect("lock poisoned");
        Ok(ns.node(node)?.address().clone())
    }

    // ---------------------------------------------------------------
    // Namespace verbs
    // ---------------------------------------------------------------

    /// Resolve `name` beneath `parent` and remember the result.
    pub fn lookup(&self, parent: NodeId, name: &str) -> FsResult<(NodeId, FileAttr)> {
        let address = {
            let ns = self.namespace.read().expect("lock poisoned");
            self.resolver.classify(&ns, parent, Some(name))?
        };
        if address == Address::Root {
            return Err(FsError::NotFound(String::new()));
        }

        let attr = self.attributes(&address)?;
        let node = self
            .namespace
            .write()
            .expect("lock poisoned")
            .insert_child(parent, name, address, attr.ino)?;
        debug!(parent = parent.index(), name, ino = %attr.ino, "lookup");
        Ok((node, attr))
    }

    /// Current attributes of `node`, fetched fresh from the store.
    pub fn getattr(&self, node: NodeId) -> FsResult<FileAttr> {
        let address = self.address(node)?;
        self.attributes(&address)
    }

    /// Accepted as a no-op; returns the unchanged attributes.
    pub fn setattr(&self, node: NodeId, changes: &SetAttr) -> FsResult<FileAttr> {
        debug!(node = node.index(), ?changes, "setattr ignored");
        self.getattr(node)
    }

    /// Children of a directory: groups under the root, fields under a group.
    pub fn readdir(&self, node: NodeId) -> FsResult<Vec<DirEntry>> {
        match self.address(node)? {
            Address::Root => {
                let groups = self.store.list_groups()?;
                debug!(count = groups.len(), "readdir root");
                groups
                    .into_iter()
                    .map(|g| {
                        Ok(DirEntry {
                            ino: self.allocator.group_ino(g.row_id)?,
                            name: g.name,
                            kind: FileKind::Directory,
                        })
                    })
                    .collect()
            }
            Address::Group { name } => {
                let fields = self.store.list_fields(&name)?;
                debug!(group = %name, count = fields.len(), "readdir group");
                fields
                    .into_iter()
                    .map(|f| {
                        Ok(DirEntry {
                            ino: self.allocator.data_ino(f.row_id, f.field)?,
                            name: f.name,
                            kind: FileKind::RegularFile,
                        })
                    })
                    .collect()
            }
            Address::Data { .. } => Err(FsError::Unsupported(
                "readdir on a data object".into(),
            )),
        }
    }

    /// Open a data object for reading and writing.
    pub fn open(&self, node: NodeId) -> FsResult<FileHandle> {
        let (group, field) = data_address(self.address(node)?, "open")?;
        let fh = self.sessions.open(&group, field);
        debug!(fh = fh.get(), group = %group, field = field.index(), "open");
        Ok(fh)
    }

    /// Read `size` bytes at `offset` from the current stored value.
    ///
    /// Always re-fetches: a value persisted by another, already released
    /// session is visible immediately.
    pub fn read(&self, fh: FileHandle, offset: u64, size: u32) -> FsResult<Vec<u8>> {
        let (group, field) = {
            let session = self.sessions.get(fh)?;
            let session = session.lock().expect("lock poisoned");
            (session.group().to_string(), session.field())
        };
        let content = self.fetch(&group, field)?;

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(content.len());
        let end = start.saturating_add(size as usize).min(content.len());
        debug!(fh = fh.get(), offset, size, returned = end - start, "read");
        Ok(content[start..end].to_vec())
    }

    /// Buffer `data` in the session; nothing reaches the store yet.
    pub fn write(&self, fh: FileHandle, offset: u64, data: &[u8]) -> FsResult<u32> {
        let session = self.sessions.get(fh)?;
        let written = session.lock().expect("lock poisoned").write(offset, data)?;
        debug!(fh = fh.get(), offset, len = data.len(), "write");
        Ok(written as u32)
    }

    /// No-op: content becomes durable only on release.
    pub fn fsync(&self, fh: FileHandle) -> FsResult<()> {
        let session = self.sessions.get(fh)?;
        let result = session.lock().expect("lock poisoned").fsync();
        result
    }

    /// Close-time flush from the kernel. A no-op: a descriptor may be
    /// duplicated, and the field is persisted once, at release.
    pub fn flush(&self, fh: FileHandle) -> FsResult<()> {
        self.sessions.get(fh).map(|_| ())
    }

    /// End the session, persisting its buffer if anything was written.
    pub fn release(&self, fh: FileHandle) -> FsResult<FlushOutcome> {
        let session = self.sessions.remove(fh)?;
        let outcome = session.lock().expect("lock poisoned").release(&self.store)?;
        debug!(fh = fh.get(), ?outcome, "release");
        Ok(outcome)
    }

    /// Create a group. Only valid directly beneath the root.
    pub fn mkdir(&self, parent: NodeId, name: &str) -> FsResult<(NodeId, FileAttr)> {
        match self.address(parent)? {
            Address::Root => {}
            other => {
                return Err(FsError::Unsupported(format!(
                    "mkdir beneath {} address",
                    other.kind()
                )))
            }
        }
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(FsError::Unsupported(format!("invalid group name {name:?}")));
        }

        let group = self.store.create_group(name)?;
        let ino = self.allocator.group_ino(group.row_id)?;
        let node = self
            .namespace
            .write()
            .expect("lock poisoned")
            .insert_child(parent, name, Address::group(name), ino)?;
        info!(group = name, row = %group.row_id, %ino, "group created");
        Ok((node, FileAttr::directory(ino)))
    }

    /// Drop a node the protocol layer no longer references.
    pub fn forget(&self, node: NodeId) -> bool {
        self.namespace.write().expect("lock poisoned").forget(node)
    }

    /// Walk a slash-separated path from the root with `lookup`.
    pub fn resolve_path(&self, path: &str) -> FsResult<NodeId> {
        path.split('/')
            .filter(|part| !part.is_empty())
            .try_fold(NodeId::ROOT, |node, part| Ok(self.lookup(node, part)?.0))
    }

    /// Attributes of the entry at `path`.
    pub fn stat_path(&self, path: &str) -> FsResult<FileAttr> {
        let node = self.resolve_path(path)?;
        self.getattr(node)
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn attributes(&self, address: &Address) -> FsResult<FileAttr> {
        match address {
            Address::Root => Ok(FileAttr::directory(Ino::ROOT)),
            Address::Group { name } => {
                let group = self
                    .store
                    .get_group(name)?
                    .ok_or_else(|| FsError::NotFound(name.clone()))?;
                Ok(FileAttr::directory(self.allocator.group_ino(group.row_id)?))
            }
            Address::Data { group, field } => {
                let row = self
                    .store
                    .get_group(group)?
                    .ok_or_else(|| FsError::NotFound(group.clone()))?;
                let content = self.fetch(group, *field)?;
                let ino = self.allocator.data_ino(row.row_id, *field)?;
                Ok(FileAttr::file(ino, content.len() as u64))
            }
        }
    }

    fn fetch(&self, group: &str, field: FieldId) -> FsResult<Vec<u8>> {
        self.store
            .get_field(group, field)?
            .ok_or_else(|| FsError::NotFound(format!("{group}/#{}", field.index())))
    }
}

fn data_address(address: Address, verb: &str) -> FsResult<(String, FieldId)> {
    match address {
        Address::Data { group, field } => Ok((group, field)),
        other => Err(FsError::Unsupported(format!(
            "{verb} on {} address",
            other.kind()
        ))),
    }
}

impl<S> std::fmt::Debug for TableFs<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableFs")
            .field("fields", &self.resolver.catalog().len())
            .field("open_sessions", &self.sessions.len())
            .finish()
    }
}
