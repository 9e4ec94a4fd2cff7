//! Per-open-file write sessions.
//!
//! ```text
//!   open() ──> Open ──write(n>0)──> Accumulating ──release()──> Released
//!               │                        │  ▲
//!               └───────release()────────┼──┘ write
//!                                        └─ flush(): put_field if dirty
//! ```
//!
//! Writes only touch the in-memory buffer. The field is persisted with a
//! single `put_field` of the whole buffer when the session is released (or
//! when [`FileSession::flush`] is called explicitly). A session that never
//! saw a byte never touches the store. `fsync` is a no-op: nothing is
//! durable before release.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bytes::BytesMut;
use rowfs_store::DataStore;
use rowfs_types::{Address, FieldId};
use tracing::debug;

use crate::error::{FsError, FsResult};

/// Kernel-visible handle of an open file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle(u64);

impl FileHandle {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for FileHandle {
    fn from(fh: u64) -> Self {
        Self(fh)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing written.
    Open,
    /// At least one non-empty write applied.
    Accumulating,
    /// Terminal.
    Released,
}

/// What a flush did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing new was written; the store was not touched.
    Clean,
    /// One `put_field` carried this many bytes.
    Persisted { bytes: usize },
}

/// Write accumulator for one open data object.
#[derive(Debug)]
pub struct FileSession {
    handle: FileHandle,
    group: String,
    field: FieldId,
    state: SessionState,
    buffer: BytesMut,
    dirty: bool,
}

impl FileSession {
    pub fn new(handle: FileHandle, group: impl Into<String>, field: FieldId) -> Self {
        Self {
            handle,
            group: group.into(),
            field,
            state: SessionState::Open,
            buffer: BytesMut::new(),
            dirty: false,
        }
    }

    pub fn handle(&self) -> FileHandle {
        self.handle
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn field(&self) -> FieldId {
        self.field
    }

    pub fn address(&self) -> Address {
        Address::data(self.group.clone(), self.field)
    }

    /// Buffered bytes so far.
    pub fn contents(&self) -> &[u8] {
        &self.buffer
    }

    /// `true` if bytes were written since the last flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Append `data` to the buffer.
    ///
    /// The buffer only grows at its end; `offset` is not used to overwrite
    /// earlier bytes. Returns the number of bytes accepted.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> FsResult<usize> {
        self.ensure_live()?;
        if offset != self.buffer.len() as u64 {
            debug!(
                fh = self.handle.0,
                offset,
                buffered = self.buffer.len(),
                "non-sequential write appended at end"
            );
        }
        if data.is_empty() {
            return Ok(0);
        }
        self.buffer.extend_from_slice(data);
        self.dirty = true;
        self.state = SessionState::Accumulating;
        Ok(data.len())
    }

    /// Accepted and ignored: content becomes durable only on release.
    pub fn fsync(&self) -> FsResult<()> {
        self.ensure_live()
    }

    /// Persist the buffer if anything was written since the last flush.
    pub fn flush<S: DataStore + ?Sized>(&mut self, store: &S) -> FsResult<FlushOutcome> {
        self.ensure_live()?;
        if !self.dirty {
            return Ok(FlushOutcome::Clean);
        }
        store.put_field(&self.group, self.field, &self.buffer)?;
        self.dirty = false;
        debug!(
            fh = self.handle.0,
            group = %self.group,
            field = self.field.index(),
            bytes = self.buffer.len(),
            "session flushed"
        );
        Ok(FlushOutcome::Persisted {
            bytes: self.buffer.len(),
        })
    }

    /// Flush, then end the session. The session is released even when the
    /// flush fails; the error is returned to the closer.
    pub fn release<S: DataStore + ?Sized>(&mut self, store: &S) -> FsResult<FlushOutcome> {
        let outcome = self.flush(store);
        self.state = SessionState::Released;
        self.buffer.clear();
        self.dirty = false;
        outcome
    }

    fn ensure_live(&self) -> FsResult<()> {
        if self.state == SessionState::Released {
            return Err(FsError::BadHandle(self.handle.0));
        }
        Ok(())
    }
}

/// Open sessions by handle.
///
/// Each session has its own lock, so requests on distinct handles never
/// wait on each other. Two handles on the same field are independent; the
/// later release wins.
#[derive(Debug)]
pub struct SessionTable {
    next: AtomicU64,
    sessions: RwLock<HashMap<FileHandle, Arc<Mutex<FileSession>>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session on one field of one group.
    pub fn open(&self, group: &str, field: FieldId) -> FileHandle {
        let handle = FileHandle(self.next.fetch_add(1, Ordering::SeqCst));
        let session = FileSession::new(handle, group, field);
        self.sessions
            .write()
            .expect("lock poisoned")
            .insert(handle, Arc::new(Mutex::new(session)));
        handle
    }

    pub fn get(&self, handle: FileHandle) -> FsResult<Arc<Mutex<FileSession>>> {
        self.sessions
            .read()
            .expect("lock poisoned")
            .get(&handle)
            .cloned()
            .ok_or(FsError::BadHandle(handle.0))
    }

    /// Detach a session from the table; the caller releases it.
    pub fn remove(&self, handle: FileHandle) -> FsResult<Arc<Mutex<FileSession>>> {
        self.sessions
            .write()
            .expect("lock poisoned")
            .remove(&handle)
            .ok_or(FsError::BadHandle(handle.0))
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().expect("lock poisoned").is_empty()
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}
