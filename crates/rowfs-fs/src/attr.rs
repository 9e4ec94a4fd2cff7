use rowfs_types::Ino;

/// Directory type bits.
pub const S_IFDIR: u32 = 0o040000;
/// Regular file type bits.
pub const S_IFREG: u32 = 0o100000;

/// Entry kind as shown to the kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Root and groups.
    Directory,
    /// Data objects.
    RegularFile,
}

impl FileKind {
    /// Permission bits: 0755 for directories, 0666 for files.
    pub fn perm(self) -> u16 {
        match self {
            Self::Directory => 0o755,
            Self::RegularFile => 0o666,
        }
    }

    pub fn type_bits(self) -> u32 {
        match self {
            Self::Directory => S_IFDIR,
            Self::RegularFile => S_IFREG,
        }
    }
}

/// Attributes of one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileAttr {
    pub ino: Ino,
    pub kind: FileKind,
    pub perm: u16,
    /// Byte length of the JSON content for files; 0 for directories.
    pub size: u64,
    pub nlink: u32,
}

impl FileAttr {
    pub fn directory(ino: Ino) -> Self {
        Self {
            ino,
            kind: FileKind::Directory,
            perm: FileKind::Directory.perm(),
            size: 0,
            nlink: 2,
        }
    }

    pub fn file(ino: Ino, size: u64) -> Self {
        Self {
            ino,
            kind: FileKind::RegularFile,
            perm: FileKind::RegularFile.perm(),
            size,
            nlink: 1,
        }
    }

    /// Full `st_mode`: type bits plus permission bits.
    pub fn mode(&self) -> u32 {
        self.kind.type_bits() | u32::from(self.perm)
    }
}

/// One directory listing entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: Ino,
    pub name: String,
    pub kind: FileKind,
}

/// Requested attribute changes. Accepted and ignored: nothing here is
/// persisted, and truncation is implied by the replace-on-release write
/// model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetAttr {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
}
