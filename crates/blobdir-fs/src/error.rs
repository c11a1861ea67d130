use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The primitive operation that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FsOp {
    Read,
    Write,
    Copy,
    Rename,
    Remove,
    Stat,
    SetModified,
    ListDir,
}

impl FsOp {
    /// Returns `true` for operations that change the filesystem.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Write | Self::Copy | Self::Rename | Self::Remove | Self::SetModified
        )
    }
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Copy => write!(f, "copy"),
            Self::Rename => write!(f, "rename"),
            Self::Remove => write!(f, "remove"),
            Self::Stat => write!(f, "stat"),
            Self::SetModified => write!(f, "set-modified"),
            Self::ListDir => write!(f, "list-dir"),
        }
    }
}

/// Errors from filesystem primitives.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The path does not exist.
    #[error("{op} {}: not found", path.display())]
    NotFound { op: FsOp, path: PathBuf },

    /// The path exists but the operation needs it absent.
    #[error("{op} {}: already exists", path.display())]
    AlreadyExists { op: FsOp, path: PathBuf },

    /// I/O error from the underlying storage.
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: FsOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A failure injected by a test backend.
    #[error("{op} {}: injected failure", path.display())]
    Injected { op: FsOp, path: PathBuf },
}

impl FsError {
    /// Wrap an `io::Error`, mapping `NotFound` to the dedicated variant.
    pub fn io(op: FsOp, path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                op,
                path: path.to_path_buf(),
            },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                op,
                path: path.to_path_buf(),
            },
            _ => Self::Io {
                op,
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// The operation that failed.
    pub fn op(&self) -> FsOp {
        match self {
            Self::NotFound { op, .. }
            | Self::AlreadyExists { op, .. }
            | Self::Io { op, .. }
            | Self::Injected { op, .. } => *op,
        }
    }

    /// The path the operation was applied to.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path, .. }
            | Self::AlreadyExists { path, .. }
            | Self::Io { path, .. }
            | Self::Injected { path, .. } => path,
        }
    }
}

/// Result alias for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;
