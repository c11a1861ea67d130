use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use blobdir_types::Version;

use crate::error::{FsError, FsOp, FsResult};
use crate::traits::{DirEntryInfo, FileSystem};

/// Modification time of the first write on a fresh in-memory filesystem.
const CLOCK_START: Version = 1_700_000_000_000;

#[derive(Clone, Debug)]
enum Node {
    File { data: Vec<u8>, modified: Version },
    Dir,
}

/// A recorded primitive call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsCall {
    pub op: FsOp,
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
struct Fault {
    op: FsOp,
    path: PathBuf,
    prefix: bool,
}

impl Fault {
    fn matches(&self, op: FsOp, path: &Path) -> bool {
        self.op == op
            && if self.prefix {
                path.starts_with(&self.path)
            } else {
                path == self.path
            }
    }
}

/// In-memory filesystem tree.
///
/// Intended for tests and embedding. Every primitive call is appended to a
/// journal, and individual calls can be made to fail with
/// [`fail_on`](Self::fail_on) / [`fail_under`](Self::fail_under). Copies and
/// renames are matched against their target path. Modification times come
/// from a logical clock that advances by one second per write.
pub struct InMemoryFileSystem {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    clock: AtomicU64,
    journal: Mutex<Vec<FsCall>>,
    faults: Mutex<Vec<Fault>>,
}

impl InMemoryFileSystem {
    /// Create an empty filesystem with only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir);
        Self {
            nodes: RwLock::new(nodes),
            clock: AtomicU64::new(CLOCK_START),
            journal: Mutex::new(Vec::new()),
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Create a filesystem with the given directories in place.
    pub fn with_dirs<P: AsRef<Path>>(dirs: &[P]) -> Self {
        let fs = Self::new();
        for dir in dirs {
            fs.create_dir_all(dir.as_ref());
        }
        fs
    }

    /// Create `dir` and all of its ancestors.
    pub fn create_dir_all(&self, dir: &Path) {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
    }

    /// Place a file directly, bypassing the journal and faults.
    pub fn insert_file(&self, path: &Path, data: &[u8], modified: Version) {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: data.to_vec(),
                modified,
            },
        );
    }

    /// Overwrite the modification time of an existing file.
    pub fn touch(&self, path: &Path, modified: Version) {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        if let Some(Node::File { modified: m, .. }) = nodes.get_mut(path) {
            *m = modified;
        }
    }

    /// Current content of a file, without journaling.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        let nodes = self.nodes.read().expect("lock poisoned");
        match nodes.get(path) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Names of the files directly inside `dir`, without journaling.
    pub fn file_names(&self, dir: &Path) -> Vec<String> {
        let nodes = self.nodes.read().expect("lock poisoned");
        nodes
            .iter()
            .filter(|(p, n)| p.parent() == Some(dir) && matches!(n, Node::File { .. }))
            .filter_map(|(p, _)| p.file_name().map(|s| s.to_string_lossy().into_owned()))
            .collect()
    }

    /// Make every `op` on exactly `path` fail.
    pub fn fail_on(&self, op: FsOp, path: impl Into<PathBuf>) {
        self.faults.lock().expect("lock poisoned").push(Fault {
            op,
            path: path.into(),
            prefix: false,
        });
    }

    /// Make every `op` on any path under `dir` fail.
    pub fn fail_under(&self, op: FsOp, dir: impl Into<PathBuf>) {
        self.faults.lock().expect("lock poisoned").push(Fault {
            op,
            path: dir.into(),
            prefix: true,
        });
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        self.faults.lock().expect("lock poisoned").clear();
    }

    /// Every primitive call so far, in order.
    pub fn calls(&self) -> Vec<FsCall> {
        self.journal.lock().expect("lock poisoned").clone()
    }

    /// Calls that would have changed the filesystem, in order.
    pub fn mutations(&self) -> Vec<FsCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.op.is_mutation())
            .collect()
    }

    /// Calls of the given kind, in order.
    pub fn calls_of(&self, op: FsOp) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter(|c| c.op == op)
            .map(|c| c.path)
            .collect()
    }

    /// Forget all recorded calls.
    pub fn clear_journal(&self) {
        self.journal.lock().expect("lock poisoned").clear();
    }

    fn record(&self, op: FsOp, path: &Path) -> FsResult<()> {
        self.journal.lock().expect("lock poisoned").push(FsCall {
            op,
            path: path.to_path_buf(),
        });
        let faults = self.faults.lock().expect("lock poisoned");
        if faults.iter().any(|f| f.matches(op, path)) {
            return Err(FsError::Injected {
                op,
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn tick(&self) -> Version {
        self.clock.fetch_add(1_000, Ordering::SeqCst) + 1_000
    }

    fn parent_is_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
        path.parent()
            .is_some_and(|p| matches!(nodes.get(p), Some(Node::Dir)))
    }
}

impl Default for InMemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for InMemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.nodes.read().expect("lock poisoned").contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.nodes.read().expect("lock poisoned").get(path),
            Some(Node::Dir)
        )
    }

    fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
        self.record(FsOp::Read, path)?;
        self.contents(path).ok_or_else(|| FsError::NotFound {
            op: FsOp::Read,
            path: path.to_path_buf(),
        })
    }

    fn write(&self, path: &Path, content: &[u8]) -> FsResult<()> {
        self.record(FsOp::Write, path)?;
        let modified = self.tick();
        let mut nodes = self.nodes.write().expect("lock poisoned");
        if !Self::parent_is_dir(&nodes, path) || matches!(nodes.get(path), Some(Node::Dir)) {
            return Err(FsError::NotFound {
                op: FsOp::Write,
                path: path.to_path_buf(),
            });
        }
        nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: content.to_vec(),
                modified,
            },
        );
        Ok(())
    }

    fn copy_with_attributes(&self, from: &Path, to: &Path) -> FsResult<()> {
        self.record(FsOp::Copy, to)?;
        let mut nodes = self.nodes.write().expect("lock poisoned");
        let source = match nodes.get(from) {
            Some(node @ Node::File { .. }) => node.clone(),
            _ => {
                return Err(FsError::NotFound {
                    op: FsOp::Copy,
                    path: from.to_path_buf(),
                })
            }
        };
        if !Self::parent_is_dir(&nodes, to) {
            return Err(FsError::NotFound {
                op: FsOp::Copy,
                path: to.to_path_buf(),
            });
        }
        nodes.insert(to.to_path_buf(), source);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        self.record(FsOp::Rename, to)?;
        let mut nodes = self.nodes.write().expect("lock poisoned");
        if nodes.contains_key(to) {
            return Err(FsError::AlreadyExists {
                op: FsOp::Rename,
                path: to.to_path_buf(),
            });
        }
        if !Self::parent_is_dir(&nodes, to) {
            return Err(FsError::NotFound {
                op: FsOp::Rename,
                path: to.to_path_buf(),
            });
        }
        let node = nodes.remove(from).ok_or_else(|| FsError::NotFound {
            op: FsOp::Rename,
            path: from.to_path_buf(),
        })?;
        nodes.insert(to.to_path_buf(), node);
        Ok(())
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        self.record(FsOp::Remove, path)?;
        let mut nodes = self.nodes.write().expect("lock poisoned");
        match nodes.get(path) {
            Some(Node::File { .. }) => {
                nodes.remove(path);
                Ok(())
            }
            _ => Err(FsError::NotFound {
                op: FsOp::Remove,
                path: path.to_path_buf(),
            }),
        }
    }

    fn modified(&self, path: &Path) -> FsResult<Version> {
        self.record(FsOp::Stat, path)?;
        match self.nodes.read().expect("lock poisoned").get(path) {
            Some(Node::File { modified, .. }) => Ok(*modified),
            Some(Node::Dir) => Ok(CLOCK_START),
            None => Err(FsError::NotFound {
                op: FsOp::Stat,
                path: path.to_path_buf(),
            }),
        }
    }

    fn set_modified(&self, path: &Path, modified: Version) -> FsResult<()> {
        self.record(FsOp::SetModified, path)?;
        match self.nodes.write().expect("lock poisoned").get_mut(path) {
            Some(Node::File { modified: m, .. }) => {
                *m = modified;
                Ok(())
            }
            _ => Err(FsError::NotFound {
                op: FsOp::SetModified,
                path: path.to_path_buf(),
            }),
        }
    }

    // Lexical only; the tree has no links. Not journaled.
    fn canonicalize(&self, path: &Path) -> FsResult<PathBuf> {
        let mut resolved = PathBuf::from("/");
        for component in path.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        if self.nodes.read().expect("lock poisoned").contains_key(&resolved) {
            Ok(resolved)
        } else {
            Err(FsError::NotFound {
                op: FsOp::Stat,
                path: path.to_path_buf(),
            })
        }
    }

    fn list_dir(&self, dir: &Path) -> FsResult<Vec<DirEntryInfo>> {
        self.record(FsOp::ListDir, dir)?;
        let nodes = self.nodes.read().expect("lock poisoned");
        if !matches!(nodes.get(dir), Some(Node::Dir)) {
            return Err(FsError::NotFound {
                op: FsOp::ListDir,
                path: dir.to_path_buf(),
            });
        }
        Ok(nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(dir))
            .filter_map(|(p, node)| {
                let name = p.file_name()?.to_string_lossy().into_owned();
                let (len, modified) = match node {
                    Node::File { data, modified } => (data.len() as u64, *modified),
                    Node::Dir => (0, CLOCK_START),
                };
                Some(DirEntryInfo { name, len, modified })
            })
            .collect())
    }
}

impl std::fmt::Debug for InMemoryFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.nodes.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryFileSystem")
            .field("node_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs() -> InMemoryFileSystem {
        InMemoryFileSystem::with_dirs(&["/store", "/backup"])
    }

    #[test]
    fn write_and_read() {
        let fs = fs();
        let path = Path::new("/store/a.txt");
        fs.write(path, b"hello").unwrap();
        assert!(fs.exists(path));
        assert_eq!(fs.read(path).unwrap(), b"hello");
    }

    #[test]
    fn write_requires_parent_dir() {
        let fs = fs();
        assert!(fs.write(Path::new("/missing/a.txt"), b"x").is_err());
    }

    #[test]
    fn writes_advance_modification_time() {
        let fs = fs();
        let path = Path::new("/store/a.txt");
        fs.write(path, b"1").unwrap();
        let first = fs.modified(path).unwrap();
        fs.write(path, b"2").unwrap();
        assert!(fs.modified(path).unwrap() > first);
    }

    #[test]
    fn copy_keeps_modification_time() {
        let fs = fs();
        fs.insert_file(Path::new("/store/a.txt"), b"data", 42);
        fs.copy_with_attributes(Path::new("/store/a.txt"), Path::new("/backup/a.txt"))
            .unwrap();
        assert_eq!(fs.modified(Path::new("/backup/a.txt")).unwrap(), 42);
        assert_eq!(fs.contents(Path::new("/backup/a.txt")).unwrap(), b"data");
    }

    #[test]
    fn set_modified_changes_version_and_is_journaled() {
        let fs = fs();
        fs.insert_file(Path::new("/store/a.txt"), b"a", 1);
        fs.set_modified(Path::new("/store/a.txt"), 77).unwrap();
        assert_eq!(fs.modified(Path::new("/store/a.txt")).unwrap(), 77);
        assert_eq!(fs.calls_of(FsOp::SetModified), vec![PathBuf::from("/store/a.txt")]);
        assert!(fs.set_modified(Path::new("/store/ghost"), 1).is_err());
    }

    #[test]
    fn canonicalize_is_lexical() {
        let fs = fs();
        assert_eq!(
            fs.canonicalize(Path::new("/store/../store/./")).unwrap(),
            PathBuf::from("/store")
        );
        assert!(fs.canonicalize(Path::new("/store/../nowhere")).is_err());
    }

    #[test]
    fn rename_refuses_existing_target() {
        let fs = fs();
        fs.insert_file(Path::new("/store/a"), b"a", 1);
        fs.insert_file(Path::new("/store/b"), b"b", 1);
        let err = fs
            .rename(Path::new("/store/a"), Path::new("/store/b"))
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn injected_fault_fails_and_is_journaled() {
        let fs = fs();
        fs.fail_on(FsOp::Write, "/store/a.txt");
        let err = fs.write(Path::new("/store/a.txt"), b"x").unwrap_err();
        assert!(matches!(err, FsError::Injected { op: FsOp::Write, .. }));
        assert!(!fs.exists(Path::new("/store/a.txt")));
        assert_eq!(fs.calls_of(FsOp::Write), vec![PathBuf::from("/store/a.txt")]);
    }

    #[test]
    fn prefix_fault_matches_children() {
        let fs = fs();
        fs.insert_file(Path::new("/store/a"), b"a", 1);
        fs.fail_under(FsOp::Copy, "/backup");
        assert!(fs
            .copy_with_attributes(Path::new("/store/a"), Path::new("/backup/a_1"))
            .is_err());
        fs.clear_faults();
        assert!(fs
            .copy_with_attributes(Path::new("/store/a"), Path::new("/backup/a_1"))
            .is_ok());
    }

    #[test]
    fn list_dir_is_shallow() {
        let fs = fs();
        fs.insert_file(Path::new("/store/a"), b"a", 1);
        fs.insert_file(Path::new("/backup/b"), b"b", 1);
        let entries = fs.list_dir(Path::new("/store")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
        assert_eq!(entries[0].len, 1);
    }

    #[test]
    fn mutations_filter_reads() {
        let fs = fs();
        fs.insert_file(Path::new("/store/a"), b"a", 1);
        fs.read(Path::new("/store/a")).unwrap();
        fs.modified(Path::new("/store/a")).unwrap();
        assert!(fs.mutations().is_empty());
        fs.remove(Path::new("/store/a")).unwrap();
        assert_eq!(fs.mutations().len(), 1);
    }
}
