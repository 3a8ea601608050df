//! In-memory [`FileSystem`] for tests.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::{EntryKind, FileStream, FileSystem, Metadata};

#[derive(Debug, Clone)]
enum Node {
    File { contents: Arc<[u8]>, modified: SystemTime },
    Directory,
    Symlink(PathBuf),
    // Any access fails with this error kind.
    Failing(io::ErrorKind),
}

/// A fixed tree of files and directories held in memory.
///
/// Parent directories are created implicitly. Modification times are fixed so
/// that `Last-Modified` headers are deterministic.
///
/// # Examples
///
/// ```
/// use rserve::fs::{FileSystem, MemoryFs};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fs = MemoryFs::new()
///     .file("/srv/index.html", "<h1>hi</h1>")
///     .dir("/srv/empty");
///
/// assert!(fs.stat(Path::new("/srv")).await.unwrap().is_dir());
/// assert_eq!(fs.read_dir(Path::new("/srv")).await.unwrap(), ["empty", "index.html"]);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    nodes: BTreeMap<PathBuf, Node>,
}

/// Modification time given to every file: 2024-01-01T00:00:00Z.
pub const FIXED_MTIME_SECS: u64 = 1_704_067_200;

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file (and its parent directories).
    #[must_use]
    pub fn file(mut self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(FIXED_MTIME_SECS);
        self.insert(
            path.as_ref(),
            Node::File {
                contents: Arc::from(contents.as_ref()),
                modified,
            },
        );
        self
    }

    /// Adds a directory (and its parents).
    #[must_use]
    pub fn dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), Node::Directory);
        self
    }

    /// Adds a symbolic link at `path` pointing to the absolute `target`.
    #[must_use]
    pub fn symlink(mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), Node::Symlink(target.as_ref().to_owned()));
        self
    }

    /// Makes every access to `path` fail with `kind`.
    #[must_use]
    pub fn failing(mut self, path: impl AsRef<Path>, kind: io::ErrorKind) -> Self {
        self.insert(path.as_ref(), Node::Failing(kind));
        self
    }

    fn insert(&mut self, path: &Path, node: Node) {
        for ancestor in path.ancestors().skip(1) {
            self.nodes
                .entry(ancestor.to_owned())
                .or_insert(Node::Directory);
        }
        self.nodes.insert(path.to_owned(), node);
    }

    // Looks a path up without following a final symlink.
    fn lookup(&self, path: &Path) -> io::Result<&Node> {
        if let Some(node) = self.nodes.get(path) {
            return match node {
                Node::Failing(kind) => Err(io::Error::from(*kind)),
                node => Ok(node),
            };
        }

        let under_file = path.ancestors().skip(1).any(|ancestor| {
            matches!(self.nodes.get(ancestor), Some(Node::File { .. }))
        });
        if under_file {
            Err(io::Error::from(io::ErrorKind::NotADirectory))
        } else {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn resolve(&self, path: &Path) -> io::Result<&Node> {
        let mut node = self.lookup(path)?;
        // Bounded to avoid cycles between links.
        for _ in 0..16 {
            match node {
                Node::Symlink(target) => node = self.lookup(target)?,
                other => return Ok(other),
            }
        }
        Err(io::Error::other("too many levels of symbolic links"))
    }

    fn metadata(node: &Node) -> Metadata {
        match node {
            Node::File { contents, modified } => Metadata {
                kind: EntryKind::File,
                len: contents.len() as u64,
                modified: Some(*modified),
            },
            Node::Directory => Metadata {
                kind: EntryKind::Directory,
                len: 0,
                modified: None,
            },
            Node::Symlink(_) | Node::Failing(_) => Metadata {
                kind: EntryKind::Symlink,
                len: 0,
                modified: None,
            },
        }
    }
}

impl FileSystem for MemoryFs {
    async fn stat(&self, path: &Path) -> io::Result<Metadata> {
        self.resolve(path).map(Self::metadata)
    }

    async fn lstat(&self, path: &Path) -> io::Result<Metadata> {
        self.lookup(path).map(Self::metadata)
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        match self.resolve(path)? {
            Node::Directory => {}
            _ => return Err(io::Error::from(io::ErrorKind::NotADirectory)),
        }
        Ok(self
            .nodes
            .keys()
            .filter(|child| child.parent() == Some(path))
            .filter_map(|child| child.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    async fn open(&self, path: &Path) -> io::Result<FileStream> {
        match self.resolve(path)? {
            Node::File { contents, .. } => Ok(Box::new(io::Cursor::new(contents.to_vec()))),
            _ => Err(io::Error::other("not a file")),
        }
    }
}
