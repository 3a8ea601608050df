//! Filesystem port.
//!
//! The resolver only needs four primitives: `stat`, `lstat`, `read_dir` and
//! `open`. [`OsFs`] backs them with `tokio::fs`; [`MemoryFs`] is an in-memory
//! tree for deterministic tests. Every method returns [`std::io::Result`], and
//! absence is signalled by an error for which [`is_not_found`] is `true`.

use std::future::Future;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use tokio::io::AsyncRead;

pub mod memory;

pub use memory::MemoryFs;

/// A readable byte stream for a file's contents.
pub type FileStream = Box<dyn AsyncRead + Send + Unpin>;

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Only reported by [`FileSystem::lstat`].
    Symlink,
}

/// The subset of file metadata the resolver consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub kind: EntryKind,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

impl From<std::fs::Metadata> for Metadata {
    fn from(meta: std::fs::Metadata) -> Self {
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Self {
            kind,
            len: meta.len(),
            modified: meta.modified().ok(),
        }
    }
}

/// Returns `true` for the errors that mean "nothing there".
///
/// Besides `NotFound` this covers `NotADirectory`, raised when a file is used
/// as an intermediate path component (`/about.html/index.html`).
pub fn is_not_found(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Asynchronous filesystem primitives.
///
/// Implementations must be shareable across tasks; each call is an
/// independent suspension point for the request that issued it.
pub trait FileSystem: Send + Sync + 'static {
    /// Metadata for `path`, following symbolic links.
    fn stat(&self, path: &Path) -> impl Future<Output = io::Result<Metadata>> + Send;

    /// Metadata for `path` itself; a symbolic link reports [`EntryKind::Symlink`].
    fn lstat(&self, path: &Path) -> impl Future<Output = io::Result<Metadata>> + Send;

    /// Names of the immediate children of the directory at `path`.
    fn read_dir(&self, path: &Path) -> impl Future<Output = io::Result<Vec<String>>> + Send;

    /// Opens the file at `path` for streaming.
    fn open(&self, path: &Path) -> impl Future<Output = io::Result<FileStream>> + Send;
}

/// The real filesystem via `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    async fn stat(&self, path: &Path) -> io::Result<Metadata> {
        tokio::fs::metadata(path).await.map(Metadata::from)
    }

    async fn lstat(&self, path: &Path) -> io::Result<Metadata> {
        tokio::fs::symlink_metadata(path).await.map(Metadata::from)
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn open(&self, path: &Path) -> io::Result<FileStream> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn os_stat_and_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let fs = OsFs;
        let meta = fs.stat(&dir.path().join("a.txt")).await.unwrap();
        assert!(meta.is_file());
        assert_eq!(meta.len, 5);
        assert!(meta.modified.is_some());

        assert!(fs.stat(&dir.path().join("sub")).await.unwrap().is_dir());

        let mut names = fs.read_dir(dir.path()).await.unwrap();
        names.sort();
        assert_eq!(names, vec!["a.txt", "sub"]);
    }

    #[tokio::test]
    async fn os_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = OsFs.stat(&dir.path().join("nope")).await.unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn os_file_as_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), b"x").unwrap();
        let err = OsFs
            .stat(&dir.path().join("page.html").join("index.html"))
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn os_open_streams_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let mut stream = OsFs.open(&dir.path().join("a.txt")).await.unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn os_lstat_reports_symlink() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("target.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link.txt"))
            .unwrap();

        let link = dir.path().join("link.txt");
        assert!(OsFs.lstat(&link).await.unwrap().is_symlink());
        assert!(OsFs.stat(&link).await.unwrap().is_file());
    }
}
