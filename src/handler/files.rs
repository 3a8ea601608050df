//! Extension and index-file fallback.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fs::{FileSystem, Metadata, is_not_found};

/// Extension tried first; on a miss the search repeats once with `.htm`.
pub const DEFAULT_EXTENSION: &str = ".html";
const FALLBACK_EXTENSION: &str = ".htm";

/// A file located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub path: PathBuf,
    pub metadata: Metadata,
}

/// Joins a request-relative path onto `root`.
pub(crate) fn join_root(root: &Path, relative: &str) -> PathBuf {
    root.join(relative.trim_start_matches('/'))
}

/// Stats `path`, hiding symbolic links as not found unless `follow_symlinks`.
pub(crate) async fn probe<F: FileSystem>(
    fs: &F,
    path: &Path,
    follow_symlinks: bool,
) -> io::Result<Metadata> {
    if follow_symlinks {
        return fs.stat(path).await;
    }
    let metadata = fs.lstat(path).await?;
    if metadata.is_symlink() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "symbolic links are not served",
        ));
    }
    Ok(metadata)
}

/// Finds the file a clean URL or rewrite refers to.
///
/// With a `rewritten` target, that target is the only candidate. Otherwise
/// `<relative>/index<ext>` and `<relative><ext>` are tried in order (a trailing
/// slash on `relative` is replaced by `<ext>`). Candidates are stat'd one by
/// one; the first that exists wins. If nothing is found with `.html`, the
/// search is repeated with `.htm`.
///
/// # Errors
///
/// Any stat error other than not-found is returned immediately.
pub async fn find_related<F: FileSystem>(
    fs: &F,
    root: &Path,
    relative: &str,
    rewritten: Option<&str>,
    extension: &str,
    follow_symlinks: bool,
) -> io::Result<Option<Found>> {
    let mut extension = extension;

    loop {
        let candidates = match rewritten {
            Some(target) => vec![target.to_owned()],
            None => possible_paths(relative, extension),
        };

        for candidate in candidates {
            let path = join_root(root, &candidate);
            match probe(fs, &path, follow_symlinks).await {
                Ok(metadata) => {
                    debug!(candidate = %candidate, "fallback candidate found");
                    return Ok(Some(Found { path, metadata }));
                }
                Err(e) if is_not_found(&e) => continue,
                Err(e) => return Err(e),
            }
        }

        if extension == DEFAULT_EXTENSION {
            extension = FALLBACK_EXTENSION;
        } else {
            return Ok(None);
        }
    }
}

fn possible_paths(relative: &str, extension: &str) -> Vec<String> {
    let index = format!("{}/index{extension}", relative.trim_end_matches('/'));
    let sibling = match relative.strip_suffix('/') {
        Some(stripped) => format!("{stripped}{extension}"),
        None => format!("{relative}{extension}"),
    };

    // `/` would otherwise produce a bare `.html` candidate.
    [index, sibling]
        .into_iter()
        .filter(|candidate| candidate.rsplit('/').next() != Some(extension))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    const ROOT: &str = "/srv";

    async fn find(fs: &MemoryFs, relative: &str, rewritten: Option<&str>) -> Option<PathBuf> {
        find_related(fs, Path::new(ROOT), relative, rewritten, DEFAULT_EXTENSION, false)
            .await
            .unwrap()
            .map(|found| found.path)
    }

    #[test]
    fn candidate_order() {
        assert_eq!(
            possible_paths("/about", ".html"),
            vec!["/about/index.html", "/about.html"]
        );
        assert_eq!(
            possible_paths("/docs/", ".html"),
            vec!["/docs/index.html", "/docs.html"]
        );
        assert_eq!(possible_paths("/", ".html"), vec!["/index.html"]);
    }

    #[tokio::test]
    async fn index_file_preferred() {
        let fs = MemoryFs::new()
            .file("/srv/about/index.html", "a")
            .file("/srv/about.html", "b");
        assert_eq!(
            find(&fs, "/about", None).await,
            Some(PathBuf::from("/srv/about/index.html"))
        );
    }

    #[tokio::test]
    async fn sibling_html() {
        let fs = MemoryFs::new().file("/srv/about.html", "b");
        assert_eq!(
            find(&fs, "/about", None).await,
            Some(PathBuf::from("/srv/about.html"))
        );
    }

    #[tokio::test]
    async fn falls_back_to_htm() {
        let fs = MemoryFs::new().file("/srv/legacy.htm", "old");
        assert_eq!(
            find(&fs, "/legacy", None).await,
            Some(PathBuf::from("/srv/legacy.htm"))
        );
    }

    #[tokio::test]
    async fn rewrite_target_is_sole_candidate() {
        let fs = MemoryFs::new()
            .file("/srv/posts/hello.html", "post")
            .file("/srv/blog/hello.html", "shadowed");
        assert_eq!(
            find(&fs, "/blog/hello", Some("/posts/hello.html")).await,
            Some(PathBuf::from("/srv/posts/hello.html"))
        );
        assert_eq!(find(&fs, "/blog/hello", Some("/posts/missing.html")).await, None);
    }

    #[tokio::test]
    async fn nothing_found() {
        let fs = MemoryFs::new().dir("/srv");
        assert_eq!(find(&fs, "/missing", None).await, None);
    }

    #[tokio::test]
    async fn fatal_errors_propagate() {
        let fs = MemoryFs::new().failing("/srv/locked/index.html", io::ErrorKind::PermissionDenied);
        let err = find_related(&fs, Path::new(ROOT), "/locked", None, DEFAULT_EXTENSION, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn symlinks_hidden_unless_followed() {
        let fs = MemoryFs::new()
            .file("/outside/page.html", "x")
            .symlink("/srv/page.html", "/outside/page.html");
        assert!(probe(&fs, Path::new("/srv/page.html"), false).await.is_err());
        assert!(probe(&fs, Path::new("/srv/page.html"), true).await.unwrap().is_file());
    }
}
