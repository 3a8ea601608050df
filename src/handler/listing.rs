//! Directory listings.
//!
//! [`list_directory`] produces a format-agnostic [`Listing`]; turning it into
//! bytes is the job of a [`Render`](super::Render) implementation.

use std::cmp::Ordering;
use std::io;
use std::path::{Component, Path};

use serde::Serialize;
use tracing::debug;

use crate::config::CompiledConfig;
use crate::fs::{FileSystem, is_not_found};
use crate::pattern;

use super::files::{Found, probe};

/// Names never shown in a listing.
const EXCLUDED: [&str; 2] = [".DS_Store", ".git"];

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Directory,
    File,
}

/// One row of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Display name; directories carry the slash suffix.
    pub base: String,
    /// Absolute link to the entry.
    pub relative: String,
    pub title: String,
    /// Last extension without the dot (`txt` if there is none). Empty for
    /// directories.
    pub ext: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    /// Human-readable size. Files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// One link in the path shown above a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub url: String,
}

/// Everything needed to render a directory page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub files: Vec<DirectoryEntry>,
    pub directory: String,
    pub paths: Vec<Breadcrumb>,
}

/// Result of [`list_directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Listing(Listing),
    /// `renderSingle` is set and the directory holds exactly one file.
    Single(Found),
}

/// Lists the directory at `absolute`, which the request path `relative`
/// (decoded, rooted at `/`) resolved to.
///
/// Returns `Ok(None)` when listing is disabled for `relative`, so the caller can
/// fall through to not-found handling. Links, breadcrumbs and the parent entry
/// follow where `absolute` sits below `root`, so a rewrite onto the root lists
/// the root. Children that vanish between `read_dir` and `stat`, and symbolic
/// links when `config.symlinks` is off, are skipped.
///
/// # Errors
///
/// Fatal filesystem errors from reading the directory or stat'ing a child.
pub async fn list_directory<F: FileSystem>(
    fs: &F,
    config: &CompiledConfig,
    root: &Path,
    relative: &str,
    absolute: &Path,
) -> io::Result<Option<Outcome>> {
    let enabled = config.directory_listing.applies(relative);
    if !enabled && !config.render_single {
        return Ok(None);
    }

    let suffix = slash_suffix(config.trailing_slash);
    let segments = segments_below(root, absolute, relative);
    let base_url = segments.iter().fold(String::new(), |mut url, segment| {
        url.push('/');
        url.push_str(segment);
        url
    });

    let mut files = Vec::new();
    let mut single = None;

    for name in fs.read_dir(absolute).await? {
        if EXCLUDED.contains(&name.as_str())
            || config.unlisted.iter().any(|pattern| pattern.is_match(&name))
        {
            continue;
        }

        let path = absolute.join(&name);
        let metadata = match probe(fs, &path, config.symlinks).await {
            Ok(metadata) => metadata,
            Err(e) if is_not_found(&e) => continue,
            Err(e) => return Err(e),
        };

        let entry = if metadata.is_dir() {
            let base = format!("{name}{suffix}");
            DirectoryEntry {
                relative: format!("{base_url}/{base}"),
                title: base.clone(),
                base,
                ext: String::new(),
                kind: EntryType::Directory,
                size: None,
            }
        } else {
            single = Some(Found {
                path,
                metadata: metadata.clone(),
            });
            DirectoryEntry {
                relative: format!("{base_url}/{name}"),
                title: name.clone(),
                ext: extension(&name).to_owned(),
                kind: EntryType::File,
                size: Some(human_size(metadata.len)),
                base: name,
            }
        };
        files.push(entry);
    }

    if config.render_single && files.len() == 1 && files[0].kind == EntryType::File {
        if let Some(found) = single {
            debug!(path = %found.path.display(), "serving single file instead of listing");
            return Ok(Some(Outcome::Single(found)));
        }
    }
    if !enabled {
        return Ok(None);
    }

    sort_entries(&mut files);

    if let Some((_, parents)) = segments.split_last() {
        let relative = if parents.is_empty() {
            "/".to_owned()
        } else {
            format!("/{}{suffix}", parents.join("/"))
        };
        files.insert(
            0,
            DirectoryEntry {
                base: "..".to_owned(),
                title: relative.clone(),
                relative,
                ext: String::new(),
                kind: EntryType::Directory,
                size: None,
            },
        );
    }

    let root_name = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut directory = root_name.clone();
    for segment in &segments {
        directory.push('/');
        directory.push_str(segment);
    }
    directory.push_str(suffix);

    Ok(Some(Outcome::Listing(Listing {
        files,
        directory,
        paths: breadcrumbs(&root_name, &segments, suffix),
    })))
}

/// Directories first, then ascending by name.
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| match (a.kind, b.kind) {
        (EntryType::Directory, EntryType::File) => Ordering::Less,
        (EntryType::File, EntryType::Directory) => Ordering::Greater,
        _ => a.base.cmp(&b.base),
    });
}

/// Formats a byte count with 1024-based units and no decimals, e.g. `3 KB`.
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{} {}", value.round(), SIZE_UNITS[unit])
}

fn slash_suffix(trailing_slash: Option<bool>) -> &'static str {
    match trailing_slash {
        Some(false) => "",
        Some(true) | None => "/",
    }
}

fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => &name[dot + 1..],
        _ => "txt",
    }
}

// Segments of `absolute` below `root`, or of the resolved request path when
// `absolute` lies elsewhere.
fn segments_below(root: &Path, absolute: &Path, relative: &str) -> Vec<String> {
    let Ok(below) = absolute.strip_prefix(root) else {
        return pattern::resolve(relative)
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
    };

    let mut segments = Vec::new();
    for component in below.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            Component::ParentDir => {
                segments.pop();
            }
            _ => {}
        }
    }
    segments
}

fn breadcrumbs(root_name: &str, segments: &[String], suffix: &str) -> Vec<Breadcrumb> {
    let last = segments.len();
    let mut paths = Vec::with_capacity(last + 1);
    paths.push(Breadcrumb {
        name: format!("{root_name}{}", if last == 0 { suffix } else { "/" }),
        url: "/".to_owned(),
    });

    let mut url = String::new();
    for (index, segment) in segments.iter().enumerate() {
        url.push('/');
        url.push_str(segment);
        let is_last = index + 1 == last;
        paths.push(Breadcrumb {
            name: format!("{segment}{}", if is_last { suffix } else { "/" }),
            url: format!("{url}{suffix}"),
        });
    }
    paths
}
