//! Canonical paths for source objects and produced artifacts.
//!
//! - [`RecordPath`]: identity of a record in the content tree (`/blog/post`)
//! - [`ArtifactPath`]: output file relative to the output root (`blog/post/index.html`)
//! - URL helpers for composing record URLs from slugs

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Separator between a record path and a virtual suffix (`/blog@2`).
pub const VIRTUAL_MARKER: char = '@';

/// Canonical path of a record in the content tree.
///
/// Invariants:
/// - Always starts with `/`
/// - Never ends with `/`, except for the root
/// - Uses directory names, never slugs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordPath(String);

impl RecordPath {
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Normalize any slash-separated path into canonical form.
    pub fn new(path: &str) -> Self {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        if segments.is_empty() {
            return Self::root();
        }
        Self(format!("/{}", segments.join("/")))
    }

    /// Build from directory components relative to the content root.
    pub fn from_relative(rel: &Path) -> Self {
        let joined: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Self::new(&joined.join("/"))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment (directory name), empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn join(&self, name: &str) -> Self {
        if self.is_root() {
            Self(format!("/{name}"))
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    /// Whether `self` equals `ancestor` or lies beneath it.
    pub fn is_within(&self, ancestor: &RecordPath) -> bool {
        ancestor.is_root()
            || self.0 == ancestor.0
            || self
                .0
                .strip_prefix(ancestor.0.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Directory of this record below the content root.
    pub fn to_fs_path(&self, content_root: &Path) -> PathBuf {
        let mut path = content_root.to_path_buf();
        path.extend(self.segments());
        path
    }

    /// Path of a virtual source owned by this record.
    pub fn with_suffix(&self, suffix: &str) -> String {
        format!("{}{VIRTUAL_MARKER}{suffix}", self.0)
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split `"/blog@2"` into `("/blog", Some("2"))`.
///
/// An empty suffix (`"/blog@"`) is treated as no suffix.
pub fn split_virtual(path: &str) -> (&str, Option<&str>) {
    match path.split_once(VIRTUAL_MARKER) {
        Some((base, suffix)) if !suffix.is_empty() => (base, Some(suffix)),
        Some((base, _)) => (base, None),
        None => (path, None),
    }
}

/// Output file path relative to the output root, `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactPath(String);

impl ArtifactPath {
    pub fn new(path: &str) -> Self {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        Self(segments.join("/"))
    }

    /// Artifact produced for a URL; directory URLs map to `index.html`.
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim_start_matches('/');
        if trimmed.is_empty() || trimmed.ends_with('/') {
            Self::new(&format!("{trimmed}index.html"))
        } else {
            Self::new(trimmed)
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute location below `output_root`.
    pub fn to_fs_path(&self, output_root: &Path) -> PathBuf {
        let mut path = output_root.to_path_buf();
        path.extend(self.0.split('/'));
        path
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Append a slug to a directory URL.
///
/// Slugs containing a `.` name a file (`feed.xml`), everything else a
/// directory (`post/`).
pub fn url_join(base: &str, slug: &str) -> String {
    let base = url_dir(base);
    let slug = slug.trim_matches('/');
    if slug.is_empty() {
        base
    } else if slug.rsplit('/').next().is_some_and(|last| last.contains('.')) {
        format!("{base}{slug}")
    } else {
        format!("{base}{slug}/")
    }
}

/// Directory part of a URL (`/a/feed.xml` -> `/a/`, `/a/` -> `/a/`).
pub fn url_dir(url: &str) -> String {
    if url.ends_with('/') {
        return url.to_string();
    }
    match url.rfind('/') {
        Some(idx) => url[..=idx].to_string(),
        None => "/".to_string(),
    }
}
