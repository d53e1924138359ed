//! Source objects: records and the sources derived from them.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::{Alt, RecordPath};
use crate::freshness::{ContentHash, compute_file_hash};

use super::FieldMap;

/// A content record in one alternate.
///
/// Instances are immutable and belong to one build pass; a new
/// [`Pad`](super::Pad) is needed to observe changed files.
#[derive(Debug)]
pub struct Record {
    pub path: RecordPath,
    pub alt: Alt,
    pub model: String,
    pub slug: String,
    pub url: String,
    pub template: String,
    /// Hidden by `_hidden`, its model, or an ancestor
    pub hidden: bool,
    /// Record directory
    pub dir: PathBuf,
    /// Content files the fields were read from
    pub sources: Vec<PathBuf>,
    pub(super) fields: Arc<FieldMap>,
}

impl Record {
    /// Effective fields (alt overrides applied per field).
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    /// Identity of this record's observable state: url, model and fields.
    pub fn fingerprint(&self) -> ContentHash {
        crate::freshness::fingerprint([
            self.url.as_str(),
            self.model.as_str(),
            &self.fields.fingerprint().to_hex(),
            if self.hidden { "hidden" } else { "visible" },
        ])
    }
}

/// One page of a paginated record.
#[derive(Debug, Clone)]
pub struct Page {
    pub record: Arc<Record>,
    /// 1-based
    pub number: usize,
    pub total: usize,
    pub url: String,
    /// This page's slice of children
    pub children: Vec<Arc<Record>>,
}

/// A non-record file belonging to a record.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// `/blog/cover.png`
    pub path: RecordPath,
    pub parent: RecordPath,
    pub file: PathBuf,
    pub url: String,
}

impl Attachment {
    pub fn content_hash(&self) -> ContentHash {
        compute_file_hash(&self.file)
    }
}

/// A source contributed by a registered generator.
#[derive(Debug, Clone)]
pub struct VirtualSource {
    pub record: Arc<Record>,
    pub generator: String,
    pub suffix: String,
    pub url: String,
    pub template: String,
}

/// Anything addressable through [`Pad::get`](super::Pad::get).
#[derive(Debug, Clone)]
pub enum SourceObject {
    Record(Arc<Record>),
    Page(Page),
    Attachment(Attachment),
    Virtual(VirtualSource),
}

impl SourceObject {
    /// Canonical path, including the virtual suffix (`/blog@2`).
    ///
    /// Page 1 of a paginated record is identified by the record path.
    pub fn path(&self) -> String {
        match self {
            Self::Record(record) => record.path.to_string(),
            Self::Page(page) if page.number == 1 => page.record.path.to_string(),
            Self::Page(page) => page.record.path.with_suffix(&page.number.to_string()),
            Self::Attachment(attachment) => attachment.path.to_string(),
            Self::Virtual(source) => source.record.path.with_suffix(&source.suffix),
        }
    }

    /// Record this source belongs to (the parent for attachments).
    pub fn record_path(&self) -> &RecordPath {
        match self {
            Self::Record(record) => &record.path,
            Self::Page(page) => &page.record.path,
            Self::Attachment(attachment) => &attachment.parent,
            Self::Virtual(source) => &source.record.path,
        }
    }

    pub fn record(&self) -> Option<&Arc<Record>> {
        match self {
            Self::Record(record) => Some(record),
            Self::Page(page) => Some(&page.record),
            Self::Virtual(source) => Some(&source.record),
            Self::Attachment(_) => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Record(record) => &record.url,
            Self::Page(page) => &page.url,
            Self::Attachment(attachment) => &attachment.url,
            Self::Virtual(source) => &source.url,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Record(_) => "record",
            Self::Page(_) => "page",
            Self::Attachment(_) => "attachment",
            Self::Virtual(_) => "virtual",
        }
    }
}
