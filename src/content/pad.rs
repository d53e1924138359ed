//! The content tree of one build pass.
//!
//! A `Pad` pairs the directory snapshot with lazily loaded, memoized
//! records. It is created at the start of every pass and dropped at the
//! end; nothing in it is ever mutated to reflect newer files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::{DEFAULT_MODEL, ModelConfig, ProjectConfig};
use crate::core::{Alt, RecordPath, split_virtual, url_dir, url_join};
use crate::error::RecordError;
use crate::freshness::{ContentHash, HashCache, fingerprint, hash_bytes};
use crate::resolve::{GeneratorRegistry, pagination};

use super::{
    Attachment, ContentTree, FieldMap, FieldParser, ParseError, Record, SourceObject, TreeNode,
};

type RecordResult = Result<Arc<Record>, RecordError>;

pub struct Pad {
    config: Arc<ProjectConfig>,
    tree: ContentTree,
    parser: Arc<dyn FieldParser>,
    generators: Arc<GeneratorRegistry>,
    parsed: DashMap<PathBuf, Result<Arc<FieldMap>, ParseError>>,
    records: DashMap<(RecordPath, Alt), RecordResult>,
    hashes: HashCache,
}

/// Result of walking a path through the tree.
enum Located {
    Record(RecordPath),
    Attachment(RecordPath, String),
}

impl Pad {
    /// Snapshot the content directory for a new pass.
    pub fn open(
        config: Arc<ProjectConfig>,
        parser: Arc<dyn FieldParser>,
        generators: Arc<GeneratorRegistry>,
    ) -> Self {
        let tree = ContentTree::scan(&config.content_dir());
        crate::debug!("discover"; "content tree has {} records", tree.len());
        Self {
            config,
            tree,
            parser,
            generators,
            parsed: DashMap::new(),
            records: DashMap::new(),
            hashes: HashCache::new(),
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Resolve any addressable path in `alt`.
    ///
    /// Segments match a child's directory name or its `_slug`; an unmatched
    /// last segment may name an attachment. `@<suffix>` selects a page
    /// (numeric) or a generator-provided source. Unknown paths, unknown
    /// alternates and invalid records all yield `None`.
    pub fn get(&self, path: &str, alt: &Alt) -> Option<SourceObject> {
        if !self.config.is_known_alt(alt) {
            return None;
        }
        let (base, suffix) = split_virtual(path);

        match self.locate(base, alt)? {
            Located::Attachment(parent, name) => {
                if suffix.is_some() {
                    return None;
                }
                self.attachment(&parent, &name).map(SourceObject::Attachment)
            }
            Located::Record(record_path) => {
                let record = self.record(&record_path, alt).ok()??;
                self.resolve_suffix(record, suffix)
            }
        }
    }

    fn resolve_suffix(&self, record: Arc<Record>, suffix: Option<&str>) -> Option<SourceObject> {
        let paginated = pagination::per_page(&record, &self.config).is_some();
        match suffix {
            None if paginated => pagination::page(self, &record, 1).map(SourceObject::Page),
            None => Some(SourceObject::Record(record)),
            Some(suffix) => match suffix.parse::<usize>() {
                Ok(number) if paginated => {
                    pagination::page(self, &record, number).map(SourceObject::Page)
                }
                _ => self
                    .generators
                    .resolve(&record, suffix, self)
                    .map(SourceObject::Virtual),
            },
        }
    }

    fn locate(&self, path: &str, alt: &Alt) -> Option<Located> {
        let segments = path_segments(path);
        let (node, matched) = self.walk(&segments, alt)?;

        match &segments[matched..] {
            [] => Some(Located::Record(node.path.clone())),
            [name] if node.has_attachment(name) => {
                Some(Located::Attachment(node.path.clone(), name.to_string()))
            }
            _ => None,
        }
    }

    /// Where a lookup of `path` stops: the deepest record reached and the
    /// segments left unmatched below it (empty when the whole path matched).
    pub fn lookup_frontier(&self, path: &str, alt: &Alt) -> (RecordPath, Vec<String>) {
        let segments = path_segments(path);
        match self.walk(&segments, alt) {
            Some((node, matched)) => (
                node.path.clone(),
                segments[matched..].iter().map(|s| s.to_string()).collect(),
            ),
            None => (
                RecordPath::root(),
                segments.iter().map(|s| s.to_string()).collect(),
            ),
        }
    }

    /// Follow `segments` from the root; the deepest node reached and how
    /// many segments it consumed.
    fn walk(&self, segments: &[&str], alt: &Alt) -> Option<(&TreeNode, usize)> {
        let mut node = self.tree.node(&RecordPath::root())?;
        for (index, segment) in segments.iter().enumerate() {
            match self
                .match_child(node, segment, alt)
                .and_then(|child| self.tree.node(&child))
            {
                Some(child) => node = child,
                None => return Some((node, index)),
            }
        }
        Some((node, segments.len()))
    }

    /// Child of `node` by directory name, else by slug in `alt`.
    fn match_child(&self, node: &TreeNode, segment: &str, alt: &Alt) -> Option<RecordPath> {
        if node.children.iter().any(|c| c == segment) {
            return Some(node.child_path(segment));
        }
        node.children.iter().map(|c| node.child_path(c)).find(|child| {
            self.record(child, alt)
                .ok()
                .flatten()
                .is_some_and(|r| r.slug.trim_matches('/') == segment)
        })
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Record at a canonical path, loaded and cached on first access.
    ///
    /// `Ok(None)` when no such directory exists.
    pub fn record(&self, path: &RecordPath, alt: &Alt) -> Result<Option<Arc<Record>>, RecordError> {
        let key = (path.clone(), alt.clone());
        if let Some(cached) = self.records.get(&key).map(|r| r.value().clone()) {
            return cached.map(Some);
        }
        let Some(node) = self.tree.node(path) else {
            return Ok(None);
        };

        // Computed without holding a map guard: loading recurses into parents
        let loaded = self.load_record(node, alt);
        self.records.entry(key).or_insert(loaded).value().clone().map(Some)
    }

    fn load_record(&self, node: &TreeNode, alt: &Alt) -> RecordResult {
        let path = &node.path;
        let malformed = |source| RecordError::Malformed {
            path: path.clone(),
            source,
        };

        let mut sources = Vec::new();
        let primary = match &node.contents {
            Some(file) => {
                sources.push(file.clone());
                self.parse_file(file).map_err(malformed)?
            }
            None => Arc::new(FieldMap::new()),
        };
        let overrides = match node.alt_contents.get(alt.as_str()) {
            Some(file) => {
                sources.push(file.clone());
                Some(self.parse_file(file).map_err(malformed)?)
            }
            None => None,
        };
        let fields = match &overrides {
            Some(overrides) => Arc::new(primary.overlay(overrides)),
            None => Arc::clone(&primary),
        };

        let parent = match path.parent() {
            Some(parent_path) => self.record(&parent_path, alt)?,
            None => None,
        };

        let model_id = fields
            .get("_model")
            .map(str::to_string)
            .or_else(|| {
                parent
                    .as_ref()
                    .and_then(|p| self.config.model(&p.model))
                    .and_then(|m| m.child_model.clone())
            })
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let primary_file = || node.contents.clone().unwrap_or_else(|| node.dir.clone());
        let Some(model) = self.config.model(&model_id) else {
            return Err(RecordError::UnknownModel {
                path: path.clone(),
                model: model_id,
                file: primary_file(),
            });
        };

        if let Some(field) = fields.keys().find(|f| !model.allows_field(f)) {
            let file = match (&overrides, node.alt_contents.get(alt.as_str())) {
                (Some(o), Some(alt_file)) if o.contains(field) => alt_file.clone(),
                _ => primary_file(),
            };
            return Err(RecordError::UndeclaredField {
                path: path.clone(),
                model: model_id.clone(),
                field: field.to_string(),
                file,
            });
        }

        let slug = fields
            .get("_slug")
            .map(|s| s.trim().trim_matches('/').to_string())
            .unwrap_or_else(|| path.name().to_string());
        let url = match &parent {
            Some(parent) => url_join(&parent.url, &slug),
            None => self.config.url_prefix(alt),
        };
        let hidden = fields.is_truthy("_hidden")
            || model.hidden
            || parent.as_ref().is_some_and(|p| p.hidden);

        Ok(Arc::new(Record {
            path: path.clone(),
            alt: alt.clone(),
            template: template_of(&fields, model, &model_id),
            model: model_id,
            slug,
            url,
            hidden,
            dir: node.dir.clone(),
            sources,
            fields,
        }))
    }

    /// Parse a content file through the configured parser, once per pass.
    pub fn parse_file(&self, file: &Path) -> Result<Arc<FieldMap>, ParseError> {
        if let Some(cached) = self.parsed.get(file).map(|r| r.value().clone()) {
            return cached;
        }
        let parsed = self.parser.parse(file).map(Arc::new);
        self.parsed
            .entry(file.to_path_buf())
            .or_insert(parsed)
            .value()
            .clone()
    }

    /// Visible, valid children of a record in display order.
    ///
    /// Ordering follows the parent model's `order_by`, then directory name.
    pub fn children_of(&self, path: &RecordPath, alt: &Alt) -> Vec<Arc<Record>> {
        let Some(node) = self.tree.node(path) else {
            return Vec::new();
        };

        let mut children: Vec<Arc<Record>> = node
            .children
            .iter()
            .filter_map(|name| self.record(&node.child_path(name), alt).ok().flatten())
            .filter(|child| !child.hidden)
            .collect();

        let order_by = self
            .record(path, alt)
            .ok()
            .flatten()
            .and_then(|parent| self.config.model(&parent.model).map(|m| m.order_by.clone()))
            .unwrap_or_default();
        if !order_by.is_empty() {
            children.sort_by(|a, b| {
                order_by
                    .iter()
                    .map(|key| match key.strip_prefix('-') {
                        Some(field) => b.field(field).cmp(&a.field(field)),
                        None => a.field(key).cmp(&b.field(key)),
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        children
    }

    /// Attachments of a record, addressed under its primary-alt URL.
    pub fn attachments_of(&self, path: &RecordPath) -> Vec<Attachment> {
        let Some(node) = self.tree.node(path) else {
            return Vec::new();
        };
        node.attachments
            .iter()
            .filter_map(|name| self.attachment(path, name))
            .collect()
    }

    fn attachment(&self, parent: &RecordPath, name: &str) -> Option<Attachment> {
        let node = self.tree.node(parent)?;
        if !node.has_attachment(name) {
            return None;
        }
        let owner = self.record(parent, &self.config.primary_alt()).ok()??;
        Some(Attachment {
            path: parent.join(name),
            parent: parent.clone(),
            file: node.dir.join(name),
            url: format!("{}{name}", url_dir(&owner.url)),
        })
    }

    // ========================================================================
    // Current-state signatures (dependency values)
    // ========================================================================

    /// Content hash and size of a file; empty hash and 0 when missing.
    pub fn file_signature(&self, file: &Path) -> (ContentHash, u64) {
        let hash = self.hashes.hash(file);
        let size = fs::metadata(file).map(|m| m.len()).unwrap_or(0);
        (hash, size)
    }

    /// Fingerprint of a record's observable state; empty when it does not exist.
    pub fn record_fingerprint(&self, path: &RecordPath, alt: &Alt) -> ContentHash {
        match self.record(path, alt) {
            Ok(Some(record)) => record.fingerprint(),
            Ok(None) => ContentHash::empty(),
            Err(err) => hash_bytes(format!("invalid: {err}").as_bytes()),
        }
    }

    /// Fingerprint of the ordered visible children and their state.
    pub fn children_fingerprint(&self, path: &RecordPath, alt: &Alt) -> ContentHash {
        if !self.tree.contains(path) {
            return ContentHash::empty();
        }
        let children = self.children_of(path, alt);
        fingerprint(
            children
                .iter()
                .flat_map(|c| [c.path.to_string(), c.fingerprint().to_hex()]),
        )
    }
}

fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn template_of(fields: &FieldMap, model: &ModelConfig, model_id: &str) -> String {
    fields
        .get("_template")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| model.template_for(model_id))
}
