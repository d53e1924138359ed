//! Renderer seam and the tracked render context.
//!
//! A [`Renderer`] turns a template id plus a [`RenderContext`] into bytes.
//! Every lookup a renderer makes goes through the context, which records
//! it in the artifact's [`TrackingScope`]; this is what makes cross-page
//! dependencies visible to incremental builds.

mod simple;

pub use simple::SimpleRenderer;

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::content::{CONTENTS_FILE, FieldMap, Pad, ParseError, Record, SourceObject};
use crate::core::{Alt, RecordPath, split_virtual};
use crate::deps::TrackingScope;
use crate::resolve::pagination;

/// A template that could not be rendered.
#[derive(Debug, Clone, Error)]
#[error("failed to render `{template}`: {cause}")]
pub struct RenderError {
    pub template: String,
    pub cause: String,
}

impl RenderError {
    pub fn new(template: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            cause: cause.into(),
        }
    }
}

/// Template rendering collaborator.
pub trait Renderer: Send + Sync {
    fn render(&self, template_id: &str, ctx: &mut RenderContext<'_>) -> Result<Vec<u8>, RenderError>;
}

/// Everything a renderer may read while producing one artifact.
pub struct RenderContext<'a> {
    pad: &'a Pad,
    source: &'a SourceObject,
    alt: Alt,
    scope: TrackingScope,
    parse_error: Option<ParseError>,
}

impl<'a> RenderContext<'a> {
    /// Bind a source to its scope and record the inputs every rendered
    /// source has: own content files, own record state, model config and
    /// the alternate configuration.
    pub fn new(pad: &'a Pad, source: &'a SourceObject, alt: Alt, scope: TrackingScope) -> Self {
        let mut ctx = Self {
            pad,
            source,
            alt,
            scope,
            parse_error: None,
        };
        ctx.track_source();
        ctx
    }

    fn track_source(&mut self) {
        let pad = self.pad;
        match self.source {
            SourceObject::Attachment(attachment) => {
                self.scope.record_file(pad, &attachment.file);
            }
            source => {
                let Some(record) = source.record() else {
                    return;
                };
                self.scope.record_file(pad, &record.dir.join(CONTENTS_FILE));
                if !record.alt.is_implicit() {
                    let alt_file = record.dir.join(format!("contents+{}.lr", record.alt));
                    self.scope.record_file(pad, &alt_file);
                }
                self.scope.record_record(pad, &record.path, &record.alt);
                self.scope
                    .record_config(pad.config(), &format!("models.{}", record.model));
                self.scope.record_config(pad.config(), "alternatives");
                // page numbering and slices follow the child set
                if matches!(source, SourceObject::Page(_))
                    && pagination::per_page(record, pad.config()).is_some()
                {
                    self.scope.record_children(pad, &record.path, &record.alt);
                }
            }
        }
    }

    pub fn source(&self) -> &SourceObject {
        self.source
    }

    pub fn alt(&self) -> &Alt {
        &self.alt
    }

    /// The record being rendered (owner of pages and virtual sources).
    pub fn this(&self) -> Option<&Arc<Record>> {
        self.source.record()
    }

    /// Fields of the record being rendered.
    pub fn this_fields(&self) -> Option<&FieldMap> {
        self.this().map(|r| r.fields())
    }

    /// Resolve another source in the current alternate.
    ///
    /// A miss is recorded against the deepest record the lookup reached:
    /// its state, its children and, for a single unmatched segment, the
    /// attachment file it would name. Any of them changing can make the
    /// path resolve.
    pub fn get(&mut self, path: &str) -> Option<SourceObject> {
        let found = self.pad.get(path, &self.alt);
        let record = match &found {
            Some(source) => source.record_path().clone(),
            None => self.track_miss(split_virtual(path).0),
        };
        self.scope.record_record(self.pad, &record, &self.alt);
        found
    }

    fn track_miss(&mut self, path: &str) -> RecordPath {
        let (record, rest) = self.pad.lookup_frontier(path, &self.alt);
        self.scope.record_children(self.pad, &record, &self.alt);
        if let [name] = rest.as_slice() {
            let file = record.to_fs_path(&self.pad.config().content_dir()).join(name);
            self.scope.record_file(self.pad, &file);
        }
        record
    }

    /// Fields of another record.
    pub fn fields(&mut self, path: &str) -> Option<FieldMap> {
        self.get(path)
            .and_then(|source| source.record().map(|r| r.fields().clone()))
    }

    /// Visible children of a record, in display order.
    pub fn children(&mut self, path: &RecordPath) -> Vec<Arc<Record>> {
        self.scope.record_children(self.pad, path, &self.alt);
        self.pad.children_of(path, &self.alt)
    }

    /// Children of the current page, or of the record when not paginated.
    pub fn page_children(&mut self) -> Vec<Arc<Record>> {
        match self.source {
            SourceObject::Page(page) => {
                self.scope.record_children(self.pad, &page.record.path, &self.alt);
                page.children.clone()
            }
            source => match source.record() {
                Some(record) => {
                    let path = record.path.clone();
                    self.children(&path)
                }
                None => Vec::new(),
            },
        }
    }

    /// A dotted project config value.
    pub fn config(&mut self, key: &str) -> Option<toml::Value> {
        self.scope.record_config(self.pad.config(), key);
        self.pad.config().lookup(key).cloned()
    }

    /// Source text of a template from the templates directory.
    pub fn read_template(&mut self, id: &str) -> Result<String, RenderError> {
        let mut path = self.pad.config().templates_dir();
        path.extend(id.split('/').filter(|s| !s.is_empty() && *s != ".."));
        self.scope.record_file(self.pad, &path);
        fs::read_to_string(&path)
            .map_err(|e| RenderError::new(id, format!("cannot read template `{}`: {e}", path.display())))
    }

    /// Raw bytes of any project file.
    pub fn read_file(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        self.scope.record_file(self.pad, path);
        fs::read(path)
    }

    /// Parse a data file with the project's field parser.
    ///
    /// A failure is remembered and fails the artifact even if the renderer
    /// recovers from it.
    pub fn parse_file(&mut self, path: &Path) -> Result<Arc<FieldMap>, ParseError> {
        self.scope.record_file(self.pad, path);
        self.pad.parse_file(path).inspect_err(|err| {
            self.parse_error.get_or_insert_with(|| err.clone());
        })
    }

    /// End rendering: hand back the scope and the first parse failure.
    pub fn finish(self) -> (TrackingScope, Option<ParseError>) {
        (self.scope, self.parse_error)
    }
}
