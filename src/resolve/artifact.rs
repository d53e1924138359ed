//! Artifact enumeration: every output file the current tree produces.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::content::{Pad, Record, SourceObject};
use crate::core::{Alt, ArtifactPath, RecordPath};
use crate::error::RecordError;

use super::pagination;

/// How an artifact is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Producer {
    /// Render a template with the source as context
    Render { template: String },
    /// Copy a file verbatim
    Copy { file: PathBuf },
}

/// One output file and the source producing it.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: ArtifactPath,
    pub source: SourceObject,
    pub alt: Alt,
    pub producer: Producer,
}

impl Artifact {
    /// Source path including any virtual suffix (`/blog@2`).
    pub fn source_path(&self) -> String {
        self.source.path()
    }

    pub fn record_path(&self) -> &RecordPath {
        self.source.record_path()
    }

    pub fn is_render(&self) -> bool {
        matches!(self.producer, Producer::Render { .. })
    }
}

/// Two sources resolving to the same artifact path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConflict {
    pub artifact: ArtifactPath,
    pub kept: String,
    pub dropped: String,
}

impl fmt::Display for OutputConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` and `{}` both produce `{}`, keeping `{}`",
            self.kept, self.dropped, self.artifact, self.kept
        )
    }
}

/// The full artifact set of one pass, plus what could not take part.
#[derive(Debug, Default)]
pub struct ArtifactSet {
    artifacts: BTreeMap<ArtifactPath, Artifact>,
    conflicts: Vec<OutputConflict>,
    record_errors: Vec<RecordError>,
    invalid_records: Vec<RecordPath>,
}

impl ArtifactSet {
    /// Walk the tree from the root in every alternate.
    ///
    /// Invalid records are reported and their subtrees skipped; hidden
    /// records and their subtrees produce nothing.
    pub fn discover(pad: &Pad) -> Self {
        let mut set = Self::default();
        let primary = pad.config().primary_alt();
        for alt in pad.config().alts() {
            let is_primary = alt == primary;
            set.visit(pad, &RecordPath::root(), &alt, is_primary);
        }
        set
    }

    fn visit(&mut self, pad: &Pad, path: &RecordPath, alt: &Alt, is_primary: bool) {
        let record = match pad.record(path, alt) {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(err) => {
                self.add_record_error(err);
                return;
            }
        };
        if record.hidden {
            return;
        }

        self.add_record_sources(pad, &record);

        if is_primary {
            for attachment in pad.attachments_of(path) {
                let file = attachment.file.clone();
                self.insert(Artifact {
                    path: ArtifactPath::from_url(&attachment.url),
                    source: SourceObject::Attachment(attachment),
                    alt: alt.clone(),
                    producer: Producer::Copy { file },
                });
            }
        }

        let Some(node) = pad.tree().node(path) else {
            return;
        };
        for child in &node.children {
            self.visit(pad, &node.child_path(child), alt, is_primary);
        }
    }

    fn add_record_sources(&mut self, pad: &Pad, record: &Arc<Record>) {
        let pages = pagination::pages(pad, record);
        if pages.is_empty() {
            self.insert(Artifact {
                path: ArtifactPath::from_url(&record.url),
                source: SourceObject::Record(Arc::clone(record)),
                alt: record.alt.clone(),
                producer: Producer::Render {
                    template: record.template.clone(),
                },
            });
        } else {
            for page in pages {
                self.insert(Artifact {
                    path: ArtifactPath::from_url(&page.url),
                    alt: record.alt.clone(),
                    producer: Producer::Render {
                        template: record.template.clone(),
                    },
                    source: SourceObject::Page(page),
                });
            }
        }

        for source in pad.generators().enumerate(record, pad) {
            self.insert(Artifact {
                path: ArtifactPath::from_url(&source.url),
                alt: record.alt.clone(),
                producer: Producer::Render {
                    template: source.template.clone(),
                },
                source: SourceObject::Virtual(source),
            });
        }
    }

    /// Rendered sources win against copied files, otherwise the first wins.
    fn insert(&mut self, artifact: Artifact) {
        let Some(existing) = self.artifacts.get(&artifact.path) else {
            self.artifacts.insert(artifact.path.clone(), artifact);
            return;
        };

        let replace = artifact.is_render() && !existing.is_render();
        let (kept, dropped) = if replace {
            (artifact.source_path(), existing.source_path())
        } else {
            (existing.source_path(), artifact.source_path())
        };
        self.conflicts.push(OutputConflict {
            artifact: artifact.path.clone(),
            kept,
            dropped,
        });
        if replace {
            self.artifacts.insert(artifact.path.clone(), artifact);
        }
    }

    fn add_record_error(&mut self, err: RecordError) {
        let record = err.record().clone();
        let duplicate = self
            .record_errors
            .iter()
            .any(|e| e.record() == err.record() && e.file() == err.file());
        if !duplicate {
            self.record_errors.push(err);
        }
        if !self.invalid_records.contains(&record) {
            self.invalid_records.push(record);
        }
    }

    // ========================================================================
    // Access
    // ========================================================================

    pub fn get(&self, path: &ArtifactPath) -> Option<&Artifact> {
        self.artifacts.get(path)
    }

    pub fn contains(&self, path: &ArtifactPath) -> bool {
        self.artifacts.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &ArtifactPath> {
        self.artifacts.keys()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn conflicts(&self) -> &[OutputConflict] {
        &self.conflicts
    }

    pub fn record_errors(&self) -> &[RecordError] {
        &self.record_errors
    }

    /// Whether `record` is, or lies below, a record currently in error.
    pub fn in_invalid_record(&self, record: &RecordPath) -> bool {
        self.invalid_records.iter().any(|bad| record.is_within(bad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::content::LrParser;
    use crate::resolve::GeneratorRegistry;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn pad(config: &str, files: &[(&str, &str)]) -> (TempDir, Pad) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("folio.toml"), config).unwrap();
        fs::create_dir_all(root.join("content")).unwrap();
        for (rel, text) in files {
            let path = root.join("content").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        let config = Arc::new(ProjectConfig::load(root).unwrap());
        let pad = Pad::open(config, Arc::new(LrParser), Arc::new(GeneratorRegistry::new()));
        (dir, pad)
    }

    fn paths(set: &ArtifactSet) -> Vec<&str> {
        set.paths().map(ArtifactPath::as_str).collect()
    }

    #[test]
    fn records_attachments_and_alts() {
        let (_dir, pad) = pad(
            "[alternatives.en]\nprimary = true\n[alternatives.de]\n",
            &[
                ("contents.lr", "title: Home"),
                ("about/contents.lr", "title: About"),
                ("about/photo.jpg", "jpg"),
            ],
        );
        let set = ArtifactSet::discover(&pad);
        assert_eq!(
            paths(&set),
            [
                "about/index.html",
                "about/photo.jpg",
                "de/about/index.html",
                "de/index.html",
                "index.html"
            ]
        );
        let photo = set.get(&ArtifactPath::new("about/photo.jpg")).unwrap();
        assert!(matches!(&photo.producer, Producer::Copy { file } if file.ends_with(Path::new("about/photo.jpg"))));
    }

    #[test]
    fn record_wins_over_attachment() {
        let (_dir, pad) = pad(
            "",
            &[
                ("contents.lr", "title: Home"),
                ("index.html", "<p>stray</p>"),
            ],
        );
        let set = ArtifactSet::discover(&pad);
        let index = set.get(&ArtifactPath::new("index.html")).unwrap();
        assert!(index.is_render());
        assert_eq!(set.conflicts().len(), 1);
        assert_eq!(set.conflicts()[0].kept, "/");
        assert_eq!(set.conflicts()[0].dropped, "/index.html");
    }

    #[test]
    fn invalid_and_hidden_subtrees_are_skipped() {
        let (_dir, pad) = pad(
            "",
            &[
                ("good/contents.lr", "title: ok"),
                ("bad/contents.lr", "oops"),
                ("bad/child/contents.lr", "title: child"),
                ("secret/contents.lr", "_hidden: yes"),
                ("secret/inner/contents.lr", "title: inner"),
            ],
        );
        let set = ArtifactSet::discover(&pad);
        assert_eq!(paths(&set), ["good/index.html", "index.html"]);
        assert_eq!(set.record_errors().len(), 1);
        assert!(set.in_invalid_record(&RecordPath::new("/bad/child")));
        assert!(!set.in_invalid_record(&RecordPath::new("/good")));
    }

    #[test]
    fn paginated_listing_pages() {
        let (_dir, pad) = pad(
            "[models.blog.pagination]\nenabled = true\nper_page = 2\n",
            &[
                ("blog/contents.lr", "_model: blog"),
                ("blog/a/contents.lr", "title: a"),
                ("blog/b/contents.lr", "title: b"),
                ("blog/c/contents.lr", "title: c"),
            ],
        );
        let set = ArtifactSet::discover(&pad);
        let page2 = set.get(&ArtifactPath::new("blog/page/2/index.html")).unwrap();
        assert_eq!(page2.source_path(), "/blog@2");
        assert_eq!(
            set.get(&ArtifactPath::new("blog/index.html")).unwrap().source_path(),
            "/blog"
        );
    }
}
