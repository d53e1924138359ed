//! Extension-provided virtual sources.
//!
//! Generators are registered per model (or for every model) together with
//! a suffix pattern. The pattern is anchored, so `feed` matches
//! `/blog@feed` but not `/blog@feeds`.

use std::sync::Arc;

use regex::Regex;

use crate::content::{Pad, Record, VirtualSource};

/// What a generator produces for one suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub url: String,
    pub template: String,
}

/// Contributes virtual sources below records.
pub trait VirtualSourceGenerator: Send + Sync {
    /// Suffixes this generator provides for `record` (enumerated during Discover).
    fn suffixes(&self, record: &Record, pad: &Pad) -> Vec<String>;

    /// Resolve one suffix; `None` when the record does not provide it.
    fn resolve(&self, record: &Record, suffix: &str, pad: &Pad) -> Option<GeneratedSource>;
}

struct Registration {
    name: String,
    model: Option<String>,
    pattern: Regex,
    generator: Arc<dyn VirtualSourceGenerator>,
}

impl Registration {
    fn applies_to(&self, record: &Record) -> bool {
        self.model.as_deref().is_none_or(|m| m == record.model)
    }
}

/// Registry of `(model, suffix pattern) -> generator`.
#[derive(Default)]
pub struct GeneratorRegistry {
    entries: Vec<Registration>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator. `model = None` applies it to every model.
    pub fn register(
        &mut self,
        name: &str,
        model: Option<&str>,
        pattern: &str,
        generator: Arc<dyn VirtualSourceGenerator>,
    ) -> Result<(), regex::Error> {
        let pattern = Regex::new(&format!("^(?:{pattern})$"))?;
        self.entries.push(Registration {
            name: name.to_string(),
            model: model.map(str::to_string),
            pattern,
            generator,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First registration whose model and pattern match wins.
    pub fn resolve(&self, record: &Arc<Record>, suffix: &str, pad: &Pad) -> Option<VirtualSource> {
        self.entries
            .iter()
            .filter(|e| e.applies_to(record) && e.pattern.is_match(suffix))
            .find_map(|e| {
                e.generator
                    .resolve(record, suffix, pad)
                    .map(|generated| virtual_source(e, record, suffix, generated))
            })
    }

    /// Every virtual source registered generators provide for `record`.
    pub fn enumerate(&self, record: &Arc<Record>, pad: &Pad) -> Vec<VirtualSource> {
        let mut sources = Vec::new();
        for entry in self.entries.iter().filter(|e| e.applies_to(record)) {
            for suffix in entry.generator.suffixes(record, pad) {
                if !entry.pattern.is_match(&suffix) {
                    crate::debug!("resolve"; "generator `{}` offered unmatched suffix `{}`", entry.name, suffix);
                    continue;
                }
                if let Some(generated) = entry.generator.resolve(record, &suffix, pad) {
                    sources.push(virtual_source(entry, record, &suffix, generated));
                }
            }
        }
        sources
    }
}

fn virtual_source(
    entry: &Registration,
    record: &Arc<Record>,
    suffix: &str,
    generated: GeneratedSource,
) -> VirtualSource {
    VirtualSource {
        record: Arc::clone(record),
        generator: entry.name.clone(),
        suffix: suffix.to_string(),
        url: generated.url,
        template: generated.template,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::content::{LrParser, SourceObject};
    use crate::core::{Alt, RecordPath, url_join};
    use std::fs;
    use tempfile::TempDir;

    /// `/<record>@feed` -> `<record url>feed.xml`
    struct Feed;

    impl VirtualSourceGenerator for Feed {
        fn suffixes(&self, _record: &Record, _pad: &Pad) -> Vec<String> {
            vec!["feed".to_string()]
        }

        fn resolve(&self, record: &Record, suffix: &str, _pad: &Pad) -> Option<GeneratedSource> {
            (suffix == "feed").then(|| GeneratedSource {
                url: url_join(&record.url, "feed.xml"),
                template: "feed.xml".to_string(),
            })
        }
    }

    fn pad_with_feed() -> (TempDir, Pad) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("folio.toml"), "[models.blog]\n").unwrap();
        fs::create_dir_all(root.join("content/blog")).unwrap();
        fs::create_dir_all(root.join("content/about")).unwrap();
        fs::write(root.join("content/blog/contents.lr"), "_model: blog").unwrap();

        let mut registry = GeneratorRegistry::new();
        registry.register("feed", Some("blog"), "feed", Arc::new(Feed)).unwrap();

        let config = Arc::new(ProjectConfig::load(root).unwrap());
        let pad = Pad::open(config, Arc::new(LrParser), Arc::new(registry));
        (dir, pad)
    }

    #[test]
    fn resolves_registered_suffix_for_model() {
        let (_dir, pad) = pad_with_feed();
        let alt = Alt::implicit();

        let Some(SourceObject::Virtual(feed)) = pad.get("/blog@feed", &alt) else {
            panic!("expected virtual source");
        };
        assert_eq!(feed.url, "/blog/feed.xml");
        assert_eq!(feed.generator, "feed");

        // Anchored pattern, model filter
        assert!(pad.get("/blog@feeds", &alt).is_none());
        assert!(pad.get("/about@feed", &alt).is_none());
    }

    #[test]
    fn enumerates_per_record() {
        let (_dir, pad) = pad_with_feed();
        let alt = Alt::implicit();
        let blog = pad.record(&RecordPath::new("/blog"), &alt).unwrap().unwrap();
        let about = pad.record(&RecordPath::new("/about"), &alt).unwrap().unwrap();

        assert_eq!(pad.generators().enumerate(&blog, &pad).len(), 1);
        assert!(pad.generators().enumerate(&about, &pad).is_empty());
    }

    #[test]
    fn rejects_invalid_pattern() {
        let mut registry = GeneratorRegistry::new();
        assert!(registry.register("bad", None, "(", Arc::new(Feed)).is_err());
        assert!(registry.is_empty());
    }
}
