//! Project configuration management for `folio.toml`.
//!
//! # Sections
//!
//! | Section              | Purpose                                        |
//! |----------------------|------------------------------------------------|
//! | `[project]`          | Name, url and source/output directories        |
//! | `[alternatives.<id>]`| Alternates (locales): primary flag, url prefix |
//! | `[models.<id>]`      | Templates, child model, ordering, pagination   |
//! | `[build]`            | Worker count                                   |
//!
//! The raw TOML tree is kept next to the typed view so that templates can
//! depend on any dotted key (`project.name`) and be invalidated when that
//! single value changes.

mod error;
mod model;

pub use error::ConfigError;
pub use model::{AltConfig, DEFAULT_MODEL, ModelConfig, PaginationConfig};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::Alt;
use crate::freshness::{ContentHash, hash_bytes};
use crate::log;

/// Config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "folio.toml";

/// Root configuration structure representing folio.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Untyped view for `config-key` dependencies (internal use only)
    #[serde(skip)]
    raw: toml::Table,

    pub project: ProjectSection,
    pub alternatives: BTreeMap<String, AltConfig>,
    pub models: BTreeMap<String, ModelConfig>,
    pub build: BuildSection,
}

/// `[project]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub name: Option<String>,
    pub url: Option<String>,
    pub content: PathBuf,
    pub templates: PathBuf,
    pub output: PathBuf,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: None,
            url: None,
            content: PathBuf::from("content"),
            templates: PathBuf::from("templates"),
            output: PathBuf::from("build"),
        }
    }
}

/// `[build]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Worker threads for the Produce phase, `0` = number of CPUs
    pub jobs: usize,
}

impl ProjectConfig {
    /// Load `folio.toml` from `root`.
    ///
    /// A missing config file yields the defaults; any read, parse or
    /// validation failure is a [`ConfigError`].
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILE);

        let content = if config_path.exists() {
            fs::read_to_string(&config_path)
                .map_err(|err| ConfigError::Io(config_path.clone(), err))?
        } else {
            crate::debug!("config"; "no {} in {}, using defaults", CONFIG_FILE, root.display());
            String::new()
        };

        let (mut config, ignored) = Self::parse_with_ignored(&content)
            .map_err(|err| ConfigError::Toml(config_path.clone(), err))?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored);
        }

        config.root = root.to_path_buf();
        config.config_path = config_path;
        config.finalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no filesystem checks).
    pub fn from_str(content: &str, root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILE);
        let (mut config, _) = Self::parse_with_ignored(content)
            .map_err(|err| ConfigError::Toml(config_path.clone(), err))?;
        config.root = root.to_path_buf();
        config.config_path = config_path;
        config.finalize();
        config.validate_models()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), toml::de::Error> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let mut config: Self =
            serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
                ignored.push(path.to_string());
            })?;
        config.raw = toml::from_str(content)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String]) {
        log!("warning"; "unknown fields in {}, ignoring: {}", CONFIG_FILE, fields.join(", "));
    }

    /// Fill in implicit defaults.
    fn finalize(&mut self) {
        self.models.entry(DEFAULT_MODEL.to_string()).or_default();
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_models()?;
        let content = self.content_dir();
        if !content.is_dir() {
            return Err(ConfigError::MissingContent(content));
        }
        Ok(())
    }

    fn validate_models(&self) -> Result<(), ConfigError> {
        let primaries = self.alternatives.values().filter(|a| a.primary).count();
        if primaries > 1 {
            return Err(ConfigError::Validation(format!(
                "{primaries} alternatives are marked primary, at most one is allowed"
            )));
        }

        for (id, model) in &self.models {
            if model.pagination.enabled && model.pagination.per_page == 0 {
                return Err(ConfigError::Validation(format!(
                    "models.{id}.pagination.per_page must be greater than 0"
                )));
            }
            if let Some(child) = &model.child_model
                && !self.models.contains_key(child)
            {
                return Err(ConfigError::Validation(format!(
                    "models.{id}.child_model refers to unknown model `{child}`"
                )));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------------

    pub fn content_dir(&self) -> PathBuf {
        self.root.join(&self.project.content)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(&self.project.templates)
    }

    /// Default output root when none is given on the command line.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.project.output)
    }

    /// Whether `path` is this project's config file.
    pub fn is_config_file(&self, path: &Path) -> bool {
        path == self.config_path
            || (path.file_name().is_some_and(|n| n == CONFIG_FILE)
                && path.parent() == self.config_path.parent())
    }

    // ------------------------------------------------------------------------
    // Alternatives
    // ------------------------------------------------------------------------

    /// All alternates, primary first.
    pub fn alts(&self) -> Vec<Alt> {
        if self.alternatives.is_empty() {
            return vec![Alt::implicit()];
        }
        let primary = self.primary_alt();
        let mut alts = vec![primary.clone()];
        alts.extend(
            self.alternatives
                .keys()
                .map(Alt::new)
                .filter(|alt| *alt != primary),
        );
        alts
    }

    /// Primary alternate: the one marked `primary`, else the first configured.
    pub fn primary_alt(&self) -> Alt {
        self.alternatives
            .iter()
            .find(|(_, cfg)| cfg.primary)
            .or_else(|| self.alternatives.iter().next())
            .map(|(id, _)| Alt::new(id.as_str()))
            .unwrap_or_else(Alt::implicit)
    }

    pub fn is_known_alt(&self, alt: &Alt) -> bool {
        if self.alternatives.is_empty() {
            alt.is_implicit()
        } else {
            self.alternatives.contains_key(alt.as_str())
        }
    }

    pub fn is_primary(&self, alt: &Alt) -> bool {
        *alt == self.primary_alt()
    }

    /// URL prefix of an alternate, always starting and ending with `/`.
    pub fn url_prefix(&self, alt: &Alt) -> String {
        let configured = self
            .alternatives
            .get(alt.as_str())
            .and_then(|cfg| cfg.url_prefix.clone());
        let prefix = match configured {
            Some(prefix) => prefix,
            None if self.is_primary(alt) => String::from("/"),
            None => format!("/{}/", alt.as_str()),
        };
        let trimmed = prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::from("/")
        } else {
            format!("/{trimmed}/")
        }
    }

    // ------------------------------------------------------------------------
    // Models and raw keys
    // ------------------------------------------------------------------------

    pub fn model(&self, id: &str) -> Option<&ModelConfig> {
        self.models.get(id)
    }

    /// Look up a dotted key in the raw config (`project.name`).
    pub fn lookup(&self, key: &str) -> Option<&toml::Value> {
        let mut parts = key.split('.');
        let mut current = self.raw.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    /// Hash of the value at `key`, `None` when the key is absent.
    pub fn value_hash(&self, key: &str) -> Option<ContentHash> {
        self.lookup(key)
            .map(|value| hash_bytes(value.to_string().as_bytes()))
    }

    /// Effective worker count.
    pub fn jobs(&self) -> usize {
        if self.build.jobs > 0 {
            self.build.jobs
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[project]
name = "Demo"

[alternatives.en]
primary = true

[alternatives.de]
url_prefix = "deutsch"

[models.blog]
child_model = "post"
[models.blog.pagination]
enabled = true
per_page = 2

[models.post]
template = "post.html"
"#;

    #[test]
    fn parses_sections_and_defaults() {
        let config = ProjectConfig::from_str(SAMPLE, Path::new("/site")).unwrap();
        assert_eq!(config.project.name.as_deref(), Some("Demo"));
        assert_eq!(config.content_dir(), PathBuf::from("/site/content"));
        assert!(config.model(DEFAULT_MODEL).is_some());
        assert_eq!(config.model("blog").unwrap().pagination.per_page, 2);
    }

    #[test]
    fn alternates_primary_first_with_prefixes() {
        let config = ProjectConfig::from_str(SAMPLE, Path::new("/site")).unwrap();
        assert_eq!(config.alts(), vec![Alt::new("en"), Alt::new("de")]);
        assert_eq!(config.url_prefix(&Alt::new("en")), "/");
        assert_eq!(config.url_prefix(&Alt::new("de")), "/deutsch/");
        assert!(!config.is_known_alt(&Alt::implicit()));
    }

    #[test]
    fn implicit_alt_without_alternatives() {
        let config = ProjectConfig::from_str("", Path::new("/site")).unwrap();
        assert_eq!(config.alts(), vec![Alt::implicit()]);
        assert_eq!(config.url_prefix(&Alt::implicit()), "/");
    }

    #[test]
    fn lookup_and_value_hash() {
        let config = ProjectConfig::from_str(SAMPLE, Path::new("/site")).unwrap();
        assert_eq!(
            config.lookup("project.name").and_then(|v| v.as_str()),
            Some("Demo")
        );
        assert!(config.lookup("project.missing").is_none());

        let other = ProjectConfig::from_str(
            &SAMPLE.replace("name = \"Demo\"", "name = \"Other\""),
            Path::new("/site"),
        )
        .unwrap();
        assert_ne!(config.value_hash("project.name"), other.value_hash("project.name"));
        assert_eq!(config.value_hash("models.blog"), other.value_hash("models.blog"));
        assert_eq!(config.value_hash("nope"), None);
    }

    #[test]
    fn rejects_unknown_child_model() {
        let err = ProjectConfig::from_str(
            "[models.blog]\nchild_model = \"ghost\"\n",
            Path::new("/site"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_two_primaries() {
        let err = ProjectConfig::from_str(
            "[alternatives.a]\nprimary = true\n[alternatives.b]\nprimary = true\n",
            Path::new("/site"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn load_requires_content_dir() {
        let dir = TempDir::new().unwrap();
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingContent(_)));

        std::fs::create_dir(dir.path().join("content")).unwrap();
        assert!(ProjectConfig::load(dir.path()).is_ok());
    }

    #[test]
    fn load_reports_toml_errors() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("content")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[project\n").unwrap();
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(..)));
    }
}
