//! `[models.*]` and `[alternatives.*]` sections.

use serde::Deserialize;

/// Model id used when neither the record nor its parent names one.
pub const DEFAULT_MODEL: &str = "page";

/// A record model: template, child defaults, ordering and pagination.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Display name
    pub name: Option<String>,
    /// Template id, defaults to `<model>.html`
    pub template: Option<String>,
    /// Model assigned to children without `_model`
    pub child_model: Option<String>,
    /// Child ordering: field names, `-` prefix for descending
    pub order_by: Vec<String>,
    /// Allowed field names; `None` allows any field
    pub fields: Option<Vec<String>>,
    /// Hide records of this model (and their subtrees) from the build
    pub hidden: bool,
    pub pagination: PaginationConfig,
}

impl ModelConfig {
    /// Template id for records of model `id`.
    pub fn template_for(&self, id: &str) -> String {
        self.template.clone().unwrap_or_else(|| format!("{id}.html"))
    }

    /// Whether `field` may appear in content files of this model.
    ///
    /// System fields (leading `_`) are always allowed.
    pub fn allows_field(&self, field: &str) -> bool {
        field.starts_with('_')
            || self
                .fields
                .as_ref()
                .is_none_or(|allowed| allowed.iter().any(|f| f == field))
    }
}

/// `[models.<id>.pagination]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub enabled: bool,
    pub per_page: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            per_page: 20,
        }
    }
}

/// `[alternatives.<id>]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AltConfig {
    pub name: Option<String>,
    pub primary: bool,
    /// URL prefix, defaults to `/` for the primary and `/<id>/` otherwise
    pub url_prefix: Option<String>,
}
