//! Alternate (locale) identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one alternate of the content tree (usually a locale).
///
/// Projects without configured alternatives use a single implicit primary
/// alternate named [`Alt::IMPLICIT`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alt(String);

impl Alt {
    /// Id of the implicit primary alternate.
    pub const IMPLICIT: &'static str = "_primary";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The alternate used when no alternatives are configured.
    pub fn implicit() -> Self {
        Self(Self::IMPLICIT.to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_implicit(&self) -> bool {
        self.0 == Self::IMPLICIT
    }
}

impl fmt::Display for Alt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
