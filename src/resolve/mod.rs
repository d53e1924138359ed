//! Virtual path resolution: from records to the artifacts they produce.
//!
//! - [`pagination`]: numeric `@<n>` suffixes of paginated listings
//! - [`GeneratorRegistry`]: extension-defined `@<suffix>` sources
//! - [`ArtifactSet`]: the enumerated output set of one pass

mod artifact;
pub mod pagination;
mod registry;

pub use artifact::{Artifact, ArtifactSet, OutputConflict, Producer};
pub use registry::{GeneratedSource, GeneratorRegistry, VirtualSourceGenerator};
