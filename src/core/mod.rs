//! Core types - pure abstractions shared across the codebase.

mod alt;
mod cancel;
mod path;

pub use alt::Alt;
pub use cancel::CancelToken;
pub use path::{ArtifactPath, RecordPath, VIRTUAL_MARKER, split_virtual, url_dir, url_join};
