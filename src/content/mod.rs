//! Content tree: records, attachments and alternates.
//!
//! - [`ContentTree`]: directory snapshot taken at the start of a pass
//! - [`Pad`]: lazy, memoized record access on top of the snapshot
//! - [`FieldParser`]: turns a content file into a [`FieldMap`]

mod fields;
mod pad;
mod parse;
mod record;
mod tree;

pub use fields::FieldMap;
pub use pad::Pad;
pub use parse::{FieldParser, LrParser, ParseError, parse_fields};
pub use record::{Attachment, Page, Record, SourceObject, VirtualSource};
pub use tree::{CONTENTS_FILE, ContentTree, TreeNode};
