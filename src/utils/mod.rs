//! Utility functions.
//!
//! - [`fs`]: atomic writes, output cleanup, project-relative path keys
//! - [`html`]: escaping for rendered field values

pub mod fs;
pub mod html;

/// `"1 page"`, `"3 pages"`. Nouns are plain English, pluralized with `s`.
pub fn plural_count(count: usize, noun: &str) -> String {
    match count {
        1 => format!("1 {noun}"),
        n => format!("{n} {noun}s"),
    }
}
