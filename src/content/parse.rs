//! Field parser seam and the default flat-file format.
//!
//! # Format
//!
//! ```text
//! title: Hello World
//! ---
//! pub_date: 2024-05-01
//! ---
//! body:
//!
//! Multi-line values start on the line after the key.
//! ```
//!
//! Blocks are separated by `---`. Inside a multi-line value, a line of four
//! or more dashes stands for one dash less (`----` is a literal `---`).

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::FieldMap;

/// A content file that could not be turned into fields.
#[derive(Debug, Clone, Error)]
#[error("failed to parse `{}`: {cause}", path.display())]
pub struct ParseError {
    pub path: PathBuf,
    pub cause: String,
}

impl ParseError {
    pub fn new(path: impl Into<PathBuf>, cause: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cause: cause.into(),
        }
    }
}

/// Turns one content file into a field mapping.
pub trait FieldParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<FieldMap, ParseError>;
}

/// Parser for the `key: value` / `---` block format.
#[derive(Debug, Default, Clone, Copy)]
pub struct LrParser;

impl FieldParser for LrParser {
    fn parse(&self, path: &Path) -> Result<FieldMap, ParseError> {
        let bytes = fs::read(path).map_err(|e| ParseError::new(path, e.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ParseError::new(path, "content is not valid UTF-8"))?;
        parse_fields(&text).map_err(|cause| ParseError::new(path, cause))
    }
}

/// Parse the block format from a string.
pub fn parse_fields(text: &str) -> Result<FieldMap, String> {
    let mut fields = FieldMap::new();

    for (index, block) in split_blocks(text).iter().enumerate() {
        let mut lines = block.iter().skip_while(|l| l.trim().is_empty());
        let Some(first) = lines.next() else {
            continue;
        };

        let Some((key, value)) = first.split_once(':') else {
            return Err(format!(
                "block {}: expected `key: value`, found `{}`",
                index + 1,
                first.trim()
            ));
        };

        let key = key.trim();
        if !is_valid_key(key) {
            return Err(format!("block {}: invalid field name `{key}`", index + 1));
        }

        let rest: Vec<&str> = lines.copied().collect();
        let value = value.trim();
        if value.is_empty() {
            fields.insert(key, multiline_value(&rest));
        } else if rest.iter().any(|l| !l.trim().is_empty()) {
            return Err(format!(
                "block {}: unexpected text after single-line field `{key}`",
                index + 1
            ));
        } else {
            fields.insert(key, value);
        }
    }

    Ok(fields)
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = vec![Vec::new()];
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim_end() == "---" {
            blocks.push(Vec::new());
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }
    blocks
}

/// Join the value lines, trimming blank edges and unescaping dash lines.
fn multiline_value(lines: &[&str]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(start), Some(end)) = (start, end) else {
        return String::new();
    };

    lines[start..=end]
        .iter()
        .map(|line| {
            let trimmed = line.trim_end();
            if trimmed.len() >= 4 && trimmed.chars().all(|c| c == '-') {
                &trimmed[1..]
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_single_and_multiline_fields() {
        let text = "title: Hello\n---\nbody:\n\nFirst line\n----\nLast line\n\n---\n_slug: hi\n";
        let fields = parse_fields(text).unwrap();
        assert_eq!(fields.get("title"), Some("Hello"));
        assert_eq!(fields.get("body"), Some("First line\n---\nLast line"));
        assert_eq!(fields.get("_slug"), Some("hi"));
    }

    #[test]
    fn empty_blocks_are_skipped() {
        let fields = parse_fields("\n---\n\n---\ntitle: x\n").unwrap();
        assert_eq!(fields.len(), 1);
        assert!(parse_fields("").unwrap().is_empty());
    }

    #[test]
    fn last_duplicate_wins() {
        let fields = parse_fields("title: a\n---\ntitle: b\n").unwrap();
        assert_eq!(fields.get("title"), Some("b"));
    }

    #[test]
    fn rejects_block_without_key() {
        let err = parse_fields("just some text\n").unwrap_err();
        assert!(err.contains("expected `key: value`"));
    }

    #[test]
    fn rejects_invalid_key() {
        assert!(parse_fields("bad key: x\n").is_err());
    }

    #[test]
    fn rejects_trailing_text_after_single_line_value() {
        assert!(parse_fields("title: a\nstray\n").is_err());
    }

    #[test]
    fn parser_reports_file_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contents.lr");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = LrParser.parse(&path).unwrap_err();
        assert_eq!(err.path, path);
        assert!(err.cause.contains("UTF-8"));
    }
}
