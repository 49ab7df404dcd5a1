//! Stack trace translation through source maps
//!
//! Positions in a trace look like `file:line:column`, optionally wrapped in
//! parentheses. Each one the mapper knows is replaced by the original
//! source position; everything else is left alone.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Maps generated positions back to original sources
pub trait SourceMapper {
    fn map_position(&self, file: &str, line: u32, column: u32) -> Option<SourcePosition>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

static POSITION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?P<file>[^\s():]+(?::[\\/][^\s():]*)?):(?P<line>\d+):(?P<column>\d+)").ok());

/// Rewrite every mappable position in `trace`
pub fn translate(mapper: &dyn SourceMapper, trace: &str) -> String {
    let Some(pattern) = POSITION.as_ref() else {
        return trace.to_string();
    };

    pattern
        .replace_all(trace, |caps: &Captures<'_>| {
            let original = caps[0].to_string();
            let (Ok(line), Ok(column)) = (caps["line"].parse::<u32>(), caps["column"].parse::<u32>()) else {
                return original;
            };
            match mapper.map_position(&caps["file"], line, column) {
                Some(position) => format!("{}:{}:{}", position.file, position.line, position.column),
                None => original,
            }
        })
        .into_owned()
}
