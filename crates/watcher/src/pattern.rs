//! Name pattern deciding which files get a streaming session
//!
//! The pattern is tested against the full joined path of a candidate,
//! not its basename, so directory components can take part in a match.

use regex::Regex;
use std::path::Path;

/// Pattern used when none is configured
pub const DEFAULT_PATTERN: &str = r".*\.(fastq|fq)";

/// Compiled file name filter
#[derive(Clone, Debug)]
pub struct NameFilter {
    regex: Regex,
}

impl NameFilter {
    /// Compile a filter; malformed patterns are rejected
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Check whether the full path matches
    pub fn matches(&self, path: &Path) -> bool {
        self.regex.is_match(&path.to_string_lossy())
    }

    /// Source pattern text
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN).expect("default pattern compiles")
    }
}
