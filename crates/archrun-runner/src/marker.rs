//! Detection of `Error:` lines in archiver output
//!
//! 7-Zip style tools print failures on stdout as
//!
//! ```text
//! Error:
//! Cannot open the file as archive
//! ```
//!
//! or on a single line as `Error: disk full`. The message is the text after the
//! marker on the same line, or the following line when the marker ends its line.
//!
//! Matching happens per delivered chunk. A marker split across two chunks is not
//! detected.

use regex::Regex;

/// Marker at the start of a line, optional line ending, then the captured message.
const ERROR_MARKER_PATTERN: &str = r"(?mR)^Error:[ \t]*(?:\r?\n)?(.*)$";

/// Matcher for error messages embedded in archiver stdout.
///
/// Every invocation builds its own instance; nothing is shared between runs.
#[derive(Debug, Clone)]
pub struct ErrorMarker {
    pattern: Regex,
}

impl ErrorMarker {
    /// Compile the marker pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex error if the pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(ERROR_MARKER_PATTERN)?,
        })
    }

    /// All messages found in `chunk`, in order of appearance.
    ///
    /// Messages are trimmed; markers with nothing after them are skipped.
    #[must_use]
    pub fn messages(&self, chunk: &str) -> Vec<String> {
        self.pattern
            .captures_iter(chunk)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|msg| !msg.is_empty())
            .map(str::to_string)
            .collect()
    }
}
