//! Splitting raw object comments into a logical name and a summary.

/// Split a raw comment on the first occurrence of `delimiter`.
///
/// Returns `(logical_name, summary)`. The summary is empty when the delimiter
/// does not occur; a missing comment is treated as the empty string. The
/// delimiter is validated as non-empty by configuration before this is called.
pub fn split(raw: Option<&str>, delimiter: &str) -> (String, String) {
    let raw = raw.unwrap_or("");
    if delimiter.is_empty() {
        return (raw.to_string(), String::new());
    }
    match raw.split_once(delimiter) {
        Some((logical_name, summary)) => (logical_name.to_string(), summary.to_string()),
        None => (raw.to_string(), String::new()),
    }
}

/// A comment split into its two halves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitComment {
    pub logical_name: String,
    pub summary: String,
}

impl SplitComment {
    pub fn new(raw: Option<&str>, delimiter: &str) -> Self {
        let (logical_name, summary) = split(raw, delimiter);
        Self {
            logical_name,
            summary,
        }
    }
}
