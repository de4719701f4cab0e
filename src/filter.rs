//! Include/exclude filtering of schema objects by name.
//!
//! Each include or exclude entry is itself a comma-separated list of
//! case-insensitive regular expressions. Patterns are unanchored, so
//! `article` matches `t_article`.

use crate::error::{DescribeError, Result};
use regex::{Regex, RegexBuilder};

/// Compiled include/exclude pattern lists
#[derive(Debug, Clone, Default)]
pub struct ObjectFilter {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
}

impl ObjectFilter {
    /// Compile include and exclude entries, failing on the first invalid sub-pattern
    pub fn new<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> Result<Self> {
        Ok(Self {
            includes: compile_entries(includes)?,
            excludes: compile_entries(excludes)?,
        })
    }

    /// A filter that keeps everything
    pub fn keep_all() -> Self {
        Self::default()
    }

    /// Whether the object called `name` should be left out
    pub fn should_skip(&self, name: &str) -> bool {
        if !self.includes.is_empty() && !self.includes.iter().any(|re| re.is_match(name)) {
            return true;
        }
        self.excludes.iter().any(|re| re.is_match(name))
    }
}

/// One-shot form of [`ObjectFilter::should_skip`] over raw entries.
pub fn should_skip<S: AsRef<str>>(name: &str, includes: &[S], excludes: &[S]) -> Result<bool> {
    Ok(ObjectFilter::new(includes, excludes)?.should_skip(name))
}

fn compile_entries<S: AsRef<str>>(entries: &[S]) -> Result<Vec<Regex>> {
    let mut compiled = Vec::new();
    for entry in entries {
        for pattern in entry.as_ref().split(',').map(str::trim) {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| DescribeError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            compiled.push(re);
        }
    }
    Ok(compiled)
}
