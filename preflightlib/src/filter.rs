//! Path filtering with glob pattern support.
//!
//! Changed files are matched by their repository-relative name against
//! include/exclude glob patterns before any plugin sees them.

use std::path::Path;

use glob::Pattern;

use crate::error::PreflightError;
use crate::Result;

/// Configuration for file filtering.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Glob patterns to include (if empty, include every file)
    pub include: Vec<Pattern>,
    /// Glob patterns to exclude
    pub exclude: Vec<Pattern>,
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| PreflightError::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

impl FilterConfig {
    /// Create a new empty filter config (includes every file).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: &str) -> Result<Self> {
        self.include.push(compile(pattern)?);
        Ok(self)
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        self.exclude.push(compile(pattern)?);
        Ok(self)
    }

    /// Add multiple include patterns.
    pub fn include_many<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        for pattern in patterns {
            self = self.include(pattern.as_ref())?;
        }
        Ok(self)
    }

    /// Add multiple exclude patterns.
    pub fn exclude_many<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        for pattern in patterns {
            self = self.exclude(pattern.as_ref())?;
        }
        Ok(self)
    }

    /// Whether no pattern was configured at all.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Check if a path matches the filter criteria.
    ///
    /// A path matches if it matches at least one include pattern (or include
    /// is empty) and no exclude pattern.
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();

        if self.exclude.iter().any(|p| p.matches_path(path)) {
            return false;
        }

        self.include.is_empty() || self.include.iter().any(|p| p.matches_path(path))
    }
}
