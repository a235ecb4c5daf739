//! Per-run options.
//!
//! Nothing is persisted between runs; every invocation describes its plugins,
//! path filter, timeout and change source through [`RunOptions`].

use std::str::FromStr;
use std::time::Duration;

use crate::filter::FilterConfig;
use crate::plugin::Plugin;

/// Default time a single plugin may run before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Which changes the plugins are run against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChangeSource {
    /// Changes staged in the index relative to HEAD
    #[default]
    Staged,
    /// Changes between two revisions
    Range { from: String, to: String },
}

impl ChangeSource {
    pub fn range(from: impl Into<String>, to: impl Into<String>) -> Self {
        ChangeSource::Range {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl FromStr for ChangeSource {
    type Err = String;

    /// Parse `FROM..TO`; an empty side defaults to `HEAD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once("..")
            .ok_or_else(|| format!("expected FROM..TO, got '{}'", s))?;
        if to.starts_with('.') {
            return Err(format!("symmetric ranges are not supported: '{}'", s));
        }
        let side = |rev: &str| {
            if rev.trim().is_empty() {
                "HEAD".to_string()
            } else {
                rev.trim().to_string()
            }
        };
        Ok(ChangeSource::range(side(from), side(to)))
    }
}

/// Everything a check needs besides the repository path.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Plugins to run, in order
    pub plugins: Vec<Plugin>,
    /// Which changed files plugins see
    pub filter: FilterConfig,
    /// Time limit per plugin
    pub timeout: Duration,
    /// Which changes to inspect
    pub source: ChangeSource,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            filter: FilterConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            source: ChangeSource::default(),
        }
    }
}

impl RunOptions {
    /// Create default options (no plugins, staged changes, 60s timeout).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the plugins
    pub fn plugins(mut self, plugins: Vec<Plugin>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Builder: add one plugin
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Builder: set the path filter
    pub fn filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Builder: set the per-plugin timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: set the change source
    pub fn source(mut self, source: ChangeSource) -> Self {
        self.source = source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RunOptions::new();
        assert!(options.plugins.is_empty());
        assert!(options.filter.is_empty());
        assert_eq!(options.timeout, Duration::from_secs(60));
        assert_eq!(options.source, ChangeSource::Staged);
    }

    #[test]
    fn test_builder() {
        let options = RunOptions::new()
            .plugin(Plugin::parse("a=true", 0).unwrap())
            .filter(FilterConfig::new().include("*.py").unwrap())
            .timeout(Duration::from_secs(5))
            .source(ChangeSource::range("HEAD~1", "HEAD"));

        assert_eq!(options.plugins.len(), 1);
        assert_eq!(options.filter.include.len(), 1);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.source, ChangeSource::range("HEAD~1", "HEAD"));
    }

    #[test]
    fn test_range_from_str() {
        assert_eq!(
            "main..feature".parse::<ChangeSource>().unwrap(),
            ChangeSource::range("main", "feature")
        );
        assert_eq!(
            "HEAD~3..".parse::<ChangeSource>().unwrap(),
            ChangeSource::range("HEAD~3", "HEAD")
        );
        assert!("HEAD".parse::<ChangeSource>().is_err());
        assert!("a...b".parse::<ChangeSource>().is_err());
    }
}
