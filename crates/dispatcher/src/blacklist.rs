//! Compiled metric-name blacklist

use regex::Regex;

use crate::error::DispatcherError;

/// Partial-match patterns of metric names to drop
///
/// Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    patterns: Vec<Regex>,
}

impl Blacklist {
    /// Compile the patterns of one collector
    pub fn compile(collector: &str, patterns: &[String]) -> Result<Self, DispatcherError> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| DispatcherError::invalid_pattern(collector, p, e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// First pattern matching `name`, if any
    pub fn matching(&self, name: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|re| re.is_match(name))
            .map(Regex::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
