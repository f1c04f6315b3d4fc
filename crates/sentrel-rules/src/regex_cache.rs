//! Compiled-regex cache for condition leaves.
//!
//! The condition tree ([`sentrel_model::RuleCondition`]) is a plain,
//! serde-friendly value type with no interior mutability, so a compiled
//! pattern cannot literally be cached on the node the way the design notes
//! describe. This cache achieves the same amortization by keying on the
//! pattern string instead of node identity: evaluating the same pattern
//! twice, whether on the same node or two different nodes, compiles it
//! once. The cache is process-local and never persisted.

use std::collections::HashMap;
use std::sync::Mutex;

use regex::Regex;

use crate::error::{RulesError, RulesResult};

/// A process-local cache of case-insensitively compiled patterns.
#[derive(Default)]
pub struct RegexCache {
    compiled: Mutex<HashMap<String, Regex>>,
}

impl RegexCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a cached compilation of `pattern`, compiling and inserting it
    /// case-insensitively on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidRegex`] if `pattern` fails to compile.
    pub fn get_or_compile(&self, pattern: &str) -> RulesResult<Regex> {
        let mut cache = self.compiled.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(existing) = cache.get(pattern) {
            return Ok(existing.clone());
        }
        let compiled = regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RulesError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })?;
        cache.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_case_insensitively_and_caches() {
        let cache = RegexCache::new();
        let compiled = cache.get_or_compile("^foo$").unwrap();
        assert!(compiled.is_match("FOO"));
        // second call hits the cache path; result must stay consistent.
        let compiled_again = cache.get_or_compile("^foo$").unwrap();
        assert!(compiled_again.is_match("foo"));
    }

    #[test]
    fn invalid_pattern_reports_error() {
        let cache = RegexCache::new();
        assert!(cache.get_or_compile("(unclosed").is_err());
    }
}
