//! Decision Engine
//!
//! Pure block/allow decisions for a single entry. Rules are evaluated in a
//! fixed order and the first match wins:
//!
//! 1. name patterns (case-insensitive regexes, in ruleset order)
//! 2. tags
//! 3. explicit identifiers
//!
//! Patterns are compiled from the ruleset every time a [`CompiledRuleset`] is
//! built, once per pass, so decisions always reflect the latest rules. A
//! pattern that fails to compile is logged and skipped; it never hides the
//! remaining rules.

use std::fmt;

use fancy_regex::Regex;
use log::{debug, warn};

use crate::error::FilterError;
use crate::types::{EntryDescriptor, Ruleset};

/// Which rule caused an entry to be blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// `name_patterns[index]` matched the entry name.
    NamePattern { index: usize, pattern: String },
    /// The entry carries this (lowercased) tag.
    Tag(String),
    /// The entry identifier is explicitly blocked.
    Id(String),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::NamePattern { pattern, .. } => write!(f, "name matches /{}/i", pattern),
            BlockReason::Tag(tag) => write!(f, "tag \"{}\"", tag),
            BlockReason::Id(id) => write!(f, "server id {}", id),
        }
    }
}

/// Compile one name pattern as a case-insensitive regex.
pub fn compile_pattern(pattern: &str) -> Result<Regex, FilterError> {
    Regex::new(&format!("(?i){}", pattern)).map_err(|e| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// A ruleset with its name patterns compiled, valid for one pass.
pub struct CompiledRuleset<'a> {
    ruleset: &'a Ruleset,
    patterns: Vec<(usize, Regex)>,
    tags: Vec<String>,
    invalid_patterns: usize,
}

impl<'a> CompiledRuleset<'a> {
    /// Compile every name pattern, skipping (and logging) invalid ones.
    pub fn compile(ruleset: &'a Ruleset) -> Self {
        let mut patterns = Vec::with_capacity(ruleset.name_patterns.len());
        let mut invalid_patterns = 0;

        for (index, pattern) in ruleset.name_patterns.iter().enumerate() {
            match compile_pattern(pattern) {
                Ok(regex) => patterns.push((index, regex)),
                Err(e) => {
                    warn!("DisFilter: skipping rule: {}", e);
                    invalid_patterns += 1;
                }
            }
        }

        Self {
            ruleset,
            patterns,
            tags: ruleset.tags.iter().map(|tag| tag.to_lowercase()).collect(),
            invalid_patterns,
        }
    }

    /// Number of name patterns that failed to compile.
    pub fn invalid_patterns(&self) -> usize {
        self.invalid_patterns
    }

    /// The first rule blocking `entry`, if any.
    pub fn explain(&self, entry: &EntryDescriptor) -> Option<BlockReason> {
        for (index, regex) in &self.patterns {
            match regex.is_match(&entry.name) {
                Ok(true) => {
                    return Some(BlockReason::NamePattern {
                        index: *index,
                        pattern: self.ruleset.name_patterns[*index].clone(),
                    });
                }
                Ok(false) => {}
                Err(e) => debug!(
                    "DisFilter: pattern {:?} failed on {:?}: {}",
                    self.ruleset.name_patterns[*index], entry.name, e
                ),
            }
        }

        if let Some(tag) = self.tags.iter().find(|tag| entry.has_tag(tag)) {
            return Some(BlockReason::Tag(tag.clone()));
        }

        match &entry.id {
            Some(id) if self.ruleset.contains_id(id) => Some(BlockReason::Id(id.clone())),
            _ => None,
        }
    }

    pub fn should_block(&self, entry: &EntryDescriptor) -> bool {
        self.explain(entry).is_some()
    }

    /// Final verdict including the global switch: disabled means allow.
    pub fn decide(&self, entry: &EntryDescriptor, enabled: bool) -> bool {
        enabled && self.should_block(entry)
    }
}

/// Whether the ruleset blocks `entry`, ignoring the global switch.
pub fn should_block(entry: &EntryDescriptor, ruleset: &Ruleset) -> bool {
    CompiledRuleset::compile(ruleset).should_block(entry)
}

/// The first rule blocking `entry`, ignoring the global switch.
pub fn explain(entry: &EntryDescriptor, ruleset: &Ruleset) -> Option<BlockReason> {
    CompiledRuleset::compile(ruleset).explain(entry)
}
