//! Core type definitions for DisFilter
//!
//! [`Ruleset`] mirrors the `disfilterSettings` value written by the settings
//! editor, so its serde shape is part of the persisted format.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

// =============================================================================
// Ruleset
// =============================================================================

/// The full set of user-defined blocking rules.
///
/// Lists keep the order the user entered them in. Membership checks treat
/// them as sets, and [`Ruleset::toggle_id`] never introduces duplicates.
///
/// Reading is lenient: missing keys, `null` lists and the
/// older `namePatterns`/`ids` keys all load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Ruleset {
    /// Regex sources matched case-insensitively against entry names.
    #[serde(rename = "regexPatterns")]
    pub name_patterns: Vec<String>,
    /// Tags, compared lowercase.
    pub tags: Vec<String>,
    /// Explicitly blocked server identifiers.
    #[serde(rename = "serverIds")]
    pub ids: Vec<String>,
}

impl Ruleset {
    /// True when no rule of any kind is configured.
    pub fn is_empty(&self) -> bool {
        self.name_patterns.is_empty() && self.tags.is_empty() && self.ids.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.iter().any(|blocked| blocked == id)
    }

    /// Flip explicit-id membership and return whether `id` is now blocked.
    pub fn toggle_id(&mut self, id: &str) -> bool {
        if self.contains_id(id) {
            self.ids.retain(|blocked| blocked != id);
            false
        } else {
            self.ids.push(id.to_string());
            true
        }
    }
}

/// Stored form of a [`Ruleset`]. Upstream writers occasionally store `null`
/// for an empty list.
#[derive(Deserialize, Default)]
#[serde(default)]
struct StoredRuleset {
    #[serde(rename = "regexPatterns", alias = "namePatterns")]
    name_patterns: Option<Vec<String>>,
    tags: Option<Vec<String>>,
    #[serde(rename = "serverIds", alias = "ids")]
    ids: Option<Vec<String>>,
}

impl<'de> Deserialize<'de> for Ruleset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let stored = StoredRuleset::deserialize(deserializer)?;
        Ok(Ruleset {
            name_patterns: stored.name_patterns.unwrap_or_default(),
            tags: stored.tags.unwrap_or_default(),
            ids: stored.ids.unwrap_or_default(),
        })
    }
}

// =============================================================================
// Entry Descriptor
// =============================================================================

/// Structured view of one listing card, rebuilt every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryDescriptor {
    /// Trimmed server name, empty when the card has no name field.
    pub name: String,
    /// Lowercased tag labels in card order.
    pub tags: Vec<String>,
    /// Digits of the `server-<digits>` class token.
    pub id: Option<String>,
}

impl EntryDescriptor {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|own| own == tag)
    }
}
