//! In-memory filter state
//!
//! Owned by a single [`crate::Filter`]. Ruleset and switch are replaced
//! wholesale by sync events; the hidden count is only ever written from a DOM
//! count taken at the end of a pass.

use crate::protocol::PersistedState;
use crate::types::Ruleset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    ruleset: Ruleset,
    enabled: bool,
    hidden_count: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            ruleset: Ruleset::default(),
            enabled: true,
            hidden_count: 0,
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current ruleset and switch.
    pub fn state(&self) -> (&Ruleset, bool) {
        (&self.ruleset, self.enabled)
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Hidden entries counted by the most recent pass.
    pub fn hidden_count(&self) -> usize {
        self.hidden_count
    }

    pub fn replace_ruleset(&mut self, ruleset: Ruleset) {
        self.ruleset = ruleset;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Adopt persisted values; absent keys fall back to defaults.
    pub fn load(&mut self, persisted: PersistedState) {
        self.ruleset = persisted.settings.unwrap_or_default();
        self.enabled = persisted.enabled.unwrap_or(true);
    }

    /// Flip explicit-id membership and return whether `id` is now blocked.
    pub fn toggle_id(&mut self, id: &str) -> bool {
        self.ruleset.toggle_id(id)
    }

    pub(crate) fn record_hidden_count(&mut self, count: usize) {
        self.hidden_count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = FilterState::new();
        assert!(state.is_enabled());
        assert!(state.ruleset().is_empty());
        assert_eq!(state.hidden_count(), 0);
    }

    #[test]
    fn test_load_replaces_wholesale() {
        let mut state = FilterState::new();
        state.replace_ruleset(Ruleset {
            tags: vec!["old".into()],
            ..Ruleset::default()
        });
        state.set_enabled(false);

        state.load(PersistedState {
            settings: Some(Ruleset {
                ids: vec!["1".into()],
                ..Ruleset::default()
            }),
            enabled: None,
        });

        let (ruleset, enabled) = state.state();
        assert!(enabled);
        assert!(ruleset.tags.is_empty());
        assert_eq!(ruleset.ids, vec!["1"]);
    }
}
