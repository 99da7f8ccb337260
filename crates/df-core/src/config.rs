//! Engine configuration
//!
//! The defaults describe the disboard.org listing markup. Every selector the
//! engine uses lives here so a markup change is a one-line fix.

use std::time::Duration;

use serde::Deserialize;

/// Selectors, class names and timings used by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    /// Entry containers, evaluated in document order every pass.
    pub container_selector: String,
    /// The card inside a container. Containers without one are skipped.
    pub card_selector: String,
    /// Name field inside a card.
    pub name_selector: String,
    /// Tag labels inside a card.
    pub tag_selector: String,
    /// Shape of a single entry container (mutation relevance, hidden count).
    pub entry_selector: String,
    /// Shape of the list root (mutation relevance).
    pub list_root_selector: String,
    /// Element id observed for mutations; falls back to `<body>` when missing.
    pub observe_root_id: String,
    /// Marker class attached to hidden containers.
    pub hidden_class: String,
    /// Prefix of the class token carrying the entry identifier.
    pub id_prefix: String,
    /// Class of the injected toggle control.
    pub toggle_class: String,
    /// Class added to a toggle whose identifier is blocked.
    pub toggle_blocked_class: String,
    /// Attribute binding a toggle to its identifier.
    pub toggle_id_attribute: String,
    /// Id of the injected `<style>` element.
    pub style_id: String,
    /// Class of the transient confirmation element.
    pub toast_class: String,
    /// Debounce delay for mutation bursts, in milliseconds.
    pub debounce_ms: u64,
    /// How long a confirmation notification stays visible, in milliseconds.
    pub notification_ms: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            container_selector: ".columns.is-multiline > .column".to_string(),
            card_selector: ".listing-card".to_string(),
            name_selector: ".server-name".to_string(),
            tag_selector: ".server-tags ul li span.name".to_string(),
            entry_selector: ".column".to_string(),
            list_root_selector: ".listings".to_string(),
            observe_root_id: "listings".to_string(),
            hidden_class: "disfilter-hidden".to_string(),
            id_prefix: "server-".to_string(),
            toggle_class: "disfilter-toggle".to_string(),
            toggle_blocked_class: "disfilter-toggle-blocked".to_string(),
            toggle_id_attribute: "data-disfilter-id".to_string(),
            style_id: "disfilter-style".to_string(),
            toast_class: "disfilter-toast".to_string(),
            debounce_ms: 150,
            notification_ms: 1000,
        }
    }
}

impl FilterConfig {
    /// Selector matching every container currently carrying the marker.
    pub fn hidden_selector(&self) -> String {
        format!("{}.{}", self.entry_selector, self.hidden_class)
    }

    /// Selector matching an existing toggle inside a container.
    pub fn toggle_selector(&self) -> String {
        format!(".{}", self.toggle_class)
    }

    /// Selector matching every toggle bound to `id`.
    pub fn toggle_selector_for(&self, id: &str) -> String {
        format!("[{}=\"{}\"]", self.toggle_id_attribute, id)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }
}
