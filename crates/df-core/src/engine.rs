//! The filter instance
//!
//! [`Filter`] owns the state container and the scheduler, and runs passes
//! against a [`Document`]. Every entry point is driven by the host's single
//! event loop: store load, inbound messages, mutation batches, the debounce
//! timer and toggle activations.

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::FilterConfig;
use crate::controls;
use crate::decision::CompiledRuleset;
use crate::dom::{Document, Element};
use crate::error::FilterError;
use crate::extract::extract;
use crate::protocol::{Channel, InboundMessage, OutboundMessage, PersistedState, ProtocolError, Store};
use crate::scheduler::{ChangeScheduler, Timer};
use crate::state::FilterState;
use crate::visibility::{self, Transition};

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Containers holding a card, evaluated this pass.
    pub evaluated: usize,
    /// Containers without a card.
    pub skipped: usize,
    /// Markers attached.
    pub hidden: usize,
    /// Markers removed.
    pub revealed: usize,
    /// Toggles created.
    pub injected: usize,
    /// Name patterns skipped because they did not compile.
    pub invalid_patterns: usize,
    /// Marked containers in the DOM after the pass.
    pub hidden_count: usize,
}

impl PassReport {
    /// Marker mutations performed.
    pub fn transitions(&self) -> usize {
        self.hidden + self.revealed
    }
}

pub struct Filter<D, T, C, S>
where
    D: Document,
    T: Timer,
    C: Channel,
    S: Store,
{
    document: D,
    scheduler: ChangeScheduler<T>,
    channel: C,
    store: S,
    state: FilterState,
    config: FilterConfig,
}

impl<D, T, C, S> Filter<D, T, C, S>
where
    D: Document,
    T: Timer,
    C: Channel,
    S: Store,
{
    pub fn new(document: D, timer: T, channel: C, store: S, config: FilterConfig) -> Self {
        Self {
            scheduler: ChangeScheduler::new(timer, config.debounce()),
            document,
            channel,
            store,
            state: FilterState::new(),
            config,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn scheduler(&self) -> &ChangeScheduler<T> {
        &self.scheduler
    }

    /// Adopt the startup read of the store and run the first pass.
    ///
    /// A failed read keeps the defaults (empty ruleset, enabled).
    pub fn load(&mut self, persisted: Result<PersistedState, FilterError>) -> PassReport {
        match persisted {
            Ok(persisted) => {
                self.state.load(persisted);
                info!(
                    "DisFilter: loaded {} patterns, {} tags, {} ids (enabled: {})",
                    self.state.ruleset().name_patterns.len(),
                    self.state.ruleset().tags.len(),
                    self.state.ruleset().ids.len(),
                    self.state.is_enabled()
                );
            }
            Err(e) => warn!("DisFilter: settings unavailable, using defaults: {}", e),
        }
        self.run_pass()
    }

    /// Apply one control message. Returns the pass it forced, if any.
    pub fn handle_message(&mut self, message: InboundMessage) -> Option<PassReport> {
        match message {
            InboundMessage::UpdateSettings(payload) => {
                self.state.replace_ruleset(payload.settings);
                Some(self.run_pass())
            }
            InboundMessage::ToggleBlocking(payload) => {
                self.state.set_enabled(payload.is_enabled);
                Some(self.run_pass())
            }
            InboundMessage::RequestBlockedCount => {
                self.report_count();
                None
            }
        }
    }

    /// Decode and apply a raw `{ type, payload }` message. Undecodable
    /// messages are logged and leave the state untouched.
    pub fn handle_raw_message(&mut self, raw: Value) -> Option<PassReport> {
        match InboundMessage::from_value(raw) {
            Ok(message) => self.handle_message(message),
            Err(ProtocolError::UnknownType(kind)) => {
                debug!("DisFilter: ignoring message type {}", kind);
                None
            }
            Err(e) => {
                warn!("DisFilter: dropping control message: {}", e);
                None
            }
        }
    }

    /// Feed the element nodes added by one mutation batch.
    pub fn on_mutations(&mut self, added: &[D::Element]) -> bool {
        self.scheduler.observe(added, &self.config)
    }

    /// The debounce timer elapsed.
    pub fn on_timer(&mut self) -> Option<PassReport> {
        if self.scheduler.fire() {
            Some(self.run_pass())
        } else {
            None
        }
    }

    /// Activate the block toggle for `id`: flip explicit membership, persist,
    /// re-render every toggle bound to `id`, confirm, re-evaluate.
    pub fn toggle_id(&mut self, id: &str) -> PassReport {
        let was_blocked = self.state.ruleset().contains_id(id);
        let blocked = self.state.toggle_id(id);
        debug_assert_ne!(was_blocked, blocked);

        if let Err(e) = self.store.save_ruleset(self.state.ruleset()) {
            warn!("DisFilter: could not persist toggle for server {}: {}", id, e);
        }

        let toggles = controls::refresh_toggles(&self.document, id, blocked, &self.config);
        debug!("DisFilter: server {} blocked={} ({} toggles)", id, blocked, toggles);

        // The cards for `id` may have just collapsed, so the toast carries
        // its own toggle.
        let undo = controls::new_toggle(&self.document, id, blocked, &self.config);
        self.document.notify(
            &controls::confirmation(id, blocked),
            undo.as_ref(),
            self.config.notification_duration(),
        );
        self.run_pass()
    }

    /// Evaluate every entry currently in the document.
    pub fn run_pass(&mut self) -> PassReport {
        let mut report = PassReport::default();
        {
            let compiled = CompiledRuleset::compile(self.state.ruleset());
            let enabled = self.state.is_enabled();
            report.invalid_patterns = compiled.invalid_patterns();

            for container in self.document.query_selector_all(&self.config.container_selector) {
                let Some(card) = container.query_selector(&self.config.card_selector) else {
                    report.skipped += 1;
                    continue;
                };
                report.evaluated += 1;

                let entry = extract(&card, &self.config);
                match visibility::apply(&container, compiled.decide(&entry, enabled), &self.config) {
                    Transition::Hidden => report.hidden += 1,
                    Transition::Revealed => report.revealed += 1,
                    Transition::Unchanged => {}
                }

                if let Some(id) = &entry.id {
                    let blocked = self.state.ruleset().contains_id(id);
                    if controls::ensure_toggle(&self.document, &container, &card, id, blocked, &self.config)
                        .is_some()
                    {
                        report.injected += 1;
                    }
                }
            }
        }

        report.hidden_count = visibility::count_hidden(&self.document, &self.config);
        self.state.record_hidden_count(report.hidden_count);
        debug!(
            "DisFilter: pass evaluated {} entries (+{} hidden, -{} revealed), {} hidden",
            report.evaluated, report.hidden, report.revealed, report.hidden_count
        );

        self.report_count();
        report
    }

    /// Push the last hidden count to the control surface. Best effort.
    pub fn report_count(&self) {
        let message = OutboundMessage::UpdateBlockedCount {
            count: self.state.hidden_count(),
        };
        if let Err(e) = self.channel.send(&message) {
            debug!("DisFilter: count not delivered: {}", e);
        }
    }

    /// Cancel any pending pass.
    pub fn stop(&mut self) {
        self.scheduler.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::memory::{MemoryDocument, MemoryElement};
    use crate::protocol::{MemoryStore, RecordingChannel};
    use crate::scheduler::ManualTimer;
    use crate::types::Ruleset;

    type TestFilter = Filter<MemoryDocument, ManualTimer, RecordingChannel, MemoryStore>;

    fn card(id: u32, name: &str) -> MemoryElement {
        MemoryElement::new("div").with_class("column").with_child(
            MemoryElement::new("div")
                .with_class(&format!("listing-card server-{}", id))
                .with_child(MemoryElement::new("h3").with_class("server-name").with_text(name)),
        )
    }

    fn filter(names: &[&str]) -> (TestFilter, RecordingChannel) {
        let document = MemoryDocument::new();
        let list = MemoryElement::new("div").with_class("columns is-multiline");
        for (i, name) in names.iter().enumerate() {
            list.append_child(&card(i as u32 + 1, name));
        }
        document.body().append_child(&list);

        let channel = RecordingChannel::new();
        let filter = Filter::new(
            document,
            ManualTimer::new(),
            channel.clone(),
            MemoryStore::new(),
            FilterConfig::default(),
        );
        (filter, channel)
    }

    #[test]
    fn test_load_runs_a_pass_and_reports() {
        let (mut filter, channel) = filter(&["Test Server", "Other Server"]);
        let report = filter.load(Ok(PersistedState {
            settings: Some(Ruleset {
                name_patterns: vec!["^Test".into()],
                ..Ruleset::default()
            }),
            enabled: None,
        }));

        assert_eq!(report.evaluated, 2);
        assert_eq!(report.hidden, 1);
        assert_eq!(report.injected, 2);
        assert_eq!(report.hidden_count, 1);
        assert_eq!(channel.last_count(), Some(1));
    }

    #[test]
    fn test_failed_load_allows_everything() {
        let (mut filter, channel) = filter(&["Test Server"]);
        let report = filter.load(Err(FilterError::Store("unavailable".into())));
        assert_eq!(report.hidden_count, 0);
        assert!(filter.state().is_enabled());
        assert_eq!(channel.last_count(), Some(0));
    }

    #[test]
    fn test_request_count_does_not_run_a_pass() {
        let (mut filter, channel) = filter(&["Test Server"]);
        filter.load(Ok(PersistedState::default()));
        let sent = channel.sent().len();

        assert!(filter.handle_message(InboundMessage::RequestBlockedCount).is_none());
        assert_eq!(channel.sent().len(), sent + 1);
        assert_eq!(channel.last_count(), Some(0));
    }

    #[test]
    fn test_raw_garbage_is_ignored() {
        let (mut filter, _) = filter(&["Test Server"]);
        let before = filter.state().clone();
        assert!(filter.handle_raw_message(serde_json::json!({"type": "UPDATE_SETTINGS", "payload": 3})).is_none());
        assert!(filter.handle_raw_message(serde_json::json!({"type": "PING"})).is_none());
        assert_eq!(filter.state(), &before);
    }

    #[test]
    fn test_timer_without_pending_pass_is_a_no_op() {
        let (mut filter, _) = filter(&["Test Server"]);
        assert!(filter.on_timer().is_none());
    }

    #[test]
    fn test_broken_channel_does_not_stop_the_pass() {
        let document = MemoryDocument::new();
        document.body().append_child(
            &MemoryElement::new("div")
                .with_class("columns is-multiline")
                .with_child(card(1, "Spam")),
        );
        let mut filter = Filter::new(
            document,
            ManualTimer::new(),
            RecordingChannel::broken(),
            MemoryStore::broken(),
            FilterConfig::default(),
        );
        filter.handle_message(InboundMessage::update_settings(Ruleset {
            name_patterns: vec!["spam".into()],
            ..Ruleset::default()
        }));
        assert_eq!(filter.state().hidden_count(), 1);

        let report = filter.toggle_id("1");
        assert_eq!(report.hidden_count, 1);
        assert!(filter.state().ruleset().contains_id("1"));
    }
}
