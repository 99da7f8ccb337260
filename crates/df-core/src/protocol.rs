//! Sync Protocol
//!
//! Messages exchanged with the control surface, the persisted state read at
//! startup, and the two seams ([`Channel`], [`Store`]) the host implements.
//!
//! Every message carries complete state, so nothing is queued or acknowledged:
//! a late or duplicated message converges to the same result.

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::FilterError;
use crate::types::Ruleset;

// =============================================================================
// Storage keys
// =============================================================================

/// Persisted [`Ruleset`].
pub const SETTINGS_KEY: &str = "disfilterSettings";
/// Persisted global switch.
pub const ENABLED_KEY: &str = "isBlockingEnabled";
/// Popup theme; owned by the settings editor and never read here.
pub const THEME_KEY: &str = "themePreference";
/// Keys read once at startup.
pub const LOAD_KEYS: [&str; 2] = [SETTINGS_KEY, ENABLED_KEY];

/// Error type for decoding control messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateSettingsPayload {
    pub settings: Ruleset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ToggleBlockingPayload {
    pub is_enabled: bool,
}

/// Control surface -> core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum InboundMessage {
    /// Replace the ruleset wholesale and re-evaluate.
    UpdateSettings(UpdateSettingsPayload),
    /// Replace the global switch and re-evaluate.
    ToggleBlocking(ToggleBlockingPayload),
    /// Reply with the last hidden count; no pass.
    RequestBlockedCount,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl InboundMessage {
    /// Decode a `{ type, payload }` envelope.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_value(value)?;
        match envelope.kind.as_str() {
            "UPDATE_SETTINGS" => Ok(Self::UpdateSettings(serde_json::from_value(envelope.payload)?)),
            "TOGGLE_BLOCKING" => Ok(Self::ToggleBlocking(serde_json::from_value(envelope.payload)?)),
            "REQUEST_BLOCKED_COUNT" => Ok(Self::RequestBlockedCount),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn update_settings(settings: Ruleset) -> Self {
        Self::UpdateSettings(UpdateSettingsPayload { settings })
    }

    pub fn toggle_blocking(is_enabled: bool) -> Self {
        Self::ToggleBlocking(ToggleBlockingPayload { is_enabled })
    }
}

/// Core -> control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum OutboundMessage {
    UpdateBlockedCount { count: usize },
}

impl OutboundMessage {
    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }
}

// =============================================================================
// Persisted state
// =============================================================================

/// Values read from the store at startup. `None` means the key was absent
/// (or unusable) and the default applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub settings: Option<Ruleset>,
    pub enabled: Option<bool>,
}

impl PersistedState {
    /// Read the startup keys from a store result object, key by key, so one
    /// bad value does not discard the other.
    pub fn from_value(value: &Value) -> Self {
        let settings = match value.get(SETTINGS_KEY) {
            None | Some(Value::Null) => None,
            Some(raw) => match Ruleset::deserialize(raw) {
                Ok(ruleset) => Some(ruleset),
                Err(e) => {
                    warn!("DisFilter: ignoring stored {}: {}", SETTINGS_KEY, e);
                    None
                }
            },
        };
        let enabled = value.get(ENABLED_KEY).and_then(Value::as_bool);
        Self { settings, enabled }
    }
}

// =============================================================================
// Seams
// =============================================================================

/// Outbound message delivery. Best effort: errors are logged, never retried.
pub trait Channel {
    fn send(&self, message: &OutboundMessage) -> Result<(), FilterError>;
}

/// Persisted configuration writes made by the core.
pub trait Store {
    fn save_ruleset(&self, ruleset: &Ruleset) -> Result<(), FilterError>;
}

/// A channel that records what it was asked to send. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    sent: Rc<RefCell<Vec<OutboundMessage>>>,
    broken: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose every send fails, like a popup that is not open.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.borrow().clone()
    }

    /// Count carried by the most recent message.
    pub fn last_count(&self) -> Option<usize> {
        self.sent.borrow().last().map(|message| match message {
            OutboundMessage::UpdateBlockedCount { count } => *count,
        })
    }
}

impl Channel for RecordingChannel {
    fn send(&self, message: &OutboundMessage) -> Result<(), FilterError> {
        if self.broken {
            return Err(FilterError::Channel("receiving end does not exist".to_string()));
        }
        self.sent.borrow_mut().push(*message);
        Ok(())
    }
}

/// A store holding the last saved ruleset in memory. Clones share it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Rc<RefCell<Option<Ruleset>>>,
    writes: Rc<RefCell<usize>>,
    broken: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Option<Ruleset> {
        self.saved.borrow().clone()
    }

    pub fn writes(&self) -> usize {
        *self.writes.borrow()
    }
}

impl Store for MemoryStore {
    fn save_ruleset(&self, ruleset: &Ruleset) -> Result<(), FilterError> {
        *self.writes.borrow_mut() += 1;
        if self.broken {
            return Err(FilterError::Store("storage quota exceeded".to_string()));
        }
        *self.saved.borrow_mut() = Some(ruleset.clone());
        Ok(())
    }
}
