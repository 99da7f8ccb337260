//! DisFilter Core Library
//!
//! This crate provides the filtering engine that runs inside the listing page.
//! It decides which server cards to hide, keeps the DOM in sync with those
//! decisions and talks to the control surface (the extension popup).
//!
//! # Architecture
//!
//! The engine never touches a concrete DOM. Everything it needs from the page is
//! expressed through the [`dom::Document`] and [`dom::Element`] traits, which the
//! wasm binding implements over `web_sys` and [`dom::memory`] implements as an
//! in-memory tree for tests and tooling.
//!
//! # Modules
//!
//! - `extract`: Entry Extractor (card -> [`EntryDescriptor`])
//! - `decision`: Decision Engine (descriptor + ruleset -> block/allow)
//! - `visibility`: Visibility Synchronizer (idempotent marker transitions)
//! - `scheduler`: Change Scheduler (mutation relevance + debounce)
//! - `controls`: Control Injector (per-entry block toggles)
//! - `protocol`: Sync Protocol (messages, persisted state, channel/store seams)
//! - `state`: the in-memory state container
//! - `engine`: the [`Filter`] instance that ties a pass together

pub mod config;
pub mod controls;
pub mod decision;
pub mod dom;
pub mod engine;
pub mod error;
pub mod extract;
pub mod protocol;
pub mod scheduler;
pub mod state;
pub mod styles;
pub mod types;
pub mod visibility;

// Re-export commonly used types
pub use config::FilterConfig;
pub use decision::{should_block, BlockReason, CompiledRuleset};
pub use engine::{Filter, PassReport};
pub use error::FilterError;
pub use protocol::{InboundMessage, OutboundMessage, PersistedState};
pub use scheduler::{ChangeScheduler, Timer};
pub use state::FilterState;
pub use types::{EntryDescriptor, Ruleset};
