//! Change Scheduler
//!
//! Turns bursts of DOM mutations into a single evaluation pass.
//!
//! ```text
//!            relevant batch                 relevant batch
//!   Idle ───────────────────▶ PendingPass ◀────────────────┐
//!    ▲                          │   └─ cancel + restart ───┘
//!    └──────── timer fired ─────┘  (caller runs one pass)
//! ```
//!
//! Irrelevant batches are dropped without touching the state. The scheduler
//! owns the only live timer handle; nothing else may cancel it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::config::FilterConfig;
use crate::dom::Element;

/// One-shot timer provided by the host event loop.
pub trait Timer {
    type Handle: fmt::Debug;

    /// Arm a one-shot timer. When it elapses the host must call
    /// [`ChangeScheduler::fire`] (through the engine).
    fn start(&mut self, delay: Duration) -> Self::Handle;

    /// Disarm a timer that has not fired yet.
    fn cancel(&mut self, handle: Self::Handle);

    /// The timer behind `handle` has elapsed and was consumed.
    fn fired(&mut self, _handle: Self::Handle) {}
}

#[derive(Debug)]
pub enum SchedulerState<H> {
    Idle,
    PendingPass(H),
}

pub struct ChangeScheduler<T: Timer> {
    timer: T,
    delay: Duration,
    state: SchedulerState<T::Handle>,
}

impl<T: Timer> ChangeScheduler<T> {
    pub fn new(timer: T, delay: Duration) -> Self {
        Self {
            timer,
            delay,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> &SchedulerState<T::Handle> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SchedulerState::PendingPass(_))
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Feed the element nodes added by one mutation batch.
    ///
    /// Returns true when the batch was relevant and the debounce timer was
    /// (re)started.
    pub fn observe<E: Element>(&mut self, added: &[E], config: &FilterConfig) -> bool {
        if !is_relevant_batch(added, config) {
            return false;
        }
        self.schedule();
        true
    }

    /// Enter (or stay in) PendingPass with a freshly started timer.
    pub fn schedule(&mut self) {
        self.cancel();
        let handle = self.timer.start(self.delay);
        self.state = SchedulerState::PendingPass(handle);
    }

    /// Drop back to Idle, cancelling the live timer if any.
    pub fn cancel(&mut self) {
        if let SchedulerState::PendingPass(handle) = std::mem::replace(&mut self.state, SchedulerState::Idle) {
            self.timer.cancel(handle);
        }
    }

    /// The live timer elapsed. Returns true when the caller should run a pass.
    pub fn fire(&mut self) -> bool {
        match std::mem::replace(&mut self.state, SchedulerState::Idle) {
            SchedulerState::PendingPass(handle) => {
                self.timer.fired(handle);
                true
            }
            SchedulerState::Idle => false,
        }
    }
}

/// Whether an added node may have changed the set of entries.
pub fn is_relevant<E: Element>(node: &E, config: &FilterConfig) -> bool {
    node.matches(&config.entry_selector)
        || node.query_selector(&config.entry_selector).is_some()
        || node.matches(&config.list_root_selector)
}

pub fn is_relevant_batch<E: Element>(added: &[E], config: &FilterConfig) -> bool {
    added.iter().any(|node| is_relevant(node, config))
}

// =============================================================================
// Manual timer
// =============================================================================

/// Counters recorded by a [`ManualTimer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualTimerLog {
    pub started: usize,
    pub cancelled: usize,
    pub fired: usize,
    /// Handle of the armed timer, if any.
    pub live: Option<u64>,
    pub last_delay: Option<Duration>,
}

/// A timer that never elapses on its own; the caller fires it.
///
/// Used where there is no event loop (tests, the CLI). Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    log: Rc<RefCell<ManualTimerLog>>,
    next_handle: Rc<RefCell<u64>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> ManualTimerLog {
        self.log.borrow().clone()
    }
}

impl Timer for ManualTimer {
    type Handle = u64;

    fn start(&mut self, delay: Duration) -> u64 {
        let handle = {
            let mut next = self.next_handle.borrow_mut();
            *next += 1;
            *next
        };
        let mut log = self.log.borrow_mut();
        log.started += 1;
        log.live = Some(handle);
        log.last_delay = Some(delay);
        handle
    }

    fn cancel(&mut self, handle: u64) {
        let mut log = self.log.borrow_mut();
        log.cancelled += 1;
        if log.live == Some(handle) {
            log.live = None;
        }
    }

    fn fired(&mut self, handle: u64) {
        let mut log = self.log.borrow_mut();
        log.fired += 1;
        if log.live == Some(handle) {
            log.live = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::memory::MemoryElement;

    fn column() -> MemoryElement {
        MemoryElement::new("div").with_class("column")
    }

    fn scheduler() -> (ChangeScheduler<ManualTimer>, ManualTimer) {
        let timer = ManualTimer::new();
        (ChangeScheduler::new(timer.clone(), Duration::from_millis(150)), timer)
    }

    #[test]
    fn test_relevance() {
        let config = FilterConfig::default();
        assert!(is_relevant(&column(), &config));
        assert!(is_relevant(&MemoryElement::new("section").with_child(column()), &config));
        assert!(is_relevant(&MemoryElement::new("div").with_class("listings"), &config));
        assert!(!is_relevant(&MemoryElement::new("span").with_class("tooltip"), &config));
        assert!(!is_relevant_batch::<MemoryElement>(&[], &config));
    }

    #[test]
    fn test_irrelevant_batch_is_ignored() {
        let config = FilterConfig::default();
        let (mut scheduler, timer) = scheduler();
        assert!(!scheduler.observe(&[MemoryElement::new("img")], &config));
        assert!(!scheduler.is_pending());
        assert_eq!(timer.log(), ManualTimerLog::default());
    }

    #[test]
    fn test_bursts_coalesce_into_one_pass() {
        let config = FilterConfig::default();
        let (mut scheduler, timer) = scheduler();

        assert!(scheduler.observe(&[column()], &config));
        assert!(scheduler.observe(&[MemoryElement::new("img"), column()], &config));
        assert!(scheduler.observe(&[column()], &config));

        let log = timer.log();
        assert_eq!(log.started, 3);
        assert_eq!(log.cancelled, 2);
        assert_eq!(log.live, Some(3));
        assert_eq!(log.last_delay, Some(Duration::from_millis(150)));

        assert!(scheduler.fire());
        assert!(!scheduler.is_pending());
        assert_eq!(timer.log().live, None);
        assert_eq!(timer.log().fired, 1);

        // A second fire without a new batch does nothing.
        assert!(!scheduler.fire());
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let config = FilterConfig::default();
        let (mut scheduler, timer) = scheduler();
        scheduler.observe(&[column()], &config);
        scheduler.cancel();
        assert!(!scheduler.is_pending());
        assert_eq!(timer.log().live, None);
        assert!(!scheduler.fire());
    }
}
