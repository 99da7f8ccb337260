//! Visibility Synchronizer
//!
//! Each entry container is a two-state machine: shown, or hidden by us (marker
//! class present). Transitions only happen when the verdict disagrees with the
//! current state, so repeated passes never restart the CSS transition.

use crate::config::FilterConfig;
use crate::dom::{Document, Element};

/// What [`apply`] did to a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Marker attached.
    Hidden,
    /// Marker removed.
    Revealed,
    /// State already matched the verdict.
    Unchanged,
}

/// Bring one container in line with its verdict.
pub fn apply<E: Element>(container: &E, block: bool, config: &FilterConfig) -> Transition {
    let hidden = container.has_class(&config.hidden_class);
    match (block, hidden) {
        (true, false) => {
            container.add_class(&config.hidden_class);
            Transition::Hidden
        }
        (false, true) => {
            container.remove_class(&config.hidden_class);
            Transition::Revealed
        }
        _ => Transition::Unchanged,
    }
}

/// Count marked containers straight from the DOM.
pub fn count_hidden<D: Document>(document: &D, config: &FilterConfig) -> usize {
    document.query_selector_all(&config.hidden_selector()).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::memory::{MemoryDocument, MemoryElement};

    #[test]
    fn test_transitions_are_idempotent() {
        let config = FilterConfig::default();
        let column = MemoryElement::new("div").with_class("column");

        assert_eq!(apply(&column, true, &config), Transition::Hidden);
        assert_eq!(apply(&column, true, &config), Transition::Unchanged);
        assert!(column.has_class("disfilter-hidden"));

        assert_eq!(apply(&column, false, &config), Transition::Revealed);
        assert_eq!(apply(&column, false, &config), Transition::Unchanged);
        assert_eq!(column.class_name(), "column");
    }

    #[test]
    fn test_count_reads_the_dom() {
        let config = FilterConfig::default();
        let document = MemoryDocument::new();
        let columns: Vec<_> = (0..3)
            .map(|_| MemoryElement::new("div").with_class("column"))
            .collect();
        for column in &columns {
            document.body().append_child(column);
        }

        apply(&columns[0], true, &config);
        apply(&columns[2], true, &config);
        assert_eq!(count_hidden(&document, &config), 2);

        // Out-of-band removal is reflected without any bookkeeping.
        columns[0].remove();
        assert_eq!(count_hidden(&document, &config), 1);
    }
}
