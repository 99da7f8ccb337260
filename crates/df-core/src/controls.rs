//! Control Injector
//!
//! Every card with an identifier gets one toggle button bound to that
//! identifier through an attribute. The button reflects explicit-id membership
//! only; a card hidden by a tag or name rule still shows "Block server".
//!
//! Rendering writes to the DOM only when something differs, so re-rendering on
//! every pass costs nothing and produces no mutation records.

use crate::config::FilterConfig;
use crate::dom::{Document, Element};

pub const BLOCK_LABEL: &str = "Block server";
pub const UNBLOCK_LABEL: &str = "Unblock server";

/// Make sure `container` carries a toggle for `id`.
///
/// An existing toggle is re-bound and re-rendered. Returns the new toggle when
/// one had to be created (appended to `card`).
pub fn ensure_toggle<D: Document>(
    document: &D,
    container: &D::Element,
    card: &D::Element,
    id: &str,
    blocked: bool,
    config: &FilterConfig,
) -> Option<D::Element> {
    if let Some(existing) = container.query_selector(&config.toggle_selector()) {
        if existing.attribute(&config.toggle_id_attribute).as_deref() != Some(id) {
            existing.set_attribute(&config.toggle_id_attribute, id);
        }
        render_toggle(&existing, blocked, config);
        return None;
    }

    let toggle = new_toggle(document, id, blocked, config)?;
    card.append_child(&toggle);
    Some(toggle)
}

/// A detached, rendered toggle bound to `id`. Cards get theirs through
/// [`ensure_toggle`]; the confirmation toast carries one as its undo control.
pub fn new_toggle<D: Document>(document: &D, id: &str, blocked: bool, config: &FilterConfig) -> Option<D::Element> {
    let toggle = document.create_element("button")?;
    toggle.set_attribute("type", "button");
    toggle.add_class(&config.toggle_class);
    toggle.set_attribute(&config.toggle_id_attribute, id);
    render_toggle(&toggle, blocked, config);
    Some(toggle)
}

/// Reflect the blocked state on one toggle.
pub fn render_toggle<E: Element>(toggle: &E, blocked: bool, config: &FilterConfig) {
    if toggle.has_class(&config.toggle_blocked_class) != blocked {
        if blocked {
            toggle.add_class(&config.toggle_blocked_class);
        } else {
            toggle.remove_class(&config.toggle_blocked_class);
        }
    }

    let pressed = if blocked { "true" } else { "false" };
    if toggle.attribute("aria-pressed").as_deref() != Some(pressed) {
        toggle.set_attribute("aria-pressed", pressed);
    }

    let label = if blocked { UNBLOCK_LABEL } else { BLOCK_LABEL };
    if toggle.text_content() != label {
        toggle.set_text_content(label);
    }
}

/// Re-render every toggle bound to `id`, including duplicate renders of the
/// same server. Returns how many were found.
pub fn refresh_toggles<D: Document>(document: &D, id: &str, blocked: bool, config: &FilterConfig) -> usize {
    let toggles = document.query_selector_all(&config.toggle_selector_for(id));
    for toggle in &toggles {
        render_toggle(toggle, blocked, config);
    }
    toggles.len()
}

/// Identifier a toggle is bound to.
pub fn bound_id<E: Element>(toggle: &E, config: &FilterConfig) -> Option<String> {
    toggle
        .attribute(&config.toggle_id_attribute)
        .filter(|id| !id.is_empty())
}

pub fn is_rendered_blocked<E: Element>(toggle: &E, config: &FilterConfig) -> bool {
    toggle.has_class(&config.toggle_blocked_class)
}

/// Confirmation text shown after a toggle.
pub fn confirmation(id: &str, blocked: bool) -> String {
    if blocked {
        format!("Server {} blocked.", id)
    } else {
        format!("Server {} unblocked.", id)
    }
}
