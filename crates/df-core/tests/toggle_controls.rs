mod common;

use common::{column, harness, ruleset, server};
use df_core::controls::{bound_id, is_rendered_blocked, BLOCK_LABEL, UNBLOCK_LABEL};
use df_core::dom::memory::MemoryElement;
use df_core::dom::{Document, Element};
use df_core::{InboundMessage, PersistedState};

fn toggles_for(h: &common::Harness, id: &str) -> Vec<MemoryElement> {
    h.filter
        .document()
        .query_selector_all(&format!("[data-disfilter-id=\"{}\"]", id))
}

/// Whether some ancestor of `element` carries the hidden marker.
fn inside_hidden_container(element: &MemoryElement) -> bool {
    let mut node = element.parent();
    while let Some(current) = node {
        if current.has_class("disfilter-hidden") {
            return true;
        }
        node = current.parent();
    }
    false
}

#[test]
fn every_card_with_an_id_gets_one_toggle() {
    let mut h = harness(&[server(1, "A", &[]), server(2, "B", &[])]);
    let report = h.filter.load(Ok(PersistedState::default()));
    assert_eq!(report.injected, 2);

    h.filter.run_pass();
    h.filter.run_pass();
    assert_eq!(h.filter.document().query_selector_all(".disfilter-toggle").len(), 2);
    for toggle in h.filter.document().query_selector_all(".disfilter-toggle") {
        assert_eq!(toggle.text_content(), BLOCK_LABEL);
    }
}

#[test]
fn toggling_twice_restores_the_starting_state() {
    let mut h = harness(&[server(42, "Answer", &[]), server(7, "Other", &[])]);
    h.filter.load(Ok(PersistedState::default()));
    let column = h
        .filter
        .document()
        .query_selector_all(".columns.is-multiline > .column")
        .remove(0);
    assert!(!column.has_class("disfilter-hidden"));

    let report = h.filter.toggle_id("42");
    assert_eq!(h.filter.state().ruleset().ids, vec!["42"]);
    assert!(column.has_class("disfilter-hidden"));
    assert_eq!(report.hidden_count, 1);
    assert_eq!(h.channel.last_count(), Some(1));
    for toggle in toggles_for(&h, "42") {
        assert!(is_rendered_blocked(&toggle, h.filter.config()));
        assert_eq!(toggle.text_content(), UNBLOCK_LABEL);
    }

    let report = h.filter.toggle_id("42");
    assert!(h.filter.state().ruleset().ids.is_empty());
    assert!(!column.has_class("disfilter-hidden"));
    assert_eq!(report.hidden_count, 0);
    for toggle in toggles_for(&h, "42") {
        assert!(!is_rendered_blocked(&toggle, h.filter.config()));
        assert_eq!(toggle.text_content(), BLOCK_LABEL);
    }

    assert_eq!(
        h.filter.document().notifications(),
        vec!["Server 42 blocked.", "Server 42 unblocked."]
    );
}

#[test]
fn toggle_persists_the_whole_ruleset() {
    let mut h = harness(&[server(42, "Answer", &[])]);
    h.filter
        .handle_message(InboundMessage::update_settings(ruleset(&["^Spam"], &["nsfw"], &["1"])));

    h.filter.toggle_id("42");
    assert_eq!(h.store.writes(), 1);
    assert_eq!(h.store.saved(), Some(ruleset(&["^Spam"], &["nsfw"], &["1", "42"])));

    h.filter.toggle_id("42");
    assert_eq!(h.store.writes(), 2);
    assert_eq!(h.store.saved(), Some(ruleset(&["^Spam"], &["nsfw"], &["1"])));
}

#[test]
fn duplicate_renders_share_the_toggle_state() {
    let mut h = harness(&[server(42, "Answer", &[]), server(42, "Answer (again)", &[])]);
    h.filter.load(Ok(PersistedState::default()));
    assert_eq!(toggles_for(&h, "42").len(), 2);

    h.filter.toggle_id("42");
    let toggles = toggles_for(&h, "42");
    assert!(toggles.iter().all(|toggle| is_rendered_blocked(toggle, h.filter.config())));
    assert_eq!(h.filter.state().hidden_count(), 2);
}

#[test]
fn toggle_reflects_explicit_ids_only() {
    let mut h = harness(&[server(5, "Tagged", &["nsfw"])]);
    h.filter
        .handle_message(InboundMessage::update_settings(ruleset(&[], &["nsfw"], &[])));
    assert_eq!(h.filter.state().hidden_count(), 1);

    let toggle = toggles_for(&h, "5").remove(0);
    assert!(!is_rendered_blocked(&toggle, h.filter.config()));

    // Blocking and unblocking by id leaves the tag rule in charge.
    h.filter.toggle_id("5");
    h.filter.toggle_id("5");
    assert_eq!(h.filter.state().hidden_count(), 1);
}

#[test]
fn settings_sync_re_renders_existing_toggles() {
    let mut h = harness(&[server(9, "Nine", &[])]);
    h.filter.load(Ok(PersistedState::default()));

    h.filter
        .handle_message(InboundMessage::update_settings(ruleset(&[], &[], &["9"])));
    assert!(is_rendered_blocked(&toggles_for(&h, "9")[0], h.filter.config()));

    h.filter
        .handle_message(InboundMessage::update_settings(ruleset(&[], &[], &[])));
    assert!(!is_rendered_blocked(&toggles_for(&h, "9")[0], h.filter.config()));
}

#[test]
fn late_rendered_cards_pick_up_their_toggle_and_state() {
    let mut h = harness(&[]);
    h.filter
        .handle_message(InboundMessage::update_settings(ruleset(&[], &[], &["3"])));

    h.list.append_child(&column(&server(3, "Late", &[])));
    let report = h.filter.run_pass();
    assert_eq!(report.injected, 1);
    assert_eq!(report.hidden, 1);
    assert!(is_rendered_blocked(&toggles_for(&h, "3")[0], h.filter.config()));
}

#[test]
fn blocked_server_stays_reachable_through_the_toast() {
    let mut h = harness(&[server(42, "Answer", &[])]);
    h.filter.load(Ok(PersistedState::default()));
    h.filter.toggle_id("42");

    let column = h
        .filter
        .document()
        .query_selector_all(".columns.is-multiline > .column")
        .remove(0);
    assert!(column.has_class("disfilter-hidden"));

    let reachable: Vec<MemoryElement> = toggles_for(&h, "42")
        .into_iter()
        .filter(|toggle| !inside_hidden_container(toggle))
        .collect();
    assert_eq!(reachable.len(), 1);
    let undo = &reachable[0];
    assert!(undo.parent().unwrap().has_class("disfilter-toast"));
    assert!(is_rendered_blocked(undo, h.filter.config()));
    assert_eq!(undo.text_content(), UNBLOCK_LABEL);

    // Activating the toast's toggle is what the click handler does.
    let id = bound_id(undo, h.filter.config()).unwrap();
    let report = h.filter.toggle_id(&id);
    assert!(h.filter.state().ruleset().ids.is_empty());
    assert!(!column.has_class("disfilter-hidden"));
    assert_eq!(report.hidden_count, 0);
    assert!(!is_rendered_blocked(undo, h.filter.config()));
}
