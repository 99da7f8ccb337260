mod common;

use std::time::Duration;

use common::{column, harness, ruleset, server};
use df_core::dom::memory::MemoryElement;
use df_core::dom::Element;
use df_core::InboundMessage;

#[test]
fn burst_of_relevant_mutations_runs_one_pass() {
    let mut h = harness(&[]);
    h.filter
        .handle_message(InboundMessage::update_settings(ruleset(&["^Spam"], &[], &[])));
    let sent_before = h.channel.sent().len();

    // Infinite scroll appends a page of cards in several batches.
    for id in 1..=3 {
        let added = column(&server(id, "Spam Server", &[]));
        h.list.append_child(&added);
        assert!(h.filter.on_mutations(&[added]));
    }
    assert!(h.filter.scheduler().is_pending());
    assert_eq!(h.timer.log().started, 3);
    assert_eq!(h.timer.log().cancelled, 2);
    assert_eq!(h.timer.log().last_delay, Some(Duration::from_millis(150)));

    // Nothing is evaluated until the timer fires.
    assert_eq!(h.channel.sent().len(), sent_before);

    let report = h.filter.on_timer().unwrap();
    assert_eq!(report.evaluated, 3);
    assert_eq!(report.hidden_count, 3);
    assert_eq!(h.channel.sent().len(), sent_before + 1);
    assert!(!h.filter.scheduler().is_pending());
    assert!(h.filter.on_timer().is_none());
}

#[test]
fn irrelevant_mutations_do_not_schedule() {
    let mut h = harness(&[server(1, "A", &[])]);
    let tooltip = MemoryElement::new("div").with_class("tooltip");
    h.list.append_child(&tooltip);

    assert!(!h.filter.on_mutations(&[tooltip]));
    assert!(!h.filter.scheduler().is_pending());
    assert_eq!(h.timer.log().started, 0);
}

#[test]
fn wrapper_holding_entries_is_relevant() {
    let mut h = harness(&[]);
    let page = MemoryElement::new("section").with_child(
        MemoryElement::new("div")
            .with_class("columns is-multiline")
            .with_child(column(&server(1, "A", &[]))),
    );
    assert!(h.filter.on_mutations(&[MemoryElement::new("img"), page]));
    assert!(h.filter.scheduler().is_pending());
}

#[test]
fn injected_toggles_do_not_retrigger_the_scheduler() {
    let mut h = harness(&[server(1, "A", &[])]);
    h.filter.run_pass();

    let toggle = h
        .filter
        .document()
        .body()
        .query_selector(".disfilter-toggle")
        .unwrap();
    assert!(!h.filter.on_mutations(&[toggle]));
}

#[test]
fn stop_cancels_the_pending_pass() {
    let mut h = harness(&[]);
    h.filter.on_mutations(&[column(&server(1, "A", &[]))]);
    h.filter.stop();
    assert_eq!(h.timer.log().live, None);
    assert!(h.filter.on_timer().is_none());
}
