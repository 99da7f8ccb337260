#![allow(dead_code)]

use df_core::dom::memory::{MemoryDocument, MemoryElement};
use df_core::dom::Element;
use df_core::protocol::{MemoryStore, RecordingChannel};
use df_core::scheduler::ManualTimer;
use df_core::{Filter, FilterConfig, Ruleset};

pub type TestFilter = Filter<MemoryDocument, ManualTimer, RecordingChannel, MemoryStore>;

pub struct Harness {
    pub filter: TestFilter,
    pub channel: RecordingChannel,
    pub store: MemoryStore,
    pub timer: ManualTimer,
    pub list: MemoryElement,
}

pub struct Server<'a> {
    pub id: Option<u32>,
    pub name: &'a str,
    pub tags: &'a [&'a str],
}

pub fn server<'a>(id: u32, name: &'a str, tags: &'a [&'a str]) -> Server<'a> {
    Server { id: Some(id), name, tags }
}

/// A `.column` wrapping a listing card, shaped like the live markup.
pub fn column(server: &Server<'_>) -> MemoryElement {
    let card_class = match server.id {
        Some(id) => format!("listing-card server-{}", id),
        None => "listing-card".to_string(),
    };

    let tag_list = MemoryElement::new("ul");
    for tag in server.tags {
        tag_list.append_child(
            &MemoryElement::new("li").with_child(MemoryElement::new("span").with_class("name").with_text(tag)),
        );
    }

    MemoryElement::new("div").with_class("column is-one-third").with_child(
        MemoryElement::new("div")
            .with_class(&card_class)
            .with_child(MemoryElement::new("h3").with_class("server-name").with_text(server.name))
            .with_child(MemoryElement::new("div").with_class("server-tags").with_child(tag_list)),
    )
}

pub fn harness(servers: &[Server<'_>]) -> Harness {
    let document = MemoryDocument::new();
    let list = MemoryElement::new("div").with_class("columns is-multiline");
    for server in servers {
        list.append_child(&column(server));
    }
    document
        .body()
        .append_child(&MemoryElement::new("div").with_attribute("id", "listings").with_class("listings").with_child(list.clone()));

    let channel = RecordingChannel::new();
    let store = MemoryStore::new();
    let timer = ManualTimer::new();
    let filter = Filter::new(document, timer.clone(), channel.clone(), store.clone(), FilterConfig::default());

    Harness {
        filter,
        channel,
        store,
        timer,
        list,
    }
}

pub fn ruleset(patterns: &[&str], tags: &[&str], ids: &[&str]) -> Ruleset {
    Ruleset {
        name_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ids: ids.iter().map(|i| i.to_string()).collect(),
    }
}
