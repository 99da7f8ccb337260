//! Entry Extractor
//!
//! Turns one listing card into an [`EntryDescriptor`]. Missing pieces of the
//! card degrade to empty fields; extraction itself cannot fail.

use crate::config::FilterConfig;
use crate::dom::Element;
use crate::types::EntryDescriptor;

/// Read name, tags and identifier from a card element.
pub fn extract<E: Element>(card: &E, config: &FilterConfig) -> EntryDescriptor {
    let name = card
        .query_selector(&config.name_selector)
        .map(|element| element.text_content().trim().to_string())
        .unwrap_or_default();

    let tags = card
        .query_selector_all(&config.tag_selector)
        .iter()
        .map(|element| element.text_content().trim().to_lowercase())
        .collect();

    let id = parse_entry_id(&card.class_name(), &config.id_prefix).map(str::to_string);

    EntryDescriptor { name, tags, id }
}

/// Find the first `<prefix><digits>` run in a class attribute and return the digits.
///
/// The prefix may appear inside a longer token, and occurrences not followed by
/// a digit (`server-name`) are skipped.
pub fn parse_entry_id<'a>(class_name: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    for (start, _) in class_name.match_indices(prefix) {
        let rest = &class_name[start + prefix.len()..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 {
            return Some(&rest[..digits]);
        }
    }
    None
}
