//! In-memory DOM
//!
//! A small element tree implementing [`Document`] and [`Element`] without a
//! browser. Used by the test suites and the CLI.
//!
//! The selector matcher understands what the engine needs and nothing more:
//! compound selectors built from a tag, `#id`, `.class`, `[attr]` and
//! `[attr="value"]`, joined by descendant (` `) or child (`>`) combinators.
//! Attribute values may not contain whitespace. Anything else fails to parse
//! and matches nothing, like an invalid selector in a real DOM.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use super::{Document, Element};
use crate::config::FilterConfig;

// =============================================================================
// Element tree
// =============================================================================

#[derive(Debug)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<MemoryElement>,
    parent: Weak<RefCell<Node>>,
}

impl Node {
    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(|value| value.split_whitespace())
            .into_iter()
            .flatten()
    }
}

/// Shared handle to an in-memory element. Clones refer to the same node.
#[derive(Debug, Clone)]
pub struct MemoryElement(Rc<RefCell<Node>>);

impl PartialEq for MemoryElement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryElement {}

impl MemoryElement {
    pub fn new(tag: &str) -> Self {
        Self(Rc::new(RefCell::new(Node {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: Weak::new(),
        })))
    }

    /// Builder form of setting the `class` attribute.
    pub fn with_class(self, class: &str) -> Self {
        self.set_attribute("class", class);
        self
    }

    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.0.borrow_mut().text = text.to_string();
        self
    }

    pub fn with_child(self, child: MemoryElement) -> Self {
        self.append_child(&child);
        self
    }

    /// Build a detached subtree from a fixture description.
    pub fn from_spec(spec: &NodeSpec) -> Self {
        let tag = if spec.tag.is_empty() { "div" } else { spec.tag.as_str() };
        let element = MemoryElement::new(tag).with_text(&spec.text);
        if let Some(class) = &spec.class {
            element.set_attribute("class", class);
        }
        if let Some(id) = &spec.id {
            element.set_attribute("id", id);
        }
        for (name, value) in &spec.attributes {
            element.set_attribute(name, value);
        }
        for child in &spec.children {
            element.append_child(&MemoryElement::from_spec(child));
        }
        element
    }

    pub fn tag(&self) -> String {
        self.0.borrow().tag.clone()
    }

    pub fn parent(&self) -> Option<MemoryElement> {
        self.0.borrow().parent.upgrade().map(MemoryElement)
    }

    pub fn children(&self) -> Vec<MemoryElement> {
        self.0.borrow().children.clone()
    }

    /// Detach this element from its parent, if any.
    pub fn remove(&self) {
        let parent = self.0.borrow().parent.upgrade();
        if let Some(parent) = parent {
            parent
                .borrow_mut()
                .children
                .retain(|child| !Rc::ptr_eq(&child.0, &self.0));
        }
        self.0.borrow_mut().parent = Weak::new();
    }

    /// Pre-order descendants, excluding `self`.
    fn collect_descendants(&self, out: &mut Vec<MemoryElement>) {
        for child in self.children() {
            out.push(child.clone());
            child.collect_descendants(out);
        }
    }

    fn select(&self, selector: &str, first_only: bool) -> Vec<MemoryElement> {
        let Some(selector) = Selector::parse(selector) else {
            debug!("In-memory DOM: unsupported selector {:?}", selector);
            return Vec::new();
        };
        let mut descendants = Vec::new();
        self.collect_descendants(&mut descendants);

        let mut matched = Vec::new();
        for element in descendants {
            if selector.matches(&element) {
                matched.push(element);
                if first_only {
                    break;
                }
            }
        }
        matched
    }
}

impl Element for MemoryElement {
    fn matches(&self, selector: &str) -> bool {
        Selector::parse(selector).is_some_and(|selector| selector.matches(self))
    }

    fn query_selector(&self, selector: &str) -> Option<Self> {
        self.select(selector, true).into_iter().next()
    }

    fn query_selector_all(&self, selector: &str) -> Vec<Self> {
        self.select(selector, false)
    }

    fn text_content(&self) -> String {
        let node = self.0.borrow();
        let mut text = node.text.clone();
        for child in &node.children {
            text.push_str(&child.text_content());
        }
        text
    }

    fn set_text_content(&self, text: &str) {
        let children = std::mem::take(&mut self.0.borrow_mut().children);
        for child in children {
            child.0.borrow_mut().parent = Weak::new();
        }
        self.0.borrow_mut().text = text.to_string();
    }

    fn class_name(&self) -> String {
        self.attribute("class").unwrap_or_default()
    }

    fn has_class(&self, class: &str) -> bool {
        self.0.borrow().classes().any(|own| own == class)
    }

    fn add_class(&self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let mut node = self.0.borrow_mut();
        let value = node.attributes.entry("class".to_string()).or_default();
        if !value.trim().is_empty() {
            value.push(' ');
        }
        value.push_str(class);
    }

    fn remove_class(&self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let remaining = self
            .0
            .borrow()
            .classes()
            .filter(|own| *own != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute("class", &remaining);
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.0.borrow().attributes.get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.0
            .borrow_mut()
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    fn append_child(&self, child: &Self) {
        child.remove();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.push(child.clone());
    }
}

// =============================================================================
// Document
// =============================================================================

/// A document rooted at a `<body>` element, recording notifications.
///
/// Toasts are appended to the body like on a live page but never expire.
#[derive(Debug)]
pub struct MemoryDocument {
    body: MemoryElement,
    toast_class: String,
    notifications: RefCell<Vec<String>>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            body: MemoryElement::new("body"),
            toast_class: FilterConfig::default().toast_class,
            notifications: RefCell::new(Vec::new()),
        }
    }

    /// A document whose body holds the subtree described by `spec`.
    pub fn from_spec(spec: &NodeSpec) -> Self {
        let document = Self::new();
        document.body.append_child(&MemoryElement::from_spec(spec));
        document
    }

    pub fn body(&self) -> &MemoryElement {
        &self.body
    }

    /// Messages passed to [`Document::notify`] so far.
    pub fn notifications(&self) -> Vec<String> {
        self.notifications.borrow().clone()
    }
}

impl Document for MemoryDocument {
    type Element = MemoryElement;

    fn query_selector_all(&self, selector: &str) -> Vec<MemoryElement> {
        self.body.query_selector_all(selector)
    }

    fn create_element(&self, tag: &str) -> Option<MemoryElement> {
        Some(MemoryElement::new(tag))
    }

    fn notify(&self, message: &str, action: Option<&MemoryElement>, _duration: Duration) {
        self.notifications.borrow_mut().push(message.to_string());
        let toast = MemoryElement::new("div").with_class(&self.toast_class).with_text(message);
        if let Some(action) = action {
            toast.append_child(action);
        }
        self.body.append_child(&toast);
    }
}

/// Serializable description of an element subtree, used for fixtures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    /// Tag name; `div` when empty.
    pub tag: String,
    pub class: Option<String>,
    pub id: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<NodeSpec>,
}

// =============================================================================
// Selectors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn parse(token: &str) -> Option<Self> {
        let is_delimiter = |c: char| matches!(c, '.' | '#' | '[');
        let mut compound = Compound::default();

        let tag_end = token.find(is_delimiter).unwrap_or(token.len());
        let tag = &token[..tag_end];
        if !tag.is_empty() && tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }

        let mut rest = &token[tag_end..];
        while let Some(first) = rest.chars().next() {
            match first {
                '.' | '#' => {
                    let body = &rest[1..];
                    let end = body.find(is_delimiter).unwrap_or(body.len());
                    let name = &body[..end];
                    if name.is_empty() {
                        return None;
                    }
                    if first == '.' {
                        compound.classes.push(name.to_string());
                    } else {
                        compound.id = Some(name.to_string());
                    }
                    rest = &body[end..];
                }
                '[' => {
                    let close = rest.find(']')?;
                    let inner = &rest[1..close];
                    let (name, value) = match inner.split_once('=') {
                        Some((name, value)) => (
                            name.trim(),
                            Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
                        ),
                        None => (inner.trim(), None),
                    };
                    if name.is_empty() {
                        return None;
                    }
                    compound.attributes.push((name.to_string(), value));
                    rest = &rest[close + 1..];
                }
                _ => return None,
            }
        }

        Some(compound)
    }

    fn matches(&self, node: &Node) -> bool {
        if self.tag.as_ref().is_some_and(|tag| *tag != node.tag) {
            return false;
        }
        if self
            .id
            .as_ref()
            .is_some_and(|id| node.attributes.get("id") != Some(id))
        {
            return false;
        }
        if !self
            .classes
            .iter()
            .all(|class| node.classes().any(|own| own == class))
        {
            return false;
        }
        self.attributes.iter().all(|(name, expected)| {
            match (node.attributes.get(name), expected) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

/// `compounds[i]` and `compounds[i + 1]` are joined by `combinators[i]`.
#[derive(Debug)]
struct Selector {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Selector {
    fn parse(input: &str) -> Option<Self> {
        let spaced = input.replace('>', " > ");
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        let mut next = Combinator::Descendant;

        for token in spaced.split_whitespace() {
            if token == ">" {
                if compounds.is_empty() || next == Combinator::Child {
                    return None;
                }
                next = Combinator::Child;
                continue;
            }
            let compound = Compound::parse(token)?;
            if !compounds.is_empty() {
                combinators.push(next);
            }
            next = Combinator::Descendant;
            compounds.push(compound);
        }

        if compounds.is_empty() || next == Combinator::Child {
            return None;
        }
        Some(Self { compounds, combinators })
    }

    fn matches(&self, element: &MemoryElement) -> bool {
        self.matches_at(element, self.compounds.len() - 1)
    }

    fn matches_at(&self, element: &MemoryElement, index: usize) -> bool {
        if !self.compounds[index].matches(&element.0.borrow()) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => element
                .parent()
                .is_some_and(|parent| self.matches_at(&parent, index - 1)),
            Combinator::Descendant => {
                let mut current = element.parent();
                while let Some(ancestor) = current {
                    if self.matches_at(&ancestor, index - 1) {
                        return true;
                    }
                    current = ancestor.parent();
                }
                false
            }
        }
    }
}
