//! DOM abstraction
//!
//! The engine reads and writes the page only through these two traits. Methods
//! are infallible: an implementation backed by a real DOM logs and swallows
//! host errors (an invalid selector simply matches nothing), which is what keeps
//! a broken page from ever aborting a pass.

use std::time::Duration;

pub mod memory;

/// A handle to one element of the page.
pub trait Element: Clone {
    /// Whether this element matches a CSS selector.
    fn matches(&self, selector: &str) -> bool;

    /// First descendant matching `selector`, in document order.
    fn query_selector(&self, selector: &str) -> Option<Self>;

    /// Every descendant matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Vec<Self>;

    /// Concatenated text of this element and its descendants.
    fn text_content(&self) -> String;

    fn set_text_content(&self, text: &str);

    /// Raw value of the `class` attribute.
    fn class_name(&self) -> String;

    fn has_class(&self, class: &str) -> bool;

    fn add_class(&self, class: &str);

    fn remove_class(&self, class: &str);

    fn attribute(&self, name: &str) -> Option<String>;

    fn set_attribute(&self, name: &str, value: &str);

    fn append_child(&self, child: &Self);
}

/// The page the engine is filtering.
pub trait Document {
    type Element: Element;

    /// Every element in the document matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Vec<Self::Element>;

    /// Create a detached element, or `None` when the host refuses.
    fn create_element(&self, tag: &str) -> Option<Self::Element>;

    /// Show a transient confirmation message for roughly `duration`.
    ///
    /// `action` is placed inside the message. It stays clickable while the
    /// listing it refers to is collapsed.
    fn notify(&self, message: &str, action: Option<&Self::Element>, duration: Duration);
}
