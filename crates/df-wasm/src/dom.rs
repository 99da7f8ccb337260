//! `df_core::dom` over the live page.
//!
//! Host errors (an invalid selector, a detached node) are logged at debug and
//! read as "nothing there".

use std::time::Duration;

use df_core::dom::{Document, Element};
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::NodeList;

#[derive(Debug, Clone)]
pub struct WebElement(pub web_sys::Element);

impl WebElement {
    pub fn inner(&self) -> &web_sys::Element {
        &self.0
    }
}

fn elements(list: Result<NodeList, JsValue>, selector: &str) -> Vec<WebElement> {
    let list = match list {
        Ok(list) => list,
        Err(e) => {
            debug!("DisFilter: selector {} rejected: {:?}", selector, e);
            return Vec::new();
        }
    };
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
        .map(WebElement)
        .collect()
}

impl Element for WebElement {
    fn matches(&self, selector: &str) -> bool {
        self.0.matches(selector).unwrap_or(false)
    }

    fn query_selector(&self, selector: &str) -> Option<Self> {
        self.0.query_selector(selector).ok().flatten().map(WebElement)
    }

    fn query_selector_all(&self, selector: &str) -> Vec<Self> {
        elements(self.0.query_selector_all(selector), selector)
    }

    fn text_content(&self) -> String {
        self.0.text_content().unwrap_or_default()
    }

    fn set_text_content(&self, text: &str) {
        self.0.set_text_content(Some(text));
    }

    fn class_name(&self) -> String {
        self.0.class_name()
    }

    fn has_class(&self, class: &str) -> bool {
        self.0.class_list().contains(class)
    }

    fn add_class(&self, class: &str) {
        if let Err(e) = self.0.class_list().add_1(class) {
            debug!("DisFilter: could not add class {}: {:?}", class, e);
        }
    }

    fn remove_class(&self, class: &str) {
        if let Err(e) = self.0.class_list().remove_1(class) {
            debug!("DisFilter: could not remove class {}: {:?}", class, e);
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }

    fn set_attribute(&self, name: &str, value: &str) {
        if let Err(e) = self.0.set_attribute(name, value) {
            debug!("DisFilter: could not set {}: {:?}", name, e);
        }
    }

    fn append_child(&self, child: &Self) {
        if let Err(e) = self.0.append_child(&child.0) {
            debug!("DisFilter: could not append child: {:?}", e);
        }
    }
}

/// The page document plus the window used for toast timers.
pub struct WebDocument {
    document: web_sys::Document,
    window: web_sys::Window,
    toast_class: String,
}

impl WebDocument {
    pub fn new(window: web_sys::Window, document: web_sys::Document, toast_class: &str) -> Self {
        Self {
            document,
            window,
            toast_class: toast_class.to_string(),
        }
    }

    pub fn inner(&self) -> &web_sys::Document {
        &self.document
    }

    /// Add `<style id=style_id>` once. Returns false when it was already there.
    pub fn inject_style(&self, style_id: &str, css: &str) -> Result<bool, JsValue> {
        if self.document.get_element_by_id(style_id).is_some() {
            return Ok(false);
        }
        let style = self.document.create_element("style")?;
        style.set_id(style_id);
        style.set_text_content(Some(css));

        match self.document.head() {
            Some(head) => head.append_child(&style)?,
            None => match self.document.document_element() {
                Some(root) => root.append_child(&style)?,
                None => return Err(JsValue::from_str("document has no root element")),
            },
        };
        Ok(true)
    }
}

impl Document for WebDocument {
    type Element = WebElement;

    fn query_selector_all(&self, selector: &str) -> Vec<WebElement> {
        elements(self.document.query_selector_all(selector), selector)
    }

    fn create_element(&self, tag: &str) -> Option<WebElement> {
        self.document.create_element(tag).ok().map(WebElement)
    }

    fn notify(&self, message: &str, action: Option<&WebElement>, duration: Duration) {
        let Some(body) = self.document.body() else {
            return;
        };
        let Ok(toast) = self.document.create_element("div") else {
            return;
        };
        toast.set_class_name(&self.toast_class);
        toast.set_text_content(Some(message));
        if let Some(action) = action {
            if let Err(e) = toast.append_child(action.inner()) {
                debug!("DisFilter: toast action not attached: {:?}", e);
            }
        }
        if body.append_child(&toast).is_err() {
            return;
        }

        let dismiss = Closure::once_into_js(move || toast.remove());
        if let Err(e) = self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            dismiss.unchecked_ref(),
            duration.as_millis() as i32,
        ) {
            debug!("DisFilter: toast timer unavailable: {:?}", e);
        }
    }
}
