//! Console view over the browser DOM.

use myo_types::ConsoleView;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlImageElement};

use crate::warn;

/// [`ConsoleView`] writing into the live page.
///
/// Writes to missing elements are logged and skipped so a page that omits a
/// panel still receives the rest of the status stream.
#[derive(Debug, Clone)]
pub struct DomView {
    document: Document,
}

impl DomView {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// View over the current window's document.
    pub fn from_window() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self::new(document))
    }

    fn element(&self, id: &str) -> Option<Element> {
        let element = self.document.get_element_by_id(id);
        if element.is_none() {
            warn(&format!("No element with id '{id}'"));
        }
        element
    }

    fn html_element(&self, id: &str) -> Option<HtmlElement> {
        self.element(id)?.dyn_into::<HtmlElement>().ok()
    }

    /// Current value of an input element, if it exists.
    pub fn input_value(&self, id: &str) -> Option<String> {
        let input = self
            .element(id)?
            .dyn_into::<web_sys::HtmlInputElement>()
            .ok()?;
        Some(input.value())
    }
}

impl ConsoleView for DomView {
    fn set_text(&mut self, id: &str, text: &str) {
        if let Some(element) = self.element(id) {
            element.set_text_content(Some(text));
        }
    }

    fn set_html(&mut self, id: &str, html: &str) {
        if let Some(element) = self.element(id) {
            element.set_inner_html(html);
        }
    }

    fn set_style(&mut self, id: &str, property: &str, value: &str) {
        if let Some(element) = self.html_element(id)
            && let Err(e) = element.style().set_property(property, value)
        {
            warn(&format!("Failed to set {property} on '{id}': {e:?}"));
        }
    }

    fn style(&self, id: &str, property: &str) -> Option<String> {
        let value = self
            .html_element(id)?
            .style()
            .get_property_value(property)
            .ok()?;
        (!value.is_empty()).then_some(value)
    }

    fn set_image(&mut self, id: &str, src: &str) {
        let Some(element) = self.element(id) else {
            return;
        };
        match element.dyn_into::<HtmlImageElement>() {
            Ok(image) => image.set_src(src),
            Err(element) => {
                if let Err(e) = element.set_attribute("src", src) {
                    warn(&format!("Failed to set src on '{id}': {e:?}"));
                }
            }
        }
    }
}
