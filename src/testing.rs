//! A scripted in-memory [`Driver`] for testing chains without a browser.
//!
//! Elements are registered up front and lookups are answered from routes: a route maps a
//! scope (the document or an element) and an XPath query to the elements it returns. Routes
//! are usually declared with CSS and translated the same way a [`Session`](crate::Session)
//! translates them.
//!
//! ```
//! use csschain::testing::{MockDriver, MockElement};
//! use csschain::Session;
//!
//! let mock = MockDriver::new();
//! let h1 = mock.add(MockElement::new("h1").text("Welcome"));
//! mock.route(None, "h1", &[h1]);
//!
//! let session = Session::new(&mock);
//! session.css("h1").has_text("Welcome").unwrap();
//! ```
//!
//! The driver is `Sync`, so a test can change the page from another thread while a chain
//! is waiting on it.

use crate::css::Translator;
use crate::driver::Driver;
use crate::error::DriverError;
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Handle to an element registered with a [`MockDriver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockHandle(usize);

/// The state of a fake element.
#[derive(Clone, Debug, PartialEq)]
pub struct MockElement {
    /// Tag name.
    pub tag: String,
    /// Rendered text.
    pub text: String,
    /// Inner HTML.
    pub inner_html: String,
    /// Attributes.
    pub attributes: BTreeMap<String, String>,
    /// Form control value.
    pub value: Option<String>,
    /// Whether the element is displayed.
    pub visible: bool,
    /// Whether the element accepts interactions.
    pub interactable: bool,
    /// Whether the checkbox is checked.
    pub checked: bool,
    /// Number of clicks received.
    pub clicks: usize,
    /// Number of times the pointer was moved over the element.
    pub hovers: usize,
}

impl MockElement {
    /// A visible, interactable, empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        MockElement {
            tag: tag.into(),
            text: String::new(),
            inner_html: String::new(),
            attributes: BTreeMap::new(),
            value: None,
            visible: true,
            interactable: true,
            checked: false,
            clicks: 0,
            hovers: 0,
        }
    }

    /// Set the rendered text. The inner HTML follows unless set explicitly later.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self.inner_html = self.text.clone();
        self
    }

    /// Set the inner HTML.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.inner_html = html.into();
        self
    }

    /// Set an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the form control value.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Make the element not displayed.
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Make the element refuse clicks and input.
    pub fn not_interactable(mut self) -> Self {
        self.interactable = false;
        self
    }

    fn outer_html(&self) -> String {
        let attributes: String = self
            .attributes
            .iter()
            .map(|(k, v)| format!(" {}=\"{}\"", k, v))
            .collect();
        format!("<{tag}{}>{}</{tag}>", attributes, self.inner_html, tag = self.tag)
    }
}

type ScriptResponder = Box<dyn FnMut(&str, &[Json]) -> Result<Json, DriverError> + Send>;

#[derive(Default)]
struct State {
    elements: Vec<MockElement>,
    parents: HashMap<usize, usize>,
    routes: HashMap<(Option<usize>, String), Vec<usize>>,
    queries: usize,
    scripts: Vec<String>,
    responder: Option<ScriptResponder>,
}

/// A scripted, in-memory browser.
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<State>,
}

impl fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MockDriver")
            .field("elements", &state.elements.len())
            .field("routes", &state.routes.len())
            .field("queries", &state.queries)
            .finish()
    }
}

impl MockDriver {
    /// An empty page.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an element.
    pub fn add(&self, element: MockElement) -> MockHandle {
        let mut state = self.lock();
        state.elements.push(element);
        MockHandle(state.elements.len() - 1)
    }

    /// Answer lookups of `css` within `scope` with `handles`, replacing any earlier answer.
    ///
    /// # Panics
    ///
    /// If `css` cannot be translated.
    pub fn route(&self, scope: Option<MockHandle>, css: &str, handles: &[MockHandle]) {
        let xpath = Translator::new()
            .css_to_xpath(css)
            .unwrap_or_else(|e| panic!("cannot route {:?}: {}", css, e));
        self.route_xpath(scope, &xpath, handles);
    }

    /// Answer lookups of the raw `xpath` within `scope` with `handles`.
    pub fn route_xpath(&self, scope: Option<MockHandle>, xpath: &str, handles: &[MockHandle]) {
        self.lock().routes.insert(
            (scope.map(|h| h.0), xpath.to_string()),
            handles.iter().map(|h| h.0).collect(),
        );
    }

    /// Make `parent` the structural parent of `child`.
    pub fn set_parent(&self, child: MockHandle, parent: MockHandle) {
        self.lock().parents.insert(child.0, parent.0);
    }

    /// Change an element in place.
    ///
    /// # Panics
    ///
    /// If `handle` was not registered with this driver.
    pub fn update<F>(&self, handle: MockHandle, f: F)
    where
        F: FnOnce(&mut MockElement),
    {
        f(&mut self.lock().elements[handle.0]);
    }

    /// A snapshot of an element.
    ///
    /// # Panics
    ///
    /// If `handle` was not registered with this driver.
    pub fn element(&self, handle: MockHandle) -> MockElement {
        self.lock().elements[handle.0].clone()
    }

    /// Number of `find` and `find_all` calls so far.
    pub fn queries(&self) -> usize {
        self.lock().queries
    }

    /// Answer scripts with `responder` instead of `null`.
    pub fn respond_to_scripts<F>(&self, responder: F)
    where
        F: FnMut(&str, &[Json]) -> Result<Json, DriverError> + Send + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
    }

    /// The most recently executed script.
    pub fn last_script(&self) -> Option<String> {
        self.lock().scripts.last().cloned()
    }

    fn with_element<T, F>(&self, handle: &MockHandle, f: F) -> Result<T, DriverError>
    where
        F: FnOnce(&mut MockElement) -> Result<T, DriverError>,
    {
        let mut state = self.lock();
        match state.elements.get_mut(handle.0) {
            Some(element) => f(element),
            None => Err(DriverError::Command(
                format!("stale element reference: {:?}", handle).into(),
            )),
        }
    }

    fn interact<F>(&self, handle: &MockHandle, f: F) -> Result<(), DriverError>
    where
        F: FnOnce(&mut MockElement),
    {
        self.with_element(handle, |element| {
            if !element.interactable || !element.visible {
                return Err(DriverError::NotInteractable(format!(
                    "<{}> could not be scrolled into view",
                    element.tag
                )));
            }
            f(element);
            Ok(())
        })
    }

    fn lookup(&self, scope: Option<&MockHandle>, xpath: &str) -> Vec<MockHandle> {
        let mut state = self.lock();
        state.queries += 1;
        let scope = scope.map(|h| h.0);
        if xpath == ".." {
            return scope
                .and_then(|child| state.parents.get(&child).copied())
                .map(MockHandle)
                .into_iter()
                .collect();
        }
        state
            .routes
            .get(&(scope, xpath.to_string()))
            .map(|handles| handles.iter().copied().map(MockHandle).collect())
            .unwrap_or_default()
    }
}

impl Driver for MockDriver {
    type Element = MockHandle;

    fn find(
        &self,
        scope: Option<&MockHandle>,
        xpath: &str,
    ) -> Result<Option<MockHandle>, DriverError> {
        Ok(self.lookup(scope, xpath).into_iter().next())
    }

    fn find_all(
        &self,
        scope: Option<&MockHandle>,
        xpath: &str,
    ) -> Result<Vec<MockHandle>, DriverError> {
        Ok(self.lookup(scope, xpath))
    }

    fn click(&self, element: &MockHandle) -> Result<(), DriverError> {
        self.interact(element, |e| e.clicks += 1)
    }

    fn mouse_over(&self, element: &MockHandle) -> Result<(), DriverError> {
        self.interact(element, |e| e.hovers += 1)
    }

    fn text(&self, element: &MockHandle) -> Result<String, DriverError> {
        self.with_element(element, |e| Ok(e.text.clone()))
    }

    fn html(&self, element: &MockHandle, inner: bool) -> Result<String, DriverError> {
        self.with_element(element, |e| {
            Ok(if inner {
                e.inner_html.clone()
            } else {
                e.outer_html()
            })
        })
    }

    fn attribute(&self, element: &MockHandle, name: &str) -> Result<Option<String>, DriverError> {
        self.with_element(element, |e| Ok(e.attributes.get(name).cloned()))
    }

    fn value(&self, element: &MockHandle) -> Result<Option<String>, DriverError> {
        self.with_element(element, |e| Ok(e.value.clone()))
    }

    fn set_value(&self, element: &MockHandle, value: &str) -> Result<(), DriverError> {
        self.interact(element, |e| e.value = Some(value.to_string()))
    }

    fn check(&self, element: &MockHandle) -> Result<(), DriverError> {
        self.interact(element, |e| e.checked = true)
    }

    fn is_visible(&self, element: &MockHandle) -> Result<bool, DriverError> {
        self.with_element(element, |e| Ok(e.visible))
    }

    fn execute_async(&self, script: &str, args: Vec<Json>) -> Result<Json, DriverError> {
        let mut state = self.lock();
        state.scripts.push(script.to_string());
        match state.responder {
            Some(ref mut responder) => responder(script, &args),
            None => Ok(Json::Null),
        }
    }
}
