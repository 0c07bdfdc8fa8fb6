//! Selector chains.
//!
//! A [`CssNode`] is one step of a chain such as
//! `jQuery('form').find('fieldset').eq(1).find('input')`. Steps are built without touching
//! the browser; the first operation that needs an element resolves the chain from the root
//! down and memoizes each step's element.

use crate::css::{self, ANCESTOR};
use crate::driver::Driver;
use crate::error::{ChainError, DriverError};
use crate::matcher::{contains_string, not, Matcher};
use crate::session::Session;
use crate::wait::WaitOutcome;
use serde_json::{Map, Value as Json};
use std::cell::RefCell;
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

const NO_CSS_SELECTOR: &str = "<< no valid css selector >>";

const WITH_JQUERY: &str = r#"var withJQuery = function(callback) {
    if (!window.jQuery) {
        if (typeof define === "function" && define.amd) {
            require(['jquery'], callback)
        } else {
            var headID = window.document.getElementsByTagName("head")[0]
            var newScript = window.document.createElement('script')
            newScript.type = 'text/javascript'
            newScript.src = 'https://cdnjs.cloudflare.com/ajax/libs/jquery/1.12.4/jquery.min.js'
            headID.appendChild(newScript)

            newScript.onload = newScript.onreadystatechange = function() {
                if (!this.readyState || this.readyState == 'loaded' || this.readyState == 'complete') {
                    newScript.onload = newScript.onreadystatechange = null
                    callback(window.jQuery)
                }
            }
        }
    } else {
        callback(window.jQuery)
    }
}"#;

enum Slot<E> {
    Unset,
    Resolved(Option<E>),
}

/// One step of a selector chain.
///
/// A node either carries a CSS selector that is looked up inside its context, or wraps an
/// element that was already located by a derived step ([`eq`](CssNode::eq),
/// [`parent`](CssNode::parent), [`closest`](CssNode::closest), [`all`](CssNode::all)). The
/// latter have no CSS path of their own and cannot be re-resolved or enumerated.
///
/// Every step borrows the node it was derived from, so bind a step to a variable before
/// keeping one of its children: `let items = nav.css("li"); let first = items.eq(0)?;`.
///
/// Assertions and interactions return `Ok(&self)` so that they can be chained with `?`:
///
/// ```no_run
/// # fn run<D: csschain::Driver>(session: &csschain::Session<D>) -> Result<(), csschain::ChainError> {
/// let nav = session.css("nav");
/// nav.exists()?.is_visible()?;
/// nav.css("a.active").has_text("Home")?.has_attribute("href", "/")?;
/// # Ok(())
/// # }
/// ```
pub struct CssNode<'a, D: Driver> {
    session: &'a Session<D>,
    context: Option<&'a CssNode<'a, D>>,
    selector: Option<String>,
    sub_expression: String,
    element: RefCell<Slot<D::Element>>,
    props: RefCell<Map<String, Json>>,
}

impl<'a, D: Driver> CssNode<'a, D> {
    pub(crate) fn root(session: &'a Session<D>, selector: String) -> Self {
        let sub_expression = format!("jQuery('{}')", selector);
        Self::new(session, None, Some(selector), sub_expression, Slot::Unset)
    }

    fn new(
        session: &'a Session<D>,
        context: Option<&'a CssNode<'a, D>>,
        selector: Option<String>,
        sub_expression: String,
        element: Slot<D::Element>,
    ) -> Self {
        CssNode {
            session,
            context,
            selector,
            sub_expression,
            element: RefCell::new(element),
            props: RefCell::new(Map::new()),
        }
    }

    fn derived(&self, sub_expression: String, element: D::Element) -> CssNode<'_, D> {
        CssNode::new(
            self.session,
            Some(self),
            None,
            sub_expression,
            Slot::Resolved(Some(element)),
        )
    }

    /// Descend to the elements matching `selector` inside this node's element.
    pub fn css(&self, selector: impl Into<String>) -> CssNode<'_, D> {
        let selector = selector.into();
        let sub_expression = format!(".find('{}')", selector);
        CssNode::new(
            self.session,
            Some(self),
            Some(selector),
            sub_expression,
            Slot::Unset,
        )
    }

    /// The step this node was built from.
    ///
    /// Note that this is not the same as [`parent`](CssNode::parent).
    pub fn end(&self) -> Result<&'a CssNode<'a, D>, ChainError> {
        self.context.ok_or_else(|| ChainError::InvalidChain {
            expression: self.expression(),
            reason: "End of the context: no end() to be returned".to_string(),
        })
    }

    /// The breadcrumb of this chain, root to leaf, e.g. `jQuery('ul').find('li').eq(2)`.
    pub fn expression(&self) -> String {
        let mut expression = match self.context {
            Some(context) => context.expression(),
            None => String::new(),
        };
        expression.push_str(&self.sub_expression);
        expression
    }

    /// The space-joined CSS path of this chain, if every step has one.
    pub fn css_selector(&self) -> String {
        self.css_path()
            .unwrap_or_else(|| NO_CSS_SELECTOR.to_string())
    }

    fn css_path(&self) -> Option<String> {
        let selector = self.selector.as_ref()?;
        match self.context {
            Some(context) => Some(format!("{} {}", context.css_path()?, selector)),
            None => Some(selector.clone()),
        }
    }

    /// The element this node resolves to, or `None` if nothing matches.
    ///
    /// The result is memoized, absence included. Pass `refresh` to look the element up
    /// again inside the (memoized) context element. Nodes built by derived steps have no
    /// selector to look up and fail with [`ChainError::InvalidChain`] on refresh.
    pub fn element(&self, refresh: bool) -> Result<Option<D::Element>, ChainError> {
        if !refresh {
            if let Slot::Resolved(ref element) = *self.element.borrow() {
                return Ok(element.clone());
            }
        }

        let selector = self.selector.as_deref().ok_or_else(|| ChainError::InvalidChain {
            expression: self.expression(),
            reason: "Cannot resolve the element again, because it was not found with a css selector"
                .to_string(),
        })?;
        let xpath = self.session.translator().css_to_xpath(selector)?;
        let scope = self.context_element()?;
        let found = self.session.driver().find(scope.as_ref(), &xpath)?;
        debug!(
            expression = %self.expression(),
            found = found.is_some(),
            refresh,
            "resolved element"
        );

        *self.element.borrow_mut() = Slot::Resolved(found.clone());
        Ok(found)
    }

    /// All elements matching this node's selector inside its context, in document order.
    pub fn elements(&self) -> Result<Vec<D::Element>, ChainError> {
        let selector = self.selector.as_deref().ok_or_else(|| ChainError::InvalidChain {
            expression: self.expression(),
            reason: "Cannot get elements() from this selector, because it was not used purely \
                     with css selectors"
                .to_string(),
        })?;
        let xpath = self.session.translator().css_to_xpath(selector)?;
        let scope = self.context_element()?;
        let elements = self.session.driver().find_all(scope.as_ref(), &xpath)?;
        debug!(expression = %self.expression(), count = elements.len(), "resolved elements");
        Ok(elements)
    }

    fn context_element(&self) -> Result<Option<D::Element>, ChainError> {
        match self.context {
            Some(context) => context.ensure_element().map(Some),
            None => Ok(None),
        }
    }

    fn ensure_element(&self) -> Result<D::Element, ChainError> {
        self.element(false)?.ok_or_else(|| ChainError::NotFound {
            expression: self.expression(),
        })
    }

    fn driver(&self) -> &D {
        self.session.driver()
    }

    /// One child per matching element, tagged `.eq(i)`.
    pub fn all(&self) -> Result<Vec<CssNode<'_, D>>, ChainError> {
        Ok(self
            .elements()?
            .into_iter()
            .enumerate()
            .map(|(i, element)| self.derived(format!(".eq({})", i), element))
            .collect())
    }

    /// The `index`th (0-based) matching element.
    pub fn eq(&self, index: usize) -> Result<CssNode<'_, D>, ChainError> {
        let mut elements = self.elements()?;
        if index >= elements.len() {
            return Err(ChainError::AssertionMismatch {
                label: format!("{}.eq({})", self.expression(), index),
                expected: format!("a match with index {}", index),
                actual: format!("{} matching elements", elements.len()),
            });
        }
        let element = elements.swap_remove(index);
        Ok(self.derived(format!(".eq({})", index), element))
    }

    /// The structural parent of this node's element.
    pub fn parent(&self) -> Result<CssNode<'_, D>, ChainError> {
        let element = self.ensure_element()?;
        let sub_expression = ".parent()".to_string();
        match self.driver().find(Some(&element), "..")? {
            Some(parent) => Ok(self.derived(sub_expression, parent)),
            None => Err(ChainError::NotFound {
                expression: self.expression() + &sub_expression,
            }),
        }
    }

    /// The nearest ancestor of this node's element matching `filter`.
    pub fn closest(&self, filter: &str) -> Result<CssNode<'_, D>, ChainError> {
        let xpath = self
            .session
            .translator()
            .css_to_xpath_with_prefix(filter, ANCESTOR)?;
        let xpath = format!("({})[last()]", xpath);
        let element = self.ensure_element()?;
        let sub_expression = format!(".closest('{}')", filter);
        match self.driver().find(Some(&element), &xpath)? {
            Some(ancestor) => Ok(self.derived(sub_expression, ancestor)),
            None => Err(ChainError::NotFound {
                expression: self.expression() + &sub_expression,
            }),
        }
    }

    fn assert_that<T>(&self, label: String, actual: &T, matcher: &Matcher<T>) -> Result<(), ChainError>
    where
        T: fmt::Debug,
    {
        if matcher.matches(actual) {
            trace!(%label, "assertion passed");
            return Ok(());
        }
        Err(ChainError::AssertionMismatch {
            label,
            expected: matcher.description().to_string(),
            actual: format!("{:?}", actual),
        })
    }

    fn assert_present(
        &self,
        label: String,
        actual: Option<String>,
        matcher: &Matcher<String>,
    ) -> Result<(), ChainError> {
        match actual {
            Some(actual) => self.assert_that(label, &actual, matcher),
            None => Err(ChainError::AssertionMismatch {
                label,
                expected: matcher.description().to_string(),
                actual: "null".to_string(),
            }),
        }
    }

    /// Assert that this node resolves to an element.
    pub fn exists(&self) -> Result<&Self, ChainError> {
        self.ensure_element()?;
        Ok(self)
    }

    /// Assert that nothing matches. Same as `count(0)`.
    pub fn not_exists(&self) -> Result<&Self, ChainError> {
        self.count(0usize)
    }

    /// Assert on the number of matching elements.
    pub fn count(&self, expected: impl Into<Matcher<usize>>) -> Result<&Self, ChainError> {
        let count = self.get_count()?;
        self.assert_that(
            format!("{}.length()", self.expression()),
            &count,
            &expected.into(),
        )?;
        Ok(self)
    }

    /// The number of matching elements.
    pub fn get_count(&self) -> Result<usize, ChainError> {
        Ok(self.elements()?.len())
    }

    /// Assert that the element exists and is displayed.
    pub fn is_visible(&self) -> Result<&Self, ChainError> {
        let visible = self.driver().is_visible(&self.ensure_element()?)?;
        self.assert_that(
            format!("{} should be visible", self.expression()),
            &visible,
            &true.into(),
        )?;
        Ok(self)
    }

    /// Assert that the element exists and is not displayed.
    pub fn is_not_visible(&self) -> Result<&Self, ChainError> {
        let visible = self.driver().is_visible(&self.ensure_element()?)?;
        self.assert_that(
            format!("{} should NOT be visible", self.expression()),
            &visible,
            &false.into(),
        )?;
        Ok(self)
    }

    /// The rendered text of the element.
    pub fn text(&self) -> Result<String, ChainError> {
        Ok(self.driver().text(&self.ensure_element()?)?)
    }

    /// The rendered text of every matching element.
    pub fn texts(&self) -> Result<Vec<String>, ChainError> {
        self.all()?.iter().map(|node| node.text()).collect()
    }

    /// The inner HTML of the element.
    pub fn html(&self) -> Result<String, ChainError> {
        Ok(self.driver().html(&self.ensure_element()?, true)?)
    }

    /// The outer HTML of the element.
    pub fn outer_html(&self) -> Result<String, ChainError> {
        Ok(self.driver().html(&self.ensure_element()?, false)?)
    }

    /// An attribute of the element, `None` if it is not set.
    pub fn attribute(&self, name: &str) -> Result<Option<String>, ChainError> {
        Ok(self.driver().attribute(&self.ensure_element()?, name)?)
    }

    /// The current value of the form control.
    pub fn value(&self) -> Result<Option<String>, ChainError> {
        Ok(self.driver().value(&self.ensure_element()?)?)
    }

    /// Assert on the text of the element.
    pub fn has_text(&self, expected: impl Into<Matcher<String>>) -> Result<&Self, ChainError> {
        let text = self.text()?;
        self.assert_that(format!("{}.text()", self.expression()), &text, &expected.into())?;
        Ok(self)
    }

    /// Assert that the text of the element contains `substr`.
    pub fn contains_text(&self, substr: &str) -> Result<&Self, ChainError> {
        let text = self.text()?;
        self.assert_that(
            format!("{}:contains()", self.expression()),
            &text,
            &contains_string(substr),
        )?;
        Ok(self)
    }

    /// Assert that the text of the element does not contain `substr`.
    pub fn contains_not_text(&self, substr: &str) -> Result<&Self, ChainError> {
        let text = self.text()?;
        self.assert_that(
            format!("{}:not(contains())", self.expression()),
            &text,
            &not(contains_string(substr)),
        )?;
        Ok(self)
    }

    /// Assert on the inner (`inner = true`) or outer HTML of the element.
    pub fn has_html(
        &self,
        expected: impl Into<Matcher<String>>,
        inner: bool,
    ) -> Result<&Self, ChainError> {
        let (html, label) = if inner {
            (self.html()?, format!("{}.innerHtml()", self.expression()))
        } else {
            (self.outer_html()?, format!("{}.outerHtml()", self.expression()))
        };
        self.assert_that(label, &html, &expected.into())?;
        Ok(self)
    }

    /// Assert on an attribute of the element. A missing attribute never matches.
    pub fn has_attribute(
        &self,
        name: &str,
        expected: impl Into<Matcher<String>>,
    ) -> Result<&Self, ChainError> {
        let value = self.attribute(name)?;
        self.assert_present(
            format!("{}.attr('{}')", self.expression(), name),
            value,
            &expected.into(),
        )?;
        Ok(self)
    }

    /// Assert that the element carries the CSS class `class_name`.
    pub fn has_class(&self, class_name: &str) -> Result<&Self, ChainError> {
        let classes = self.attribute("class")?.unwrap_or_default();
        let has_class = classes.split_whitespace().any(|c| c == class_name);
        self.assert_that(
            format!("{}.hasClass('{}')", self.expression(), class_name),
            &has_class,
            &true.into(),
        )?;
        Ok(self)
    }

    /// Assert on the value of the form control. A missing value never matches.
    pub fn has_value(&self, expected: impl Into<Matcher<String>>) -> Result<&Self, ChainError> {
        let value = self.value()?;
        self.assert_present(format!("{}.val()", self.expression()), value, &expected.into())?;
        Ok(self)
    }

    /// Assert that the value of the form control contains `substr`.
    pub fn contains_value(&self, substr: &str) -> Result<&Self, ChainError> {
        let value = self.value()?;
        self.assert_present(
            format!("{}.val().contains()", self.expression()),
            value,
            &contains_string(substr),
        )?;
        Ok(self)
    }

    /// Click on the element.
    pub fn click(&self) -> Result<&Self, ChainError> {
        let element = self.ensure_element()?;
        self.driver()
            .click(&element)
            .map_err(|e| ChainError::interaction("click", self.expression(), e))?;
        Ok(self)
    }

    /// Move the pointer over the element.
    pub fn mouse_over(&self) -> Result<&Self, ChainError> {
        let element = self.ensure_element()?;
        self.driver()
            .mouse_over(&element)
            .map_err(|e| ChainError::interaction("hover over", self.expression(), e))?;
        Ok(self)
    }

    /// Replace the value of the form control.
    pub fn set_value(&self, value: &str) -> Result<&Self, ChainError> {
        let element = self.ensure_element()?;
        self.driver()
            .set_value(&element, value)
            .map_err(|e| ChainError::interaction("set the value of", self.expression(), e))?;
        Ok(self)
    }

    /// Fill the form control inside the element whose id, name, placeholder or label is
    /// `locator`.
    pub fn fill_field(&self, locator: &str, value: &str) -> Result<&Self, ChainError> {
        let (field, expression) = self.field(locator)?;
        self.driver()
            .set_value(&field, value)
            .map_err(|e| ChainError::interaction("fill", expression, e))?;
        Ok(self)
    }

    /// Check the checkbox or radio button inside the element whose id, name, placeholder or
    /// label is `locator`.
    pub fn check_field(&self, locator: &str) -> Result<&Self, ChainError> {
        let (field, expression) = self.field(locator)?;
        self.driver()
            .check(&field)
            .map_err(|e| ChainError::interaction("check", expression, e))?;
        Ok(self)
    }

    fn field(&self, locator: &str) -> Result<(D::Element, String), ChainError> {
        let element = self.ensure_element()?;
        let expression = format!("{}.field('{}')", self.expression(), locator);
        match self.driver().find(Some(&element), &css::field_xpath(locator))? {
            Some(field) => Ok((field, expression)),
            None => Err(ChainError::NotFound { expression }),
        }
    }

    fn wait_until<F>(
        &self,
        timeout: Option<Duration>,
        condition: &'static str,
        poll: F,
    ) -> Result<WaitOutcome, ChainError>
    where
        F: FnMut() -> Result<bool, ChainError>,
    {
        let outcome = self.session.wait_for(timeout, poll)?;
        if !outcome.satisfied {
            return Err(ChainError::Timeout {
                condition,
                expression: self.expression(),
                elapsed: outcome.elapsed,
                timeout: outcome.timeout,
            });
        }
        Ok(outcome)
    }

    /// Poll until the element exists.
    ///
    /// `timeout` defaults to the session's configured budget.
    pub fn wait_for_exists(&self, timeout: Option<Duration>) -> Result<&Self, ChainError> {
        self.wait_until(timeout, "existence of element", || {
            Ok(self.element(true)?.is_some())
        })?;
        self.exists()
    }

    /// Poll until the element is gone.
    pub fn wait_for_not_exists(&self, timeout: Option<Duration>) -> Result<&Self, ChainError> {
        self.wait_until(timeout, "element to NOT exist", || {
            Ok(self.element(true)?.is_none())
        })?;
        Ok(self)
    }

    /// Poll until the element exists and is displayed.
    pub fn wait_for_visible(&self, timeout: Option<Duration>) -> Result<&Self, ChainError> {
        self.wait_until(timeout, "visibility of element", || {
            match self.element(true)? {
                Some(element) => Ok(self.driver().is_visible(&element)?),
                None => Ok(false),
            }
        })?;
        Ok(self)
    }

    /// Poll until the element is hidden.
    ///
    /// An absent element ends the wait only if `absent_ok` is set; otherwise polling goes on
    /// until the element shows up hidden or time runs out.
    pub fn wait_for_not_visible(
        &self,
        timeout: Option<Duration>,
        absent_ok: bool,
    ) -> Result<&Self, ChainError> {
        self.wait_until(timeout, "element to disappear", || {
            match self.element(true)? {
                Some(element) => Ok(!self.driver().is_visible(&element)?),
                None => Ok(absent_ok),
            }
        })?;
        Ok(self)
    }

    /// A value previously stored with [`set_prop`](CssNode::set_prop).
    pub fn prop(&self, key: &str) -> Option<Json> {
        self.props.borrow().get(key).cloned()
    }

    /// Store an arbitrary value on this node.
    pub fn set_prop(&self, key: impl Into<String>, value: impl Into<Json>) -> &Self {
        self.props.borrow_mut().insert(key.into(), value.into());
        self
    }

    /// All stored values.
    pub fn props(&self) -> Map<String, Json> {
        self.props.borrow().clone()
    }

    /// Evaluate `expression` appended to this chain's jQuery breadcrumb in the browser,
    /// e.g. `.data('id')`, and return the result.
    pub fn evaluate_jquery_expression(&self, expression: &str) -> Result<Json, ChainError> {
        let script = format!(
            "{}\n\nwithJQuery(function(jQuery) {{\ndone({}{});\n\n}})",
            WITH_JQUERY,
            self.expression(),
            expression
        );
        self.execute_async(script, Vec::new())
    }

    /// Run `code`, a JavaScript function taking the jQuery object of this chain and a
    /// `done` callback. Whatever is passed to `done` is returned.
    pub fn evaluate_with_jquery(&self, code: &str) -> Result<Json, ChainError> {
        let script = format!(
            "{}\n\nwithJQuery(function(jQuery) {{\n    var todo = {};\n    var jqueryElement = {}\n\n    todo(jqueryElement, done);\n\n}})",
            WITH_JQUERY,
            code,
            self.expression()
        );
        self.execute_async(script, Vec::new())
    }

    /// Scroll the element into view.
    pub fn scroll_into_view(&self, align_to_top: bool) -> Result<&Self, ChainError> {
        let script = format!(
            "{}\n\nwithJQuery(function(jQuery) {{\n{}.get(0).scrollIntoView({})\ndone();\n\n}})",
            WITH_JQUERY,
            self.expression(),
            align_to_top
        );
        self.execute_async(script, Vec::new())?;
        Ok(self)
    }

    fn execute_async(&self, script: String, args: Vec<Json>) -> Result<Json, ChainError> {
        let script = format!("var done = arguments[{}]; {}", args.len(), script);
        debug!(expression = %self.expression(), "executing async script");
        self.driver()
            .execute_async(&script, args)
            .map_err(|e| match e {
                DriverError::Script(message) => ChainError::ScriptFailure { script, message },
                e => ChainError::Driver(e),
            })
    }
}

impl<D: Driver> fmt::Debug for CssNode<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let element = match *self.element.borrow() {
            Slot::Unset => "unresolved".to_string(),
            Slot::Resolved(None) => "absent".to_string(),
            Slot::Resolved(Some(ref e)) => format!("{:?}", e),
        };
        f.debug_struct("CssNode")
            .field("expression", &self.expression())
            .field("css_selector", &self.css_selector())
            .field("element", &element)
            .finish()
    }
}
