//! The browser seam a selector chain talks to.

use crate::error::DriverError;
use serde_json::Value as Json;
use std::fmt::Debug;

/// A blocking browser session that can locate and operate on elements.
///
/// All lookups are expressed as XPath, evaluated either against the document (`scope` is
/// `None`) or relative to a previously located element. Every method is a single blocking
/// round-trip; implementations must not retry on their own.
pub trait Driver {
    /// A handle to a single element on the current page.
    type Element: Clone + Debug;

    /// Find the first element matching `xpath` within `scope`.
    ///
    /// `Ok(None)` is returned if nothing matches.
    fn find(
        &self,
        scope: Option<&Self::Element>,
        xpath: &str,
    ) -> Result<Option<Self::Element>, DriverError>;

    /// Find all elements matching `xpath` within `scope`, in document order.
    fn find_all(
        &self,
        scope: Option<&Self::Element>,
        xpath: &str,
    ) -> Result<Vec<Self::Element>, DriverError>;

    /// Simulate the user clicking on the element.
    fn click(&self, element: &Self::Element) -> Result<(), DriverError>;

    /// Move the pointer over the element.
    fn mouse_over(&self, element: &Self::Element) -> Result<(), DriverError>;

    /// The rendered text of the element.
    fn text(&self, element: &Self::Element) -> Result<String, DriverError>;

    /// The inner (`inner = true`) or outer HTML of the element.
    fn html(&self, element: &Self::Element, inner: bool) -> Result<String, DriverError>;

    /// Look up an attribute by name. `Ok(None)` if the element does not carry it.
    fn attribute(&self, element: &Self::Element, name: &str)
        -> Result<Option<String>, DriverError>;

    /// The current `value` of a form control.
    fn value(&self, element: &Self::Element) -> Result<Option<String>, DriverError>;

    /// Replace the current value of a form control.
    fn set_value(&self, element: &Self::Element, value: &str) -> Result<(), DriverError>;

    /// Make sure a checkbox or radio button is checked.
    fn check(&self, element: &Self::Element) -> Result<(), DriverError>;

    /// Whether the element is displayed.
    fn is_visible(&self, element: &Self::Element) -> Result<bool, DriverError>;

    /// Run an asynchronous script. The script signals completion by calling the last
    /// argument it is passed.
    fn execute_async(&self, script: &str, args: Vec<Json>) -> Result<Json, DriverError>;
}

impl<'d, D: Driver + ?Sized> Driver for &'d D {
    type Element = D::Element;

    fn find(
        &self,
        scope: Option<&Self::Element>,
        xpath: &str,
    ) -> Result<Option<Self::Element>, DriverError> {
        (**self).find(scope, xpath)
    }

    fn find_all(
        &self,
        scope: Option<&Self::Element>,
        xpath: &str,
    ) -> Result<Vec<Self::Element>, DriverError> {
        (**self).find_all(scope, xpath)
    }

    fn click(&self, element: &Self::Element) -> Result<(), DriverError> {
        (**self).click(element)
    }

    fn mouse_over(&self, element: &Self::Element) -> Result<(), DriverError> {
        (**self).mouse_over(element)
    }

    fn text(&self, element: &Self::Element) -> Result<String, DriverError> {
        (**self).text(element)
    }

    fn html(&self, element: &Self::Element, inner: bool) -> Result<String, DriverError> {
        (**self).html(element, inner)
    }

    fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        (**self).attribute(element, name)
    }

    fn value(&self, element: &Self::Element) -> Result<Option<String>, DriverError> {
        (**self).value(element)
    }

    fn set_value(&self, element: &Self::Element, value: &str) -> Result<(), DriverError> {
        (**self).set_value(element, value)
    }

    fn check(&self, element: &Self::Element) -> Result<(), DriverError> {
        (**self).check(element)
    }

    fn is_visible(&self, element: &Self::Element) -> Result<bool, DriverError> {
        (**self).is_visible(element)
    }

    fn execute_async(&self, script: &str, args: Vec<Json>) -> Result<Json, DriverError> {
        (**self).execute_async(script, args)
    }
}
