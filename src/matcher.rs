//! Composable value matchers used by the assertion methods.
//!
//! Every assertion on a [`CssNode`](crate::CssNode) accepts anything that converts into a
//! [`Matcher`]. Plain literals turn into [`equal_to`]:
//!
//! ```
//! use csschain::matcher::{contains_string, greater_than, not, Matcher};
//!
//! let exact: Matcher<String> = "Save".into();
//! assert!(exact.matches(&"Save".to_string()));
//!
//! let loose: Matcher<String> = not(contains_string("error"));
//! assert!(loose.matches(&"all good".to_string()));
//! assert_eq!(loose.description(), "not a string containing \"error\"");
//!
//! assert!(greater_than(2usize).matches(&3));
//! ```

use std::fmt;

/// A predicate over `T` together with a human-readable description of what it expects.
pub struct Matcher<T: ?Sized> {
    description: String,
    test: Box<dyn Fn(&T) -> bool>,
}

impl<T: ?Sized> Matcher<T> {
    /// Build a matcher from a description and a test function.
    pub fn new<F>(description: impl Into<String>, test: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        Matcher {
            description: description.into(),
            test: Box::new(test),
        }
    }

    /// Whether `actual` satisfies this matcher.
    pub fn matches(&self, actual: &T) -> bool {
        (self.test)(actual)
    }

    /// What this matcher expects.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<T: ?Sized> fmt::Debug for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("description", &self.description)
            .finish()
    }
}

impl From<&str> for Matcher<String> {
    fn from(expected: &str) -> Self {
        equal_to(expected.to_string())
    }
}

impl From<String> for Matcher<String> {
    fn from(expected: String) -> Self {
        equal_to(expected)
    }
}

impl From<usize> for Matcher<usize> {
    fn from(expected: usize) -> Self {
        equal_to(expected)
    }
}

impl From<bool> for Matcher<bool> {
    fn from(expected: bool) -> Self {
        equal_to(expected)
    }
}

/// Matches values equal to `expected`.
pub fn equal_to<T>(expected: T) -> Matcher<T>
where
    T: PartialEq + fmt::Debug + 'static,
{
    Matcher::new(format!("{:?}", expected), move |actual: &T| *actual == expected)
}

/// Matches strings containing `needle`.
pub fn contains_string(needle: impl Into<String>) -> Matcher<String> {
    let needle = needle.into();
    Matcher::new(
        format!("a string containing {:?}", needle),
        move |actual: &String| actual.contains(needle.as_str()),
    )
}

/// Matches strings starting with `prefix`.
pub fn starts_with(prefix: impl Into<String>) -> Matcher<String> {
    let prefix = prefix.into();
    Matcher::new(
        format!("a string starting with {:?}", prefix),
        move |actual: &String| actual.starts_with(prefix.as_str()),
    )
}

/// Matches strings ending with `suffix`.
pub fn ends_with(suffix: impl Into<String>) -> Matcher<String> {
    let suffix = suffix.into();
    Matcher::new(
        format!("a string ending with {:?}", suffix),
        move |actual: &String| actual.ends_with(suffix.as_str()),
    )
}

/// Matches values strictly greater than `bound`.
pub fn greater_than<T>(bound: T) -> Matcher<T>
where
    T: PartialOrd + fmt::Debug + 'static,
{
    Matcher::new(format!("a value greater than {:?}", bound), move |actual: &T| {
        *actual > bound
    })
}

/// Matches values strictly less than `bound`.
pub fn less_than<T>(bound: T) -> Matcher<T>
where
    T: PartialOrd + fmt::Debug + 'static,
{
    Matcher::new(format!("a value less than {:?}", bound), move |actual: &T| {
        *actual < bound
    })
}

/// Inverts `inner`.
pub fn not<T: ?Sized + 'static>(inner: impl Into<Matcher<T>>) -> Matcher<T> {
    let inner = inner.into();
    Matcher::new(format!("not {}", inner.description), move |actual: &T| {
        !inner.matches(actual)
    })
}

/// A matcher from an arbitrary closure.
pub fn predicate<T: ?Sized, F>(description: impl Into<String>, test: F) -> Matcher<T>
where
    F: Fn(&T) -> bool + 'static,
{
    Matcher::new(description, test)
}
