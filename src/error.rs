//! Error types.

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// An error reported by a [`Driver`](crate::Driver) while talking to the browser.
#[derive(Debug)]
pub enum DriverError {
    /// The element exists, but cannot receive the requested interaction.
    ///
    /// WebDriver reports this as ["element not interactable"], ["element click
    /// intercepted"] or, for pointer moves, ["move target out of bounds"], typically because
    /// the element is hidden or covered.
    ///
    /// ["element not interactable"]: https://www.w3.org/TR/webdriver/#dfn-element-not-interactable
    /// ["element click intercepted"]: https://www.w3.org/TR/webdriver/#dfn-element-click-intercepted
    /// ["move target out of bounds"]: https://www.w3.org/TR/webdriver/#dfn-move-target-out-of-bounds
    NotInteractable(String),

    /// An injected script raised an error inside the browser.
    Script(String),

    /// Any other failure of the underlying browser command.
    Command(Box<dyn Error + Send + Sync + 'static>),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DriverError::NotInteractable(ref msg) => write!(f, "element not interactable: {}", msg),
            DriverError::Script(ref msg) => write!(f, "javascript error: {}", msg),
            DriverError::Command(ref e) => write!(f, "browser command failed: {}", e),
        }
    }
}

impl Error for DriverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            DriverError::Command(ref e) => Some(&**e),
            DriverError::NotInteractable(..) | DriverError::Script(..) => None,
        }
    }
}

/// An error occurred while executing a step of a selector chain.
#[derive(Debug)]
pub enum ChainError {
    /// Resolution yielded no element where exactly one was required.
    NotFound {
        /// Breadcrumb expression of the node that failed to resolve.
        expression: String,
    },

    /// An operation needing a CSS path was invoked on a node built from a pre-resolved element.
    ///
    /// This is a programming error in the test, not a transient condition.
    InvalidChain {
        /// Breadcrumb expression of the offending node.
        expression: String,
        /// What was attempted.
        reason: String,
    },

    /// A resolved value did not satisfy the expected matcher.
    AssertionMismatch {
        /// Label built from the breadcrumb expression and the asserted property.
        label: String,
        /// Description of the matcher.
        expected: String,
        /// Debug rendering of the actual value.
        actual: String,
    },

    /// A bounded wait ran out of time.
    Timeout {
        /// What was being waited for, e.g. "existence of element".
        condition: &'static str,
        /// Breadcrumb expression of the awaited node.
        expression: String,
        /// Time spent waiting.
        elapsed: Duration,
        /// Time budget of the wait.
        timeout: Duration,
    },

    /// The element exists, but the driver refused the interaction.
    InteractionBlocked {
        /// The interaction that was attempted, e.g. "click".
        action: &'static str,
        /// Breadcrumb expression of the target node.
        expression: String,
        /// The underlying driver error.
        source: DriverError,
    },

    /// An injected browser script raised an error.
    ScriptFailure {
        /// The full script text that was sent to the browser.
        script: String,
        /// The error message reported by the script engine.
        message: String,
    },

    /// A CSS selector could not be translated into XPath.
    InvalidSelector {
        /// The selector as given.
        selector: String,
        /// Why translation failed.
        reason: String,
    },

    /// Any other driver failure.
    Driver(DriverError),
}

impl ChainError {
    /// Returns true if this error indicates that a required element was not found.
    ///
    /// Equivalent to
    /// ```
    /// # use csschain::error::ChainError;
    /// # let e = ChainError::NotFound { expression: String::new() };
    /// let is_miss = matches!(e, ChainError::NotFound { .. });
    /// ```
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChainError::NotFound { .. })
    }

    /// Returns true if this error is the result of a timed out wait.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChainError::Timeout { .. })
    }

    pub(crate) fn interaction(action: &'static str, expression: String, e: DriverError) -> Self {
        match e {
            DriverError::NotInteractable(..) => ChainError::InteractionBlocked {
                action,
                expression,
                source: e,
            },
            e => ChainError::Driver(e),
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ChainError::NotFound { ref expression } => {
                write!(f, "The element {} cannot be found", expression)
            }
            ChainError::InvalidChain {
                ref expression,
                ref reason,
            } => write!(
                f,
                "{}: this expression cannot be resolved to elements: {}",
                reason, expression
            ),
            ChainError::AssertionMismatch {
                ref label,
                ref expected,
                ref actual,
            } => write!(f, "{}\nExpected: {}\n     but: was {}", label, expected, actual),
            ChainError::Timeout {
                condition,
                ref expression,
                elapsed,
                timeout,
            } => write!(
                f,
                "Waiting for {} >> {} << timed out. Waited for {:.2} / {:.2} seconds.",
                condition,
                expression,
                elapsed.as_secs_f64(),
                timeout.as_secs_f64()
            ),
            ChainError::InteractionBlocked {
                action,
                ref expression,
                ref source,
            } => write!(
                f,
                "tried to {} element, but it was not interactable: {} ({})",
                action, expression, source
            ),
            ChainError::ScriptFailure {
                ref script,
                ref message,
            } => write!(f, "Failed to execute Javascript: \n\n{} {}", script, message),
            ChainError::InvalidSelector {
                ref selector,
                ref reason,
            } => write!(
                f,
                "Failed to convert locator: {} to xpath: {}",
                selector, reason
            ),
            ChainError::Driver(ref e) => write!(f, "{}", e),
        }
    }
}

impl Error for ChainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            ChainError::InteractionBlocked { ref source, .. } => Some(source),
            ChainError::Driver(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<DriverError> for ChainError {
    fn from(e: DriverError) -> Self {
        ChainError::Driver(e)
    }
}

impl From<crate::css::SelectorError> for ChainError {
    fn from(e: crate::css::SelectorError) -> Self {
        ChainError::InvalidSelector {
            selector: e.selector,
            reason: e.reason,
        }
    }
}

/// The configuration could not be loaded.
#[derive(Debug)]
pub enum ConfigError {
    /// The configured WebDriver URL is invalid.
    BadWebdriverUrl(url::ParseError),
    /// The configuration document is not valid JSON for [`Config`](crate::Config).
    Json(serde_json::Error),
    /// An environment variable holds a value that cannot be used.
    Env {
        /// Name of the variable.
        var: &'static str,
        /// The value found.
        value: String,
    },
    /// A setting is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConfigError::BadWebdriverUrl(ref e) => write!(f, "webdriver url is invalid: {}", e),
            ConfigError::Json(ref e) => write!(f, "invalid configuration: {}", e),
            ConfigError::Env { var, ref value } => {
                write!(f, "environment variable {} has unusable value {:?}", var, value)
            }
            ConfigError::Invalid(ref msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            ConfigError::BadWebdriverUrl(ref e) => Some(e),
            ConfigError::Json(ref e) => Some(e),
            ConfigError::Env { .. } | ConfigError::Invalid(..) => None,
        }
    }
}

impl From<url::ParseError> for ConfigError {
    fn from(e: url::ParseError) -> Self {
        ConfigError::BadWebdriverUrl(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// An error occurred while establishing a browser session.
#[cfg(feature = "native-tls")]
#[derive(Debug)]
pub enum ConnectError {
    /// The blocking runtime could not be started.
    Runtime(std::io::Error),
    /// The WebDriver server did not create a session.
    Session(fantoccini::error::NewSessionError),
}

#[cfg(feature = "native-tls")]
impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConnectError::Runtime(ref e) => write!(f, "could not start runtime: {}", e),
            ConnectError::Session(ref e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "native-tls")]
impl Error for ConnectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            ConnectError::Runtime(ref e) => Some(e),
            ConnectError::Session(ref e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_display_error_doesnt_stackoverflow() {
        println!("{}", ChainError::Driver(DriverError::Script("boom".to_string())));
        println!("{}", ConfigError::Invalid("test".to_string()));
    }

    #[test]
    fn timeout_formats_seconds_with_two_decimals() {
        let e = ChainError::Timeout {
            condition: "existence of element",
            expression: "jQuery('ul').find('li')".to_string(),
            elapsed: Duration::from_millis(1234),
            timeout: Duration::from_millis(5000),
        };
        assert_eq!(
            e.to_string(),
            "Waiting for existence of element >> jQuery('ul').find('li') << timed out. \
             Waited for 1.23 / 5.00 seconds."
        );
        assert!(e.is_timeout());
        assert!(!e.is_not_found());
    }

    #[test]
    fn only_not_interactable_becomes_interaction_blocked() {
        let blocked = ChainError::interaction(
            "click",
            "jQuery('a')".to_string(),
            DriverError::NotInteractable("hidden".to_string()),
        );
        assert!(matches!(
            blocked,
            ChainError::InteractionBlocked { action: "click", .. }
        ));
        assert!(blocked.source().is_some());

        let other = ChainError::interaction(
            "click",
            "jQuery('a')".to_string(),
            DriverError::Script("nope".to_string()),
        );
        assert!(matches!(other, ChainError::Driver(DriverError::Script(..))));
    }
}
