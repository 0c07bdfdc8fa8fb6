//! Fluent CSS selector chains for browser-based acceptance tests.
//!
//! This crate lets a test express "find this element, assert on it, drill into its children,
//! assert again" as a single chained expression. Chains are resolved lazily against a
//! [WebDriver] session: nothing is looked up until an assertion or interaction needs an
//! element, and every step memoizes what it found. Steps that have to wait for the page to
//! settle poll with a bounded timeout.
//!
//! Lookups are written as [CSS selectors] and sent to the browser as XPath, which makes it
//! possible to also search *upwards* with [`CssNode::closest`]. Every failure carries a
//! jQuery-style breadcrumb of the chain, such as `jQuery('form').find('input').eq(2)`, so it
//! is obvious which step went wrong.
//!
//! # Examples
//!
//! These examples all assume that you have a [WebDriver compatible] process running on port
//! 4444. A quick way to get one is to run [`geckodriver`] at the command line.
//!
//! ```no_run
//! use csschain::{Config, Session};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::connect(Config::from_env()?)?;
//!     session.driver().goto("https://en.wikipedia.org/wiki/Foobar")?;
//!
//!     let content = session.css("#content");
//!     content.exists()?.is_visible()?;
//!     content.css("h1").has_text("Foobar")?;
//!
//!     // every link in the first paragraph
//!     let paragraphs = content.css("p");
//!     let paragraph = paragraphs.eq(0)?;
//!     let links = paragraph.css("a");
//!     for link in links.all()? {
//!         println!("{}", link.text()?);
//!     }
//!
//!     session.css("#searchInput").set_value("foo lake")?;
//!     session
//!         .css(".suggestions")
//!         .wait_for_visible(Some(Duration::from_secs(2)))?;
//!     Ok(())
//! }
//! ```
//!
//! Note that `paragraph` was picked with [`CssNode::eq`] and has no CSS path of its own, so
//! `paragraph.all()` would be rejected with [`ChainError::InvalidChain`]. Selectors below it,
//! like `paragraph.css("a")`, can be enumerated as usual.
//!
//! Tests that do not need a browser can use the scripted
//! [`MockDriver`](testing::MockDriver), available with the `test_helpers` feature.
//!
//! [WebDriver]: https://www.w3.org/TR/webdriver/
//! [CSS selectors]: https://developer.mozilla.org/en-US/docs/Web/CSS/CSS_Selectors
//! [WebDriver compatible]: https://github.com/Fyrd/caniuse/issues/2757#issuecomment-304529217
//! [`geckodriver`]: https://github.com/mozilla/geckodriver
#![deny(missing_docs)]
#![warn(missing_debug_implementations, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod chain;
pub mod config;
pub mod css;
pub mod driver;
pub mod error;
pub mod matcher;
pub mod session;
pub mod wait;

#[cfg(feature = "native-tls")]
#[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
pub mod sync;

#[cfg(any(test, feature = "test_helpers"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test_helpers")))]
pub mod testing;

pub use crate::chain::CssNode;
pub use crate::config::Config;
pub use crate::css::Translator;
pub use crate::driver::Driver;
pub use crate::error::{ChainError, ConfigError, DriverError};
pub use crate::matcher::Matcher;
pub use crate::session::Session;
pub use crate::wait::{Wait, WaitOutcome};

#[cfg(feature = "native-tls")]
pub use crate::error::ConnectError;
#[cfg(feature = "native-tls")]
pub use crate::sync::WebDriver;
