//! The root from which selector chains are built.

use crate::chain::CssNode;
use crate::config::Config;
use crate::css::Translator;
use crate::driver::Driver;
use crate::wait::{Wait, WaitOutcome};
use std::cell::RefCell;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// A browser session with the CSS selector engine registered.
///
/// Every chain starts here, either at the document with [`Session::css`] or inside the
/// current context with [`Session::context`]. Creating the session is all the setup a
/// scenario needs.
pub struct Session<D> {
    driver: D,
    translator: Translator,
    config: Config,
    context: RefCell<Option<String>>,
}

impl<D: Driver> Session<D> {
    /// A session over `driver` with the default configuration.
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, Config::default())
    }

    /// A session over `driver` with the given configuration.
    pub fn with_config(driver: D, config: Config) -> Self {
        debug!(context = %config.context, timeout_ms = config.timeout_ms, "registered css selector engine");
        Session {
            driver,
            translator: Translator::new(),
            config,
            context: RefCell::new(None),
        }
    }

    /// The underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Give up the session and return the driver, e.g. to close it.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The CSS to XPath translator used by all chains of this session.
    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Start a chain at the document.
    ///
    /// Nothing is looked up until the chain is asserted on.
    pub fn css(&self, selector: impl Into<String>) -> CssNode<'_, D> {
        CssNode::root(self, selector.into())
    }

    /// A chain rooted at the current context, `body` unless changed with
    /// [`Session::set_context`].
    pub fn context(&self) -> CssNode<'_, D> {
        let selector = self
            .context
            .borrow()
            .clone()
            .unwrap_or_else(|| self.config.context.clone());
        self.css(selector)
    }

    /// Root subsequent [`Session::context`] chains at `selector`.
    pub fn set_context(&self, selector: impl Into<String>) {
        *self.context.borrow_mut() = Some(selector.into());
    }

    /// Go back to the configured default context.
    pub fn reset_context(&self) {
        self.context.borrow_mut().take();
    }

    /// A [`Wait`] with this session's polling interval and `timeout`, or the configured
    /// default budget if `None`.
    pub fn wait(&self, timeout: Option<Duration>) -> Wait {
        self.config.wait(timeout)
    }

    /// Poll `condition` with [`Session::wait`] until it holds or `timeout` passes.
    pub fn wait_for<F, E>(&self, timeout: Option<Duration>, condition: F) -> Result<WaitOutcome, E>
    where
        F: FnMut() -> Result<bool, E>,
    {
        self.wait(timeout).until(condition)
    }
}

impl<D> fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("context", &self.context.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;
    use std::convert::Infallible;

    #[test]
    fn context_defaults_to_config_and_can_be_moved() {
        let mock = MockDriver::new();
        let session = Session::with_config(&mock, Config::default().with_context("main"));
        assert_eq!(session.context().expression(), "jQuery('main')");

        session.set_context("#sidebar");
        assert_eq!(session.context().css("a").expression(), "jQuery('#sidebar').find('a')");

        session.reset_context();
        assert_eq!(session.context().css_selector(), "main");
    }

    #[test]
    fn wait_uses_configured_timings() {
        let session = Session::with_config(
            MockDriver::new(),
            Config::default()
                .with_timeout(Duration::from_millis(40))
                .with_poll_interval(Duration::from_millis(10)),
        );
        assert_eq!(session.wait(None).timeout(), Duration::from_millis(40));

        let mut calls = 0;
        let outcome = session
            .wait_for(None, || {
                calls += 1;
                Ok::<_, Infallible>(calls == 3)
            })
            .unwrap();
        assert!(outcome.satisfied);
        assert_eq!(calls, 3);
    }
}
