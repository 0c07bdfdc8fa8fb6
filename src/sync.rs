//! A blocking [`Driver`] over an asynchronous `fantoccini` client.
//!
//! The adapter owns a current-thread runtime and blocks on it for every command, so chains
//! can be written as plain sequential code.

use crate::config::Config;
use crate::driver::Driver;
use crate::error::{ConnectError, DriverError};
use crate::session::Session;
use fantoccini::actions::{InputSource, MouseActions, PointerAction};
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::Value as Json;
use std::fmt;
use std::future::Future;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

/// A WebDriver session driven synchronously.
pub struct WebDriver {
    rt: Runtime,
    client: Client,
}

impl WebDriver {
    /// Create a new WebDriver session on the server named in `config`, requesting its
    /// capabilities.
    pub fn connect(config: &Config) -> Result<Self, ConnectError> {
        let rt = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ConnectError::Runtime)?;
        let client = rt
            .block_on(async {
                ClientBuilder::native()
                    .capabilities(config.capabilities.clone())
                    .connect(config.webdriver.as_str())
                    .await
            })
            .map_err(ConnectError::Session)?;
        info!(webdriver = %config.webdriver, "connected to webdriver");
        Ok(WebDriver { rt, client })
    }

    /// The underlying asynchronous client, for anything the chain API does not cover.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn block_on<F, T>(&self, f: F) -> Result<T, DriverError>
    where
        F: Future<Output = Result<T, CmdError>>,
    {
        self.rt.block_on(f).map_err(classify)
    }

    /// Navigate directly to the given URL.
    pub fn goto(&self, url: &str) -> Result<(), DriverError> {
        debug!(url, "goto");
        self.block_on(self.client.goto(url))
    }

    /// Terminate the WebDriver session.
    pub fn close(self) -> Result<(), DriverError> {
        let WebDriver { rt, client } = self;
        rt.block_on(client.close()).map_err(classify)?;
        info!("closed webdriver session");
        Ok(())
    }

    fn miss_as_none<T>(res: Result<T, CmdError>) -> Result<Option<T>, CmdError> {
        match res {
            Ok(found) => Ok(Some(found)),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for WebDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebDriver")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

fn classify(e: CmdError) -> DriverError {
    if let CmdError::Standard(ref wd) = e {
        match wd.error {
            ErrorStatus::ElementNotInteractable
            | ErrorStatus::ElementClickIntercepted
            | ErrorStatus::MoveTargetOutOfBounds => {
                return DriverError::NotInteractable(wd.message.to_string());
            }
            ErrorStatus::JavascriptError => {
                return DriverError::Script(wd.message.to_string());
            }
            _ => {}
        }
    }
    DriverError::Command(Box::new(e))
}

/// Move the mouse pointer to the center of `element`.
fn hover(element: &Element) -> MouseActions {
    MouseActions::new("mouse".to_string()).then(PointerAction::MoveToElement {
        element: element.clone(),
        duration: None,
        x: 0,
        y: 0,
    })
}

impl Driver for WebDriver {
    type Element = Element;

    fn find(&self, scope: Option<&Element>, xpath: &str) -> Result<Option<Element>, DriverError> {
        self.block_on(async {
            let found = match scope {
                Some(element) => element.find(Locator::XPath(xpath)).await,
                None => self.client.find(Locator::XPath(xpath)).await,
            };
            WebDriver::miss_as_none(found)
        })
    }

    fn find_all(&self, scope: Option<&Element>, xpath: &str) -> Result<Vec<Element>, DriverError> {
        self.block_on(async {
            match scope {
                Some(element) => element.find_all(Locator::XPath(xpath)).await,
                None => self.client.find_all(Locator::XPath(xpath)).await,
            }
        })
    }

    fn click(&self, element: &Element) -> Result<(), DriverError> {
        self.block_on(element.click())
    }

    fn mouse_over(&self, element: &Element) -> Result<(), DriverError> {
        self.block_on(self.client.perform_actions(hover(element)))
    }

    fn text(&self, element: &Element) -> Result<String, DriverError> {
        self.block_on(element.text())
    }

    fn html(&self, element: &Element, inner: bool) -> Result<String, DriverError> {
        self.block_on(element.html(inner))
    }

    fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, DriverError> {
        self.block_on(element.attr(name))
    }

    fn value(&self, element: &Element) -> Result<Option<String>, DriverError> {
        self.block_on(element.prop("value"))
    }

    fn set_value(&self, element: &Element, value: &str) -> Result<(), DriverError> {
        self.block_on(async {
            element.clear().await?;
            element.send_keys(value).await
        })
    }

    fn check(&self, element: &Element) -> Result<(), DriverError> {
        self.block_on(async {
            if !element.is_selected().await? {
                element.click().await?;
            }
            Ok(())
        })
    }

    fn is_visible(&self, element: &Element) -> Result<bool, DriverError> {
        self.block_on(element.is_displayed())
    }

    fn execute_async(&self, script: &str, args: Vec<Json>) -> Result<Json, DriverError> {
        self.block_on(self.client.execute_async(script, args))
    }
}

impl Session<WebDriver> {
    /// Connect to the WebDriver server named in `config` and start a session over it.
    pub fn connect(config: Config) -> Result<Self, ConnectError> {
        let driver = WebDriver::connect(&config)?;
        Ok(Session::with_config(driver, config))
    }
}
