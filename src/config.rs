//! Session configuration.

use crate::error::ConfigError;
use crate::wait::{Wait, DEFAULT_POLLING_INTERVAL, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::time::Duration;
use url::Url;

const ENV_WEBDRIVER: &str = "CSSCHAIN_WEBDRIVER";
const ENV_TIMEOUT: &str = "CSSCHAIN_TIMEOUT_MS";
const ENV_POLL_INTERVAL: &str = "CSSCHAIN_POLL_INTERVAL_MS";
const ENV_BROWSER: &str = "CSSCHAIN_BROWSER";

/// Settings shared by every chain built from a [`Session`](crate::Session).
///
/// All fields have defaults, so a JSON document only needs to name what it changes:
///
/// ```
/// let config = csschain::Config::from_json(r#"{ "timeout_ms": 2000 }"#).unwrap();
/// assert_eq!(config.timeout(), std::time::Duration::from_secs(2));
/// assert_eq!(config.context, "body");
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// URL of the WebDriver server.
    pub webdriver: Url,
    /// Default time budget of the `wait_for_*` family, in milliseconds.
    pub timeout_ms: u64,
    /// Pause between two polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Selector of the default context returned by [`Session::context`](crate::Session::context).
    pub context: String,
    /// Capabilities requested when the session is created.
    pub capabilities: Map<String, Json>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            webdriver: default_webdriver(),
            timeout_ms: millis(DEFAULT_TIMEOUT),
            poll_interval_ms: millis(DEFAULT_POLLING_INTERVAL),
            context: "body".to_string(),
            capabilities: Map::new(),
        }
    }
}

fn default_webdriver() -> Url {
    Url::parse("http://localhost:4444").expect("static url is valid")
}

impl Config {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The default configuration, overridden by `CSSCHAIN_*` environment variables.
    ///
    /// `CSSCHAIN_WEBDRIVER` sets the server URL, `CSSCHAIN_TIMEOUT_MS` and
    /// `CSSCHAIN_POLL_INTERVAL_MS` the wait timings, and `CSSCHAIN_BROWSER` (`firefox` or
    /// `chrome`) selects headless capabilities for that browser.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = match lookup(ENV_BROWSER).as_deref() {
            None => Config::default(),
            Some("firefox") => Config::headless_firefox(),
            Some("chrome") => Config::headless_chrome(),
            Some(other) => {
                return Err(ConfigError::Env {
                    var: ENV_BROWSER,
                    value: other.to_string(),
                })
            }
        };

        if let Some(url) = lookup(ENV_WEBDRIVER) {
            config.webdriver = Url::parse(&url)?;
        }
        if let Some(ms) = lookup(ENV_TIMEOUT) {
            config.timeout_ms = parse_millis(ENV_TIMEOUT, ms)?;
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL) {
            config.poll_interval_ms = parse_millis(ENV_POLL_INTERVAL, ms)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Headless Firefox through geckodriver on its default port.
    pub fn headless_firefox() -> Self {
        let mut capabilities = Map::new();
        capabilities.insert(
            "moz:firefoxOptions".to_string(),
            serde_json::json!({ "args": ["--headless"] }),
        );
        Config {
            capabilities,
            ..Config::default()
        }
    }

    /// Headless Chrome through chromedriver on its default port.
    pub fn headless_chrome() -> Self {
        let mut capabilities = Map::new();
        capabilities.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({
                "args": ["--headless", "--disable-gpu", "--no-sandbox", "--disable-dev-shm-usage"]
            }),
        );
        Config {
            webdriver: Url::parse("http://localhost:9515").expect("static url is valid"),
            capabilities,
            ..Config::default()
        }
    }

    /// Check that every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be positive".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.context.trim().is_empty() {
            return Err(ConfigError::Invalid("context must not be empty".to_string()));
        }
        Ok(())
    }

    /// Use a different WebDriver server.
    pub fn with_webdriver(mut self, url: &str) -> Result<Self, ConfigError> {
        self.webdriver = Url::parse(url)?;
        Ok(self)
    }

    /// Use a different default wait budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = millis(timeout);
        self
    }

    /// Use a different polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = millis(interval);
        self
    }

    /// Use a different default context selector.
    pub fn with_context(mut self, selector: impl Into<String>) -> Self {
        self.context = selector.into();
        self
    }

    /// The default wait budget.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// A [`Wait`] with this configuration's timings, or `timeout` if given.
    pub fn wait(&self, timeout: Option<Duration>) -> Wait {
        Wait::new(timeout.unwrap_or_else(|| self.timeout()), self.poll_interval())
    }
}

// saturates at u64::MAX
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_millis(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.webdriver.as_str(), "http://localhost:4444/");
        assert_eq!(config.timeout(), Duration::from_millis(5000));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.context, "body");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_overrides_and_rejects() {
        let config = Config::from_json(
            r#"{ "webdriver": "http://grid:4444/wd/hub", "poll_interval_ms": 50, "context": "main" }"#,
        )
        .unwrap();
        assert_eq!(config.webdriver.host_str(), Some("grid"));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.context, "main");
        assert_eq!(config.timeout_ms, 5000);

        assert!(matches!(
            Config::from_json(r#"{ "timeout_ms": 0 }"#),
            Err(ConfigError::Invalid(..))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "timeout": 10 }"#),
            Err(ConfigError::Json(..))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "webdriver": "not a url" }"#),
            Err(ConfigError::Json(..))
        ));
    }

    #[test]
    fn environment() {
        let config = Config::from_lookup(lookup(&[
            (ENV_BROWSER, "chrome"),
            (ENV_TIMEOUT, "250"),
        ]))
        .unwrap();
        assert_eq!(config.webdriver.port(), Some(9515));
        assert!(config.capabilities.contains_key("goog:chromeOptions"));
        assert_eq!(config.timeout(), Duration::from_millis(250));

        let config = Config::from_lookup(lookup(&[(ENV_WEBDRIVER, "http://127.0.0.1:4445")])).unwrap();
        assert_eq!(config.webdriver.port(), Some(4445));
        assert!(config.capabilities.is_empty());

        assert!(matches!(
            Config::from_lookup(lookup(&[(ENV_BROWSER, "lynx")])),
            Err(ConfigError::Env { var: ENV_BROWSER, .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(ENV_POLL_INTERVAL, "soon")])),
            Err(ConfigError::Env { .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(ENV_WEBDRIVER, "::")])),
            Err(ConfigError::BadWebdriverUrl(..))
        ));
    }

    #[test]
    fn builder_and_wait() {
        let config = Config::headless_firefox()
            .with_timeout(Duration::from_millis(300))
            .with_poll_interval(Duration::from_millis(20))
            .with_context("#app");
        assert_eq!(config.context, "#app");
        assert_eq!(config.wait(None).timeout(), Duration::from_millis(300));
        assert_eq!(
            config.wait(Some(Duration::from_secs(1))).timeout(),
            Duration::from_secs(1)
        );
        assert!(Config::default().with_webdriver("nope").is_err());
    }

    #[test]
    fn huge_durations_saturate() {
        let config = Config::default()
            .with_timeout(Duration::MAX)
            .with_poll_interval(Duration::from_secs(u64::MAX / 1000 + 1));
        assert_eq!(config.timeout_ms, u64::MAX);
        assert_eq!(config.poll_interval_ms, u64::MAX);
        assert_eq!(config.timeout(), Duration::from_millis(u64::MAX));
    }
}
