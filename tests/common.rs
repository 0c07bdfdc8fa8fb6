#![allow(dead_code)]

use csschain::css::{self, Translator, ANCESTOR};
use csschain::testing::{MockDriver, MockElement, MockHandle};
use csschain::{Config, Session};
use std::error::Error;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A 200ms budget with the default 100ms polling interval.
pub fn quick() -> Config {
    Config::default().with_timeout(Duration::from_millis(200))
}

/// A scripted page:
///
/// ```html
/// <body>
///   <nav>
///     <ul class="menu">
///       <li>Home</li><li class="active">About</li><li>Contact</li>
///     </ul>
///   </nav>
///   <form id="signup">
///     <label for="email">Email</label><input id="email" name="email" value="old">
///     <input type="checkbox" name="terms">
///   </form>
///   <div id="toast" style="display: none">Saved</div>
/// </body>
/// ```
pub struct Page {
    pub mock: MockDriver,
    pub body: MockHandle,
    pub nav: MockHandle,
    pub ul: MockHandle,
    pub items: Vec<MockHandle>,
    pub form: MockHandle,
    pub email: MockHandle,
    pub terms: MockHandle,
    pub toast: MockHandle,
}

impl Page {
    pub fn session(&self) -> Session<&MockDriver> {
        Session::with_config(&self.mock, quick())
    }

    /// Answer `closest(filter)` from `from` with `ancestor`.
    pub fn route_closest(&self, from: MockHandle, filter: &str, ancestor: &[MockHandle]) {
        let xpath = Translator::new()
            .css_to_xpath_with_prefix(filter, ANCESTOR)
            .unwrap();
        self.mock
            .route_xpath(Some(from), &format!("({})[last()]", xpath), ancestor);
    }
}

pub fn page() -> Page {
    init_tracing();
    let mock = MockDriver::new();

    let body = mock.add(MockElement::new("body"));
    let nav = mock.add(MockElement::new("nav"));
    let ul = mock.add(
        MockElement::new("ul")
            .attr("class", "menu")
            .html("<li>Home</li><li class=\"active\">About</li><li>Contact</li>"),
    );
    let items = vec![
        mock.add(MockElement::new("li").text("Home")),
        mock.add(MockElement::new("li").text("About").attr("class", "active")),
        mock.add(MockElement::new("li").text("Contact")),
    ];
    let form = mock.add(MockElement::new("form").attr("id", "signup"));
    let email = mock.add(
        MockElement::new("input")
            .attr("id", "email")
            .attr("name", "email")
            .value("old"),
    );
    let terms = mock.add(
        MockElement::new("input")
            .attr("type", "checkbox")
            .attr("name", "terms"),
    );
    let toast = mock.add(MockElement::new("div").attr("id", "toast").text("Saved").hidden());

    mock.route(None, "body", &[body]);
    mock.route(Some(body), "nav", &[nav]);
    mock.route(Some(nav), "ul.menu", &[ul]);
    mock.route(Some(ul), "li", &items);
    mock.route(Some(ul), "li.active", &items[1..2]);
    mock.route(Some(body), "form#signup", &[form]);
    mock.route(Some(body), "#toast", &[toast]);
    mock.route_xpath(Some(form), &css::field_xpath("Email"), &[email]);
    mock.route_xpath(Some(form), &css::field_xpath("terms"), &[terms]);

    mock.set_parent(nav, body);
    mock.set_parent(ul, nav);
    for &li in &items {
        mock.set_parent(li, ul);
    }

    let page = Page {
        mock,
        body,
        nav,
        ul,
        items,
        form,
        email,
        terms,
        toast,
    };
    for &li in &page.items {
        page.route_closest(li, "nav", &[page.nav]);
    }
    page
}

/// Capabilities and server for the named browser, as selected by `CSSCHAIN_BROWSER`.
pub fn browser_config(browser: &str) -> Config {
    let config = match browser {
        "firefox" => Config::headless_firefox(),
        "chrome" => Config::headless_chrome(),
        browser => unimplemented!("unsupported browser backend {}", browser),
    };
    config.with_timeout(Duration::from_secs(2))
}

/// A page served from a `data:` URL.
pub fn data_url(html: &str) -> String {
    let encoded: String = html
        .chars()
        .map(|c| match c {
            '#' => "%23".to_string(),
            '%' => "%25".to_string(),
            '\n' => "%0A".to_string(),
            c => c.to_string(),
        })
        .collect();
    format!("data:text/html;charset=utf-8,{}", encoded)
}

pub fn handle_test_error(
    res: Result<Result<(), Box<dyn Error>>, Box<dyn std::any::Any + Send>>,
) -> bool {
    match res {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            eprintln!("test failed: {}", e);
            false
        }
        Err(e) => {
            if let Some(e) = e.downcast_ref::<String>() {
                eprintln!("test panicked: {}", e);
            } else {
                eprintln!("test panicked; an assertion probably failed");
            }
            false
        }
    }
}

#[macro_export]
macro_rules! tester {
    // The ident should point to a function that takes a `&Session<WebDriver>`.
    ($f:ident, $browser:expr) => {{
        use std::panic::{catch_unwind, AssertUnwindSafe};

        common::init_tracing();
        let session = csschain::Session::connect(common::browser_config($browser))
            .expect("failed to construct test session");

        // run the test, catching panics so that the browser session is always closed
        let res = catch_unwind(AssertUnwindSafe(|| $f(&session)));
        let closed = session.into_driver().close();
        let success = common::handle_test_error(res);
        closed.expect("failed to close test session");
        assert!(success);
    }};
}
