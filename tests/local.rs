//! Tests against a real browser. Run with a WebDriver server listening, e.g.
//! `geckodriver` on port 4444 or `chromedriver` on port 9515, and `--ignored`.
#![cfg(feature = "native-tls")]

use csschain::{Session, WebDriver};
use serial_test::serial;
use std::error::Error;
use std::time::Duration;

mod common;

const SAMPLE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>csschain</title>
  <style>
    #tooltip { display: none; }
    #hover-target:hover + #tooltip { display: inline; }
  </style>
</head>
<body>
  <nav class="main">
    <ul>
      <li><a href="/home">Home</a></li>
      <li class="active"><a href="/about">About</a></li>
      <li><a href="/contact">Contact</a></li>
    </ul>
  </nav>
  <form id="signup">
    <label for="email">Email</label>
    <input id="email" name="email" value="old">
    <input type="checkbox" name="terms">
    <button type="button" id="save">Save</button>
  </form>
  <div id="toast" style="display: none">Saved</div>
  <div class="outer">
    <div class="inner"><a id="deep" href="/deep">deep</a></div>
  </div>
  <span id="hover-target">hover me</span><span id="tooltip">tip</span>
  <script>
    document.getElementById('save').addEventListener('click', function() {
      setTimeout(function() {
        document.getElementById('toast').style.display = 'block';
        var late = document.createElement('p');
        late.className = 'late';
        late.textContent = 'finally';
        document.body.appendChild(late);
      }, 300);
    });
  </script>
</body>
</html>"#;

fn open(session: &Session<WebDriver>) -> Result<(), Box<dyn Error>> {
    session.driver().goto(&common::data_url(SAMPLE_PAGE))?;
    Ok(())
}

fn resolves_chains(session: &Session<WebDriver>) -> Result<(), Box<dyn Error>> {
    open(session)?;
    let body = session.css("body");
    let nav = body.css("nav.main");
    let items = nav.css("li");

    items.count(3usize)?;
    assert_eq!(items.texts()?, vec!["Home", "About", "Contact"]);
    items.eq(1)?.has_class("active")?.has_text("About")?;
    nav.css("li.active a").has_attribute("href", "/about")?;
    body.css(".missing").not_exists()?;

    let second = items.eq(1)?;
    let list = second.parent()?;
    assert!(list.outer_html()?.starts_with("<ul>"));
    second.closest("nav")?.has_class("main")?;
    assert!(second.closest("table").unwrap_err().is_not_found());

    let deep = body.css("#deep");
    let nearest = deep.closest("div")?;
    nearest.has_class("inner")?;
    assert_eq!(nearest.expression(), "jQuery('body').find('#deep').closest('div')");
    Ok(())
}

fn hovers_with_the_pointer(session: &Session<WebDriver>) -> Result<(), Box<dyn Error>> {
    open(session)?;
    let body = session.css("body");
    let tooltip = body.css("#tooltip");
    tooltip.is_not_visible()?;
    body.css("#hover-target").mouse_over()?;
    tooltip.is_visible()?.has_text("tip")?;
    Ok(())
}

fn fills_forms(session: &Session<WebDriver>) -> Result<(), Box<dyn Error>> {
    open(session)?;
    let form = session.css("form#signup");
    form.css("#email").has_value("old")?;
    form.fill_field("Email", "me@example.com")?
        .check_field("terms")?;
    form.css("#email").has_value("me@example.com")?;
    form.css("input:checked").count(1usize)?;
    Ok(())
}

fn waits_for_the_page(session: &Session<WebDriver>) -> Result<(), Box<dyn Error>> {
    open(session)?;
    let body = session.css("body");
    let toast = body.css("#toast");
    toast.is_not_visible()?;
    assert!(toast.click().is_err());

    body.css("#save").click()?;
    toast.wait_for_visible(None)?.has_text("Saved")?;
    body.css(".late").wait_for_exists(Some(Duration::from_secs(1)))?;

    let err = body
        .css(".never")
        .wait_for_exists(Some(Duration::from_millis(200)))
        .unwrap_err();
    assert!(err.is_timeout());
    Ok(())
}

fn runs_scripts(session: &Session<WebDriver>) -> Result<(), Box<dyn Error>> {
    open(session)?;
    let nav = session.css("nav");
    let items = nav.css("li");
    let count = items.evaluate_jquery_expression(".length")?;
    assert_eq!(count, serde_json::json!(3));
    items.scroll_into_view(true)?;
    Ok(())
}

mod firefox {
    use super::*;

    #[test]
    #[serial]
    #[ignore = "requires a running WebDriver server"]
    fn resolves_chains_test() {
        tester!(resolves_chains, "firefox")
    }

    #[test]
    #[serial]
    #[ignore = "requires a running WebDriver server"]
    fn fills_forms_test() {
        tester!(fills_forms, "firefox")
    }

    #[test]
    #[serial]
    #[ignore = "requires a running WebDriver server"]
    fn waits_for_the_page_test() {
        tester!(waits_for_the_page, "firefox")
    }

    #[test]
    #[serial]
    #[ignore = "requires a running WebDriver server"]
    fn hovers_with_the_pointer_test() {
        tester!(hovers_with_the_pointer, "firefox")
    }

    #[test]
    #[serial]
    #[ignore = "requires a running WebDriver server and network access for jQuery"]
    fn runs_scripts_test() {
        tester!(runs_scripts, "firefox")
    }
}

mod chrome {
    use super::*;

    #[test]
    #[serial]
    #[ignore = "requires a running WebDriver server"]
    fn resolves_chains_test() {
        tester!(resolves_chains, "chrome")
    }

    #[test]
    #[serial]
    #[ignore = "requires a running WebDriver server"]
    fn fills_forms_test() {
        tester!(fills_forms, "chrome")
    }

    #[test]
    #[serial]
    #[ignore = "requires a running WebDriver server"]
    fn waits_for_the_page_test() {
        tester!(waits_for_the_page, "chrome")
    }

    #[test]
    #[serial]
    #[ignore = "requires a running WebDriver server"]
    fn hovers_with_the_pointer_test() {
        tester!(hovers_with_the_pointer, "chrome")
    }

    #[test]
    #[serial]
    #[ignore = "requires a running WebDriver server and network access for jQuery"]
    fn runs_scripts_test() {
        tester!(runs_scripts, "chrome")
    }
}
