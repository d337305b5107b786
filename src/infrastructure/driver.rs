//! Browser driver contract
//!
//! Adapters only ever talk to a browser through [`PortalDriver`]. The
//! production implementation is [`CdpDriver`](super::CdpDriver); tests use a
//! scripted in-memory driver.

use std::fmt::{self, Display};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::DriverError;

/// How to find an element on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(&'static str),
    XPath(&'static str),
}

impl Locator {
    /// JS expression evaluating to the element or `null`
    pub fn to_js(&self) -> String {
        // serde_json gives a correctly escaped JS string literal
        let quoted = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
        match self {
            Locator::Css(selector) => format!("document.querySelector({})", quoted(selector)),
            Locator::XPath(xpath) => format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                quoted(xpath)
            ),
        }
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css={}", selector),
            Locator::XPath(xpath) => write!(f, "xpath={}", xpath),
        }
    }
}

/// Snapshot of a `<select>` element
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectState {
    /// Value of the active option, if any
    pub selected: Option<String>,
    /// Option values in listed order
    pub options: Vec<String>,
}

/// Asynchronous browser primitives
///
/// Every method suspends until the browser has acknowledged the action; waits
/// are bounded by the `timeout` they receive and report
/// [`DriverError::Timeout`] when it expires.
#[async_trait]
pub trait PortalDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Focus the element and type `text` into it
    async fn fill(&mut self, locator: Locator, text: &str) -> Result<(), DriverError>;

    async fn click(&mut self, locator: Locator) -> Result<(), DriverError>;

    /// Wait until the element exists and is visible
    async fn wait_for(&mut self, locator: Locator, timeout: Duration) -> Result<(), DriverError>;

    /// Wait until the element is gone or hidden
    async fn wait_for_hidden(&mut self, locator: Locator, timeout: Duration) -> Result<(), DriverError>;

    /// Wait until the page is loaded and no new resources are requested
    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), DriverError>;

    /// `false` when the element is missing or hidden
    async fn is_visible(&mut self, locator: Locator) -> Result<bool, DriverError>;

    /// Make `value` the active option and fire the change events
    async fn select(&mut self, locator: Locator, value: &str) -> Result<(), DriverError>;

    async fn select_state(&mut self, locator: Locator) -> Result<SelectState, DriverError>;

    /// Click `trigger` and wait for the resulting download to land in `dir`
    async fn download(
        &mut self,
        trigger: Locator,
        dir: &Path,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    /// Replace the current page with a blank one
    async fn reset(&mut self) -> Result<(), DriverError>;

    /// End the browser session
    async fn close(&mut self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_locator_js_is_escaped() {
        let js = Locator::Css(r#"input[placeholder="סיסמה"]"#).to_js();
        assert_eq!(
            js,
            r#"document.querySelector("input[placeholder=\"סיסמה\"]")"#
        );
    }

    #[test]
    fn test_xpath_locator_js() {
        let js = Locator::XPath("//button").to_js();
        assert!(js.starts_with("document.evaluate(\"//button\""));
        assert!(js.ends_with(".singleNodeValue"));
    }
}
