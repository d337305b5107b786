//! Chrome DevTools driver - infrastructure layer
//!
//! Holds the only browser session of the run and exposes it as
//! [`PortalDriver`] primitives. Element lookups that need real input events
//! (click, typing) go through chromiumoxide elements; everything that only
//! reads or pokes the DOM runs as page JS via [`CdpDriver::eval_as`].

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, SetDownloadBehaviorBehavior,
    SetDownloadBehaviorParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tracing::debug;

use super::driver::{Locator, PortalDriver, SelectState};
use super::wait::{wait_until, WaitTimeout};
use crate::error::{BrowserError, DriverError};

/// The page counts as idle once the resource count stayed flat this long
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

const NETWORK_PROBE_JS: &str = r#"
    (() => ({
        ready: document.readyState === 'complete',
        resources: performance.getEntriesByType('resource').length
    }))()
"#;

#[derive(Debug, Deserialize)]
struct NetworkProbe {
    ready: bool,
    resources: usize,
}

#[derive(Debug, Deserialize)]
struct SelectProbe {
    found: bool,
    #[serde(flatten)]
    state: SelectState,
}

/// chromiumoxide backed [`PortalDriver`]
pub struct CdpDriver {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    /// `false` when attached to a browser someone else started
    owns_browser: bool,
    poll_interval: Duration,
}

impl CdpDriver {
    /// Wrap a connected browser and open the first blank page
    pub async fn new(
        browser: Browser,
        handler_task: JoinHandle<()>,
        owns_browser: bool,
        poll_interval: Duration,
    ) -> Result<Self, BrowserError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.into()))?;

        Ok(Self {
            browser,
            page,
            handler_task,
            owns_browser,
            poll_interval,
        })
    }

    /// Run `js_code` in the page and return its JSON result
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, DriverError> {
        eval_on(&self.page, js_code).await
    }

    /// Run `js_code` in the page and deserialize its result
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> Result<T, DriverError> {
        let json_value = self.eval(js_code).await?;
        Ok(serde_json::from_value(json_value)?)
    }

    async fn element(&self, locator: Locator) -> Result<Element, DriverError> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_element(selector).await,
            Locator::XPath(xpath) => self.page.find_xpath(xpath).await,
        };
        found.map_err(|e| {
            debug!("lookup of {} failed: {}", locator, e);
            DriverError::NotFound(locator.to_string())
        })
    }

    fn timeout_error(what: impl Into<String>, timeout: WaitTimeout) -> DriverError {
        DriverError::Timeout {
            what: what.into(),
            after: timeout.elapsed,
        }
    }
}

async fn eval_on(page: &Page, js_code: impl Into<String>) -> Result<JsonValue, DriverError> {
    let result = page.evaluate(js_code.into()).await?;
    Ok(result.into_value()?)
}

/// Visible per computed style: shown, not hidden, not transparent
async fn visible_on(page: &Page, locator: Locator) -> Result<bool, DriverError> {
    let js = format!(
        r#"
        (() => {{
            const el = {};
            if (!el) {{
                return false;
            }}
            const style = window.getComputedStyle(el);
            return style.display !== 'none'
                && style.visibility !== 'hidden'
                && style.opacity !== '0';
        }})()
        "#,
        locator.to_js()
    );
    let value = eval_on(page, js).await?;
    Ok(value.as_bool().unwrap_or(false))
}

#[async_trait]
impl PortalDriver for CdpDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        debug!("navigating to {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn fill(&mut self, locator: Locator, text: &str) -> Result<(), DriverError> {
        let element = self.element(locator).await?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await?;
        element.click().await?.type_str(text).await?;
        Ok(())
    }

    async fn click(&mut self, locator: Locator) -> Result<(), DriverError> {
        debug!("clicking {}", locator);
        self.element(locator).await?.click().await?;
        Ok(())
    }

    async fn wait_for(&mut self, locator: Locator, timeout: Duration) -> Result<(), DriverError> {
        let page = self.page.clone();
        wait_until(timeout, self.poll_interval, move || {
            let page = page.clone();
            async move { visible_on(&page, locator).await }
        })
        .await
        .map_err(|t| Self::timeout_error(locator.to_string(), t))?
    }

    async fn wait_for_hidden(&mut self, locator: Locator, timeout: Duration) -> Result<(), DriverError> {
        let page = self.page.clone();
        wait_until(timeout, self.poll_interval, move || {
            let page = page.clone();
            async move { visible_on(&page, locator).await.map(|visible| !visible) }
        })
        .await
        .map_err(|t| Self::timeout_error(format!("{} to disappear", locator), t))?
    }

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), DriverError> {
        let page = self.page.clone();
        let last_change = Mutex::new((usize::MAX, Instant::now()));
        let last_change = &last_change;

        wait_until(timeout, self.poll_interval, move || {
            let page = page.clone();
            async move {
                let probe: NetworkProbe =
                    serde_json::from_value(eval_on(&page, NETWORK_PROBE_JS).await?)?;
                let mut last = last_change
                    .lock()
                    .map_err(|_| DriverError::Protocol("network probe state poisoned".to_string()))?;
                if probe.resources != last.0 {
                    *last = (probe.resources, Instant::now());
                    return Ok(false);
                }
                Ok(probe.ready && last.1.elapsed() >= NETWORK_IDLE_WINDOW)
            }
        })
        .await
        .map_err(|t| Self::timeout_error("network idle", t))?
    }

    async fn is_visible(&mut self, locator: Locator) -> Result<bool, DriverError> {
        visible_on(&self.page, locator).await
    }

    async fn select(&mut self, locator: Locator, value: &str) -> Result<(), DriverError> {
        let js = format!(
            r#"
            (() => {{
                const el = {element};
                const value = {value};
                if (!el) {{
                    return 'missing';
                }}
                if (!Array.from(el.options).some(o => o.value === value)) {{
                    return 'no-option';
                }}
                el.value = value;
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                // The portals only apply the selection once focus moves away
                el.blur();
                document.body.focus();
                return 'ok';
            }})()
            "#,
            element = locator.to_js(),
            value = serde_json::to_string(value)?,
        );

        let status: String = self.eval_as(js).await?;
        match status.as_str() {
            "ok" => Ok(()),
            "no-option" => Err(DriverError::OptionNotFound {
                locator: locator.to_string(),
                value: value.to_string(),
            }),
            _ => Err(DriverError::NotFound(locator.to_string())),
        }
    }

    async fn select_state(&mut self, locator: Locator) -> Result<SelectState, DriverError> {
        let js = format!(
            r#"
            (() => {{
                const el = {};
                if (!el) {{
                    return {{ found: false, selected: null, options: [] }};
                }}
                const active = el.selectedIndex >= 0 ? el.options[el.selectedIndex] : null;
                return {{
                    found: true,
                    selected: active ? active.value : null,
                    options: Array.from(el.options).map(o => o.value)
                }};
            }})()
            "#,
            locator.to_js()
        );

        let probe: SelectProbe = self.eval_as(js).await?;
        if !probe.found {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        Ok(probe.state)
    }

    async fn download(
        &mut self,
        trigger: Locator,
        dir: &Path,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        if !dir.is_absolute() {
            return Err(DriverError::RelativeDownloadPath(dir.to_path_buf()));
        }

        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(DriverError::Protocol)?;
        self.browser.execute(behavior).await?;

        // Subscribe before clicking so the completion event cannot be missed
        let mut progress = self.browser.event_listener::<EventDownloadProgress>().await?;
        self.click(trigger).await?;

        let completion = async {
            while let Some(event) = progress.next().await {
                match event.state {
                    DownloadProgressState::Completed => return Ok(()),
                    DownloadProgressState::Canceled => return Err(DriverError::DownloadCanceled),
                    DownloadProgressState::InProgress => {
                        debug!("download progress: {} bytes", event.received_bytes);
                    }
                }
            }
            Err(DriverError::Protocol("download event stream closed".to_string()))
        };

        match tokio::time::timeout(timeout, completion).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout {
                what: format!("download triggered by {}", trigger),
                after: timeout,
            }),
        }
    }

    async fn reset(&mut self) -> Result<(), DriverError> {
        let fresh = self.browser.new_page("about:blank").await?;
        let previous = std::mem::replace(&mut self.page, fresh);
        if let Err(e) = previous.close().await {
            debug!("closing previous page failed: {}", e);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.owns_browser {
            self.browser.close().await?;
            if let Err(e) = self.browser.wait().await {
                debug!("waiting for browser exit failed: {}", e);
            }
        } else if let Err(e) = self.page.clone().close().await {
            debug!("closing page failed: {}", e);
        }
        self.handler_task.abort();
        Ok(())
    }
}
