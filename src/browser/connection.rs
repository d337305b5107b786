use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::error::BrowserError;
use crate::infrastructure::CdpDriver;

/// Attach to a browser already listening on `port`
///
/// Useful while developing a flow: the browser window stays open after the
/// run and only the page this session opened is closed.
pub async fn connect_to_browser(port: u16, poll_interval: Duration) -> Result<CdpDriver, BrowserError> {
    let browser_url = format!("http://localhost:{}", port);
    info!("Connecting to browser at {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("failed to connect to browser: {}", e);
        BrowserError::ConnectionFailed { port, source: e }
    })?;
    debug!("browser connected");

    // Drain browser events in the background
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // Give the browser a moment to sync its targets
    sleep(Duration::from_millis(300)).await;

    CdpDriver::new(browser, handler_task, false, poll_interval).await
}
