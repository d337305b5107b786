use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::config::BrowserSettings;
use crate::error::BrowserError;
use crate::infrastructure::CdpDriver;

/// Launch a local Chromium and wrap it in a driver
pub async fn launch_browser(
    settings: &BrowserSettings,
    poll_interval: Duration,
) -> Result<CdpDriver, BrowserError> {
    info!(
        "🚀 Launching browser ({})...",
        if settings.headless { "headless" } else { "headed" }
    );

    let mut builder = BrowserConfig::builder();
    builder = if settings.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &settings.executable {
        debug!("browser executable: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let config = builder
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",             // containers usually lack the sandbox privileges
            "--disable-dev-shm-usage",  // small /dev/shm in containers
        ])
        .build()
        .map_err(|e| {
            error!("invalid browser configuration: {}", e);
            BrowserError::ConfigurationFailed(e)
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("failed to launch browser: {}", e);
        BrowserError::LaunchFailed { source: e }
    })?;
    debug!("browser launched");

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

    let driver = CdpDriver::new(browser, handler_task, true, poll_interval).await?;
    info!("✅ Browser ready");
    Ok(driver)
}
