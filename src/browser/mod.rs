mod connection;
mod headless;

pub use connection::connect_to_browser;
pub use headless::launch_browser;

use crate::config::BrowserSettings;
use crate::error::BrowserError;
use crate::infrastructure::{CdpDriver, WaitPolicy};

/// Open the run's browser session: attach when a debug port is configured,
/// launch otherwise
pub async fn open_session(
    settings: &BrowserSettings,
    wait: &WaitPolicy,
) -> Result<CdpDriver, BrowserError> {
    match settings.debug_port {
        Some(port) => connect_to_browser(port, wait.poll_interval).await,
        None => launch_browser(settings, wait.poll_interval).await,
    }
}
