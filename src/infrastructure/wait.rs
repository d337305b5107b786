//! Bounded polling
//!
//! UI state (overlays disappearing, selectors showing up, the network going
//! quiet) is observed by polling. Every loop goes through [`wait_until`] so no
//! poll can spin forever.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Default wait for any UI condition
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between two probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Wait budget handed to adapters and drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The probe never reported success in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeout {
    pub elapsed: Duration,
}

/// Call `probe` until it yields `Ok(true)` or `timeout` runs out.
///
/// The probe always runs at least once. A probe error ends the wait
/// immediately and is returned as `Ok(Err(_))`.
pub async fn wait_until<F, Fut, E>(
    timeout: Duration,
    poll_interval: Duration,
    mut probe: F,
) -> Result<Result<(), E>, WaitTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let started = Instant::now();
    loop {
        match probe().await {
            Ok(true) => return Ok(Ok(())),
            Ok(false) => {}
            Err(e) => return Ok(Err(e)),
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(WaitTimeout { elapsed });
        }
        sleep(poll_interval.min(timeout - elapsed)).await;
    }
}
