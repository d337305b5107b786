//! Infrastructure layer: owns the scarce browser resource and only exposes
//! primitive capabilities (navigate, click, wait, download).

pub mod cdp_driver;
pub mod driver;
pub mod wait;

pub use cdp_driver::CdpDriver;
pub use driver::{Locator, PortalDriver, SelectState};
pub use wait::{wait_until, WaitPolicy, WaitTimeout};
