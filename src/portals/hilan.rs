//! Hilan employee portal
//!
//! Direct login, then a single period select whose values look like
//! `"{index}: {MM}/{YYYY}"`. Documents sit behind a password overlay and are
//! downloaded still encrypted, so the run decrypts them afterwards.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{in_stage, select_and_verify, PeriodSelection, PortalFlow};
use crate::error::DriverError;
use crate::infrastructure::{PortalDriver, WaitPolicy};
use crate::models::{FailureReason, Period, ProviderConfig};
use crate::services::Workspace;

pub mod selectors {
    use crate::infrastructure::Locator;

    pub const EMPLOYEE_ID_INPUT: Locator = Locator::Css(r#"input[placeholder="מספר העובד"]"#);
    pub const PASSWORD_INPUT: Locator = Locator::Css(r#"input[placeholder="סיסמה"]"#);
    pub const LOGIN_BUTTON: Locator = Locator::XPath("//button[normalize-space(.)='כניסה']");
    pub const PERIOD_SELECT: Locator = Locator::Css("select");
    pub const SHOW_PAYSLIP: Locator =
        Locator::XPath("//*[normalize-space(text())='להצגת תלוש השכר']");
    pub const DOWNLOAD_PAYSLIP: Locator =
        Locator::XPath("//*[normalize-space(text())='הורדת תלוש']");
    pub const DOWNLOAD_FILE: Locator = Locator::XPath("//*[normalize-space(text())='הורדת קובץ']");
    pub const UNLOCK_OVERLAY: Locator = Locator::Css("#passwordOverlay");
    pub const UNLOCK_INPUT: Locator = Locator::Css("#passwordOverlay input");
    pub const UNLOCK_SUBMIT: Locator =
        Locator::XPath("//*[@id='passwordOverlay']//button[normalize-space(.)='אישור']");
}

use selectors::*;

const PAYSLIP_PATH: &str = "/Hilannetv2/ng/personal-file/payslip";

/// Trailing part of the option value for `period`, e.g. `" 02/2024"`
pub fn option_suffix(period: Period) -> String {
    format!(" {:02}/{}", period.month_number(), period.year())
}

/// `true` when `value` is the option for `period`
pub fn matches_period(value: &str, period: Period) -> bool {
    value.trim_end().ends_with(&option_suffix(period))
}

pub struct HilanPortal {
    config: ProviderConfig,
    wait: WaitPolicy,
}

impl HilanPortal {
    pub fn new(config: ProviderConfig, wait: WaitPolicy) -> Self {
        Self { config, wait }
    }
}

#[async_trait]
impl PortalFlow for HilanPortal {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn login(&self, driver: &mut dyn PortalDriver) -> Result<(), FailureReason> {
        let timeout = self.wait.timeout;
        info!("[{}] Opening login page", self.config.kind);
        driver.navigate(&self.config.url("/")).await?;
        driver
            .wait_for(EMPLOYEE_ID_INPUT, timeout)
            .await
            .map_err(in_stage("login page"))?;

        info!("[{}] Filling login form", self.config.kind);
        driver.fill(EMPLOYEE_ID_INPUT, &self.config.credentials.username).await?;
        driver.fill(PASSWORD_INPUT, &self.config.credentials.password).await?;
        driver.click(LOGIN_BUTTON).await?;

        driver
            .wait_for_network_idle(timeout)
            .await
            .map_err(in_stage("login confirmation"))
    }

    async fn open_listing(&self, driver: &mut dyn PortalDriver) -> Result<(), FailureReason> {
        info!("[{}] Opening payslip page", self.config.kind);
        driver.navigate(&self.config.url(PAYSLIP_PATH)).await?;
        driver
            .wait_for(PERIOD_SELECT, self.wait.timeout)
            .await
            .map_err(in_stage("payslip page"))
    }

    async fn select_period(
        &self,
        driver: &mut dyn PortalDriver,
        period: Period,
    ) -> Result<PeriodSelection, FailureReason> {
        let state = driver.select_state(PERIOD_SELECT).await?;

        let already_active = state
            .selected
            .as_deref()
            .is_some_and(|v| matches_period(v, period));

        if already_active {
            info!("[{}] Requested paycheck date already selected", self.config.kind);
        } else {
            let Some(value) = state.options.iter().find(|v| matches_period(v, period)) else {
                debug!("period options: {:?}", state.options);
                return Ok(PeriodSelection::Missing);
            };
            info!("[{}] Selecting {}", self.config.kind, period);
            select_and_verify(driver, PERIOD_SELECT, value).await?;
        }

        driver.click(SHOW_PAYSLIP).await?;
        driver
            .wait_for_network_idle(self.wait.timeout)
            .await
            .map_err(in_stage("payslip load"))?;
        Ok(PeriodSelection::Selected)
    }

    async fn is_document_available(&self, driver: &mut dyn PortalDriver) -> Result<bool, FailureReason> {
        if driver.is_visible(DOWNLOAD_PAYSLIP).await? {
            return Ok(true);
        }
        // The viewer may still be locked, in which case the overlay is all there is
        Ok(driver.is_visible(UNLOCK_OVERLAY).await?)
    }

    async fn unlock(&self, driver: &mut dyn PortalDriver) -> Result<(), FailureReason> {
        if !driver.is_visible(UNLOCK_OVERLAY).await? {
            debug!("no password overlay");
            return Ok(());
        }

        let password = self
            .config
            .unlock_password
            .as_deref()
            .ok_or(FailureReason::UnlockPasswordMissing)?;

        info!("[{}] 🔑 Unlocking paycheck", self.config.kind);
        driver.fill(UNLOCK_INPUT, password).await?;
        driver.click(UNLOCK_SUBMIT).await?;

        info!("[{}] Waiting for paycheck password overlay to disappear", self.config.kind);
        match driver.wait_for_hidden(UNLOCK_OVERLAY, self.wait.timeout).await {
            Ok(()) => Ok(()),
            Err(DriverError::Timeout { .. }) => Err(FailureReason::UnlockRejected),
            Err(e) => Err(e.into()),
        }
    }

    async fn download(
        &self,
        driver: &mut dyn PortalDriver,
        workspace: &Workspace,
    ) -> Result<(), FailureReason> {
        let timeout = self.wait.timeout;
        driver.click(DOWNLOAD_PAYSLIP).await?;
        driver
            .wait_for(DOWNLOAD_FILE, timeout)
            .await
            .map_err(in_stage("download menu"))?;
        driver
            .download(DOWNLOAD_FILE, workspace.path(), timeout)
            .await
            .map_err(in_stage("download"))
    }
}
