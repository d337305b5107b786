//! Har Gal employee portal
//!
//! Password login behind a tab, then separate year and month selects. The
//! month select uses Angular style values, `"{index}: {month}"` with a zero
//! based index and a one based month.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use super::{in_stage, select_and_verify, PeriodSelection, PortalFlow};
use crate::infrastructure::{PortalDriver, SelectState, WaitPolicy};
use crate::models::{FailureReason, Period, ProviderConfig};
use crate::services::Workspace;

pub mod selectors {
    use crate::infrastructure::Locator;

    pub const PASSWORD_TAB: Locator =
        Locator::XPath("//*[@role='tab'][contains(normalize-space(.), 'סיסמא')]");
    pub const ID_NUMBER_INPUT: Locator = Locator::Css(r#"input[placeholder="מספר זהות"]"#);
    pub const PASSWORD_INPUT: Locator = Locator::Css(r#"input[placeholder="סיסמה"]"#);
    pub const SUBMIT_BUTTON: Locator = Locator::XPath("//button[normalize-space(.)='אישור']");
    /// Only rendered for an authenticated session
    pub const PAYCHECKS_LINK: Locator = Locator::XPath("//*[normalize-space(text())='תלושי שכר']");
    pub const YEAR_SELECT: Locator = Locator::Css(r#"select[name="selectedYear"]"#);
    pub const MONTH_SELECT: Locator = Locator::Css(r#"select[name="selectedMonth"]"#);
    pub const DOWNLOAD_BUTTON: Locator = Locator::XPath("//button[normalize-space(.)='הורדה']");
}

use selectors::*;

fn month_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\s*(\d+)\s*:\s*(\d+)\s*$").ok())
        .as_ref()
}

fn year_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\s*(?:\d+\s*:\s*)?(\d{4})\s*$").ok())
        .as_ref()
}

/// Zero based month index encoded in a month option value
pub fn parse_month_option(value: &str) -> Option<u32> {
    let caps = month_pattern()?.captures(value)?;
    let index: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    (month == index + 1 && index < 12).then_some(index)
}

/// Year options hold either the bare year or an Angular `"{index}: {year}"`
pub fn is_year_option(value: &str, year: i32) -> bool {
    year_pattern()
        .and_then(|re| re.captures(value))
        .and_then(|caps| caps[1].parse::<i32>().ok())
        == Some(year)
}

fn is_month_option(value: &str, month0: u32) -> bool {
    parse_month_option(value) == Some(month0)
}

fn first_option(state: &SelectState, matches: impl Fn(&str) -> bool) -> Option<String> {
    state.options.iter().find(|v| matches(v.as_str())).cloned()
}

fn is_active(state: &SelectState, matches: impl Fn(&str) -> bool) -> bool {
    state.selected.as_deref().is_some_and(matches)
}

pub struct HarGalPortal {
    config: ProviderConfig,
    wait: WaitPolicy,
}

impl HarGalPortal {
    pub fn new(config: ProviderConfig, wait: WaitPolicy) -> Self {
        Self { config, wait }
    }
}

#[async_trait]
impl PortalFlow for HarGalPortal {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn login(&self, driver: &mut dyn PortalDriver) -> Result<(), FailureReason> {
        let timeout = self.wait.timeout;
        info!("[{}] Opening login page", self.config.kind);
        driver.navigate(&self.config.url("/")).await?;

        driver
            .wait_for(PASSWORD_TAB, timeout)
            .await
            .map_err(in_stage("login page"))?;
        driver.click(PASSWORD_TAB).await?;
        driver
            .wait_for(ID_NUMBER_INPUT, timeout)
            .await
            .map_err(in_stage("login form"))?;

        info!("[{}] Filling login form", self.config.kind);
        driver.fill(ID_NUMBER_INPUT, &self.config.credentials.username).await?;
        driver.fill(PASSWORD_INPUT, &self.config.credentials.password).await?;
        driver.click(SUBMIT_BUTTON).await?;

        // Login has no explicit result; the menu showing up is the signal
        driver
            .wait_for(PAYCHECKS_LINK, timeout)
            .await
            .map_err(in_stage("login confirmation"))
    }

    async fn open_listing(&self, driver: &mut dyn PortalDriver) -> Result<(), FailureReason> {
        info!("[{}] Opening paychecks page", self.config.kind);
        driver.click(PAYCHECKS_LINK).await?;
        driver
            .wait_for(YEAR_SELECT, self.wait.timeout)
            .await
            .map_err(in_stage("paychecks page"))
    }

    async fn select_period(
        &self,
        driver: &mut dyn PortalDriver,
        period: Period,
    ) -> Result<PeriodSelection, FailureReason> {
        let year = period.year();
        let month0 = period.month0();

        let years = driver.select_state(YEAR_SELECT).await?;
        let months = driver.select_state(MONTH_SELECT).await?;
        let year_active = is_active(&years, |v| is_year_option(v, year));
        let month_active = is_active(&months, |v| is_month_option(v, month0));

        if year_active && month_active {
            info!("[{}] Requested paycheck date already selected", self.config.kind);
            return Ok(PeriodSelection::Selected);
        }

        if !year_active {
            let Some(value) = first_option(&years, |v| is_year_option(v, year)) else {
                debug!("year options: {:?}", years.options);
                return Ok(PeriodSelection::Missing);
            };
            info!("[{}] Selecting year {}", self.config.kind, year);
            select_and_verify(driver, YEAR_SELECT, &value).await?;
        }

        if !month_active {
            // Changing the year may rebuild the month list
            let months = driver.select_state(MONTH_SELECT).await?;
            if is_active(&months, |v| is_month_option(v, month0)) {
                debug!("month {} kept after year change", month0 + 1);
            } else {
                let Some(value) = first_option(&months, |v| is_month_option(v, month0)) else {
                    debug!("month options: {:?}", months.options);
                    return Ok(PeriodSelection::Missing);
                };
                info!("[{}] Selecting month {}", self.config.kind, month0 + 1);
                select_and_verify(driver, MONTH_SELECT, &value).await?;
            }
        }

        driver
            .wait_for_network_idle(self.wait.timeout)
            .await
            .map_err(in_stage("period change"))?;
        Ok(PeriodSelection::Selected)
    }

    async fn is_document_available(&self, driver: &mut dyn PortalDriver) -> Result<bool, FailureReason> {
        Ok(driver.is_visible(DOWNLOAD_BUTTON).await?)
    }

    async fn download(
        &self,
        driver: &mut dyn PortalDriver,
        workspace: &Workspace,
    ) -> Result<(), FailureReason> {
        driver
            .download(DOWNLOAD_BUTTON, workspace.path(), self.wait.timeout)
            .await
            .map_err(in_stage("download"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_option() {
        assert_eq!(parse_month_option("1: 2"), Some(1));
        assert_eq!(parse_month_option(" 11 : 12 "), Some(11));
        assert_eq!(parse_month_option("1: 3"), None);
        assert_eq!(parse_month_option("February"), None);
    }

    #[test]
    fn test_year_option_forms() {
        assert!(is_year_option("2024", 2024));
        assert!(is_year_option("3: 2024", 2024));
        assert!(!is_year_option("2023", 2024));
        assert!(!is_year_option("12024", 2024));
    }

    #[test]
    fn test_active_selection_detection() {
        let state = SelectState {
            selected: Some("1: 2".to_string()),
            options: vec!["0: 1".to_string(), "1: 2".to_string()],
        };
        assert!(is_active(&state, |v| is_month_option(v, 1)));
        assert!(!is_active(&state, |v| is_month_option(v, 0)));
        assert!(!is_active(&SelectState::default(), |v| is_month_option(v, 0)));
    }
}
