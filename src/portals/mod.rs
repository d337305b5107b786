//! Provider adapters - portal layer
//!
//! Each portal is described as a [`PortalFlow`]: the handful of stages that
//! differ between providers (login, listing, period selection, unlock,
//! download). The shared order of those stages and the final document check
//! live here, so every flow becomes a [`ProviderAdapter`] for free.

pub mod hargal;
pub mod hilan;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::DriverError;
use crate::infrastructure::{Locator, PortalDriver, WaitPolicy};
use crate::models::{FailureReason, Period, ProviderConfig, ProviderKind, RetrievalOutcome};
use crate::services::document_verifier::find_verified_document;
use crate::services::Workspace;

pub use hargal::HarGalPortal;
pub use hilan::HilanPortal;

/// Result of trying to activate the requested period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSelection {
    Selected,
    /// No option encodes the period
    Missing,
}

/// Provider specific stages of a retrieval
///
/// Stages run in declaration order against one page. Any `Err` ends the
/// retrieval with that [`FailureReason`].
#[async_trait]
pub trait PortalFlow: Send + Sync {
    fn config(&self) -> &ProviderConfig;

    /// Open the portal and authenticate
    async fn login(&self, driver: &mut dyn PortalDriver) -> Result<(), FailureReason>;

    /// Reach the page listing the documents
    async fn open_listing(&self, driver: &mut dyn PortalDriver) -> Result<(), FailureReason>;

    async fn select_period(
        &self,
        driver: &mut dyn PortalDriver,
        period: Period,
    ) -> Result<PeriodSelection, FailureReason>;

    /// `false` when the period is selected but nothing was published for it
    async fn is_document_available(&self, driver: &mut dyn PortalDriver) -> Result<bool, FailureReason>;

    /// Clear a password gate in front of the document, if the portal has one
    async fn unlock(&self, _driver: &mut dyn PortalDriver) -> Result<(), FailureReason> {
        Ok(())
    }

    /// Save the document into `workspace`
    async fn download(
        &self,
        driver: &mut dyn PortalDriver,
        workspace: &Workspace,
    ) -> Result<(), FailureReason>;
}

/// Retrieves one provider's document for a period
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> &ProviderConfig;

    /// Never panics on portal trouble: every problem is a [`RetrievalOutcome`]
    async fn retrieve(
        &self,
        driver: &mut dyn PortalDriver,
        period: Period,
        workspace: &Workspace,
    ) -> RetrievalOutcome;
}

#[async_trait]
impl<T: PortalFlow> ProviderAdapter for T {
    fn provider(&self) -> &ProviderConfig {
        self.config()
    }

    async fn retrieve(
        &self,
        driver: &mut dyn PortalDriver,
        period: Period,
        workspace: &Workspace,
    ) -> RetrievalOutcome {
        match run_flow(self, driver, period, workspace).await {
            Ok(outcome) => outcome,
            Err(reason) => {
                warn!("[{}] ❌ {}", self.config().kind, reason);
                RetrievalOutcome::Failure(reason)
            }
        }
    }
}

async fn run_flow<F: PortalFlow + ?Sized>(
    flow: &F,
    driver: &mut dyn PortalDriver,
    period: Period,
    workspace: &Workspace,
) -> Result<RetrievalOutcome, FailureReason> {
    let kind = flow.config().kind;

    flow.login(driver).await?;
    info!("[{}] ✓ Logged in", kind);

    flow.open_listing(driver).await?;

    if flow.select_period(driver, period).await? == PeriodSelection::Missing {
        info!("[{}] No paycheck listed for {}", kind, period);
        return Ok(RetrievalOutcome::MissingPeriod);
    }

    if !flow.is_document_available(driver).await? {
        info!("[{}] Paycheck for {} is not available yet", kind, period);
        return Ok(RetrievalOutcome::MissingPeriod);
    }

    flow.unlock(driver).await?;

    info!("[{}] ⬇️ Downloading paycheck", kind);
    flow.download(driver, workspace).await?;

    match find_verified_document(workspace.path()).await {
        Ok(Some(path)) => {
            info!("[{}] ✓ Paycheck saved to {}", kind, path.display());
            Ok(RetrievalOutcome::Document(path))
        }
        Ok(None) => Err(FailureReason::NoValidOutput),
        Err(e) => Err(FailureReason::Workspace(e.to_string())),
    }
}

/// Adapter for `config`'s provider
pub fn adapter_for(config: ProviderConfig, wait: WaitPolicy) -> Box<dyn ProviderAdapter> {
    match config.kind {
        ProviderKind::HarGal => Box::new(HarGalPortal::new(config, wait)),
        ProviderKind::Hilan => Box::new(HilanPortal::new(config, wait)),
    }
}

// ========== Helpers shared by the portals ==========

/// Select `value` and read the control back to confirm the portal kept it
pub(crate) async fn select_and_verify(
    driver: &mut dyn PortalDriver,
    locator: Locator,
    value: &str,
) -> Result<(), FailureReason> {
    driver.select(locator, value).await?;
    let state = driver.select_state(locator).await?;
    if state.selected.as_deref() == Some(value) {
        Ok(())
    } else {
        Err(FailureReason::SelectionNotApplied {
            expected: value.to_string(),
            actual: state.selected,
        })
    }
}

/// Label a driver timeout with the stage it happened in
pub(crate) fn in_stage(stage: &'static str) -> impl FnOnce(DriverError) -> FailureReason {
    move |err| match err {
        DriverError::Timeout { .. } => FailureReason::Timeout(format!("{}: {}", stage, err)),
        other => other.into(),
    }
}
