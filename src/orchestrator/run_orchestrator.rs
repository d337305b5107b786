//! Run orchestrator - orchestration layer
//!
//! ## Responsibilities
//!
//! 1. **Precondition**: the decryption utility must be runnable, or nothing starts
//! 2. **Browser session**: opened once, lent to each provider, closed once at the end
//! 3. **Sequencing**: providers run strictly one after another
//! 4. **Isolation**: one provider's failure never stops the next one
//! 5. **Summary**: collects every provider's status
//!
//! Only infrastructure errors abort the run.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{info, warn};

use crate::config::MailSettings;
use crate::error::{AppError, AppResult};
use crate::infrastructure::PortalDriver;
use crate::models::Period;
use crate::portals::ProviderAdapter;
use crate::services::{Decryptor, NotificationDispatcher, WorkspaceManager};
use crate::workflow::provider_run::panic_message;
use crate::workflow::{ProviderCtx, ProviderRun, ProviderStatus};

/// One line of the run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReport {
    pub label: String,
    pub status: ProviderStatus,
}

/// What happened to every provider during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub period: Period,
    pub reports: Vec<ProviderReport>,
}

impl RunSummary {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            reports: Vec::new(),
        }
    }

    pub fn delivered(&self) -> usize {
        self.count(|s| matches!(s, ProviderStatus::Delivered))
    }

    pub fn missing(&self) -> usize {
        self.count(|s| matches!(s, ProviderStatus::PeriodMissing))
    }

    pub fn failed(&self) -> usize {
        self.count(ProviderStatus::is_error)
    }

    fn count(&self, pred: impl Fn(&ProviderStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.status)).count()
    }
}

/// Drives every configured provider through one run
pub struct RunOrchestrator {
    adapters: Vec<Box<dyn ProviderAdapter>>,
    workspaces: WorkspaceManager,
    decryptor: Box<dyn Decryptor>,
    dispatcher: Box<dyn NotificationDispatcher>,
    mail: MailSettings,
}

impl RunOrchestrator {
    pub fn new(
        adapters: Vec<Box<dyn ProviderAdapter>>,
        workspaces: WorkspaceManager,
        decryptor: Box<dyn Decryptor>,
        dispatcher: Box<dyn NotificationDispatcher>,
        mail: MailSettings,
    ) -> Self {
        Self {
            adapters,
            workspaces,
            decryptor,
            dispatcher,
            mail,
        }
    }

    /// Fetch and deliver `period`'s paycheck for every provider
    ///
    /// `open_session` is only called once the decryption utility is known to
    /// be available and there is at least one provider. The session is closed before returning, on every path
    /// that got as far as opening it.
    pub async fn run_all<F, Fut>(&self, period: Period, open_session: F) -> AppResult<RunSummary>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Box<dyn PortalDriver>>>,
    {
        self.decryptor.ensure_available().await?;

        if self.adapters.is_empty() {
            warn!("⚠️ No providers configured, nothing to do");
            return Ok(RunSummary::new(period));
        }

        info!("🌐 Opening browser session");
        let mut driver = open_session().await?;

        let result = AssertUnwindSafe(self.run_providers(driver.as_mut(), period))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(AppError::Panicked(panic_message(payload))));

        info!("Closing browser session");
        if let Err(e) = driver.close().await {
            warn!("⚠️ Closing browser failed: {}", e);
        }
        let released = self.workspaces.release_root().await;

        let summary = result?;
        released?;
        Ok(summary)
    }

    async fn run_providers(
        &self,
        driver: &mut dyn PortalDriver,
        period: Period,
    ) -> AppResult<RunSummary> {
        let run = ProviderRun::new(
            &self.workspaces,
            self.decryptor.as_ref(),
            self.dispatcher.as_ref(),
            &self.mail,
        );
        let mut summary = RunSummary::new(period);
        let total = self.adapters.len();

        for (index, adapter) in self.adapters.iter().enumerate() {
            let label = ProviderCtx::new(adapter.provider(), period).to_string();
            log_provider_start(index + 1, total, &label);

            let status = run.run(adapter.as_ref(), driver, period).await?;

            log_provider_complete(&label, &status);
            summary.reports.push(ProviderReport { label, status });
        }

        Ok(summary)
    }
}

// ========== Logging helpers ==========

fn log_provider_start(index: usize, total: usize, label: &str) {
    info!("{}", "=".repeat(60));
    info!("📦 Provider {}/{}: {}", index, total, label);
    info!("{}", "=".repeat(60));
}

fn log_provider_complete(label: &str, status: &ProviderStatus) {
    info!("{}", "─".repeat(60));
    if status.is_error() {
        warn!("[{}] finished: {}", label, status);
    } else {
        info!("[{}] finished: {}", label, status);
    }
    info!("{}", "─".repeat(60));
}
