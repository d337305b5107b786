//! Application entry - orchestration layer
//!
//! Wires configuration into adapters and services, then hands one run to
//! [`RunOrchestrator`].

use chrono::Local;

use crate::browser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::PortalDriver;
use crate::models::Period;
use crate::orchestrator::run_orchestrator::{RunOrchestrator, RunSummary};
use crate::portals;
use crate::services::{QpdfDecryptor, SmtpMailer, WorkspaceManager};
use crate::utils::logging::{log_startup, print_final_stats};

/// Application root
pub struct App {
    config: Config,
    orchestrator: RunOrchestrator,
}

impl App {
    /// Build every component from `config`
    pub fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);

        let adapters = config
            .providers
            .iter()
            .cloned()
            .map(|provider| portals::adapter_for(provider, config.wait))
            .collect();

        let mailer = SmtpMailer::new(&config.mail).map_err(AppError::Mailer)?;

        let orchestrator = RunOrchestrator::new(
            adapters,
            WorkspaceManager::new(&config.workspace_dir),
            Box::new(QpdfDecryptor::with_program(&config.decrypt_command)),
            Box::new(mailer),
            config.mail.clone(),
        );

        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// Fetch last month's paychecks
    pub async fn run(&self) -> AppResult<RunSummary> {
        let period = Period::previous_month_of(Local::now().date_naive());
        self.run_for(period).await
    }

    /// Fetch the paychecks of `period`
    pub async fn run_for(&self, period: Period) -> AppResult<RunSummary> {
        let settings = &self.config.browser;
        let wait = &self.config.wait;
        let summary = self
            .orchestrator
            .run_all(period, || async move {
                let driver = browser::open_session(settings, wait).await?;
                Ok(Box::new(driver) as Box<dyn PortalDriver>)
            })
            .await?;

        print_final_stats(&summary);
        Ok(summary)
    }
}
