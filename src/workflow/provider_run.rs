//! One provider's run - workflow layer
//!
//! Order for every provider:
//! 1. fresh page, fresh workspace
//! 2. adapter retrieval (panics are contained)
//! 3. decrypt when the provider declares an unlock password
//! 4. mail the document
//! 5. workspace removal, whatever happened before
//!
//! A panic in steps 2-4 is contained and becomes the provider's status.
//!
//! Only infrastructure problems (page, workspace) come back as errors; every
//! per-provider problem ends up in the returned [`ProviderStatus`].

use std::any::Any;
use std::fmt::{self, Display};
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{error, info};

use crate::config::MailSettings;
use crate::error::{AppResult, BrowserError};
use crate::infrastructure::PortalDriver;
use crate::models::{FailureReason, Period, ProviderConfig, RetrievalOutcome};
use crate::portals::ProviderAdapter;
use crate::services::workspace::destroy;
use crate::services::{Decryptor, NotificationDispatcher, PaycheckMail, Workspace, WorkspaceManager};
use crate::workflow::provider_ctx::ProviderCtx;

/// How one provider's run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Document retrieved and mailed
    Delivered,
    /// Period not published yet
    PeriodMissing,
    Failed(FailureReason),
    DecryptFailed(String),
    /// Retrieved (and decrypted) but the mail did not go out
    DispatchFailed(String),
    /// Decryption or delivery panicked
    Crashed(String),
}

impl ProviderStatus {
    /// `true` for statuses that count as a problem in the summary
    pub fn is_error(&self) -> bool {
        !matches!(self, ProviderStatus::Delivered | ProviderStatus::PeriodMissing)
    }
}

impl Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderStatus::Delivered => f.write_str("delivered"),
            ProviderStatus::PeriodMissing => f.write_str("not published yet"),
            ProviderStatus::Failed(reason) => write!(f, "failed: {}", reason),
            ProviderStatus::DecryptFailed(reason) => write!(f, "decryption failed: {}", reason),
            ProviderStatus::DispatchFailed(reason) => write!(f, "mail failed: {}", reason),
            ProviderStatus::Crashed(reason) => write!(f, "crashed: {}", reason),
        }
    }
}

/// Runs providers one at a time against the shared services
///
/// Holds no browser resource of its own; the driver is lent per call.
pub struct ProviderRun<'a> {
    workspaces: &'a WorkspaceManager,
    decryptor: &'a dyn Decryptor,
    dispatcher: &'a dyn NotificationDispatcher,
    mail: &'a MailSettings,
}

impl<'a> ProviderRun<'a> {
    pub fn new(
        workspaces: &'a WorkspaceManager,
        decryptor: &'a dyn Decryptor,
        dispatcher: &'a dyn NotificationDispatcher,
        mail: &'a MailSettings,
    ) -> Self {
        Self {
            workspaces,
            decryptor,
            dispatcher,
            mail,
        }
    }

    pub async fn run(
        &self,
        adapter: &dyn ProviderAdapter,
        driver: &mut dyn PortalDriver,
        period: Period,
    ) -> AppResult<ProviderStatus> {
        let provider = adapter.provider();
        let ctx = ProviderCtx::new(provider, period);
        info!("[{}] 🔄 Fetching paycheck for {}", ctx, period);

        // No page state may leak from the previous provider
        driver
            .reset()
            .await
            .map_err(BrowserError::PageCreationFailed)?;

        let workspace = self.workspaces.acquire(provider.kind.slug()).await?;

        let status = AssertUnwindSafe(
            self.retrieve_and_deliver(&ctx, adapter, driver, period, &workspace),
        )
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            let message = panic_message(payload);
            error!("[{}] 💥 Delivery panicked: {}", ctx, message);
            ProviderStatus::Crashed(message)
        });

        destroy(workspace.path()).await?;
        Ok(status)
    }

    async fn retrieve_and_deliver(
        &self,
        ctx: &ProviderCtx,
        adapter: &dyn ProviderAdapter,
        driver: &mut dyn PortalDriver,
        period: Period,
        workspace: &Workspace,
    ) -> ProviderStatus {
        let outcome = AssertUnwindSafe(adapter.retrieve(driver, period, workspace))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                RetrievalOutcome::Failure(FailureReason::AdapterPanicked(panic_message(payload)))
            });

        self.deliver(ctx, adapter.provider(), outcome, period).await
    }

    /// Turn a retrieval outcome into a status, decrypting and mailing on the way
    async fn deliver(
        &self,
        ctx: &ProviderCtx,
        provider: &ProviderConfig,
        outcome: RetrievalOutcome,
        period: Period,
    ) -> ProviderStatus {
        let path = match outcome {
            RetrievalOutcome::Document(path) => path,
            RetrievalOutcome::MissingPeriod => {
                info!("[{}] ℹ️ Paycheck for {} is not published yet", ctx, period);
                return ProviderStatus::PeriodMissing;
            }
            RetrievalOutcome::Failure(reason) => {
                error!("[{}] ❌ Retrieval failed: {}", ctx, reason);
                return ProviderStatus::Failed(reason);
            }
        };

        if let Some(password) = provider.unlock_password.as_deref() {
            info!("[{}] 🔓 Decrypting {}", ctx, path.display());
            if let Err(e) = self.decryptor.decrypt(&path, password).await {
                error!("[{}] ❌ Decryption failed: {}", ctx, e);
                return ProviderStatus::DecryptFailed(e.to_string());
            }
        }

        let mail = PaycheckMail::compose(self.mail, provider, period, &path);
        match self.dispatcher.send(&mail).await {
            Ok(()) => {
                info!("[{}] ✅ Paycheck sent to {}", ctx, mail.to);
                ProviderStatus::Delivered
            }
            Err(e) => {
                error!("[{}] ❌ Sending mail failed: {}", ctx, e);
                ProviderStatus::DispatchFailed(e.to_string())
            }
        }
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic");
    }

    #[test]
    fn test_missing_period_is_not_an_error() {
        assert!(!ProviderStatus::PeriodMissing.is_error());
        assert!(!ProviderStatus::Delivered.is_error());
        assert!(ProviderStatus::Failed(FailureReason::UnlockRejected).is_error());
        assert!(ProviderStatus::DispatchFailed("smtp down".to_string()).is_error());
        assert!(ProviderStatus::Crashed("boom".to_string()).is_error());
    }

    #[test]
    fn test_status_wording() {
        assert_eq!(
            ProviderStatus::Failed(FailureReason::NoValidOutput).to_string(),
            "failed: no valid output"
        );
    }
}
