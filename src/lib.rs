//! # Paycheck Mailer
//!
//! Logs into HR portals with a real browser, downloads last month's paycheck
//! and mails it.
//!
//! ## Layers
//!
//! ### ① Infrastructure
//! - `infrastructure/` - owns the browser page, exposes primitives only
//! - `PortalDriver` - navigate / fill / click / wait / select / download
//! - `CdpDriver` - the chromiumoxide implementation
//!
//! ### ② Services
//! - `services/` - single purpose capabilities
//! - `WorkspaceManager` - per provider download directory
//! - `document_verifier` - is this really a PDF
//! - `QpdfDecryptor` - external decryption
//! - `SmtpMailer` - notification
//!
//! ### ③ Portals
//! - `portals/` - one adapter per HR portal behind `ProviderAdapter`
//!
//! ### ④ Workflow
//! - `workflow/` - one provider's run: retrieve → decrypt → mail → clean up
//!
//! ### ⑤ Orchestration
//! - `orchestrator/` - all providers, one browser session, run summary

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod portals;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CdpDriver, PortalDriver};
pub use models::{Period, ProviderConfig, ProviderKind, RetrievalOutcome};
pub use orchestrator::{App, RunOrchestrator, RunSummary};
pub use portals::ProviderAdapter;
