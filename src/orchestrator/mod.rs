//! Orchestration layer
//!
//! ## Modules
//!
//! ### `app` - application entry
//! - Builds adapters and services from the configuration
//! - Computes the period once per run
//! - Prints the final summary
//!
//! ### `run_orchestrator` - the run itself
//! - Checks the decryption utility before anything else
//! - Owns the browser session for the whole run
//! - Runs providers sequentially through `workflow::ProviderRun`
//!
//! ## Layering
//!
//! ```text
//! app
//!     ↓
//! run_orchestrator (all providers, one browser session)
//!     ↓
//! workflow::ProviderRun (one provider)
//!     ↓
//! portals (adapters) / services (workspace, decrypt, mail)
//!     ↓
//! infrastructure (PortalDriver)
//! ```

pub mod app;
pub mod run_orchestrator;

pub use app::App;
pub use run_orchestrator::{ProviderReport, RunOrchestrator, RunSummary};
