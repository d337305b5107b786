pub mod provider_ctx;
pub mod provider_run;

pub use provider_ctx::ProviderCtx;
pub use provider_run::{ProviderRun, ProviderStatus};
