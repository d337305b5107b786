pub mod outcome;
pub mod period;
pub mod provider;

pub use outcome::{FailureReason, RetrievalOutcome};
pub use period::Period;
pub use provider::{Credentials, ProviderConfig, ProviderKind};
