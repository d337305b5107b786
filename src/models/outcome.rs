use std::fmt::{self, Display};
use std::path::PathBuf;

use crate::error::DriverError;

/// Result of one adapter invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// A verified document inside the provider's workspace
    Document(PathBuf),
    /// The requested period is not published yet. Not an error.
    MissingPeriod,
    /// Something unexpected stopped the flow
    Failure(FailureReason),
}

/// Why an adapter gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    SelectorNotFound(String),
    Timeout(String),
    /// The period control did not keep the value that was selected
    SelectionNotApplied { expected: String, actual: Option<String> },
    /// The unlock overlay was still visible after the bounded wait
    UnlockRejected,
    /// The portal asked for an unlock password but none is configured
    UnlockPasswordMissing,
    /// Download finished but no file in the workspace is a valid document
    NoValidOutput,
    Browser(String),
    /// The workspace could not be scanned after the download
    Workspace(String),
    AdapterPanicked(String),
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SelectorNotFound(what) => write!(f, "selector not found: {}", what),
            FailureReason::Timeout(what) => write!(f, "timeout: {}", what),
            FailureReason::SelectionNotApplied { expected, actual } => write!(
                f,
                "selection not applied: expected {}, found {}",
                expected,
                actual.as_deref().unwrap_or("nothing")
            ),
            FailureReason::UnlockRejected => f.write_str("unlock rejected"),
            FailureReason::UnlockPasswordMissing => f.write_str("unlock password not configured"),
            FailureReason::NoValidOutput => f.write_str("no valid output"),
            FailureReason::Browser(msg) => write!(f, "browser error: {}", msg),
            FailureReason::Workspace(msg) => write!(f, "workspace error: {}", msg),
            FailureReason::AdapterPanicked(msg) => write!(f, "adapter panicked: {}", msg),
        }
    }
}

impl From<DriverError> for FailureReason {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Timeout { .. } => FailureReason::Timeout(err.to_string()),
            DriverError::NotFound(locator) => FailureReason::SelectorNotFound(locator),
            DriverError::OptionNotFound { .. } => FailureReason::SelectorNotFound(err.to_string()),
            other => FailureReason::Browser(other.to_string()),
        }
    }
}
