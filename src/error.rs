use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fatal errors: anything here aborts the whole run.
///
/// Per-provider problems never end up here, they are carried as
/// [`FailureReason`](crate::models::FailureReason) inside a retrieval outcome.
#[derive(Debug, Error)]
pub enum AppError {
    /// Browser session could not be started or maintained
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
    /// Workspace could not be prepared or removed
    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// The external decryption utility is missing from the host
    #[error("decryption utility `{program}` is unavailable: {reason}")]
    DecryptorUnavailable { program: String, reason: String },
    /// The mail transport could not be set up
    #[error("mail transport error: {0}")]
    Mailer(#[source] DispatchError),
    /// A panic escaped the provider loop
    #[error("run aborted by a panic: {0}")]
    Panicked(String),
}

/// Browser session errors
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Could not build the launch configuration
    #[error("invalid browser configuration: {0}")]
    ConfigurationFailed(String),
    /// Could not launch a local browser
    #[error("failed to launch browser: {source}")]
    LaunchFailed {
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// Could not connect to an already running browser
    #[error("failed to connect to browser on port {port}: {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// Could not open a fresh page
    #[error("failed to create page: {0}")]
    PageCreationFailed(#[source] DriverError),
}

/// Errors raised by a single driver primitive (navigate, click, wait...)
#[derive(Debug, Error)]
pub enum DriverError {
    /// A bounded wait expired
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },
    /// The locator matched nothing
    #[error("element not found: {0}")]
    NotFound(String),
    /// The requested option is not part of the select element
    #[error("option `{value}` not present in {locator}")]
    OptionNotFound { locator: String, value: String },
    /// The browser rejected the download target
    #[error("download path must be absolute: {}", .0.display())]
    RelativeDownloadPath(PathBuf),
    /// The download started but the browser reported it as canceled
    #[error("download canceled by the browser")]
    DownloadCanceled,
    /// Anything the DevTools protocol or page script reported
    #[error("browser protocol error: {0}")]
    Protocol(String),
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Protocol(err.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Protocol(format!("unexpected script result: {}", err))
    }
}

/// Workspace lifecycle errors
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The path exists but is a file (or something else)
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    /// Filesystem failure while creating, listing or deleting
    #[error("{action} {} failed: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkspaceError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Errors from the external decryption utility
#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to pass password to `{program}`: {source}")]
    Stdin {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with code {code:?}")]
    Exit { program: String, code: Option<i32> },
}

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("attachment {} could not be read: {source}", .path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid mail address `{address}`: {reason}")]
    Address { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("smtp transport failed: {0}")]
    Transport(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing
    #[error("environment variable {var_name} is not set")]
    EnvVarNotFound { var_name: String },
    /// An environment variable could not be parsed
    #[error("environment variable {var_name}: value '{value}' is not a valid {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
    /// The TOML config file could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The TOML config file is malformed
    #[error("failed to parse config file {}: {source}", .path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ========== Result alias ==========

/// Result of operations that may fail fatally
pub type AppResult<T> = Result<T, AppError>;
