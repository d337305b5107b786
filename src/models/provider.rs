use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The fixed set of supported portals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Har Gal eforms portal: password tab login, separate year and month selects
    HarGal,
    /// Hilan payslip portal: combined period select, embedded unlock overlay
    Hilan,
}

impl ProviderKind {
    /// Display name used in logs
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::HarGal => "Har Gal",
            ProviderKind::Hilan => "Hilan",
        }
    }

    /// Filesystem-safe identifier, used for workspace and download names
    pub fn slug(self) -> &'static str {
        match self {
            ProviderKind::HarGal => "har-gal",
            ProviderKind::Hilan => "hilan",
        }
    }

    /// Portal address used when none is configured
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            ProviderKind::HarGal => Some("https://eforms.hargal.co.il"),
            ProviderKind::Hilan => None,
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Login credentials for one portal
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Keeps the password out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Static identity of one configured portal, read-only for the whole run
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub company_name: String,
    #[serde(default)]
    pub worker_name: Option<String>,
    pub base_url: String,
    pub credentials: Credentials,
    /// Set for portals whose documents are password protected
    #[serde(default)]
    pub unlock_password: Option<String>,
}

impl ProviderConfig {
    /// Worker name, treating an empty string as absent
    pub fn worker(&self) -> Option<&str> {
        self.worker_name.as_deref().filter(|w| !w.trim().is_empty())
    }

    /// `base_url` joined with `path`, tolerating a trailing slash
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("company_name", &self.company_name)
            .field("worker_name", &self.worker_name)
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("unlock_password", &self.unlock_password.as_ref().map(|_| "***"))
            .finish()
    }
}
