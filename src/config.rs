//! Program configuration
//!
//! Loaded once in `main` and handed down by value. Sources, lowest priority
//! first: built-in defaults, the TOML file named by `PAYCHECK_CONFIG`, a
//! `.env` file, the process environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::infrastructure::WaitPolicy;
use crate::models::{Credentials, ProviderConfig, ProviderKind};

/// Program configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Configured portals, in processing order
    pub providers: Vec<ProviderConfig>,
    pub mail: MailSettings,
    pub browser: BrowserSettings,
    /// Bound for every UI wait
    pub wait: WaitPolicy,
    /// Root under which each provider run gets its own workspace
    pub workspace_dir: PathBuf,
    /// External decryption program
    pub decrypt_command: String,
}

/// Mailbox used both to send and, through plus addressing, to receive
#[derive(Clone)]
pub struct MailSettings {
    pub username: String,
    pub password: String,
    pub domain: String,
    pub smtp_host: String,
}

impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("username", &self.username)
            .field("password", &"***")
            .field("domain", &self.domain)
            .field("smtp_host", &self.smtp_host)
            .finish()
    }
}

/// How to obtain the browser session
#[derive(Clone, Debug, Default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Chromium binary, auto-detected when `None`
    pub executable: Option<PathBuf>,
    /// Attach to an already running browser instead of launching one
    pub debug_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            mail: MailSettings {
                username: String::new(),
                password: String::new(),
                domain: "gmail.com".to_string(),
                smtp_host: "smtp.gmail.com".to_string(),
            },
            browser: BrowserSettings::default(),
            wait: WaitPolicy::default(),
            workspace_dir: PathBuf::from("assets"),
            decrypt_command: "qpdf".to_string(),
        }
    }
}

// ========== TOML layer ==========

/// Shape of the optional TOML file, every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub workspace_dir: Option<PathBuf>,
    pub wait_timeout_secs: Option<u64>,
    pub decrypt_command: Option<String>,
    pub browser: FileBrowser,
    pub mail: FileMail,
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileBrowser {
    pub headless: Option<bool>,
    pub executable: Option<PathBuf>,
    pub debug_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileMail {
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
    pub smtp_host: Option<String>,
}

impl FileConfig {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content, path)
    }
}

// ========== Environment layer ==========

/// Environment variable prefix of each provider
fn env_prefix(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::HarGal => "HAR_GAL",
        ProviderKind::Hilan => "HILAN",
    }
}

impl Config {
    /// Load `.env`, the optional TOML file and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => debug!("no .env file found"),
            Err(e) => warn!("ignoring unreadable .env file: {}", e),
        }

        let lookup = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let file = match lookup("PAYCHECK_CONFIG") {
            Some(path) => FileConfig::load(Path::new(&path))?,
            None => FileConfig::default(),
        };

        Self::from_sources(file, lookup)
    }

    /// Merge a parsed file with an environment lookup function
    pub fn from_sources(
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let default = Self::default();

        let is_prod = lookup("APP_ENV").is_some_and(|v| v == "production");
        let headless = match parse_var::<bool>(&lookup, "BROWSER_HEADLESS")? {
            Some(v) => v,
            None => file.browser.headless.unwrap_or(is_prod),
        };

        let wait_timeout = parse_var::<u64>(&lookup, "WAIT_TIMEOUT_SECS")?
            .or(file.wait_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(default.wait.timeout);

        let mail = MailSettings {
            username: lookup("EMAIL_USERNAME")
                .or(file.mail.username)
                .ok_or_else(|| missing("EMAIL_USERNAME"))?,
            password: lookup("EMAIL_PASSWORD")
                .or(file.mail.password)
                .ok_or_else(|| missing("EMAIL_PASSWORD"))?,
            domain: lookup("EMAIL_DOMAIN")
                .or(file.mail.domain)
                .unwrap_or(default.mail.domain),
            smtp_host: lookup("SMTP_HOST")
                .or(file.mail.smtp_host)
                .unwrap_or(default.mail.smtp_host),
        };

        let browser = BrowserSettings {
            headless,
            executable: lookup("BROWSER_EXECUTABLE")
                .map(PathBuf::from)
                .or(file.browser.executable),
            debug_port: parse_var::<u16>(&lookup, "BROWSER_DEBUG_PORT")?.or(file.browser.debug_port),
        };

        let providers = [ProviderKind::HarGal, ProviderKind::Hilan]
            .into_iter()
            .filter_map(|kind| {
                let from_file = file.providers.iter().find(|p| p.kind == kind).cloned();
                merge_provider(kind, from_file, &lookup)
            })
            .collect();

        Ok(Self {
            providers,
            mail,
            browser,
            wait: WaitPolicy {
                timeout: wait_timeout,
                ..default.wait
            },
            workspace_dir: lookup("PAYCHECK_FOLDER")
                .map(PathBuf::from)
                .or(file.workspace_dir)
                .unwrap_or(default.workspace_dir),
            decrypt_command: lookup("DECRYPT_COMMAND")
                .or(file.decrypt_command)
                .unwrap_or(default.decrypt_command),
        })
    }
}

/// Overlay `{PREFIX}_*` variables on the file entry for `kind`.
///
/// Returns `None`, with a warning, when company name, base URL or
/// credentials are still missing afterwards.
fn merge_provider(
    kind: ProviderKind,
    from_file: Option<ProviderConfig>,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Option<ProviderConfig> {
    let prefix = env_prefix(kind);
    let var = |name: &str| lookup(&format!("{}_{}", prefix, name));

    let company_name = var("COMPANY_NAME").or_else(|| from_file.as_ref().map(|p| p.company_name.clone()));
    let username = var("USERNAME").or_else(|| from_file.as_ref().map(|p| p.credentials.username.clone()));
    let password = var("PASSWORD").or_else(|| from_file.as_ref().map(|p| p.credentials.password.clone()));
    let base_url = var("BASE_URL")
        .or_else(|| from_file.as_ref().map(|p| p.base_url.clone()))
        .or_else(|| kind.default_base_url().map(str::to_string));
    let worker_name = var("WORKER_NAME").or_else(|| from_file.as_ref().and_then(|p| p.worker_name.clone()));

    // Only the Hilan flow has an unlock step
    let unlock_password = match kind {
        ProviderKind::Hilan => var("UNLOCK_PASSWORD")
            .or_else(|| lookup("PDF_PASSWORD"))
            .or_else(|| from_file.as_ref().and_then(|p| p.unlock_password.clone())),
        ProviderKind::HarGal => from_file.as_ref().and_then(|p| p.unlock_password.clone()),
    };

    match (company_name, username, password, base_url) {
        (Some(company_name), Some(username), Some(password), Some(base_url)) => Some(ProviderConfig {
            kind,
            company_name,
            worker_name,
            base_url,
            credentials: Credentials { username, password },
            unlock_password,
        }),
        _ => {
            warn!("⚠️ {} is not configured ({}_* variables missing), skipping it", kind, prefix);
            None
        }
    }
}

fn missing(var_name: &str) -> ConfigError {
    ConfigError::EnvVarNotFound {
        var_name: var_name.to_string(),
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const MAIL: [(&str, &str); 2] = [("EMAIL_USERNAME", "me"), ("EMAIL_PASSWORD", "app-pass")];

    #[test]
    fn test_defaults_with_only_mail_configured() {
        let config = Config::from_sources(FileConfig::default(), env(&MAIL)).unwrap();

        assert!(config.providers.is_empty());
        assert_eq!(config.mail.domain, "gmail.com");
        assert_eq!(config.mail.smtp_host, "smtp.gmail.com");
        assert_eq!(config.workspace_dir, PathBuf::from("assets"));
        assert_eq!(config.decrypt_command, "qpdf");
        assert_eq!(config.wait.timeout, Duration::from_secs(30));
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_missing_mail_username_is_an_error() {
        let err = Config::from_sources(FileConfig::default(), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound { ref var_name } if var_name == "EMAIL_USERNAME"));
    }

    #[test]
    fn test_providers_from_env() {
        let mut pairs = MAIL.to_vec();
        pairs.extend([
            ("HAR_GAL_COMPANY_NAME", "widgets"),
            ("HAR_GAL_USERNAME", "012345678"),
            ("HAR_GAL_PASSWORD", "pw1"),
            ("HILAN_COMPANY_NAME", "acme"),
            ("HILAN_WORKER_NAME", "dana"),
            ("HILAN_BASE_URL", "https://acme.net.hilan.co.il"),
            ("HILAN_USERNAME", "42"),
            ("HILAN_PASSWORD", "pw2"),
            ("PDF_PASSWORD", "pdf-secret"),
        ]);
        let config = Config::from_sources(FileConfig::default(), env(&pairs)).unwrap();

        assert_eq!(config.providers.len(), 2);

        let har_gal = &config.providers[0];
        assert_eq!(har_gal.kind, ProviderKind::HarGal);
        assert_eq!(har_gal.base_url, "https://eforms.hargal.co.il");
        assert_eq!(har_gal.unlock_password, None);

        let hilan = &config.providers[1];
        assert_eq!(hilan.kind, ProviderKind::Hilan);
        assert_eq!(hilan.worker(), Some("dana"));
        assert_eq!(hilan.unlock_password.as_deref(), Some("pdf-secret"));
    }

    #[test]
    fn test_hilan_without_base_url_is_skipped() {
        let mut pairs = MAIL.to_vec();
        pairs.extend([
            ("HILAN_COMPANY_NAME", "acme"),
            ("HILAN_USERNAME", "42"),
            ("HILAN_PASSWORD", "pw2"),
        ]);
        let config = Config::from_sources(FileConfig::default(), env(&pairs)).unwrap();
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let mut pairs = MAIL.to_vec();
        pairs.push(("WAIT_TIMEOUT_SECS", "soon"));
        let err = Config::from_sources(FileConfig::default(), env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarParseFailed { .. }));
    }

    #[test]
    fn test_production_defaults_to_headless() {
        let mut pairs = MAIL.to_vec();
        pairs.push(("APP_ENV", "production"));
        let config = Config::from_sources(FileConfig::default(), env(&pairs)).unwrap();
        assert!(config.browser.headless);

        pairs.push(("BROWSER_HEADLESS", "false"));
        let config = Config::from_sources(FileConfig::default(), env(&pairs)).unwrap();
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_env_overrides_toml_file() {
        let toml = r#"
            workspace_dir = "/var/tmp/paychecks"
            wait_timeout_secs = 45

            [mail]
            username = "file-user"
            password = "file-pass"

            [[providers]]
            kind = "hilan"
            company_name = "acme"
            base_url = "https://acme.net.hilan.co.il"
            unlock_password = "from-file"

            [providers.credentials]
            username = "42"
            password = "file-pw"
        "#;
        let file = FileConfig::from_toml_str(toml, Path::new("paycheck.toml")).unwrap();
        let config = Config::from_sources(file, env(&[("HILAN_PASSWORD", "env-pw")])).unwrap();

        assert_eq!(config.workspace_dir, PathBuf::from("/var/tmp/paychecks"));
        assert_eq!(config.wait.timeout, Duration::from_secs(45));
        assert_eq!(config.mail.username, "file-user");

        let hilan = &config.providers[0];
        assert_eq!(hilan.credentials.username, "42");
        assert_eq!(hilan.credentials.password, "env-pw");
        assert_eq!(hilan.unlock_password.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_bad_toml_reports_path() {
        let err = FileConfig::from_toml_str("wait_timeout_secs = \"x\"", Path::new("bad.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
