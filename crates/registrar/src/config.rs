//! Configuration management for registrar.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::{Uncased, UncasedStr},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "codex-registrar";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "registrants.db";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "REGISTRAR_";

/// Placeholder printed instead of secret values.
const REDACTED: &str = "********";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (`REGISTRAR_<SECTION>__<KEY>`)
/// 2. The unprefixed `FROM_EMAIL` and `SENDGRID_API_KEY` variables
/// 3. TOML config file at `~/.config/codex-registrar/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Outbound mail configuration.
    pub mail: MailConfig,
    /// Event details used in emails.
    pub event: EventConfig,
    /// Credentials guarding the registrant listing.
    pub listing: ListingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: IpAddr,
    /// Port to bind.
    pub port: u16,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/codex-registrar/registrants.db`
    pub database_path: Option<PathBuf>,
}

/// Mail provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Sender address for registration emails.
    pub from_email: Option<String>,
    /// `SendGrid` API key.
    pub api_key: Option<String>,
    /// Base URL of the `SendGrid` API.
    pub api_base_url: String,
    /// Timeout for a single send, in seconds.
    pub timeout_secs: u64,
}

/// Event details that appear in registration emails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Event name used in the subject line.
    pub name: String,
    /// Banner image shown at the top of the email.
    pub banner_url: String,
    /// File name of the attached QR code.
    pub attachment_name: String,
}

/// Credentials for the registrant listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Expected username.
    pub username: Option<String>,
    /// Expected password.
    pub password: Option<String>,
}

/// A resolved username/password pair for the listing page.
#[derive(Clone, PartialEq, Eq)]
pub struct ListingCredentials {
    /// Expected username.
    pub username: String,
    /// Expected password.
    pub password: String,
}

impl std::fmt::Debug for ListingCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingCredentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5000,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_email: None,
            api_key: None,
            api_base_url: "https://api.sendgrid.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            name: "CodeX April 2019".to_string(),
            banner_url:
                "https://drive.google.com/uc?id=12VCUzNvU53f_mR7Hbumrc6N66rCQO5r-&export=download"
                    .to_string(),
            attachment_name: "qr.png".to_string(),
        }
    }
}

impl ServerConfig {
    /// The socket address to bind.
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MailConfig {
    /// The sender address and API key, both required to send mail.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing setting.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let from_email = require(self.from_email.as_deref(), "mail.from_email")?;
        let api_key = require(self.api_key.as_deref(), "mail.api_key")?;
        Ok((from_email, api_key))
    }

    /// Get the send timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ListingConfig {
    /// The configured credential pair.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing setting.
    pub fn credentials(&self) -> Result<ListingCredentials> {
        Ok(ListingCredentials {
            username: require(self.username.as_deref(), "listing.username")?.to_string(),
            password: require(self.password.as_deref(), "listing.password")?.to_string(),
        })
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::config_validation(format!("{name} must be set")))
}

/// Map the unprefixed variables the service has always read onto config keys.
fn legacy_env_key(key: &UncasedStr) -> Uncased<'_> {
    if key.as_str().eq_ignore_ascii_case("FROM_EMAIL") {
        Uncased::from_borrowed("mail.from_email")
    } else if key.as_str().eq_ignore_ascii_case("SENDGRID_API_KEY") {
        Uncased::from_borrowed("mail.api_key")
    } else {
        Uncased::from_borrowed(key.as_str())
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(
                Env::raw()
                    .only(&["FROM_EMAIL", "SENDGRID_API_KEY"])
                    .map(legacy_env_key),
            )
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// Secrets may be absent here; [`Config::validate_for_serve`] requires them.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config_validation("server.port must be greater than 0"));
        }

        if self.mail.timeout_secs == 0 {
            return Err(Error::config_validation(
                "mail.timeout_secs must be greater than 0",
            ));
        }

        if !(self.mail.api_base_url.starts_with("http://")
            || self.mail.api_base_url.starts_with("https://"))
        {
            return Err(Error::config_validation(format!(
                "mail.api_base_url must be an http(s) URL: {}",
                self.mail.api_base_url
            )));
        }

        if let Some(from_email) = &self.mail.from_email {
            if !from_email.contains('@') {
                return Err(Error::config_validation(format!(
                    "mail.from_email is not an email address: {from_email}"
                )));
            }
        }

        if self.event.attachment_name.trim().is_empty() {
            return Err(Error::config_validation(
                "event.attachment_name cannot be empty",
            ));
        }

        Ok(())
    }

    /// Validate that everything the HTTP service needs is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a required secret
    /// is missing.
    pub fn validate_for_serve(&self) -> Result<()> {
        self.validate()?;
        self.mail.credentials()?;
        self.listing.credentials()?;
        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// A copy with every secret replaced by a placeholder, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        let mask = |value: &mut Option<String>| {
            if value.is_some() {
                *value = Some(REDACTED.to_string());
            }
        };
        mask(&mut config.mail.api_key);
        mask(&mut config.listing.password);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.port, 5000);
        assert!(config.mail.from_email.is_none());
        assert!(config.listing.username.is_none());
        assert_eq!(config.event.name, "CodeX April 2019");
        assert_eq!(config.event.attachment_name, "qr.png");
    }

    #[test]
    fn test_default_mail_config() {
        let mail = MailConfig::default();
        assert_eq!(mail.api_base_url, "https://api.sendgrid.com");
        assert_eq!(mail.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig::default();
        assert_eq!(server.socket_addr().to_string(), "127.0.0.1:5000");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.port"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.mail.timeout_secs = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_bad_api_url() {
        let mut config = Config::default();
        config.mail.api_base_url = "api.sendgrid.com".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("api_base_url"));
    }

    #[test]
    fn test_validate_bad_from_email() {
        let mut config = Config::default();
        config.mail.from_email = Some("not-an-address".to_string());
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("from_email"));
    }

    #[test]
    fn test_validate_for_serve_requires_secrets() {
        let mut config = Config::default();
        let err = config.validate_for_serve().unwrap_err().to_string();
        assert!(err.contains("mail.from_email"));

        config.mail.from_email = Some("events@codex.test".to_string());
        config.mail.api_key = Some("SG.key".to_string());
        let err = config.validate_for_serve().unwrap_err().to_string();
        assert!(err.contains("listing.username"));

        config.listing.username = Some("admin".to_string());
        config.listing.password = Some("   ".to_string());
        let err = config.validate_for_serve().unwrap_err().to_string();
        assert!(err.contains("listing.password"));

        config.listing.password = Some("secret".to_string());
        assert!(config.validate_for_serve().is_ok());
    }

    #[test]
    fn test_listing_credentials_debug_hides_password() {
        let creds = ListingCredentials {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let debug_str = format!("{creds:?}");
        assert!(debug_str.contains("admin"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut config = Config::default();
        config.mail.api_key = Some("SG.key".to_string());
        config.listing.password = Some("hunter2".to_string());

        let json = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!json.contains("SG.key"));
        assert!(!json.contains("hunter2"));
        assert!(json.contains(REDACTED));
    }

    #[test]
    fn test_redacted_leaves_unset_secrets_unset() {
        let config = Config::default().redacted();
        assert!(config.mail.api_key.is_none());
        assert!(config.listing.password.is_none());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config
            .database_path()
            .to_string_lossy()
            .contains("registrants.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));
        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("codex-registrar"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "registrar.toml",
                r#"
                [server]
                port = 8080

                [mail]
                from_email = "events@codex.test"

                [listing]
                username = "admin"
                "#,
            )?;

            let config = Config::load_from(Some(jail.directory().join("registrar.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.mail.from_email.as_deref(), Some("events@codex.test"));
            assert_eq!(config.listing.username.as_deref(), Some("admin"));
            assert_eq!(config.event, EventConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("registrar.toml", "[server]\nport = 8080\n")?;
            jail.set_env("REGISTRAR_SERVER__PORT", "9090");
            jail.set_env("REGISTRAR_LISTING__USERNAME", "organiser");
            jail.set_env("REGISTRAR_EVENT__ATTACHMENT_NAME", "ticket.png");

            let config = Config::load_from(Some(jail.directory().join("registrar.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 9090);
            assert_eq!(config.listing.username.as_deref(), Some("organiser"));
            assert_eq!(config.event.attachment_name, "ticket.png");
            Ok(())
        });
    }

    #[test]
    fn test_legacy_env_names() {
        Jail::expect_with(|jail| {
            jail.set_env("FROM_EMAIL", "legacy@codex.test");
            jail.set_env("SENDGRID_API_KEY", "SG.legacy");

            let config = Config::load_from(Some(jail.directory().join("missing.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.mail.from_email.as_deref(), Some("legacy@codex.test"));
            assert_eq!(config.mail.api_key.as_deref(), Some("SG.legacy"));
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_beats_legacy_env() {
        Jail::expect_with(|jail| {
            jail.set_env("FROM_EMAIL", "legacy@codex.test");
            jail.set_env("REGISTRAR_MAIL__FROM_EMAIL", "new@codex.test");

            let config = Config::load_from(Some(jail.directory().join("missing.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.mail.from_email.as_deref(), Some("new@codex.test"));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.set_env("REGISTRAR_MAIL__TIMEOUT_SECS", "0");

            let result = Config::load_from(Some(jail.directory().join("missing.toml")));
            assert!(result.is_err());
            Ok(())
        });
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("api_base_url"));
        assert!(json.contains("attachment_name"));
    }

    #[test]
    fn test_event_config_deserialize_partial() {
        let json = r#"{"name": "CodeX 2020"}"#;
        let event: EventConfig = serde_json::from_str(json).unwrap();
        assert_eq!(event.name, "CodeX 2020");
        assert_eq!(event.attachment_name, "qr.png");
    }
}
