//! Connection settings.
//!
//! [`DatabaseConfig::load`] reads the `[database]` section of
//! `config/config.toml` when present and overlays environment variables
//! prefixed with `LIFELINE`, sections separated by `__`:
//!
//! ```toml
//! [database]
//! driver = "mysql"
//! dbname = "app"
//! host = "db.internal"
//! port = 3306
//! username = "app"
//! ```
//!
//! `LIFELINE_DATABASE__DBNAME=other` overrides `dbname`.

use crate::connection::{ConnectionError, Credentials, DriverKind};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

const CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "LIFELINE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default = "default_dbname")]
    pub dbname: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub persistent: bool,
}

fn default_driver() -> String {
    "sqlite".to_string()
}

fn default_dbname() -> String {
    ":memory:".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            dbname: default_dbname(),
            host: default_host(),
            port: None,
            username: None,
            password: None,
            persistent: false,
        }
    }
}

impl DatabaseConfig {
    /// Load from `config/config.toml` and the environment, falling back to
    /// the environment alone when the file cannot be read.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when neither source can be built or the
    /// `database` section does not deserialize.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!("Failed to load {CONFIG_FILE}, falling back to env: {err}");
                }
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        Self::from_settings(&settings)
    }

    /// Parse the `[database]` section of an inline TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed TOML or field types.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::from_settings(&settings)
    }

    fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<DatabaseConfig>("database") {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Database configuration could not be loaded from file or environment: {e}"
            ))),
        }
    }

    /// Validated connection credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidDriver`] for an unknown driver name.
    pub fn credentials(&self) -> Result<Credentials, ConnectionError> {
        let driver: DriverKind = self.driver.parse()?;
        let mut credentials = Credentials::new(driver, self.dbname.clone())
            .host(self.host.clone())
            .persistent(self.persistent);
        if let Some(port) = self.port {
            credentials = credentials.port(port);
        }
        if let Some(username) = &self.username {
            credentials = credentials.login(username.clone(), self.password.clone());
        }
        Ok(credentials)
    }
}
