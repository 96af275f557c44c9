//! Configuration loading for the migrator.
//!
//! Settings come from a YAML file (default `floodgate.yaml`) layered with
//! environment variables via the `config` crate. The environment source uses
//! `_` as the level separator, so `DATABASE_HOST` overrides `database.host`,
//! `DATABASE_SSLMODE` overrides `database.sslmode`, and `MIGRATIONS_DIRECTORY`
//! overrides `migrations.directory`.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default name of the configuration file
pub const DEFAULT_CONFIG_FILENAME: &str = "floodgate.yaml";

/// Default name of the migrations directory
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

const DEFAULT_PORT: u16 = 5432;
const DEFAULT_SSLMODE: &str = "disable";

/// Configuration for the database connection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub sslmode: String,
}

impl DatabaseConfig {
    /// Build the key-value connection string understood by `may_postgres`
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={} sslmode={}",
            self.host, self.port, self.name, self.user, self.password, self.sslmode
        )
    }
}

/// Configuration for migration discovery
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    pub directory: PathBuf,
}

/// Configuration for the migrator
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    pub database: DatabaseConfig,
    pub migrations: MigrationsConfig,
}

impl MigrateConfig {
    /// Load the configuration from the specified YAML file, with environment
    /// variables taking precedence over file values.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or unparseable, or if a required field
    /// is absent after layering (see [`MigrateConfig::validate`]).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(true))
            .add_source(Environment::default().separator("_").try_parsing(true))
            .build()?;

        let mut cfg: MigrateConfig = settings.try_deserialize()?;
        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration, filling in defaults
    ///
    /// Host, database name and user are required. Port defaults to 5432,
    /// sslmode to `disable`, the migrations directory to `migrations`.
    /// A relative migrations directory is resolved against the current
    /// working directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming the missing field.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.database.host.is_empty() {
            return Err(ConfigError::Message("database host is required".into()));
        }

        if self.database.port == 0 {
            self.database.port = DEFAULT_PORT;
        }

        if self.database.name.is_empty() {
            return Err(ConfigError::Message("database name is required".into()));
        }

        if self.database.user.is_empty() {
            return Err(ConfigError::Message("database user is required".into()));
        }

        if self.database.sslmode.is_empty() {
            self.database.sslmode = DEFAULT_SSLMODE.to_string();
        }

        if self.migrations.directory.as_os_str().is_empty() {
            self.migrations.directory = PathBuf::from(DEFAULT_MIGRATIONS_DIR);
        }

        if !self.migrations.directory.is_absolute() {
            let cwd = std::env::current_dir().map_err(|e| {
                ConfigError::Message(format!(
                    "failed to resolve migrations directory: {e}"
                ))
            })?;
            self.migrations.directory = cwd.join(&self.migrations.directory);
        }

        Ok(())
    }
}

/// Write a commented default configuration file
///
/// Used by `init` to bootstrap a project. Does not overwrite; callers check
/// for existence first.
///
/// # Errors
///
/// Returns `ConfigError::Message` if the file cannot be written.
pub fn create_default(path: &Path) -> Result<(), ConfigError> {
    let template = "\
# Floodgate configuration.
# Every value can be overridden from the environment, e.g. DATABASE_HOST,
# DATABASE_PASSWORD, MIGRATIONS_DIRECTORY.
database:
  host: localhost
  port: 5432
  name: postgres
  user: postgres
  password: postgres
  sslmode: disable

migrations:
  directory: migrations
";

    std::fs::write(path, template)
        .map_err(|e| ConfigError::Message(format!("failed to write config file: {e}")))
}
