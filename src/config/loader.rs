//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate. The base file is
//! required, the environment overlay is optional and `INTAKE__*` variables
//! override both.

use super::error::{ConfigResult, ConfigurationError};
use super::IntakeConfig;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_STEM: &str = "intake-config";
const ENV_PREFIX: &str = "INTAKE";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: IntakeConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            failure_threshold = config.circuit_breaker.failure_threshold,
            recovery_timeout_ms = config.circuit_breaker.recovery_timeout_ms,
            max_concurrent_submissions = config.batch.max_concurrent_submissions,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: IntakeConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::new(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment: INTAKE_ENV || APP_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var("INTAKE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        env::var("INTAKE_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();

        for extension in ["yaml", "yml"] {
            let config_path = config_directory.join(format!("{CONFIG_FILE_STEM}.{extension}"));
            searched_paths.push(config_path.clone());

            if config_path.exists() {
                debug!(path = %config_path.display(), "Found configuration file");
                return Ok(config_path);
            }
        }

        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<IntakeConfig> {
        let base_file = Self::find_config_file(config_directory)?;
        let override_file = config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}.yaml"));

        if override_file.exists() {
            debug!(path = %override_file.display(), "Applying environment overrides");
        }

        let settings = Config::builder()
            .add_source(File::from(base_file.clone()).format(FileFormat::Yaml).required(true))
            .add_source(
                File::from(override_file)
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::parse_error(base_file.display().to_string(), e))?;

        settings
            .try_deserialize::<IntakeConfig>()
            .map_err(|e| ConfigurationError::parse_error(base_file.display().to_string(), e))
    }
}
