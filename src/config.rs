use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Cora (boleto/PIX PSP) client settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CoraConfig {
    /// Base URL of the Cora API; the client is disabled when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token issued for the integration
    #[serde(default)]
    pub api_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_cora_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub timeout_secs: u64,
}

impl Default for CoraConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            timeout_secs: default_cora_timeout_secs(),
        }
    }
}

impl CoraConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// WhatsApp gateways: a self-hosted instance first, a paid SaaS as fallback
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Self-hosted gateway base URL
    #[serde(default)]
    pub self_hosted_url: Option<String>,

    /// Instance name on the self-hosted gateway
    #[serde(default = "default_whatsapp_instance")]
    pub self_hosted_instance: String,

    /// API key for the self-hosted gateway
    #[serde(default)]
    pub self_hosted_api_key: Option<String>,

    /// Reachability probe timeout in seconds
    #[serde(default = "default_probe_timeout_secs")]
    #[validate(range(min = 1, max = 60))]
    pub probe_timeout_secs: u64,

    /// Send timeout in seconds
    #[serde(default = "default_send_timeout_secs")]
    #[validate(range(min = 1, max = 60))]
    pub send_timeout_secs: u64,

    /// SaaS gateway base URL
    #[serde(default)]
    pub saas_url: Option<String>,

    /// SaaS instance identifier
    #[serde(default)]
    pub saas_instance_id: Option<String>,

    /// SaaS instance token
    #[serde(default)]
    pub saas_token: Option<String>,

    /// SaaS account-level client token header
    #[serde(default)]
    pub saas_client_token: Option<String>,

    /// Country calling code prefixed to national numbers
    #[serde(default = "default_country_code")]
    #[validate(length(min = 1, max = 3))]
    pub country_code: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            self_hosted_url: None,
            self_hosted_instance: default_whatsapp_instance(),
            self_hosted_api_key: None,
            probe_timeout_secs: default_probe_timeout_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            saas_url: None,
            saas_instance_id: None,
            saas_token: None,
            saas_client_token: None,
            country_code: default_country_code(),
        }
    }
}

/// Ledger bookkeeping knobs
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Look-back window for the duplicate income check
    #[serde(default = "default_duplicate_window_hours")]
    #[validate(range(min = 1, max = 720))]
    pub duplicate_window_hours: i64,

    /// Amount tolerance for the duplicate income check
    #[serde(default = "default_duplicate_amount_tolerance")]
    pub duplicate_amount_tolerance: Decimal,

    /// Points awarded to the referrer when a referred customer's order is delivered
    #[serde(default = "default_referral_bonus_points")]
    pub referral_bonus_points: i64,

    /// Name of the internal supplier used for mirrored purchases
    #[serde(default = "default_factory_supplier_name")]
    #[validate(length(min = 1))]
    pub factory_supplier_name: String,

    /// Days until a freshly created receivable falls due
    #[serde(default = "default_receivable_due_days")]
    pub receivable_due_days: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            duplicate_window_hours: default_duplicate_window_hours(),
            duplicate_amount_tolerance: default_duplicate_amount_tolerance(),
            referral_bonus_points: default_referral_bonus_points(),
            factory_supplier_name: default_factory_supplier_name(),
            receivable_due_days: default_receivable_due_days(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key (minimum 64 characters)
    #[validate(length(min = 64))]
    pub jwt_secret: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// Request timeout applied to every route (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default)]
    #[validate]
    pub cora: CoraConfig,

    #[serde(default)]
    #[validate]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    #[validate]
    pub ledger: LedgerConfig,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials
    pub fn new(
        database_url: String,
        jwt_secret: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            request_timeout_secs: default_request_timeout_secs(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            cora: CoraConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique value."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if self.ledger.duplicate_amount_tolerance.is_sign_negative() {
            let mut err = ValidationError::new("duplicate_amount_tolerance");
            err.message = Some("ledger.duplicate_amount_tolerance must not be negative".into());
            errors.add("ledger", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_cora_timeout_secs() -> u64 {
    15
}

fn default_whatsapp_instance() -> String {
    "default".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_send_timeout_secs() -> u64 {
    15
}

fn default_country_code() -> String {
    "55".to_string()
}

fn default_duplicate_window_hours() -> i64 {
    72
}

fn default_duplicate_amount_tolerance() -> Decimal {
    Decimal::new(200, 2)
}

fn default_referral_bonus_points() -> i64 {
    100
}

fn default_factory_supplier_name() -> String {
    "Fábrica Própria".to_string()
}

fn default_receivable_due_days() -> i64 {
    30
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("backoffice_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Loads configuration from `dir/default.toml`, `dir/{run_env}.toml` and `APP__*` variables.
pub fn load_config_from(dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    let builder = Config::builder()
        .set_default("database_url", "sqlite://backoffice.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(dir.join("default.toml")).required(false))
        .add_source(File::from(dir.join(format!("{}.toml", run_env))).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET (minimum 64 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "a_production_grade_secret_value_with_plenty_of_entropy_0123456789".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://admin.example.com".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn dev_secret_rejected_outside_development() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        cfg.jwt_secret = DEV_DEFAULT_JWT_SECRET.into();
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.errors().contains_key("jwt_secret"));

        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn ledger_defaults_match_anti_duplicate_rules() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.duplicate_window_hours, 72);
        assert_eq!(ledger.duplicate_amount_tolerance, dec!(2.00));
        assert_eq!(WhatsAppConfig::default().probe_timeout_secs, 5);
        assert_eq!(WhatsAppConfig::default().send_timeout_secs, 15);
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        cfg.ledger.duplicate_amount_tolerance = dec!(-1);
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn environment_file_overrides_default_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
jwt_secret = "file_based_secret_that_is_long_enough_for_validation_purposes_0123456789"
environment = "development"
port = 9000

[ledger]
referral_bonus_points = 250
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("staging.toml"), "port = 9100\n").unwrap();

        let cfg = load_config_from(dir.path(), "staging").unwrap();
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.ledger.referral_bonus_points, 250);
        assert_eq!(cfg.ledger.duplicate_window_hours, 72);
    }

    #[test]
    fn missing_secret_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), "port = 9000\n").unwrap();
        assert!(matches!(
            load_config_from(dir.path(), "development"),
            Err(AppConfigError::Load(_))
        ));
    }

    #[test]
    fn field_validation_rejects_unknown_log_level() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        assert!(cfg.validate().is_err());
    }
}
