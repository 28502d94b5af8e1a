//! Service configuration.

use std::ops::{Range, RangeInclusive};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use tesouro_traits::SourceKind;

use crate::error::{ConfigError, ConfigResult, Validate, ValidationError};

// =============================================================================
// SERVER
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Requests allowed per client IP per minute
    pub rate_limit_per_minute: u32,
    /// How long in-flight requests may drain after shutdown
    pub shutdown_grace_seconds: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            rate_limit_per_minute: 10,
            shutdown_grace_seconds: 10,
        }
    }
}

impl ServerSettings {
    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Drain period after shutdown.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

// =============================================================================
// SCRAPER
// =============================================================================

/// Upstream acquisition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    /// Run the acquirer at all
    pub enabled: bool,
    /// Which upstream shape to read
    pub source: SourceKind,
    /// Minutes between scheduled fetches
    pub interval_minutes: u64,
    /// JSON document URL
    pub json_url: Option<String>,
    /// Investable dataset URL
    pub invest_csv_url: Option<String>,
    /// Redeemable dataset URL
    pub redeem_csv_url: Option<String>,
    /// IANA zone the business-hours window is evaluated in
    pub timezone: String,
    /// First weekday of the window, 0 = Sunday
    pub start_day: u32,
    /// Last weekday of the window, inclusive
    pub end_day: u32,
    /// First hour of the window
    pub start_hour: u32,
    /// Hour the window closes, exclusive
    pub end_hour: u32,
    /// Name prefixes ordering the delimited listing
    pub sort_priority: Vec<String>,
    /// Upstream request timeout
    pub request_timeout_seconds: u64,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            source: SourceKind::Json,
            interval_minutes: 15,
            json_url: None,
            invest_csv_url: None,
            redeem_csv_url: None,
            timezone: "America/Sao_Paulo".to_string(),
            start_day: 1,
            end_day: 5,
            start_hour: 9,
            end_hour: 18,
            sort_priority: default_sort_priority(),
            request_timeout_seconds: 30,
        }
    }
}

fn default_sort_priority() -> Vec<String> {
    [
        "Tesouro Prefixado",
        "Tesouro Selic",
        "Tesouro IPCA+",
        "Tesouro Renda+",
        "Tesouro Educa+",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// =============================================================================
// LOGGING
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// =============================================================================
// APP CONFIG
// =============================================================================

/// Complete service configuration.
///
/// Resolution order: built-in defaults, then the optional TOML file, then
/// environment variables. The result is validated before use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener
    pub server: ServerSettings,
    /// Upstream acquisition
    pub scraper: ScraperSettings,
    /// Logging
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Defaults or `path`, then process environment, then validation.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Overlay values from environment variables.
    ///
    /// `lookup` returns the value of a variable, or `None` if it is unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        env.parse("HOST", &mut self.server.host)?;
        env.parse("PORT", &mut self.server.port)?;
        env.parse("RATE_LIMIT_PER_MINUTE", &mut self.server.rate_limit_per_minute)?;
        env.parse("SHUTDOWN_GRACE_SECONDS", &mut self.server.shutdown_grace_seconds)?;

        env.flag("SCRAPER_ENABLED", &mut self.scraper.enabled)?;
        if let Some(raw) = env.get("SOURCE") {
            self.scraper.source = SourceKind::parse(&raw).ok_or_else(|| ConfigError::InvalidEnv {
                var: "SOURCE".into(),
                value: raw.clone(),
                message: "expected 'json' or 'csv'".into(),
            })?;
        }
        env.parse("INTERVAL_MINUTES", &mut self.scraper.interval_minutes)?;
        env.optional("URL_TESOURO", &mut self.scraper.json_url);
        env.optional("URL_INVEST_CSV", &mut self.scraper.invest_csv_url);
        env.optional("URL_REDEEM_CSV", &mut self.scraper.redeem_csv_url);
        env.parse("TZ_BUSINESS", &mut self.scraper.timezone)?;
        env.parse("START_DAY", &mut self.scraper.start_day)?;
        env.parse("END_DAY", &mut self.scraper.end_day)?;
        env.parse("START_HOUR", &mut self.scraper.start_hour)?;
        env.parse("END_HOUR", &mut self.scraper.end_hour)?;
        env.parse("REQUEST_TIMEOUT_SECONDS", &mut self.scraper.request_timeout_seconds)?;
        if let Some(raw) = env.get("SORT_PRIORITY") {
            self.scraper.sort_priority = raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(raw) = env.get("LOG_LEVEL") {
            self.logging.level = raw.trim().to_lowercase();
        }
        env.parse("LOG_FORMAT", &mut self.logging.format)?;

        Ok(())
    }

    /// Business time zone.
    pub fn timezone(&self) -> ConfigResult<Tz> {
        parse_timezone(&self.scraper.timezone)
    }

    /// Weekdays the acquirer runs on, 0 = Sunday.
    pub fn day_range(&self) -> RangeInclusive<u32> {
        self.scraper.start_day..=self.scraper.end_day
    }

    /// Hours the acquirer runs in, end exclusive.
    pub fn hour_range(&self) -> Range<u32> {
        self.scraper.start_hour..self.scraper.end_hour
    }

    /// Scheduled fetch period.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.scraper.interval_minutes * 60)
    }

    /// Upstream request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper.request_timeout_seconds)
    }
}

fn parse_timezone(name: &str) -> ConfigResult<Tz> {
    name.parse::<Tz>().map_err(|_| ConfigError::Validation {
        field: "scraper.timezone".into(),
        message: format!("Unknown time zone '{name}'"),
    })
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var).filter(|v| !v.trim().is_empty())
    }

    fn parse<T>(&self, var: &str, target: &mut T) -> ConfigResult<()>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(raw) = self.get(var) {
            *target = raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
                var: var.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn optional(&self, var: &str, target: &mut Option<String>) {
        if let Some(raw) = self.get(var) {
            *target = Some(raw.trim().to_string());
        }
    }

    fn flag(&self, var: &str, target: &mut bool) -> ConfigResult<()> {
        if let Some(raw) = self.get(var) {
            *target = match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: var.to_string(),
                        value: raw.clone(),
                        message: "expected a boolean".into(),
                    })
                }
            };
        }
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let server = &self.server;
        let scraper = &self.scraper;

        if server.port == 0 {
            errors.push(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if server.rate_limit_per_minute == 0 {
            errors.push(ValidationError::with_rule(
                "server.rate_limit_per_minute",
                "Rate limit must allow at least one request per minute",
                "min_rate_limit",
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::with_rule(
                "logging.level",
                format!("Unknown log level '{}'", self.logging.level),
                "valid_level",
            ));
        }

        // A disabled scraper never reads the remaining settings.
        if !scraper.enabled {
            return errors;
        }

        if scraper.interval_minutes == 0 {
            errors.push(ValidationError::with_rule(
                "scraper.interval_minutes",
                "Interval must be at least one minute",
                "min_interval",
            ));
        }

        if scraper.request_timeout_seconds == 0 {
            errors.push(ValidationError::with_rule(
                "scraper.request_timeout_seconds",
                "Request timeout must be at least one second",
                "min_timeout",
            ));
        }

        if scraper.start_day > 6 || scraper.end_day > 6 {
            errors.push(ValidationError::with_rule(
                "scraper.start_day",
                "Weekdays must be between 0 (Sunday) and 6 (Saturday)",
                "valid_weekday",
            ));
        } else if scraper.start_day > scraper.end_day {
            errors.push(ValidationError::with_rule(
                "scraper.start_day",
                format!(
                    "Start day {} is after end day {}",
                    scraper.start_day, scraper.end_day
                ),
                "ordered_days",
            ));
        }

        if scraper.start_hour > 23 || scraper.end_hour > 24 {
            errors.push(ValidationError::with_rule(
                "scraper.start_hour",
                "Hours must be between 0 and 24",
                "valid_hour",
            ));
        } else if scraper.start_hour >= scraper.end_hour {
            errors.push(ValidationError::with_rule(
                "scraper.start_hour",
                format!(
                    "Start hour {} must be before end hour {}",
                    scraper.start_hour, scraper.end_hour
                ),
                "ordered_hours",
            ));
        }

        if parse_timezone(&scraper.timezone).is_err() {
            errors.push(ValidationError::with_rule(
                "scraper.timezone",
                format!("Unknown time zone '{}'", scraper.timezone),
                "iana_zone",
            ));
        }

        let missing = |url: &Option<String>| url.as_deref().map_or(true, str::is_empty);
        match scraper.source {
            SourceKind::Json => {
                if missing(&scraper.json_url) {
                    errors.push(ValidationError::new(
                        "scraper.json_url",
                        "JSON source requires a document URL (URL_TESOURO)",
                    ));
                }
            }
            SourceKind::Csv => {
                if missing(&scraper.invest_csv_url) {
                    errors.push(ValidationError::new(
                        "scraper.invest_csv_url",
                        "CSV source requires the investable dataset URL (URL_INVEST_CSV)",
                    ));
                }
                if missing(&scraper.redeem_csv_url) {
                    errors.push(ValidationError::new(
                        "scraper.redeem_csv_url",
                        "CSV source requires the redeemable dataset URL (URL_REDEEM_CSV)",
                    ));
                }
            }
        }

        if scraper.sort_priority.iter().any(|p| p.trim().is_empty()) {
            errors.push(ValidationError::new(
                "scraper.sort_priority",
                "Sort priority entries cannot be empty",
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn json_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.scraper.json_url = Some("https://example.test/bonds.json".into());
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.rate_limit_per_minute, 10);
        assert_eq!(config.interval(), Duration::from_secs(900));
        assert_eq!(config.day_range(), 1..=5);
        assert_eq!(config.hour_range(), 9..18);
        assert_eq!(config.server.shutdown_grace(), Duration::from_secs(10));
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::Sao_Paulo);
        assert_eq!(config.scraper.sort_priority[0], "Tesouro Prefixado");
        assert_eq!(config.scraper.sort_priority.len(), 5);
    }

    #[test]
    fn test_default_requires_upstream_url() {
        let errors = AppConfig::default().validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "scraper.json_url");
        assert!(json_config().is_valid());
    }

    #[test]
    fn test_disabled_scraper_needs_no_url() {
        let mut config = AppConfig::default();
        config.scraper.enabled = false;
        assert!(config.is_valid());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[
                ("PORT", "9090"),
                ("SOURCE", "csv"),
                ("URL_INVEST_CSV", "https://example.test/invest.csv"),
                ("URL_REDEEM_CSV", "https://example.test/redeem.csv"),
                ("INTERVAL_MINUTES", "5"),
                ("START_DAY", "0"),
                ("END_DAY", "6"),
                ("END_HOUR", "20"),
                ("RATE_LIMIT_PER_MINUTE", "60"),
                ("SCRAPER_ENABLED", "true"),
                ("LOG_LEVEL", "DEBUG"),
                ("LOG_FORMAT", "text"),
                ("SORT_PRIORITY", "Tesouro Selic, Tesouro IPCA+"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.scraper.source, SourceKind::Csv);
        assert_eq!(config.interval(), Duration::from_secs(300));
        assert_eq!(config.day_range(), 0..=6);
        assert_eq!(config.hour_range(), 9..20);
        assert_eq!(config.server.rate_limit_per_minute, 60);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(
            config.scraper.sort_priority,
            vec!["Tesouro Selic".to_string(), "Tesouro IPCA+".to_string()]
        );
        assert!(config.is_valid());
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = json_config();
        config.apply_env_overrides(env(&[("PORT", "  ")])).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(env(&[("PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "PORT"));

        let err = config
            .apply_env_overrides(env(&[("SOURCE", "xml")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "SOURCE"));

        let err = config
            .apply_env_overrides(env(&[("SCRAPER_ENABLED", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_gate_bounds_validation() {
        let mut config = json_config();
        config.scraper.start_day = 5;
        config.scraper.end_day = 1;
        assert!(!config.is_valid());

        let mut config = json_config();
        config.scraper.end_day = 7;
        assert!(!config.is_valid());

        let mut config = json_config();
        config.scraper.start_hour = 18;
        config.scraper.end_hour = 18;
        assert!(!config.is_valid());

        let mut config = json_config();
        config.scraper.start_hour = 0;
        config.scraper.end_hour = 24;
        assert!(config.is_valid());
    }

    #[test]
    fn test_unknown_timezone() {
        let mut config = json_config();
        config.scraper.timezone = "America/Atlantis".into();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "scraper.timezone"));
        assert!(config.timezone().is_err());
    }

    #[test]
    fn test_multiple_errors_reported_together() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        config.logging.level = "loud".into();
        assert!(matches!(
            config.validate_or_error(),
            Err(ConfigError::MultipleValidationErrors(ref errors)) if errors.len() == 3
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 3000

[scraper]
source = "csv"
invest_csv_url = "https://example.test/invest.csv"
redeem_csv_url = "https://example.test/redeem.csv"
end_hour = 17

[logging]
format = "text"
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.scraper.source, SourceKind::Csv);
        assert_eq!(config.hour_range(), 9..17);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.is_valid());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let err = AppConfig::from_toml("[server]\nport = \"high\"").unwrap_err();
        assert!(matches!(err, ConfigError::Deserialization(_)));
    }
}
