//! Tesouro Configuration Layer
//!
//! Loads the service configuration from built-in defaults, an optional TOML
//! file and environment variables, in that order, and validates the result.
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `HOST`, `PORT` | `server.host`, `server.port` |
//! | `RATE_LIMIT_PER_MINUTE` | `server.rate_limit_per_minute` |
//! | `SHUTDOWN_GRACE_SECONDS` | `server.shutdown_grace_seconds` |
//! | `SCRAPER_ENABLED` | `scraper.enabled` |
//! | `SOURCE` | `scraper.source` (`json` or `csv`) |
//! | `INTERVAL_MINUTES` | `scraper.interval_minutes` |
//! | `URL_TESOURO` | `scraper.json_url` |
//! | `URL_INVEST_CSV`, `URL_REDEEM_CSV` | `scraper.invest_csv_url`, `scraper.redeem_csv_url` |
//! | `TZ_BUSINESS` | `scraper.timezone` |
//! | `START_DAY`, `END_DAY` | `scraper.start_day`, `scraper.end_day` |
//! | `START_HOUR`, `END_HOUR` | `scraper.start_hour`, `scraper.end_hour` |
//! | `SORT_PRIORITY` | `scraper.sort_priority` (comma-separated) |
//! | `REQUEST_TIMEOUT_SECONDS` | `scraper.request_timeout_seconds` |
//! | `LOG_LEVEL`, `LOG_FORMAT` | `logging.level`, `logging.format` |
//!
//! # Example
//!
//! ```rust
//! use tesouro_config::{AppConfig, Validate};
//!
//! let mut config = AppConfig::from_toml(r#"
//!     [scraper]
//!     json_url = "https://example.test/bonds.json"
//! "#).unwrap();
//! config.apply_env_overrides(|_| None).unwrap();
//!
//! assert!(config.is_valid());
//! assert_eq!(config.server.port, 8080);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod app;
mod error;

pub use app::{AppConfig, LogFormat, LoggingSettings, ScraperSettings, ServerSettings};
pub use error::{ConfigError, ConfigResult, Validate, ValidationError};
