//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL used in emails (default: `http://localhost:3000`)
//! - `STOREFRONT_CONTENT_DIR` - Blog content directory (default: crates/storefront/content)
//! - `ANTHROPIC_API_KEY` - Enables AI recommendations and blog drafts
//! - `CLAUDE_MODEL`, `CLAUDE_API_URL`, `RECOMMENDATION_TIMEOUT_SECS`
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` - Enables email
//! - `SHOP_NOTIFY_EMAIL` - Where new-order notices go
//! - `CALENDAR_API_URL`, `CALENDAR_ID`, `CALENDAR_ACCESS_TOKEN` - Enables calendar sync
//! - `REMINDER_INTERVAL_SECS` - How often to look for due reminders (default: 300)
//! - `REMINDER_LEAD_HOURS` - How far ahead reminders go out (default: 24)
//! - `BLOG_GENERATION_INTERVAL_HOURS` - Blog draft cadence, 0 disables (default: 0)
//! - `BLOG_TOPICS` - Comma-separated draft topics
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default Claude model for recommendations and drafts.
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";

/// Anthropic Messages API endpoint.
pub const DEFAULT_CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";

const DEFAULT_BLOG_TOPICS: &str = "choosing a mat color,conservation glass explained,\
     float mounting for deckled paper,framing children's artwork";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Directory holding `blog/*.md`
    pub content_dir: PathBuf,
    /// Claude API configuration. `None` disables recommendations.
    pub claude: Option<ClaudeConfig>,
    /// SMTP configuration. `None` skips email.
    pub email: Option<EmailConfig>,
    /// Calendar configuration. `None` skips calendar sync.
    pub calendar: Option<CalendarConfig>,
    /// Background job schedule
    pub jobs: JobsConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Claude AI API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ClaudeConfig {
    /// Anthropic API key
    pub api_key: SecretString,
    /// Model ID (e.g., claude-sonnet-4-20250514)
    pub model: String,
    /// Messages endpoint. Overridable for tests and proxies.
    pub api_url: String,
    /// Upper bound on a single recommendation round trip
    pub timeout: Duration,
}

impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
    /// Shop inbox for new-order notices
    pub shop_address: Option<String>,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("shop_address", &self.shop_address)
            .finish()
    }
}

/// Calendar API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct CalendarConfig {
    /// Base URL of the calendar API (e.g. `https://www.googleapis.com/calendar/v3`)
    pub api_url: String,
    /// Calendar that receives appointment events
    pub calendar_id: String,
    /// Bearer token
    pub access_token: SecretString,
}

impl std::fmt::Debug for CalendarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarConfig")
            .field("api_url", &self.api_url)
            .field("calendar_id", &self.calendar_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Schedule for the background jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobsConfig {
    /// How often the reminder job runs
    pub reminder_interval: Duration,
    /// Appointments starting within this window get a reminder
    pub reminder_lead: Duration,
    /// How often a blog draft is generated. `None` disables the job.
    pub blog_interval: Option<Duration>,
    /// Topics cycled through by the blog job
    pub blog_topics: Vec<String>,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            reminder_interval: Duration::from_secs(300),
            reminder_lead: Duration::from_secs(24 * 3600),
            blog_interval: None,
            blog_topics: split_topics(DEFAULT_BLOG_TOPICS),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");
        let content_dir =
            PathBuf::from(get_env_or_default("STOREFRONT_CONTENT_DIR", "crates/storefront/content"));

        let claude = ClaudeConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let calendar = CalendarConfig::from_env()?;
        let jobs = JobsConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            content_dir,
            claude,
            email,
            calendar,
            jobs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ClaudeConfig {
    /// Returns `None` when `ANTHROPIC_API_KEY` is unset.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(key) = get_optional_env("ANTHROPIC_API_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(&key, "ANTHROPIC_API_KEY")?;

        Ok(Some(Self {
            api_key: SecretString::from(key),
            model: get_env_or_default("CLAUDE_MODEL", DEFAULT_CLAUDE_MODEL),
            api_url: get_env_or_default("CLAUDE_API_URL", DEFAULT_CLAUDE_API_URL),
            timeout: parse_secs("RECOMMENDATION_TIMEOUT_SECS", "20")?,
        }))
    }
}

impl EmailConfig {
    /// Returns `None` when `SMTP_HOST` is unset; the rest are then required.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_validated_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
            shop_address: get_optional_env("SHOP_NOTIFY_EMAIL"),
        }))
    }
}

impl CalendarConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let api_url = get_optional_env("CALENDAR_API_URL");
        let calendar_id = get_optional_env("CALENDAR_ID");
        let token = get_optional_env("CALENDAR_ACCESS_TOKEN");

        match (api_url, calendar_id, token) {
            (Some(api_url), Some(calendar_id), Some(token)) => Ok(Some(Self {
                api_url: api_url.trim_end_matches('/').to_owned(),
                calendar_id,
                access_token: SecretString::from(token),
            })),
            (None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "CALENDAR_*".to_string(),
                "CALENDAR_API_URL, CALENDAR_ID and CALENDAR_ACCESS_TOKEN must be set together"
                    .to_string(),
            )),
        }
    }
}

impl JobsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let blog_hours: u64 = parse_env("BLOG_GENERATION_INTERVAL_HOURS", "0")?;
        Ok(Self {
            reminder_interval: parse_secs("REMINDER_INTERVAL_SECS", "300")?,
            reminder_lead: Duration::from_secs(
                parse_env::<u64>("REMINDER_LEAD_HOURS", "24")?.saturating_mul(3600),
            ),
            blog_interval: (blog_hours > 0)
                .then(|| Duration::from_secs(blog_hours.saturating_mul(3600))),
            blog_topics: split_topics(&get_env_or_default("BLOG_TOPICS", DEFAULT_BLOG_TOPICS)),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn split_topics(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a whole number of seconds. Zero is rejected: the request timeout
/// and the reminder tick both need a non-zero period.
fn parse_secs(key: &str, default: &str) -> Result<Duration, ConfigError> {
    nonzero_secs(key, parse_env(key, default)?)
}

fn nonzero_secs(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1 second".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "ANTHROPIC_API_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("sk-ant-aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_seconds_rejected() {
        let result = nonzero_secs("REMINDER_INTERVAL_SECS", 0);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "REMINDER_INTERVAL_SECS"
        ));
        assert!(nonzero_secs("RECOMMENDATION_TIMEOUT_SECS", 0).is_err());
        assert_eq!(
            nonzero_secs("RECOMMENDATION_TIMEOUT_SECS", 20).ok(),
            Some(Duration::from_secs(20))
        );
    }

    #[test]
    fn test_split_topics() {
        assert_eq!(
            split_topics(" a , ,b,"),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(JobsConfig::default().blog_topics.len(), 4);
    }

    #[test]
    fn test_jobs_default_disables_blog() {
        let jobs = JobsConfig::default();
        assert!(jobs.blog_interval.is_none());
        assert_eq!(jobs.reminder_lead, Duration::from_secs(86_400));
    }

    #[test]
    fn test_claude_config_debug_redacts_key() {
        let config = ClaudeConfig {
            api_key: SecretString::from("sk-ant-super-secret-value"),
            model: DEFAULT_CLAUDE_MODEL.to_string(),
            api_url: DEFAULT_CLAUDE_API_URL.to_string(),
            timeout: Duration::from_secs(20),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains(DEFAULT_CLAUDE_MODEL));
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_calendar_config_debug_redacts_token() {
        let config = CalendarConfig {
            api_url: "https://calendar.test".to_string(),
            calendar_id: "shop".to_string(),
            access_token: SecretString::from("ya29.token-value"),
        };
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("token-value"));
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            content_dir: PathBuf::from("content"),
            claude: None,
            email: None,
            calendar: None,
            jobs: JobsConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }
}
