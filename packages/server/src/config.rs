use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Cron expression for periodic rule ticks (default: daily at 03:00)
    pub rule_tick_cron: String,
    /// Days in the same state before a member is flagged "warning"
    pub attention_warning_days: i64,
    /// Days in the same state before a member is flagged "critical"
    pub attention_critical_days: i64,
    /// Global per-IP rate limit fallback for unauthenticated lookups
    pub rate_limit_enabled: bool,
    pub rate_limit_max_per_window: usize,
    pub rate_limit_window_seconds: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            rule_tick_cron: env::var("RULE_TICK_CRON")
                .unwrap_or_else(|_| "0 0 3 * * *".to_string()),
            attention_warning_days: env::var("ATTENTION_WARNING_DAYS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("ATTENTION_WARNING_DAYS must be a valid number")?,
            attention_critical_days: env::var("ATTENTION_CRITICAL_DAYS")
                .unwrap_or_else(|_| "28".to_string())
                .parse()
                .context("ATTENTION_CRITICAL_DAYS must be a valid number")?,
            rate_limit_enabled: env::var("RATE_LIMIT_ENABLED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            rate_limit_max_per_window: env::var("RATE_LIMIT_MAX_PER_WINDOW")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("RATE_LIMIT_MAX_PER_WINDOW must be a valid number")?,
            rate_limit_window_seconds: env::var("RATE_LIMIT_WINDOW_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("RATE_LIMIT_WINDOW_SECONDS must be a valid number")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rule_tick_cron: "0 0 3 * * *".to_string(),
            attention_warning_days: 10,
            attention_critical_days: 28,
            rate_limit_enabled: false,
            rate_limit_max_per_window: 60,
            rate_limit_window_seconds: 60,
        }
    }
}
