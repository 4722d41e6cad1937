//! Client configuration loaded from environment variables.
//!
//! | Variable                      | Default                 |
//! |-------------------------------|-------------------------|
//! | `POSTER_API_URL`              | `http://127.0.0.1:8000` |
//! | `POSTER_POLL_INTERVAL_MS`     | `2000`                  |
//! | `POSTER_POLL_TIMEOUT_SECS`    | `10`                    |
//! | `POSTER_SUBMIT_TIMEOUT_SECS`  | `30`                    |
//! | `POSTER_CATALOG_TIMEOUT_SECS` | `10`                    |

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Time between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
/// Per-poll timeout. Independent of the interval.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);
/// Submission timeout. Job creation may involve upstream geocoding.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for each reference-data fetch.
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub submit_timeout: Duration,
    pub catalog_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            catalog_timeout: DEFAULT_CATALOG_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Read the configuration from the process environment.
    ///
    /// Missing variables use the defaults. Unparseable values are logged
    /// and also fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let api_url = lookup("POSTER_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_url);

        Self {
            api_url,
            poll_interval: duration_var(
                &lookup,
                "POSTER_POLL_INTERVAL_MS",
                Duration::from_millis,
                defaults.poll_interval,
            ),
            poll_timeout: duration_var(
                &lookup,
                "POSTER_POLL_TIMEOUT_SECS",
                Duration::from_secs,
                defaults.poll_timeout,
            ),
            submit_timeout: duration_var(
                &lookup,
                "POSTER_SUBMIT_TIMEOUT_SECS",
                Duration::from_secs,
                defaults.submit_timeout,
            ),
            catalog_timeout: duration_var(
                &lookup,
                "POSTER_CATALOG_TIMEOUT_SECS",
                Duration::from_secs,
                defaults.catalog_timeout,
            ),
        }
    }
}

fn duration_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    unit: fn(u64) -> Duration,
    default: Duration,
) -> Duration {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => unit(value),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring invalid duration, using default");
            default
        }
    }
}
