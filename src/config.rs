use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_TABLE: &str = "cars";
pub const DEFAULT_BUCKET: &str = "car-images";
pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const DEFAULT_PHONE: &str = "+2349162534022";

/// Runtime settings, read from the environment (and `.env` when present)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub table: String,
    pub bucket: String,
    pub page_size: usize,
    pub phone_number: String,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            table: DEFAULT_TABLE.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            phone_number: DEFAULT_PHONE.to_string(),
            http_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load `.env` if there is one, then read the process environment
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(dotenvy::Error::Io(_)) => {}
            Err(e) => return Err(e).context("Failed to parse .env file"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; project credentials are optional here and
    /// checked by [`Config::require_project`]
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let config = Self {
            supabase_url: text("SUPABASE_URL", defaults.supabase_url),
            supabase_anon_key: text("SUPABASE_ANON_KEY", defaults.supabase_anon_key),
            table: text("AUTOLOT_TABLE", defaults.table),
            bucket: text("AUTOLOT_BUCKET", defaults.bucket),
            page_size: parsed(&lookup, "AUTOLOT_PAGE_SIZE", defaults.page_size)?,
            phone_number: text("AUTOLOT_PHONE", defaults.phone_number),
            http_timeout_secs: parsed(&lookup, "AUTOLOT_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
        };

        if config.page_size == 0 {
            bail!("AUTOLOT_PAGE_SIZE must be at least 1");
        }

        Ok(config)
    }

    /// Fail unless a backend project is configured
    pub fn require_project(&self) -> Result<()> {
        if self.supabase_url.is_empty() {
            bail!("SUPABASE_URL is not set (use --demo to run without a backend)");
        }
        if self.supabase_anon_key.is_empty() {
            bail!("SUPABASE_ANON_KEY is not set");
        }
        Ok(())
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.require_project().is_err());
    }

    #[test]
    fn reads_overrides() {
        let config = from(&[
            ("SUPABASE_URL", "https://demo.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("AUTOLOT_PAGE_SIZE", " 24 "),
            ("AUTOLOT_BUCKET", "photos"),
        ])
        .unwrap();

        assert_eq!(config.page_size, 24);
        assert_eq!(config.bucket, "photos");
        assert_eq!(config.table, "cars");
        assert!(config.require_project().is_ok());
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(from(&[("AUTOLOT_PAGE_SIZE", "twelve")]).is_err());
        assert!(from(&[("AUTOLOT_PAGE_SIZE", "0")]).is_err());
        assert!(from(&[("AUTOLOT_HTTP_TIMEOUT_SECS", "-1")]).is_err());
    }
}
