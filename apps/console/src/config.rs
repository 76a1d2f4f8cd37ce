use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use console_core::DEFAULT_STORE_URL;
use url::Url;

pub const CONFIG_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub store_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.into(),
            request_timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn store_url(&self) -> anyhow::Result<Url> {
        Url::parse(self.store_url.trim())
            .with_context(|| format!("invalid store url '{}'", self.store_url))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Defaults, then `console.toml`, then environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(Path::new(CONFIG_FILE)) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = raw.parse::<toml::Table>() else {
        tracing::warn!("ignoring unreadable {CONFIG_FILE}");
        return;
    };
    if let Some(v) = file_cfg.get("store_url").and_then(toml::Value::as_str) {
        settings.store_url = v.to_string();
    }
    let timeout = file_cfg.get("request_timeout_secs").and_then(|v| match v {
        toml::Value::Integer(secs) => u64::try_from(*secs).ok(),
        toml::Value::String(secs) => secs.parse::<u64>().ok(),
        _ => None,
    });
    if let Some(secs) = timeout {
        settings.request_timeout_secs = secs;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("USER_STORE_URL") {
        settings.store_url = v;
    }
    if let Some(v) = lookup("APP__STORE_URL") {
        settings.store_url = v;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_hosted_collection() {
        let settings = Settings::default();
        assert_eq!(settings.store_url, DEFAULT_STORE_URL);
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
        assert!(settings.store_url().is_ok());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            "store_url = \"http://127.0.0.1:3000/users\"\nrequest_timeout_secs = 3\n",
        );
        assert_eq!(settings.store_url, "http://127.0.0.1:3000/users");
        assert_eq!(settings.request_timeout_secs, 3);
    }

    #[test]
    fn quoted_timeout_is_accepted() {
        let mut settings = Settings::default();
        apply_file(&mut settings, "request_timeout_secs = \"7\"\n");
        assert_eq!(settings.request_timeout_secs, 7);
        assert_eq!(settings.store_url, DEFAULT_STORE_URL);
    }

    #[test]
    fn unreadable_file_is_ignored() {
        let mut settings = Settings::default();
        apply_file(&mut settings, "store_url = [");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn prefixed_env_wins_over_plain_env() {
        let mut settings = Settings::default();
        apply_env(&mut settings, |key| match key {
            "USER_STORE_URL" => Some("http://plain.example.com/users".into()),
            "APP__STORE_URL" => Some("http://prefixed.example.com/users".into()),
            "APP__REQUEST_TIMEOUT_SECS" => Some("not-a-number".into()),
            _ => None,
        });
        assert_eq!(settings.store_url, "http://prefixed.example.com/users");
        assert_eq!(settings.request_timeout_secs, 10);
    }

    #[test]
    fn zero_timeout_is_raised_to_one_second() {
        let settings = Settings {
            request_timeout_secs: 0,
            ..Settings::default()
        };
        assert_eq!(settings.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn malformed_store_url_is_reported() {
        let settings = Settings {
            store_url: "not a url".into(),
            ..Settings::default()
        };
        let err = settings.store_url().expect_err("must fail");
        assert!(err.to_string().contains("invalid store url"));
    }
}
