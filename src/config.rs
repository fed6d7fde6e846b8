use std::{str::FromStr, time::Duration};

use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::ai::normalize::NormalizeMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set when APP_ENV=production")]
    MissingInProduction(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub food_model: String,
    pub planner_model: String,
    pub food_mode: NormalizeMode,
    pub planner_mode: NormalizeMode,
    pub timeout_secs: u64,
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
    pub ai: AiConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match var("APP_ENV") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                key: "APP_ENV",
                value: v,
            })?,
            None => Environment::Development,
        };

        let secret = match var("SESSION_SECRET") {
            Some(s) => s,
            None if environment == Environment::Production => {
                return Err(ConfigError::MissingInProduction("SESSION_SECRET"));
            }
            None => {
                warn!("SESSION_SECRET not set; using an ephemeral secret, sessions will not survive a restart");
                ephemeral_secret()
            }
        };

        let session = SessionConfig {
            secret,
            issuer: var("SESSION_ISSUER").unwrap_or_else(|| "macrolens".into()),
            cookie_secure: parse_or("SESSION_COOKIE_SECURE", var("SESSION_COOKIE_SECURE"), true)?,
        };

        let ai = AiConfig {
            api_key: var("GEMINI_API_KEY"),
            base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".into()),
            food_model: var("FOOD_MODEL").unwrap_or_else(|| "gemini-2.0-flash".into()),
            planner_model: var("PLANNER_MODEL").unwrap_or_else(|| "gemini-2.5-flash".into()),
            food_mode: parse_or(
                "FOOD_AI_MODE",
                var("FOOD_AI_MODE"),
                NormalizeMode::SchemaConstrained,
            )?,
            planner_mode: parse_or(
                "PLANNER_AI_MODE",
                var("PLANNER_AI_MODE"),
                NormalizeMode::FreeText,
            )?,
            timeout_secs: parse_or("AI_TIMEOUT_SECS", var("AI_TIMEOUT_SECS"), 60)?,
        };

        Ok(Self {
            environment,
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://macrolens.db?mode=rwc".into()),
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or("APP_PORT", var("APP_PORT"), 3000)?,
            session,
            ai,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: v }),
        None => Ok(default),
    }
}

fn ephemeral_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_in_development() {
        let cfg = AppConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.session.secret.len(), 48);
        assert!(cfg.session.cookie_secure);
        assert!(cfg.ai.api_key.is_none());
        assert_eq!(cfg.ai.food_mode, NormalizeMode::SchemaConstrained);
        assert_eq!(cfg.ai.planner_mode, NormalizeMode::FreeText);
    }

    #[test]
    fn ephemeral_secrets_differ_between_boots() {
        let a = AppConfig::from_lookup(lookup(&[])).unwrap();
        let b = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_ne!(a.session.secret, b.session.secret);
    }

    #[test]
    fn production_requires_session_secret() {
        let err = AppConfig::from_lookup(lookup(&[("APP_ENV", "production")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingInProduction("SESSION_SECRET")));

        let cfg = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("SESSION_SECRET", "s3cret"),
        ]))
        .expect("config");
        assert_eq!(cfg.session.secret, "s3cret");
    }

    #[test]
    fn blank_secret_counts_as_unset() {
        let err = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "prod"),
            ("SESSION_SECRET", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingInProduction(_)));
    }

    #[test]
    fn rejects_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[("PLANNER_AI_MODE", "guess")])).unwrap_err();
        assert!(err.to_string().contains("PLANNER_AI_MODE"));

        let err = AppConfig::from_lookup(lookup(&[("APP_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));

        let err = AppConfig::from_lookup(lookup(&[("APP_ENV", "staging")])).unwrap_err();
        assert!(err.to_string().contains("APP_ENV"));
    }

    #[test]
    fn reads_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("APP_PORT", "8080"),
            ("GEMINI_API_KEY", "key"),
            ("FOOD_AI_MODE", "free-text"),
            ("SESSION_COOKIE_SECURE", "false"),
            ("AI_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.ai.api_key.as_deref(), Some("key"));
        assert_eq!(cfg.ai.food_mode, NormalizeMode::FreeText);
        assert!(!cfg.session.cookie_secure);
        assert_eq!(cfg.ai.timeout(), Duration::from_secs(5));
    }
}
