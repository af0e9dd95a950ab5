use std::path::PathBuf;

use tracing::warn;

use crate::assignment::{DrawMode, DEFAULT_MAX_ATTEMPTS};

pub const DEFAULT_PASSWORD: &str = "admin123";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("email is partially configured, {0} is missing")]
    IncompleteSmtp(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub admin_password: String,
    pub port: u16,
    pub data_file: PathBuf,
    pub static_dir: PathBuf,
    pub smtp: Option<SmtpConfig>,
    pub draw_mode: DrawMode,
    pub max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let admin_password = get("ADMIN_PASSWORD").unwrap_or_else(|| {
            warn!("ADMIN_PASSWORD is not set, using the default password");
            DEFAULT_PASSWORD.to_string()
        });

        let port = parse_var::<u16>("PORT", get("PORT"))?.unwrap_or(DEFAULT_PORT);
        let max_attempts = parse_var::<u32>("SANTA_MAX_ATTEMPTS", get("SANTA_MAX_ATTEMPTS"))?
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "SANTA_MAX_ATTEMPTS",
                value: max_attempts.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let draw_mode = match get("SANTA_DRAW_MODE") {
            Some(value) => value.parse::<DrawMode>().map_err(|reason| ConfigError::Invalid {
                var: "SANTA_DRAW_MODE",
                value,
                reason,
            })?,
            None => DrawMode::default(),
        };

        let smtp = smtp_from(&get)?;

        Ok(Config {
            admin_password,
            port,
            data_file: get("DATA_FILE").unwrap_or_else(|| "participants.json".to_string()).into(),
            static_dir: get("STATIC_DIR").unwrap_or_else(|| "public".to_string()).into(),
            smtp,
            draw_mode,
            max_attempts,
        })
    }
}

fn smtp_from<G>(get: &G) -> Result<Option<SmtpConfig>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let host = get("EMAIL_HOST");
    let user = get("EMAIL_USER");
    let password = get("EMAIL_PASSWORD");
    if host.is_none() && user.is_none() && password.is_none() {
        return Ok(None);
    }

    let host = host.ok_or(ConfigError::IncompleteSmtp("EMAIL_HOST"))?;
    let user = user.ok_or(ConfigError::IncompleteSmtp("EMAIL_USER"))?;
    let password = password.ok_or(ConfigError::IncompleteSmtp("EMAIL_PASSWORD"))?;
    let port = parse_var::<u16>("EMAIL_PORT", get("EMAIL_PORT"))?.unwrap_or(DEFAULT_SMTP_PORT);
    let from = get("EMAIL_FROM").unwrap_or_else(|| user.clone());

    Ok(Some(SmtpConfig {
        host,
        port,
        user,
        password,
        from,
    }))
}

fn parse_var<T>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value: v,
            })
        })
        .transpose()
}
