use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::ConfigError;

pub(crate) fn parse_u64_env(key: &str, default: u64) -> Result<u64, ConfigError> {
    match optional_trimmed_env(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

pub(crate) fn parse_millis_env(key: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    let millis = parse_u64_env(key, default_ms)?;
    if millis == 0 {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{key} must be greater than 0"
        )));
    }
    Ok(Duration::from_millis(millis))
}

pub(crate) fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match optional_trimmed_env(key) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool(key.to_string())),
        },
        None => Ok(default),
    }
}

pub(crate) fn parse_enum_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr<Err = String>,
{
    match optional_trimmed_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|err| ConfigError::InvalidConfiguration(format!("{key}: {err}"))),
        None => Ok(default),
    }
}

pub(crate) fn parse_http_url_env(key: &str, default: &str) -> Result<String, ConfigError> {
    let url = optional_trimmed_env(key).unwrap_or_else(|| default.to_string());
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{key} must start with http:// or https://"
        )));
    }
    Ok(url)
}

pub(crate) fn optional_path_env(key: &str) -> Option<PathBuf> {
    optional_trimmed_env(key).map(PathBuf::from)
}

pub(crate) fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
