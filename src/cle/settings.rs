use std::env;
use std::str::FromStr;

use thiserror::Error;

pub const MAX_ATTEMPTS_VAR: &str = "CLE_MAX_ATTEMPTS";
pub const DEFAULT_PAGE_SIZE_VAR: &str = "CLE_DEFAULT_PAGE_SIZE";
pub const MAX_PAGE_SIZE_VAR: &str = "CLE_MAX_PAGE_SIZE";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Default page size {0} exceeds max page size {1}")]
    PageSizes(usize, usize),
}

/// Tunables for the engine and the history reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// How many times a transaction is validated and applied before a
    /// persistent version conflict is reported
    pub max_attempts: u32,
    /// Page size used when a caller asks for a page size of 0
    pub default_page_size: usize,
    /// Larger page sizes are clamped to this
    pub max_page_size: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl LedgerSettings {
    /// Reads overrides from the environment, falling back to the defaults
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let defaults = Self::default();

        let settings = Self {
            max_attempts: read(&lookup, MAX_ATTEMPTS_VAR, defaults.max_attempts)?,
            default_page_size: read(&lookup, DEFAULT_PAGE_SIZE_VAR, defaults.default_page_size)?,
            max_page_size: read(&lookup, MAX_PAGE_SIZE_VAR, defaults.max_page_size)?,
        };

        if settings.default_page_size > settings.max_page_size {
            return Err(SettingsError::PageSizes(
                settings.default_page_size,
                settings.max_page_size,
            ));
        }

        Ok(settings)
    }
}

fn read<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, SettingsError>
where
    T: FromStr + PartialEq + Default,
{
    let raw = match lookup(key) {
        Some(raw) => raw,
        None => return Ok(default),
    };

    let value: T = raw
        .trim()
        .parse()
        .map_err(|_| SettingsError::Invalid(key, raw.clone()))?;

    if value == T::default() {
        return Err(SettingsError::Zero(key));
    }

    Ok(value)
}
