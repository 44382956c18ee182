//! Environment lookup helpers shared by every binary in the workspace.
//!
//! Settings are read through a lookup function so they can be built from the
//! process environment in production and from a plain map in tests.

use std::str::FromStr;

use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set or is blank.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// A variable is set but cannot be parsed.
    #[error("Invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

/// Read a required, non-blank variable.
pub fn required_var<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_var(lookup, name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

/// Read an optional variable. Blank values count as unset.
pub fn optional_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read an optional variable, falling back to `default` when unset or blank.
pub fn parsed_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_var(lookup, name) {
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::Invalid {
            name: name.to_string(),
            value: value.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
