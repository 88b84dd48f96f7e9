pub mod scanner_prefs;
pub mod store_config;

use std::env;
use std::str::FromStr;

/// Reads `key` from the environment, falling back to `default` when the
/// variable is unset or does not parse.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse().ok())
        .unwrap_or(default)
}
