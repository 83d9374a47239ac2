use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Retrieves an environment variable as a string, falling back to `default` when unset.
pub fn get_env_string(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

/// Parses an environment variable into `T`.
///
/// Unset variables yield `default`; values that fail to parse are logged and also
/// yield `default`.
pub fn get_env_parsed<T: FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring unparseable value {:?} for {}", raw, var);
                default
            }
        },
        Err(_) => default,
    }
}

/// Reads a whole number of seconds from an environment variable.
pub fn get_env_secs(var: &str, default: Duration) -> Duration {
    Duration::from_secs(get_env_parsed(var, default.as_secs()))
}
