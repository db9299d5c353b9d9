//! Brute-force lockout configuration.
//!
//! # Environment Variables
//!
//! - `LOCKOUT_MAX_ATTEMPTS`: failed logins before a client is locked out (default: 5)
//! - `LOCKOUT_DURATION_SECONDS`: how long the lockout lasts (default: 600)
//! - `TRUST_FORWARDED_FOR`: key clients by the first `X-Forwarded-For` entry
//!   instead of the socket peer address (default: false)

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockoutConfig {
    pub max_attempts: u32,
    pub lockout_duration_secs: u64,
    pub trust_forwarded_for: bool,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_duration_secs: 600,
            trust_forwarded_for: false,
        }
    }
}

impl LockoutConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("LOCKOUT_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_attempts),
            lockout_duration_secs: std::env::var("LOCKOUT_DURATION_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lockout_duration_secs),
            trust_forwarded_for: std::env::var("TRUST_FORWARDED_FOR")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.trust_forwarded_for),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LockoutConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.lockout_duration_secs, 600);
        assert!(!config.trust_forwarded_for);
    }
}
