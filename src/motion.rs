//! Reduced-motion preference.
//!
//! Terminals have no accessibility media query, so the preference comes from
//! the command line, the config file, or the environment, and can be toggled
//! while the pipeline runs.

use std::env;

/// Environment variables that request reduced motion.
const ENV_VARS: &[&str] = &["DECOMP_REDUCED_MOTION", "NO_MOTION"];

/// Current reduced-motion value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReducedMotion(bool);

impl ReducedMotion {
    pub fn new(on: bool) -> Self {
        Self(on)
    }

    /// Combines the CLI flag, the config key and the environment.
    pub fn detect(cli_flag: bool, config_value: bool) -> Self {
        let from_env = ENV_VARS
            .iter()
            .any(|name| env::var(name).is_ok_and(|v| env_truthy(&v)));
        Self::new(cli_flag || config_value || from_env)
    }

    pub fn get(self) -> bool {
        self.0
    }

    /// Updates the value. Returns true when it changed.
    pub fn set(&mut self, on: bool) -> bool {
        let changed = self.0 != on;
        self.0 = on;
        changed
    }
}

fn env_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}
