//! Core configuration for cadence-sequence-core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a sequence's scheduling behavior.
/// Keep this minimal; expand as needed without breaking API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Fallback step size when no unit constrains the next time increment
    /// (event-driven and async-call units have no predictable finish time).
    pub default_cycle_time: Duration,

    /// Maximum events retained per tick before older ones are dropped.
    pub max_events_per_tick: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_cycle_time: Duration::from_millis(500),
            max_events_per_tick: 1024,
        }
    }
}

impl Config {
    /// Parse a config from its JSON form, as stored by host tooling.
    pub fn from_json(s: &str) -> Result<Self, String> {
        serde_json::from_str(s).map_err(|e| format!("parse error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_preserves_fields() {
        let config = Config {
            default_cycle_time: Duration::from_millis(250),
            max_events_per_tick: 16,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back = Config::from_json(&json).unwrap();
        assert_eq!(back.default_cycle_time, Duration::from_millis(250));
        assert_eq!(back.max_events_per_tick, 16);
    }
}
