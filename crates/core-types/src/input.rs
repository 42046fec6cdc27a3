//! Typing speed and input mode settings shared by every fill operation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::DomainError;

/// Typing speed preset chosen for a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    Fast,
    #[default]
    Normal,
    Slow,
}

impl Speed {
    /// Lenient wire parsing: anything unknown falls back to `Normal`.
    pub fn from_wire(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Speed::Fast => "fast",
            Speed::Normal => "normal",
            Speed::Slow => "slow",
        }
    }

    pub fn profile(self) -> SpeedProfile {
        match self {
            Speed::Fast => SpeedProfile {
                char_delay_ms: (5, 15),
                field_delay_ms: (100, 200),
                chunk_size: 10,
                between_records_ms: 100,
            },
            Speed::Normal => SpeedProfile {
                char_delay_ms: (20, 60),
                field_delay_ms: (200, 400),
                chunk_size: 3,
                between_records_ms: 200,
            },
            Speed::Slow => SpeedProfile {
                char_delay_ms: (50, 120),
                field_delay_ms: (400, 700),
                chunk_size: 1,
                between_records_ms: 400,
            },
        }
    }
}

impl FromStr for Speed {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Speed::Fast),
            "normal" => Ok(Speed::Normal),
            "slow" => Ok(Speed::Slow),
            other => Err(DomainError::UnknownSpeed(other.to_string())),
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Speed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Speed::from_wire(&raw))
    }
}

/// Delay ranges (inclusive, milliseconds) derived from a [`Speed`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SpeedProfile {
    pub char_delay_ms: (u64, u64),
    pub field_delay_ms: (u64, u64),
    /// Characters appended per simulated keystroke burst in human mode.
    pub chunk_size: usize,
    pub between_records_ms: u64,
}

/// Input settings for one run: set once, read by every fill operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    #[serde(default)]
    pub speed: Speed,
    #[serde(default = "default_human_mode")]
    pub human_mode: bool,
}

fn default_human_mode() -> bool {
    true
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            speed: Speed::Normal,
            human_mode: true,
        }
    }
}

impl InputConfig {
    pub fn profile(&self) -> SpeedProfile {
        self.speed.profile()
    }

    /// Overlay the fields present in `patch`.
    pub fn merge(&mut self, patch: &InputConfigPatch) {
        if let Some(speed) = patch.speed {
            self.speed = speed;
        }
        if let Some(human_mode) = patch.human_mode {
            self.human_mode = human_mode;
        }
    }
}

/// Partial input settings carried on bridge payloads.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<Speed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_mode: Option<bool>,
}

impl From<InputConfig> for InputConfigPatch {
    fn from(config: InputConfig) -> Self {
        Self {
            speed: Some(config.speed),
            human_mode: Some(config.human_mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_speed_on_the_wire_is_normal() {
        let config: InputConfig = serde_json::from_str(r#"{"speed":"turbo"}"#).unwrap();
        assert_eq!(config.speed, Speed::Normal);
        assert!(config.human_mode);
    }

    #[test]
    fn merge_only_touches_present_fields() {
        let mut config = InputConfig::default();
        config.merge(&InputConfigPatch {
            speed: Some(Speed::Slow),
            human_mode: None,
        });
        assert_eq!(config.speed, Speed::Slow);
        assert!(config.human_mode);
    }

    #[test]
    fn profiles_match_presets() {
        assert_eq!(Speed::Fast.profile().chunk_size, 10);
        assert_eq!(Speed::Normal.profile().char_delay_ms, (20, 60));
        assert_eq!(Speed::Slow.profile().between_records_ms, 400);
    }
}
