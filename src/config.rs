//! Interpreter quirks and frontend settings, read from a TOML file.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Which register the `8XY6` / `8XYE` shifts read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftSource {
    /// shift VX in place
    #[default]
    Vx,
    /// COSMAC VIP behaviour: VX = VY shifted
    Vy,
}

/// What happens to sprite rows that fall below row 31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpriteRows {
    #[default]
    Clip,
    /// row index modulo 32
    Wrap,
}

/// Behaviours that differ between interpreters. The defaults keep VX-only
/// shifts and clip sprites at the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Quirks {
    pub shift_source: ShiftSource,
    /// store the masked bit (0 or 0x80) in VF after a left shift instead of 0/1
    pub raw_shift_flag: bool,
    pub sprite_rows: SpriteRows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keymap {
    /// left-hand block of a qwerty keyboard: 1234/qwer/asdf/zxcv
    #[default]
    Conventional,
    /// '0'-'9' and 'a'-'f' map to themselves
    Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// how often the frame loop calls step; timers tick once per step
    pub steps_per_second: f64,
    pub keymap: Keymap,
    pub quirks: Quirks,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steps_per_second: 60.0,
            keymap: Keymap::default(),
            quirks: Quirks::default(),
        }
    }
}

impl Config {
    /// Reads a config file. A missing file gives the defaults; a malformed one
    /// is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(data) => Ok(toml::from_str(&data)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            steps_per_second = 500.0

            [quirks]
            shift_source = "vy"
            "#,
        )
        .unwrap();
        assert_eq!(config.steps_per_second, 500.0);
        assert_eq!(config.keymap, Keymap::Conventional);
        assert_eq!(config.quirks.shift_source, ShiftSource::Vy);
        assert!(!config.quirks.raw_shift_flag);
        assert_eq!(config.quirks.sprite_rows, SpriteRows::Clip);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load("/definitely/not/here/chip8-vm.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = Config::default();
        config.quirks.sprite_rows = SpriteRows::Wrap;
        config.keymap = Keymap::Literal;
        let text = config.to_toml().unwrap();
        assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
    }

    #[test]
    fn test_bad_value_is_error() {
        assert!(toml::from_str::<Config>("keymap = \"dvorak\"").is_err());
    }
}
