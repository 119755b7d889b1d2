//! Startup configuration
//!
//! Loaded once from a YAML document before the window is created and never
//! changed afterwards. JSON is a subset of YAML, so a JSON config file loads
//! as well.
use crate::um_error::UmError;
use log::info;
use serde::{Deserialize, Deserializer, Serialize};
use std::{path::Path, str::FromStr};

const SAMPLE_COUNTS: [u32; 6] = [0, 1, 2, 4, 8, 16];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// Number of rooms the map generator is asked for
    #[must_use]
    pub const fn room_count(self) -> u32 {
        match self {
            Self::Easy => 10,
            Self::Normal => 20,
            Self::Hard => 25,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct General {
    pub difficulty: Difficulty,
    pub map_width: u32,
    pub map_height: u32,
}

impl Default for General {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            map_width: 80,
            map_height: 60,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Graphics {
    pub video_mode: String,
    #[serde(deserialize_with = "bool_or_string")]
    pub fullscreen: bool,
    /// Multisample count, 0 and 1 both meaning none
    #[serde(alias = "MSAA")]
    pub msaa: u32,
    pub font: String,
}

impl Default for Graphics {
    fn default() -> Self {
        Self {
            video_mode: "800x600".to_string(),
            fullscreen: false,
            msaa: 1,
            font: "DejaVuSerif".to_string(),
        }
    }
}

impl Graphics {
    /// Window dimensions from `video_mode`
    ///
    /// # Errors
    /// May return `UmError`
    pub fn dimensions(&self) -> Result<[u32; 2], UmError> {
        parse_video_mode(&self.video_mode)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub graphics: Graphics,
}

impl Config {
    /// Loads and validates a config file
    ///
    /// # Errors
    /// May return `UmError`
    pub fn load(path: &Path) -> Result<Self, UmError> {
        if !path.exists() {
            return Err(UmError::file_not_found(
                format!("config file '{}' not found", path.display()),
                "Config::load",
            ));
        }
        let text = std::fs::read_to_string(path)?;
        let config = text.parse::<Self>()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Checks values that the type system can not
    ///
    /// # Errors
    /// May return `UmError`
    pub fn validate(&self) -> Result<(), UmError> {
        if self.general.map_width == 0 || self.general.map_height == 0 {
            return Err(UmError::invalid_parameter(
                "bad map size argument",
                "Config::validate",
            ));
        }
        self.graphics.dimensions()?;
        if !SAMPLE_COUNTS.contains(&self.graphics.msaa) {
            return Err(UmError::invalid_parameter(
                format!("bad MSAA argument '{}'", self.graphics.msaa),
                "Config::validate",
            ));
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = UmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

/// Parses `"WxH"` into `[width, height]`
///
/// # Errors
/// May return `UmError`
pub fn parse_video_mode(mode: &str) -> Result<[u32; 2], UmError> {
    let bad = || {
        UmError::invalid_parameter(
            format!("bad video mode argument '{mode}'"),
            "parse_video_mode",
        )
    };
    let (w, h) = mode.split_once('x').ok_or_else(bad)?;
    let w = w.trim().parse::<u32>().map_err(|_| bad())?;
    let h = h.trim().parse::<u32>().map_err(|_| bad())?;
    if w == 0 || h == 0 {
        return Err(bad());
    }
    Ok([w, h])
}

/// Older config files store booleans as the strings "true" and "false"
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s == "true",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::um_error::ErrorKind;

    #[test]
    fn empty_document_gives_defaults() {
        let config: Config = "{}".parse().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.graphics.dimensions().unwrap(), [800, 600]);
        assert_eq!(config.general.difficulty.room_count(), 20);
    }

    #[test]
    fn json_file_format_loads() {
        let json = r#"{
            "general": { "difficulty": "hard",
                         "map_width": 40, "map_height": 30 },
            "graphics": { "video_mode": "1280x720", "fullscreen": "true",
                          "MSAA": 4, "font": "Mono" }
        }"#;
        let config: Config = json.parse().unwrap();
        assert_eq!(config.general.difficulty, Difficulty::Hard);
        assert_eq!(config.general.map_width, 40);
        assert!(config.graphics.fullscreen);
        assert_eq!(config.graphics.msaa, 4);
        assert_eq!(config.graphics.font, "Mono");
        assert_eq!(config.graphics.dimensions().unwrap(), [1280, 720]);
    }

    #[test]
    fn bad_values_are_invalid_parameter() {
        for text in [
            "graphics: { video_mode: '1024' }",
            "graphics: { video_mode: '0x600' }",
            "graphics: { msaa: 3 }",
            "general: { map_width: 0 }",
        ] {
            let e = text.parse::<Config>().unwrap_err();
            assert_eq!(e.kind(), ErrorKind::InvalidParameter, "{text}");
        }
    }

    #[test]
    fn msaa_zero_turns_multisampling_off() {
        let config: Config = "graphics: { msaa: 0 }".parse().unwrap();
        assert_eq!(config.graphics.msaa, 0);
        let e = "graphics: { msaa: 32 }".parse::<Config>().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn unknown_difficulty_is_a_parse_error() {
        let text = "general: { difficulty: brutal }";
        let e = text.parse::<Config>().unwrap_err();
        assert!(matches!(e, UmError::SerdeYamlError(_)));
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let e = Config::load(Path::new("no/such/config.yaml")).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::FileNotFound);
    }
}
