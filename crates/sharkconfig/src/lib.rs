use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Upper bound on the vertical bob of any motion profile, in world units.
pub const MAX_Y_AMPLITUDE: f64 = 0.3;
/// Upper bound on the forward/back drift of any motion profile, in world units.
pub const MAX_Z_AMPLITUDE: f64 = 0.2;
/// Slowest non-zero frame cap (one frame every 100 seconds).
pub const MIN_FPS: f32 = 0.01;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// On-disk configuration. Every setting is optional; unset values fall back
/// to the renderer's built-in defaults and CLI flags override both.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SharkConfig {
    pub version: u32,
    #[serde(default)]
    pub effect: EffectSection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub view: ViewSection,
    #[serde(default)]
    pub motion: MotionSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    Retro12,
    Retro8,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EffectSection {
    pub preset: Option<PresetName>,
    pub pixel_size: Option<f32>,
    pub levels: Option<u32>,
    pub gamma: Option<f32>,
    pub brightness: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelSection {
    /// Relative paths are resolved against the directory of the config file.
    pub path: Option<PathBuf>,
    pub scale: Option<f32>,
    pub yaw_degrees: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ViewSection {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `#RRGGBB` or a palette name.
    pub color: Option<String>,
    pub background: Option<String>,
    /// 0 disables the cap.
    pub fps: Option<f32>,
    /// Renders a single still frame at this point in the animation.
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing
    )]
    pub still_time: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MotionSection {
    #[serde(default)]
    pub loaded: MotionOverride,
    #[serde(default)]
    pub fallback: MotionOverride,
}

/// Partial override of one motion profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct MotionOverride {
    pub rotation_rate: Option<f64>,
    pub y_frequency: Option<f64>,
    pub y_amplitude: Option<f64>,
    pub z_frequency: Option<f64>,
    pub z_amplitude: Option<f64>,
}

impl MotionOverride {
    pub fn is_empty(&self) -> bool {
        *self == MotionOverride::default()
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl SharkConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SharkConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let effect = &self.effect;
        positive("effect.pixel_size", effect.pixel_size)?;
        positive("effect.gamma", effect.gamma)?;
        positive("effect.brightness", effect.brightness)?;
        if effect.levels == Some(0) {
            return Err(ConfigError::Invalid(
                "effect.levels must be greater than zero".into(),
            ));
        }

        positive("model.scale", self.model.scale)?;
        if let Some(yaw) = self.model.yaw_degrees {
            if !yaw.is_finite() {
                return Err(ConfigError::Invalid("model.yaw_degrees must be finite".into()));
            }
        }
        if let Some(path) = &self.model.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("model.path may not be empty".into()));
            }
        }

        let view = &self.view;
        if view.width == Some(0) || view.height == Some(0) {
            return Err(ConfigError::Invalid(
                "view.width and view.height must be greater than zero".into(),
            ));
        }
        for (key, value) in [("view.color", &view.color), ("view.background", &view.background)] {
            if value.as_deref().is_some_and(|raw| raw.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("{key} may not be empty")));
            }
        }
        if let Some(fps) = view.fps {
            if !fps.is_finite() || fps < 0.0 || (fps > 0.0 && fps < MIN_FPS) {
                return Err(ConfigError::Invalid(format!(
                    "view.fps must be 0 (uncapped) or at least {MIN_FPS}"
                )));
            }
        }

        validate_motion("motion.loaded", &self.motion.loaded)?;
        validate_motion("motion.fallback", &self.motion.fallback)?;
        Ok(())
    }
}

fn positive(key: &str, value: Option<f32>) -> Result<(), ConfigError> {
    match value {
        Some(value) if !(value.is_finite() && value > 0.0) => Err(ConfigError::Invalid(format!(
            "{key} must be a positive number, got {value}"
        ))),
        _ => Ok(()),
    }
}

fn validate_motion(section: &str, motion: &MotionOverride) -> Result<(), ConfigError> {
    if let Some(rate) = motion.rotation_rate {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{section}.rotation_rate must be greater than zero"
            )));
        }
    }

    for (key, frequency) in [
        ("y_frequency", motion.y_frequency),
        ("z_frequency", motion.z_frequency),
    ] {
        if let Some(frequency) = frequency {
            if !frequency.is_finite() || frequency < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{section}.{key} must be >= 0"
                )));
            }
        }
    }

    for (key, amplitude, max) in [
        ("y_amplitude", motion.y_amplitude, MAX_Y_AMPLITUDE),
        ("z_amplitude", motion.z_amplitude, MAX_Z_AMPLITUDE),
    ] {
        if let Some(amplitude) = amplitude {
            if !(0.0..=max).contains(&amplitude) {
                return Err(ConfigError::Invalid(format!(
                    "{section}.{key} must be between 0 and {max}, got {amplitude}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1

[effect]
preset = "retro8"
pixel_size = 6

[model]
path = "models/great_white.glb"
scale = 4.5
yaw_degrees = 90

[view]
width = 960
height = 540
color = "#FF69B4"
background = "#101010"
fps = 30
still_time = "2s 500ms"

[motion.loaded]
rotation_rate = 0.45
y_amplitude = 0.25

[motion.fallback]
z_amplitude = 0.05
"##;

    #[test]
    fn parses_sample_config() {
        let config = SharkConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.effect.preset, Some(PresetName::Retro8));
        assert_eq!(config.effect.pixel_size, Some(6.0));
        assert_eq!(config.effect.levels, None);
        assert_eq!(
            config.model.path.as_deref(),
            Some(std::path::Path::new("models/great_white.glb"))
        );
        assert_eq!(config.view.color.as_deref(), Some("#FF69B4"));
        assert_eq!(config.view.still_time, Some(Duration::from_millis(2500)));
        assert_eq!(config.motion.loaded.rotation_rate, Some(0.45));
        assert!(config.motion.fallback.rotation_rate.is_none());
        assert!(!config.motion.fallback.is_empty());
    }

    #[test]
    fn sections_are_optional() {
        let config = SharkConfig::from_toml_str("version = 1\n").expect("parse config");
        assert!(config.effect.preset.is_none());
        assert!(config.model.path.is_none());
        assert!(config.view.fps.is_none());
        assert!(config.motion.loaded.is_empty());
    }

    #[test]
    fn numeric_still_time_is_seconds() {
        let config = SharkConfig::from_toml_str("version = 1\n[view]\nstill_time = 1.25\n")
            .expect("parse config");
        assert_eq!(config.view.still_time, Some(Duration::from_secs_f64(1.25)));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = SharkConfig::from_toml_str("version = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_preset() {
        let err = SharkConfig::from_toml_str("version = 1\n[effect]\npreset = \"retro4\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_non_positive_effect_values() {
        for body in [
            "[effect]\npixel_size = 0",
            "[effect]\nlevels = 0",
            "[effect]\ngamma = -1.0",
            "[effect]\nbrightness = 0.0",
        ] {
            let err = SharkConfig::from_toml_str(&format!("version = 1\n{body}\n")).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{body}");
        }
    }

    #[test]
    fn enforces_motion_amplitude_bounds() {
        let err = SharkConfig::from_toml_str("version = 1\n[motion.loaded]\ny_amplitude = 0.5\n")
            .unwrap_err();
        assert!(err.to_string().contains("motion.loaded.y_amplitude"));

        let err = SharkConfig::from_toml_str("version = 1\n[motion.fallback]\nz_amplitude = -0.1\n")
            .unwrap_err();
        assert!(err.to_string().contains("motion.fallback.z_amplitude"));

        let err = SharkConfig::from_toml_str("version = 1\n[motion.loaded]\nrotation_rate = 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        SharkConfig::from_toml_str("version = 1\n[motion.loaded]\ny_amplitude = 0.3\nz_amplitude = 0.2\n")
            .expect("bounds are inclusive");
    }

    #[test]
    fn rejects_fps_caps_below_the_minimum() {
        for body in ["fps = -1", "fps = 1e-30", "fps = 0.001"] {
            let err = SharkConfig::from_toml_str(&format!("version = 1\n[view]\n{body}\n"))
                .unwrap_err();
            assert!(err.to_string().contains("view.fps"), "{body}");
        }
        for body in ["fps = 0", "fps = 0.01", "fps = 144"] {
            SharkConfig::from_toml_str(&format!("version = 1\n[view]\n{body}\n"))
                .expect(body);
        }
    }

    #[test]
    fn rejects_zero_window_size_and_blank_colors() {
        let err = SharkConfig::from_toml_str("version = 1\n[view]\nwidth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = SharkConfig::from_toml_str("version = 1\n[view]\ncolor = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("view.color"));
    }
}
