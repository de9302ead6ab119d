//! Merges CLI flags, the config file and built-in defaults (in that order of
//! precedence) into a [`RendererConfig`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use renderer::{
    parse_color, EffectPreset, MotionProfile, PixelationParameters, PixelationStyle, RenderPolicy,
    RendererConfig, MIN_TARGET_FPS,
};
use sharkconfig::{MotionOverride, PresetName, SharkConfig};

use crate::cli::{EffectArgs, RunArgs};
use crate::paths::AppPaths;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SharkConfig,
    pub path: PathBuf,
}

impl LoadedConfig {
    fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Reads `explicit` or, failing that, the default config file if present.
/// An explicitly requested file must exist.
pub fn load_config(paths: &AppPaths, explicit: Option<&Path>) -> Result<Option<LoadedConfig>> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (paths.config_file(), false),
    };

    if !path.exists() {
        if required {
            bail!("config file {} does not exist", path.display());
        }
        tracing::debug!(path = %path.display(), "no config file; using built-in defaults");
        return Ok(None);
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = SharkConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(Some(LoadedConfig { config, path }))
}

pub fn map_preset(name: PresetName) -> EffectPreset {
    match name {
        PresetName::Retro12 => EffectPreset::Retro12,
        PresetName::Retro8 => EffectPreset::Retro8,
    }
}

/// Preset first, then individual overrides. Gamma and brightness are only
/// configurable through the file.
pub fn effect_style(args: &EffectArgs, config: Option<&SharkConfig>) -> PixelationStyle {
    let section = config.map(|config| &config.effect);
    let preset = args
        .preset
        .or_else(|| section.and_then(|effect| effect.preset).map(map_preset))
        .unwrap_or_default();

    let mut style = preset.style();
    if let Some(size) = args
        .pixel_size
        .or_else(|| section.and_then(|effect| effect.pixel_size))
    {
        style.block_size = size;
    }
    if let Some(levels) = args.levels.or_else(|| section.and_then(|effect| effect.levels)) {
        style.levels = levels;
    }
    if let Some(effect) = section {
        if let Some(gamma) = effect.gamma {
            style.gamma = gamma;
        }
        if let Some(brightness) = effect.brightness {
            style.brightness = brightness;
        }
    }
    style
}

pub fn motion_profile(base: MotionProfile, overrides: &MotionOverride) -> MotionProfile {
    MotionProfile {
        rotation_rate: overrides.rotation_rate.unwrap_or(base.rotation_rate),
        y_frequency: overrides.y_frequency.unwrap_or(base.y_frequency),
        y_amplitude: overrides.y_amplitude.unwrap_or(base.y_amplitude),
        z_frequency: overrides.z_frequency.unwrap_or(base.z_frequency),
        z_amplitude: overrides.z_amplitude.unwrap_or(base.z_amplitude),
    }
}

pub fn renderer_config(args: &RunArgs, loaded: Option<&LoadedConfig>) -> Result<RendererConfig> {
    let mut config = RendererConfig::default();
    let file = loaded.map(|loaded| &loaded.config);

    config.pixelation = effect_style(&args.effect, file);

    if let Some(size) = args.size {
        config.surface_size = size;
    } else if let Some(view) = file.map(|file| &file.view) {
        config.surface_size = (
            view.width.unwrap_or(config.surface_size.0),
            view.height.unwrap_or(config.surface_size.1),
        );
    }
    PixelationParameters::new(config.pixelation, config.surface_size)
        .validate()
        .context("invalid pixelation settings")?;

    let file_color = file.and_then(|file| file.view.color.as_deref());
    if let Some(raw) = args.color.as_deref().or(file_color) {
        config.color = parse_color(raw).with_context(|| format!("invalid shark colour '{raw}'"))?;
    }
    if let Some(raw) = file.and_then(|file| file.view.background.as_deref()) {
        config.background =
            parse_color(raw).with_context(|| format!("invalid background colour '{raw}'"))?;
    }

    config.model_path = match (&args.model, loaded) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(loaded)) => loaded.config.model.path.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                loaded.base_dir().join(path)
            }
        }),
        (None, None) => None,
    };
    if let Some(model) = file.map(|file| &file.model) {
        if let Some(scale) = model.scale {
            config.model_scale = scale;
        }
        if let Some(yaw) = model.yaw_degrees {
            config.model_yaw = yaw.to_radians();
        }
    }

    if let Some(file) = file {
        config.loaded_motion = motion_profile(config.loaded_motion, &file.motion.loaded);
        config.fallback_motion = motion_profile(config.fallback_motion, &file.motion.fallback);
    }

    config.policy = render_policy(args, file)?;
    Ok(config)
}

fn render_policy(args: &RunArgs, file: Option<&SharkConfig>) -> Result<RenderPolicy> {
    let view = file.map(|file| &file.view);
    let still_time = args.still_time.or_else(|| {
        view.and_then(|view| view.still_time)
            .map(|time| time.as_secs_f64())
    });
    if let Some(time) = still_time {
        if !time.is_finite() || time < 0.0 {
            bail!("still time must be a non-negative number of seconds");
        }
        return Ok(RenderPolicy::Still { time });
    }

    let fps = args.fps.or_else(|| view.and_then(|view| view.fps));
    if let Some(fps) = fps {
        if !fps.is_finite() || fps < 0.0 || (fps > 0.0 && fps < MIN_TARGET_FPS) {
            bail!("fps must be 0 (uncapped) or at least {MIN_TARGET_FPS}");
        }
    }
    Ok(RenderPolicy::Animate {
        target_fps: fps.filter(|fps| *fps > 0.0),
    })
}
