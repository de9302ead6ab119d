use std::fmt;
use std::path::PathBuf;

use crate::animation::MotionProfile;
use crate::effect::PixelationStyle;
use crate::runtime::RenderPolicy;

/// Linear RGB colour with components nominally in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Builds a colour from a packed `0xRRGGBB` value.
    pub fn from_u32(packed: u32) -> Self {
        let channel = |shift: u32| ((packed >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    /// Parses `#RRGGBB`, `RRGGBB`, or the short `#RGB` form.
    pub fn from_hex(value: &str) -> Result<Self, ColorParseError> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        // `from_str_radix` alone would also take a leading sign.
        if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(ColorParseError::Malformed(value.to_string()));
        }
        let expanded = match digits.len() {
            6 => digits.to_string(),
            3 => digits.chars().flat_map(|ch| [ch, ch]).collect(),
            _ => return Err(ColorParseError::Malformed(value.to_string())),
        };
        let packed = u32::from_str_radix(&expanded, 16)
            .map_err(|_| ColorParseError::Malformed(value.to_string()))?;
        Ok(Self::from_u32(packed))
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Packs the colour back into `0xRRGGBB`, clamping out-of-range channels.
    pub fn to_u32(self) -> u32 {
        let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.to_u32())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("'{0}' is not a hex colour (expected #RRGGBB) or a palette name")]
    Malformed(String),
}

/// Logical viewport plus the device pixel ratio of the display it lives on.
///
/// `width`/`height` are logical pixels; [`Viewport::device_size`] yields the
/// framebuffer size the pixelation pass must track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Converts a physical framebuffer size reported by the windowing system.
    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        Self::new(width as f64 / scale, height as f64 / scale, scale)
    }

    /// True when the viewport can back a framebuffer (minimised windows report zero).
    pub fn is_drawable(&self) -> bool {
        let (width, height) = self.device_size();
        self.device_pixel_ratio > 0.0 && width > 0 && height > 0
    }

    /// Framebuffer size in device pixels.
    pub fn device_size(&self) -> (u32, u32) {
        let scale = |value: f64| {
            let scaled = (value * self.device_pixel_ratio).round();
            if scaled.is_finite() && scaled > 0.0 {
                scaled.min(u32::MAX as f64) as u32
            } else {
                0
            }
        };
        (scale(self.width), scale(self.height))
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            (self.width / self.height) as f32
        } else {
            1.0
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags and the config file: which asset to load,
/// how the pixelation stage is tuned, and how the model moves.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in logical pixels.
    pub surface_size: (u32, u32),
    /// Asset handed to the model provider; `None` keeps the fallback shark.
    pub model_path: Option<PathBuf>,
    /// Uniform scale applied to a loaded model.
    pub model_scale: f32,
    /// Base yaw (radians) applied to a loaded model before animation.
    pub model_yaw: f32,
    /// Pixelation and colour quantisation tuning.
    pub pixelation: PixelationStyle,
    /// Initial display colour for every colourable surface.
    pub color: Rgb,
    /// Clear colour behind the model.
    pub background: Rgb,
    /// Motion law once the asset is displayed.
    pub loaded_motion: MotionProfile,
    /// Motion law while the fallback geometry is displayed.
    pub fallback_motion: MotionProfile,
    /// Animate continuously or hold a still timestamp.
    pub policy: RenderPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            model_path: None,
            model_scale: 5.0,
            model_yaw: std::f32::consts::PI,
            pixelation: PixelationStyle::default(),
            color: Rgb::from_u32(0x4A90E2),
            background: Rgb::WHITE,
            loaded_motion: MotionProfile::LOADED,
            fallback_motion: MotionProfile::FALLBACK,
            policy: RenderPolicy::default(),
        }
    }
}
