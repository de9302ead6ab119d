//! Screen-space pixelation with colour quantisation.
//!
//! The stage runs after the 3D scene has been rendered into a colour buffer:
//!
//! ```text
//!   uv ──▶ snap to B×B device-pixel block ──▶ clamped sample
//!                                                   │
//!             c'' = (floor(c·L) / L)^γ · k  ◀───────┘
//! ```
//!
//! [`PixelationEffect::apply`] is the reference CPU implementation; the GPU
//! backend uploads [`PixelationEffect::uniforms`] and evaluates the same
//! formulas in `pixelate.wgsl`, so both paths share one parameter contract.

use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use image::RgbaImage;

/// Snapped coordinates land exactly on texel edges; nudge them into the texel
/// they start so rounding never picks the neighbouring block.
const TEXEL_EDGE_BIAS: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EffectError {
    #[error("pixel block size must be a positive finite number, got {0}")]
    InvalidBlockSize(f32),
    #[error("quantization levels must be greater than zero")]
    InvalidLevels,
    #[error("gamma exponent must be a positive finite number, got {0}")]
    InvalidGamma(f32),
    #[error("brightness multiplier must be a positive finite number, got {0}")]
    InvalidBrightness(f32),
    #[error("target resolution must be non-zero, got {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
}

/// Resolution-independent tuning of the effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelationStyle {
    pub block_size: f32,
    pub levels: u32,
    pub gamma: f32,
    pub brightness: f32,
}

impl PixelationStyle {
    /// 12-level palette with a mild contrast boost.
    pub const RETRO12: PixelationStyle = PixelationStyle {
        block_size: 4.0,
        levels: 12,
        gamma: 1.1,
        brightness: 1.0,
    };

    /// Coarser 8-level palette, steeper gamma, brightened to compensate.
    pub const RETRO8: PixelationStyle = PixelationStyle {
        block_size: 4.0,
        levels: 8,
        gamma: 1.2,
        brightness: 1.1,
    };
}

impl Default for PixelationStyle {
    fn default() -> Self {
        Self::RETRO12
    }
}

/// Named starting points for [`PixelationStyle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectPreset {
    #[default]
    Retro12,
    Retro8,
}

impl EffectPreset {
    pub const ALL: [EffectPreset; 2] = [EffectPreset::Retro12, EffectPreset::Retro8];

    pub fn style(self) -> PixelationStyle {
        match self {
            EffectPreset::Retro12 => PixelationStyle::RETRO12,
            EffectPreset::Retro8 => PixelationStyle::RETRO8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectPreset::Retro12 => "retro12",
            EffectPreset::Retro8 => "retro8",
        }
    }
}

impl fmt::Display for EffectPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectPreset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "retro12" | "12" => Ok(EffectPreset::Retro12),
            "retro8" | "8" => Ok(EffectPreset::Retro8),
            other => Err(format!(
                "unknown pixelation preset '{other}' (expected retro12 or retro8)"
            )),
        }
    }
}

/// Full parameter set of one effect instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelationParameters {
    pub block_size_pixels: f32,
    /// Framebuffer size in device pixels.
    pub target_resolution: (u32, u32),
    pub quantization_levels: u32,
    pub gamma_exponent: f32,
    pub brightness_multiplier: f32,
}

impl PixelationParameters {
    pub fn new(style: PixelationStyle, target_resolution: (u32, u32)) -> Self {
        Self {
            block_size_pixels: style.block_size,
            target_resolution,
            quantization_levels: style.levels,
            gamma_exponent: style.gamma,
            brightness_multiplier: style.brightness,
        }
    }

    pub fn validate(&self) -> Result<(), EffectError> {
        if !(self.block_size_pixels.is_finite() && self.block_size_pixels > 0.0) {
            return Err(EffectError::InvalidBlockSize(self.block_size_pixels));
        }
        if self.quantization_levels == 0 {
            return Err(EffectError::InvalidLevels);
        }
        if !(self.gamma_exponent.is_finite() && self.gamma_exponent > 0.0) {
            return Err(EffectError::InvalidGamma(self.gamma_exponent));
        }
        if !(self.brightness_multiplier.is_finite() && self.brightness_multiplier > 0.0) {
            return Err(EffectError::InvalidBrightness(self.brightness_multiplier));
        }
        validate_resolution(self.target_resolution)
    }
}

fn validate_resolution((width, height): (u32, u32)) -> Result<(), EffectError> {
    if width == 0 || height == 0 {
        return Err(EffectError::InvalidResolution { width, height });
    }
    Ok(())
}

/// Uniform block mirrored by `PixelParams` in `pixelate.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PixelationUniforms {
    pub resolution: [f32; 2],
    pub block_size: f32,
    pub levels: f32,
    pub gamma: f32,
    pub brightness: f32,
    pub _padding: [f32; 2],
}

/// Validated pixelation stage.
#[derive(Debug, Clone)]
pub struct PixelationEffect {
    params: PixelationParameters,
}

impl PixelationEffect {
    /// Rejects malformed parameters up front; a constructed effect never
    /// produces garbage because of its configuration.
    pub fn new(params: PixelationParameters) -> Result<Self, EffectError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &PixelationParameters {
        &self.params
    }

    /// Tracks a new framebuffer size. Returns `Ok(false)` when nothing changed.
    pub fn set_resolution(&mut self, width: u32, height: u32) -> Result<bool, EffectError> {
        validate_resolution((width, height))?;
        if self.params.target_resolution == (width, height) {
            return Ok(false);
        }
        self.params.target_resolution = (width, height);
        Ok(true)
    }

    /// Maps `uv` onto the lower corner of its pixel block.
    pub fn snap_uv(&self, uv: [f32; 2]) -> [f32; 2] {
        let (width, height) = self.params.target_resolution;
        [
            snap_coordinate(uv[0], width as f32, self.params.block_size_pixels),
            snap_coordinate(uv[1], height as f32, self.params.block_size_pixels),
        ]
    }

    /// Quantises and tone-adjusts one colour; alpha passes through.
    pub fn shade(&self, color: [f32; 4]) -> [f32; 4] {
        let levels = self.params.quantization_levels;
        let gamma = self.params.gamma_exponent;
        let brightness = self.params.brightness_multiplier;
        let tone = |channel: f32| adjust_channel(quantize_channel(channel, levels), gamma, brightness);
        [tone(color[0]), tone(color[1]), tone(color[2]), color[3]]
    }

    /// Runs the effect over `input`, producing a buffer of the same size.
    pub fn apply(&self, input: &ColorBuffer) -> ColorBuffer {
        let width = input.width();
        let height = input.height();
        let mut pixels = Vec::with_capacity(input.pixels().len());
        for y in 0..height {
            let v = (y as f32 + 0.5) / height as f32;
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32;
                let snapped = self.snap_uv([u, v]);
                pixels.push(self.shade(input.sample_clamped(snapped)));
            }
        }
        ColorBuffer {
            width,
            height,
            pixels,
        }
    }

    pub fn uniforms(&self) -> PixelationUniforms {
        let (width, height) = self.params.target_resolution;
        PixelationUniforms {
            resolution: [width as f32, height as f32],
            block_size: self.params.block_size_pixels,
            levels: self.params.quantization_levels as f32,
            gamma: self.params.gamma_exponent,
            brightness: self.params.brightness_multiplier,
            _padding: [0.0; 2],
        }
    }
}

/// `floor(uv · R / B) · B / R`, stable under repeated application.
pub fn snap_coordinate(uv: f32, resolution: f32, block_size: f32) -> f32 {
    let cells = resolution / block_size;
    let mut cell = (uv * cells).floor();
    if (cell + 1.0) / cells <= uv {
        cell += 1.0;
    } else if cell / cells > uv {
        cell -= 1.0;
    }
    cell / cells
}

/// Posterises one channel to `levels` steps.
pub fn quantize_channel(value: f32, levels: u32) -> f32 {
    let levels = levels.max(1) as f32;
    (value * levels).floor() / levels
}

/// Contrast curve applied after quantisation; not clamped.
pub fn adjust_channel(value: f32, gamma: f32, brightness: f32) -> f32 {
    value.max(0.0).powf(gamma) * brightness
}

/// Linear RGBA float image, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBuffer {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl ColorBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::solid(width, height, [0.0, 0.0, 0.0, 1.0])
    }

    pub fn solid(width: u32, height: u32, color: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Wraps existing pixel data; `None` if the length does not match.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_rgba8(image: &RgbaImage) -> Self {
        let pixels = image
            .pixels()
            .map(|pixel| {
                let [r, g, b, a] = pixel.0;
                [
                    r as f32 / 255.0,
                    g as f32 / 255.0,
                    b as f32 / 255.0,
                    a as f32 / 255.0,
                ]
            })
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    /// Converts to 8-bit RGBA; this is where out-of-range values get clamped.
    pub fn to_rgba8(&self) -> RgbaImage {
        let to_byte = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        let mut image = RgbaImage::new(self.width, self.height);
        for (target, source) in image.pixels_mut().zip(&self.pixels) {
            target.0 = [
                to_byte(source[0]),
                to_byte(source[1]),
                to_byte(source[2]),
                to_byte(source[3]),
            ];
        }
        image
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [f32; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.pixels[index] = color;
    }

    /// Nearest-texel fetch with coordinates clamped to `[0, 1]`.
    pub fn sample_clamped(&self, uv: [f32; 2]) -> [f32; 4] {
        if self.pixels.is_empty() {
            return [0.0; 4];
        }
        let texel = |coord: f32, extent: u32| {
            let scaled = (coord.clamp(0.0, 1.0) * extent as f32 + TEXEL_EDGE_BIAS).floor();
            (scaled.max(0.0) as u32).min(extent - 1)
        };
        let x = texel(uv[0], self.width);
        let y = texel(uv[1], self.height);
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}
