use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::EffectPreset;

#[derive(Parser, Debug)]
#[command(
    name = "pixelshark",
    author,
    version,
    about = "Retro pixel-art shark viewer",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// glTF/GLB shark model to display instead of the procedural one.
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Shark colour: `#RRGGBB` or a palette name (see `pixelshark palette`).
    #[arg(long, value_name = "COLOR")]
    pub color: Option<String>,

    #[command(flatten)]
    pub effect: EffectArgs,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Freeze the animation at this timestamp instead of animating.
    #[arg(long, value_name = "SECONDS")]
    pub still_time: Option<f64>,

    /// Configuration file; defaults to `config.toml` in the config directory.
    #[arg(long, value_name = "FILE", env = "PIXELSHARK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Pixelation overrides shared by the viewer and the `pixelate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct EffectArgs {
    /// Effect preset: `retro12` or `retro8`.
    #[arg(long, value_name = "NAME", value_parser = parse_preset)]
    pub preset: Option<EffectPreset>,

    /// Edge length of one retro pixel, in device pixels.
    #[arg(long, value_name = "PIXELS")]
    pub pixel_size: Option<f32>,

    /// Colour levels per channel.
    #[arg(long, value_name = "N")]
    pub levels: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply the pixelation effect to an image file and exit.
    Pixelate(PixelateArgs),
    /// List the shark palette and the keys that select each colour.
    Palette,
    /// Print the resolved configuration directory and file.
    Paths,
}

#[derive(Parser, Debug)]
pub struct PixelateArgs {
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
    #[command(flatten)]
    pub effect: EffectArgs,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_preset(value: &str) -> Result<EffectPreset, String> {
    value.parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT, e.g. 1280x720".to_string())?;
    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height in size specification".to_string())?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }
    Ok((width, height))
}
