use anyhow::{Context, Result};
use image::RgbaImage;
use renderer::{ColorBuffer, PixelationEffect, PixelationParameters, PixelationStyle};

use crate::bindings::effect_style;
use crate::cli::PixelateArgs;

/// Offline conversion through the CPU version of the effect; no GPU needed.
pub fn run_pixelate(args: PixelateArgs) -> Result<()> {
    let input = image::open(&args.input)
        .with_context(|| format!("failed to open image {}", args.input.display()))?
        .to_rgba8();
    let style = effect_style(&args.effect, None);
    let output = pixelate_image(&input, style)?;
    output
        .save(&args.output)
        .with_context(|| format!("failed to write image {}", args.output.display()))?;
    tracing::info!(
        input = %args.input.display(),
        output = %args.output.display(),
        width = output.width(),
        height = output.height(),
        block_size = style.block_size,
        levels = style.levels,
        "pixelated image"
    );
    Ok(())
}

pub fn pixelate_image(input: &RgbaImage, style: PixelationStyle) -> Result<RgbaImage> {
    let params = PixelationParameters::new(style, input.dimensions());
    let effect = PixelationEffect::new(params).context("invalid pixelation settings")?;
    Ok(effect.apply(&ColorBuffer::from_rgba8(input)).to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn blocks_share_one_colour() {
        let input = RgbaImage::from_fn(16, 8, |x, y| Rgba([(x * 16) as u8, (y * 32) as u8, 90, 255]));
        let output = pixelate_image(&input, PixelationStyle::RETRO12).unwrap();

        assert_eq!(output.dimensions(), (16, 8));
        for y in 0..8 {
            for x in 0..16 {
                let corner = output.get_pixel(x - x % 4, y - y % 4);
                assert_eq!(output.get_pixel(x, y), corner, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn alpha_is_preserved() {
        let input = RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 77]));
        let output = pixelate_image(&input, PixelationStyle::RETRO8).unwrap();
        assert!(output.pixels().all(|pixel| pixel[3] == 77));
    }

    #[test]
    fn rejects_zero_sized_images_and_bad_settings() {
        assert!(pixelate_image(&RgbaImage::new(0, 4), PixelationStyle::RETRO12).is_err());
        let style = PixelationStyle {
            levels: 0,
            ..PixelationStyle::RETRO12
        };
        assert!(pixelate_image(&RgbaImage::new(4, 4), style).is_err());
    }
}
