use std::process::Command;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

fn pixelshark() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_pixelshark"));
    command.env("RUST_LOG", "warn");
    command
}

#[test]
fn palette_lists_every_colour_with_its_key() {
    let output = pixelshark().arg("palette").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let entries: Vec<_> = stdout.lines().filter(|line| line.starts_with("  [")).collect();
    assert_eq!(entries.len(), 12);
    assert!(entries[0].contains("[1]") && entries[0].contains("#4A90E2"));
    assert!(stdout.contains("[-] Goblin Shark"));
    assert!(stdout.contains("#FF69B4"));
}

#[test]
fn paths_honours_config_dir_override() {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join("pixelshark-config");

    let output = pixelshark()
        .arg("paths")
        .env("PIXELSHARK_CONFIG_DIR", &config_dir)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(&config_dir.display().to_string()));
    assert!(stdout.contains(&config_dir.join("config.toml").display().to_string()));
}

#[test]
fn pixelate_writes_blocky_image() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("gradient.png");
    let output_path = temp.path().join("retro.png");
    RgbaImage::from_fn(32, 16, |x, y| Rgba([(x * 8) as u8, (y * 16) as u8, 128, 255]))
        .save(&input)
        .unwrap();

    let status = pixelshark()
        .arg("pixelate")
        .arg(&input)
        .arg(&output_path)
        .args(["--preset", "retro8", "--pixel-size", "8"])
        .status()
        .unwrap();
    assert!(status.success());

    let result = image::open(&output_path).unwrap().to_rgba8();
    assert_eq!(result.dimensions(), (32, 16));
    for y in 0..16 {
        for x in 0..32 {
            assert_eq!(result.get_pixel(x, y), result.get_pixel(x - x % 8, y - y % 8));
        }
    }
    assert_ne!(result.get_pixel(0, 0), result.get_pixel(31, 15));
}

#[test]
fn pixelate_rejects_invalid_settings() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("flat.png");
    RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]))
        .save(&input)
        .unwrap();

    let status = pixelshark()
        .arg("pixelate")
        .arg(&input)
        .arg(temp.path().join("out.png"))
        .args(["--pixel-size", "0"])
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(!temp.path().join("out.png").exists());
}

#[test]
fn pixelate_reports_missing_input() {
    let temp = TempDir::new().unwrap();
    let output = pixelshark()
        .arg("pixelate")
        .arg(temp.path().join("missing.png"))
        .arg(temp.path().join("out.png"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("missing.png"));
}

#[test]
fn run_rejects_unparseable_config_before_opening_a_window() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("config.toml"), "version = 7\n").unwrap();

    let output = pixelshark()
        .env("PIXELSHARK_CONFIG_DIR", temp.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unsupported config version"));
}

#[test]
fn run_rejects_zero_pixel_size_before_opening_a_window() {
    let temp = TempDir::new().unwrap();
    let output = pixelshark()
        .env("PIXELSHARK_CONFIG_DIR", temp.path())
        .args(["--pixel-size", "0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("invalid pixelation settings"));
}
