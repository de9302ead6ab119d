mod bindings;
mod cli;
mod paths;
mod pixelate;
mod run;

use anyhow::Result;
use cli::Command;
use paths::AppPaths;
use renderer::{PALETTE_KEYS, SHARK_PALETTE};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Pixelate(args)) => pixelate::run_pixelate(args),
        Some(Command::Palette) => run_palette(),
        Some(Command::Paths) => run_paths(),
        None => run::run(cli.run),
    }
}

fn run_palette() -> Result<()> {
    println!("Shark palette:");
    for (key, entry) in PALETTE_KEYS.iter().zip(SHARK_PALETTE.iter()) {
        println!(
            "  [{key}] {:<14} {}  {}",
            entry.name,
            entry.color(),
            entry.description
        );
    }
    Ok(())
}

fn run_paths() -> Result<()> {
    let paths = AppPaths::discover()?;
    println!("Configuration:");
    println!("  config dir:  {}", paths.config_dir().display());
    println!("  config file: {}", paths.config_file().display());
    Ok(())
}
