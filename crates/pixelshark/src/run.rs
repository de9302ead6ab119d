use anyhow::Result;
use renderer::Renderer;
use tracing_subscriber::EnvFilter;

use crate::bindings::{load_config, renderer_config};
use crate::cli::RunArgs;
use crate::paths::AppPaths;

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let loaded = load_config(&paths, args.config.as_deref())?;
    tracing::debug!(
        config_dir = %paths.config_dir().display(),
        config_file = ?loaded.as_ref().map(|loaded| loaded.path.display().to_string()),
        "resolved pixelshark paths"
    );

    let config = renderer_config(&args, loaded.as_ref())?;
    if config.model_path.is_none() {
        tracing::info!("no model configured; showing the procedural shark");
    }
    Renderer::new(config).run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
