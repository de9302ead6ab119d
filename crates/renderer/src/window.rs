use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::GpuBackend;
use crate::model::{GltfModelSource, ModelPlacement, ModelProvider};
use crate::palette::{slot_for_key, SHARK_PALETTE};
use crate::pipeline::{CompositionPipeline, PipelineError, PipelineState, TickOutcome};
use crate::runtime::{FrameClock, FrameScheduler};
use crate::types::{RendererConfig, Viewport};

fn viewport_of(window: &Window) -> Viewport {
    let size = window.inner_size();
    Viewport::from_physical(size.width, size.height, window.scale_factor())
}

fn provider_for(config: &RendererConfig) -> ModelProvider {
    match &config.model_path {
        Some(path) => ModelProvider::spawn(
            GltfModelSource,
            path.clone(),
            ModelPlacement {
                scale: config.model_scale,
                yaw: config.model_yaw,
            },
        ),
        None => ModelProvider::without_asset(),
    }
}

enum KeyAction {
    Quit,
    Palette(usize),
}

fn key_action(event: &KeyEvent) -> Option<KeyAction> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    match &event.logical_key {
        Key::Named(NamedKey::Escape) => Some(KeyAction::Quit),
        Key::Character(value) => slot_for_key(value.as_str()).map(KeyAction::Palette),
        _ => None,
    }
}

/// Opens the preview window and drives the composition pipeline until closed.
pub(crate) fn run_preview(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title("PixelShark")
        .with_inner_size(LogicalSize::new(width.max(1), height.max(1)))
        .build(&event_loop)
        .context("failed to create preview window")?;
    let window = Arc::new(window);

    let viewport = viewport_of(&window);
    let backend = GpuBackend::new(window.as_ref(), viewport)
        .context("failed to initialise GPU backend")?;
    let mut pipeline = CompositionPipeline::new(
        backend,
        &config,
        provider_for(&config),
        FrameClock::for_policy(&config.policy),
        viewport,
    )
    .context("invalid renderer configuration")?;
    pipeline
        .start()
        .context("failed to start composition pipeline")?;

    let mut scheduler = FrameScheduler::new(&config.policy);
    let mut failure: Option<PipelineError> = None;
    window.request_redraw();

    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                pipeline.dispose();
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => match key_action(&event) {
                Some(KeyAction::Quit) => {
                    pipeline.dispose();
                    elwt.exit();
                }
                Some(KeyAction::Palette(slot)) => {
                    let entry = &SHARK_PALETTE[slot];
                    info!(name = entry.name, color = %entry.color(), "palette colour selected");
                    pipeline.request_color(entry.color());
                }
                None => {}
            },
            WindowEvent::Resized(size) => {
                pipeline.request_resize(Viewport::from_physical(
                    size.width,
                    size.height,
                    window.scale_factor(),
                ));
                window.request_redraw();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = window.inner_size();
                pipeline.request_resize(Viewport::from_physical(
                    size.width,
                    size.height,
                    scale_factor,
                ));
            }
            WindowEvent::RedrawRequested => match pipeline.tick() {
                Ok(TickOutcome::Rendered(_)) | Ok(TickOutcome::Skipped(_)) => {
                    scheduler.mark_rendered(Instant::now());
                }
                Ok(TickOutcome::Stopped) => elwt.exit(),
                Err(err) => {
                    if pipeline.state() == PipelineState::Disposed {
                        error!("stopping preview: {err}");
                        failure = Some(err);
                        elwt.exit();
                    } else {
                        warn!("frame failed: {err}");
                    }
                }
            },
            _ => {}
        },
        Event::AboutToWait => {
            if pipeline.state() != PipelineState::Running {
                elwt.set_control_flow(ControlFlow::Wait);
                return;
            }
            let now = Instant::now();
            if scheduler.ready_for_frame(now) {
                window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = scheduler.next_deadline() {
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    pipeline.dispose();
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))?;
    match failure {
        Some(err) => Err(anyhow!(err).context("composition pipeline stopped")),
        None => Ok(()),
    }
}
