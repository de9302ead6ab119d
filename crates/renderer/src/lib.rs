//! Renderer crate for PixelShark (retro pixel-art shark viewer).
//!
//! The crate animates a shark model and runs every frame through a
//! pixelation post-process. The overall flow is:
//!
//! ```text
//!   CLI / pixelshark
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ winit event loop ──▶ CompositionPipeline::tick()
//!                                               │
//!       FrameClock ─▶ AnimationDriver ─▶ SceneState ─▶ RenderBackend
//!                                               ▲        (scene pass ─▶ pixelate pass)
//!       ModelProvider (loader thread) ──────────┘
//! ```
//!
//! [`CompositionPipeline`] owns the scene, camera and [`PixelationEffect`] and
//! is generic over [`RenderBackend`], so the frame logic runs the same against
//! the `wgpu` backend and against test doubles. [`PixelationEffect::apply`] is
//! the CPU reference of the effect and also powers offline image conversion.

mod animation;
mod camera;
mod compile;
mod effect;
mod gpu;
mod model;
mod palette;
mod pipeline;
mod runtime;
mod scene;
mod types;
mod window;

use anyhow::Result;

pub use animation::{offsets_at, AnimationDriver, MotionProfile};
pub use camera::Camera;
pub use effect::{
    adjust_channel, quantize_channel, snap_coordinate, ColorBuffer, EffectError, EffectPreset,
    PixelationEffect, PixelationParameters, PixelationStyle, PixelationUniforms,
};
pub use gpu::GpuBackend;
pub use model::{
    GltfModelSource, LoadEvent, ModelError, ModelPlacement, ModelProvider, ModelSource,
};
pub use palette::{
    lookup as lookup_palette, parse_color, slot_for_key, PaletteEntry, PALETTE_KEYS, SHARK_PALETTE,
};
pub use pipeline::{
    BackendError, CompositionPipeline, FrameInputs, PipelineError, PipelineState, RenderBackend,
    SkipReason, TickOutcome,
};
pub use runtime::{
    time_source_for_policy, BoxedTimeSource, FixedTimeSource, FrameClock, FrameScheduler,
    FrameTick, ManualTimeSource, MIN_TARGET_FPS, RenderPolicy, SystemTimeSource, TimeSource,
};
pub use scene::{
    fallback, ColorableSurface, DisplayedModel, Geometry, LoadState, MeshNode, ModelKind,
    OtherSurface, OtherSurfaceKind, PositionOffset, SceneGraph, SceneState, Surface,
    SurfaceVisitor,
};
pub use types::{ColorParseError, RendererConfig, Rgb, Viewport};

/// Entry point used by the CLI to open the preview window.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Blocks until the window closes or the pipeline hits a fatal error.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            width = self.config.surface_size.0,
            height = self.config.surface_size.1,
            model = ?self.config.model_path,
            color = %self.config.color,
            "starting renderer"
        );
        window::run_preview(self.config)
    }
}
