//! Frame orchestration: clock → animation → scene render → pixelation → present.
//!
//! The pipeline owns everything a frame touches. External events (viewport
//! changes, colour picks) are queued and only applied at the start of the next
//! tick, so a frame never sees the camera and the pixelation stage disagree
//! about the framebuffer, and a freshly loaded model is never visible before it
//! has been recoloured.

use glam::Mat4;
use tracing::{debug, error, info, warn};

use crate::animation::AnimationDriver;
use crate::camera::Camera;
use crate::effect::{EffectError, PixelationEffect, PixelationParameters};
use crate::model::{LoadEvent, ModelProvider};
use crate::runtime::{FrameClock, FrameTick};
use crate::scene::{fallback, DisplayedModel, LoadState, SceneState};
use crate::types::{RendererConfig, Rgb, Viewport};

/// Failure reported by a [`RenderBackend`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("presentation surface lost: {0}")]
    SurfaceLost(String),
    #[error("timed out waiting for the next surface texture")]
    Timeout,
    #[error("graphics device lost: {0}")]
    DeviceLost(String),
    #[error("graphics device out of memory")]
    OutOfMemory,
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Fatal errors end the session; the rest are retried on the next frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BackendError::SurfaceLost(_) | BackendError::Timeout)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("composition pipeline is not running")]
    NotRunning,
    #[error(transparent)]
    Effect(#[from] EffectError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub scene: &'a SceneState,
    pub model_matrix: Mat4,
    pub camera: &'a Camera,
    pub effect: &'a PixelationEffect,
    pub viewport: Viewport,
    pub background: Rgb,
    pub tick: FrameTick,
}

/// Drawing surface the pipeline renders into.
pub trait RenderBackend {
    /// (Re)creates size-dependent resources for `viewport`.
    fn configure(&mut self, viewport: Viewport) -> Result<(), BackendError>;
    /// Uploads the geometry of a newly displayed model.
    fn upload_model(&mut self, model: &DisplayedModel) -> Result<(), BackendError>;
    fn render(&mut self, frame: &FrameInputs<'_>) -> Result<(), BackendError>;
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Initializing,
    Running,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Viewport has no drawable area (e.g. a minimised window).
    Hidden,
    /// The backend lost its surface and was reconfigured.
    Recovered,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Rendered(FrameTick),
    Skipped(SkipReason),
    /// The pipeline has been disposed and no longer consumes ticks.
    Stopped,
}

pub struct CompositionPipeline<B: RenderBackend> {
    backend: B,
    state: PipelineState,
    scene: SceneState,
    provider: Option<ModelProvider>,
    clock: FrameClock,
    animation: AnimationDriver,
    camera: Camera,
    effect: PixelationEffect,
    viewport: Viewport,
    background: Rgb,
    pending_resize: Option<Viewport>,
    pending_color: Option<Rgb>,
    /// The installed model has not reached the backend yet.
    upload_pending: bool,
}

impl<B: RenderBackend> CompositionPipeline<B> {
    /// Validates the effect configuration against `viewport` and builds the
    /// pipeline in `Initializing` with the fallback shark on stage.
    pub fn new(
        backend: B,
        config: &RendererConfig,
        provider: ModelProvider,
        clock: FrameClock,
        viewport: Viewport,
    ) -> Result<Self, PipelineError> {
        let (width, height) = viewport.device_size();
        let effect = PixelationEffect::new(PixelationParameters::new(
            config.pixelation,
            (width.max(1), height.max(1)),
        ))?;
        let mut camera = Camera::default();
        camera.set_aspect(viewport.aspect());
        let scene = SceneState::new(DisplayedModel::fallback(fallback::shark()), config.color);

        Ok(Self {
            backend,
            state: PipelineState::Initializing,
            scene,
            provider: Some(provider),
            clock,
            animation: AnimationDriver::new(config.loaded_motion, config.fallback_motion),
            camera,
            effect,
            viewport,
            background: config.background,
            pending_resize: None,
            pending_color: None,
            upload_pending: false,
        })
    }

    /// Configures the backend and uploads the fallback model.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        match self.state {
            PipelineState::Running => return Ok(()),
            PipelineState::Disposed => return Err(PipelineError::NotRunning),
            PipelineState::Initializing => {}
        }

        let prepared = self
            .backend
            .configure(self.viewport)
            .and_then(|()| self.backend.upload_model(self.scene.model()));
        if let Err(err) = prepared {
            error!("failed to start composition pipeline: {err}");
            self.dispose();
            return Err(err.into());
        }

        self.clock.reset();
        self.state = PipelineState::Running;
        let (width, height) = self.viewport.device_size();
        info!(width, height, "composition pipeline running");
        Ok(())
    }

    /// Queues a viewport change for the next tick; the latest request wins.
    pub fn request_resize(&mut self, viewport: Viewport) {
        if self.state == PipelineState::Disposed {
            return;
        }
        self.pending_resize = Some(viewport);
    }

    /// Queues a display colour change for the next tick; the latest request wins.
    pub fn request_color(&mut self, color: Rgb) {
        if self.state == PipelineState::Disposed {
            return;
        }
        self.pending_color = Some(color);
    }

    /// Advances the pipeline by one display refresh.
    pub fn tick(&mut self) -> Result<TickOutcome, PipelineError> {
        match self.state {
            PipelineState::Initializing => return Err(PipelineError::NotRunning),
            PipelineState::Disposed => return Ok(TickOutcome::Stopped),
            PipelineState::Running => {}
        }

        match self.frame() {
            Ok(outcome) => Ok(outcome),
            Err(PipelineError::Backend(err)) if !err.is_fatal() => {
                warn!("recoverable backend error, reconfiguring: {err}");
                match self.backend.configure(self.viewport) {
                    Ok(()) => Ok(TickOutcome::Skipped(SkipReason::Recovered)),
                    Err(err) if !err.is_fatal() => Ok(TickOutcome::Skipped(SkipReason::Recovered)),
                    Err(err) => self.fail(err.into()),
                }
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: PipelineError) -> Result<TickOutcome, PipelineError> {
        error!("fatal error, disposing composition pipeline: {err}");
        self.dispose();
        Err(err)
    }

    fn frame(&mut self) -> Result<TickOutcome, PipelineError> {
        self.apply_pending_resize()?;
        self.poll_model();
        if self.upload_pending {
            // A failed upload stays pending and is retried on the next tick.
            self.backend.upload_model(self.scene.model())?;
            self.upload_pending = false;
        }
        if let Some(color) = self.pending_color.take() {
            let recolored = self.scene.set_color(color);
            debug!(color = %color, surfaces = recolored, "display colour changed");
        }

        let tick = self.clock.tick();
        self.animation.update(&mut self.scene, tick);

        if !self.viewport.is_drawable() {
            return Ok(TickOutcome::Skipped(SkipReason::Hidden));
        }

        let inputs = FrameInputs {
            scene: &self.scene,
            model_matrix: self.scene.model_matrix(),
            camera: &self.camera,
            effect: &self.effect,
            viewport: self.viewport,
            background: self.background,
            tick,
        };
        self.backend.render(&inputs)?;
        Ok(TickOutcome::Rendered(tick))
    }

    /// Camera, effect and backend move to the new viewport together.
    fn apply_pending_resize(&mut self) -> Result<(), PipelineError> {
        let Some(viewport) = self.pending_resize.take() else {
            return Ok(());
        };
        if viewport == self.viewport {
            return Ok(());
        }
        self.viewport = viewport;
        if !viewport.is_drawable() {
            debug!("viewport hidden; deferring resize");
            return Ok(());
        }

        let (width, height) = viewport.device_size();
        let resolution_changed = self.effect.set_resolution(width, height)?;
        self.camera.set_aspect(viewport.aspect());
        self.backend.configure(viewport)?;
        debug!(
            width,
            height,
            scale = viewport.device_pixel_ratio,
            resolution_changed,
            "applied resize"
        );
        Ok(())
    }

    fn poll_model(&mut self) {
        let Some(event) = self.provider.as_mut().and_then(ModelProvider::poll) else {
            return;
        };
        match event {
            LoadEvent::Loaded(model) => {
                if self.scene.install_loaded(model) {
                    self.upload_pending = true;
                }
            }
            LoadEvent::Failed(_) => {
                self.scene.mark_failed();
            }
        }
    }

    /// Stops the pipeline and releases backend resources. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == PipelineState::Disposed {
            return;
        }
        // Dropping the provider discards any load still in flight.
        self.provider = None;
        self.pending_resize = None;
        self.pending_color = None;
        self.upload_pending = false;
        self.backend.release();
        self.state = PipelineState::Disposed;
        debug!("composition pipeline disposed");
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn load_state(&self) -> LoadState {
        self.scene.load_state()
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn effect(&self) -> &PixelationEffect {
        &self.effect
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: RenderBackend> Drop for CompositionPipeline<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_device_level_errors_are_fatal() {
        assert!(!BackendError::SurfaceLost("outdated".into()).is_fatal());
        assert!(!BackendError::Timeout.is_fatal());
        assert!(BackendError::DeviceLost("reset".into()).is_fatal());
        assert!(BackendError::OutOfMemory.is_fatal());
        assert!(BackendError::Other("validation".into()).is_fatal());
    }
}
