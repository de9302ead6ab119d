use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;

use crate::pipeline::{BackendError, FrameInputs, RenderBackend};
use crate::scene::DisplayedModel;
use crate::types::Viewport;

use super::context::GpuContext;
use super::pixel_pass::PixelPass;
use super::scene_pass::ScenePass;

/// `wgpu` implementation of [`RenderBackend`] presenting to a window surface.
pub struct GpuBackend {
    context: GpuContext,
    scene: ScenePass,
    pixel: PixelPass,
    released: bool,
}

impl GpuBackend {
    /// The window behind `target` must outlive the backend.
    pub fn new<T>(target: &T, viewport: Viewport) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, viewport.device_size())?;
        let (width, height) = context.size();
        let scene = ScenePass::new(&context.device, &context.queue, width, height);
        let pixel = PixelPass::new(&context.device, context.surface_format, scene.color_view());
        Ok(Self {
            context,
            scene,
            pixel,
            released: false,
        })
    }

    fn check_device(&self) -> Result<(), BackendError> {
        if self.released {
            return Err(BackendError::Other("backend already released".into()));
        }
        if self.context.is_device_lost() {
            return Err(BackendError::DeviceLost("device lost callback fired".into()));
        }
        Ok(())
    }
}

impl RenderBackend for GpuBackend {
    fn configure(&mut self, viewport: Viewport) -> Result<(), BackendError> {
        self.check_device()?;
        let (width, height) = viewport.device_size();
        if width == 0 || height == 0 {
            return Ok(());
        }
        if self.context.size() == (width, height) {
            // Same size: a stale surface only needs its configuration re-applied.
            self.context.reconfigure();
            return Ok(());
        }
        self.context.resize(width, height);
        self.scene.resize(&self.context.device, width, height);
        self.pixel.rebind(&self.context.device, self.scene.color_view());
        debug!(width, height, "resized GPU targets");
        Ok(())
    }

    fn upload_model(&mut self, model: &DisplayedModel) -> Result<(), BackendError> {
        self.check_device()?;
        self.scene
            .upload(&self.context.device, &self.context.queue, model);
        Ok(())
    }

    fn render(&mut self, frame: &FrameInputs<'_>) -> Result<(), BackendError> {
        self.check_device()?;
        let surface_texture = self
            .context
            .surface
            .get_current_texture()
            .map_err(map_surface_error)?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        self.scene.encode(&mut encoder, &self.context.queue, frame);
        self.pixel.encode(
            &mut encoder,
            &self.context.queue,
            &view,
            &frame.effect.uniforms(),
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.scene.clear();
        self.released = true;
        debug!("released GPU resources");
    }
}

fn map_surface_error(err: wgpu::SurfaceError) -> BackendError {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            BackendError::SurfaceLost(err.to_string())
        }
        wgpu::SurfaceError::Timeout => BackendError::Timeout,
        wgpu::SurfaceError::OutOfMemory => BackendError::OutOfMemory,
        wgpu::SurfaceError::Other => BackendError::Other(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_surfaces_are_recoverable() {
        assert!(!map_surface_error(wgpu::SurfaceError::Lost).is_fatal());
        assert!(!map_surface_error(wgpu::SurfaceError::Outdated).is_fatal());
        assert!(!map_surface_error(wgpu::SurfaceError::Timeout).is_fatal());
        assert!(map_surface_error(wgpu::SurfaceError::OutOfMemory).is_fatal());
    }
}
