//! `wgpu` backend for the composition pipeline.
//!
//! - `context` owns instance/device/surface wiring and rebuilds the swapchain
//!   when the window resizes.
//! - `mesh` turns scene-graph nodes into vertex/index buffers with a per-mesh
//!   uniform block.
//! - `scene_pass` renders the lit model into an offscreen texture sized to the
//!   framebuffer in device pixels.
//! - `pixel_pass` runs `pixelate.wgsl` over that texture into the swapchain.
//! - `state` glues everything together behind [`GpuBackend`].

mod context;
mod mesh;
mod pixel_pass;
mod scene_pass;
mod state;
mod uniforms;

pub use state::GpuBackend;
