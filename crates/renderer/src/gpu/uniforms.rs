use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::pipeline::FrameInputs;
use crate::scene::Surface;

/// Directional key light, pointing from the surface towards the light.
pub(crate) const LIGHT_POSITION: Vec3 = Vec3::new(5.0, 10.0, 7.5);
pub(crate) const LIGHT_INTENSITY: f32 = 0.9;
/// `#404040` at 0.8 intensity.
pub(crate) const AMBIENT: f32 = 0.8 * 64.0 / 255.0;

/// Mirrors `FrameUniforms` in `scene.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
    pub eye: [f32; 4],
}

impl FrameUniforms {
    pub fn from_frame(frame: &FrameInputs<'_>) -> Self {
        let direction = LIGHT_POSITION.normalize();
        let eye = frame.camera.eye;
        Self {
            view_proj: frame.camera.view_projection().to_cols_array_2d(),
            light_direction: [direction.x, direction.y, direction.z, 0.0],
            light_color: [LIGHT_INTENSITY, LIGHT_INTENSITY, LIGHT_INTENSITY, 1.0],
            ambient: [AMBIENT, AMBIENT, AMBIENT, 1.0],
            eye: [eye.x, eye.y, eye.z, 1.0],
        }
    }
}

/// Mirrors `MeshUniforms` in `scene.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct MeshUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub material: [f32; 4],
}

impl MeshUniforms {
    pub fn new(model: Mat4, surface: &Surface) -> Self {
        let normal_matrix = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        let color = surface.display_color();
        let shininess = match surface {
            Surface::Colorable(colorable) => colorable.shininess,
            Surface::Other(_) => 1.0,
        };
        let lit = if surface.is_lit() { 1.0 } else { 0.0 };
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            color: [color.r, color.g, color.b, 1.0],
            material: [shininess, lit, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::PixelationUniforms;
    use crate::scene::{ColorableSurface, OtherSurface, OtherSurfaceKind};
    use crate::types::Rgb;

    #[test]
    fn uniform_blocks_match_wgsl_layouts() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 128);
        assert_eq!(std::mem::size_of::<MeshUniforms>(), 160);
        assert_eq!(std::mem::size_of::<PixelationUniforms>(), 32);
    }

    #[test]
    fn mesh_uniforms_flag_unlit_surfaces() {
        let eye = Surface::Other(OtherSurface {
            color: Rgb::BLACK,
            kind: OtherSurfaceKind::Unlit,
        });
        assert_eq!(MeshUniforms::new(Mat4::IDENTITY, &eye).material[1], 0.0);

        let body = Surface::Colorable(ColorableSurface {
            color: Rgb::from_u32(0x4A90E2),
            shininess: 30.0,
        });
        let uniforms = MeshUniforms::new(Mat4::from_scale(Vec3::splat(2.0)), &body);
        assert_eq!(uniforms.material, [30.0, 1.0, 0.0, 0.0]);
        assert!((uniforms.normal_matrix[0][0] - 0.5).abs() < 1e-6);
    }
}
