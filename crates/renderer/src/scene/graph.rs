use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use image::RgbaImage;

use crate::types::Rgb;

/// Triangle soup in model space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Base colour texture coordinates; may be empty for untextured meshes.
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends one flat-shaded triangle.
    pub fn push_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        let base = self.positions.len() as u32;
        self.positions.extend([a, b, c]);
        self.normals.extend([normal; 3]);
        self.indices.extend([base, base + 1, base + 2]);
    }

    pub fn push_quad(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
        self.push_triangle(a, b, c);
        self.push_triangle(a, c, d);
    }
}

/// Surface whose base colour follows the viewer's palette choice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorableSurface {
    pub color: Rgb,
    pub shininess: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherSurfaceKind {
    /// Colour comes from a texture the palette must not override.
    Textured,
    /// Fixed-colour detail such as eyes.
    Unlit,
}

/// Surface that keeps its own colour regardless of palette changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtherSurface {
    pub color: Rgb,
    pub kind: OtherSurfaceKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    Colorable(ColorableSurface),
    Other(OtherSurface),
}

impl Surface {
    pub fn display_color(&self) -> Rgb {
        match self {
            Surface::Colorable(surface) => surface.color,
            Surface::Other(surface) => surface.color,
        }
    }

    /// Whether the lighting pass should shade this surface.
    pub fn is_lit(&self) -> bool {
        !matches!(
            self,
            Surface::Other(OtherSurface {
                kind: OtherSurfaceKind::Unlit,
                ..
            })
        )
    }

    pub fn accept<V: SurfaceVisitor + ?Sized>(&mut self, index: usize, visitor: &mut V) {
        match self {
            Surface::Colorable(surface) => visitor.visit_colorable(index, surface),
            Surface::Other(surface) => visitor.visit_other(index, surface),
        }
    }
}

/// Visitor over the two surface capabilities a mesh can expose.
pub trait SurfaceVisitor {
    fn visit_colorable(&mut self, index: usize, surface: &mut ColorableSurface);

    fn visit_other(&mut self, _index: usize, _surface: &mut OtherSurface) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub name: String,
    pub geometry: Geometry,
    /// Node-to-model transform.
    pub transform: Mat4,
    pub surface: Surface,
    /// Decoded base colour map, shared between primitives using the same image.
    pub texture: Option<Arc<RgbaImage>>,
}

/// Flattened scene graph: every mesh carries its own model-space transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneGraph {
    meshes: Vec<MeshNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mesh: MeshNode) {
        self.meshes.push(mesh);
    }

    pub fn meshes(&self) -> &[MeshNode] {
        &self.meshes
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes
            .iter()
            .map(|mesh| mesh.geometry.triangle_count())
            .sum()
    }

    pub fn visit_surfaces<V: SurfaceVisitor + ?Sized>(&mut self, visitor: &mut V) {
        for (index, mesh) in self.meshes.iter_mut().enumerate() {
            mesh.surface.accept(index, visitor);
        }
    }

    pub(crate) fn surface_mut(&mut self, index: usize) -> Option<&mut Surface> {
        self.meshes.get_mut(index).map(|mesh| &mut mesh.surface)
    }
}

impl FromIterator<MeshNode> for SceneGraph {
    fn from_iter<I: IntoIterator<Item = MeshNode>>(iter: I) -> Self {
        Self {
            meshes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        colorable: Vec<usize>,
        other: Vec<usize>,
    }

    impl SurfaceVisitor for Counter {
        fn visit_colorable(&mut self, index: usize, _surface: &mut ColorableSurface) {
            self.colorable.push(index);
        }

        fn visit_other(&mut self, index: usize, _surface: &mut OtherSurface) {
            self.other.push(index);
        }
    }

    fn mesh(surface: Surface) -> MeshNode {
        let mut geometry = Geometry::default();
        geometry.push_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
        MeshNode {
            name: "tri".into(),
            geometry,
            transform: Mat4::IDENTITY,
            surface,
            texture: None,
        }
    }

    #[test]
    fn visitor_sees_each_capability() {
        let mut graph: SceneGraph = [
            mesh(Surface::Colorable(ColorableSurface {
                color: Rgb::WHITE,
                shininess: 0.0,
            })),
            mesh(Surface::Other(OtherSurface {
                color: Rgb::BLACK,
                kind: OtherSurfaceKind::Unlit,
            })),
            mesh(Surface::Colorable(ColorableSurface {
                color: Rgb::BLACK,
                shininess: 10.0,
            })),
        ]
        .into_iter()
        .collect();

        let mut counter = Counter {
            colorable: Vec::new(),
            other: Vec::new(),
        };
        graph.visit_surfaces(&mut counter);
        assert_eq!(counter.colorable, vec![0, 2]);
        assert_eq!(counter.other, vec![1]);
    }

    #[test]
    fn push_triangle_produces_unit_face_normals() {
        let mut geometry = Geometry::default();
        geometry.push_quad(Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y);
        assert_eq!(geometry.triangle_count(), 2);
        for normal in &geometry.normals {
            assert!((*normal - Vec3::Z).length() < 1e-6);
        }
    }
}
