//! Observable scene: the displayed model, its colour and its motion state.

pub mod fallback;
pub mod graph;

use glam::{Mat4, Quat, Vec3};

pub use graph::{
    ColorableSurface, Geometry, MeshNode, OtherSurface, OtherSurfaceKind, SceneGraph, Surface,
    SurfaceVisitor,
};

use crate::types::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Fallback,
    Loaded,
}

/// Vertical (`y`) and depth (`z`) displacement of the whole model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionOffset {
    pub y: f32,
    pub z: f32,
}

struct CollectColorable(Vec<usize>);

impl SurfaceVisitor for CollectColorable {
    fn visit_colorable(&mut self, index: usize, _surface: &mut ColorableSurface) {
        self.0.push(index);
    }
}

/// A scene graph ready to be drawn, with its colourable subset resolved once.
#[derive(Debug, Clone)]
pub struct DisplayedModel {
    graph: SceneGraph,
    kind: ModelKind,
    base_scale: f32,
    base_yaw: f32,
    colorable: Vec<usize>,
}

impl DisplayedModel {
    pub fn new(mut graph: SceneGraph, kind: ModelKind, base_scale: f32, base_yaw: f32) -> Self {
        let mut collect = CollectColorable(Vec::new());
        graph.visit_surfaces(&mut collect);
        Self {
            graph,
            kind,
            base_scale,
            base_yaw,
            colorable: collect.0,
        }
    }

    pub fn fallback(graph: SceneGraph) -> Self {
        Self::new(graph, ModelKind::Fallback, 1.0, 0.0)
    }

    pub fn loaded(graph: SceneGraph, base_scale: f32, base_yaw: f32) -> Self {
        Self::new(graph, ModelKind::Loaded, base_scale, base_yaw)
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn base_scale(&self) -> f32 {
        self.base_scale
    }

    pub fn base_yaw(&self) -> f32 {
        self.base_yaw
    }

    pub fn colorable_indices(&self) -> &[usize] {
        &self.colorable
    }

    /// Sets the colour of every colourable surface; returns how many changed hands.
    pub fn apply_color(&mut self, color: Rgb) -> usize {
        let mut applied = 0;
        for index in &self.colorable {
            if let Some(Surface::Colorable(surface)) = self.graph.surface_mut(*index) {
                surface.color = color;
                applied += 1;
            }
        }
        applied
    }
}

/// Everything the renderer needs to draw one frame of the scene.
#[derive(Debug, Clone)]
pub struct SceneState {
    rotation_y: f64,
    position_offset: PositionOffset,
    base_color: Rgb,
    load_state: LoadState,
    model: DisplayedModel,
}

impl SceneState {
    /// Starts in `Pending` with the placeholder already tinted `color`.
    pub fn new(mut placeholder: DisplayedModel, color: Rgb) -> Self {
        placeholder.apply_color(color);
        Self {
            rotation_y: 0.0,
            position_offset: PositionOffset::default(),
            base_color: color,
            load_state: LoadState::Pending,
            model: placeholder,
        }
    }

    pub fn rotation_y(&self) -> f64 {
        self.rotation_y
    }

    pub fn position_offset(&self) -> PositionOffset {
        self.position_offset
    }

    pub fn base_color(&self) -> Rgb {
        self.base_color
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn model(&self) -> &DisplayedModel {
        &self.model
    }

    /// Swaps in the loaded asset, recoloured before it becomes visible.
    ///
    /// Returns `false` when an asset is already displayed; `Loaded` is terminal.
    pub fn install_loaded(&mut self, mut model: DisplayedModel) -> bool {
        if self.load_state == LoadState::Loaded {
            return false;
        }
        model.apply_color(self.base_color);
        self.model = model;
        self.load_state = LoadState::Loaded;
        true
    }

    /// Records a failed load; the placeholder stays on screen.
    pub fn mark_failed(&mut self) -> bool {
        if self.load_state != LoadState::Pending {
            return false;
        }
        self.load_state = LoadState::Failed;
        true
    }

    /// Applies `color` to whatever is displayed and remembers it for later swaps.
    pub fn set_color(&mut self, color: Rgb) -> usize {
        self.base_color = color;
        self.model.apply_color(color)
    }

    pub(crate) fn advance_rotation(&mut self, radians: f64) {
        if radians.is_finite() && radians > 0.0 {
            self.rotation_y += radians;
        }
    }

    pub(crate) fn set_position_offset(&mut self, offset: PositionOffset) {
        self.position_offset = offset;
    }

    /// Model-to-world transform: offset, then yaw, then the model's base scale.
    pub fn model_matrix(&self) -> Mat4 {
        let yaw = (self.rotation_y % std::f64::consts::TAU) as f32 + self.model.base_yaw;
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.model.base_scale),
            Quat::from_rotation_y(yaw),
            Vec3::new(0.0, self.position_offset.y, self.position_offset.z),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette(hex: u32) -> Rgb {
        Rgb::from_u32(hex)
    }

    fn colours(model: &DisplayedModel) -> Vec<u32> {
        model
            .graph()
            .meshes()
            .iter()
            .map(|mesh| mesh.surface.display_color().to_u32())
            .collect()
    }

    #[test]
    fn recolour_skips_fixed_surfaces() {
        let mut scene = SceneState::new(DisplayedModel::fallback(fallback::shark()), Rgb::WHITE);
        let applied = scene.set_color(palette(0xFF69B4));
        assert_eq!(applied, 6);
        for mesh in scene.model().graph().meshes() {
            let expected = match mesh.surface {
                Surface::Colorable(_) => 0xFF69B4,
                Surface::Other(_) => 0x000000,
            };
            assert_eq!(mesh.surface.display_color().to_u32(), expected, "{}", mesh.name);
        }
    }

    #[test]
    fn loaded_model_adopts_current_colour_before_display() {
        let mut scene = SceneState::new(DisplayedModel::fallback(fallback::shark()), Rgb::WHITE);
        scene.set_color(palette(0xFFD700));
        let asset = DisplayedModel::loaded(fallback::shark(), 5.0, std::f32::consts::PI);
        assert!(scene.install_loaded(asset));
        assert_eq!(scene.load_state(), LoadState::Loaded);
        assert_eq!(scene.model().kind(), ModelKind::Loaded);
        assert!(colours(scene.model()).contains(&0xFFD700));
    }

    #[test]
    fn loaded_is_terminal() {
        let mut scene = SceneState::new(DisplayedModel::fallback(fallback::shark()), Rgb::WHITE);
        assert!(scene.install_loaded(DisplayedModel::loaded(SceneGraph::new(), 5.0, 0.0)));
        assert!(!scene.mark_failed());
        assert!(!scene.install_loaded(DisplayedModel::fallback(fallback::shark())));
        assert_eq!(scene.load_state(), LoadState::Loaded);
    }

    #[test]
    fn failure_keeps_placeholder() {
        let mut scene = SceneState::new(DisplayedModel::fallback(fallback::shark()), Rgb::WHITE);
        assert!(scene.mark_failed());
        assert!(!scene.mark_failed());
        assert_eq!(scene.load_state(), LoadState::Failed);
        assert_eq!(scene.model().kind(), ModelKind::Fallback);
    }

    #[test]
    fn model_matrix_applies_scale_and_offset() {
        let mut scene = SceneState::new(DisplayedModel::fallback(SceneGraph::new()), Rgb::WHITE);
        scene.install_loaded(DisplayedModel::loaded(SceneGraph::new(), 5.0, 0.0));
        scene.set_position_offset(PositionOffset { y: 0.3, z: -0.2 });
        let moved = scene.model_matrix().transform_point3(Vec3::X);
        assert!((moved - Vec3::new(5.0, 0.3, -0.2)).length() < 1e-5);
    }
}
