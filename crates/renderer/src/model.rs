//! Asynchronous asset loading.
//!
//! A [`ModelProvider`] resolves exactly once: the worker thread either hands
//! back a fully built [`DisplayedModel`] or reports why it could not. Polling
//! never blocks the render loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use glam::{Mat4, Vec2, Vec3};
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use tracing::{debug, info, warn};

use crate::scene::{
    ColorableSurface, DisplayedModel, Geometry, LoadState, MeshNode, OtherSurface,
    OtherSurfaceKind, SceneGraph, Surface,
};
use crate::types::Rgb;

const DEFAULT_SHININESS: f32 = 30.0;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no model asset configured")]
    NoAsset,
    #[error("model asset {path} could not be imported: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("mesh '{0}' has no position data")]
    MissingPositions(String),
    #[error("model asset {0} contains no meshes")]
    Empty(PathBuf),
    #[error("failed to spawn model loader thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("model loader stopped without reporting a result")]
    WorkerLost,
}

/// Anything that can turn a path into a scene graph. Runs on the loader thread.
pub trait ModelSource: Send + 'static {
    fn load(&self, path: &Path) -> Result<SceneGraph, ModelError>;
}

impl<F> ModelSource for F
where
    F: Fn(&Path) -> Result<SceneGraph, ModelError> + Send + 'static,
{
    fn load(&self, path: &Path) -> Result<SceneGraph, ModelError> {
        self(path)
    }
}

/// Loads `.gltf`/`.glb` assets, flattening node hierarchies into model space.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfModelSource;

impl ModelSource for GltfModelSource {
    fn load(&self, path: &Path) -> Result<SceneGraph, ModelError> {
        let (document, buffers, images) =
            gltf::import(path).map_err(|source| ModelError::Import {
                path: path.to_path_buf(),
                source,
            })?;
        let textures: Vec<Option<Arc<RgbaImage>>> = images
            .iter()
            .map(|data| decode_texture(data).map(Arc::new))
            .collect();
        let assets = ImportedAssets {
            buffers: &buffers,
            textures: &textures,
        };

        let mut graph = SceneGraph::new();
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next());
        if let Some(scene) = scene {
            for node in scene.nodes() {
                collect_node(&node, Mat4::IDENTITY, &assets, &mut graph)?;
            }
        }

        if graph.is_empty() {
            return Err(ModelError::Empty(path.to_path_buf()));
        }
        info!(
            path = %path.display(),
            meshes = graph.len(),
            triangles = graph.triangle_count(),
            "imported glTF model"
        );
        Ok(graph)
    }
}

struct ImportedAssets<'a> {
    buffers: &'a [gltf::buffer::Data],
    /// Decoded images by glTF image index; `None` when the format is unsupported.
    textures: &'a [Option<Arc<RgbaImage>>],
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    assets: &ImportedAssets<'_>,
    graph: &mut SceneGraph,
) -> Result<(), ModelError> {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let name = mesh
            .name()
            .or_else(|| node.name())
            .unwrap_or("mesh")
            .to_string();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                debug!(mesh = %name, mode = ?primitive.mode(), "skipping non-triangle primitive");
                continue;
            }
            let material = primitive.material();
            let base_color = material.pbr_metallic_roughness().base_color_texture();
            let texture = base_color.as_ref().and_then(|info| {
                let index = info.texture().source().index();
                let texture = assets.textures.get(index).cloned().flatten();
                if texture.is_none() {
                    warn!(
                        mesh = %name,
                        image = index,
                        "base colour texture unavailable; using the material colour"
                    );
                }
                texture
            });
            let uv_set = base_color.as_ref().map_or(0, |info| info.tex_coord());
            let geometry = read_geometry(&name, &primitive, uv_set, assets.buffers)?;
            graph.push(MeshNode {
                name: name.clone(),
                geometry,
                transform,
                surface: surface_for(&material, texture.is_some()),
                texture,
            });
        }
    }

    for child in node.children() {
        collect_node(&child, transform, assets, graph)?;
    }
    Ok(())
}

fn read_geometry(
    name: &str,
    primitive: &gltf::Primitive,
    uv_set: u32,
    buffers: &[gltf::buffer::Data],
) -> Result<Geometry, ModelError> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<Vec3> = reader
        .read_positions()
        .ok_or_else(|| ModelError::MissingPositions(name.to_string()))?
        .map(Vec3::from)
        .collect();

    let normals: Vec<Vec3> = reader
        .read_normals()
        .map(|iter| iter.map(Vec3::from).collect())
        .unwrap_or_else(|| vec![Vec3::Y; positions.len()]);

    let uvs: Vec<Vec2> = reader
        .read_tex_coords(uv_set)
        .map(|iter| iter.into_f32().map(Vec2::from).collect())
        .unwrap_or_default();

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|iter| iter.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    Ok(Geometry {
        positions,
        normals,
        uvs,
        indices,
    })
}

/// Expands 8-bit glTF image data to RGBA. Higher bit depths are not supported.
fn decode_texture(data: &gltf::image::Data) -> Option<RgbaImage> {
    use gltf::image::Format;

    let (width, height) = (data.width, data.height);
    let pixels = data.pixels.clone();
    let image = match data.format {
        Format::R8 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        Format::R8G8 => {
            GrayAlphaImage::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8)
        }
        Format::R8G8B8 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        Format::R8G8B8A8 => return RgbaImage::from_raw(width, height, pixels),
        other => {
            debug!(format = ?other, "skipping texture with unsupported pixel format");
            None
        }
    };
    image.map(|image| image.to_rgba8())
}

/// Textured materials keep their map and are never recoloured; every other
/// material follows the palette. A map that failed to decode counts as untextured.
fn surface_for(material: &gltf::Material, textured: bool) -> Surface {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    let color = Rgb::new(r, g, b);
    if textured {
        Surface::Other(OtherSurface {
            color,
            kind: OtherSurfaceKind::Textured,
        })
    } else {
        Surface::Colorable(ColorableSurface {
            color,
            shininess: DEFAULT_SHININESS,
        })
    }
}

/// The single notification a provider emits.
#[derive(Debug)]
pub enum LoadEvent {
    Loaded(DisplayedModel),
    Failed(ModelError),
}

/// How a loaded asset is placed before animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPlacement {
    pub scale: f32,
    pub yaw: f32,
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self {
            scale: 5.0,
            yaw: std::f32::consts::PI,
        }
    }
}

/// Background asset loader polled once per frame.
pub struct ModelProvider {
    receiver: Option<Receiver<LoadEvent>>,
    immediate: Option<LoadEvent>,
    state: LoadState,
    _worker: Option<JoinHandle<()>>,
}

impl ModelProvider {
    /// Starts loading `path` on a dedicated thread.
    pub fn spawn<S: ModelSource>(source: S, path: PathBuf, placement: ModelPlacement) -> Self {
        let (sender, receiver) = bounded(1);
        let thread_path = path.clone();
        let spawned = thread::Builder::new()
            .name("pixelshark-loader".into())
            .spawn(move || {
                let event = match source.load(&thread_path) {
                    Ok(graph) => {
                        LoadEvent::Loaded(DisplayedModel::loaded(graph, placement.scale, placement.yaw))
                    }
                    Err(err) => LoadEvent::Failed(err),
                };
                // Receiver gone means the pipeline was disposed; drop the result.
                let _ = sender.send(event);
            });

        match spawned {
            Ok(handle) => {
                debug!(path = %path.display(), "model load started");
                Self {
                    receiver: Some(receiver),
                    immediate: None,
                    state: LoadState::Pending,
                    _worker: Some(handle),
                }
            }
            Err(err) => Self::resolved(LoadEvent::Failed(ModelError::Spawn(err))),
        }
    }

    /// Provider for a run without an asset; it fails on the first poll.
    pub fn without_asset() -> Self {
        Self::resolved(LoadEvent::Failed(ModelError::NoAsset))
    }

    /// Provider that resolves on the first poll with `event`.
    pub fn resolved(event: LoadEvent) -> Self {
        Self {
            receiver: None,
            immediate: Some(event),
            state: LoadState::Pending,
            _worker: None,
        }
    }

    /// Non-blocking; yields the outcome exactly once, then `None` forever.
    pub fn poll(&mut self) -> Option<LoadEvent> {
        if self.state != LoadState::Pending {
            return None;
        }

        let event = if let Some(event) = self.immediate.take() {
            event
        } else {
            let receiver = self.receiver.as_ref()?;
            match receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => LoadEvent::Failed(ModelError::WorkerLost),
            }
        };

        self.receiver = None;
        match &event {
            LoadEvent::Loaded(model) => {
                self.state = LoadState::Loaded;
                info!(meshes = model.graph().len(), "model ready");
            }
            LoadEvent::Failed(err) => {
                self.state = LoadState::Failed;
                warn!("model load failed: {err}");
            }
        }
        Some(event)
    }

    pub fn state(&self) -> LoadState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::scene::fallback;

    fn wait(provider: &mut ModelProvider) -> LoadEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(event) = provider.poll() {
                return event;
            }
            assert!(Instant::now() < deadline, "provider never resolved");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn successful_source_resolves_once() {
        let source = |_: &Path| -> Result<SceneGraph, ModelError> { Ok(fallback::shark()) };
        let mut provider =
            ModelProvider::spawn(source, PathBuf::from("shark.glb"), ModelPlacement::default());
        match wait(&mut provider) {
            LoadEvent::Loaded(model) => {
                assert_eq!(model.base_scale(), 5.0);
                assert_eq!(model.colorable_indices().len(), 6);
            }
            LoadEvent::Failed(err) => panic!("unexpected failure: {err}"),
        }
        assert_eq!(provider.state(), LoadState::Loaded);
        assert!(provider.poll().is_none());
    }

    #[test]
    fn failing_source_reports_failure() {
        let source = |path: &Path| -> Result<SceneGraph, ModelError> {
            Err(ModelError::Empty(path.to_path_buf()))
        };
        let mut provider =
            ModelProvider::spawn(source, PathBuf::from("empty.glb"), ModelPlacement::default());
        assert!(matches!(wait(&mut provider), LoadEvent::Failed(ModelError::Empty(_))));
        assert_eq!(provider.state(), LoadState::Failed);
        assert!(provider.poll().is_none());
    }

    #[test]
    fn panicking_worker_counts_as_failure() {
        let source = |_: &Path| -> Result<SceneGraph, ModelError> { panic!("decoder crashed") };
        let mut provider =
            ModelProvider::spawn(source, PathBuf::from("bad.glb"), ModelPlacement::default());
        assert!(matches!(wait(&mut provider), LoadEvent::Failed(ModelError::WorkerLost)));
    }

    #[test]
    fn missing_asset_fails_immediately() {
        let mut provider = ModelProvider::without_asset();
        assert_eq!(provider.state(), LoadState::Pending);
        assert!(matches!(provider.poll(), Some(LoadEvent::Failed(ModelError::NoAsset))));
        assert!(provider.poll().is_none());
    }

    /// One textured triangle ("skin") and one untextured triangle ("fin")
    /// sharing a position buffer, with external `.bin` and `.png` files.
    fn write_textured_gltf(dir: &Path) -> PathBuf {
        let mut bytes = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        for value in [0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        std::fs::write(dir.join("shark.bin"), &bytes).unwrap();

        let mut skin = RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        skin.put_pixel(1, 0, image::Rgba([200, 100, 50, 255]));
        skin.save(dir.join("skin.png")).unwrap();

        let json = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0, 1] }],
            "nodes": [{ "mesh": 0 }, { "mesh": 1 }],
            "meshes": [
                { "name": "skin", "primitives": [{ "attributes": { "POSITION": 0, "TEXCOORD_0": 1 }, "material": 0 }] },
                { "name": "fin", "primitives": [{ "attributes": { "POSITION": 0 } }] }
            ],
            "materials": [{ "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }],
            "textures": [{ "source": 0 }],
            "images": [{ "uri": "skin.png" }],
            "buffers": [{ "uri": "shark.bin", "byteLength": 60 }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 24 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0] },
                { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" }
            ]
        }"#;
        let path = dir.join("shark.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn gltf_source_keeps_base_colour_textures() {
        let dir = tempfile::TempDir::new().unwrap();
        let graph = GltfModelSource.load(&write_textured_gltf(dir.path())).unwrap();
        assert_eq!(graph.len(), 2);

        let skin = &graph.meshes()[0];
        assert_eq!(skin.name, "skin");
        assert!(matches!(
            skin.surface,
            Surface::Other(OtherSurface {
                kind: OtherSurfaceKind::Textured,
                ..
            })
        ));
        let texture = skin.texture.as_deref().expect("texture decoded");
        assert_eq!(texture.dimensions(), (2, 2));
        assert_eq!(*texture.get_pixel(1, 0), image::Rgba([200, 100, 50, 255]));
        assert_eq!(skin.geometry.uvs, vec![Vec2::ZERO, Vec2::X, Vec2::Y]);

        let fin = &graph.meshes()[1];
        assert!(matches!(fin.surface, Surface::Colorable(_)));
        assert!(fin.texture.is_none());
        assert!(fin.geometry.uvs.is_empty());
        assert_eq!(fin.geometry.indices, vec![0, 1, 2]);
    }

    #[test]
    fn texture_decoding_expands_to_rgba() {
        let rgb = gltf::image::Data {
            pixels: vec![255, 0, 0, 0, 255, 0],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };
        let image = decode_texture(&rgb).unwrap();
        assert_eq!(*image.get_pixel(1, 0), image::Rgba([0, 255, 0, 255]));

        let grey = gltf::image::Data {
            pixels: vec![128],
            format: gltf::image::Format::R8,
            width: 1,
            height: 1,
        };
        assert_eq!(
            *decode_texture(&grey).unwrap().get_pixel(0, 0),
            image::Rgba([128, 128, 128, 255])
        );

        let deep = gltf::image::Data {
            pixels: vec![0; 8],
            format: gltf::image::Format::R16G16B16A16,
            width: 1,
            height: 1,
        };
        assert!(decode_texture(&deep).is_none());

        let truncated = gltf::image::Data {
            pixels: vec![0; 3],
            format: gltf::image::Format::R8G8B8A8,
            width: 1,
            height: 1,
        };
        assert!(decode_texture(&truncated).is_none());
    }

    #[test]
    fn gltf_source_rejects_missing_file() {
        let err = GltfModelSource
            .load(Path::new("/definitely/not/here.glb"))
            .expect_err("missing file");
        assert!(matches!(err, ModelError::Import { .. }));
    }
}
