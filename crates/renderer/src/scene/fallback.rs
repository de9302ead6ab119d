//! Procedural placeholder shark shown until (or instead of) the real asset.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use glam::{Mat4, Quat, Vec3};

use super::graph::{
    ColorableSurface, Geometry, MeshNode, OtherSurface, OtherSurfaceKind, SceneGraph, Surface,
};
use crate::types::Rgb;

const BODY: u32 = 0x4A90E2;
const HEAD_AND_TAIL: u32 = 0x357ABD;
const FINS: u32 = 0x2E6BA8;
const SHININESS: f32 = 30.0;

/// Builds the low-poly shark: tapered body, nose, tail, three fins, two eyes.
///
/// Every part except the eyes is colourable.
pub fn shark() -> SceneGraph {
    let mut graph = SceneGraph::new();

    // Body runs along +Z with the wide end at the head.
    graph.push(colorable(
        "body",
        cylinder(0.8, 0.3, 4.0, 12),
        Mat4::from_rotation_x(FRAC_PI_2),
        BODY,
    ));
    graph.push(colorable(
        "nose",
        cone(0.3, 1.0, 8),
        Mat4::from_rotation_translation(Quat::from_rotation_x(FRAC_PI_2), Vec3::new(0.0, 0.0, 2.2)),
        HEAD_AND_TAIL,
    ));
    graph.push(colorable(
        "tail",
        cone(0.6, 1.2, 6),
        Mat4::from_rotation_translation(
            Quat::from_rotation_x(FRAC_PI_2),
            Vec3::new(0.0, 0.0, -2.5),
        ),
        HEAD_AND_TAIL,
    ));
    graph.push(colorable(
        "dorsal_fin",
        cone(0.4, 1.2, 4),
        Mat4::from_translation(Vec3::new(0.0, 1.2, 0.0)),
        FINS,
    ));
    for (name, side) in [("left_fin", -1.0f32), ("right_fin", 1.0)] {
        graph.push(colorable(
            name,
            cuboid(1.5, 0.1, 0.8),
            Mat4::from_rotation_translation(
                Quat::from_rotation_z(side * FRAC_PI_4),
                Vec3::new(side, 0.0, 0.5),
            ),
            FINS,
        ));
    }
    for (name, side) in [("left_eye", -1.0f32), ("right_eye", 1.0)] {
        graph.push(MeshNode {
            name: name.to_string(),
            geometry: sphere(0.1, 8, 6),
            transform: Mat4::from_translation(Vec3::new(side * 0.5, 0.5, 1.5)),
            surface: Surface::Other(OtherSurface {
                color: Rgb::BLACK,
                kind: OtherSurfaceKind::Unlit,
            }),
            texture: None,
        });
    }

    graph
}

fn colorable(name: &str, geometry: Geometry, transform: Mat4, hex: u32) -> MeshNode {
    MeshNode {
        name: name.to_string(),
        geometry,
        transform,
        surface: Surface::Colorable(ColorableSurface {
            color: Rgb::from_u32(hex),
            shininess: SHININESS,
        }),
        texture: None,
    }
}

/// Y-aligned frustum centred on the origin, capped at both ends.
pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> Geometry {
    let segments = segments.max(3);
    let half = height * 0.5;
    let ring = |radius: f32, y: f32, i: u32| {
        let angle = TAU * i as f32 / segments as f32;
        Vec3::new(radius * angle.sin(), y, radius * angle.cos())
    };

    let mut geometry = Geometry::default();
    let top_center = Vec3::new(0.0, half, 0.0);
    let bottom_center = Vec3::new(0.0, -half, 0.0);
    for i in 0..segments {
        let top_a = ring(radius_top, half, i);
        let top_b = ring(radius_top, half, i + 1);
        let bottom_a = ring(radius_bottom, -half, i);
        let bottom_b = ring(radius_bottom, -half, i + 1);

        if radius_top > 0.0 {
            geometry.push_quad(bottom_a, bottom_b, top_b, top_a);
            geometry.push_triangle(top_center, top_a, top_b);
        } else {
            geometry.push_triangle(bottom_a, bottom_b, top_center);
        }
        if radius_bottom > 0.0 {
            geometry.push_triangle(bottom_center, bottom_b, bottom_a);
        }
    }
    geometry
}

/// Cone with its tip at `+height / 2` on the Y axis.
pub fn cone(radius: f32, height: f32, segments: u32) -> Geometry {
    cylinder(0.0, radius, height, segments)
}

/// Axis-aligned box centred on the origin.
pub fn cuboid(width: f32, height: f32, depth: f32) -> Geometry {
    let (x, y, z) = (width * 0.5, height * 0.5, depth * 0.5);
    let corner = |sx: f32, sy: f32, sz: f32| Vec3::new(sx * x, sy * y, sz * z);
    let mut geometry = Geometry::default();
    // +X, -X, +Y, -Y, +Z, -Z
    geometry.push_quad(corner(1., -1., 1.), corner(1., -1., -1.), corner(1., 1., -1.), corner(1., 1., 1.));
    geometry.push_quad(corner(-1., -1., -1.), corner(-1., -1., 1.), corner(-1., 1., 1.), corner(-1., 1., -1.));
    geometry.push_quad(corner(-1., 1., 1.), corner(1., 1., 1.), corner(1., 1., -1.), corner(-1., 1., -1.));
    geometry.push_quad(corner(-1., -1., -1.), corner(1., -1., -1.), corner(1., -1., 1.), corner(-1., -1., 1.));
    geometry.push_quad(corner(-1., -1., 1.), corner(1., -1., 1.), corner(1., 1., 1.), corner(-1., 1., 1.));
    geometry.push_quad(corner(1., -1., -1.), corner(-1., -1., -1.), corner(-1., 1., -1.), corner(1., 1., -1.));
    geometry
}

/// UV sphere centred on the origin.
pub fn sphere(radius: f32, longitude_segments: u32, latitude_segments: u32) -> Geometry {
    let longitude_segments = longitude_segments.max(3);
    let latitude_segments = latitude_segments.max(2);
    let point = |lon: u32, lat: u32| {
        let theta = PI * lat as f32 / latitude_segments as f32;
        let phi = TAU * lon as f32 / longitude_segments as f32;
        Vec3::new(
            radius * theta.sin() * phi.sin(),
            radius * theta.cos(),
            radius * theta.sin() * phi.cos(),
        )
    };

    let mut geometry = Geometry::default();
    for lat in 0..latitude_segments {
        for lon in 0..longitude_segments {
            let a = point(lon, lat);
            let b = point(lon, lat + 1);
            let c = point(lon + 1, lat + 1);
            let d = point(lon + 1, lat);
            if lat == 0 {
                geometry.push_triangle(a, b, c);
            } else if lat + 1 == latitude_segments {
                geometry.push_triangle(a, b, d);
            } else {
                geometry.push_quad(a, b, c, d);
            }
        }
    }
    geometry
}
