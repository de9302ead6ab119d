use std::borrow::Cow;

/// Lit scene pass (`vs_main` / `fs_main`).
pub(crate) const SCENE_SHADER_WGSL: &str = include_str!("shaders/scene.wgsl");

/// Fullscreen pixelation pass (`vs_main` / `fs_main`).
pub(crate) const PIXELATE_SHADER_WGSL: &str = include_str!("shaders/pixelate.wgsl");

pub(crate) const VERTEX_ENTRY: &str = "vs_main";
pub(crate) const FRAGMENT_ENTRY: &str = "fs_main";

pub(crate) fn compile_scene_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    compile_wgsl(device, "scene shader", SCENE_SHADER_WGSL)
}

pub(crate) fn compile_pixelate_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    compile_wgsl(device, "pixelate shader", PIXELATE_SHADER_WGSL)
}

fn compile_wgsl(device: &wgpu::Device, label: &str, source: &'static str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declares_entry_points(source: &str) -> bool {
        source.contains(&format!("fn {VERTEX_ENTRY}("))
            && source.contains(&format!("fn {FRAGMENT_ENTRY}("))
    }

    #[test]
    fn shaders_expose_expected_entry_points() {
        assert!(declares_entry_points(SCENE_SHADER_WGSL));
        assert!(declares_entry_points(PIXELATE_SHADER_WGSL));
    }

    #[test]
    fn pixel_params_fields_follow_uniform_order() {
        let body = PIXELATE_SHADER_WGSL
            .split("struct PixelParams {")
            .nth(1)
            .and_then(|rest| rest.split("};").next())
            .expect("PixelParams struct");
        let fields: Vec<&str> = body
            .lines()
            .filter_map(|line| line.trim().split(':').next())
            .filter(|name| !name.is_empty())
            .collect();
        assert_eq!(
            fields,
            vec!["resolution", "block_size", "levels", "gamma", "brightness", "_padding"]
        );
    }

    #[test]
    fn pixelate_shader_uses_same_formulas() {
        assert!(PIXELATE_SHADER_WGSL.contains("floor(in.uv * cells) / cells"));
        assert!(PIXELATE_SHADER_WGSL.contains("floor(color.rgb * levels) / levels"));
        assert!(PIXELATE_SHADER_WGSL.contains("* params.brightness"));
    }

    #[test]
    fn scene_shader_samples_the_base_colour_map() {
        assert!(SCENE_SHADER_WGSL.contains("@location(2) uv: vec2<f32>"));
        assert!(SCENE_SHADER_WGSL.contains("@group(1) @binding(1) var base_texture"));
        assert!(SCENE_SHADER_WGSL.contains("@group(1) @binding(2) var base_sampler"));
        assert!(SCENE_SHADER_WGSL
            .contains("mesh.color.rgb * textureSample(base_texture, base_sampler, in.uv)"));
    }
}
