use crate::scene::MAX_SPHERES;
use crate::uniforms::FLAG_GROUPS;

/// WGSL for the trace kernel with the sphere array lengths baked in.
pub fn trace_source() -> String {
    TRACE_TEMPLATE
        .replace("MAX_SPHERES", &MAX_SPHERES.to_string())
        .replace("FLAG_GROUPS", &FLAG_GROUPS.to_string())
}

const TRACE_TEMPLATE: &str = r#"
struct CameraUniform {
    inverse_projection: mat4x4<f32>,
    inverse_view: mat4x4<f32>,
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
    position: vec3<f32>,
}

struct Sphere {
    center: vec3<f32>,
    radius: f32,
    albedo: vec4<f32>,
}

@group(0) @binding(0) var<uniform> canvas_size: vec2<f32>;
@group(0) @binding(1) var<uniform> camera: CameraUniform;
@group(0) @binding(2) var<uniform> spheres: array<Sphere, MAX_SPHERES>;
@group(0) @binding(3) var<uniform> sphere_flags: array<vec4<u32>, FLAG_GROUPS>;
@group(0) @binding(4) var<uniform> sphere_capacity: u32;
@group(0) @binding(5) var<uniform> light_direction: vec3<f32>;

@group(1) @binding(0) var trace_target: texture_storage_2d<rgba8unorm, write>;

fn sky_color(direction: vec3<f32>) -> vec4<f32> {
    let t = 0.5 * (direction.y + 1.0);
    let horizon = vec3<f32>(1.0, 1.0, 1.0);
    let zenith = vec3<f32>(0.5, 0.7, 1.0);
    return vec4<f32>(mix(horizon, zenith, t), 1.0);
}

@compute @workgroup_size(8, 8, 1)
fn trace_main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (f32(gid.x) >= canvas_size.x || f32(gid.y) >= canvas_size.y) {
        return;
    }

    // Primary ray through the pixel center.
    let uv = (vec2<f32>(gid.xy) + vec2<f32>(0.5, 0.5)) / canvas_size;
    let ndc = vec2<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
    let ray_target = camera.inverse_projection * vec4<f32>(ndc, 1.0, 1.0);
    let view_direction = normalize(ray_target.xyz / ray_target.w);
    let direction = normalize((camera.inverse_view * vec4<f32>(view_direction, 0.0)).xyz);
    let origin = camera.position;

    var nearest_t = -1.0;
    var nearest = -1;
    for (var i = 0u; i < sphere_capacity; i = i + 1u) {
        if (sphere_flags[i / 4u][i % 4u] == 0u) {
            continue;
        }
        let sphere = spheres[i];
        let oc = origin - sphere.center;
        let half_b = dot(oc, direction);
        let c = dot(oc, oc) - sphere.radius * sphere.radius;
        let discriminant = half_b * half_b - c;
        if (discriminant < 0.0) {
            continue;
        }
        let t = -half_b - sqrt(discriminant);
        if (t > 0.001 && (nearest_t < 0.0 || t < nearest_t)) {
            nearest_t = t;
            nearest = i32(i);
        }
    }

    var color = sky_color(direction);
    if (nearest >= 0) {
        let sphere = spheres[u32(nearest)];
        let hit = origin + direction * nearest_t;
        let normal = normalize(hit - sphere.center);
        let to_light = normalize(-light_direction);
        let diffuse = max(dot(normal, to_light), 0.0);
        let ambient = 0.1;
        color = vec4<f32>(sphere.albedo.rgb * (ambient + diffuse), sphere.albedo.a);
    }

    textureStore(trace_target, vec2<i32>(gid.xy), color);
}
"#;

/// Fullscreen blit: six clip-space vertices sampling the traced image.
pub const BLIT_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@group(0) @binding(0) var traced: texture_2d<f32>;
@group(0) @binding(1) var traced_sampler: sampler;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VertexOutput {
    var output: VertexOutput;
    output.position = vec4<f32>(position, 0.0, 1.0);
    output.uv = vec2<f32>(position.x * 0.5 + 0.5, 0.5 - position.y * 0.5);
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(traced, traced_sampler, input.uv);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_source_bakes_in_array_lengths() {
        let source = trace_source();
        assert!(source.contains("array<Sphere, 50>"));
        assert!(source.contains("array<vec4<u32>, 13>"));
        assert!(!source.contains("MAX_SPHERES"));
        assert!(!source.contains("FLAG_GROUPS"));
    }

    #[test]
    fn shaders_declare_their_entry_points() {
        assert!(trace_source().contains("fn trace_main"));
        assert!(BLIT_SHADER.contains("fn vs_main"));
        assert!(BLIT_SHADER.contains("fn fs_main"));
    }
}
