//! WGSL sources. Each fragment stage mirrors a CPU function in the crate so
//! both executors produce the same image.

/// Lit scene draw and the packed depth/blur capture.
pub(crate) const SCENE_SHADER: &str = r#"
struct DepthBlur {
    far_plane: f32,
    focal_distance: f32,
    focal_length: f32,
    f_stop: f32,
    max_blur: f32,
    _p0: f32,
    _p1: f32,
    _p2: f32,
}

struct Draw {
    view_proj: mat4x4f,
    view: mat4x4f,
    model: mat4x4f,
    normal_matrix: mat4x4f,
    color: vec4f,
    light_directions: array<vec4f, 4>,
    light_colors: array<vec4f, 4>,
    light_count: u32,
    material: u32,
    ambient: f32,
    _pad: f32,
    depth_blur: DepthBlur,
}

@group(0) @binding(0) var<uniform> d: Draw;

const CIRCLE_OF_CONFUSION: f32 = 0.03;

struct VsOut {
    @builtin(position) clip: vec4f,
    @location(0) normal: vec3f,
    @location(1) view_depth: f32,
}

@vertex
fn vs(@location(0) position: vec3f, @location(1) normal: vec3f) -> VsOut {
    let world = d.model * vec4f(position, 1.0);
    var out: VsOut;
    out.clip = d.view_proj * world;
    out.normal = (d.normal_matrix * vec4f(normal, 0.0)).xyz;
    out.view_depth = -(d.view * world).z;
    return out;
}

fn pack16(value: f32) -> vec2f {
    let fine = fract(value * 255.0);
    return vec2f(value - fine / 255.0, fine);
}

fn circle_of_confusion(depth: f32) -> f32 {
    let f = d.depth_blur.focal_length;
    let focal_plane = d.depth_blur.focal_distance * 1000.0;
    let depth_mm = depth * 1000.0;
    let a = depth_mm * f / (depth_mm - f);
    let b = focal_plane * f / (focal_plane - f);
    let c = (focal_plane - f) / (focal_plane * d.depth_blur.f_stop * CIRCLE_OF_CONFUSION);
    return clamp(abs(a - b) * c, 0.0, d.depth_blur.max_blur);
}

@fragment
fn fs(in: VsOut) -> @location(0) vec4f {
    if d.material == 1u {
        let depth = clamp(in.view_depth, 0.0, d.depth_blur.far_plane);
        let packed_depth = pack16(depth / d.depth_blur.far_plane);
        let packed_blur = pack16(circle_of_confusion(depth) / d.depth_blur.max_blur);
        return vec4f(packed_depth, packed_blur);
    }

    if d.light_count == 0u {
        return d.color;
    }
    let n = normalize(in.normal);
    var lit = vec3f(d.ambient);
    for (var i = 0u; i < d.light_count; i++) {
        lit += d.light_colors[i].rgb * max(dot(n, d.light_directions[i].xyz), 0.0);
    }
    return vec4f(d.color.rgb * lit, d.color.a);
}
"#;

/// Fullscreen triangle shared by every composite; `uv` (0,0) is the top-left.
const FULLSCREEN: &str = r#"
struct VsOut {
    @builtin(position) clip: vec4f,
    @location(0) uv: vec2f,
}

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> VsOut {
    let x = f32((vi << 1u) & 2u);
    let y = f32(vi & 2u);
    var out: VsOut;
    out.clip = vec4f(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    out.uv = vec2f(x, y);
    return out;
}

@group(0) @binding(1) var tex0: texture_2d<f32>;
@group(0) @binding(2) var tex1: texture_2d<f32>;
@group(0) @binding(3) var linear_sampler: sampler;
@group(0) @binding(4) var nearest_sampler: sampler;
"#;

const ANAGLYPH_FRAGMENT: &str = r#"
struct Anaglyph {
    left_color: vec4f,
    right_color: vec4f,
    resolution: vec2f,
    screen_offset: f32,
    _pad: f32,
}

@group(0) @binding(0) var<uniform> u: Anaglyph;

@fragment
fn fs(in: VsOut) -> @location(0) vec4f {
    let shift = u.screen_offset / max(u.resolution.x, 1.0);
    var coord = in.uv;
    coord.x += shift;
    var color = textureSampleLevel(tex0, linear_sampler, coord, 0.0) * u.left_color;
    coord.x -= shift * 2.0;
    color += textureSampleLevel(tex1, linear_sampler, coord, 0.0) * u.right_color;
    return color;
}
"#;

const LENS_FRAGMENT: &str = r#"
struct Lens {
    distortion: vec4f,
    aberration: vec4f,
    lens_center_offset: vec2f,
    scale_in: vec2f,
    scale: vec2f,
    _pad: vec2f,
}

@group(0) @binding(0) var<uniform> u: Lens;

fn distort(coord: vec2f, ab: vec2f) -> vec2f {
    let lens = ((coord * 2.0 - 1.0) - u.lens_center_offset) * u.scale_in;
    let r_sq = dot(lens, lens);
    let r = vec4f(1.0, r_sq, r_sq * r_sq, r_sq * r_sq * r_sq);
    let factor = dot(ab, r.xy) * dot(u.distortion, r);
    return ((lens * factor * u.scale + u.lens_center_offset) + 1.0) / 2.0;
}

@fragment
fn fs(in: VsOut) -> @location(0) vec4f {
    let right_eye = in.uv.x > 0.5;
    var coord = in.uv;
    if right_eye {
        coord.x = 1.0 - coord.x;
    }
    coord.x *= 2.0;

    var blue = distort(coord, u.aberration.zw);
    if any(clamp(blue, vec2f(0.0), vec2f(1.0)) != blue) {
        discard;
    }
    var red = distort(coord, u.aberration.xy);
    var green = distort(coord, vec2f(1.0, 0.0));

    if right_eye {
        red.x = 1.0 - red.x;
        green.x = 1.0 - green.x;
        blue.x = 1.0 - blue.x;
        return vec4f(
            textureSampleLevel(tex1, linear_sampler, red, 0.0).r,
            textureSampleLevel(tex1, linear_sampler, green, 0.0).g,
            textureSampleLevel(tex1, linear_sampler, blue, 0.0).b,
            1.0,
        );
    }
    return vec4f(
        textureSampleLevel(tex0, linear_sampler, red, 0.0).r,
        textureSampleLevel(tex0, linear_sampler, green, 0.0).g,
        textureSampleLevel(tex0, linear_sampler, blue, 0.0).b,
        1.0,
    );
}
"#;

const BOKEH_FRAGMENT: &str = r#"
struct Bokeh {
    resolution: vec2f,
    f_stop: f32,
    max_blur: f32,
    z_far: f32,
    vign_out: f32,
    vign_in: f32,
    vign_fade: f32,
    threshold: f32,
    gain: f32,
    bias: f32,
    fringe: f32,
    noise_amount: f32,
    vignetting: u32,
    noise: u32,
    color_bleed: u32,
}

@group(0) @binding(0) var<uniform> u: Bokeh;

const IN_FOCUS_BLUR: f32 = 0.03;
const LUMA: vec3f = vec3f(0.299, 0.587, 0.114);

fn unpack16(packed: vec2f) -> f32 {
    return packed.x + packed.y / 255.0;
}

fn texel_size() -> vec2f {
    return 1.0 / max(u.resolution, vec2f(1.0));
}

// Tolerates edge0 > edge1, unlike the builtin.
fn step_between(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = clamp((x - edge0) / (edge1 - edge0), 0.0, 1.0);
    return t * t * (3.0 - 2.0 * t);
}

fn tap_color(coords: vec2f, blur: f32) -> vec3f {
    let spread = texel_size() * u.fringe * blur;
    let col = vec3f(
        textureSampleLevel(tex0, linear_sampler, coords + vec2f(0.0, 1.0) * spread, 0.0).r,
        textureSampleLevel(tex0, linear_sampler, coords + vec2f(-0.866, -0.5) * spread, 0.0).g,
        textureSampleLevel(tex0, linear_sampler, coords + vec2f(0.866, -0.5) * spread, 0.0).b,
    );
    let lum = dot(col, LUMA);
    let thresh = max((lum - u.threshold) * u.gain, 0.0);
    return col + col * (thresh * blur / u.max_blur);
}

fn hash(uv: vec2f, seed: vec2f) -> f32 {
    return clamp(fract(sin(dot(uv, seed)) * 43758.5453), 0.0, 1.0) * 2.0 - 1.0;
}

fn dither(uv: vec2f) -> vec2f {
    if u.noise != 0u {
        let seed = vec2f(12.9898, 78.233);
        return vec2f(hash(uv, seed), hash(uv, seed * 2.0));
    }
    let s = fract(1.0 - uv.x * (u.resolution.x / 2.0));
    let t = fract(uv.y * (u.resolution.y / 2.0));
    return vec2f((s * 0.25 + t * 0.75) * 2.0 - 1.0, (s * 0.75 + t * 0.25) * 2.0 - 1.0);
}

fn vignette(uv: vec2f) -> f32 {
    let dist = distance(uv, vec2f(0.5));
    let fade = u.f_stop / u.vign_fade;
    return clamp(step_between(u.vign_out + fade, u.vign_in + fade, dist), 0.0, 1.0);
}

@fragment
fn fs(in: VsOut) -> @location(0) vec4f {
    var kernel = array<vec3f, 12>(
        vec3f(-0.326212, -0.40581, 0.5206688),
        vec3f(-0.840144, -0.07358, 0.8433599),
        vec3f(-0.695914, 0.457137, 0.8326287),
        vec3f(-0.203345, 0.620716, 0.65317497),
        vec3f(0.96234, -0.194983, 0.9818944),
        vec3f(0.473434, -0.480026, 0.6742141),
        vec3f(0.519456, 0.767022, 0.9263678),
        vec3f(0.185461, -0.893124, 0.9121767),
        vec3f(0.507431, 0.064425, 0.51150445),
        vec3f(0.89642, 0.412458, 0.9867575),
        vec3f(-0.32194, -0.932615, 0.9866185),
        vec3f(-0.791559, -0.59771, 0.9918785),
    );

    let packed = textureSampleLevel(tex1, nearest_sampler, in.uv, 0.0);
    let depth = unpack16(packed.xy) * u.z_far;
    let blur = unpack16(packed.zw) * u.max_blur;

    let noise = dither(in.uv) * u.noise_amount * blur;
    let scale = texel_size() * blur + noise;

    var col = textureSampleLevel(tex0, linear_sampler, in.uv, 0.0).rgb;

    if blur > IN_FOCUS_BLUR {
        var total = 1.0;
        for (var i = 0u; i < 12u; i++) {
            let tap = kernel[i];
            let tap_coord = in.uv + scale * tap.xy;
            let tap_packed = textureSampleLevel(tex1, nearest_sampler, tap_coord, 0.0);
            let tap_depth = unpack16(tap_packed.xy) * u.z_far;
            let tap_blur = unpack16(tap_packed.zw);
            let bias_mix = 1.0 + (tap.z - 0.5) * u.bias;
            var tap_sample = tap_color(tap_coord, blur) * bias_mix;
            if tap_depth < depth && u.color_bleed == 0u {
                tap_sample *= tap_blur;
                total += tap_blur * bias_mix;
            } else {
                total += bias_mix;
            }
            col += tap_sample;
        }
        col /= total;
    }

    if u.vignetting != 0u {
        col *= vignette(in.uv);
    }

    return vec4f(col, 1.0);
}
"#;

const COPY_FRAGMENT: &str = r#"
@fragment
fn fs(in: VsOut) -> @location(0) vec4f {
    return textureSampleLevel(tex0, linear_sampler, in.uv, 0.0);
}
"#;

pub(crate) fn anaglyph() -> String {
    format!("{FULLSCREEN}{ANAGLYPH_FRAGMENT}")
}

pub(crate) fn lens() -> String {
    format!("{FULLSCREEN}{LENS_FRAGMENT}")
}

pub(crate) fn bokeh() -> String {
    format!("{FULLSCREEN}{BOKEH_FRAGMENT}")
}

pub(crate) fn copy() -> String {
    format!("{FULLSCREEN}{COPY_FRAGMENT}")
}
