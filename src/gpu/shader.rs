//! Shader management
//!
//! GLSL ES 3.00 sources and program compilation. Every program draws
//! instanced quads: four triangle-strip vertices per instance, corners
//! derived from `gl_VertexID`, and pixel coordinates mapped to NDC through
//! the shared `u_viewport_scale` uniform.

use anyhow::{anyhow, Result};
use glow::HasContext;
use log::info;

/// Glyph quad vertex shader
///
/// Per-instance input:
///   a_rect:     target origin and size (pixels)
///   a_tex_rect: atlas origin and size (normalized)
///   a_layer:    atlas layer
///   a_color:    text color (RGBA)
const GLYPH_VERTEX_SHADER: &str = r#"#version 300 es
precision highp float;

layout(location = 0) in vec4 a_rect;
layout(location = 1) in vec4 a_tex_rect;
layout(location = 2) in float a_layer;
layout(location = 3) in vec4 a_color;

uniform vec2 u_viewport_scale;

out vec3 v_tex;
flat out vec4 v_color;

void main() {
    // gl_VertexID: 0=TL, 1=TR, 2=BL, 3=BR (triangle strip order)
    vec2 corner = vec2(
        float(gl_VertexID & 1),
        float((gl_VertexID >> 1) & 1)
    );

    vec2 pos = a_rect.xy + corner * a_rect.zw;
    gl_Position = vec4(pos * u_viewport_scale + vec2(-1.0, 1.0), 0.0, 1.0);
    v_tex = vec3(a_tex_rect.xy + corner * a_tex_rect.zw, a_layer);
    v_color = a_color;
}
"#;

/// Coverage correction shared by both passes of the two-pass pipeline.
///
/// The atlas holds linear coverage. Light text on a dark background needs
/// a fuller ramp than dark text on a light one, so the coverage is bent
/// towards the black-background or the white-background curve depending
/// on the foreground luminance.
macro_rules! coverage_fragment_prelude {
    () => {
        r#"#version 300 es
precision highp float;
precision mediump sampler2DArray;

in vec3 v_tex;
flat in vec4 v_color;

uniform sampler2DArray u_atlas;

out vec4 frag_color;

float corrected_coverage() {
    float alpha = texture(u_atlas, v_tex).a;
    float luma = dot(v_color.rgb * v_color.rgb, vec3(0.2126, 0.7152, 0.0722));
    float on_black = sqrt(alpha);
    float on_white = 1.0 - sqrt(1.0 - alpha);
    return mix(on_white, on_black, luma) * v_color.a;
}
"#
    };
}

/// Pass 1: darken the destination by the coverage
/// (blend ZERO, ONE_MINUS_SRC_COLOR)
const COVERAGE_FRAGMENT_SHADER: &str = concat!(
    coverage_fragment_prelude!(),
    r#"
void main() {
    float coverage = corrected_coverage();
    frag_color = vec4(vec3(coverage), coverage);
}
"#
);

/// Pass 2: add the tinted coverage (blend ONE, ONE)
const COLOR_FRAGMENT_SHADER: &str = concat!(
    coverage_fragment_prelude!(),
    r#"
void main() {
    float coverage = corrected_coverage();
    frag_color = vec4(v_color.rgb * coverage, coverage);
}
"#
);

/// Single pass with premultiplied alpha (blend ONE, ONE_MINUS_SRC_ALPHA)
const PREMULTIPLIED_FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;
precision mediump sampler2DArray;

in vec3 v_tex;
flat in vec4 v_color;

uniform sampler2DArray u_atlas;

out vec4 frag_color;

void main() {
    float alpha = texture(u_atlas, v_tex).a * v_color.a;
    frag_color = vec4(v_color.rgb * alpha, alpha);
}
"#;

/// Solid quad vertex shader (backgrounds, cursor, underline)
const SOLID_VERTEX_SHADER: &str = r#"#version 300 es
precision highp float;

layout(location = 0) in vec4 a_rect;
layout(location = 1) in vec4 a_color;

uniform vec2 u_viewport_scale;

flat out vec4 v_color;

void main() {
    vec2 corner = vec2(
        float(gl_VertexID & 1),
        float((gl_VertexID >> 1) & 1)
    );

    vec2 pos = a_rect.xy + corner * a_rect.zw;
    gl_Position = vec4(pos * u_viewport_scale + vec2(-1.0, 1.0), 0.0, 1.0);
    v_color = a_color;
}
"#;

const SOLID_FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;

flat in vec4 v_color;

out vec4 frag_color;

void main() {
    frag_color = v_color;
}
"#;

/// Which fragment program a [`QuadShader`] runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Solid,
    Coverage,
    Color,
    Premultiplied,
}

impl ShaderKind {
    fn sources(self) -> (&'static str, &'static str) {
        match self {
            ShaderKind::Solid => (SOLID_VERTEX_SHADER, SOLID_FRAGMENT_SHADER),
            ShaderKind::Coverage => (GLYPH_VERTEX_SHADER, COVERAGE_FRAGMENT_SHADER),
            ShaderKind::Color => (GLYPH_VERTEX_SHADER, COLOR_FRAGMENT_SHADER),
            ShaderKind::Premultiplied => (GLYPH_VERTEX_SHADER, PREMULTIPLIED_FRAGMENT_SHADER),
        }
    }

    fn samples_atlas(self) -> bool {
        self != ShaderKind::Solid
    }
}

/// Compiled instanced-quad program
pub struct QuadShader {
    kind: ShaderKind,
    program: glow::Program,
    pub u_viewport_scale: glow::UniformLocation,
    pub u_atlas: Option<glow::UniformLocation>,
}

impl QuadShader {
    pub fn new(gl: &glow::Context, kind: ShaderKind) -> Result<Self> {
        let (vertex_src, fragment_src) = kind.sources();
        let program = compile_program(gl, vertex_src, fragment_src)?;

        let u_viewport_scale = unsafe {
            gl.get_uniform_location(program, "u_viewport_scale")
                .ok_or_else(|| anyhow!("u_viewport_scale uniform not found ({:?})", kind))?
        };
        let u_atlas = if kind.samples_atlas() {
            let location = unsafe {
                gl.get_uniform_location(program, "u_atlas")
                    .ok_or_else(|| anyhow!("u_atlas uniform not found ({:?})", kind))?
            };
            Some(location)
        } else {
            None
        };

        info!("Quad shader compiled ({:?})", kind);
        Ok(Self {
            kind,
            program,
            u_viewport_scale,
            u_atlas,
        })
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    /// Activate the shader
    pub fn bind(&self, gl: &glow::Context) {
        unsafe {
            gl.use_program(Some(self.program));
        }
    }

    pub fn set_viewport_scale(&self, gl: &glow::Context, scale: [f32; 2]) {
        unsafe {
            gl.uniform_2_f32(Some(&self.u_viewport_scale), scale[0], scale[1]);
        }
    }

    /// Set atlas texture unit (no-op for solid quads)
    pub fn set_atlas_unit(&self, gl: &glow::Context, unit: i32) {
        if let Some(location) = &self.u_atlas {
            unsafe {
                gl.uniform_1_i32(Some(location), unit);
            }
        }
    }

    /// Release resources
    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_program(self.program);
        }
    }
}

/// Scale mapping pixel coordinates (top-left origin) to NDC
///
/// `ndc = pixel * scale + (-1, 1)`
pub fn viewport_scale(width: f32, height: f32) -> [f32; 2] {
    [2.0 / width.max(1.0), -2.0 / height.max(1.0)]
}

/// Compile shader and link program
fn compile_program(gl: &glow::Context, vertex_src: &str, fragment_src: &str) -> Result<glow::Program> {
    unsafe {
        let vs = compile_shader(gl, glow::VERTEX_SHADER, vertex_src)?;
        let fs = match compile_shader(gl, glow::FRAGMENT_SHADER, fragment_src) {
            Ok(fs) => fs,
            Err(e) => {
                gl.delete_shader(vs);
                return Err(e);
            }
        };

        let program = gl
            .create_program()
            .map_err(|e| anyhow!("Failed to create program: {}", e))?;

        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(anyhow!("Shader link failed: {}", log));
        }

        // Shader objects no longer needed after linking
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        Ok(program)
    }
}

/// Compile individual shader
fn compile_shader(gl: &glow::Context, shader_type: u32, source: &str) -> Result<glow::Shader> {
    unsafe {
        let shader = gl
            .create_shader(shader_type)
            .map_err(|e| anyhow!("Failed to create shader: {}", e))?;

        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            let type_name = match shader_type {
                glow::VERTEX_SHADER => "vertex",
                glow::FRAGMENT_SHADER => "fragment",
                _ => "unknown",
            };
            return Err(anyhow!("{} shader compile failed: {}", type_name, log));
        }

        Ok(shader)
    }
}
