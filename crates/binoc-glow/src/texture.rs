//! Texture creation and the shared rect-to-rect quad primitive.

use glow::HasContext;

use binoc_core::StereoError;

/// Pixel layouts accepted by [`create_texture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    const fn gl_format(self) -> u32 {
        match self {
            PixelFormat::Rgb8 => glow::RGB,
            PixelFormat::Rgba8 => glow::RGBA,
        }
    }

    const fn gl_internal(self) -> i32 {
        match self {
            PixelFormat::Rgb8 => glow::RGB8 as i32,
            PixelFormat::Rgba8 => glow::RGBA8 as i32,
        }
    }
}

/// Wrap raw pixel data into a drawable 2D texture (linear filtered,
/// clamp-to-edge). Row order is bottom-up, GL convention.
pub unsafe fn create_texture(
    gl: &glow::Context,
    w: i32,
    h: i32,
    format: PixelFormat,
    pixels: &[u8],
) -> Result<glow::NativeTexture, StereoError> {
    let expected = w.max(0) as usize * h.max(0) as usize * format.bytes_per_pixel();
    if pixels.len() != expected {
        return Err(StereoError::UnsupportedFormat(format!(
            "{w}x{h} {format:?} needs {expected} bytes, got {}",
            pixels.len()
        )));
    }

    let tex = gl
        .create_texture()
        .map_err(|e| StereoError::GlCreate(format!("create_texture failed: {e:?}")))?;
    gl.bind_texture(glow::TEXTURE_2D, Some(tex));
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_MIN_FILTER,
        glow::LINEAR as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_MAG_FILTER,
        glow::LINEAR as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_WRAP_S,
        glow::CLAMP_TO_EDGE as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_WRAP_T,
        glow::CLAMP_TO_EDGE as i32,
    );

    // RGB ubyte rows are not 4-byte aligned in general.
    if format == PixelFormat::Rgb8 {
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
    }
    gl.tex_image_2d(
        glow::TEXTURE_2D,
        0,
        format.gl_internal(),
        w,
        h,
        0,
        format.gl_format(),
        glow::UNSIGNED_BYTE,
        Some(pixels),
    );
    if format == PixelFormat::Rgb8 {
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
    }
    gl.bind_texture(glow::TEXTURE_2D, None);
    Ok(tex)
}

/// Vertex shader shared by every quad-based pass: a unit quad stretched to a
/// destination rect in NDC, sampling a source rect in texture coordinates.
pub const QUAD_VERT: &str = r#"#version 330 core
layout (location = 0) in vec2 a_unit;
uniform vec4 u_dst; // [x0, y0, x1, y1] in NDC
uniform vec4 u_src; // [u0, v0, u1, v1] in texture coords
out vec2 v_uv;
void main() {
    vec2 p = mix(u_dst.xy, u_dst.zw, a_unit);
    v_uv = mix(u_src.xy, u_src.zw, a_unit);
    gl_Position = vec4(p, 0.0, 1.0);
}
"#;

pub const TEX_FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 o;
uniform sampler2D u_tex;
void main() { o = texture(u_tex, v_uv); }
"#;

const WHOLE_SRC: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
const WHOLE_DST: [f32; 4] = [-1.0, -1.0, 1.0, 1.0];

/// Rect-to-rect textured quad: the primitive underlying both the flip-time
/// composites and the offscreen cache's `draw()`.
#[derive(Debug)]
pub struct TexQuad {
    vao: glow::NativeVertexArray,
    vbo: glow::NativeBuffer,
    ebo: glow::NativeBuffer,
    program: glow::NativeProgram,
}

impl TexQuad {
    pub unsafe fn new(gl: &glow::Context) -> Result<Self, StereoError> {
        // Unit quad corners; rect placement happens in the vertex shader.
        let verts: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let indices: [u32; 6] = [0, 1, 2, 2, 3, 0];

        let vao = gl
            .create_vertex_array()
            .map_err(|e| StereoError::GlCreate(format!("create_vertex_array: {e}")))?;
        let vbo = gl
            .create_buffer()
            .map_err(|e| StereoError::GlCreate(format!("create_buffer: {e}")))?;
        let ebo = gl
            .create_buffer()
            .map_err(|e| StereoError::GlCreate(format!("create_buffer: {e}")))?;

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&verts),
            glow::STATIC_DRAW,
        );
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
        gl.buffer_data_u8_slice(
            glow::ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(&indices),
            glow::STATIC_DRAW,
        );

        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, 2 * 4, 0);

        // Release in this order; a bound ELEMENT_ARRAY_BUFFER is VAO state.
        gl.bind_vertex_array(None);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);

        let program = super::compile_program(gl, QUAD_VERT, TEX_FRAG)?;

        Ok(Self {
            vao,
            vbo,
            ebo,
            program,
        })
    }

    /// Draw `tex` with the built-in passthrough program.
    ///
    /// `src_rect` defaults to the whole texture, `dst_rect` to the whole
    /// target.
    pub unsafe fn draw(
        &self,
        gl: &glow::Context,
        tex: glow::NativeTexture,
        src_rect: Option<[f32; 4]>,
        dst_rect: Option<[f32; 4]>,
    ) {
        gl.use_program(Some(self.program));
        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(tex));
        if let Some(loc) = gl.get_uniform_location(self.program, "u_tex") {
            gl.uniform_1_i32(Some(&loc), 0);
        }
        self.draw_with(gl, self.program, src_rect, dst_rect);
        gl.use_program(None);
    }

    /// Draw with a caller-supplied program (textures and extra uniforms
    /// already bound). The program must use [`QUAD_VERT`] as its vertex
    /// stage so the rect uniforms exist.
    pub unsafe fn draw_with(
        &self,
        gl: &glow::Context,
        program: glow::NativeProgram,
        src_rect: Option<[f32; 4]>,
        dst_rect: Option<[f32; 4]>,
    ) {
        let src = src_rect.unwrap_or(WHOLE_SRC);
        let dst = dst_rect.unwrap_or(WHOLE_DST);
        if let Some(loc) = gl.get_uniform_location(program, "u_src") {
            gl.uniform_4_f32(Some(&loc), src[0], src[1], src[2], src[3]);
        }
        if let Some(loc) = gl.get_uniform_location(program, "u_dst") {
            gl.uniform_4_f32(Some(&loc), dst[0], dst[1], dst[2], dst[3]);
        }
        gl.bind_vertex_array(Some(self.vao));
        gl.draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_INT, 0);
        gl.bind_vertex_array(None);
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_vertex_array(self.vao);
        gl.delete_buffer(self.vbo);
        gl.delete_buffer(self.ebo);
        gl.delete_program(self.program);
    }
}
