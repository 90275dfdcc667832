//! binoc GL utility layer (glow/OpenGL backend).
//
// This crate intentionally contains **only** thin GPU resource wrappers:
// - compile/link shader programs
// - manage render targets (FBO + texture, optional depth/stencil)
// - create textures from raw pixels and draw rect-to-rect textured quads
//
// It does NOT contain windowing, stereo policy, or compositing rules.
#![allow(clippy::missing_safety_doc)]

use glow::HasContext;

pub use binoc_core::StereoError;

mod texture;

pub use texture::{create_texture, PixelFormat, TexQuad, QUAD_VERT, TEX_FRAG};

/// Offscreen render target: FBO + color texture, plus an optional combined
/// depth/stencil renderbuffer for stimulus code that depth-tests or clips.
#[derive(Debug)]
pub struct RenderTarget {
    pub fbo: glow::NativeFramebuffer,
    pub tex: glow::NativeTexture,
    depth_stencil: Option<glow::NativeRenderbuffer>,
    pub w: i32,
    pub h: i32,
}

impl RenderTarget {
    /// Color-only target.
    pub unsafe fn new(gl: &glow::Context, w: i32, h: i32) -> Result<Self, StereoError> {
        Self::create(gl, w, h, false)
    }

    /// Target with a DEPTH24_STENCIL8 renderbuffer attached.
    pub unsafe fn with_depth_stencil(
        gl: &glow::Context,
        w: i32,
        h: i32,
    ) -> Result<Self, StereoError> {
        Self::create(gl, w, h, true)
    }

    unsafe fn create(
        gl: &glow::Context,
        w: i32,
        h: i32,
        depth_stencil: bool,
    ) -> Result<Self, StereoError> {
        let fbo = gl
            .create_framebuffer()
            .map_err(|e| StereoError::GlCreate(format!("create_framebuffer failed: {e:?}")))?;
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

        let ww = w.max(1);
        let hh = h.max(1);
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            ww,
            hh,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            None,
        );

        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(tex),
            0,
        );

        let rbo = if depth_stencil {
            let rbo = gl.create_renderbuffer().map_err(|e| {
                StereoError::GlCreate(format!("create_renderbuffer failed: {e:?}"))
            })?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(rbo));
            gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH24_STENCIL8, ww, hh);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_STENCIL_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(rbo),
            );
            Some(rbo)
        } else {
            None
        };

        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        if status != glow::FRAMEBUFFER_COMPLETE {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.delete_framebuffer(fbo);
            gl.delete_texture(tex);
            if let Some(rbo) = rbo {
                gl.delete_renderbuffer(rbo);
            }
            return Err(StereoError::GlCreate(format!(
                "framebuffer incomplete: 0x{status:x}"
            )));
        }

        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.bind_texture(glow::TEXTURE_2D, None);

        Ok(RenderTarget {
            fbo,
            tex,
            depth_stencil: rbo,
            w: ww,
            h: hh,
        })
    }

    /// Reallocate texture (and renderbuffer) storage at a new size.
    /// Keeps the same FBO/texture ids.
    pub unsafe fn resize(&mut self, gl: &glow::Context, w: i32, h: i32) {
        self.w = w.max(1);
        self.h = h.max(1);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.tex));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            self.w,
            self.h,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            None,
        );
        gl.bind_texture(glow::TEXTURE_2D, None);
        if let Some(rbo) = self.depth_stencil {
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(rbo));
            gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH24_STENCIL8, self.w, self.h);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
        }
    }

    /// Resize only if the requested size differs; idempotent otherwise.
    pub unsafe fn ensure_size(&mut self, gl: &glow::Context, w: i32, h: i32) {
        if self.w != w.max(1) || self.h != h.max(1) {
            self.resize(gl, w, h);
        }
    }

    /// Read-only view of the backing color texture, for `draw_texture`-style
    /// use. Callers must not mutate it outside this target's own draws.
    pub fn as_texture(&self) -> glow::NativeTexture {
        self.tex
    }

    /// Bind this target and clear its color buffer (and depth/stencil when
    /// attached).
    pub unsafe fn clear(&self, gl: &glow::Context, rgba: [f32; 4]) {
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
        gl.viewport(0, 0, self.w, self.h);
        gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]);
        let mut bits = glow::COLOR_BUFFER_BIT;
        if self.depth_stencil.is_some() {
            bits |= glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT;
        }
        gl.clear(bits);
    }

    /// Explicit teardown. GL objects must be deleted on the context's
    /// thread, so there is no Drop impl.
    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_framebuffer(self.fbo);
        gl.delete_texture(self.tex);
        if let Some(rbo) = self.depth_stencil.take() {
            gl.delete_renderbuffer(rbo);
        }
    }
}

pub unsafe fn compile_program(
    gl: &glow::Context,
    vert_src: &str,
    frag_src: &str,
) -> Result<glow::NativeProgram, StereoError> {
    let vs = gl
        .create_shader(glow::VERTEX_SHADER)
        .map_err(|e| StereoError::GlCreate(format!("create_shader(VS) failed: {e:?}")))?;
    gl.shader_source(vs, vert_src);
    gl.compile_shader(vs);
    if !gl.get_shader_compile_status(vs) {
        let log = gl.get_shader_info_log(vs);
        gl.delete_shader(vs);
        return Err(StereoError::VertexCompile(log));
    }

    let fs = gl
        .create_shader(glow::FRAGMENT_SHADER)
        .map_err(|e| StereoError::GlCreate(format!("create_shader(FS) failed: {e:?}")))?;
    gl.shader_source(fs, frag_src);
    gl.compile_shader(fs);
    if !gl.get_shader_compile_status(fs) {
        let log = gl.get_shader_info_log(fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        return Err(StereoError::FragmentCompile(log));
    }

    let program = gl
        .create_program()
        .map_err(|e| StereoError::GlCreate(format!("create_program failed: {e:?}")))?;
    gl.attach_shader(program, vs);
    gl.attach_shader(program, fs);
    gl.link_program(program);

    gl.detach_shader(program, vs);
    gl.detach_shader(program, fs);
    gl.delete_shader(vs);
    gl.delete_shader(fs);

    if !gl.get_program_link_status(program) {
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        return Err(StereoError::Link(log));
    }

    Ok(program)
}
