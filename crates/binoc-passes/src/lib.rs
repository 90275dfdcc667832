//! Compositing shader set for the stereo router.
//!
//! One program per compositing need: plain passthrough lives on
//! [`TexQuad`](binoc_glow::TexQuad) itself; this crate adds the channel-mask
//! and cross-talk compensation passes. Half-copies with scale are expressed
//! through the quad's src/dst rect uniforms rather than dedicated shaders.
#![allow(clippy::missing_safety_doc)]

use glow::HasContext;

use binoc_glow::{compile_program, StereoError, TexQuad, QUAD_VERT};

/// Multiply the sampled texture by a channel-selection vector, e.g.
/// `[1,0,0,1]` to replay cached content into the red channel only.
pub const CHANNEL_MASK_FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 o;
uniform sampler2D u_tex;
uniform vec4 u_channels;
void main() { o = texture(u_tex, v_uv) * u_channels; }
"#;

/// Subtract a weighted ghost of the opposite eye's previous image and clamp.
/// The coefficient is applied isotropically across RGB.
pub const ANTICROSS_FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 o;
uniform sampler2D u_this;
uniform sampler2D u_other;
uniform vec3 u_cross_talk;
void main() {
    vec3 c = texture(u_this, v_uv).rgb;
    vec3 ghost = texture(u_other, v_uv).rgb;
    o = vec4(clamp(c - u_cross_talk * ghost, 0.0, 1.0), 1.0);
}
"#;

/// Compiled composite programs, owned for the life of the router.
#[derive(Debug)]
pub struct CompositePasses {
    pub channel_mask: glow::NativeProgram,
    pub anticross: glow::NativeProgram,
}

impl CompositePasses {
    pub unsafe fn new(gl: &glow::Context) -> Result<Self, StereoError> {
        Ok(Self {
            channel_mask: compile_program(gl, QUAD_VERT, CHANNEL_MASK_FRAG)?,
            anticross: compile_program(gl, QUAD_VERT, ANTICROSS_FRAG)?,
        })
    }

    /// Draw one eye's compensated image: `clamp(this - ct * other, 0, 1)`.
    ///
    /// `other` is the opposite eye's previous-frame texture.
    pub unsafe fn draw_anticross(
        &self,
        gl: &glow::Context,
        quad: &TexQuad,
        this_tex: glow::NativeTexture,
        other_tex: glow::NativeTexture,
        cross_talk: f32,
        src_uv: [f32; 4],
        dst_ndc: [f32; 4],
    ) {
        gl.use_program(Some(self.anticross));
        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(this_tex));
        gl.active_texture(glow::TEXTURE1);
        gl.bind_texture(glow::TEXTURE_2D, Some(other_tex));
        if let Some(loc) = gl.get_uniform_location(self.anticross, "u_this") {
            gl.uniform_1_i32(Some(&loc), 0);
        }
        if let Some(loc) = gl.get_uniform_location(self.anticross, "u_other") {
            gl.uniform_1_i32(Some(&loc), 1);
        }
        if let Some(loc) = gl.get_uniform_location(self.anticross, "u_cross_talk") {
            gl.uniform_3_f32(Some(&loc), cross_talk, cross_talk, cross_talk);
        }
        quad.draw_with(gl, self.anticross, Some(src_uv), Some(dst_ndc));
        gl.active_texture(glow::TEXTURE0);
        gl.use_program(None);
    }

    /// Draw `tex` multiplied by a channel-selection vector.
    pub unsafe fn draw_channel_masked(
        &self,
        gl: &glow::Context,
        quad: &TexQuad,
        tex: glow::NativeTexture,
        channels: [f32; 4],
        src_uv: Option<[f32; 4]>,
        dst_ndc: Option<[f32; 4]>,
    ) {
        gl.use_program(Some(self.channel_mask));
        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(tex));
        if let Some(loc) = gl.get_uniform_location(self.channel_mask, "u_tex") {
            gl.uniform_1_i32(Some(&loc), 0);
        }
        if let Some(loc) = gl.get_uniform_location(self.channel_mask, "u_channels") {
            gl.uniform_4_f32(
                Some(&loc),
                channels[0],
                channels[1],
                channels[2],
                channels[3],
            );
        }
        quad.draw_with(gl, self.channel_mask, src_uv, dst_ndc);
        gl.use_program(None);
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_program(self.channel_mask);
        gl.delete_program(self.anticross);
    }
}
