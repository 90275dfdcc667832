//! Offscreen framebuffer cache.
//!
//! Draw a slow scene once into the cache, then replay it as a texture for
//! as many frames (and into as many eye buffers) as needed. Contents
//! persist across flips until the next bind cycle overwrites them.
//!
//! `bind()` saves the previously bound draw framebuffer and viewport and
//! redirects drawing into the cache; `unbind()` restores them and marks the
//! content ready. `draw()` refuses to replay until one full cycle has
//! completed.
//!
//! A bind cycle may start inside an eye selection: `bind()` lifts the
//! eye's scissor and color mask so the fill reaches the whole cache
//! unclipped and untinted, and `unbind()` puts them back. Switching eyes
//! mid-cycle still rebinds the framebuffer and redirects the rest of the
//! cycle's draws away from the cache; complete the cycle first. The cached
//! content is eye-neutral; replay it into whichever eye is selected at
//! `draw()` time.
#![allow(clippy::missing_safety_doc)]

use std::num::NonZeroU32;

use glow::HasContext;

use binoc_glow::{RenderTarget, TexQuad};

pub use binoc_core::StereoError;

/// The cache's bind/ready protocol, kept separate from GL so the
/// transitions are testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheState {
    bound: bool,
    ready: bool,
}

impl CacheState {
    pub fn bind(&mut self) -> Result<(), StereoError> {
        if self.bound {
            return Err(StereoError::AlreadyBound);
        }
        self.bound = true;
        Ok(())
    }

    pub fn unbind(&mut self) -> Result<(), StereoError> {
        if !self.bound {
            return Err(StereoError::NotBound);
        }
        self.bound = false;
        self.ready = true;
        Ok(())
    }

    /// Replay is valid only between completed bind cycles.
    pub fn check_draw(self) -> Result<(), StereoError> {
        if self.bound {
            return Err(StereoError::AlreadyBound);
        }
        if !self.ready {
            return Err(StereoError::NotReady);
        }
        Ok(())
    }

    /// Storage was reallocated; the old content is gone.
    pub fn invalidate(&mut self) {
        self.ready = false;
    }

    pub fn is_bound(self) -> bool {
        self.bound
    }

    pub fn is_ready(self) -> bool {
        self.ready
    }
}

/// Draw state captured at `bind` and restored at `unbind`. An eye
/// selection leaves a scissor and a color mask active; both are lifted for
/// the duration of the cycle so the fill reaches the whole cache.
#[derive(Debug, Clone, Copy, Default)]
struct SavedDrawState {
    fbo: Option<glow::NativeFramebuffer>,
    viewport: [i32; 4],
    scissor_on: bool,
    color_mask: [bool; 4],
}

fn mask_from_raw(raw: [i32; 4]) -> [bool; 4] {
    raw.map(|v| v != 0)
}

/// A cached offscreen target plus the GL state saved across a bind cycle.
#[derive(Debug)]
pub struct OffscreenCache {
    target: RenderTarget,
    state: CacheState,
    saved: SavedDrawState,
}

impl OffscreenCache {
    pub unsafe fn new(gl: &glow::Context, w: i32, h: i32) -> Result<Self, StereoError> {
        Ok(Self {
            target: RenderTarget::with_depth_stencil(gl, w, h)?,
            state: CacheState::default(),
            saved: SavedDrawState::default(),
        })
    }

    pub fn size(&self) -> (i32, i32) {
        (self.target.w, self.target.h)
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    /// The cached color texture, for callers that want to sample it with
    /// their own shaders.
    pub fn as_texture(&self) -> glow::NativeTexture {
        self.target.tex
    }

    /// Redirect drawing into the cache. Saves the current draw framebuffer,
    /// viewport, scissor, and color mask for `unbind` to restore, and lifts
    /// the scissor and mask so the fill covers the whole cache.
    pub unsafe fn bind(&mut self, gl: &glow::Context) -> Result<(), StereoError> {
        self.state.bind()?;

        let fbo_id = gl.get_parameter_i32(glow::DRAW_FRAMEBUFFER_BINDING);
        self.saved.fbo =
            NonZeroU32::new(fbo_id as u32).map(glow::NativeFramebuffer);
        gl.get_parameter_i32_slice(glow::VIEWPORT, &mut self.saved.viewport);
        self.saved.scissor_on = gl.is_enabled(glow::SCISSOR_TEST);
        let mut raw_mask = [0i32; 4];
        gl.get_parameter_i32_slice(glow::COLOR_WRITEMASK, &mut raw_mask);
        self.saved.color_mask = mask_from_raw(raw_mask);

        gl.disable(glow::SCISSOR_TEST);
        gl.color_mask(true, true, true, true);
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.target.fbo));
        gl.viewport(0, 0, self.target.w, self.target.h);
        Ok(())
    }

    /// Restore the saved draw state; the content becomes replayable.
    pub unsafe fn unbind(&mut self, gl: &glow::Context) -> Result<(), StereoError> {
        self.state.unbind()?;

        gl.bind_framebuffer(glow::FRAMEBUFFER, self.saved.fbo);
        let [x, y, w, h] = self.saved.viewport;
        gl.viewport(x, y, w, h);
        if self.saved.scissor_on {
            gl.enable(glow::SCISSOR_TEST);
        } else {
            gl.disable(glow::SCISSOR_TEST);
        }
        let [r, g, b, a] = self.saved.color_mask;
        gl.color_mask(r, g, b, a);
        Ok(())
    }

    /// Bind with a guard that restores on drop, for fill code that can bail
    /// early with `?`.
    pub unsafe fn scope<'a>(
        &'a mut self,
        gl: &'a glow::Context,
    ) -> Result<CacheScope<'a>, StereoError> {
        self.bind(gl)?;
        Ok(CacheScope {
            cache: Some(self),
            gl,
        })
    }

    /// Clear the cache's color (and depth/stencil) while bound.
    pub unsafe fn clear(&self, gl: &glow::Context, rgba: [f32; 4]) {
        self.target.clear(gl, rgba);
    }

    /// Replay the cached content into `dst_rect` of the current framebuffer
    /// (whole target when `None`).
    pub unsafe fn draw(
        &self,
        gl: &glow::Context,
        quad: &TexQuad,
        src_rect: Option<[f32; 4]>,
        dst_rect: Option<[f32; 4]>,
    ) -> Result<(), StereoError> {
        self.state.check_draw()?;
        quad.draw(gl, self.target.tex, src_rect, dst_rect);
        Ok(())
    }

    /// Reallocate at a new size. Old content is discarded, so the cache
    /// must complete another bind cycle before the next `draw`.
    pub unsafe fn resize(&mut self, gl: &glow::Context, w: i32, h: i32) {
        self.target.resize(gl, w, h);
        self.state.invalidate();
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        self.target.destroy(gl);
    }
}

/// Drop guard returned by [`OffscreenCache::scope`]. Restores the saved
/// framebuffer state even when the fill code errors out.
pub struct CacheScope<'a> {
    cache: Option<&'a mut OffscreenCache>,
    gl: &'a glow::Context,
}

impl std::fmt::Debug for CacheScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheScope").finish_non_exhaustive()
    }
}

impl CacheScope<'_> {
    /// Explicit unbind, surfacing any protocol error instead of swallowing
    /// it in drop.
    pub unsafe fn finish(mut self) -> Result<(), StereoError> {
        match self.cache.take() {
            Some(cache) => cache.unbind(self.gl),
            None => Ok(()),
        }
    }
}

impl Drop for CacheScope<'_> {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.take() {
            // Guard lifetime keeps us on the context's thread.
            let _ = unsafe { cache.unbind(self.gl) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_before_any_cycle_is_not_ready() {
        let state = CacheState::default();
        assert!(matches!(state.check_draw(), Err(StereoError::NotReady)));
    }

    #[test]
    fn one_cycle_makes_content_ready() {
        let mut state = CacheState::default();
        state.bind().unwrap();
        assert!(state.is_bound());
        state.unbind().unwrap();
        assert!(state.is_ready());
        assert!(state.check_draw().is_ok());
    }

    #[test]
    fn reentrant_bind_is_rejected() {
        let mut state = CacheState::default();
        state.bind().unwrap();
        assert!(matches!(state.bind(), Err(StereoError::AlreadyBound)));
        // The failed bind does not disturb the cycle in progress.
        state.unbind().unwrap();
    }

    #[test]
    fn unbind_without_bind_is_rejected() {
        let mut state = CacheState::default();
        assert!(matches!(state.unbind(), Err(StereoError::NotBound)));
    }

    #[test]
    fn draw_mid_bind_is_rejected() {
        let mut state = CacheState::default();
        state.bind().unwrap();
        state.unbind().unwrap();
        state.bind().unwrap();
        // Ready from the first cycle, but recording again right now.
        assert!(matches!(state.check_draw(), Err(StereoError::AlreadyBound)));
    }

    #[test]
    fn raw_write_mask_maps_to_booleans() {
        assert_eq!(
            mask_from_raw([1, 0, 1, 0]),
            [true, false, true, false]
        );
        assert_eq!(mask_from_raw([0; 4]), [false; 4]);
        assert_eq!(mask_from_raw([1; 4]), [true; 4]);
    }

    #[test]
    fn resize_invalidates_until_the_next_cycle() {
        let mut state = CacheState::default();
        state.bind().unwrap();
        state.unbind().unwrap();
        state.invalidate();
        assert!(matches!(state.check_draw(), Err(StereoError::NotReady)));
        state.bind().unwrap();
        state.unbind().unwrap();
        assert!(state.check_draw().is_ok());
    }
}
