//! Eye-buffer router: the glow backend that applies a resolved
//! [`RoutePlan`].
//!
//! Stimulus code follows one protocol under every mode:
//! `set_buffer(Left)` / draw / `set_buffer(Right)` / draw / `flip()`.
//! The router binds targets, viewports, scissors, and color masks per the
//! plan, runs the flip-time composite, and hands presentation to a
//! [`PresentHost`].
#![allow(clippy::missing_safety_doc)]

use glow::HasContext;

use binoc_glow::{RenderTarget, TexQuad};
use binoc_modes::{
    sequential_eye, CompositeRule, Eye, Rect, RoutePlan, RouteTarget, StereoMode, StereoSettings,
    WindowGeometry,
};
use binoc_passes::CompositePasses;

pub use binoc_core::StereoError;

/// Pixel height of the shutter sync band at the bottom of sequential frames.
pub const SYNC_LINE_HEIGHT: i32 = 3;

/// A finished eye image handed to the host for presentation on a secondary
/// output.
#[derive(Debug, Clone, Copy)]
pub struct EyeFrame {
    pub eye: Eye,
    pub tex: glow::NativeTexture,
    pub w: i32,
    pub h: i32,
}

/// Presentation seam between the router and the windowing host.
pub trait PresentHost {
    /// Swap the window's buffers. Returns the flip timestamp in seconds on
    /// the host's monotonic clock.
    fn present(&mut self) -> Result<f64, StereoError>;

    /// Present a finished eye image on the secondary output (dual-head
    /// rigs). Hosts without a second output keep the default.
    fn present_secondary(&mut self, frame: &EyeFrame) -> Result<(), StereoError> {
        let _ = frame;
        Err(StereoError::other("no secondary output configured"))
    }
}

/// Both eyes' offscreen targets, double-buffered so the anticross composite
/// can read the previous frame while the current one is still bound.
struct EyeTargets {
    left: [RenderTarget; 2],
    right: [RenderTarget; 2],
    curr: usize,
}

impl EyeTargets {
    unsafe fn new(gl: &glow::Context, w: i32, h: i32) -> Result<Self, StereoError> {
        let targets = Self {
            left: [
                RenderTarget::with_depth_stencil(gl, w, h)?,
                RenderTarget::with_depth_stencil(gl, w, h)?,
            ],
            right: [
                RenderTarget::with_depth_stencil(gl, w, h)?,
                RenderTarget::with_depth_stencil(gl, w, h)?,
            ],
            curr: 0,
        };
        // Composites read the `prev` pair before the first draw ever lands
        // in it; fresh texture storage is undefined, so start from black.
        for t in targets.left.iter().chain(targets.right.iter()) {
            t.clear(gl, [0.0, 0.0, 0.0, 1.0]);
        }
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        Ok(targets)
    }

    fn curr(&self, eye: Eye) -> &RenderTarget {
        match eye {
            Eye::Right => &self.right[self.curr],
            _ => &self.left[self.curr],
        }
    }

    fn prev(&self, eye: Eye) -> &RenderTarget {
        match eye {
            Eye::Right => &self.right[1 - self.curr],
            _ => &self.left[1 - self.curr],
        }
    }

    fn swap(&mut self) {
        self.curr = 1 - self.curr;
    }

    unsafe fn ensure_size(&mut self, gl: &glow::Context, w: i32, h: i32) {
        for t in self.left.iter_mut().chain(self.right.iter_mut()) {
            t.ensure_size(gl, w, h);
        }
    }

    unsafe fn destroy(&mut self, gl: &glow::Context) {
        for t in self.left.iter_mut().chain(self.right.iter_mut()) {
            t.destroy(gl);
        }
    }
}

/// The stereo router. One per window; owns the per-eye targets and the
/// composite passes, but not the window or the GL context.
pub struct StereoRouter {
    settings: StereoSettings,
    geometry: WindowGeometry,
    plan: RoutePlan,
    targets: Option<EyeTargets>,
    quad: TexQuad,
    passes: CompositePasses,
    current_eye: Eye,
    frame: u64,
    background: [f32; 3],
    /// Set at flip / mode switch / resize: the next clearing `set_buffer`
    /// must wipe all channels, not just the eye's masked ones, when the
    /// plan leaves a channel unwritten (anaglyph).
    full_clear_pending: bool,
    /// Invoked at flip in sequential mode with the eye just presented, so
    /// shutter hardware can be driven in lockstep.
    flip_callback: Option<Box<dyn FnMut(Eye)>>,
}

impl std::fmt::Debug for StereoRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StereoRouter")
            .field("mode", &self.settings.mode)
            .field("geometry", &self.geometry)
            .field("current_eye", &self.current_eye)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

impl StereoRouter {
    pub unsafe fn new(
        gl: &glow::Context,
        settings: StereoSettings,
        geometry: WindowGeometry,
    ) -> Result<Self, StereoError> {
        let plan = RoutePlan::resolve(settings.mode, &geometry, settings.channels);
        let targets = if plan.needs_eye_buffers() {
            Some(EyeTargets::new(gl, geometry.width, geometry.height)?)
        } else {
            None
        };
        Ok(Self {
            settings,
            geometry,
            plan,
            targets,
            quad: TexQuad::new(gl)?,
            passes: CompositePasses::new(gl)?,
            current_eye: Eye::Mono,
            frame: 0,
            background: [0.0, 0.0, 0.0],
            full_clear_pending: true,
            flip_callback: None,
        })
    }

    pub fn mode(&self) -> StereoMode {
        self.settings.mode
    }

    pub fn settings(&self) -> &StereoSettings {
        &self.settings
    }

    pub fn plan(&self) -> &RoutePlan {
        &self.plan
    }

    /// The eye selected by the last `set_buffer`, `Mono` after a flip.
    pub fn current_eye(&self) -> Eye {
        self.current_eye
    }

    /// Number of completed flips.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn set_background(&mut self, rgb: [f32; 3]) {
        self.background = rgb;
    }

    pub fn set_flip_callback(&mut self, cb: Box<dyn FnMut(Eye)>) {
        self.flip_callback = Some(cb);
    }

    /// Switch presentation modes between frames. Idempotent when `mode` is
    /// already active; otherwise re-resolves the route plan and allocates or
    /// releases the per-eye targets as the new mode requires.
    pub unsafe fn set_mode(
        &mut self,
        gl: &glow::Context,
        mode: StereoMode,
    ) -> Result<(), StereoError> {
        if mode == self.settings.mode {
            return Ok(());
        }
        self.settings.mode = mode;
        self.plan = RoutePlan::resolve(mode, &self.geometry, self.settings.channels);
        self.full_clear_pending = true;
        if self.plan.needs_eye_buffers() {
            if self.targets.is_none() {
                self.targets =
                    Some(EyeTargets::new(gl, self.geometry.width, self.geometry.height)?);
            }
        } else if let Some(mut targets) = self.targets.take() {
            targets.destroy(gl);
        }
        Ok(())
    }

    /// Parse-and-validate entry point: an unknown name fails with
    /// `InvalidMode` and leaves the active mode untouched.
    pub unsafe fn set_mode_str(
        &mut self,
        gl: &glow::Context,
        name: &str,
    ) -> Result<(), StereoError> {
        let mode = StereoMode::from_str(name)?;
        self.set_mode(gl, mode)
    }

    /// Update the anticross coefficients `[into_left, into_right]`, clamped
    /// into [0, 1). Takes effect at the next flip.
    pub fn set_cross_talk(&mut self, pair: [f32; 2]) {
        self.settings.cross_talk = binoc_modes::CrossTalk::clamped(pair);
    }

    /// Track a window resize: re-resolve the plan and grow/shrink the eye
    /// targets with it.
    pub unsafe fn resize(&mut self, gl: &glow::Context, width: i32, height: i32) {
        self.geometry.width = width.max(1);
        self.geometry.height = height.max(1);
        self.plan = RoutePlan::resolve(self.settings.mode, &self.geometry, self.settings.channels);
        self.full_clear_pending = true;
        if let Some(targets) = &mut self.targets {
            targets.ensure_size(gl, self.geometry.width, self.geometry.height);
        }
    }

    /// Route subsequent draws to `eye`. With `clear`, the routed region is
    /// wiped to the background color first (the scissor and color mask are
    /// already in force, so only that eye's pixels change).
    pub unsafe fn set_buffer(&mut self, gl: &glow::Context, eye: Eye, clear: bool) {
        let route = *self.plan.route(eye);
        match route.target {
            RouteTarget::Window => {
                gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            }
            RouteTarget::LeftBuffer | RouteTarget::RightBuffer => {
                // Plans only route into buffers they asked for.
                if let Some(targets) = &self.targets {
                    gl.bind_framebuffer(glow::FRAMEBUFFER, Some(targets.curr(eye).fbo));
                }
            }
        }

        let v = route.viewport;
        gl.viewport(v.x, v.y, v.w, v.h);
        match route.scissor {
            Some(s) => {
                gl.enable(glow::SCISSOR_TEST);
                gl.scissor(s.x, s.y, s.w, s.h);
            }
            None => gl.disable(glow::SCISSOR_TEST),
        }
        let m = route.color_mask;
        gl.color_mask(m[0], m[1], m[2], m[3]);

        if clear {
            let [r, g, b] = self.background;
            gl.clear_color(r, g, b, 1.0);
            if self.full_clear_pending && self.plan.needs_full_clear() {
                // Channels outside the eye masks are never drawn; wipe
                // them once per frame or they keep stale pixels from
                // earlier frames and modes.
                gl.color_mask(true, true, true, true);
                gl.clear(glow::COLOR_BUFFER_BIT);
                gl.color_mask(m[0], m[1], m[2], m[3]);
            }
            gl.clear(glow::COLOR_BUFFER_BIT);
            self.full_clear_pending = false;
        }

        self.current_eye = eye;
    }

    /// String-keyed entry point for config-driven callers.
    pub unsafe fn set_buffer_str(
        &mut self,
        gl: &glow::Context,
        name: &str,
        clear: bool,
    ) -> Result<(), StereoError> {
        let eye = Eye::from_str(name)?;
        self.set_buffer(gl, eye, clear);
        Ok(())
    }

    /// Composite and present the frame. Returns the host's flip timestamp.
    ///
    /// Afterwards the window backbuffer is bound with a full viewport, no
    /// scissor, and all channels writable, and the current eye is `Mono`.
    /// A dual-head secondary-output failure is surfaced only after the
    /// primary present and the state reset, so the router never stays
    /// mid-flip.
    pub unsafe fn flip(
        &mut self,
        gl: &glow::Context,
        host: &mut dyn PresentHost,
    ) -> Result<f64, StereoError> {
        let mut secondary: Result<(), StereoError> = Ok(());
        match self.plan.composite {
            CompositeRule::None => {}
            CompositeRule::Sequential => self.composite_sequential(gl)?,
            CompositeRule::DualHead => secondary = self.composite_dual_head(gl, host),
            CompositeRule::AnticrossTopBottom => self.composite_anticross(gl),
        }

        let t = host.present()?;

        if let Some(targets) = &mut self.targets {
            targets.swap();
        }
        self.frame += 1;
        self.reset_to_mono(gl);
        secondary?;
        Ok(t)
    }

    unsafe fn reset_to_mono(&mut self, gl: &glow::Context) {
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.viewport(0, 0, self.geometry.width, self.geometry.height);
        gl.disable(glow::SCISSOR_TEST);
        gl.color_mask(true, true, true, true);
        self.current_eye = Eye::Mono;
        self.full_clear_pending = true;
    }

    /// Present the frame-parity eye's buffer plus its shutter sync band.
    unsafe fn composite_sequential(&mut self, gl: &glow::Context) -> Result<(), StereoError> {
        let eye = sequential_eye(self.frame);
        let targets = self
            .targets
            .as_ref()
            .ok_or_else(|| StereoError::other("sequential mode lost its eye buffers"))?;

        self.begin_window_composite(gl);
        self.quad.draw(gl, targets.curr(eye).as_texture(), None, None);

        let band = sync_line_rect(self.geometry.width);
        let [r, g, b] = sync_line_color(eye);
        gl.enable(glow::SCISSOR_TEST);
        gl.scissor(band.x, band.y, band.w, band.h);
        gl.clear_color(r, g, b, 1.0);
        gl.clear(glow::COLOR_BUFFER_BIT);
        gl.disable(glow::SCISSOR_TEST);

        if let Some(cb) = &mut self.flip_callback {
            cb(eye);
        }
        Ok(())
    }

    /// Left buffer fills the window; the right goes to the host's secondary
    /// output once its GL work is flushed.
    unsafe fn composite_dual_head(
        &mut self,
        gl: &glow::Context,
        host: &mut dyn PresentHost,
    ) -> Result<(), StereoError> {
        let targets = self
            .targets
            .as_ref()
            .ok_or_else(|| StereoError::other("dual-head mode lost its eye buffers"))?;

        self.begin_window_composite(gl);
        self.quad
            .draw(gl, targets.curr(Eye::Left).as_texture(), None, None);

        let right = targets.curr(Eye::Right);
        gl.flush();
        host.present_secondary(&EyeFrame {
            eye: Eye::Right,
            tex: right.as_texture(),
            w: right.w,
            h: right.h,
        })
    }

    /// Cross-talk compensate both eyes into their stacked half viewports,
    /// each subtracting a weighted ghost of the other eye's previous frame.
    unsafe fn composite_anticross(&mut self, gl: &glow::Context) {
        let (Some(targets), Some(blits)) = (&self.targets, self.plan.half_blits) else {
            return;
        };

        self.begin_window_composite(gl);
        for blit in blits {
            let (other, ct) = match blit.eye {
                Eye::Right => (Eye::Left, self.settings.cross_talk.into_right),
                _ => (Eye::Right, self.settings.cross_talk.into_left),
            };
            self.passes.draw_anticross(
                gl,
                &self.quad,
                targets.curr(blit.eye).as_texture(),
                targets.prev(other).as_texture(),
                ct,
                blit.src_uv,
                blit.dst_ndc,
            );
        }
    }

    unsafe fn begin_window_composite(&self, gl: &glow::Context) {
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.viewport(0, 0, self.geometry.width, self.geometry.height);
        gl.disable(glow::SCISSOR_TEST);
        gl.color_mask(true, true, true, true);
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        if let Some(mut targets) = self.targets.take() {
            targets.destroy(gl);
        }
        self.quad.destroy(gl);
        self.passes.destroy(gl);
    }
}

/// Sync band along the bottom edge, full window width.
fn sync_line_rect(width: i32) -> Rect {
    Rect::new(0, 0, width, SYNC_LINE_HEIGHT)
}

/// Blue marks a left-eye frame, black a right-eye frame.
fn sync_line_color(eye: Eye) -> [f32; 3] {
    match eye {
        Eye::Right => [0.0, 0.0, 0.0],
        _ => [0.0, 0.0, 1.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_band_spans_the_bottom_rows() {
        assert_eq!(sync_line_rect(1920), Rect::new(0, 0, 1920, 3));
    }

    #[test]
    fn sync_colors_distinguish_the_eyes() {
        assert_eq!(sync_line_color(Eye::Left), [0.0, 0.0, 1.0]);
        assert_eq!(sync_line_color(Eye::Right), [0.0, 0.0, 0.0]);
        assert_ne!(sync_line_color(Eye::Left), sync_line_color(Eye::Right));
    }

    #[test]
    fn parity_alternates_over_presented_frames() {
        let schedule: Vec<Eye> = (0..4).map(sequential_eye).collect();
        assert_eq!(schedule, [Eye::Left, Eye::Right, Eye::Left, Eye::Right]);
    }
}
