//! Per-mode routing policy, resolved once at mode-switch time.
//!
//! A [`RoutePlan`] is pure data: for each eye selector it precomputes where
//! draws land (target, viewport, scissor, color mask) and which composite
//! rule `flip()` runs. Backends apply the plan without consulting the mode
//! again.

use crate::{ColorChannels, Eye, Rect, StereoMode, WindowGeometry};

/// Where draws physically land while an eye is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// The window's default framebuffer.
    Window,
    /// The left eye's current offscreen target.
    LeftBuffer,
    /// The right eye's current offscreen target.
    RightBuffer,
}

/// Resolved GL state for one eye selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeRoute {
    pub target: RouteTarget,
    pub viewport: Rect,
    pub scissor: Option<Rect>,
    pub color_mask: [bool; 4],
}

const MASK_ALL: [bool; 4] = [true; 4];

/// What `flip()` does with the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeRule {
    /// Draws are already final-positioned; nothing to composite.
    None,
    /// Present the frame-parity eye's buffer plus shutter sync lines.
    Sequential,
    /// Present the left buffer to the window, hand the right buffer to the
    /// host's secondary output.
    DualHead,
    /// Cross-talk compensate both buffers and blit them into their half
    /// viewports.
    AnticrossTopBottom,
}

/// One half-screen blit of the anticross composite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfBlit {
    pub eye: Eye,
    /// Destination rect in normalized device coordinates `[x0, y0, x1, y1]`.
    pub dst_ndc: [f32; 4],
    /// Source rect in texture coordinates `[u0, v0, u1, v1]` — the central
    /// band of the full-resolution eye image, so aspect is preserved.
    pub src_uv: [f32; 4],
}

/// The fully resolved routing table for one mode + geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub mode: StereoMode,
    pub geometry: WindowGeometry,
    pub left: EyeRoute,
    pub right: EyeRoute,
    pub mono: EyeRoute,
    pub composite: CompositeRule,
    /// Present for `AnticrossTopBottom`, ordered [first half, second half].
    pub half_blits: Option<[HalfBlit; 2]>,
}

impl RoutePlan {
    pub fn route(&self, eye: Eye) -> &EyeRoute {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
            Eye::Mono => &self.mono,
        }
    }

    /// Whether this plan renders through per-eye framebuffer targets.
    pub fn needs_eye_buffers(&self) -> bool {
        self.composite != CompositeRule::None || self.mode.uses_eye_buffers()
    }

    /// True when the per-eye masks leave an RGB channel unwritten
    /// (anaglyph): frames must then start with one full-mask clear, or
    /// stale content survives in the unselected channel across flips and
    /// mode switches.
    pub fn needs_full_clear(&self) -> bool {
        let mut covered = [false; 3];
        for route in [&self.left, &self.right] {
            for (c, m) in covered.iter_mut().zip(route.color_mask) {
                *c |= m;
            }
        }
        covered.contains(&false)
    }

    pub fn resolve(mode: StereoMode, geometry: &WindowGeometry, channels: ColorChannels) -> Self {
        let g = *geometry;
        let full = Rect::new(0, 0, g.width, g.height);
        let window_full = EyeRoute {
            target: RouteTarget::Window,
            viewport: full,
            scissor: None,
            color_mask: MASK_ALL,
        };

        let (left, right, composite, half_blits) = match mode {
            StereoMode::LeftRightSplit => {
                let (lr, rr) = eye_regions(&g, Axis::X);
                (
                    centered_route(&g, Eye::Left, lr),
                    centered_route(&g, Eye::Right, rr),
                    CompositeRule::None,
                    None,
                )
            }
            StereoMode::TopBottom => {
                let (lr, rr) = eye_regions(&g, Axis::Y);
                (
                    centered_route(&g, Eye::Left, lr),
                    centered_route(&g, Eye::Right, rr),
                    CompositeRule::None,
                    None,
                )
            }
            StereoMode::SideBySideCompressed => {
                let (lr, rr) = eye_regions(&g, Axis::X);
                (
                    compressed_route(&g, Eye::Left, lr),
                    compressed_route(&g, Eye::Right, rr),
                    CompositeRule::None,
                    None,
                )
            }
            StereoMode::RedBlue => (
                EyeRoute {
                    color_mask: channels.left.mask(),
                    ..window_full
                },
                EyeRoute {
                    color_mask: channels.right.mask(),
                    ..window_full
                },
                CompositeRule::None,
                None,
            ),
            StereoMode::Sequential | StereoMode::DualHead | StereoMode::TopBottomAnticross => {
                let buffer_route = |target| EyeRoute {
                    target,
                    viewport: full,
                    scissor: None,
                    color_mask: MASK_ALL,
                };
                let composite = match mode {
                    StereoMode::Sequential => CompositeRule::Sequential,
                    StereoMode::DualHead => CompositeRule::DualHead,
                    _ => CompositeRule::AnticrossTopBottom,
                };
                let half_blits = (mode == StereoMode::TopBottomAnticross)
                    .then(|| anticross_half_blits(&g));
                (
                    buffer_route(RouteTarget::LeftBuffer),
                    buffer_route(RouteTarget::RightBuffer),
                    composite,
                    half_blits,
                )
            }
        };

        RoutePlan {
            mode,
            geometry: g,
            left,
            right,
            mono: window_full,
            composite,
            half_blits,
        }
    }
}

enum Axis {
    X,
    Y,
}

/// Split the window along `axis` at `split_ratio` and assign regions to the
/// eyes. The left eye takes the first (left/top) region unless `swap_eyes`.
fn eye_regions(g: &WindowGeometry, axis: Axis) -> (Rect, Rect) {
    let (first, second) = match axis {
        Axis::X => {
            let sx = split_point(g.width, g.split_ratio);
            (
                Rect::new(0, 0, sx, g.height),
                Rect::new(sx, 0, g.width - sx, g.height),
            )
        }
        Axis::Y => {
            let sy = split_point(g.height, g.split_ratio);
            // First region is the top band (GL origin is bottom-left).
            (
                Rect::new(0, g.height - sy, g.width, sy),
                Rect::new(0, 0, g.width, g.height - sy),
            )
        }
    };
    if g.swap_eyes {
        (second, first)
    } else {
        (first, second)
    }
}

fn split_point(extent: i32, ratio: f32) -> i32 {
    // A 1-pixel extent cannot leave both regions nonempty; the first
    // region keeps the pixel.
    ((extent as f32 * ratio).round() as i32).clamp(1, (extent - 1).max(1))
}

/// Per-eye fixation shift in pixels: shared offset, plus vergence (inward)
/// and tilt (divergent) with opposite signs for the two eyes.
fn fixation_shift(g: &WindowGeometry, eye: Eye) -> (i32, i32) {
    let s = eye.sign();
    (
        (g.offset[0] + s * g.vergence).round() as i32,
        (g.offset[1] + s * g.tilt).round() as i32,
    )
}

/// Normal-aspect split route: a full-sized viewport centered on the
/// scissored region, so the region shows the central crop of the image
/// (the viewport placement plays the role the original central-crop
/// shaders did).
fn centered_route(g: &WindowGeometry, eye: Eye, region: Rect) -> EyeRoute {
    let (dx, dy) = fixation_shift(g, eye);
    EyeRoute {
        target: RouteTarget::Window,
        viewport: Rect::new(
            region.x + region.w / 2 - g.width / 2 + dx,
            region.y + region.h / 2 - g.height / 2 + dy,
            g.width,
            g.height,
        ),
        scissor: Some(region),
        color_mask: MASK_ALL,
    }
}

/// Compressed split route: the viewport *is* the region, squeezing the full
/// image into it.
fn compressed_route(g: &WindowGeometry, eye: Eye, region: Rect) -> EyeRoute {
    let (dx, dy) = fixation_shift(g, eye);
    EyeRoute {
        target: RouteTarget::Window,
        viewport: Rect::new(region.x + dx, region.y + dy, region.w, region.h),
        scissor: Some(region),
        color_mask: MASK_ALL,
    }
}

/// Flip-time half blits for the anticross composite: each eye's compensated
/// image lands in its top/bottom region, sampling the central vertical band
/// of the full-resolution buffer to preserve aspect.
fn anticross_half_blits(g: &WindowGeometry) -> [HalfBlit; 2] {
    let (left_region, right_region) = eye_regions(g, Axis::Y);
    let blit = |eye: Eye, region: Rect| {
        let frac = region.h as f32 / g.height.max(1) as f32;
        let v0 = (1.0 - frac) / 2.0;
        HalfBlit {
            eye,
            dst_ndc: region.to_ndc(g.width, g.height),
            src_uv: [0.0, v0, 1.0, v0 + frac],
        }
    };
    [blit(Eye::Left, left_region), blit(Eye::Right, right_region)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Channel;

    fn plan(mode: StereoMode, g: &WindowGeometry) -> RoutePlan {
        RoutePlan::resolve(mode, g, ColorChannels::default())
    }

    #[test]
    fn left_right_split_scissors_disjoint_halves() {
        let g = WindowGeometry::new(800, 600);
        let p = plan(StereoMode::LeftRightSplit, &g);

        assert_eq!(p.left.scissor, Some(Rect::new(0, 0, 400, 600)));
        assert_eq!(p.right.scissor, Some(Rect::new(400, 0, 400, 600)));
        // Full-sized viewport centered on each half: the region shows the
        // central crop at normal aspect.
        assert_eq!(p.left.viewport, Rect::new(-200, 0, 800, 600));
        assert_eq!(p.right.viewport, Rect::new(200, 0, 800, 600));
        assert_eq!(p.composite, CompositeRule::None);
        assert!(!p.needs_eye_buffers());
    }

    #[test]
    fn compressed_viewport_is_the_half_region() {
        let g = WindowGeometry::new(800, 600);
        let p = plan(StereoMode::SideBySideCompressed, &g);
        assert_eq!(p.left.viewport, Rect::new(0, 0, 400, 600));
        assert_eq!(p.right.viewport, Rect::new(400, 0, 400, 600));
        assert_eq!(p.left.scissor, Some(Rect::new(0, 0, 400, 600)));
        assert_eq!(p.right.scissor, Some(Rect::new(400, 0, 400, 600)));
        assert_eq!(p.composite, CompositeRule::None);
    }

    #[test]
    fn top_bottom_puts_left_eye_on_top() {
        let g = WindowGeometry::new(800, 600);
        let p = plan(StereoMode::TopBottom, &g);
        assert_eq!(p.left.scissor, Some(Rect::new(0, 300, 800, 300)));
        assert_eq!(p.right.scissor, Some(Rect::new(0, 0, 800, 300)));
        assert_eq!(p.left.viewport, Rect::new(0, 150, 800, 600));
        assert_eq!(p.right.viewport, Rect::new(0, -150, 800, 600));
    }

    #[test]
    fn swap_eyes_crosses_the_regions() {
        let mut g = WindowGeometry::new(800, 600);
        g.swap_eyes = true;
        let p = plan(StereoMode::LeftRightSplit, &g);
        assert_eq!(p.left.scissor, Some(Rect::new(400, 0, 400, 600)));
        assert_eq!(p.right.scissor, Some(Rect::new(0, 0, 400, 600)));
    }

    #[test]
    fn split_ratio_moves_the_seam() {
        let mut g = WindowGeometry::new(800, 600);
        g.split_ratio = 0.25;
        let p = plan(StereoMode::LeftRightSplit, &g);
        assert_eq!(p.left.scissor, Some(Rect::new(0, 0, 200, 600)));
        assert_eq!(p.right.scissor, Some(Rect::new(200, 0, 600, 600)));
    }

    #[test]
    fn vergence_shifts_the_eyes_inward() {
        let mut g = WindowGeometry::new(800, 600);
        g.vergence = 10.0;
        g.tilt = 4.0;
        let p = plan(StereoMode::LeftRightSplit, &g);
        // Left eye shifts right and up, right eye the opposite way.
        assert_eq!(p.left.viewport.x, -200 + 10);
        assert_eq!(p.left.viewport.y, 4);
        assert_eq!(p.right.viewport.x, 200 - 10);
        assert_eq!(p.right.viewport.y, -4);
        // Scissor regions stay put.
        assert_eq!(p.left.scissor, Some(Rect::new(0, 0, 400, 600)));
    }

    #[test]
    fn red_blue_masks_are_disjoint_channels() {
        let g = WindowGeometry::new(800, 600);
        let p = plan(StereoMode::RedBlue, &g);
        assert_eq!(p.left.color_mask, [true, false, false, false]);
        assert_eq!(p.right.color_mask, [false, false, true, false]);
        assert_eq!(p.left.viewport, Rect::new(0, 0, 800, 600));
        assert_eq!(p.left.scissor, None);
        assert_eq!(p.left.target, RouteTarget::Window);
    }

    #[test]
    fn one_pixel_window_still_resolves() {
        // Minimized windows reach the router as 1xN / Nx1 geometry; every
        // mode must still produce a plan.
        for g in [
            WindowGeometry::new(1, 600),
            WindowGeometry::new(800, 1),
            WindowGeometry::new(1, 1),
        ] {
            for mode in StereoMode::ALL {
                let p = RoutePlan::resolve(mode, &g, ColorChannels::default());
                assert_eq!(
                    p.mono.viewport,
                    Rect::new(0, 0, g.width, g.height),
                    "{mode:?} {g:?}"
                );
            }
        }
        // The single column goes to the first region.
        let p = plan(StereoMode::LeftRightSplit, &WindowGeometry::new(1, 600));
        assert_eq!(p.left.scissor, Some(Rect::new(0, 0, 1, 600)));
        assert_eq!(p.right.scissor, Some(Rect::new(1, 0, 0, 600)));
    }

    #[test]
    fn only_anaglyph_needs_a_full_frame_clear() {
        let g = WindowGeometry::new(800, 600);
        for mode in StereoMode::ALL {
            let p = plan(mode, &g);
            assert_eq!(
                p.needs_full_clear(),
                mode == StereoMode::RedBlue,
                "{mode:?}"
            );
        }
    }

    #[test]
    fn full_clear_wipes_stale_channels_before_masked_draws() {
        // CPU model of an anaglyph frame starting on a dirty backbuffer
        // (leftovers from another mode): one full-mask clear to black,
        // then white under each eye mask. The unselected green channel
        // must end at the background level, not the stale value.
        let g = WindowGeometry::new(800, 600);
        let p = plan(StereoMode::RedBlue, &g);
        let mut px = [0.3f32, 0.7, 0.2];
        if p.needs_full_clear() {
            px = [0.0; 3];
        }
        for route in [&p.left, &p.right] {
            for (c, out) in px.iter_mut().enumerate() {
                if route.color_mask[c] {
                    *out = 1.0;
                }
            }
        }
        assert_eq!(px, [1.0, 0.0, 1.0]);
    }

    #[test]
    fn red_blue_white_plus_white_is_magenta() {
        // CPU model of the masked additive scenario: draw white under the
        // left mask, then white under the right mask, over black.
        let g = WindowGeometry::new(800, 600);
        let p = plan(StereoMode::RedBlue, &g);
        let mut px = [0.0f32; 3];
        for route in [&p.left, &p.right] {
            for (c, out) in px.iter_mut().enumerate() {
                if route.color_mask[c] {
                    *out = 1.0; // white draw lands only in masked channels
                }
            }
        }
        assert_eq!(px, [1.0, 0.0, 1.0]);
    }

    #[test]
    fn buffer_modes_route_into_eye_targets() {
        let g = WindowGeometry::new(1024, 768);
        for mode in [
            StereoMode::Sequential,
            StereoMode::DualHead,
            StereoMode::TopBottomAnticross,
        ] {
            let p = plan(mode, &g);
            assert_eq!(p.left.target, RouteTarget::LeftBuffer, "{mode:?}");
            assert_eq!(p.right.target, RouteTarget::RightBuffer, "{mode:?}");
            assert_eq!(p.left.viewport, Rect::new(0, 0, 1024, 768));
            assert_eq!(p.left.scissor, None);
            assert!(p.needs_eye_buffers());
        }
    }

    #[test]
    fn anticross_half_blits_sample_the_central_band() {
        let g = WindowGeometry::new(800, 600);
        let p = plan(StereoMode::TopBottomAnticross, &g);
        let blits = p.half_blits.expect("anticross carries half blits");

        assert_eq!(blits[0].eye, Eye::Left);
        assert_eq!(blits[0].dst_ndc, [-1.0, 0.0, 1.0, 1.0]);
        assert_eq!(blits[0].src_uv, [0.0, 0.25, 1.0, 0.75]);

        assert_eq!(blits[1].eye, Eye::Right);
        assert_eq!(blits[1].dst_ndc, [-1.0, -1.0, 1.0, 0.0]);
        assert_eq!(blits[1].src_uv, [0.0, 0.25, 1.0, 0.75]);
    }

    #[test]
    fn mono_is_always_the_full_window() {
        let g = WindowGeometry::new(800, 600);
        for mode in StereoMode::ALL {
            let p = plan(mode, &g);
            assert_eq!(p.mono.target, RouteTarget::Window, "{mode:?}");
            assert_eq!(p.mono.viewport, Rect::new(0, 0, 800, 600));
            assert_eq!(p.mono.scissor, None);
            assert_eq!(p.mono.color_mask, [true; 4]);
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let g = WindowGeometry::new(800, 600);
        for mode in StereoMode::ALL {
            assert_eq!(plan(mode, &g), plan(mode, &g), "{mode:?}");
        }
    }

    #[test]
    fn custom_channels_change_the_anaglyph_masks() {
        let g = WindowGeometry::new(800, 600);
        let cc = ColorChannels::new(Channel::Red, Channel::Green).unwrap();
        let p = RoutePlan::resolve(StereoMode::RedBlue, &g, cc);
        assert_eq!(p.right.color_mask, [false, true, false, false]);
    }
}
