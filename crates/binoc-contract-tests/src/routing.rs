#![forbid(unsafe_code)]

#[cfg(test)]
mod tests {
    use binoc_core::StereoConfig;
    use binoc_modes::{
        sequential_eye, CompositeRule, Eye, RoutePlan, RouteTarget, StereoMode, StereoSettings,
        WindowGeometry,
    };

    fn plan_for(cfg: &StereoConfig, width: i32, height: i32) -> RoutePlan {
        let settings = StereoSettings::from_config(cfg).expect("config should validate");
        let geometry = WindowGeometry::new(width, height).with_config(cfg);
        RoutePlan::resolve(settings.mode, &geometry, settings.channels)
    }

    /// Protocol contract: the same draw sequence is routable under every
    /// mode, and mono is always a full-window window-target route.
    #[test]
    fn every_mode_routes_all_three_selectors() {
        for mode in StereoMode::ALL {
            let mut cfg = StereoConfig::default();
            cfg.stereo_mode = mode.name().to_string();
            let plan = plan_for(&cfg, 1280, 720);

            for eye in [Eye::Left, Eye::Right, Eye::Mono] {
                let route = plan.route(eye);
                assert!(route.viewport.w > 0 && route.viewport.h > 0, "{mode:?} {eye:?}");
            }
            assert_eq!(plan.route(Eye::Mono).target, RouteTarget::Window, "{mode:?}");
        }
    }

    /// Direct modes never require eye framebuffers; composited modes always
    /// do. This is the allocation contract `set_mode` relies on.
    #[test]
    fn buffer_need_matches_the_composite_rule() {
        for mode in StereoMode::ALL {
            let mut cfg = StereoConfig::default();
            cfg.stereo_mode = mode.name().to_string();
            let plan = plan_for(&cfg, 800, 600);

            assert_eq!(
                plan.needs_eye_buffers(),
                plan.composite != CompositeRule::None,
                "{mode:?}"
            );
            assert_eq!(plan.needs_eye_buffers(), mode.uses_eye_buffers(), "{mode:?}");
        }
    }

    /// Split-mode contract: the two scissor regions tile the window without
    /// overlap, whatever the split ratio.
    #[test]
    fn split_regions_tile_the_window() {
        for ratio in [0.25, 0.5, 0.8] {
            let mut cfg = StereoConfig::default();
            cfg.split_ratio = ratio;
            let plan = plan_for(&cfg, 1024, 768);

            let l = plan.route(Eye::Left).scissor.expect("left scissor");
            let r = plan.route(Eye::Right).scissor.expect("right scissor");
            assert_eq!(l.x + l.w, r.x, "ratio {ratio}: regions must abut");
            assert_eq!(l.w + r.w, 1024, "ratio {ratio}: regions must tile");
            assert_eq!(l.h, 768);
            assert_eq!(r.h, 768);
        }
    }

    /// Sequential presentation alternates strictly with frame parity; the
    /// schedule restarts deterministically from any frame counter.
    #[test]
    fn sequential_schedule_is_strictly_alternating() {
        let mut last = None;
        for frame in 0..16u64 {
            let eye = sequential_eye(frame);
            assert_ne!(Some(eye), last, "frame {frame} repeated an eye");
            last = Some(eye);
        }
    }

    /// Swapping eyes flips the anaglyph channel assignment together with the
    /// split regions (calibration must stay consistent across variants).
    #[test]
    fn swap_eyes_keeps_masks_attached_to_eyes() {
        let mut cfg = StereoConfig::default();
        cfg.stereo_mode = "red-blue".to_string();
        let plain = plan_for(&cfg, 800, 600);
        cfg.swap_eyes = true;
        let swapped = plan_for(&cfg, 800, 600);

        // Channel masks follow the eye, not the region, so they are
        // unaffected by swap_eyes.
        assert_eq!(plain.route(Eye::Left).color_mask, swapped.route(Eye::Left).color_mask);
        assert_eq!(
            plain.route(Eye::Left).color_mask,
            [true, false, false, false]
        );
    }
}
