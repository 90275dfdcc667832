#![forbid(unsafe_code)]

//! binoc stereo vocabulary and routing policy.
//!
//! This crate is **contract-only**: no windowing, no OS policy, no GL handles.
//! It defines the mode/eye vocabulary and resolves each stereo mode into a
//! precomputed [`route::RoutePlan`] (viewport, scissor, color mask, target,
//! flip-time composite rule) that backends apply verbatim.
//!
//! Resolving once at mode-switch time keeps the per-draw path free of string
//! comparisons and branching on mode names.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

use binoc_core::{StereoConfig, StereoError};

pub mod route;

pub use route::{CompositeRule, EyeRoute, HalfBlit, RoutePlan, RouteTarget};

/// Integer pixel rectangle, GL convention (origin at the bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Map this pixel rect into normalized device coordinates
    /// `[x0, y0, x1, y1]` for a window of `width` x `height`.
    pub fn to_ndc(self, width: i32, height: i32) -> [f32; 4] {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        [
            2.0 * self.x as f32 / w - 1.0,
            2.0 * self.y as f32 / h - 1.0,
            2.0 * (self.x + self.w) as f32 / w - 1.0,
            2.0 * (self.y + self.h) as f32 / h - 1.0,
        ]
    }
}

/// Which logical buffer subsequent draws land in.
///
/// Transient per-draw state owned by the router; `flip()` resets it to `Mono`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
    Mono,
}

impl Eye {
    pub const fn name(self) -> &'static str {
        match self {
            Eye::Left => "left",
            Eye::Right => "right",
            Eye::Mono => "mono",
        }
    }

    /// Fixation adjustment sign: positive for the left eye, negative for the
    /// right, zero for mono.
    pub const fn sign(self) -> f32 {
        match self {
            Eye::Left => 1.0,
            Eye::Right => -1.0,
            Eye::Mono => 0.0,
        }
    }

    pub fn from_str(name: &str) -> Result<Self, StereoError> {
        match name {
            "left" => Ok(Eye::Left),
            "right" => Ok(Eye::Right),
            "mono" => Ok(Eye::Mono),
            _ => Err(StereoError::InvalidEye(name.to_string())),
        }
    }
}

/// The closed set of stereo presentation modes.
///
/// Any mode can be swapped in between frames; the same
/// `set_buffer`/draw/`flip` sequence produces correct output under all of
/// them because the differences live entirely in the resolved route plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StereoMode {
    /// Each eye in its own half at normal aspect (central crop), for prisms,
    /// mirrors, and free/cross fusion.
    LeftRightSplit,
    /// Each eye squeezed horizontally by 2 into its half (most HMDs).
    SideBySideCompressed,
    /// Full-resolution image per eye, each presented on its own output.
    DualHead,
    /// Anaglyph: the two eyes drive different color channels of one image.
    RedBlue,
    /// Field-sequential: eyes alternate over displayed frames, with sync
    /// lines for shutter hardware.
    Sequential,
    /// Eyes stacked vertically at normal aspect (double-height display rigs).
    TopBottom,
    /// `TopBottom` plus subtractive cross-talk compensation using the
    /// previous frame's opposite-eye image.
    TopBottomAnticross,
}

impl StereoMode {
    pub const ALL: [StereoMode; 7] = [
        StereoMode::LeftRightSplit,
        StereoMode::SideBySideCompressed,
        StereoMode::DualHead,
        StereoMode::RedBlue,
        StereoMode::Sequential,
        StereoMode::TopBottom,
        StereoMode::TopBottomAnticross,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            StereoMode::LeftRightSplit => "left-right-split",
            StereoMode::SideBySideCompressed => "side-by-side-compressed",
            StereoMode::DualHead => "dual-head",
            StereoMode::RedBlue => "red-blue",
            StereoMode::Sequential => "sequential",
            StereoMode::TopBottom => "top-bottom",
            StereoMode::TopBottomAnticross => "top-bottom-anticross",
        }
    }

    pub fn from_str(name: &str) -> Result<Self, StereoError> {
        match name {
            "left-right-split" => Ok(StereoMode::LeftRightSplit),
            "side-by-side-compressed" => Ok(StereoMode::SideBySideCompressed),
            "dual-head" => Ok(StereoMode::DualHead),
            "red-blue" => Ok(StereoMode::RedBlue),
            "sequential" => Ok(StereoMode::Sequential),
            "top-bottom" => Ok(StereoMode::TopBottom),
            "top-bottom-anticross" => Ok(StereoMode::TopBottomAnticross),
            _ => Err(StereoError::InvalidMode(name.to_string())),
        }
    }

    /// Whether the mode renders through per-eye framebuffer targets
    /// (composited at flip) rather than directly into the backbuffer.
    pub const fn uses_eye_buffers(self) -> bool {
        matches!(
            self,
            StereoMode::DualHead | StereoMode::Sequential | StereoMode::TopBottomAnticross
        )
    }
}

/// One of the writable color channels of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }

    pub fn from_str(name: &str) -> Result<Self, StereoError> {
        match name {
            "red" => Ok(Channel::Red),
            "green" => Ok(Channel::Green),
            "blue" => Ok(Channel::Blue),
            _ => Err(StereoError::InvalidChannel(name.to_string())),
        }
    }

    /// RGBA write mask that restricts draws to this channel.
    /// Alpha stays unwritten so both eyes leave the destination alpha alone.
    pub const fn mask(self) -> [bool; 4] {
        match self {
            Channel::Red => [true, false, false, false],
            Channel::Green => [false, true, false, false],
            Channel::Blue => [false, false, true, false],
        }
    }
}

/// Channel assignment for the anaglyph mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChannels {
    pub left: Channel,
    pub right: Channel,
}

impl Default for ColorChannels {
    fn default() -> Self {
        Self {
            left: Channel::Red,
            right: Channel::Blue,
        }
    }
}

impl ColorChannels {
    pub fn new(left: Channel, right: Channel) -> Result<Self, StereoError> {
        if left == right {
            return Err(StereoError::InvalidChannel(format!(
                "both eyes assigned to '{}'",
                left.name()
            )));
        }
        Ok(Self { left, right })
    }
}

/// Cross-talk compensation coefficients, each in [0, 1).
///
/// `into_left` is the leakage the left eye sees from the right eye's image
/// (and therefore the weight subtracted from the left composite), and vice
/// versa. Only meaningful for [`StereoMode::TopBottomAnticross`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CrossTalk {
    pub into_left: f32,
    pub into_right: f32,
}

impl CrossTalk {
    /// Build from `[into_left, into_right]`, clamping each into [0, 1).
    pub fn clamped(pair: [f32; 2]) -> Self {
        let clamp = |v: f32| v.clamp(0.0, 0.999_999);
        Self {
            into_left: clamp(pair[0]),
            into_right: clamp(pair[1]),
        }
    }
}

/// One color component of the cross-talk compensated composite.
///
/// This is the exact transfer function the anticross fragment shader applies;
/// tests pin the numbers here.
pub fn anticross_component(this: f32, other_prev: f32, cross_talk: f32) -> f32 {
    (this - cross_talk * other_prev).clamp(0.0, 1.0)
}

/// Host window geometry as seen by the router. Owned by the host; read-only
/// here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowGeometry {
    /// Drawable size in physical pixels.
    pub width: i32,
    pub height: i32,
    /// Fraction of the window given to the first (left/top) region in split
    /// modes.
    pub split_ratio: f32,
    /// Shift both eyes' images by [x, y] pixels.
    pub offset: [f32; 2],
    /// Horizontal inward shift in pixels (+ for the left eye, - for the
    /// right). Helps fusion in mirror/prism rigs.
    pub vergence: f32,
    /// Vertical divergent shift in pixels (up for the left eye, down for the
    /// right).
    pub tilt: f32,
    /// Swap which eye lands in the first region (cross fusion, inverted
    /// double-height rigs).
    pub swap_eyes: bool,
}

impl WindowGeometry {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            split_ratio: 0.5,
            offset: [0.0, 0.0],
            vergence: 0.0,
            tilt: 0.0,
            swap_eyes: false,
        }
    }

    /// Apply the geometry overrides a validated config carries.
    pub fn with_config(mut self, cfg: &StereoConfig) -> Self {
        self.split_ratio = cfg.split_ratio;
        self.offset = cfg.offset;
        self.vergence = cfg.vergence;
        self.tilt = cfg.tilt;
        self.swap_eyes = cfg.swap_eyes;
        self
    }
}

/// Typed settings derived from a [`StereoConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoSettings {
    pub mode: StereoMode,
    pub cross_talk: CrossTalk,
    pub channels: ColorChannels,
}

impl StereoSettings {
    /// Validate the stringly config surface into typed settings.
    ///
    /// Unknown mode or channel names fail here, at the point of misuse.
    pub fn from_config(cfg: &StereoConfig) -> Result<Self, StereoError> {
        cfg.check_ranges()
            .map_err(|msg| StereoError::InvalidConfig { path: None, msg })?;
        let mode = StereoMode::from_str(&cfg.stereo_mode)?;
        let channels = ColorChannels::new(
            Channel::from_str(&cfg.color_channels[0])?,
            Channel::from_str(&cfg.color_channels[1])?,
        )?;
        Ok(Self {
            mode,
            cross_talk: CrossTalk::clamped(cfg.cross_talk),
            channels,
        })
    }
}

/// Which eye a field-sequential frame presents: even frames left, odd right.
pub const fn sequential_eye(frame: u64) -> Eye {
    if frame % 2 == 0 {
        Eye::Left
    } else {
        Eye::Right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_round_trip() {
        for mode in StereoMode::ALL {
            assert_eq!(StereoMode::from_str(mode.name()).unwrap(), mode);
        }
    }

    #[test]
    fn unknown_mode_is_rejected_verbatim() {
        let err = StereoMode::from_str("left/right").expect_err("slash names are not mode names");
        assert!(
            matches!(&err, StereoError::InvalidMode(s) if s == "left/right"),
            "unexpected err: {err}"
        );
    }

    #[test]
    fn unknown_eye_is_rejected() {
        let err = Eye::from_str("top").expect_err("'top' is not an eye");
        assert!(matches!(err, StereoError::InvalidEye(_)), "unexpected err: {err}");
        assert_eq!(Eye::from_str("mono").unwrap(), Eye::Mono);
    }

    #[test]
    fn cross_talk_is_clamped_into_unit_interval() {
        let ct = CrossTalk::clamped([-0.5, 1.5]);
        assert_eq!(ct.into_left, 0.0);
        assert!(ct.into_right < 1.0);
    }

    #[test]
    fn anticross_matches_hand_computed_example() {
        // L = 1.0 solid, R = 0.0 solid, into_left = 0.07:
        // right output's correction subtracts from a 0 baseline and clamps to 0,
        // left output is reduced by nothing (R_prev = 0).
        assert_eq!(anticross_component(1.0, 0.0, 0.07), 1.0);
        assert_eq!(anticross_component(0.0, 1.0, 0.07), 0.0);
        // And an interior point that does not clamp:
        let v = anticross_component(0.8, 0.5, 0.1);
        assert!((v - 0.75).abs() < 1e-6);
    }

    #[test]
    fn channels_must_differ() {
        assert!(ColorChannels::new(Channel::Red, Channel::Red).is_err());
        let cc = ColorChannels::new(Channel::Red, Channel::Green).unwrap();
        assert_eq!(cc.right.mask(), [false, true, false, false]);
    }

    #[test]
    fn settings_from_config_validates_names() {
        let mut cfg = StereoConfig::default();
        cfg.stereo_mode = "quad-buffered".to_string();
        assert!(matches!(
            StereoSettings::from_config(&cfg),
            Err(StereoError::InvalidMode(_))
        ));

        let mut cfg = StereoConfig::default();
        cfg.color_channels[1] = "cyan".to_string();
        assert!(matches!(
            StereoSettings::from_config(&cfg),
            Err(StereoError::InvalidChannel(_))
        ));

        let cfg = StereoConfig::default();
        let settings = StereoSettings::from_config(&cfg).unwrap();
        assert_eq!(settings.mode, StereoMode::LeftRightSplit);
        assert_eq!(settings.channels, ColorChannels::default());
    }

    #[test]
    fn out_of_range_config_is_a_config_error() {
        let mut cfg = StereoConfig::default();
        cfg.cross_talk = [0.0, 1.0];
        assert!(matches!(
            StereoSettings::from_config(&cfg),
            Err(StereoError::InvalidConfig { path: None, .. })
        ));
    }

    #[test]
    fn sequential_parity_schedule() {
        assert_eq!(sequential_eye(0), Eye::Left);
        assert_eq!(sequential_eye(1), Eye::Right);
        assert_eq!(sequential_eye(2), Eye::Left);
    }

    #[test]
    fn rect_to_ndc_spans_the_window() {
        let full = Rect::new(0, 0, 800, 600).to_ndc(800, 600);
        assert_eq!(full, [-1.0, -1.0, 1.0, 1.0]);
        let top = Rect::new(0, 300, 800, 300).to_ndc(800, 600);
        assert_eq!(top, [-1.0, 0.0, 1.0, 1.0]);
    }
}
