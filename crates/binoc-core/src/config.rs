use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::StereoError;

/// JSON configuration surface consumed at construction / mode-switch time.
///
/// This stays stringly-typed on purpose: it is the file-facing layer.
/// `binoc-modes` turns a validated `StereoConfig` into typed settings
/// (mode enum, geometry overrides, cross-talk, channel pair).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StereoConfig {
    /// One of the seven mode names, e.g. "left-right-split".
    pub stereo_mode: String,

    /// [leakage into the left eye from the right, leakage into the right
    /// eye from the left]. Each in [0, 1).
    #[serde(default)]
    pub cross_talk: [f32; 2],

    /// Fraction of the window given to the first eye region in split modes.
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f32,

    /// Shift both eyes' images by [x, y] pixels (e.g. limited-FOV scanner coils).
    #[serde(default)]
    pub offset: [f32; 2],

    /// Horizontal inward shift in pixels (+ for the left eye, - for the right).
    #[serde(default)]
    pub vergence: f32,

    /// Vertical divergent shift in pixels (up for the left eye, down for the right).
    #[serde(default)]
    pub tilt: f32,

    /// Swap which eye lands in which region (cross-fusion / bottom-top rigs).
    #[serde(default)]
    pub swap_eyes: bool,

    /// Channel pair for the anaglyph mode: [left eye channel, right eye channel].
    #[serde(default = "default_color_channels")]
    pub color_channels: [String; 2],

    /// Clear color applied when an eye buffer is selected.
    #[serde(default)]
    pub background: [f32; 3],
}

fn default_split_ratio() -> f32 {
    0.5
}

fn default_color_channels() -> [String; 2] {
    ["red".to_string(), "blue".to_string()]
}

impl StereoConfig {
    /// Load and range-check a config file.
    ///
    /// Mode and channel *names* are validated by `binoc-modes` when the
    /// config is turned into typed settings; this layer only checks the
    /// numeric ranges it owns.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, StereoError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| StereoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: StereoConfig =
            serde_json::from_slice(&bytes).map_err(|source| StereoError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.check_ranges()
            .map_err(|msg| StereoError::InvalidConfig {
                path: Some(path.to_path_buf()),
                msg,
            })?;
        Ok(cfg)
    }

    /// Numeric range checks shared by the file and in-memory paths.
    pub fn check_ranges(&self) -> Result<(), String> {
        for (i, ct) in self.cross_talk.iter().enumerate() {
            if !(0.0..1.0).contains(ct) {
                return Err(format!("cross_talk[{i}] = {ct} outside [0, 1)"));
            }
        }
        if !(0.0 < self.split_ratio && self.split_ratio < 1.0) {
            return Err(format!(
                "split_ratio = {} outside (0, 1)",
                self.split_ratio
            ));
        }
        Ok(())
    }
}

impl Default for StereoConfig {
    fn default() -> Self {
        Self {
            stereo_mode: "left-right-split".to_string(),
            cross_talk: [0.0, 0.0],
            split_ratio: default_split_ratio(),
            offset: [0.0, 0.0],
            vergence: 0.0,
            tilt: 0.0,
            swap_eyes: false,
            color_channels: default_color_channels(),
            background: [0.0, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_range_checks() {
        StereoConfig::default().check_ranges().expect("defaults valid");
    }

    #[test]
    fn cross_talk_must_stay_below_one() {
        let mut cfg = StereoConfig::default();
        cfg.cross_talk = [0.07, 1.0];
        let err = cfg.check_ranges().expect_err("1.0 is out of range");
        assert!(err.contains("cross_talk[1]"), "unexpected err: {err}");
    }

    #[test]
    fn split_ratio_bounds_are_exclusive() {
        for bad in [0.0, 1.0, -0.25] {
            let mut cfg = StereoConfig::default();
            cfg.split_ratio = bad;
            assert!(cfg.check_ranges().is_err(), "split_ratio {bad} accepted");
        }
    }
}
