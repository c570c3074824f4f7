//! Encoder quality profile

use std::fmt;
use std::str::FromStr;

use crate::error::ProfileError;

/// One rung of the quality ladder: resolution, bitrate and frame rate.
///
/// Profiles are plain values. Two profiles are equal iff all four fields are equal,
/// which is what the encoder supervisor relies on to skip redundant restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Profile {
    /// Width in pixels
    pub width_px: u32,
    /// Height in pixels
    pub height_px: u32,
    /// Target bitrate in kbps
    pub bitrate_kbps: u32,
    /// Frame rate in fps
    pub fps: u32,
}

impl Profile {
    pub const fn new(width_px: u32, height_px: u32, bitrate_kbps: u32, fps: u32) -> Self {
        Self {
            width_px,
            height_px,
            bitrate_kbps,
            fps,
        }
    }

    /// Build a profile from the textual forms used in configuration files:
    /// `"1920x1080"`, `"2000k"` and `30`.
    pub fn parse(resolution: &str, bitrate: &str, fps: u32) -> Result<Self, ProfileError> {
        let (width_px, height_px) = parse_resolution(resolution)?;
        let bitrate_kbps = parse_bitrate(bitrate)?;
        if fps == 0 {
            return Err(ProfileError::Parse {
                field: "fps",
                value: fps.to_string(),
            });
        }
        Ok(Self::new(width_px, height_px, bitrate_kbps, fps))
    }

    /// Resolution in the `WxH` form ffmpeg expects
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width_px, self.height_px)
    }

    /// Bitrate in the `Nk` form ffmpeg expects
    pub fn bitrate(&self) -> String {
        format!("{}k", self.bitrate_kbps)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {}k {}fps",
            self.width_px, self.height_px, self.bitrate_kbps, self.fps
        )
    }
}

impl FromStr for Profile {
    type Err = ProfileError;

    /// Parse the `Display` form, e.g. `"1280x720 1500k 25fps"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(resolution), Some(bitrate), Some(fps), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ProfileError::Parse {
                field: "profile",
                value: s.to_string(),
            });
        };
        let fps = fps
            .trim_end_matches("fps")
            .parse()
            .map_err(|_| ProfileError::Parse {
                field: "fps",
                value: fps.to_string(),
            })?;
        Self::parse(resolution, bitrate, fps)
    }
}

/// Parse `"WxH"` into pixel dimensions
pub fn parse_resolution(value: &str) -> Result<(u32, u32), ProfileError> {
    let err = || ProfileError::Parse {
        field: "resolution",
        value: value.to_string(),
    };
    let (w, h) = value.trim().split_once(['x', 'X']).ok_or_else(err)?;
    let width: u32 = w.trim().parse().map_err(|_| err())?;
    let height: u32 = h.trim().parse().map_err(|_| err())?;
    if width == 0 || height == 0 {
        return Err(err());
    }
    Ok((width, height))
}

/// Parse `"2000k"` or `"2000"` into kbps
pub fn parse_bitrate(value: &str) -> Result<u32, ProfileError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_suffix('k')
        .or_else(|| trimmed.strip_suffix('K'))
        .unwrap_or(trimmed);
    match digits.parse::<u32>() {
        Ok(kbps) if kbps > 0 => Ok(kbps),
        _ => Err(ProfileError::Parse {
            field: "bitrate",
            value: value.to_string(),
        }),
    }
}
