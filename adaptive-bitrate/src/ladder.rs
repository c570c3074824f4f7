//! Quality ladder generation
//!
//! The ladder is an ordered list of profiles from the base (best) profile at
//! index 0 down to the most degraded profile at index `steps`. Each step removes
//! an equal share of the base resolution and bitrate and three frames per second.

use std::ops::Index;

use crate::error::ProfileError;
use crate::profile::Profile;

/// Width used when a degraded dimension collapses to 0 or 1
pub const MIN_WIDTH_PX: u32 = 320;
/// Height used when a degraded dimension collapses to 0 or 1
pub const MIN_HEIGHT_PX: u32 = 240;
/// Lowest bitrate any rung is encoded at
pub const MIN_BITRATE_KBPS: u32 = 300;
/// Frames per second removed per degradation step
pub const FPS_STEP: u32 = 3;
/// Frame rates below this are replaced with [`LOW_FPS_OVERRIDE`]
pub const LOW_FPS_THRESHOLD: u32 = 10;
pub const LOW_FPS_OVERRIDE: u32 = 12;

/// Immutable ladder of `steps + 1` profiles, best first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLadder {
    profiles: Vec<Profile>,
}

impl ProfileLadder {
    /// Generate the ladder for a base profile and a number of degradation steps.
    ///
    /// Fails with [`ProfileError::InvalidConfiguration`] if `steps < 1`.
    pub fn generate(base: Profile, steps: u32) -> Result<Self, ProfileError> {
        if steps < 1 {
            return Err(ProfileError::InvalidConfiguration(
                "degradation steps must be at least 1".to_string(),
            ));
        }

        let profiles = (0..=steps).map(|step| degrade(&base, step, steps)).collect();
        Ok(Self { profiles })
    }

    /// Profile at `index` (0 = best), if in range
    pub fn get(&self, index: usize) -> Option<&Profile> {
        self.profiles.get(index)
    }

    /// Number of degradation steps below the base profile
    pub fn steps(&self) -> usize {
        self.profiles.len() - 1
    }

    /// Number of profiles (always `steps() + 1`)
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always false: a ladder holds at least the base and one degraded profile
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn best(&self) -> &Profile {
        &self.profiles[0]
    }

    pub fn worst(&self) -> &Profile {
        &self.profiles[self.profiles.len() - 1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Profile> {
        self.profiles.iter()
    }

    pub fn as_slice(&self) -> &[Profile] {
        &self.profiles
    }
}

impl Index<usize> for ProfileLadder {
    type Output = Profile;

    fn index(&self, index: usize) -> &Profile {
        &self.profiles[index]
    }
}

impl<'a> IntoIterator for &'a ProfileLadder {
    type Item = &'a Profile;
    type IntoIter = std::slice::Iter<'a, Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}

/// Compute the profile for one `step` of a `steps`-step ladder
fn degrade(base: &Profile, step: u32, steps: u32) -> Profile {
    let (step, steps) = (step as i64, steps as i64);

    let width = shrink(base.width_px as i64, step, steps, MIN_WIDTH_PX);
    let height = shrink(base.height_px as i64, step, steps, MIN_HEIGHT_PX);

    // round(B * (steps - step) / steps), half away from zero
    let remaining = base.bitrate_kbps as i64 * (steps - step);
    let bitrate = ((2 * remaining + steps) / (2 * steps)) as u32;
    let bitrate = bitrate.max(MIN_BITRATE_KBPS);

    // Two-stage clamp: floor at 1, then anything under 10 becomes 12.
    // The second stage can raise the tail above its neighbours; kept as-is.
    let mut fps = base.fps as i64 - step * FPS_STEP as i64;
    if fps <= 0 {
        fps = 1;
    }
    let mut fps = fps as u32;
    if fps < LOW_FPS_THRESHOLD {
        fps = LOW_FPS_OVERRIDE;
    }

    Profile::new(width, height, bitrate, fps)
}

/// `dim - step * (dim / steps)`, replaced by `fallback` when it collapses to 1 or less
fn shrink(dim: i64, step: i64, steps: i64, fallback: u32) -> u32 {
    let value = dim - step * (dim / steps);
    if value <= 1 {
        fallback
    } else {
        value as u32
    }
}
