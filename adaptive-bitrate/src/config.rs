//! Configuration types for the profile ladder

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::ladder::ProfileLadder;
use crate::profile::Profile;

/// Base profile and degradation settings
///
/// Stored in the `[profile]` table of the adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Base (best) resolution, e.g. "1920x1080"
    pub resolution: String,

    /// Base bitrate, e.g. "2000k"
    pub bitrate: String,

    /// Base frame rate in fps
    pub fps: u32,

    /// Number of degradation steps below the base profile (must be at least 1)
    #[serde(default = "default_degradation_steps")]
    pub degradation_steps: u32,
}

fn default_degradation_steps() -> u32 {
    4
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            resolution: "1920x1080".to_string(),
            bitrate: "2000k".to_string(),
            fps: 30,
            degradation_steps: default_degradation_steps(),
        }
    }
}

impl ProfileConfig {
    /// Parse the base profile
    pub fn base_profile(&self) -> Result<Profile, ProfileError> {
        Profile::parse(&self.resolution, &self.bitrate, self.fps)
    }

    /// Build the ladder described by this config
    pub fn ladder(&self) -> Result<ProfileLadder, ProfileError> {
        ProfileLadder::generate(self.base_profile()?, self.degradation_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_default_steps() {
        let config: ProfileConfig = toml::from_str(
            r#"
            resolution = "1280x720"
            bitrate = "1500k"
            fps = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.degradation_steps, 4);
        assert_eq!(config.base_profile().unwrap(), Profile::new(1280, 720, 1500, 25));
        assert_eq!(config.ladder().unwrap().len(), 5);
    }

    #[test]
    fn test_zero_steps_rejected() {
        let config = ProfileConfig {
            degradation_steps: 0,
            ..ProfileConfig::default()
        };
        assert!(matches!(
            config.ladder(),
            Err(ProfileError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_bad_resolution_rejected() {
        let config = ProfileConfig {
            resolution: "hd".to_string(),
            ..ProfileConfig::default()
        };
        assert!(matches!(
            config.ladder(),
            Err(ProfileError::Parse { field: "resolution", .. })
        ));
    }
}
