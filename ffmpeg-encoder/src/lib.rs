//! FFmpeg encoder supervision
//!
//! Runs one ffmpeg process per capture device and restarts it only when the
//! requested encoder profile actually changes.
//!
//! # Features
//! - Synthetic `testsrc` pattern or V4L2 capture, encoded to MPEG-TS
//! - Commands built as argument vectors, never through a shell
//! - Immediate liveness probe after spawn, with optional grace period
//! - SIGTERM with bounded wait, escalating to SIGKILL
//! - Per-device failure isolation across the fleet
//!
//! # Example
//! ```ignore
//! use adaptive_bitrate::Profile;
//! use ffmpeg_encoder::{DeviceConfig, EncoderConfig, FleetController};
//!
//! let devices = vec![DeviceConfig::new("/dev/video0", "udp://10.0.0.2:5000")];
//! let mut fleet = FleetController::system(&devices, &EncoderConfig::default());
//!
//! fleet.apply(&Profile::new(1280, 720, 1500, 25));
//! // Same profile again: nothing is restarted
//! fleet.apply(&Profile::new(1280, 720, 1500, 25));
//! fleet.stop_all();
//! ```

pub mod command;
pub mod config;
mod error;
pub mod fleet;
pub mod process;
pub mod supervisor;

pub use command::{EncoderCommand, TEST_SOURCE_DEVICE};
pub use config::{DeviceConfig, EncoderConfig};
pub use error::EncoderError;
pub use fleet::{ApplyReport, FleetController};
pub use process::{EncoderProcess, ProcessLauncher, SystemLauncher};
pub use supervisor::{EncoderState, EncoderSupervisor, StopOutcome};

/// First line of the encoder's `-version` output
pub fn encoder_version(program: &str) -> Option<String> {
    let output = std::process::Command::new(program)
        .arg("-version")
        .output()
        .ok()?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.lines().next().map(|s| s.to_string())
    } else {
        None
    }
}
