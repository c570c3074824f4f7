//! Encoder command construction
//!
//! Commands are argument vectors, never shell strings, so device names and
//! output targets reach ffmpeg verbatim.

use std::fmt;
use std::process::{Command, Stdio};

use adaptive_bitrate::Profile;

use crate::config::DeviceConfig;

/// Device name that selects ffmpeg's synthetic `testsrc` pattern instead of a capture device
pub const TEST_SOURCE_DEVICE: &str = "testsrc";

/// Program plus discrete arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EncoderCommand {
    /// Build the encoder invocation for `device` at `profile`
    pub fn build(program: &str, device: &DeviceConfig, profile: &Profile) -> Self {
        let mut args: Vec<String> = ["-hide_banner", "-nostats", "-loglevel", "warning"]
            .into_iter()
            .map(String::from)
            .collect();

        if device.is_test_source() {
            args.extend([
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!("testsrc=rate={}:size={}", profile.fps, profile.resolution()),
                "-vcodec".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                "ultrafast".to_string(),
            ]);
        } else {
            args.extend([
                "-f".to_string(),
                "v4l2".to_string(),
                "-framerate".to_string(),
                profile.fps.to_string(),
                "-video_size".to_string(),
                profile.resolution(),
                "-i".to_string(),
                device.name.clone(),
            ]);
        }

        args.extend([
            "-b:v".to_string(),
            profile.bitrate(),
            "-f".to_string(),
            "mpegts".to_string(),
            device.output.clone(),
        ]);

        Self {
            program: program.to_string(),
            args,
        }
    }

    /// A `std::process::Command` ready to spawn, with stderr captured for diagnostics
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

impl fmt::Display for EncoderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}
