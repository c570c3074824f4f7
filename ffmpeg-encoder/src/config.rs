use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::command::TEST_SOURCE_DEVICE;

/// One capture device and where its encoded stream goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Capture device path (e.g. "/dev/video0"), or "testsrc" for a synthetic pattern
    pub name: String,
    /// ffmpeg output target (e.g. "udp://10.0.0.2:5000")
    pub output: String,
}

impl DeviceConfig {
    pub fn new(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
        }
    }

    /// Synthetic test-pattern source writing to `output`
    pub fn test_source(output: impl Into<String>) -> Self {
        Self::new(TEST_SOURCE_DEVICE, output)
    }

    pub fn is_test_source(&self) -> bool {
        self.name == TEST_SOURCE_DEVICE
    }
}

/// Encoder process settings shared by every device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Encoder executable (default: "ffmpeg")
    #[serde(default = "default_program")]
    pub program: String,
    /// Seconds to wait for SIGTERM before escalating to SIGKILL (default: 5)
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
    /// Milliseconds to wait after spawn before the liveness probe (default: 0, probe immediately)
    #[serde(default)]
    pub startup_grace_ms: u64,
    /// Output used by the synthetic source when no devices are configured
    #[serde(default = "default_fallback_output")]
    pub fallback_output: String,
}

fn default_program() -> String {
    "ffmpeg".to_string()
}

fn default_stop_timeout_secs() -> u64 {
    5
}

fn default_fallback_output() -> String {
    "udp://127.0.0.1:5000".to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            stop_timeout_secs: default_stop_timeout_secs(),
            startup_grace_ms: 0,
            fallback_output: default_fallback_output(),
        }
    }
}

impl EncoderConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }
}
