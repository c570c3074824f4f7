//! Fans profile decisions out to every configured encoder

use adaptive_bitrate::{Profile, ProfileSink};
use tracing::{error, info, info_span, Span};

use crate::config::{DeviceConfig, EncoderConfig};
use crate::error::EncoderError;
use crate::process::{ProcessLauncher, SystemLauncher};
use crate::supervisor::{EncoderSupervisor, StopOutcome};

/// Result of applying one profile across the fleet
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Devices that were (re)started successfully
    pub restarted: Vec<String>,
    /// Devices already running the profile
    pub unchanged: Vec<String>,
    /// Devices whose start failed
    pub failed: Vec<EncoderError>,
}

/// One supervisor per configured device, always visited in configuration order
pub struct FleetController<L: ProcessLauncher + Clone = SystemLauncher> {
    supervisors: Vec<EncoderSupervisor<L>>,
    span: Span,
}

impl FleetController<SystemLauncher> {
    /// Fleet of real ffmpeg processes
    pub fn system(devices: &[DeviceConfig], config: &EncoderConfig) -> Self {
        Self::new(devices, config, SystemLauncher)
    }
}

impl<L: ProcessLauncher + Clone> FleetController<L> {
    /// Build the fleet. With no devices configured, a single synthetic
    /// `testsrc` device writing to `config.fallback_output` is used.
    pub fn new(devices: &[DeviceConfig], config: &EncoderConfig, launcher: L) -> Self {
        Self::with_span(devices, config, launcher, info_span!("fleet"))
    }

    /// Build the fleet logging under the given span; each supervisor gets a child span
    pub fn with_span(devices: &[DeviceConfig], config: &EncoderConfig, launcher: L, span: Span) -> Self {
        let devices = if devices.is_empty() {
            info!(
                parent: &span,
                output = %config.fallback_output,
                "No devices configured, using test source"
            );
            vec![DeviceConfig::test_source(config.fallback_output.clone())]
        } else {
            devices.to_vec()
        };

        let supervisors: Vec<_> = devices
            .into_iter()
            .map(|device| {
                let child = info_span!(parent: &span, "encoder", device = %device.name);
                EncoderSupervisor::with_span(device, config, launcher.clone(), child)
            })
            .collect();

        info!(parent: &span, devices = supervisors.len(), "Fleet initialised");
        Self { supervisors, span }
    }

    /// Apply `profile` to every device that is not already running it.
    ///
    /// A failing device never prevents the others from being visited.
    pub fn apply(&mut self, profile: &Profile) -> ApplyReport {
        let span = &self.span;
        let mut report = ApplyReport::default();
        for supervisor in &mut self.supervisors {
            let name = supervisor.device().name.clone();
            match supervisor.restart_if_needed(profile) {
                Ok(true) => report.restarted.push(name),
                Ok(false) => report.unchanged.push(name),
                Err(e) => {
                    error!(parent: span, device = %name, profile = %profile, error = %e, "Failed to apply profile");
                    report.failed.push(e);
                }
            }
        }
        if !report.failed.is_empty() {
            error!(
                parent: &self.span,
                profile = %profile,
                failed = report.failed.len(),
                "Some encoders failed to start"
            );
        }
        report
    }

    /// Start (or restart) every device at `profile`, regardless of what is running
    pub fn start_all(&mut self, profile: &Profile) -> Vec<EncoderError> {
        self.supervisors
            .iter_mut()
            .filter_map(|supervisor| supervisor.start(profile).err())
            .collect()
    }

    /// Stop every device. Errors are logged and the remaining devices still stopped.
    pub fn stop_all(&mut self) -> Vec<(String, StopOutcome)> {
        let span = &self.span;
        let mut outcomes = Vec::with_capacity(self.supervisors.len());
        for supervisor in &mut self.supervisors {
            let name = supervisor.device().name.clone();
            match supervisor.stop() {
                Ok(outcome) => outcomes.push((name, outcome)),
                Err(e) => error!(parent: span, device = %name, error = %e, "Failed to stop encoder"),
            }
        }
        info!(parent: &self.span, "All encoders stopped");
        outcomes
    }

    pub fn supervisors(&self) -> &[EncoderSupervisor<L>] {
        &self.supervisors
    }

    pub fn len(&self) -> usize {
        self.supervisors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supervisors.is_empty()
    }

    /// Number of devices with a running encoder
    pub fn running(&self) -> usize {
        self.supervisors.iter().filter(|s| s.is_running()).count()
    }
}

impl<L: ProcessLauncher + Clone> ProfileSink for FleetController<L> {
    fn restart_if_needed(&mut self, profile: &Profile) {
        self.apply(profile);
    }
}
