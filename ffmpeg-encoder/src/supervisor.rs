use std::fmt;
use std::time::{Duration, Instant};

use adaptive_bitrate::Profile;
use tracing::{error, info, info_span, warn, Span};

use crate::command::EncoderCommand;
use crate::config::{DeviceConfig, EncoderConfig};
use crate::error::EncoderError;
use crate::process::{EncoderProcess, ProcessLauncher, SystemLauncher};

/// How often `stop()` re-checks a terminating process
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle state of one encoder
pub enum EncoderState {
    Stopped,
    Running {
        profile: Profile,
        process: Box<dyn EncoderProcess>,
    },
}

impl fmt::Debug for EncoderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderState::Stopped => write!(f, "Stopped"),
            EncoderState::Running { profile, process } => f
                .debug_struct("Running")
                .field("profile", profile)
                .field("pid", &process.id())
                .finish(),
        }
    }
}

/// How a `stop()` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was running
    AlreadyStopped,
    /// The process exited after SIGTERM
    Graceful,
    /// The process ignored SIGTERM past the timeout and was killed
    Killed,
}

/// Owns the encoder process for one device
///
/// The only way a new profile reaches a running encoder is stop-then-start;
/// a running process is never reconfigured in place.
pub struct EncoderSupervisor<L: ProcessLauncher = SystemLauncher> {
    device: DeviceConfig,
    program: String,
    stop_timeout: Duration,
    startup_grace: Duration,
    launcher: L,
    state: EncoderState,
    span: Span,
}

impl EncoderSupervisor<SystemLauncher> {
    /// Supervisor that launches real processes
    pub fn system(device: DeviceConfig, config: &EncoderConfig) -> Self {
        Self::new(device, config, SystemLauncher)
    }
}

impl<L: ProcessLauncher> EncoderSupervisor<L> {
    pub fn new(device: DeviceConfig, config: &EncoderConfig, launcher: L) -> Self {
        let span = info_span!("encoder", device = %device.name);
        Self::with_span(device, config, launcher, span)
    }

    /// Create a supervisor that logs under the given span
    pub fn with_span(device: DeviceConfig, config: &EncoderConfig, launcher: L, span: Span) -> Self {
        info!(parent: &span, output = %device.output, "Encoder supervisor created");
        Self {
            device,
            program: config.program.clone(),
            stop_timeout: config.stop_timeout(),
            startup_grace: config.startup_grace(),
            launcher,
            state: EncoderState::Stopped,
            span,
        }
    }

    /// Start the encoder at `profile`, stopping any running process first.
    ///
    /// If the process cannot be launched or has already exited when probed,
    /// returns [`EncoderError::SpawnFailure`] and the supervisor stays stopped.
    pub fn start(&mut self, profile: &Profile) -> Result<(), EncoderError> {
        let previous = self.current_profile().copied();
        if matches!(self.state, EncoderState::Running { .. }) {
            self.stop()?;
        }

        let command = EncoderCommand::build(&self.program, &self.device, profile);

        // Stderr lines from the child are logged under this supervisor's span
        let launched = self.span.in_scope(|| self.launcher.launch(&command));
        let mut process = match launched {
            Ok(process) => process,
            Err(e) => return Err(self.spawn_failure(&command, e.to_string())),
        };

        if !self.startup_grace.is_zero() {
            std::thread::sleep(self.startup_grace);
        }

        match process.has_exited() {
            Ok(false) => {}
            Ok(true) => {
                let diagnostics = process.diagnostics();
                return Err(self.spawn_failure(&command, diagnostics));
            }
            Err(e) => {
                let _ = process.kill();
                return Err(self.spawn_failure(&command, e.to_string()));
            }
        }

        info!(
            parent: &self.span,
            previous = %DisplayProfile(previous.as_ref()),
            profile = %profile,
            pid = process.id(),
            command = %command,
            "Encoder started"
        );
        self.state = EncoderState::Running {
            profile: *profile,
            process,
        };
        Ok(())
    }

    /// Stop the encoder, waiting up to the stop timeout before killing it.
    ///
    /// A no-op when already stopped. The state is `Stopped` afterwards even if
    /// signalling failed.
    pub fn stop(&mut self) -> Result<StopOutcome, EncoderError> {
        let EncoderState::Running {
            profile,
            mut process,
        } = std::mem::replace(&mut self.state, EncoderState::Stopped)
        else {
            return Ok(StopOutcome::AlreadyStopped);
        };

        info!(parent: &self.span, profile = %profile, pid = process.id(), "Stopping encoder");

        if let Err(e) = process.terminate() {
            // ESRCH and friends: it may already be gone, the wait below decides
            warn!(parent: &self.span, error = %e, "Failed to signal encoder");
        }

        let deadline = Instant::now() + self.stop_timeout;
        loop {
            match process.has_exited() {
                Ok(true) => {
                    info!(parent: &self.span, profile = %profile, "Encoder stopped");
                    return Ok(StopOutcome::Graceful);
                }
                Ok(false) => {}
                Err(e) => {
                    // Exit status unknown; the state is already Stopped, so nothing may keep running
                    if let Err(kill_err) = process.kill() {
                        warn!(parent: &self.span, pid = process.id(), error = %kill_err, "Failed to kill encoder");
                    }
                    return Err(e.into());
                }
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(STOP_POLL_INTERVAL.min(deadline - now));
        }

        warn!(
            parent: &self.span,
            profile = %profile,
            timeout_ms = self.stop_timeout.as_millis() as u64,
            "Encoder ignored SIGTERM, escalated to kill"
        );
        if let Err(e) = process.kill() {
            error!(parent: &self.span, pid = process.id(), error = %e, "Failed to kill encoder");
            return Err(e.into());
        }
        Ok(StopOutcome::Killed)
    }

    /// Start at `profile` unless already running exactly that profile.
    ///
    /// Returns whether a (re)start was attempted.
    pub fn restart_if_needed(&mut self, profile: &Profile) -> Result<bool, EncoderError> {
        let current = self.current_profile().copied();
        if current.as_ref() == Some(profile) {
            return Ok(false);
        }

        info!(
            parent: &self.span,
            previous = %DisplayProfile(current.as_ref()),
            profile = %profile,
            "Profile changed"
        );
        self.start(profile)?;
        Ok(true)
    }

    /// Profile of the running encoder, if any
    pub fn current_profile(&self) -> Option<&Profile> {
        match &self.state {
            EncoderState::Running { profile, .. } => Some(profile),
            EncoderState::Stopped => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, EncoderState::Running { .. })
    }

    pub fn state(&self) -> &EncoderState {
        &self.state
    }

    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }

    fn spawn_failure(&self, command: &EncoderCommand, diagnostics: String) -> EncoderError {
        error!(
            parent: &self.span,
            command = %command,
            diagnostics = %diagnostics,
            "Encoder failed to start"
        );
        EncoderError::SpawnFailure {
            device: self.device.name.clone(),
            diagnostics,
        }
    }
}

impl<L: ProcessLauncher> Drop for EncoderSupervisor<L> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Renders a missing profile as "none" in log fields
struct DisplayProfile<'a>(Option<&'a Profile>);

impl fmt::Display for DisplayProfile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(profile) => fmt::Display::fmt(profile, f),
            None => f.write_str("none"),
        }
    }
}
