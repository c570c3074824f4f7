//! Signal-to-noise policy
//!
//! Maps each signal reading to a ladder index and forwards the selected profile
//! to whatever applies it. Every full 10 dB of margin above the noise floor buys
//! one step up the ladder. Readings are evaluated independently: there is no
//! smoothing or hysteresis, so a reading oscillating across a 10 dB boundary
//! produces oscillating profile requests.

use tracing::{info, info_span, Span};

use crate::ladder::ProfileLadder;
use crate::profile::Profile;

/// Value used for a missing RSSI or noise figure, in dBm
pub const DEFAULT_SIGNAL_DBM: i32 = -100;

/// dB of SNR per ladder step
pub const SNR_PER_STEP_DB: i64 = 10;

/// Raw signal figures from the telemetry source. Either may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalReading {
    /// Received signal strength in dBm
    pub rssi: Option<i32>,
    /// Noise floor in dBm
    pub noise: Option<i32>,
}

impl SignalReading {
    pub fn new(rssi: i32, noise: i32) -> Self {
        Self {
            rssi: Some(rssi),
            noise: Some(noise),
        }
    }

    pub fn rssi_or_default(&self) -> i32 {
        self.rssi.unwrap_or(DEFAULT_SIGNAL_DBM)
    }

    pub fn noise_or_default(&self) -> i32 {
        self.noise.unwrap_or(DEFAULT_SIGNAL_DBM)
    }

    /// `rssi - noise` in dB, with absent values defaulted
    pub fn snr(&self) -> i64 {
        self.rssi_or_default() as i64 - self.noise_or_default() as i64
    }
}

/// Receiver of profile decisions.
///
/// Implementors decide for themselves whether a profile differs from what they
/// are currently running; the policy always forwards.
pub trait ProfileSink {
    fn restart_if_needed(&mut self, profile: &Profile);
}

impl<S: ProfileSink + ?Sized> ProfileSink for &mut S {
    fn restart_if_needed(&mut self, profile: &Profile) {
        (**self).restart_if_needed(profile)
    }
}

/// Outcome of evaluating a single reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub snr: i64,
    pub index: usize,
    pub profile: Profile,
}

/// Ladder index for an SNR value on a ladder with `steps` degradation steps.
///
/// Negative SNR counts as zero; the result is clamped to `[0, steps]`.
pub fn ladder_index(snr: i64, steps: usize) -> usize {
    let effective = snr.max(0);
    let steps = steps as i64;
    let index = steps - effective / SNR_PER_STEP_DB;
    index.clamp(0, steps) as usize
}

/// Selects a ladder profile for each reading and forwards it to a sink
pub struct PolicyEngine<S> {
    ladder: ProfileLadder,
    sink: S,
    span: Span,
}

impl<S: ProfileSink> PolicyEngine<S> {
    pub fn new(ladder: ProfileLadder, sink: S) -> Self {
        let span = info_span!("policy", steps = ladder.steps());
        Self::with_span(ladder, sink, span)
    }

    /// Create an engine that logs under the given span
    pub fn with_span(ladder: ProfileLadder, sink: S, span: Span) -> Self {
        info!(parent: &span, base = %ladder.best(), steps = ladder.steps(), "Policy initialised");
        for (index, profile) in ladder.iter().enumerate() {
            info!(parent: &span, index, profile = %profile, "Ladder rung");
        }
        Self { ladder, sink, span }
    }

    /// Pick the ladder entry for a reading without applying it
    pub fn select(&self, reading: &SignalReading) -> Selection {
        let snr = reading.snr();
        let index = ladder_index(snr, self.ladder.steps());
        Selection {
            snr,
            index,
            profile: self.ladder[index],
        }
    }

    /// Evaluate a reading and forward the selected profile to the sink
    pub fn evaluate(&mut self, reading: &SignalReading) -> Selection {
        let selection = self.select(reading);
        info!(
            parent: &self.span,
            snr = selection.snr,
            rssi = reading.rssi_or_default(),
            noise = reading.noise_or_default(),
            "Signal evaluated"
        );
        info!(
            parent: &self.span,
            index = selection.index,
            profile = %selection.profile,
            "Applying profile to all devices"
        );
        self.sink.restart_if_needed(&selection.profile);
        selection
    }

    pub fn ladder(&self) -> &ProfileLadder {
        &self.ladder
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
