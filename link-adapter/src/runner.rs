//! Signal polling loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use adaptive_bitrate::{PolicyEngine, ProfileSink};
use link_telemetry::{SignalSource, TelemetryError};
use tracing::{error, info};

/// Granularity of the shutdown check while waiting between polls
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Why the loop ended
#[derive(Debug)]
pub enum LoopExit {
    /// The shutdown flag was raised
    Shutdown,
    /// The source returned no reading
    MissingReading,
    /// The source failed
    Telemetry(TelemetryError),
}

/// Poll `source` every `interval` and feed each reading to `policy` until
/// shutdown is requested or no reading is available.
pub fn run_loop<Src, S>(
    source: &mut Src,
    policy: &mut PolicyEngine<S>,
    interval: Duration,
    shutdown: &AtomicBool,
) -> LoopExit
where
    Src: SignalSource,
    S: ProfileSink,
{
    info!(interval_secs = interval.as_secs(), "Starting signal loop");
    let mut cycles: u64 = 0;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            info!(cycles, "Shutdown requested");
            return LoopExit::Shutdown;
        }

        match source.signal_info() {
            Ok(Some(reading)) => {
                policy.evaluate(&reading);
            }
            Ok(None) => {
                error!(cycles, "No signal information available");
                return LoopExit::MissingReading;
            }
            Err(e) => {
                error!(cycles, error = %e, "Failed to read signal information");
                return LoopExit::Telemetry(e);
            }
        }
        cycles += 1;

        if wait_or_shutdown(interval, shutdown) {
            info!(cycles, "Shutdown requested");
            return LoopExit::Shutdown;
        }
    }
}

/// Sleep for `interval` in short slices; true if shutdown was raised meanwhile
fn wait_or_shutdown(interval: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        std::thread::sleep(SHUTDOWN_POLL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptive_bitrate::{Profile, ProfileLadder, SignalReading};
    use std::collections::VecDeque;

    struct ScriptedSource {
        readings: VecDeque<Result<Option<SignalReading>, TelemetryError>>,
    }

    impl ScriptedSource {
        fn new(readings: Vec<Option<SignalReading>>) -> Self {
            Self {
                readings: readings.into_iter().map(Ok).collect(),
            }
        }
    }

    impl SignalSource for ScriptedSource {
        fn signal_info(&mut self) -> Result<Option<SignalReading>, TelemetryError> {
            self.readings.pop_front().unwrap_or(Ok(None))
        }
    }

    #[derive(Default)]
    struct RecordingSink(Vec<Profile>);

    impl ProfileSink for RecordingSink {
        fn restart_if_needed(&mut self, profile: &Profile) {
            self.0.push(*profile);
        }
    }

    fn policy() -> PolicyEngine<RecordingSink> {
        let ladder = ProfileLadder::generate(Profile::new(1920, 1080, 2000, 30), 4).unwrap();
        PolicyEngine::new(ladder, RecordingSink::default())
    }

    #[test]
    fn test_stops_on_missing_reading() {
        let mut source = ScriptedSource::new(vec![
            Some(SignalReading::new(-55, -95)),
            Some(SignalReading::new(-85, -95)),
            None,
            Some(SignalReading::new(-55, -95)),
        ]);
        let mut policy = policy();
        let shutdown = AtomicBool::new(false);

        let exit = run_loop(&mut source, &mut policy, Duration::ZERO, &shutdown);

        assert!(matches!(exit, LoopExit::MissingReading));
        let ladder = policy.ladder().clone();
        assert_eq!(policy.sink().0, vec![ladder[0], ladder[3]]);
    }

    #[test]
    fn test_stops_on_telemetry_error() {
        let mut source = ScriptedSource {
            readings: VecDeque::from([Err(TelemetryError::InvalidAddress("x".to_string()))]),
        };
        let mut policy = policy();
        let shutdown = AtomicBool::new(false);

        let exit = run_loop(&mut source, &mut policy, Duration::ZERO, &shutdown);
        assert!(matches!(exit, LoopExit::Telemetry(_)));
        assert!(policy.sink().0.is_empty());
    }

    #[test]
    fn test_shutdown_before_first_poll() {
        let mut source = ScriptedSource::new(vec![Some(SignalReading::new(-55, -95))]);
        let mut policy = policy();
        let shutdown = AtomicBool::new(true);

        let exit = run_loop(&mut source, &mut policy, Duration::from_secs(60), &shutdown);
        assert!(matches!(exit, LoopExit::Shutdown));
        assert!(policy.sink().0.is_empty());
    }

    #[test]
    fn test_shutdown_interrupts_wait() {
        let shutdown = AtomicBool::new(false);
        let start = Instant::now();
        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(50));
                shutdown.store(true, Ordering::SeqCst);
            });
            assert!(wait_or_shutdown(Duration::from_secs(30), &shutdown));
        });
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
