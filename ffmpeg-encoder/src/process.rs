//! Process launching behind a trait so supervision logic can run against fakes

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader};
use std::process::{Child, ChildStderr};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{warn, Span};

use crate::command::EncoderCommand;

/// Most recent stderr bytes kept for diagnostics
pub const MAX_DIAGNOSTIC_BYTES: usize = 4096;

/// How long `diagnostics` waits for the stderr reader to reach end of file
const DRAIN_WAIT: Duration = Duration::from_secs(1);

/// A running encoder process
pub trait EncoderProcess {
    /// OS process id
    fn id(&self) -> u32;

    /// Non-blocking exit check
    fn has_exited(&mut self) -> io::Result<bool>;

    /// Request graceful shutdown (SIGTERM)
    fn terminate(&mut self) -> io::Result<()>;

    /// Force the process down (SIGKILL) and reap it
    fn kill(&mut self) -> io::Result<()>;

    /// Tail of what the process wrote to stderr, for an exited process
    fn diagnostics(&mut self) -> String;
}

/// Creates encoder processes
pub trait ProcessLauncher {
    fn launch(&mut self, command: &EncoderCommand) -> io::Result<Box<dyn EncoderProcess>>;
}

/// Launches real OS processes.
///
/// Stderr is drained for the whole life of the child by a reader thread,
/// which forwards each line as a `warn` event under the span current at
/// launch and keeps the last [`MAX_DIAGNOSTIC_BYTES`] for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&mut self, command: &EncoderCommand) -> io::Result<Box<dyn EncoderProcess>> {
        let mut child = command.to_command().spawn()?;
        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(MAX_DIAGNOSTIC_BYTES)));
        let reader = match child.stderr.take() {
            Some(stderr) => {
                let spawned = spawn_stderr_reader(stderr, child.id(), Arc::clone(&tail));
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(e);
                    }
                }
            }
            None => None,
        };
        Ok(Box::new(SystemProcess {
            child,
            tail,
            reader,
        }))
    }
}

fn spawn_stderr_reader(
    stderr: ChildStderr,
    pid: u32,
    tail: Arc<Mutex<VecDeque<u8>>>,
) -> io::Result<JoinHandle<()>> {
    let span = Span::current();
    std::thread::Builder::new()
        .name(format!("encoder-stderr-{}", pid))
        .spawn(move || {
            let mut reader = BufReader::new(stderr);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        push_tail(&tail, &line);
                        let text = String::from_utf8_lossy(&line);
                        let text = text.trim();
                        if !text.is_empty() {
                            warn!(parent: &span, pid, "ffmpeg: {}", text);
                        }
                    }
                    Err(e) => {
                        warn!(parent: &span, pid, error = %e, "Stopped reading encoder stderr");
                        break;
                    }
                }
            }
        })
}

fn push_tail(tail: &Mutex<VecDeque<u8>>, bytes: &[u8]) {
    let mut tail = tail.lock().unwrap_or_else(PoisonError::into_inner);
    tail.extend(bytes);
    let excess = tail.len().saturating_sub(MAX_DIAGNOSTIC_BYTES);
    tail.drain(..excess);
}

/// Child process handle
pub struct SystemProcess {
    child: Child,
    tail: Arc<Mutex<VecDeque<u8>>>,
    reader: Option<JoinHandle<()>>,
}

impl EncoderProcess for SystemProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn has_exited(&mut self) -> io::Result<bool> {
        Ok(self.child.try_wait()?.is_some())
    }

    fn terminate(&mut self) -> io::Result<()> {
        kill(Pid::from_raw(self.child.id() as i32), Signal::SIGTERM)?;
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()?;
        self.child.wait()?;
        Ok(())
    }

    fn diagnostics(&mut self) -> String {
        // Let the reader pick up what the child wrote just before exiting
        if let Some(reader) = self.reader.take() {
            let deadline = Instant::now() + DRAIN_WAIT;
            while !reader.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            if reader.is_finished() {
                let _ = reader.join();
            } else {
                self.reader = Some(reader);
            }
        }

        let tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes: Vec<u8> = tail.iter().copied().collect();
        String::from_utf8_lossy(&bytes).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> EncoderCommand {
        EncoderCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    fn wait_for_exit(process: &mut Box<dyn EncoderProcess>, within: Duration) -> bool {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            if process.has_exited().unwrap() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_missing_program_fails_to_launch() {
        let command = EncoderCommand {
            program: "ffmpeg-encoder-test-no-such-binary".to_string(),
            args: vec!["-version".to_string()],
        };
        let err = SystemLauncher.launch(&command).err().expect("launch should fail");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_stops_real_process() {
        let command = EncoderCommand {
            program: "sleep".to_string(),
            args: vec!["30".to_string()],
        };
        let mut process = SystemLauncher.launch(&command).unwrap();
        assert!(!process.has_exited().unwrap());

        process.terminate().unwrap();
        assert!(
            wait_for_exit(&mut process, Duration::from_secs(5)),
            "sleep ignored SIGTERM"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_diagnostics_capture_stderr_of_exited_process() {
        let mut process = SystemLauncher.launch(&shell("echo boom >&2; exit 1")).unwrap();
        assert!(wait_for_exit(&mut process, Duration::from_secs(5)));

        assert!(process.diagnostics().contains("boom"));
    }

    #[cfg(unix)]
    #[test]
    fn test_diagnostics_keep_only_the_tail() {
        let script = "head -c 10000 /dev/zero | tr '\\0' 'x' >&2; echo END >&2; exit 1";
        let mut process = SystemLauncher.launch(&shell(script)).unwrap();
        assert!(wait_for_exit(&mut process, Duration::from_secs(5)));

        let diagnostics = process.diagnostics();
        assert!(diagnostics.len() <= MAX_DIAGNOSTIC_BYTES);
        assert!(diagnostics.ends_with("END"));
        assert!(diagnostics.starts_with('x'));
    }

    #[cfg(unix)]
    #[test]
    fn test_chatty_stderr_does_not_block_the_child() {
        // Well past the pipe buffer; the child only exits if stderr is drained
        let script = "yes 'frame dropped' | head -c 262144 >&2; exit 0";
        let mut process = SystemLauncher.launch(&shell(script)).unwrap();

        assert!(
            wait_for_exit(&mut process, Duration::from_secs(10)),
            "child blocked writing to stderr"
        );
    }
}
