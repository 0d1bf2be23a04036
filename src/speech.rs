//! Spawning of the external speech-synthesis command.
//!
//! Each chunk of text is handed to the OS speech command as a single
//! argument (`say -v <voice> <text>` on macOS); the process exits once the
//! audio has finished playing.

use anyhow::{Context, Result, bail};
use std::io;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const VOICE_TEST_PHRASE: &str = "Test voice is working";
const VOICE_TEST_POLL: Duration = Duration::from_millis(100);

/// Thin wrapper around the configured speech command.
#[derive(Debug, Clone)]
pub struct SpeechEngine {
    command: String,
}

impl SpeechEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Spawn the speech process for one chunk. The caller owns the returned
    /// handle and is responsible for waiting on or terminating it.
    pub fn spawn(&self, voice: &str, text: &str) -> io::Result<Child> {
        debug!(voice, chars = text.len(), "Spawning speech process");
        Command::new(&self.command)
            .arg("-v")
            .arg(voice)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
    }

    /// Speak a short test phrase and wait for the process to exit, bounded by
    /// `timeout`. A hung engine is killed and reported as a timeout.
    pub fn voice_test(&self, voice: &str, timeout: Duration) -> Result<()> {
        info!(command = %self.command, voice, "Running voice self-test");
        let mut child = self
            .spawn(voice, VOICE_TEST_PHRASE)
            .with_context(|| format!("Failed to run speech command {:?}", self.command))?;

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait().context("Waiting for voice test")? {
                Some(status) if status.success() => {
                    info!(voice, "Voice test successful");
                    return Ok(());
                }
                Some(status) => bail!("Voice test exited with {status}"),
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    bail!("Voice test timed out after {}s", timeout.as_secs());
                }
                None => thread::sleep(VOICE_TEST_POLL),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_test_passes_with_harmless_command() {
        // `true` ignores its arguments and exits 0 immediately.
        let engine = SpeechEngine::new("true");
        engine
            .voice_test("Alex", Duration::from_secs(5))
            .expect("self-test should pass");
    }

    #[test]
    fn voice_test_reports_missing_command() {
        let engine = SpeechEngine::new("/definitely/not/a/speech-command");
        let err = engine
            .voice_test("Alex", Duration::from_secs(1))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to run"), "got: {err:#}");
    }

    #[test]
    fn voice_test_reports_failing_command() {
        let engine = SpeechEngine::new("false");
        assert!(engine.voice_test("Alex", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn spawn_failure_surfaces_as_io_error() {
        let engine = SpeechEngine::new("/definitely/not/a/speech-command");
        assert!(engine.spawn("Alex", "hello").is_err());
    }
}
