//! The playback controller: reads a page range aloud on a background worker.
//!
//! One session may be active at a time. The worker walks pages in ascending
//! order, extracts and normalizes each page's text, and speaks it chunk by
//! chunk through the external speech command, waiting for each chunk's
//! process to exit before starting the next. Cancellation is cooperative:
//! `stop()` clears the active flag (polled at page and chunk boundaries) and
//! terminates whatever speech process is currently running, so latency is
//! bounded by the remainder of the current chunk.

use crate::chunk::{normalize_whitespace, split_chunks};
use crate::pdf::TextSource;
use crate::speech::SpeechEngine;
use std::io;
use std::process::{Child, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const PROCESS_POLL: Duration = Duration::from_millis(50);

/// Errors that terminate a session. None are retried; every one of them runs
/// the teardown path before being reported.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid page range {start}-{end} (document has {total} pages)")]
    InvalidRange { start: u32, end: u32, total: usize },
    #[error("document has no pages")]
    EmptyDocument,
    #[error("a reading session is already active")]
    AlreadyActive,
    #[error("failed to read page {page}: {source}")]
    Extraction {
        page: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("speech command {command:?} failed: {source}")]
    SpeechProcess {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Progress notifications delivered to the UI layer, which drains them on its
/// own schedule and owns all presentation.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PageStarted { page: u32, end_page: u32 },
    Finished { start_page: u32, end_page: u32 },
    Failed(String),
}

/// Shared cancellation state for one session: the active flag plus the slot
/// holding the at-most-one live speech process.
#[derive(Clone)]
pub struct SessionControl {
    inner: Arc<ControlInner>,
}

struct ControlInner {
    active: AtomicBool,
    process: Mutex<Option<Child>>,
}

impl SessionControl {
    fn new_active() -> Self {
        Self {
            inner: Arc::new(ControlInner {
                active: AtomicBool::new(true),
                process: Mutex::new(None),
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Clear the active flag and terminate any running speech process.
    /// Idempotent; callable from any thread.
    pub fn stop(&self) {
        self.inner.active.store(false, Ordering::Release);
        let mut slot = self.lock_slot();
        if let Some(mut child) = slot.take() {
            debug!("Terminating speech process");
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<Child>> {
        self.inner
            .process
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn has_process(&self) -> bool {
        self.lock_slot().is_some()
    }

    /// Spawn the speech process for `chunk` and install it in the slot.
    /// Spawning happens under the slot lock with the active flag re-checked,
    /// so a concurrent `stop()` can never miss a just-spawned process.
    /// Returns `false` when the session was cancelled instead.
    fn begin_chunk(
        &self,
        engine: &SpeechEngine,
        voice: &str,
        chunk: &str,
    ) -> Result<bool, SessionError> {
        let mut slot = self.lock_slot();
        if !self.is_active() {
            return Ok(false);
        }
        let child = engine
            .spawn(voice, chunk)
            .map_err(|source| SessionError::SpeechProcess {
                command: engine.command().to_string(),
                source,
            })?;
        *slot = Some(child);
        Ok(true)
    }

    /// Block until the current speech process exits. Returns `None` when the
    /// slot was emptied by `stop()` while waiting.
    fn wait_chunk(&self) -> io::Result<Option<ExitStatus>> {
        loop {
            {
                let mut slot = self.lock_slot();
                match slot.as_mut() {
                    None => return Ok(None),
                    Some(child) => {
                        if let Some(status) = child.try_wait()? {
                            *slot = None;
                            return Ok(Some(status));
                        }
                    }
                }
            }
            thread::sleep(PROCESS_POLL);
        }
    }
}

/// Owns the document source and speech engine and hands out one worker-backed
/// session at a time.
pub struct PlaybackController {
    source: Arc<dyn TextSource>,
    engine: SpeechEngine,
    chunk_chars: usize,
    current: Mutex<Option<SessionControl>>,
}

enum Outcome {
    Finished,
    Cancelled,
}

impl PlaybackController {
    pub fn new(source: Arc<dyn TextSource>, engine: SpeechEngine, chunk_chars: usize) -> Self {
        Self {
            source,
            engine,
            chunk_chars,
            current: Mutex::new(None),
        }
    }

    /// Validate the requested range and launch the page loop on a background
    /// worker. Returns the event channel the UI drains for progress.
    pub fn start(
        &self,
        start_page: u32,
        end_page: u32,
        voice: String,
    ) -> Result<Receiver<SessionEvent>, SessionError> {
        let total = self.source.page_count();
        if total == 0 {
            return Err(SessionError::EmptyDocument);
        }
        if start_page < 1 || start_page > end_page || end_page as usize > total {
            return Err(SessionError::InvalidRange {
                start: start_page,
                end: end_page,
                total,
            });
        }

        let mut current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(SessionControl::is_active) {
            return Err(SessionError::AlreadyActive);
        }

        let control = SessionControl::new_active();
        *current = Some(control.clone());
        drop(current);

        info!(start_page, end_page, %voice, "Starting read session");
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        let engine = self.engine.clone();
        let chunk_chars = self.chunk_chars;
        thread::spawn(move || {
            run_session(
                &*source, &engine, &voice, start_page, end_page, chunk_chars, &control, &tx,
            );
        });
        Ok(rx)
    }

    /// Cancel the active session, if any. Idempotent.
    pub fn stop(&self) {
        let current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(control) = current.as_ref() {
            info!("Stopping read session");
            control.stop();
        }
    }

    pub fn is_active(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(SessionControl::is_active)
    }
}

#[allow(clippy::too_many_arguments)]
fn run_session(
    source: &dyn TextSource,
    engine: &SpeechEngine,
    voice: &str,
    start_page: u32,
    end_page: u32,
    chunk_chars: usize,
    control: &SessionControl,
    tx: &Sender<SessionEvent>,
) {
    let outcome = read_pages(
        source, engine, voice, start_page, end_page, chunk_chars, control, tx,
    );
    // Teardown always runs: the flag is cleared and any process is dropped
    // no matter how the loop exited.
    control.stop();
    match outcome {
        Ok(Outcome::Finished) => {
            info!(start_page, end_page, "Finished read session");
            let _ = tx.send(SessionEvent::Finished {
                start_page,
                end_page,
            });
        }
        Ok(Outcome::Cancelled) => {
            debug!("Read session cancelled");
        }
        Err(err) => {
            warn!("Read session failed: {err}");
            let _ = tx.send(SessionEvent::Failed(err.to_string()));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn read_pages(
    source: &dyn TextSource,
    engine: &SpeechEngine,
    voice: &str,
    start_page: u32,
    end_page: u32,
    chunk_chars: usize,
    control: &SessionControl,
    tx: &Sender<SessionEvent>,
) -> Result<Outcome, SessionError> {
    for page in start_page..=end_page {
        if !control.is_active() {
            return Ok(Outcome::Cancelled);
        }
        let _ = tx.send(SessionEvent::PageStarted { page, end_page });

        let text = source
            .page_text(page)
            .map_err(|err| SessionError::Extraction {
                page,
                source: err.into(),
            })?;
        let text = normalize_whitespace(&text);
        if text.is_empty() {
            debug!(page, "Page has no speakable text, skipping");
            continue;
        }

        debug!(page, chars = text.len(), "Speaking page");
        if !speak_text(engine, voice, &text, chunk_chars, control)? {
            return Ok(Outcome::Cancelled);
        }
    }
    Ok(Outcome::Finished)
}

/// Speak `text` chunk by chunk, in order, one process at a time. Returns
/// `false` when the session was cancelled partway through.
fn speak_text(
    engine: &SpeechEngine,
    voice: &str,
    text: &str,
    chunk_chars: usize,
    control: &SessionControl,
) -> Result<bool, SessionError> {
    for chunk in split_chunks(text, chunk_chars) {
        if !control.is_active() {
            return Ok(false);
        }
        if !control.begin_chunk(engine, voice, &chunk)? {
            return Ok(false);
        }
        let status = control
            .wait_chunk()
            .map_err(|source| SessionError::SpeechProcess {
                command: engine.command().to_string(),
                source,
            })?;
        match status {
            None => return Ok(false),
            Some(status) if !status.success() => {
                // Exit status carries no contract beyond "speech is over".
                debug!(%status, "Speech process exited non-zero");
            }
            Some(_) => {}
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::time::{Duration, Instant};

    struct FakeSource {
        pages: Vec<Result<String, String>>,
        visited: Mutex<Vec<u32>>,
        delay: Duration,
    }

    impl FakeSource {
        fn new(pages: &[&str]) -> Self {
            Self {
                pages: pages.iter().map(|p| Ok(p.to_string())).collect(),
                visited: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn visited(&self) -> Vec<u32> {
            self.visited.lock().unwrap().clone()
        }
    }

    impl TextSource for FakeSource {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, page: u32) -> anyhow::Result<String> {
            self.visited.lock().unwrap().push(page);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            match &self.pages[(page - 1) as usize] {
                Ok(text) => Ok(text.clone()),
                Err(msg) => Err(anyhow!("{msg}")),
            }
        }
    }

    fn controller(source: Arc<FakeSource>, command: &str) -> PlaybackController {
        PlaybackController::new(source, SpeechEngine::new(command), 1000)
    }

    fn drain_until_terminal(rx: &Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.recv_timeout(Duration::from_secs(5)) {
            let terminal = matches!(
                event,
                SessionEvent::Finished { .. } | SessionEvent::Failed(_)
            );
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    #[test]
    fn rejects_inverted_range() {
        let source = Arc::new(FakeSource::new(&["a", "b", "c", "d", "e"]));
        let ctl = controller(Arc::clone(&source), "true");
        assert!(matches!(
            ctl.start(5, 3, "Alex".into()),
            Err(SessionError::InvalidRange { .. })
        ));
        assert!(!ctl.is_active());
        assert!(source.visited().is_empty());
    }

    #[test]
    fn rejects_zero_start_and_overlong_end() {
        let source = Arc::new(FakeSource::new(&["a", "b"]));
        let ctl = controller(source, "true");
        assert!(ctl.start(0, 1, "Alex".into()).is_err());
        assert!(ctl.start(1, 3, "Alex".into()).is_err());
    }

    #[test]
    fn rejects_empty_document() {
        let source = Arc::new(FakeSource::new(&[]));
        let ctl = controller(source, "true");
        assert!(matches!(
            ctl.start(1, 1, "Alex".into()),
            Err(SessionError::EmptyDocument)
        ));
    }

    #[test]
    fn visits_pages_in_order_and_finishes() {
        let source = Arc::new(FakeSource::new(&["one", "two", "three"]));
        let ctl = controller(Arc::clone(&source), "true");
        let rx = ctl.start(1, 3, "Alex".into()).unwrap();

        let events = drain_until_terminal(&rx);
        let pages: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::PageStarted { page, .. } => Some(*page),
                _ => None,
            })
            .collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Finished {
                start_page: 1,
                end_page: 3
            })
        ));
        assert_eq!(source.visited(), vec![1, 2, 3]);
        assert!(!ctl.is_active());
        let current = ctl.current.lock().unwrap();
        assert!(!current.as_ref().unwrap().has_process());
    }

    #[test]
    fn whitespace_pages_skip_speech_entirely() {
        // The speech command cannot be spawned; the session can only finish
        // if no spawn is ever attempted.
        let source = Arc::new(FakeSource::new(&["   ", "\n\t", ""]));
        let ctl = controller(source, "/definitely/not/a/speech-command");
        let rx = ctl.start(1, 3, "Alex".into()).unwrap();

        let events = drain_until_terminal(&rx);
        assert!(matches!(events.last(), Some(SessionEvent::Finished { .. })));
    }

    #[test]
    fn extraction_failure_reports_and_tears_down() {
        let mut source = FakeSource::new(&["fine", "fine"]);
        source.pages[1] = Err("boom".into());
        let ctl = controller(Arc::new(source), "true");
        let rx = ctl.start(1, 2, "Alex".into()).unwrap();

        let events = drain_until_terminal(&rx);
        match events.last() {
            Some(SessionEvent::Failed(msg)) => {
                assert!(msg.contains("page 2"), "got: {msg}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!ctl.is_active());
    }

    #[test]
    fn spawn_failure_reports_and_tears_down() {
        let source = Arc::new(FakeSource::new(&["some text"]));
        let ctl = controller(source, "/definitely/not/a/speech-command");
        let rx = ctl.start(1, 1, "Alex".into()).unwrap();

        let events = drain_until_terminal(&rx);
        assert!(matches!(events.last(), Some(SessionEvent::Failed(_))));
        assert!(!ctl.is_active());
    }

    #[test]
    fn second_start_is_rejected_while_active() {
        let source = Arc::new(FakeSource {
            pages: vec![Ok("slow".into())],
            visited: Mutex::new(Vec::new()),
            delay: Duration::from_millis(300),
        });
        let ctl = controller(source, "true");
        let rx = ctl.start(1, 1, "Alex".into()).unwrap();
        assert!(matches!(
            ctl.start(1, 1, "Alex".into()),
            Err(SessionError::AlreadyActive)
        ));
        drain_until_terminal(&rx);
        // Once the first session is done a new one may start.
        let rx = ctl.start(1, 1, "Alex".into()).unwrap();
        drain_until_terminal(&rx);
    }

    #[test]
    fn stop_is_idempotent_when_idle() {
        let source = Arc::new(FakeSource::new(&["a"]));
        let ctl = controller(source, "true");
        ctl.stop();
        ctl.stop();
        assert!(!ctl.is_active());
    }

    #[cfg(unix)]
    #[test]
    fn stop_kills_running_chunk_and_clears_handle() {
        use std::os::unix::fs::PermissionsExt;

        // A speech stand-in that hangs well past the test horizon.
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-tts");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let source = Arc::new(FakeSource::new(&["this chunk never finishes"]));
        let ctl = controller(source, script.to_str().unwrap());
        let rx = ctl.start(1, 1, "Alex".into()).unwrap();

        // Wait for the page to begin, then give the worker a moment to spawn.
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)),
            Ok(SessionEvent::PageStarted { page: 1, .. })
        ));
        let spawn_deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let current = ctl.current.lock().unwrap();
            if current.as_ref().is_some_and(SessionControl::has_process) {
                break;
            }
            drop(current);
            assert!(Instant::now() < spawn_deadline, "speech process never spawned");
            thread::sleep(Duration::from_millis(10));
        }

        let stopped_at = Instant::now();
        ctl.stop();

        // The worker exits without a terminal event; the channel just closes.
        match rx.recv_timeout(Duration::from_secs(5)) {
            Err(mpsc::RecvTimeoutError::Disconnected) => {}
            other => panic!("expected disconnect after stop, got {other:?}"),
        }
        assert!(
            stopped_at.elapsed() < Duration::from_secs(10),
            "stop did not interrupt the running chunk"
        );
        assert!(!ctl.is_active());
        let current = ctl.current.lock().unwrap();
        assert!(!current.as_ref().unwrap().has_process());
    }
}
