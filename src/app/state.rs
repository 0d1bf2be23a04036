use crate::config::AppConfig;
use crate::pdf::PdfDocument;
use crate::session::{PlaybackController, SessionEvent};
use crate::speech::SpeechEngine;
use iced::{Color, Task};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use super::messages::Message;

/// Severity of the status line, mapped to a text color in the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub(super) fn color(self) -> Option<Color> {
        match self {
            Severity::Info => None,
            Severity::Success => Some(Color::from_rgb(0.0, 0.6, 0.2)),
            Severity::Warning => Some(Color::from_rgb(0.85, 0.55, 0.0)),
            Severity::Error => Some(Color::from_rgb(0.8, 0.1, 0.1)),
        }
    }
}

/// Core application state.
pub struct App {
    pub(super) config: AppConfig,
    pub(super) pdf_name: String,
    pub(super) total_pages: usize,
    pub(super) start_input: String,
    pub(super) end_input: String,
    pub(super) voice: String,
    pub(super) engine: SpeechEngine,
    pub(super) controller: PlaybackController,
    pub(super) events: Option<Receiver<SessionEvent>>,
    pub(super) reading: bool,
    pub(super) status: String,
    pub(super) severity: Severity,
    pub(super) current_page: Option<u32>,
}

impl App {
    pub fn bootstrap(
        doc: PdfDocument,
        config: AppConfig,
        pdf_path: PathBuf,
    ) -> (App, Task<Message>) {
        let total_pages = doc.page_count();
        let pdf_name = pdf_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| pdf_path.display().to_string());
        let engine = SpeechEngine::new(config.speech_command.clone());
        let controller =
            PlaybackController::new(Arc::new(doc), engine.clone(), config.chunk_chars);
        let voice = config.voice.clone();

        let app = App {
            config,
            pdf_name,
            total_pages,
            start_input: "1".to_string(),
            end_input: total_pages.max(1).to_string(),
            voice,
            engine,
            controller,
            events: None,
            reading: false,
            status: "Ready to read PDFs".to_string(),
            severity: Severity::Info,
            current_page: None,
        };
        // Mirror startup behavior: check the speech engine right away.
        let task = app.voice_test_task();
        (app, task)
    }

    pub(super) fn voice_test_task(&self) -> Task<Message> {
        let engine = self.engine.clone();
        let voice = self.voice.clone();
        let timeout = Duration::from_secs(self.config.voice_test_timeout_secs);
        Task::perform(
            async move { engine.voice_test(&voice, timeout).map_err(|err| format!("{err:#}")) },
            Message::VoiceTested,
        )
    }

    pub(super) fn set_status(&mut self, status: impl Into<String>, severity: Severity) {
        self.status = status.into();
        self.severity = severity;
    }
}
