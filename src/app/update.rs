use super::messages::Message;
use super::state::{App, Severity};
use crate::session::SessionEvent;
use iced::time;
use iced::{Subscription, Task};
use std::sync::mpsc::TryRecvError;
use std::time::Duration;
use tracing::{debug, info, warn};

impl App {
    pub fn subscription(app: &App) -> Subscription<Message> {
        if app.reading {
            time::every(Duration::from_millis(100)).map(Message::Tick)
        } else {
            Subscription::none()
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::StartPageChanged(value) => {
                self.start_input = value;
            }
            Message::EndPageChanged(value) => {
                self.end_input = value;
            }
            Message::VoiceSelected(voice) => {
                info!(%voice, "Voice selected");
                self.voice = voice;
            }
            Message::TestVoice => {
                self.set_status("Testing voice...", Severity::Info);
                return self.voice_test_task();
            }
            Message::VoiceTested(Ok(())) => {
                self.set_status("Voice test successful!", Severity::Success);
            }
            Message::VoiceTested(Err(err)) => {
                warn!("Voice test failed: {err}");
                self.set_status(format!("Voice test failed: {err}"), Severity::Error);
            }
            Message::StartReading => self.handle_start_reading(),
            Message::StopReading => self.handle_stop_reading(),
            Message::Tick(_) => self.drain_session_events(),
        }
        Task::none()
    }

    fn handle_start_reading(&mut self) {
        if self.controller.is_active() {
            self.set_status("Already reading", Severity::Warning);
            return;
        }
        let (Ok(start), Ok(end)) = (
            self.start_input.trim().parse::<u32>(),
            self.end_input.trim().parse::<u32>(),
        ) else {
            self.set_status("Please enter valid page numbers", Severity::Warning);
            return;
        };

        match self.controller.start(start, end, self.voice.clone()) {
            Ok(events) => {
                self.events = Some(events);
                self.reading = true;
                self.current_page = None;
                self.set_status("Starting to read...", Severity::Info);
            }
            Err(err) => {
                warn!("Rejected read request: {err}");
                self.set_status(err.to_string(), Severity::Warning);
            }
        }
    }

    fn handle_stop_reading(&mut self) {
        info!("Playback stopped by user");
        self.controller.stop();
        self.events = None;
        self.reading = false;
        self.current_page = None;
        self.set_status("Stopped", Severity::Info);
    }

    /// Drain worker events on the UI's own schedule; the worker never touches
    /// UI state directly.
    fn drain_session_events(&mut self) {
        let Some(events) = self.events.take() else {
            return;
        };
        let mut finished = false;

        loop {
            match events.try_recv() {
                Ok(SessionEvent::PageStarted { page, end_page }) => {
                    debug!(page, end_page, "Page started");
                    self.current_page = Some(page);
                    self.set_status(format!("Reading page {page} of {end_page}"), Severity::Info);
                }
                Ok(SessionEvent::Finished {
                    start_page,
                    end_page,
                }) => {
                    self.current_page = None;
                    self.set_status(
                        format!("Finished reading pages {start_page}-{end_page}"),
                        Severity::Success,
                    );
                    finished = true;
                    break;
                }
                Ok(SessionEvent::Failed(message)) => {
                    self.current_page = None;
                    self.set_status(format!("Reading failed: {message}"), Severity::Error);
                    finished = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    finished = true;
                    break;
                }
            }
        }

        if finished {
            self.reading = false;
        } else {
            self.events = Some(events);
        }
    }
}
