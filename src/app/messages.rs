use std::time::Instant;

/// Messages emitted by the UI.
#[derive(Debug, Clone)]
pub enum Message {
    StartPageChanged(String),
    EndPageChanged(String),
    VoiceSelected(String),
    StartReading,
    StopReading,
    TestVoice,
    VoiceTested(Result<(), String>),
    Tick(Instant),
}
