mod messages;
mod state;
mod update;
mod view;

pub use state::App;

use crate::config::AppConfig;
use crate::pdf::PdfDocument;
use iced::{Size, window};
use std::path::PathBuf;

/// Helper to launch the app with the loaded document.
pub fn run_app(doc: PdfDocument, config: AppConfig, pdf_path: PathBuf) -> iced::Result {
    let window_settings = window::Settings {
        size: Size::new(config.window_width, config.window_height),
        ..window::Settings::default()
    };

    iced::application("PDF Voice Reader", App::update, App::view)
        .window(window_settings)
        .subscription(App::subscription)
        .run_with(move || App::bootstrap(doc, config, pdf_path))
}
