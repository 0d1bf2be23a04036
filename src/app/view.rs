use super::messages::Message;
use super::state::App;
use iced::alignment::Vertical;
use iced::widget::{button, column, container, pick_list, row, text, text_input};
use iced::{Element, Length};

impl App {
    pub fn view(&self) -> Element<'_, Message> {
        let title = text("PDF Voice Reader").size(24);
        let doc_info = text(format!("{} — {} pages", self.pdf_name, self.total_pages));

        let range_controls = row![
            text("From page:"),
            text_input("1", &self.start_input)
                .on_input(Message::StartPageChanged)
                .width(Length::Fixed(80.0)),
            text("To page:"),
            text_input("", &self.end_input)
                .on_input(Message::EndPageChanged)
                .width(Length::Fixed(80.0)),
        ]
        .spacing(10)
        .align_y(Vertical::Center);

        let voice_controls = row![
            text("Voice:"),
            pick_list(
                self.config.voices.clone(),
                Some(self.voice.clone()),
                Message::VoiceSelected
            ),
        ]
        .spacing(10)
        .align_y(Vertical::Center);

        let start_button = if self.reading {
            button("Start Reading")
        } else {
            button("Start Reading").on_press(Message::StartReading)
        };
        let stop_button = if self.reading {
            button("Stop").on_press(Message::StopReading)
        } else {
            button("Stop")
        };
        let test_button = button("Test Voice").on_press(Message::TestVoice);

        let buttons = row![start_button, stop_button, test_button]
            .spacing(10)
            .align_y(Vertical::Center);

        let status = text(&self.status).color_maybe(self.severity.color());
        let current_page = text(
            self.current_page
                .map(|page| format!("Reading Page {page}"))
                .unwrap_or_default(),
        );

        let content = column![
            title,
            doc_info,
            range_controls,
            voice_controls,
            buttons,
            status,
            current_page
        ]
        .padding(20)
        .spacing(12);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}
