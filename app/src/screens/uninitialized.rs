//! Shown when the program account has not been created yet.

use crate::{
    app::App,
    screens::{frame_layout, render_footer, render_header, render_status, Screen},
    view_model::Pending,
};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub struct UninitializedScreen;

impl UninitializedScreen {
    pub fn new() -> Self {
        Self
    }
}

impl Screen for UninitializedScreen {
    fn render(&self, frame: &mut Frame, area: Rect, app: &App) {
        let chunks = frame_layout(area);
        render_header(frame, chunks[0], app);

        let action = if app.view.pending() == Some(&Pending::Initializing) {
            Line::from(Span::styled("Initializing...", Style::default().fg(Color::Yellow)))
        } else {
            Line::from(vec![
                Span::styled(
                    " [I] ",
                    Style::default()
                        .fg(Color::LightMagenta)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    "Do One-Time Initialization For GIF Program Account",
                    Style::default().fg(Color::White),
                ),
            ])
        };

        let program = app.program.program_id().to_string();
        let account = app.program.base_account().to_string();
        let body = Paragraph::new(vec![
            Line::from(""),
            action,
            Line::from(""),
            Line::from(Span::styled(
                format!("Program {}", program),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                format!("Account {}", account),
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        frame.render_widget(body, chunks[1]);

        render_status(
            frame,
            chunks[2],
            app,
            &[("[I]", "Initialize"), ("[Ctrl-R]", "Refresh"), ("[Ctrl-D]", "Disconnect"), ("[Q]", "Quit")],
        );
        render_footer(frame, chunks[3]);
    }
}
