//! Connect screen shown while no wallet is connected.

use crate::{
    app::App,
    screens::{frame_layout, render_footer, render_header, render_status, Screen},
    view_model::Pending,
};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};

pub struct DisconnectedScreen;

impl DisconnectedScreen {
    pub fn new() -> Self {
        Self
    }
}

impl Screen for DisconnectedScreen {
    fn render(&self, frame: &mut Frame, area: Rect, app: &App) {
        let chunks = frame_layout(area);
        render_header(frame, chunks[0], app);

        let connecting = app.view.pending() == Some(&Pending::Connecting);
        let button = if connecting {
            Line::from(Span::styled("Connecting...", Style::default().fg(Color::Yellow)))
        } else {
            Line::from(vec![
                Span::styled(
                    " [C] ",
                    Style::default()
                        .fg(Color::LightMagenta)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled("Connect to Wallet", Style::default().fg(Color::White)),
            ])
        };

        let wallet_hint = match app.wallet.provider() {
            Ok(provider) => format!("Signs with the {}", provider.name()),
            Err(_) => "No wallet found. Create one with `solana-keygen new`, or pass --wallet".to_string(),
        };

        let body = Paragraph::new(vec![
            Line::from(""),
            button,
            Line::from(""),
            Line::from(Span::styled(wallet_hint, Style::default().fg(Color::DarkGray))),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .padding(Padding::horizontal(1)),
        );
        frame.render_widget(body, chunks[1]);

        render_status(frame, chunks[2], app, &[("[C]", "Connect"), ("[Q]", "Quit")]);
        render_footer(frame, chunks[3]);
    }
}
