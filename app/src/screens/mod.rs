//! Screen modules for the TUI.

pub mod disconnected;
pub mod ready;
pub mod uninitialized;

use crate::{
    app::App,
    view_model::{NoticeLevel, Pending},
    wallet::short_address,
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub const TITLE: &str = "🖼 GIF Portal";
pub const SUBTITLE: &str = "View your GIF collection in the metaverse ✨";
pub const FOOTER_HANDLE: &str = "@_buildspace";
pub const FOOTER_LINK: &str = "https://twitter.com/_buildspace";

/// Trait for TUI screens.
pub trait Screen {
    fn render(&self, frame: &mut Frame, area: Rect, app: &App);
}

/// Split a screen into header, body, status line and footer.
pub fn frame_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(vec![
            Constraint::Length(4), // Header
            Constraint::Min(6),    // Body
            Constraint::Length(1), // Status
            Constraint::Length(2), // Footer
        ])
        .split(area)
        .to_vec()
}

/// Title, subtitle, wallet and cluster.
pub fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let wallet = match app.view.wallet_address() {
        Some(address) => Span::styled(
            format!("◈ {}", short_address(&address)),
            Style::default().fg(Color::Cyan),
        ),
        None => Span::styled("○ No wallet", Style::default().fg(Color::DarkGray)),
    };

    let lines = vec![
        Line::from(Span::styled(
            TITLE,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(SUBTITLE, Style::default().fg(Color::Gray))),
        Line::from(vec![
            wallet,
            Span::styled("  •  ", Style::default().fg(Color::DarkGray)),
            Span::styled(app.config.cluster.name(), Style::default().fg(Color::Yellow)),
        ]),
    ];

    let header = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(header, area);
}

/// Notice if there is one, otherwise what is in flight, otherwise the key hints.
pub fn render_status(frame: &mut Frame, area: Rect, app: &App, hints: &[(&str, &str)]) {
    let line = if let Some(notice) = app.view.notice() {
        let (icon, color) = match notice.level {
            NoticeLevel::Info => (" ✓ ", Color::Green),
            NoticeLevel::Warning => (" ! ", Color::Yellow),
            NoticeLevel::Error => (" ✗ ", Color::Red),
        };
        Line::from(vec![
            Span::styled(icon, Style::default().fg(color)),
            Span::styled(notice.message.as_str(), Style::default().fg(color)),
            Span::styled("  [Esc] dismiss", Style::default().fg(Color::DarkGray)),
        ])
    } else if let Some(pending) = app.view.pending() {
        let text = match pending {
            Pending::Connecting => "Waiting for the wallet...".to_string(),
            Pending::Initializing => "Creating the program account...".to_string(),
            Pending::Submitting(link) => format!("Submitting {}...", link),
        };
        Line::from(Span::styled(text, Style::default().fg(Color::Yellow)))
    } else {
        let mut spans = Vec::new();
        for (i, (key, label)) in hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  •  ", Style::default().fg(Color::DarkGray)));
            }
            spans.push(Span::styled(format!("{} ", key), Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(*label, Style::default().fg(Color::DarkGray)));
        }
        Line::from(spans)
    };

    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

/// The outbound link shown on every screen.
pub fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Line::from(vec![
        Span::styled("built on ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            FOOTER_HANDLE,
            Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::UNDERLINED),
        ),
        Span::styled("  [Ctrl-T]", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(footer).alignment(Alignment::Center), area);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        testing::{program_client, FakeChain},
        view_model::Notice,
        wallet::WalletConnector,
    };
    use ratatui::{backend::TestBackend, Terminal};
    use solana_sdk::pubkey::Pubkey;
    use std::{sync::Arc, time::Duration};

    pub fn test_app() -> App {
        let timeout = Duration::from_secs(1);
        App::new(
            AppConfig::default(),
            WalletConnector::new(None, timeout),
            Arc::new(program_client(Arc::new(FakeChain::default()), timeout)),
            None,
        )
    }

    /// Draw the app and flatten the buffer into one string.
    pub fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_header_and_footer_on_every_screen() {
        let mut app = test_app();
        let text = draw(&mut app);
        assert!(text.contains("GIF Portal"));
        assert!(text.contains("No wallet"));
        assert!(text.contains("Devnet"));
        assert!(text.contains("built on @_buildspace"));

        let address = Pubkey::new_unique();
        app.view.wallet_connected(address);
        let text = draw(&mut app);
        assert!(text.contains(&short_address(&address)));
        assert!(text.contains("built on @_buildspace"));
    }

    #[test]
    fn test_notice_replaces_hints() {
        let mut app = test_app();
        assert!(draw(&mut app).contains("[Q] Quit"));

        app.view.set_notice(Notice::error("Could not load items: timed out"));
        let text = draw(&mut app);
        assert!(text.contains("Could not load items: timed out"));
        assert!(!text.contains("[Q] Quit"));
    }
}
