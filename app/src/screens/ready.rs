//! Submission form, item list and preview of the selected item.

use crate::{
    app::{App, Preview},
    screens::{frame_layout, render_footer, render_header, render_status, Screen},
    view_model::Pending,
    wallet::short_address,
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use ratatui_image::StatefulImage;

const PLACEHOLDER: &str = "Enter gif link!";

pub struct ReadyScreen;

impl ReadyScreen {
    pub fn new() -> Self {
        Self
    }
}

/// Form column on the left, preview pane on the right.
fn body_layout(area: Rect) -> (Rect, Rect, Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3), // Input
            Constraint::Min(3),    // List
        ])
        .split(columns[0]);
    (left[0], left[1], columns[1])
}

fn preview_block(app: &App) -> Block<'static> {
    let title = match app.view.selected_item() {
        Some(_) => " Preview ",
        None => " Preview (empty) ",
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ))
}

impl Screen for ReadyScreen {
    /// Everything except the preview image itself, which needs mutable state.
    fn render(&self, frame: &mut Frame, area: Rect, app: &App) {
        let chunks = frame_layout(area);
        render_header(frame, chunks[0], app);

        let (input_area, list_area, preview_area) = body_layout(chunks[1]);

        // Input
        let submitting = matches!(app.view.pending(), Some(Pending::Submitting(_)));
        let draft = app.view.draft();
        let input_line = if draft.is_empty() {
            Line::from(vec![
                Span::styled("▏", Style::default().fg(Color::White)),
                Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)),
            ])
        } else {
            Line::from(vec![
                Span::styled(draft, Style::default().fg(Color::White)),
                Span::styled("▏", Style::default().fg(Color::White)),
            ])
        };
        let border_color = if submitting { Color::Yellow } else { Color::LightMagenta };
        let input = Paragraph::new(input_line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(Span::styled(" Submit [Enter] ", Style::default().fg(Color::White))),
        );
        frame.render_widget(input, input_area);

        // Item list
        let items = app.view.items().items();
        let list_block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" GIFs ({}) ", items.len()),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ));

        if items.is_empty() {
            let empty = Paragraph::new("No GIFs yet. Paste a link above to add the first one.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(list_block);
            frame.render_widget(empty, list_area);
        } else {
            let rows: Vec<ListItem> = items
                .iter()
                .map(|item| {
                    ListItem::new(vec![
                        Line::from(Span::styled(item.link.as_str(), Style::default().fg(Color::White))),
                        Line::from(Span::styled(
                            format!("  by {}", short_address(&item.user_address)),
                            Style::default().fg(Color::DarkGray),
                        )),
                    ])
                })
                .collect();
            let list = List::new(rows)
                .block(list_block)
                .highlight_style(Style::default().bg(Color::DarkGray))
                .highlight_symbol("▶ ");
            let mut state = ListState::default().with_selected(Some(app.view.selected_index()));
            frame.render_stateful_widget(list, list_area, &mut state);
        }

        // Preview pane
        let message = if app.picker.is_none() {
            Some(("Previews are not supported here".to_string(), Color::DarkGray))
        } else {
            match &app.preview {
                Preview::Empty => None,
                Preview::Loading(_) => Some(("Loading preview...".to_string(), Color::Yellow)),
                Preview::Ready { .. } => None,
                Preview::Failed { reason, .. } => Some((format!("No preview: {}", reason), Color::Red)),
            }
        };
        let mut lines = Vec::new();
        if let Some((text, color)) = message {
            lines.push(Line::from(Span::styled(text, Style::default().fg(color))));
        }
        if let Some(item) = app.view.selected_item() {
            lines.push(Line::from(Span::styled(
                "[Ctrl-O] open in browser",
                Style::default().fg(Color::DarkGray),
            )));
            if app.picker.is_none() {
                lines.push(Line::from(Span::styled(item.link.as_str(), Style::default().fg(Color::Gray))));
            }
        }
        let preview = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(preview_block(app));
        frame.render_widget(preview, preview_area);

        render_status(
            frame,
            chunks[2],
            app,
            &[("[↑/↓]", "Select"), ("[Ctrl-R]", "Refresh"), ("[Ctrl-D]", "Disconnect"), ("[Ctrl-C]", "Quit")],
        );
        render_footer(frame, chunks[3]);
    }
}

/// Render the ready screen with mutable access to app (for image state).
pub fn render_ready_with_preview(frame: &mut Frame, area: Rect, app: &mut App) {
    app.ready.render(frame, area, app);

    if let Preview::Ready { image, .. } = &mut app.preview {
        let (_, _, preview_area) = body_layout(frame_layout(area)[1]);
        // Leave the border and the hint line below the image
        let image_area = Rect::new(
            preview_area.x + 1,
            preview_area.y + 2,
            preview_area.width.saturating_sub(2),
            preview_area.height.saturating_sub(3),
        );
        frame.render_stateful_widget(StatefulImage::default(), image_area, image);
    }
}
