use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::App;

use super::popup::centered_rect;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let username = app.current_username().unwrap_or_default();
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Signed in as {}", username),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if let Some(kind) = app.biometrics_label() {
        lines.push(Line::from(Span::styled(
            format!("{} available", kind),
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(vec![
        Span::styled("[l]", Style::default().fg(Color::Yellow)),
        Span::raw("ogout  "),
        Span::styled("[f]", Style::default().fg(Color::Red)),
        Span::raw("orget credentials"),
    ]));

    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Profile "))
        .alignment(ratatui::layout::Alignment::Center);
    frame.render_widget(body, centered_rect(50, 10, area));
}
