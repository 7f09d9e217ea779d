use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::app::{App, FormField};

use super::popup::centered_rect;

/// Login and register share one form; register adds the confirm field.
pub fn render(frame: &mut Frame, app: &App, area: Rect, register: bool) {
    let form = &app.form;
    let height = if register { 12 } else { 10 };
    let popup = centered_rect(50, height, area);
    frame.render_widget(Clear, popup);

    let mut lines = vec![
        Line::from(""),
        field_line("Username", &form.username, false, form.field == FormField::Username),
        field_line("Password", &form.password, true, form.field == FormField::Password),
    ];
    if register {
        lines.push(field_line(
            "Confirm ",
            &form.confirm,
            true,
            form.field == FormField::Confirm,
        ));
    }
    lines.push(Line::from(""));
    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(""));
    }

    let mut hint = vec![Span::styled(
        "Enter: submit  Tab: next field",
        Style::default().fg(Color::Gray),
    )];
    if !register {
        hint.push(Span::styled(
            "  Ctrl+R: register",
            Style::default().fg(Color::Gray),
        ));
        if let Some(kind) = app.biometrics_label() {
            hint.push(Span::styled(
                format!("  Ctrl+B: {}", kind),
                Style::default().fg(Color::Gray),
            ));
        }
    }
    lines.push(Line::from(hint));

    let title = if register { " Register " } else { " Log in " };
    let body = Paragraph::new(lines).block(
        Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
    );
    frame.render_widget(body, popup);
}

fn field_line(label: &str, value: &str, masked: bool, active: bool) -> Line<'static> {
    let shown = if masked {
        "•".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let style = if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let cursor = if active { "▏" } else { "" };
    Line::from(vec![
        Span::styled(format!(" {}: ", label), Style::default().fg(Color::Gray)),
        Span::styled(shown, style),
        Span::styled(cursor, style),
    ])
}
