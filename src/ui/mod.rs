mod feed_list;
mod home;
mod login;
mod popup;
mod profile;
mod search;
mod user_repos;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{App, Screen};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    match app.screen() {
        Screen::Home => home::render(frame, app, chunks[1]),
        Screen::Search => search::render(frame, app, chunks[1]),
        Screen::UserRepos => user_repos::render(frame, app, chunks[1]),
        Screen::Profile => profile::render(frame, app, chunks[1]),
        Screen::Login => login::render(frame, app, chunks[1], false),
        Screen::Register => login::render(frame, app, chunks[1], true),
    }

    render_status_bar(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.screen() {
        Screen::Home => "hubfeed - Popular".to_string(),
        Screen::Search => format!("hubfeed - Search {}", app.search.kind),
        Screen::UserRepos => match &app.user_repos {
            Some(view) => format!("hubfeed - @{}", view.login),
            None => "hubfeed - Repositories".to_string(),
        },
        Screen::Profile => "hubfeed - Profile".to_string(),
        Screen::Login => "hubfeed - Log in".to_string(),
        Screen::Register => "hubfeed - Register".to_string(),
    };

    let mut spans = vec![Span::styled(
        title,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(user) = app.current_username() {
        spans.push(Span::styled(
            format!("  [{}]", user),
            Style::default().fg(Color::Gray),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(error) = &app.error {
        Line::from(vec![Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )])
    } else if let Some(flash) = app.flash_text() {
        Line::from(vec![Span::styled(
            flash.to_string(),
            Style::default().fg(Color::Green),
        )])
    } else if app.is_loading() {
        Line::from(vec![Span::styled(
            "Loading... (Esc: cancel)",
            Style::default().fg(Color::Yellow),
        )])
    } else {
        let help = match app.screen() {
            Screen::Home => {
                "j/k/g/G: nav | Enter/o: open | y: yank | r: reload | /: search | p: profile | q: quit"
            }
            Screen::Search if app.search.editing => "Enter: search | Tab: users/repos | Esc: done",
            Screen::Search => {
                "j/k: nav | Enter: open | i: edit | Tab: users/repos | x: clear recent | q: back"
            }
            Screen::UserRepos => "j/k/g/G: nav | Enter/o: open | y: yank | r: reload | q: back",
            Screen::Profile => "l: logout | f: forget credentials | q: back",
            Screen::Login | Screen::Register => "Esc: back",
        };
        let help = if app.can_retry() {
            format!("t: retry | {}", help)
        } else {
            help.to_string()
        };
        Line::from(vec![Span::styled(help, Style::default().fg(Color::Gray))])
    };

    let status_bar = Paragraph::new(status).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status_bar, area);
}
