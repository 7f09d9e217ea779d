use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::app::{App, SearchResults};

use super::feed_list::{self, selected_style};
use super::home::repo_row;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    render_input(frame, app, chunks[0]);

    let width = chunks[1].width.saturating_sub(2) as usize;
    match &app.search.results {
        Some(SearchResults::Users(feed)) => feed_list::render(
            frame,
            chunks[1],
            "Users",
            feed,
            app.search.index,
            |user, selected| {
                Line::from(vec![
                    Span::styled(format!("@{:<30}", user.login), selected_style(selected)),
                    Span::styled(user.html_url.clone(), Style::default().fg(Color::DarkGray)),
                ])
            },
        ),
        Some(SearchResults::Repositories(feed)) => feed_list::render(
            frame,
            chunks[1],
            "Repositories",
            feed,
            app.search.index,
            |repo, selected| repo_row(repo, selected, width),
        ),
        None => render_recent(frame, app, chunks[1]),
    }
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let border = if app.search.editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let cursor = if app.search.editing { "▏" } else { "" };

    let input = Paragraph::new(Line::from(vec![
        Span::raw(app.search.input.clone()),
        Span::styled(cursor, Style::default().fg(Color::Yellow)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(format!(" Search {} [Tab] ", app.search.kind)),
    );
    frame.render_widget(input, area);
}

fn render_recent(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recent Searches ");

    if app.search.recent.is_empty() {
        let empty = Paragraph::new("No recent searches")
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .search
        .recent
        .iter()
        .enumerate()
        .map(|(i, query)| {
            let selected = !app.search.editing && i == app.search.recent_index;
            ListItem::new(Span::styled(query.to_string(), selected_style(selected)))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    if !app.search.editing {
        state.select(Some(app.search.recent_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
