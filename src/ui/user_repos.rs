use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::App;

use super::feed_list;
use super::home::repo_row;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(view) = app.user_repos.as_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let header = match &view.profile {
        Some(user) => vec![
            Line::from(vec![
                Span::styled(
                    user.display_name().to_string(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  @{}", user.login),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            Line::from(Span::styled(
                format!(
                    "{} repos · {} followers · {} following",
                    user.public_repos, user.followers, user.following
                ),
                Style::default().fg(Color::DarkGray),
            )),
        ],
        None => vec![Line::from(Span::styled(
            format!("@{}", view.login),
            Style::default().fg(Color::Cyan),
        ))],
    };
    frame.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL)),
        chunks[0],
    );

    let width = chunks[1].width.saturating_sub(2) as usize;
    feed_list::render(
        frame,
        chunks[1],
        "Repositories",
        &view.feed,
        view.index,
        |repo, selected| repo_row(repo, selected, width),
    );
}
