use chrono::Utc;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::Frame;

use crate::app::App;
use crate::types::Repository;

use super::feed_list::{self, selected_style, truncate};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let width = area.width.saturating_sub(2) as usize;
    feed_list::render(
        frame,
        area,
        "Popular Repositories",
        &app.home,
        app.home_index,
        |repo, selected| repo_row(repo, selected, width),
    );
}

/// One repository line: name, stars, language, age, description
pub(super) fn repo_row(repo: &Repository, selected: bool, width: usize) -> Line<'static> {
    let fixed = 60; // name(32) + stars(8) + language(12) + age(4) + spaces
    let flex = width.saturating_sub(fixed).max(10);

    let language = repo.language.clone().unwrap_or_default();
    let description = repo
        .description
        .as_deref()
        .map(|d| truncate(d, flex))
        .unwrap_or_default();

    Line::from(vec![
        Span::styled(
            format!("{:<32}", truncate(&repo.full_name, 32)),
            selected_style(selected),
        ),
        Span::styled(
            format!("★ {:>6}", repo.stargazers_count),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("{:<12}", truncate(&language, 12)),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{:>4}", format_age(repo.updated_at)),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(description, Style::default().fg(Color::Gray)),
    ])
}

fn format_age(dt: chrono::DateTime<chrono::Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(dt);

    if duration.num_days() > 0 {
        format!("{}d", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{}h", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{}m", duration.num_minutes())
    } else {
        "now".to_string()
    }
}
