use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::feed::{LoadingIndicator, PaginatedFeedController, ViewPhase};

use super::popup;

pub fn selected_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

/// Render any feed as a bordered list. The error panel, empty text, blocking
/// overlay and the "loading more" footer all come from the feed's snapshot.
pub fn render<T, F>(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    feed: &PaginatedFeedController<T>,
    selected: usize,
    row: F,
) where
    T: Send + 'static,
    F: Fn(&T, bool) -> Line<'static>,
{
    let snapshot = feed.snapshot();
    let mut block_title = format!(" {} ({}) ", title, snapshot.items.len());
    if snapshot.indicator == LoadingIndicator::Refresh {
        block_title.push_str("⟳ ");
    }
    let block = Block::default().borders(Borders::ALL).title(block_title);

    match snapshot.phase {
        ViewPhase::Error => {
            let message = snapshot
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Request failed".to_string());
            let body = Paragraph::new(vec![
                Line::from(Span::styled(message, Style::default().fg(Color::Red))),
                Line::from(""),
                Line::from(Span::styled(
                    "[t] retry  [r] reload",
                    Style::default().fg(Color::Gray),
                )),
            ])
            .block(block)
            .wrap(Wrap { trim: true });
            frame.render_widget(body, area);
            return;
        }
        ViewPhase::Empty => {
            let body = Paragraph::new("Nothing here")
                .block(block)
                .style(Style::default().fg(Color::Gray));
            frame.render_widget(body, area);
            return;
        }
        _ => {}
    }

    let mut items: Vec<ListItem> = snapshot
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| ListItem::new(row(item, i == selected)))
        .collect();

    if snapshot.indicator == LoadingIndicator::Footer {
        items.push(ListItem::new(Span::styled(
            "Loading more…",
            Style::default().fg(Color::Yellow),
        )));
    } else if snapshot.phase == ViewPhase::Ready && feed.can_retry() {
        items.push(ListItem::new(Span::styled(
            "Could not load more  [t] retry",
            Style::default().fg(Color::Red),
        )));
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    if !snapshot.items.is_empty() {
        state.select(Some(selected));
    }
    frame.render_stateful_widget(list, area, &mut state);

    if snapshot.indicator == LoadingIndicator::Blocking {
        popup::render_loading(frame, area, "Loading…");
    }
    if let Some(notice) = snapshot.notice {
        popup::render_toast(frame, area, &notice.message);
    }
}

/// Cut `text` to `width` characters, ending with "..." when shortened
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let keep: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", keep)
    } else {
        text.to_string()
    }
}
