use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::App;
use crate::models::{CommentRole, InsightComment, InsightStatus, AI_AUTHOR};
use crate::view::{self, Row, Tab};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title + latest date
            Constraint::Length(3), // Tab bar
            Constraint::Length(if app.error.is_some() { 3 } else { 0 }),
            Constraint::Min(0),    // Body
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    if let Some(error) = &app.error {
        render_error(frame, error, chunks[2]);
    }

    if app.active_tab == Tab::Management {
        render_management(frame, app, chunks[3]);
    } else {
        // Horizontal split: 1/3 list, 2/3 detail
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
            .split(chunks[3]);
        render_news_list(frame, app, body[0]);
        render_detail(frame, app, body[1]);
    }

    render_status(frame, app, chunks[4]);

    if app.comment_input_active {
        render_comment_input(frame, app);
    }

    if app.show_help {
        render_help(frame);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let latest = app.latest_date.as_deref().unwrap_or("-");
    let stats = format!(" Latest update: {latest} | {} Stories", app.news.len());

    let block = Block::default()
        .title(" IT News ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(stats)
        .block(block)
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| Line::from(format!("{} {}", i + 1, tab.label())))
        .collect();

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL))
        .select(app.active_tab.index())
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_error(frame: &mut Frame, error: &str, area: Rect) {
    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let paragraph = Paragraph::new(error)
        .block(block)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_news_list(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL);

    if app.is_loading && app.news.is_empty() {
        let paragraph = Paragraph::new("Loading news...")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }

    let groups = app.date_groups();
    let rows = view::rows(&groups, &app.windows);

    if rows.is_empty() {
        let message = match app.active_tab {
            Tab::Bookmarks => "No bookmarked news.",
            _ => "No news to show.",
        };
        let paragraph = Paragraph::new(message)
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }

    // Map the selectable index onto the flattened row list.
    let mut selected_row = None;
    let mut selectable = 0;
    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if row.is_selectable() {
                if selectable == app.selected_index {
                    selected_row = Some(i);
                }
                selectable += 1;
            }
            ListItem::new(row_line(app, row))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(selected_row);

    frame.render_stateful_widget(list, area, &mut state);
}

fn row_line<'a>(app: &App, row: &Row<'a>) -> Line<'a> {
    match row {
        Row::Date { date, count } => Line::from(vec![
            Span::styled(
                date.to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" ({count})"), Style::default().fg(Color::DarkGray)),
        ]),
        Row::News(news) => {
            let star = if app.mirrors.is_bookmarked(&news.id) {
                "★ "
            } else {
                "  "
            };
            Line::from(vec![
                Span::styled(star, Style::default().fg(Color::Yellow)),
                Span::styled(format!("[{}] ", news.source), Style::default().fg(Color::Blue)),
                Span::styled(news.title.clone(), Style::default().fg(Color::White)),
            ])
        }
        Row::LoadMore { remaining, .. } => Line::from(Span::styled(
            format!("  … {remaining} more"),
            Style::default().fg(Color::Green),
        )),
    }
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(news) = app.selected_news() else {
        let block = Block::default()
            .title(" News ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));
        let paragraph = Paragraph::new("No news selected").block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Title
            Constraint::Percentage(30), // Summary
            Constraint::Percentage(30), // Insight
            Constraint::Min(0),         // Comments
        ])
        .split(area);

    let title_block = Block::default()
        .title(format!(" {} | {} ", news.source, news.date))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    frame.render_widget(
        Paragraph::new(news.title.as_str())
            .block(title_block)
            .wrap(Wrap { trim: true }),
        chunks[0],
    );

    let mut summary = vec![Line::from(news.summary.as_str())];
    if !news.tags.is_empty() {
        summary.push(Line::from(""));
        summary.push(Line::from(Span::styled(
            news.tags.as_str(),
            Style::default().fg(Color::Blue),
        )));
    }
    frame.render_widget(
        Paragraph::new(summary)
            .block(Block::default().title(" Summary ").borders(Borders::ALL))
            .wrap(Wrap { trim: true }),
        chunks[1],
    );

    let metric = app.mirrors.metric(&news.id);
    let insight = match app.insights().status(&news.id) {
        InsightStatus::NotRequested => "Press i to generate an AI insight...".to_string(),
        InsightStatus::Loading => "Generating insight...".to_string(),
        InsightStatus::Ready => app
            .insights()
            .entry(&news.id)
            .and_then(|e| e.insight.clone())
            .unwrap_or_default(),
    };
    let insight_block = Block::default()
        .title(format!(
            " AI Insight  ▲ {}  ▼ {} ",
            metric.upvotes, metric.downvotes
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    frame.render_widget(
        Paragraph::new(insight)
            .block(insight_block)
            .wrap(Wrap { trim: true }),
        chunks[2],
    );

    let comments = app.mirrors.comments_for(&news.id);
    let mut lines: Vec<Line> = comments
        .iter()
        .map(|comment| {
            let color = match comment.role {
                CommentRole::Ai => Color::Magenta,
                CommentRole::User if comment.user_id == app.user_id() => Color::Yellow,
                CommentRole::User => Color::White,
            };
            Line::from(vec![
                Span::styled(
                    format!("{} ", comment.timestamp.format("%Y-%m-%d %H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{}: ", comment_author(comment)),
                    Style::default().fg(color),
                ),
                Span::raw(comment.text.clone()),
            ])
        })
        .collect();
    if app.insights().is_generating(&news.id) {
        lines.push(Line::from(Span::styled(
            "AI is writing a reply...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .title(format!(" Comments ({}) ", comments.len()))
                    .borders(Borders::ALL),
            )
            .wrap(Wrap { trim: true }),
        chunks[3],
    );
}

/// "AI" for replies, otherwise "User " and the first six characters of the id.
fn comment_author(comment: &InsightComment) -> String {
    match comment.role {
        CommentRole::Ai => AI_AUTHOR.to_string(),
        CommentRole::User => {
            let short: String = comment.user_id.chars().take(6).collect();
            format!("User {short}")
        }
    }
}

fn render_management(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = app
        .keywords
        .categories()
        .iter()
        .map(|c| Line::from(c.name.as_str()))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let tabs = Tabs::new(titles)
        .block(Block::default().title(" Keywords ").borders(Borders::ALL))
        .select(app.keyword_category)
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, chunks[0]);

    let items: Vec<ListItem> = app
        .keywords
        .category(app.keyword_category)
        .map(|c| c.keywords.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|keyword| {
            let check = if keyword.checked { "[x] " } else { "[ ] " };
            let mut spans = vec![
                Span::raw(check),
                Span::styled(keyword.name.as_str(), Style::default().fg(Color::White)),
                Span::styled(
                    format!(" ({})", keyword.news_count),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if keyword.recommended {
                spans.push(Span::styled(" Recommended", Style::default().fg(Color::Green)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.keyword_index));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = if app.is_loading {
        "Loading news..."
    } else if app.active_tab == Tab::Management {
        "j/k:nav  h/l:category  space:toggle  ?:help  q:quit"
    } else {
        "j/k:nav  enter:select  i:insight  b:bookmark  c:comment  ?:help  q:quit"
    };

    let paragraph = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_comment_input(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 20, frame.area());

    let block = Block::default()
        .title(" Comment on the AI insight ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(area);

    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let input_text = format!("> {}_", app.comment_input);
    let paragraph = Paragraph::new(input_text)
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, inner);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 70, frame.area());

    let help_text = vec![
        "",
        " Navigation:",
        "   j / ↓    Move down",
        "   k / ↑    Move up",
        "   1-4      Switch tab",
        "   Tab      Next tab",
        "   Enter    Load more / Generate insight",
        "",
        " News:",
        "   r        Reload news",
        "   i        Generate AI insight",
        "   + / -    Vote on insight",
        "   b        Toggle bookmark",
        "   c        Comment on insight",
        "   o        Open in browser",
        "",
        " Keywords:",
        "   h / l    Previous / next category",
        "   Space    Toggle keyword",
        "",
        " General:",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    fn comment(user_id: &str, role: CommentRole) -> InsightComment {
        InsightComment {
            id: "c1".to_string(),
            news_id: "n1".to_string(),
            text: "text".to_string(),
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            role,
        }
    }

    #[test]
    fn user_authors_are_shortened() {
        assert_eq!(
            comment_author(&comment("0123456789abcdef", CommentRole::User)),
            "User 012345"
        );
        assert_eq!(comment_author(&comment("abc", CommentRole::User)), "User abc");
        assert_eq!(comment_author(&comment(AI_AUTHOR, CommentRole::Ai)), "AI");
    }
}
