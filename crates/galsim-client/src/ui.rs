use galsim_client::ActiveSession;
use galsim_core::{AffectionBand, Role};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, ConnectionStatus, ThemeMode};

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

pub const NO_CHOICES_HINT: &str = "No choices available. Press Ctrl+N to start a new dialogue.";

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Body
            Constraint::Length(1), // Status bar
        ])
        .split(f.size());

    draw_header(f, app, chunks[0]);
    match app.session.session() {
        Some(session) => draw_dialogue(f, app, session, chunks[1]),
        None => draw_theme_select(f, app, chunks[1]),
    }
    draw_status_bar(f, app, chunks[2]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let status_color = match app.status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Disconnected => Color::Red,
        ConnectionStatus::Connecting => Color::Yellow,
        ConnectionStatus::Error => Color::Red,
    };

    let mut spans = vec![
        Span::styled(
            " GalSim ",
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Magenta),
        ),
        Span::styled(" | ", Style::default().fg(Color::Gray)),
        Span::styled(app.status.to_string(), Style::default().fg(status_color)),
    ];
    if let Some(session) = app.session.session() {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(
            session.theme().to_string(),
            Style::default().fg(Color::Cyan),
        ));
    }
    if app.is_busy() {
        spans.push(Span::styled(
            format!("  {} Waiting for her reply...", SPINNER[app.spinner % SPINNER.len()]),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}

fn draw_theme_select(f: &mut Frame, app: &App, area: Rect) {
    let marker = |mode: ThemeMode| if app.theme_mode == mode { "(●) " } else { "( ) " };
    let highlight = |mode: ThemeMode| {
        if app.theme_mode == mode {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        }
    };

    let mut custom_line = vec![
        Span::styled(marker(ThemeMode::Custom), highlight(ThemeMode::Custom)),
        Span::styled("Custom theme: ", highlight(ThemeMode::Custom)),
        Span::styled(app.input.as_str(), Style::default().fg(Color::White)),
    ];
    if app.theme_mode == ThemeMode::Custom {
        custom_line.push(Span::styled("▌", Style::default().fg(Color::Green)));
    }

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(marker(ThemeMode::Auto), highlight(ThemeMode::Auto)),
            Span::styled("Let the story pick a theme", highlight(ThemeMode::Auto)),
        ]),
        Line::from(custom_line),
        Line::from(""),
        Line::from(Span::styled(
            "[Tab] Switch option  [Enter] Start",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("New dialogue")
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(body, area);
}

fn draw_dialogue(f: &mut Frame, app: &App, session: &ActiveSession, area: Rect) {
    let choice_rows = session.labeled_choices().len().max(1) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),              // Affection
            Constraint::Min(5),                 // Transcript
            Constraint::Length(choice_rows + 2), // Choices
        ])
        .split(area);

    draw_affection(f, session, chunks[0]);
    draw_transcript(f, app, session, chunks[1]);
    draw_choices(f, app, session, chunks[2]);
}

/// Gauge fill uses the first stop of the band's gradient.
pub fn band_color(band: AffectionBand) -> Color {
    let (start, _) = band.gradient();
    match AffectionBand::rgb(start) {
        Some((r, g, b)) => Color::Rgb(r, g, b),
        None => Color::Magenta,
    }
}

fn draw_affection(f: &mut Frame, session: &ActiveSession, area: Rect) {
    let gauge = session.gauge();
    let widget = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Affection"))
        .gauge_style(Style::default().fg(band_color(gauge.band)))
        .percent(gauge.percent as u16)
        .label(format!("{} ({})", gauge.value, gauge.band));
    f.render_widget(widget, area);
}

fn draw_transcript(f: &mut Frame, app: &App, session: &ActiveSession, area: Rect) {
    let width = area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = session
        .history()
        .iter()
        .map(|entry| {
            let (prefix, style) = match entry.role {
                Role::Character => ("♥ ", Style::default().fg(Color::Magenta)),
                Role::User => ("> ", Style::default().fg(Color::Cyan)),
            };
            let mut lines = wrap(&entry.text, width.saturating_sub(2))
                .into_iter()
                .enumerate()
                .map(|(i, chunk)| {
                    let lead = if i == 0 { prefix } else { "  " };
                    Line::from(vec![Span::styled(lead, style), Span::styled(chunk, style)])
                })
                .collect::<Vec<_>>();
            lines.push(Line::from(""));
            ListItem::new(Text::from(lines))
        })
        .collect();

    // Newest entries stay visible; scroll_offset counts entries hidden from the bottom.
    let visible_height = area.height.saturating_sub(2) as usize;
    let end = items.len().saturating_sub(app.scroll_offset);
    let mut start = end;
    let mut used = 0;
    while start > 0 {
        let h = items[start - 1].height();
        if used + h > visible_height && start != end {
            break;
        }
        used += h;
        start -= 1;
    }
    let visible: Vec<ListItem> = items[start..end].to_vec();

    let list = List::new(visible).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Session {}", short_id(session.session_id())))
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(list, area);
}

fn draw_choices(f: &mut Frame, app: &App, session: &ActiveSession, area: Rect) {
    let choices = session.labeled_choices();
    let dim = app.is_busy();
    let lines: Vec<Line> = if choices.is_empty() {
        vec![Line::from(Span::styled(
            NO_CHOICES_HINT,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ))]
    } else {
        choices
            .iter()
            .map(|c| {
                let style = if dim {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().fg(Color::White)
                };
                Line::from(vec![
                    Span::styled(
                        format!("[{}] ", c.letter),
                        style.add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(c.text.as_str(), style),
                ])
            })
            .collect()
    };

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Choices")
                .border_style(Style::default().fg(Color::Blue)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.has_session() {
        "[A-D] Choose  [↑/↓] Scroll  [Ctrl+N] New Dialogue  [Ctrl+C] Quit"
    } else {
        "[Tab] Switch  [Enter] Start  [Ctrl+C] Quit"
    };

    let (text, style) = match &app.notice {
        Some(notice) if notice.is_error => (
            format!(" {} {} | {}", notice.at.format("%H:%M:%S"), notice.text, help_text),
            Style::default().fg(Color::Red),
        ),
        Some(notice) => (
            format!(" {} | {}", notice.text, help_text),
            Style::default().fg(Color::Gray),
        ),
        None => (format!(" {}", help_text), Style::default().fg(Color::Gray)),
    };

    let status_bar = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(style.add_modifier(Modifier::REVERSED));

    f.render_widget(status_bar, area);
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Greedy word wrap by display width; words wider than the line are kept whole.
fn wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.width()
        } else {
            current.width() + 1 + word.width()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
