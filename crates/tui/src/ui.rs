use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use avbot_core::types::{BotState, BotStatus};

use crate::App;

pub fn draw(f: &mut Frame, app: &App) {
    let status = app.snapshot();

    let columns = if app.log_visible {
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).split(f.area())
    } else {
        Layout::horizontal([Constraint::Percentage(100)]).split(f.area())
    };

    draw_status(f, columns[0], &status, app.shutdown.is_cancelled());
    if app.log_visible && columns.len() > 1 {
        draw_logs(f, columns[1], app);
    }
    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

fn state_color(state: BotState) -> Color {
    match state {
        BotState::Idle => Color::DarkGray,
        BotState::Dead | BotState::Failed => Color::Red,
        BotState::Done | BotState::MatchOver => Color::Yellow,
        BotState::Active | BotState::Farming => Color::Green,
        _ => Color::Cyan,
    }
}

fn draw_status(f: &mut Frame, area: Rect, status: &BotStatus, stopping: bool) {
    let rows = Layout::vertical([Constraint::Length(1), Constraint::Length(3), Constraint::Min(0)]).split(area);

    let (label, bg) = if stopping && !status.state.is_finished() {
        ("STOPPING...".to_string(), Color::Yellow)
    } else {
        (status.state.label().to_uppercase(), state_color(status.state))
    };
    let pad = (rows[0].width as usize).saturating_sub(label.len());
    let banner = format!("{}{}{}", " ".repeat(pad / 2), label, " ".repeat(pad - pad / 2));
    f.render_widget(
        Paragraph::new(Span::styled(
            banner,
            Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD),
        )),
        rows[0],
    );

    let ratio = if status.games == 0 {
        0.0
    } else {
        (status.completed as f64 / status.games as f64).clamp(0.0, 1.0)
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::LEFT | Borders::RIGHT).border_style(Style::default().fg(Color::Cyan)))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(format!("{}/{} completed", status.completed, status.games));
    f.render_widget(gauge, rows[1]);

    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let field = |name: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!(" {:<9}", name), Style::default().fg(Color::DarkGray)),
            Span::styled(value, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        ])
    };
    let routine = if status.routine.is_empty() { "-".to_string() } else { status.routine.clone() };
    let lines = vec![
        field("routine", routine),
        field("current", format!("{} of {}", status.match_index, status.games)),
        field("state", status.state.label().to_string()),
        Line::from(vec![
            Span::styled(format!(" {:<9}", "detail"), Style::default().fg(Color::DarkGray)),
            Span::styled(status.detail.clone(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(""),
        Line::from(vec![
            key(" q"),
            Span::raw(" stop/quit, "),
            key("l"),
            Span::raw(" logs, "),
            key("j"),
            Span::raw("/"),
            key("k"),
            Span::raw(" scroll, "),
            key("ctrl+shift+k"),
            Span::raw(" stop from game"),
        ]),
    ];
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
                .border_style(Style::default().fg(Color::Cyan)),
        ),
        rows[2],
    );
}

fn draw_logs(f: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let total = app.log_messages.len();
    let scroll = app.log_scroll.min(total.saturating_sub(visible));
    let start = total.saturating_sub(visible + scroll);
    let end = total.saturating_sub(scroll);
    let lines: Vec<Line> = app.log_messages[start..end].iter().map(|m| parse_log_line(m)).collect();

    let title = if scroll > 0 { format!(" Logs (+{}) ", scroll) } else { " Logs ".to_string() };
    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(panel, area);
}

fn prefix_color(index: u8) -> Color {
    match index {
        1 => Color::DarkGray,
        2 => Color::LightBlue,
        3 => Color::LightGreen,
        4 => Color::LightMagenta,
        _ => Color::White,
    }
}

/// Render a `level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage` record.
fn parse_log_line(raw: &str) -> Line<'_> {
    let parts: Vec<&str> = raw.splitn(5, '\x1f').collect();
    let [level, prefix, color, timestamp, message] = parts[..] else {
        return Line::from(raw);
    };
    let color = prefix_color(color.parse().unwrap_or(0));

    let mut spans = vec![
        Span::styled(timestamp, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];
    match level {
        "ERROR" => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        "WARN" => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        _ => {}
    }
    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, Style::default().fg(color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(message, Style::default().fg(color)));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn structured_records_are_split() {
        let line = parse_log_line("WARN\x1fbg\x1f2\x1f12:00:01\x1fqueue dialog not found");
        assert_eq!(text(&line), "12:00:01 warn bg queue dialog not found");
        assert_eq!(line.spans[3].style.fg, Some(Color::LightBlue));
    }

    #[test]
    fn plain_text_falls_through() {
        assert_eq!(text(&parse_log_line("hello")), "hello");
    }
}
