use crate::logger::ConsoleLog;
use log::Level;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line as TextLine, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Frame;
use tradeflow::FlowMap;

pub fn render_flows_table(map: &FlowMap, f: &mut Frame<'_>, area: Rect) {
    let block = Block::default()
        .title(format!("Flows ({})", map.flows().len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    if map.flows().is_empty() {
        let paragraph = Paragraph::new("No flows. Press d for demo routes.")
            .block(block)
            .alignment(ratatui::layout::Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("From"),
        Cell::from("To"),
        Cell::from("Value"),
        Cell::from("Progress"),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let name = |code: &str| {
        map.country(code)
            .map_or_else(|| code.to_string(), |node| node.name.clone())
    };

    let rows = map.flows().iter().map(|edge| {
        let progress = edge
            .progress()
            .map_or_else(|| "-".to_string(), |p| format!("{:>3.0}%", p * 100.0));
        Row::new(vec![
            Cell::from(name(edge.from())),
            Cell::from(name(edge.to())),
            Cell::from(edge.label().unwrap_or("").to_string()),
            Cell::from(progress),
        ])
    });

    let widths = [
        Constraint::Min(8),
        Constraint::Min(8),
        Constraint::Length(9),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1);

    f.render_widget(table, area);
}

const fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug | Level::Trace => Color::DarkGray,
    }
}

pub fn render_log_panel(console: Option<&ConsoleLog>, f: &mut Frame<'_>, area: Rect) {
    let block = Block::default().title("Log").borders(Borders::ALL);
    let visible = usize::from(area.height.saturating_sub(2));

    let lines: Vec<TextLine<'_>> = console
        .map(ConsoleLog::lines)
        .unwrap_or_default()
        .into_iter()
        .rev()
        .take(visible)
        .rev()
        .map(|(level, msg)| {
            TextLine::from(vec![
                Span::styled(
                    format!("{level:<5} "),
                    Style::default().fg(level_color(level)),
                ),
                Span::raw(msg),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

const SHORTCUTS: &[(&str, &str)] = &[
    ("q", "Quit"),
    ("space", "Pause / resume"),
    ("d", "Demo trade routes"),
    ("c", "Clear flows"),
    ("r", "Reload flows file"),
    ("s", "Save SVG snapshot"),
    ("←/→", "Hover previous / next country"),
    ("Esc", "Clear hover"),
    ("F1 / ?", "Toggle this help"),
];

pub fn render_help_popup(f: &mut Frame<'_>) {
    let area = centered_rect(60, 60, f.area());
    let lines: Vec<TextLine<'_>> = SHORTCUTS
        .iter()
        .map(|(key, action)| {
            TextLine::from(vec![
                Span::styled(
                    format!("{key:>8}  "),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*action),
            ])
        })
        .collect();

    let popup = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

pub fn render_shortcuts(f: &mut Frame<'_>, area: Rect) {
    let key = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let spans: Vec<Span<'_>> = SHORTCUTS
        .iter()
        .take(6)
        .flat_map(|(k, action)| {
            [
                Span::styled(*k, key),
                Span::raw(format!(": {action}   ")),
            ]
        })
        .collect();
    f.render_widget(Paragraph::new(TextLine::from(spans)), area);
}
