// UI module for tradeflow
// Lays out the map, the flows table, the log panel and the status bar

pub mod widgets;

use crate::app::App;
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line as TextLine, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use widgets::flow_map::render_flow_map;
use widgets::panels::{render_flows_table, render_help_popup, render_log_panel, render_shortcuts};

pub fn ui(app: &App, f: &mut Frame<'_>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),   // Map and side panels
            Constraint::Length(3), // Status area
            Constraint::Length(1), // Shortcuts hint
        ])
        .split(f.area().inner(Margin::new(1, 0)));

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(rows[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(10)])
        .split(columns[1]);

    render_flow_map(&app.map, f, columns[0], app.paused);
    render_flows_table(&app.map, f, side[0]);
    render_log_panel(app.console.as_ref(), f, side[1]);
    render_status(app, f, rows[1]);
    render_shortcuts(f, rows[2]);

    if app.show_help {
        render_help_popup(f);
    }
}

fn render_status(app: &App, f: &mut Frame<'_>, area: Rect) {
    let state = if app.paused {
        Span::styled("PAUSED", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("LIVE", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    };

    let line = TextLine::from(vec![
        state,
        Span::raw(format!(
            "  t={:.1}s  {} countries  {} flows  ",
            app.clock_ms() / 1000.0,
            app.map.countries().len(),
            app.map.flows().len()
        )),
        Span::styled(app.status_message.clone(), Style::default().fg(Color::White)),
    ]);

    let status = Paragraph::new(line).block(
        Block::default()
            .title("Status")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(status, area);
}
