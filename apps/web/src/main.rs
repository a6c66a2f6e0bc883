mod animation;

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use animation::{advance_clock, AnimationMode};
use ratzilla::ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line as TextLine, Span, Text},
    widgets::{
        canvas::{Canvas, Circle, Context, Line as CanvasLine},
        Block, Borders, Cell, Paragraph, Row, Table,
    },
    Terminal,
};
use ratzilla::{DomBackend, WebRenderer};
use tradeflow::geo::Point;
use tradeflow::{FlowMap, FlowRecord, MapOptions};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Request, RequestInit, RequestMode, Response};

const FLOWS_URL: &str = "flows.json";
const CURVE_SEGMENTS: usize = 24;

/// `flows.json` holds either a bare array of records or `{ "flows": [...] }`.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum FlowsFile {
    Records(Vec<FlowRecord>),
    Wrapped { flows: Vec<FlowRecord> },
}

impl FlowsFile {
    fn into_records(self) -> Vec<FlowRecord> {
        match self {
            Self::Records(flows) | Self::Wrapped { flows } => flows,
        }
    }
}

struct ViewState {
    mode: AnimationMode,
    clock_ms: f64,
    last_tick: Option<f64>,
    hover_index: Option<usize>,
    status: String,
}

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = format!("[{}] {}", record.target(), record.args()).into();
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&message),
            log::Level::Warn => web_sys::console::warn_1(&message),
            _ => web_sys::console::log_1(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn main() -> io::Result<()> {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }

    let mut map = FlowMap::new(MapOptions::default());
    if let Err(e) = map.initialize() {
        log::error!("Failed to build the map: {e}");
    }
    let map = Rc::new(RefCell::new(map));
    let state = Rc::new(RefCell::new(ViewState {
        mode: AnimationMode::Running,
        clock_ms: 0.0,
        last_tick: None,
        hover_index: None,
        status: format!("Loading {FLOWS_URL}..."),
    }));

    spawn_local(load_flows(map.clone(), state.clone()));

    let backend = DomBackend::new()?;
    let mut terminal = Terminal::new(backend)?;

    terminal.on_key_event({
        let map = map.clone();
        let state = state.clone();
        move |event| {
            let mut map = map.borrow_mut();
            let mut state = state.borrow_mut();
            match event.code {
                ratzilla::event::KeyCode::Char(' ') => {
                    state.mode = state.mode.toggled();
                }
                ratzilla::event::KeyCode::Char('c') => {
                    map.clear_flows();
                    state.status = "Flows cleared".to_string();
                }
                ratzilla::event::KeyCode::Char('d') => {
                    if let Ok(summary) = map.add_demo_flows() {
                        state.status = format!("Demo flows: {}", summary.added);
                    }
                }
                ratzilla::event::KeyCode::Right => move_hover(&mut map, &mut state, 1),
                ratzilla::event::KeyCode::Left => move_hover(&mut map, &mut state, -1),
                ratzilla::event::KeyCode::Esc => {
                    if let Some(code) = map.hovered().map(str::to_string) {
                        map.pointer_leave(&code);
                    }
                    state.hover_index = None;
                }
                _ => {}
            }
        }
    });

    terminal.draw_web(move |f| {
        let now = js_sys::Date::now();
        let mut map = map.borrow_mut();
        let mut state = state.borrow_mut();

        let (clock_ms, last_tick) = advance_clock(state.clock_ms, state.last_tick, now, state.mode);
        state.clock_ms = clock_ms;
        state.last_tick = last_tick;
        if state.mode == AnimationMode::Running {
            map.tick(clock_ms);
        }

        let area = f.area();
        let block = Block::default()
            .title("Trade Flow Map")
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray));
        let inner = block.inner(area).inner(Margin::new(1, 1));
        f.render_widget(block, area);

        render_dashboard(&map, &state, f, inner);
    });

    Ok(())
}

fn move_hover(map: &mut FlowMap, state: &mut ViewState, step: isize) {
    let count = map.countries().len();
    if count == 0 {
        return;
    }
    let next = match state.hover_index {
        None if step > 0 => 0,
        None => count - 1,
        Some(index) => (index + count).wrapping_add_signed(step) % count,
    };
    if let Some(code) = map.hovered().map(str::to_string) {
        map.pointer_leave(&code);
    }
    if let Some(code) = map.countries().keys().nth(next).cloned() {
        map.pointer_enter(&code);
        state.hover_index = Some(next);
        if let Some(node) = map.country(&code) {
            state.status = format!("{} ({code})", node.name);
        }
    }
}

fn render_dashboard(
    map: &FlowMap,
    state: &ViewState,
    f: &mut ratzilla::ratatui::Frame<'_>,
    area: Rect,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(12), Constraint::Length(1)])
        .split(area);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(rows[0]);

    render_map_panel(map, f, content[0]);
    render_flow_table(map, f, content[1]);
    render_footer(state, f, rows[1]);
}

fn flip(p: Point, height: f64) -> (f64, f64) {
    (p.x, height - p.y)
}

fn draw_polyline(ctx: &mut Context<'_>, points: &[Point], closed: bool, height: f64, color: Color) {
    let closing = match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 2 => Some((*last, *first)),
        _ => None,
    };
    for (a, b) in points.windows(2).map(|pair| (pair[0], pair[1])).chain(closing) {
        let (x1, y1) = flip(a, height);
        let (x2, y2) = flip(b, height);
        ctx.draw(&CanvasLine {
            x1,
            y1,
            x2,
            y2,
            color,
        });
    }
}

fn render_map_panel(map: &FlowMap, f: &mut ratzilla::ratatui::Frame<'_>, area: Rect) {
    let block = Block::default()
        .title("Flows")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let Some(geography) = map.geography() else {
        let paragraph = Paragraph::new("Map unavailable")
            .block(block)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(paragraph, area);
        return;
    };
    let [width, height] = geography.view;

    let canvas = Canvas::default()
        .block(block)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for continent in &geography.continents {
                draw_polyline(ctx, &continent.outline.flatten(), true, height, Color::DarkGray);
            }
            ctx.layer();

            for country in &geography.countries {
                let code = country.code.as_deref().unwrap_or_default();
                let color = if map.is_selected(code) || map.hovered() == Some(code) {
                    Color::Rgb(209, 229, 248)
                } else {
                    Color::Gray
                };
                draw_polyline(ctx, &country.outline.flatten(), true, height, color);
            }
            ctx.layer();

            for edge in map.flows() {
                let curve = edge.curve();
                let points: Vec<Point> = (0..=CURVE_SEGMENTS)
                    .map(|i| curve.point_at(i as f64 / CURVE_SEGMENTS as f64))
                    .collect();
                draw_polyline(ctx, &points, false, height, Color::Rgb(0, 103, 223));
                if let Some(position) = edge.marker_position() {
                    let (x, y) = flip(position, height);
                    ctx.draw(&Circle {
                        x,
                        y,
                        radius: 5.0,
                        color: Color::LightBlue,
                    });
                }
            }
            ctx.layer();

            for edge in map.flows() {
                if let Some(label) = edge.label() {
                    let (x, y) = flip(edge.curve().control, height);
                    ctx.print(x - 10.0, y, label.to_string());
                }
            }
        });

    f.render_widget(canvas, area);
}

fn render_flow_table(map: &FlowMap, f: &mut ratzilla::ratatui::Frame<'_>, area: Rect) {
    let block = Block::default()
        .title(format!("Routes ({})", map.flows().len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let header = Row::new(vec![Cell::from("From"), Cell::from("To"), Cell::from("Value")]).style(
        Style::default()
            .fg(Color::Rgb(0, 0, 238))
            .bg(Color::Rgb(200, 200, 200))
            .add_modifier(Modifier::BOLD),
    );

    let name = |code: &str| {
        map.country(code)
            .map_or_else(|| code.to_string(), |node| node.name.clone())
    };
    let rows = map.flows().iter().map(|edge| {
        Row::new(vec![
            Cell::from(name(edge.from())),
            Cell::from(name(edge.to())),
            Cell::from(edge.label().unwrap_or("").to_string()),
        ])
        .style(Style::default().fg(Color::White))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(8),
            Constraint::Min(8),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(block)
    .column_spacing(1);

    f.render_widget(table, area);
}

fn render_footer(state: &ViewState, f: &mut ratzilla::ratatui::Frame<'_>, area: Rect) {
    let mode = match state.mode {
        AnimationMode::Running => Span::styled("LIVE", Style::default().fg(Color::Green)),
        AnimationMode::Paused => Span::styled("PAUSED", Style::default().fg(Color::Yellow)),
    };
    let line = TextLine::from(vec![
        mode,
        Span::raw("  "),
        Span::raw(state.status.clone()),
        Span::raw("  "),
        Span::styled(
            "space pause  d demo  c clear  ←/→ hover",
            Style::default().fg(Color::Gray),
        ),
    ]);
    f.render_widget(
        Paragraph::new(Text::from(line)).alignment(Alignment::Center),
        area,
    );
}

async fn load_flows(map: Rc<RefCell<FlowMap>>, state: Rc<RefCell<ViewState>>) {
    let status = match fetch_flows().await {
        Ok(records) => match map.borrow_mut().update_data(&records) {
            Ok(summary) => format!("{FLOWS_URL}: {} flows, {} skipped", summary.added, summary.skipped),
            Err(e) => format!("Error: {e}"),
        },
        Err(reason) => {
            log::warn!("{reason}, showing demo flows");
            match map.borrow_mut().add_demo_flows() {
                Ok(summary) => format!("Demo flows: {}", summary.added),
                Err(e) => format!("Error: {e}"),
            }
        }
    };
    state.borrow_mut().status = status;
}

async fn fetch_flows() -> Result<Vec<FlowRecord>, String> {
    let window = web_sys::window().ok_or("No window")?;

    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::SameOrigin);

    let request = Request::new_with_str_and_init(FLOWS_URL, &opts)
        .map_err(|_| format!("Failed to build request for {FLOWS_URL}"))?;

    let response_value = wasm_bindgen_futures::JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|_| format!("Failed to fetch {FLOWS_URL}"))?;

    let response = response_value
        .dyn_into::<Response>()
        .map_err(|_| "Failed to read response".to_string())?;
    if !response.ok() {
        return Err(format!("{FLOWS_URL} returned {}", response.status()));
    }

    let body = response
        .json()
        .map_err(|_| format!("Failed to read {FLOWS_URL} body"))?;
    let json = wasm_bindgen_futures::JsFuture::from(body)
        .await
        .map_err(|_| format!("Failed to read {FLOWS_URL} body"))?;

    serde_wasm_bindgen::from_value::<FlowsFile>(json)
        .map(FlowsFile::into_records)
        .map_err(|error| format!("Failed to parse {FLOWS_URL}: {error}"))
}
