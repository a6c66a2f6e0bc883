use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line as TextLine, Span};
use ratatui::widgets::canvas::{Canvas, Circle, Context, Line as CanvasLine};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tradeflow::geo::{Outline, Point};
use tradeflow::map::NodeKind;
use tradeflow::FlowMap;

/// Samples per flow curve when drawn as line segments.
const CURVE_SEGMENTS: usize = 24;

/// Terminal color for a CSS color string: `#rgb`, `#rrggbb`, `rgb()`/`rgba()`
/// or a handful of names. Alpha is ignored.
pub fn parse_css_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(body) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let mut channels = body.split(',').map(|part| part.trim().parse::<u8>());
        let r = channels.next()?.ok()?;
        let g = channels.next()?.ok()?;
        let b = channels.next()?.ok()?;
        return Some(Color::Rgb(r, g, b));
    }
    match value.to_ascii_lowercase().as_str() {
        "white" => Some(Color::White),
        "black" => Some(Color::Black),
        "gray" | "grey" => Some(Color::Gray),
        "red" => Some(Color::Red),
        "blue" => Some(Color::Blue),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let mut out = [0_u8; 3];
            for (slot, digit) in out.iter_mut().zip(hex.chars()) {
                let v = u8::try_from(digit.to_digit(16)?).ok()?;
                *slot = v * 17;
            }
            Some(Color::Rgb(out[0], out[1], out[2]))
        }
        _ => None,
    }
}

fn color_or(value: &str, fallback: Color) -> Color {
    parse_css_color(value).unwrap_or(fallback)
}

/// Canvas y grows upwards, svg y grows downwards.
fn flip(p: Point, height: f64) -> (f64, f64) {
    (p.x, height - p.y)
}

fn draw_polyline(
    ctx: &mut Context<'_>,
    points: &[Point],
    closed: bool,
    height: f64,
    color: Color,
) {
    let segments = points.windows(2).map(|pair| (pair[0], pair[1]));
    let closing = match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 2 => Some((*last, *first)),
        _ => None,
    };
    for (a, b) in segments.chain(closing) {
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

fn draw_outline(ctx: &mut Context<'_>, outline: &Outline, height: f64, color: Color) {
    draw_polyline(ctx, &outline.flatten(), true, height, color);
}

pub fn render_flow_map(map: &FlowMap, f: &mut Frame<'_>, area: Rect, paused: bool) {
    let title = if paused {
        "Trade Flows (paused)"
    } else {
        "Trade Flows"
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let Some(geography) = map.geography() else {
        let paragraph = Paragraph::new("Map not initialized")
            .block(block)
            .alignment(ratatui::layout::Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(paragraph, area);
        return;
    };

    let [width, height] = geography.view;
    let options = map.options();
    let border = color_or(&options.country_stroke_color, Color::DarkGray);
    let land = color_or(&options.land_color, Color::Gray);
    let flow = color_or(&options.flow_line_color, Color::Blue);
    let marker = color_or(&options.flow_marker_color, Color::LightBlue);

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for continent in &geography.continents {
                draw_outline(ctx, &continent.outline, height, border);
            }
            ctx.layer();

            for country in &geography.countries {
                let fill = country
                    .code
                    .as_deref()
                    .and_then(|code| map.fill(code))
                    .map_or(land, |value| color_or(value, land));
                draw_outline(ctx, &country.outline, height, fill);
            }
            for node in map.countries().values() {
                if node.kind == NodeKind::Site {
                    let (x, y) = flip(node.position, height);
                    let color = map.fill(&node.code).map_or(land, |value| color_or(value, land));
                    ctx.draw(&Circle {
                        x,
                        y,
                        radius: 3.0,
                        color,
                    });
                }
            }
            ctx.layer();

            for edge in map.flows() {
                let curve = edge.curve();
                let points: Vec<Point> = (0..=CURVE_SEGMENTS)
                    .map(|i| curve.point_at(i as f64 / CURVE_SEGMENTS as f64))
                    .collect();
                draw_polyline(ctx, &points, false, height, flow);
            }
            for edge in map.flows() {
                if let Some(position) = edge.marker_position() {
                    let (x, y) = flip(position, height);
                    ctx.draw(&Circle {
                        x,
                        y,
                        radius: 5.0,
                        color: marker,
                    });
                }
            }
            ctx.layer();

            for edge in map.flows() {
                if let Some(label) = edge.label() {
                    let (x, y) = flip(edge.curve().control, height);
                    ctx.print(
                        x - 10.0,
                        y,
                        TextLine::from(Span::styled(label.to_string(), Style::default().fg(Color::White))),
                    );
                }
            }
            if map.options().show_labels || map.hovered().is_some() {
                for node in map.countries().values() {
                    let hovered = map.hovered() == Some(node.code.as_str());
                    if map.options().show_labels || hovered {
                        let (x, y) = flip(node.position, height);
                        let color = if hovered { Color::Yellow } else { Color::Gray };
                        ctx.print(
                            x,
                            y + 6.0,
                            TextLine::from(Span::styled(node.name.clone(), Style::default().fg(color))),
                        );
                    }
                }
            }
        });

    f.render_widget(canvas, area);
}
