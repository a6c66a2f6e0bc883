// Geometry for the flow map
// Points, outlines, flow curves and the lat/lng projection

pub mod world;

pub use world::{Geography, Region, Site};

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_4, PI};
use std::fmt::Write as _;

/// Curvature of a flow: the control point sits this fraction of the
/// straight-line distance away from the midpoint.
pub const FLOW_BOW: f64 = 0.2;

const CUBIC_FLATTEN_STEPS: usize = 16;
const ARC_SAMPLES: usize = 96;
const MAX_LATITUDE: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            (other.x - self.x).mul_add(t, self.x),
            (other.y - self.y).mul_add(t, self.y),
        )
    }

    pub fn midpoint(self, other: Self) -> Self {
        self.lerp(other, 0.5)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

/// Formats a coordinate the way it appears in path data: integers without a
/// fraction, everything else with at most two decimals.
pub fn fmt_coord(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let text = format!("{value:.2}");
        let text = text.trim_end_matches('0').trim_end_matches('.');
        if text == "-0" {
            "0".to_string()
        } else {
            text.to_string()
        }
    }
}

/// One command of an outline. Serializes as `{"M": [x, y]}`,
/// `{"C": [[x1, y1], [x2, y2], [x, y]]}`, `{"L": [x, y]}` or `"Z"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    #[serde(rename = "M")]
    MoveTo(Point),
    #[serde(rename = "L")]
    LineTo(Point),
    #[serde(rename = "C")]
    CubicTo(Point, Point, Point),
    #[serde(rename = "Z")]
    Close,
}

/// A closed shape made of move/line/cubic commands.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outline(pub Vec<PathCommand>);

impl Outline {
    pub fn from_commands(commands: &[PathCommand]) -> Self {
        Self(commands.to_vec())
    }

    pub fn is_empty(&self) -> bool {
        !self
            .0
            .iter()
            .any(|command| !matches!(command, PathCommand::Close))
    }

    /// SVG path data, e.g. `M 70 140 C 100 135 130 135 155 140 Z`.
    pub fn to_path_data(&self) -> String {
        let mut data = String::new();
        for command in &self.0 {
            if !data.is_empty() {
                data.push(' ');
            }
            match command {
                PathCommand::MoveTo(p) => {
                    let _ = write!(data, "M {} {}", fmt_coord(p.x), fmt_coord(p.y));
                }
                PathCommand::LineTo(p) => {
                    let _ = write!(data, "L {} {}", fmt_coord(p.x), fmt_coord(p.y));
                }
                PathCommand::CubicTo(c1, c2, p) => {
                    let _ = write!(
                        data,
                        "C {} {} {} {} {} {}",
                        fmt_coord(c1.x),
                        fmt_coord(c1.y),
                        fmt_coord(c2.x),
                        fmt_coord(c2.y),
                        fmt_coord(p.x),
                        fmt_coord(p.y)
                    );
                }
                PathCommand::Close => data.push('Z'),
            }
        }
        data
    }

    /// Approximates the outline as a polygon. Cubic segments are sampled.
    pub fn flatten(&self) -> Vec<Point> {
        let mut points: Vec<Point> = Vec::new();
        let mut current = Point::default();
        for command in &self.0 {
            match *command {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => {
                    points.push(p);
                    current = p;
                }
                PathCommand::CubicTo(c1, c2, end) => {
                    for step in 1..=CUBIC_FLATTEN_STEPS {
                        let t = step as f64 / CUBIC_FLATTEN_STEPS as f64;
                        points.push(cubic_point(current, c1, c2, end, t));
                    }
                    current = end;
                }
                PathCommand::Close => {}
            }
        }
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        points
    }

    /// Area centroid of the flattened outline, or the vertex average when the
    /// outline has no area.
    pub fn centroid(&self) -> Option<Point> {
        polygon_centroid(&self.flatten())
    }

    pub fn bounds(&self) -> Option<(Point, Point)> {
        let points = self.flatten();
        let first = *points.first()?;
        Some(points.iter().fold((first, first), |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }
}

fn cubic_point(p0: Point, c1: Point, c2: Point, p1: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    Point::new(
        d.mul_add(p1.x, c.mul_add(c2.x, a.mul_add(p0.x, b * c1.x))),
        d.mul_add(p1.y, c.mul_add(c2.y, a.mul_add(p0.y, b * c1.y))),
    )
}

pub fn polygon_centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }

    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        let cross = a.x.mul_add(b.y, -(b.x * a.y));
        area += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    area *= 0.5;

    if area.abs() < 1e-9 {
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Some(Point::new(sx / n, sy / n));
    }

    Some(Point::new(cx / (6.0 * area), cy / (6.0 * area)))
}

/// Control point for a flow between two nodes: the midpoint pushed along the
/// perpendicular by `FLOW_BOW * distance`. Coincident endpoints get the
/// midpoint.
pub fn flow_control_point(from: Point, to: Point) -> Point {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let distance = dx.hypot(dy);
    let mid = from.midpoint(to);
    if distance <= f64::EPSILON {
        return mid;
    }

    let bow = distance * FLOW_BOW;
    Point::new(
        (-dy / distance).mul_add(bow, mid.x),
        (dx / distance).mul_add(bow, mid.y),
    )
}

/// Quadratic Bezier curve used as the geometry of a flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticCurve {
    pub start: Point,
    pub control: Point,
    pub end: Point,
}

impl QuadraticCurve {
    pub const fn new(start: Point, control: Point, end: Point) -> Self {
        Self {
            start,
            control,
            end,
        }
    }

    /// The bowed curve between two nodes.
    pub fn flow(from: Point, to: Point) -> Self {
        Self::new(from, flow_control_point(from, to), to)
    }

    pub fn point_at(&self, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let a = u * u;
        let b = 2.0 * u * t;
        let c = t * t;
        Point::new(
            c.mul_add(self.end.x, a.mul_add(self.start.x, b * self.control.x)),
            c.mul_add(self.end.y, a.mul_add(self.start.y, b * self.control.y)),
        )
    }

    pub fn to_path_data(&self) -> String {
        format!(
            "M {} {} Q {} {} {} {}",
            fmt_coord(self.start.x),
            fmt_coord(self.start.y),
            fmt_coord(self.control.x),
            fmt_coord(self.control.y),
            fmt_coord(self.end.x),
            fmt_coord(self.end.y)
        )
    }

    pub fn arc_table(&self) -> ArcTable {
        let mut lengths = Vec::with_capacity(ARC_SAMPLES + 1);
        lengths.push(0.0);
        let mut previous = self.start;
        let mut total = 0.0;
        for step in 1..=ARC_SAMPLES {
            let point = self.point_at(step as f64 / ARC_SAMPLES as f64);
            total += previous.distance(point);
            lengths.push(total);
            previous = point;
        }
        ArcTable {
            curve: *self,
            lengths,
        }
    }

    pub fn length(&self) -> f64 {
        self.arc_table().total()
    }
}

/// Cumulative arc lengths of a curve sampled at even `t` steps, for
/// point-at-length lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcTable {
    curve: QuadraticCurve,
    lengths: Vec<f64>,
}

impl ArcTable {
    pub fn total(&self) -> f64 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    pub const fn curve(&self) -> &QuadraticCurve {
        &self.curve
    }

    /// The point `distance` units along the curve, clamped to its ends.
    pub fn point_at_length(&self, distance: f64) -> Point {
        let total = self.total();
        if total <= f64::EPSILON || distance <= 0.0 {
            return self.curve.start;
        }
        if distance >= total {
            return self.curve.end;
        }

        let index = self.lengths.partition_point(|&len| len < distance).max(1);
        let before = self.lengths[index - 1];
        let after = self.lengths[index];
        let span = after - before;
        let local = if span > 0.0 {
            (distance - before) / span
        } else {
            0.0
        };
        let steps = (self.lengths.len() - 1) as f64;
        let t = ((index - 1) as f64 + local) / steps;
        self.curve.point_at(t)
    }
}

/// Maps longitude/latitude into map space: linear in longitude, Mercator in
/// latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    /// Map position of longitude 0 / latitude 0.
    pub origin_x: f64,
    pub origin_y: f64,
    /// Map units per degree of longitude.
    pub scale_x: f64,
    /// Map units per unit of Mercator northing.
    pub scale_y: f64,
}

impl Projection {
    pub const fn new(origin_x: f64, origin_y: f64, scale_x: f64, scale_y: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            scale_x,
            scale_y,
        }
    }

    /// The whole world spread over a `width` x `height` surface.
    pub fn fit(width: f64, height: f64) -> Self {
        Self::new(width / 2.0, height / 2.0, width / 360.0, height / (2.0 * PI))
    }

    pub fn longitude_to_x(&self, lng: f64) -> f64 {
        lng.mul_add(self.scale_x, self.origin_x)
    }

    pub fn latitude_to_y(&self, lat: f64) -> f64 {
        let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let merc_n = (FRAC_PI_4 + lat_rad / 2.0).tan().ln();
        merc_n.mul_add(-self.scale_y, self.origin_y)
    }

    pub fn project(&self, lat: f64, lng: f64) -> Point {
        Point::new(self.longitude_to_x(lng), self.latitude_to_y(lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < 1e-6, "expected {expected}, got {actual}, diff {diff}");
    }

    #[test]
    fn control_point_bows_perpendicular_by_a_fifth_of_the_distance() {
        let from = Point::new(0.0, 0.0);
        let to = Point::new(100.0, 0.0);
        let control = flow_control_point(from, to);
        // perpendicular of (100, 0) is (0, 1)
        assert_close(control.x, 50.0);
        assert_close(control.y, 20.0);
    }

    #[test]
    fn bow_offset_scales_with_distance() {
        let origin = Point::new(10.0, 10.0);
        let near = Point::new(40.0, 50.0);
        let far = Point::new(310.0, 410.0);

        let near_offset = flow_control_point(origin, near).distance(origin.midpoint(near));
        let far_offset = flow_control_point(origin, far).distance(origin.midpoint(far));

        assert_close(near_offset, origin.distance(near) * FLOW_BOW);
        assert_close(far_offset, origin.distance(far) * FLOW_BOW);
        assert!(far_offset > near_offset);
    }

    #[test]
    fn coincident_endpoints_use_the_midpoint() {
        let p = Point::new(12.0, 34.0);
        assert_eq!(flow_control_point(p, p), p);
        let table = QuadraticCurve::flow(p, p).arc_table();
        assert_close(table.total(), 0.0);
        assert_eq!(table.point_at_length(5.0), p);
    }

    #[test]
    fn straight_curve_length_matches_distance() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(30.0, 40.0);
        let curve = QuadraticCurve::new(start, start.midpoint(end), end);
        assert_close(curve.length(), 50.0);
        let halfway = curve.arc_table().point_at_length(25.0);
        assert!((halfway.x - 15.0).abs() < 1e-3);
        assert!((halfway.y - 20.0).abs() < 1e-3);
    }

    #[test]
    fn bowed_curve_is_longer_than_its_chord() {
        let curve = QuadraticCurve::flow(Point::new(0.0, 0.0), Point::new(200.0, 0.0));
        let table = curve.arc_table();
        assert!(table.total() > 200.0);
        assert_eq!(table.point_at_length(-1.0), curve.start);
        assert_eq!(table.point_at_length(table.total() + 1.0), curve.end);
    }

    #[test]
    fn path_data_uses_quadratic_command() {
        let curve = QuadraticCurve::new(
            Point::new(117.5, 162.0),
            Point::new(300.0, 100.25),
            Point::new(485.0, 175.0),
        );
        assert_eq!(curve.to_path_data(), "M 117.5 162 Q 300 100.25 485 175");
    }

    #[test]
    fn centroid_of_square_is_its_center() {
        let outline = Outline(vec![
            PathCommand::MoveTo(Point::new(0.0, 0.0)),
            PathCommand::LineTo(Point::new(10.0, 0.0)),
            PathCommand::LineTo(Point::new(10.0, 10.0)),
            PathCommand::LineTo(Point::new(0.0, 10.0)),
            PathCommand::Close,
        ]);
        let centroid = outline.centroid().unwrap_or_default();
        assert_close(centroid.x, 5.0);
        assert_close(centroid.y, 5.0);
    }

    #[test]
    fn degenerate_outline_falls_back_to_vertex_average() {
        let points = [Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(8.0, 0.0)];
        let centroid = polygon_centroid(&points).unwrap_or_default();
        assert_close(centroid.x, 4.0);
        assert_close(centroid.y, 0.0);
        assert_eq!(polygon_centroid(&[]), None);
    }

    #[test]
    fn projection_maps_origin_to_center() {
        let projection = Projection::fit(700.0, 400.0);
        let center = projection.project(0.0, 0.0);
        assert_close(center.x, 350.0);
        assert_close(center.y, 200.0);
        assert!(projection.latitude_to_y(50.0) < 200.0);
        assert!(projection.latitude_to_y(90.0).is_finite());
    }

    #[test]
    fn outline_round_trips_through_json() -> Result<(), serde_json::Error> {
        let json = r#"[{"M": [0, 0]}, {"C": [[1, 2], [3, 4], [5, 6]]}, "Z"]"#;
        let outline: Outline = serde_json::from_str(json)?;
        assert_eq!(outline.to_path_data(), "M 0 0 C 1 2 3 4 5 6 Z");
        Ok(())
    }

    #[test]
    fn coordinates_format_compactly() {
        assert_eq!(fmt_coord(140.0), "140");
        assert_eq!(fmt_coord(-0.001), "0");
        assert_eq!(fmt_coord(12.345_678), "12.35");
        assert_eq!(fmt_coord(2.5), "2.5");
    }
}
