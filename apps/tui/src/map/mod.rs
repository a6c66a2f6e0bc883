// Trade flow map renderer
// Builds the base map into a scene and manages animated flow edges on top of it

pub mod animation;
pub mod scheduler;

use crate::config::{Length, MapOptions};
use crate::domain::{
    format_trade_value, has_magnitude, scaled_stroke_width, FlowOptions, FlowRecord,
};
use crate::error::{FlowMapError, Result};
use crate::geo::{fmt_coord, Geography, Point, QuadraticCurve};
use crate::scene::{ElementId, Scene};
use animation::{FlowAnimation, MarkerFrame};
use scheduler::{FrameScheduler, LoopHandle};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const LABEL_WIDTH: f64 = 40.0;
const LABEL_HEIGHT: f64 = 20.0;
const SITE_RADIUS: f64 = 3.0;
const MARKER_RADIUS: f64 = 3.0;
const GLOW_RADIUS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FlowId(pub u64);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Drawn from a country outline.
    Outline,
    /// Drawn as a dot at projected coordinates.
    Site,
}

#[derive(Debug, Clone)]
pub struct CountryNode {
    pub code: String,
    pub name: String,
    pub position: Point,
    pub kind: NodeKind,
    shape: ElementId,
}

impl CountryNode {
    pub const fn shape(&self) -> ElementId {
        self.shape
    }
}

/// One directed flow drawn on the map.
#[derive(Debug)]
pub struct FlowEdge {
    id: FlowId,
    from: String,
    to: String,
    value: f64,
    width: f64,
    curve: QuadraticCurve,
    label: Option<String>,
    group: ElementId,
    marker: Option<MarkerElements>,
    frame: Option<MarkerFrame>,
    animation: Option<LoopHandle>,
}

#[derive(Debug, Clone, Copy)]
struct MarkerElements {
    group: ElementId,
    marker: ElementId,
    glow: ElementId,
}

impl FlowEdge {
    pub const fn id(&self) -> FlowId {
        self.id
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub const fn value(&self) -> f64 {
        self.value
    }

    pub const fn width(&self) -> f64 {
        self.width
    }

    pub const fn curve(&self) -> &QuadraticCurve {
        &self.curve
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub const fn group(&self) -> ElementId {
        self.group
    }

    pub fn is_animated(&self) -> bool {
        self.animation.as_ref().is_some_and(LoopHandle::is_alive)
    }

    /// Marker position after the last frame, `None` while hidden or before the
    /// first frame.
    pub fn marker_position(&self) -> Option<Point> {
        match self.frame {
            Some(MarkerFrame::Visible { position, .. }) => Some(position),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<f64> {
        match self.frame {
            Some(MarkerFrame::Visible { progress, .. }) => Some(progress),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UpdateSummary {
    pub added: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
struct Layers {
    world: ElementId,
    flows: ElementId,
    markers: ElementId,
}

/// Animated trade-flow map drawn into an in-memory svg scene.
///
/// Call [`FlowMap::initialize`] once, then add flows and drive the markers by
/// calling [`FlowMap::tick`] every frame.
#[derive(Debug)]
pub struct FlowMap {
    options: MapOptions,
    scene: Scene,
    layers: Option<Layers>,
    geography: Option<Geography>,
    countries: BTreeMap<String, CountryNode>,
    selected: BTreeSet<String>,
    hovered: Option<String>,
    flows: Vec<FlowEdge>,
    scheduler: FrameScheduler,
    next_flow: u64,
}

impl FlowMap {
    pub fn new(options: MapOptions) -> Self {
        Self {
            options,
            scene: Scene::new(),
            layers: None,
            geography: None,
            countries: BTreeMap::new(),
            selected: BTreeSet::new(),
            hovered: None,
            flows: Vec::new(),
            scheduler: FrameScheduler::new(),
            next_flow: 0,
        }
    }

    pub const fn options(&self) -> &MapOptions {
        &self.options
    }

    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    pub const fn is_initialized(&self) -> bool {
        self.layers.is_some()
    }

    pub const fn geography(&self) -> Option<&Geography> {
        self.geography.as_ref()
    }

    pub const fn countries(&self) -> &BTreeMap<String, CountryNode> {
        &self.countries
    }

    pub fn flows(&self) -> &[FlowEdge] {
        &self.flows
    }

    pub const fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Looks up a node, following code aliases.
    pub fn country(&self, code: &str) -> Option<&CountryNode> {
        self.countries.get(self.canonical(code))
    }

    pub fn is_selected(&self, code: &str) -> bool {
        self.selected.contains(self.canonical(code))
    }

    /// Current fill of a country's shape.
    pub fn fill(&self, code: &str) -> Option<&str> {
        let node = self.country(code)?;
        self.scene.attr(node.shape, "fill")
    }

    pub fn to_svg(&self) -> String {
        self.scene.to_svg()
    }

    fn canonical<'a>(&'a self, code: &'a str) -> &'a str {
        self.geography
            .as_ref()
            .map_or(code, |geography| geography.canonical(code))
    }

    /// Builds the base map from the built-in geography. No-op when already
    /// initialized.
    pub fn initialize(&mut self) -> Result<&mut Self> {
        self.initialize_with(Geography::builtin())
    }

    /// Builds the base map from `geography`. No-op when already initialized.
    pub fn initialize_with(&mut self, geography: &Geography) -> Result<&mut Self> {
        if self.is_initialized() {
            return Ok(self);
        }
        if let Err(e) = geography.validate() {
            log::error!("Map initialization failed: {e}");
            return Err(e);
        }

        let mut scene = Scene::new();
        let layers = self.build_frame(&mut scene, geography);
        let mut countries = BTreeMap::new();

        for continent in &geography.continents {
            if let Some(path) = scene.append(layers.world, "path") {
                scene.set_attr(path, "d", continent.outline.to_path_data());
                scene.set_attr(path, "fill", &self.options.land_color);
                scene.set_attr(path, "stroke", &self.options.country_stroke_color);
                scene.set_attr(path, "stroke-width", "0.5");
                scene.set_attr(path, "data-name", &continent.name);
                append_title(&mut scene, path, &continent.name);
            }
        }

        for country in &geography.countries {
            let (Some(code), Some(center)) = (country.code.as_deref(), country.center()) else {
                continue;
            };
            let Some(path) = scene.append(layers.world, "path") else {
                continue;
            };
            scene.set_attr(path, "class", "country");
            scene.set_attr(path, "d", country.outline.to_path_data());
            scene.set_attr(path, "fill", &self.options.land_color);
            scene.set_attr(path, "stroke", &self.options.country_stroke_color);
            scene.set_attr(path, "stroke-width", "0.8");
            scene.set_attr(path, "data-code", code);
            scene.set_attr(path, "data-name", &country.name);
            append_title(&mut scene, path, &country.name);

            countries.insert(
                code.to_string(),
                CountryNode {
                    code: code.to_string(),
                    name: country.name.clone(),
                    position: center,
                    kind: NodeKind::Outline,
                    shape: path,
                },
            );
        }

        let projection = geography.projection();
        for site in &geography.sites {
            if countries.contains_key(&site.code) {
                continue;
            }
            let position = projection.project(site.lat, site.lng);
            let Some(dot) = scene.append(layers.markers, "circle") else {
                continue;
            };
            scene.set_attr(dot, "class", "country-site");
            scene.set_attr(dot, "cx", fmt_coord(position.x));
            scene.set_attr(dot, "cy", fmt_coord(position.y));
            scene.set_attr(dot, "r", fmt_coord(SITE_RADIUS));
            scene.set_attr(dot, "fill", &self.options.land_color);
            scene.set_attr(dot, "stroke", &self.options.country_stroke_color);
            scene.set_attr(dot, "stroke-width", "0.8");
            scene.set_attr(dot, "data-code", &site.code);
            scene.set_attr(dot, "data-name", &site.name);
            append_title(&mut scene, dot, &site.name);

            countries.insert(
                site.code.clone(),
                CountryNode {
                    code: site.code.clone(),
                    name: site.name.clone(),
                    position,
                    kind: NodeKind::Site,
                    shape: dot,
                },
            );
        }

        if self.options.show_labels {
            for node in countries.values() {
                if let Some(label) = scene.append(layers.markers, "text") {
                    scene.set_attr(label, "x", fmt_coord(node.position.x));
                    scene.set_attr(label, "y", fmt_coord(node.position.y - 5.0));
                    scene.set_attr(label, "text-anchor", "middle");
                    scene.set_attr(label, "font-size", "9px");
                    scene.set_attr(label, "fill", "#555");
                    scene.set_text(label, node.name.clone());
                }
            }
        }

        log::info!(
            "Flow map {} initialized with {} countries",
            self.options.container_id,
            countries.len()
        );

        self.scene = scene;
        self.layers = Some(layers);
        self.countries = countries;
        self.geography = Some(geography.clone());
        Ok(self)
    }

    fn build_frame(&self, scene: &mut Scene, geography: &Geography) -> Layers {
        let root = scene.root();
        let id = &self.options.container_id;
        let [view_width, view_height] = geography.view;

        scene.set_attr(root, "width", self.options.width);
        scene.set_attr(root, "height", fmt_coord(self.options.height));
        scene.set_attr(
            root,
            "viewBox",
            format!("0 0 {} {}", fmt_coord(view_width), fmt_coord(view_height)),
        );
        scene.set_attr(root, "id", id);
        scene.set_attr(
            root,
            "style",
            format!("background-color: {}", self.options.background_color),
        );

        if let Some(defs) = scene.append(root, "defs") {
            if let Some(marker) = scene.append(defs, "marker") {
                scene.set_attr(marker, "id", format!("arrow-{id}"));
                scene.set_attr(marker, "viewBox", "0 0 10 10");
                scene.set_attr(marker, "refX", "5");
                scene.set_attr(marker, "refY", "5");
                scene.set_attr(marker, "markerWidth", "3");
                scene.set_attr(marker, "markerHeight", "3");
                scene.set_attr(marker, "orient", "auto");
                if let Some(arrow) = scene.append(marker, "path") {
                    scene.set_attr(arrow, "d", "M 0 0 L 10 5 L 0 10 z");
                    scene.set_attr(arrow, "fill", &self.options.flow_marker_color);
                }
            }

            if let Some(gradient) = scene.append(defs, "linearGradient") {
                scene.set_attr(gradient, "id", format!("flow-gradient-{id}"));
                scene.set_attr(gradient, "gradientUnits", "userSpaceOnUse");
                append_stop(scene, gradient, "0%", &self.options.flow_line_color, "0.4");
                append_stop(scene, gradient, "100%", &self.options.flow_line_color, "0.6");
            }

            if let Some(pulse) = scene.append(defs, "radialGradient") {
                scene.set_attr(pulse, "id", format!("pulse-gradient-{id}"));
                scene.set_attr(pulse, "gradientUnits", "objectBoundingBox");
                scene.set_attr(pulse, "cx", "0.5");
                scene.set_attr(pulse, "cy", "0.5");
                scene.set_attr(pulse, "r", "0.5");
                append_stop(scene, pulse, "0%", &self.options.flow_marker_color, "0.9");
                append_stop(scene, pulse, "100%", &self.options.flow_marker_color, "0.1");
            }
        }

        if let Some(ocean) = scene.append(root, "rect") {
            scene.set_attr(ocean, "class", "ocean");
            scene.set_attr(ocean, "width", "100%");
            scene.set_attr(ocean, "height", "100%");
            scene.set_attr(ocean, "fill", &self.options.ocean_color);
        }

        let mut layer = |class: &str| {
            let group = scene.append(root, "g").unwrap_or(root);
            scene.set_attr(group, "class", class);
            group
        };

        Layers {
            world: layer("world-map"),
            flows: layer("trade-flows"),
            markers: layer("country-markers"),
        }
    }

    fn refresh_fill(&mut self, code: &str) {
        let Some(node) = self.countries.get(code) else {
            return;
        };
        let highlighted =
            self.selected.contains(code) || self.hovered.as_deref() == Some(code);
        let fill = if highlighted {
            &self.options.selected_country_color
        } else {
            &self.options.land_color
        };
        self.scene.set_attr(node.shape, "fill", fill);
    }

    /// Pointer entered a country: highlight it.
    pub fn pointer_enter(&mut self, code: &str) -> bool {
        let code = self.canonical(code).to_string();
        if !self.countries.contains_key(&code) {
            log::debug!("Hover over unknown country {code}");
            return false;
        }
        if let Some(previous) = self.hovered.replace(code.clone()) {
            if previous != code {
                self.refresh_fill(&previous);
            }
        }
        self.refresh_fill(&code);
        true
    }

    /// Pointer left a country: back to the land color unless a flow uses it.
    pub fn pointer_leave(&mut self, code: &str) -> bool {
        let code = self.canonical(code).to_string();
        if self.hovered.as_deref() != Some(code.as_str()) {
            return false;
        }
        self.hovered = None;
        self.refresh_fill(&code);
        true
    }

    /// Draws a flow from `from` to `to`.
    ///
    /// Fails without touching the map when the map is not initialized or either
    /// code is unknown.
    pub fn add_flow(
        &mut self,
        from: &str,
        to: &str,
        value: f64,
        options: &FlowOptions,
    ) -> Result<FlowId> {
        let Some(layers) = self.layers else {
            log::error!("Map not initialized. Call initialize() first.");
            return Err(FlowMapError::NotInitialized);
        };

        let origin_code = self.canonical(from).to_string();
        let target_code = self.canonical(to).to_string();
        let (origin, target) = match (
            self.countries.get(&origin_code),
            self.countries.get(&target_code),
        ) {
            (Some(origin), Some(target)) => (origin.position, target.position),
            (None, _) => return Err(unknown_country(from)),
            (_, None) => return Err(unknown_country(to)),
        };

        let width = options
            .width
            .unwrap_or_else(|| scaled_stroke_width(self.options.flow_line_width, value));
        let curve = QuadraticCurve::flow(origin, target);
        let show_label = options.show_label.unwrap_or(self.options.show_flow_values);
        let label = (show_label && has_magnitude(value)).then(|| {
            options
                .label
                .clone()
                .unwrap_or_else(|| format_trade_value(value))
        });

        let id = FlowId(self.next_flow);
        self.next_flow += 1;

        let group = self.draw_connection(layers.flows, from, to, &curve, width, label.as_deref());
        let marker = if options.animated.unwrap_or(true) {
            self.draw_marker(layers.flows, curve.start)
        } else {
            None
        };
        let animation = marker.map(|_| {
            self.scheduler.spawn(
                id,
                FlowAnimation::new(&curve, self.options.animation_speed),
            )
        });

        for code in [origin_code, target_code] {
            self.select(code);
        }

        log::debug!("Added {id} {from} -> {to} ({value})");
        self.flows.push(FlowEdge {
            id,
            from: from.to_string(),
            to: to.to_string(),
            value,
            width,
            curve,
            label,
            group,
            marker,
            frame: None,
            animation,
        });
        Ok(id)
    }

    fn select(&mut self, code: String) {
        self.selected.insert(code.clone());
        self.refresh_fill(&code);
    }

    fn draw_connection(
        &mut self,
        layer: ElementId,
        from: &str,
        to: &str,
        curve: &QuadraticCurve,
        width: f64,
        label: Option<&str>,
    ) -> ElementId {
        let id = &self.options.container_id;
        let scene = &mut self.scene;
        let group = scene.append(layer, "g").unwrap_or(layer);
        scene.set_attr(group, "class", "flow-connection");
        scene.set_attr(group, "data-flow-id", format!("flow-{from}-{to}"));
        scene.set_attr(group, "data-from", from);
        scene.set_attr(group, "data-to", to);

        if let Some(path) = scene.append(group, "path") {
            scene.set_attr(path, "class", "flow-line");
            scene.set_attr(path, "d", curve.to_path_data());
            scene.set_attr(path, "fill", "none");
            scene.set_attr(path, "stroke", format!("url(#flow-gradient-{id})"));
            scene.set_attr(path, "stroke-width", fmt_coord(width));
            scene.set_attr(path, "stroke-linecap", "round");
            scene.set_attr(path, "marker-end", format!("url(#arrow-{id})"));
        }

        if let Some(text) = label {
            let at = curve.control;
            if let Some(background) = scene.append(group, "rect") {
                scene.set_attr(background, "class", "flow-label-bg");
                scene.set_attr(background, "x", fmt_coord(at.x - LABEL_WIDTH / 2.0));
                scene.set_attr(background, "y", fmt_coord(at.y - LABEL_HEIGHT / 2.0));
                scene.set_attr(background, "width", fmt_coord(LABEL_WIDTH));
                scene.set_attr(background, "height", fmt_coord(LABEL_HEIGHT));
                scene.set_attr(background, "rx", "3");
                scene.set_attr(background, "ry", "3");
                scene.set_attr(background, "fill", "white");
                scene.set_attr(background, "opacity", "0.8");
            }
            if let Some(node) = scene.append(group, "text") {
                scene.set_attr(node, "class", "flow-label");
                scene.set_attr(node, "x", fmt_coord(at.x));
                scene.set_attr(node, "y", fmt_coord(at.y + 4.0));
                scene.set_attr(node, "text-anchor", "middle");
                scene.set_attr(node, "font-size", "8px");
                scene.set_attr(node, "fill", "#444");
                scene.set_text(node, text);
            }
        }

        group
    }

    fn draw_marker(&mut self, layer: ElementId, at: Point) -> Option<MarkerElements> {
        let fill = format!("url(#pulse-gradient-{})", self.options.container_id);
        let scene = &mut self.scene;
        let group = scene.append(layer, "g")?;
        scene.set_attr(group, "class", "flow-marker-group");

        let mut circle = |class: &str, radius: f64, opacity: &str| {
            let element = scene.append(group, "circle")?;
            scene.set_attr(element, "class", class);
            scene.set_attr(element, "r", fmt_coord(radius));
            scene.set_attr(element, "cx", fmt_coord(at.x));
            scene.set_attr(element, "cy", fmt_coord(at.y));
            scene.set_attr(element, "fill", &fill);
            scene.set_attr(element, "opacity", opacity);
            Some(element)
        };

        let marker = circle("flow-marker", MARKER_RADIUS, "0.8")?;
        let glow = circle("flow-marker-glow", GLOW_RADIUS, "0.3")?;
        Some(MarkerElements {
            group,
            marker,
            glow,
        })
    }

    /// Advances every flow animation to `now_ms` (a monotonic clock in
    /// milliseconds). Returns how many markers were updated.
    pub fn tick(&mut self, now_ms: f64) -> usize {
        let updates = self.scheduler.tick(now_ms);
        let mut applied = 0;
        for update in updates {
            let Some(edge) = self.flows.iter_mut().find(|edge| edge.id == update.flow) else {
                continue;
            };
            let Some(elements) = edge.marker else {
                continue;
            };

            match update.frame {
                MarkerFrame::Visible { position, .. } => {
                    if !matches!(edge.frame, Some(MarkerFrame::Visible { .. })) {
                        self.scene.set_attr(elements.group, "opacity", "1");
                    }
                    let x = fmt_coord(position.x);
                    let y = fmt_coord(position.y);
                    for circle in [elements.marker, elements.glow] {
                        self.scene.set_attr(circle, "cx", &x);
                        self.scene.set_attr(circle, "cy", &y);
                    }
                }
                MarkerFrame::Hidden => {
                    self.scene.set_attr(elements.group, "opacity", "0");
                }
            }
            edge.frame = Some(update.frame);
            applied += 1;
        }
        applied
    }

    /// Removes every flow and resets every country to its base color.
    pub fn clear_flows(&mut self) -> &mut Self {
        if let Some(layers) = self.layers {
            self.scene.clear_children(layers.flows);
        }
        self.flows.clear();
        self.scheduler.invalidate_all();

        let codes: Vec<String> = std::mem::take(&mut self.selected).into_iter().collect();
        for code in codes {
            self.refresh_fill(&code);
        }
        self
    }

    /// Replaces every flow with `records`. Records that cannot be drawn are
    /// logged and skipped.
    pub fn update_data(&mut self, records: &[FlowRecord]) -> Result<UpdateSummary> {
        if !self.is_initialized() {
            log::error!("Map not initialized. Call initialize() first.");
            return Err(FlowMapError::NotInitialized);
        }

        self.clear_flows();
        let mut summary = UpdateSummary::default();
        for record in records {
            if !record.has_codes() {
                log::warn!("Skipping flow without a country code");
                summary.skipped += 1;
                continue;
            }
            match self.add_flow(&record.from, &record.to, record.magnitude(), &record.options) {
                Ok(_) => summary.added += 1,
                Err(e) => {
                    log::warn!("Skipping flow {} -> {}: {e}", record.from, record.to);
                    summary.skipped += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Replaces the flows with a fixed set of major trade routes.
    pub fn add_demo_flows(&mut self) -> Result<UpdateSummary> {
        self.update_data(&demo_flows())
    }

    /// Resizes the svg root. Node positions live in view space and do not move.
    pub fn resize(&mut self, width: Option<Length>, height: Option<f64>) -> &mut Self {
        let root = self.scene.root();
        if let Some(width) = width {
            self.options.width = width;
            if self.is_initialized() {
                self.scene.set_attr(root, "width", width);
            }
        }
        if let Some(height) = height.filter(|h| h.is_finite() && *h > 0.0) {
            self.options.height = height;
            if self.is_initialized() {
                self.scene.set_attr(root, "height", fmt_coord(height));
            }
        }
        self
    }
}

fn unknown_country(code: &str) -> FlowMapError {
    log::warn!("Country not found: {code}");
    FlowMapError::UnknownCountry(code.to_string())
}

fn append_title(scene: &mut Scene, parent: ElementId, text: &str) {
    if let Some(title) = scene.append(parent, "title") {
        scene.set_text(title, text);
    }
}

fn append_stop(scene: &mut Scene, gradient: ElementId, offset: &str, color: &str, opacity: &str) {
    if let Some(stop) = scene.append(gradient, "stop") {
        scene.set_attr(stop, "offset", offset);
        scene.set_attr(stop, "stop-color", color);
        scene.set_attr(stop, "stop-opacity", opacity);
    }
}

/// Major trade routes, values in millions of USD.
pub fn demo_flows() -> Vec<FlowRecord> {
    [
        ("840", "156", 500_000.0, "$500B"),
        ("840", "276", 180_000.0, "$180B"),
        ("156", "392", 320_000.0, "$320B"),
        ("156", "124", 110_000.0, "$110B"),
        ("276", "250", 230_000.0, "$230B"),
    ]
    .into_iter()
    .map(|(from, to, value, label)| {
        FlowRecord::new(from, to, value).with_options(FlowOptions::labeled(label))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> FlowMap {
        let mut map = FlowMap::new(MapOptions::default());
        assert!(map.initialize().is_ok());
        map
    }

    fn highlight() -> String {
        MapOptions::default().selected_country_color
    }

    fn land() -> String {
        MapOptions::default().land_color
    }

    #[test]
    fn initialize_twice_keeps_the_same_map() {
        let mut map = map();
        let countries = map.countries().len();
        let elements = map.scene().len();
        let svg = map.to_svg();

        assert!(map.initialize().is_ok());

        assert_eq!(map.countries().len(), countries);
        assert_eq!(map.scene().len(), elements);
        assert_eq!(map.to_svg(), svg);
        assert_eq!(countries, 15);
    }

    #[test]
    fn base_map_has_layers_and_shapes() {
        let map = map();
        let scene = map.scene();
        assert_eq!(scene.find_by_class("world-map").len(), 1);
        assert_eq!(scene.find_by_class("trade-flows").len(), 1);
        assert_eq!(scene.find_by_class("country-markers").len(), 1);
        assert_eq!(scene.find_by_class("country").len(), 11);
        assert_eq!(scene.find_by_class("country-site").len(), 4);
        assert_eq!(map.country("410").map(|n| n.kind), Some(NodeKind::Site));
        assert_eq!(map.country("840").map(|n| n.kind), Some(NodeKind::Outline));
    }

    #[test]
    fn add_flow_before_initialize_is_rejected() {
        let mut map = FlowMap::new(MapOptions::default());
        let result = map.add_flow("840", "156", 100.0, &FlowOptions::default());
        assert!(matches!(result, Err(FlowMapError::NotInitialized)));
        assert!(map.flows().is_empty());
        assert!(map.scene().is_empty());
        assert!(matches!(
            map.update_data(&demo_flows()),
            Err(FlowMapError::NotInitialized)
        ));
    }

    #[test]
    fn unknown_origin_changes_nothing() {
        let mut map = map();
        assert!(map.add_flow("840", "276", 100.0, &FlowOptions::default()).is_ok());
        let svg = map.to_svg();
        let selected = map.selected().clone();

        let result = map.add_flow("ZZZ", "840", 100.0, &FlowOptions::default());

        assert!(matches!(result, Err(FlowMapError::UnknownCountry(ref code)) if code == "ZZZ"));
        assert_eq!(map.flows().len(), 1);
        assert_eq!(map.selected(), &selected);
        assert_eq!(map.to_svg(), svg);
    }

    #[test]
    fn unknown_destination_is_named_in_the_error() {
        let mut map = map();
        let result = map.add_flow("840", "999", 100.0, &FlowOptions::default());
        assert!(matches!(result, Err(FlowMapError::UnknownCountry(ref code)) if code == "999"));
        assert!(map.selected().is_empty());
    }

    #[test]
    fn endpoints_are_selected_until_cleared() {
        let mut map = map();
        assert!(map.add_flow("840", "156", 500_000.0, &FlowOptions::default()).is_ok());

        assert!(map.is_selected("840"));
        assert!(map.is_selected("156"));
        assert_eq!(map.fill("840"), Some(highlight().as_str()));
        assert_eq!(map.fill("156"), Some(highlight().as_str()));
        assert_eq!(map.fill("276"), Some(land().as_str()));

        map.clear_flows();

        assert!(!map.is_selected("840"));
        assert!(!map.is_selected("156"));
        assert_eq!(map.fill("840"), Some(land().as_str()));
        assert_eq!(map.fill("156"), Some(land().as_str()));
    }

    #[test]
    fn stroke_width_scales_with_value_unless_overridden() {
        let mut map = map();
        let none = FlowOptions::default();
        assert!(map.add_flow("840", "156", 0.0, &none).is_ok());
        assert!(map.add_flow("840", "156", 1000.0, &none).is_ok());
        assert!(map.add_flow("840", "156", 500_000.0, &none).is_ok());
        assert!(map.add_flow("840", "156", 500_000.0, &none.clone().with_width(7.0)).is_ok());

        let widths: Vec<f64> = map.flows().iter().map(FlowEdge::width).collect();
        assert!((widths[0] - 2.0).abs() < f64::EPSILON);
        assert!(widths[1] > widths[0]);
        assert!(widths[2] > widths[1]);
        assert!((widths[3] - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn labels_follow_value_and_options() {
        let mut map = map();
        let none = FlowOptions::default();
        assert!(map.add_flow("840", "156", 500_000_000.0, &none).is_ok());
        assert!(map.add_flow("840", "276", 180_000.0, &none).is_ok());
        assert!(map.add_flow("840", "276", 180_000.0, &FlowOptions::labeled("$180B")).is_ok());
        assert!(map.add_flow("840", "276", 0.0, &FlowOptions::labeled("$0")).is_ok());
        assert!(map.add_flow("840", "276", 10.0, &none.clone().with_show_label(false)).is_ok());

        let labels: Vec<Option<&str>> = map.flows().iter().map(FlowEdge::label).collect();
        assert_eq!(
            labels,
            vec![Some("$500.0M"), Some("$180K"), Some("$180B"), None, None]
        );
        assert_eq!(map.scene().find_by_class("flow-label").len(), 3);
        assert_eq!(map.scene().find_by_class("flow-label-bg").len(), 3);
    }

    #[test]
    fn label_sits_on_the_control_point() {
        let mut map = map();
        assert!(map.add_flow("840", "156", 500_000.0, &FlowOptions::default()).is_ok());
        let control = map.flows()[0].curve().control;
        let label = map.scene().find_by_class("flow-label")[0];
        assert_eq!(map.scene().attr(label, "x"), Some(fmt_coord(control.x).as_str()));
        assert_eq!(
            map.scene().attr(label, "y"),
            Some(fmt_coord(control.y + 4.0).as_str())
        );
    }

    #[test]
    fn duplicate_pairs_coexist_in_insertion_order() {
        let mut map = map();
        let first = map.add_flow("840", "156", 1.0, &FlowOptions::default()).unwrap();
        let second = map.add_flow("840", "156", 2.0, &FlowOptions::default()).unwrap();

        let ids: Vec<FlowId> = map.flows().iter().map(FlowEdge::id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_ne!(first, second);
        assert_eq!(map.scene().find_by_class("flow-connection").len(), 2);
    }

    #[test]
    fn alias_code_resolves_to_the_canonical_node() {
        let mut map = map();
        assert!(map.add_flow("842", "156", 1.0, &FlowOptions::default()).is_ok());
        assert!(map.is_selected("840"));
        assert_eq!(map.flows()[0].from(), "842");
        assert_eq!(
            map.flows()[0].curve().start,
            map.country("840").map(|n| n.position).unwrap_or_default()
        );
    }

    #[test]
    fn static_flows_get_no_marker() {
        let mut map = map();
        let options = FlowOptions::default().with_animated(false);
        assert!(map.add_flow("840", "156", 1.0, &options).is_ok());

        assert!(!map.flows()[0].is_animated());
        assert!(map.scene().find_by_class("flow-marker").is_empty());
        assert_eq!(map.tick(0.0), 0);
    }

    #[test]
    fn tick_moves_the_marker_along_the_curve() {
        let mut map = map();
        assert!(map.add_flow("840", "156", 1.0, &FlowOptions::default()).is_ok());
        let marker = map.scene().find_by_class("flow-marker")[0];

        assert_eq!(map.tick(1000.0), 1);
        assert_eq!(map.flows()[0].progress(), Some(0.0));

        let duration = FlowAnimation::new(map.flows()[0].curve(), 1.5).duration_ms();
        map.tick(1000.0 + duration / 2.0);

        let position = map.flows()[0].marker_position().unwrap_or_default();
        let progress = map.flows()[0].progress().unwrap_or_default();
        assert!((progress - 0.5).abs() < 1e-9);
        assert_eq!(map.scene().attr(marker, "cx"), Some(fmt_coord(position.x).as_str()));
    }

    #[test]
    fn marker_hides_at_the_end_of_a_cycle() {
        let mut map = map();
        assert!(map.add_flow("840", "276", 1.0, &FlowOptions::default()).is_ok());
        let group = map.scene().find_by_class("flow-marker-group")[0];
        let duration = FlowAnimation::new(map.flows()[0].curve(), 1.5).duration_ms();

        map.tick(0.0);
        map.tick(duration);
        assert_eq!(map.scene().attr(group, "opacity"), Some("0"));
        assert_eq!(map.flows()[0].marker_position(), None);

        map.tick(duration + animation::RESTART_PAUSE_MS);
        assert_eq!(map.scene().attr(group, "opacity"), Some("1"));
    }

    #[test]
    fn clear_stops_every_loop() {
        let mut map = map();
        assert!(map.add_demo_flows().is_ok());
        map.tick(0.0);
        map.clear_flows();

        assert_eq!(map.tick(16.0), 0);
        assert!(map.flows().is_empty());
        assert_eq!(map.scene().find_by_class("flow-connection").len(), 0);
        assert_eq!(map.scene().find_by_class("flow-marker-group").len(), 0);
    }

    #[test]
    fn flows_added_after_clear_animate_alone() {
        let mut map = map();
        assert!(map.add_flow("840", "156", 1.0, &FlowOptions::default()).is_ok());
        map.tick(0.0);
        map.clear_flows();
        assert!(map.add_flow("156", "392", 1.0, &FlowOptions::default()).is_ok());

        assert_eq!(map.tick(16.0), 1);
        assert_eq!(map.flows()[0].progress(), Some(0.0));
    }

    #[test]
    fn update_data_replaces_flows_and_counts_skips() -> Result<()> {
        let mut map = map();
        assert!(map.add_flow("840", "156", 1.0, &FlowOptions::default()).is_ok());

        let records: Vec<FlowRecord> = serde_json::from_str(
            r#"[
                {"from": "276", "to": "250", "value": 230000},
                {"reporterCode": 392, "partnerCode": "036", "tradeValue": 5000},
                {"from": "ZZZ", "to": "840", "value": 1},
                {"partnerCode": "840", "value": 1}
            ]"#,
        )?;
        let summary = map.update_data(&records)?;

        assert_eq!(summary, UpdateSummary { added: 2, skipped: 2 });
        assert_eq!(map.flows().len(), 2);
        assert!(!map.is_selected("840"));
        assert!(!map.is_selected("156"));
        assert!(map.is_selected("036"));
        Ok(())
    }

    #[test]
    fn hover_never_overrides_flow_highlight() {
        let mut map = map();
        assert!(map.pointer_enter("276"));
        assert_eq!(map.fill("276"), Some(highlight().as_str()));
        assert!(map.pointer_leave("276"));
        assert_eq!(map.fill("276"), Some(land().as_str()));

        assert!(map.add_flow("840", "276", 1.0, &FlowOptions::default()).is_ok());
        assert!(map.pointer_enter("276"));
        assert!(map.pointer_leave("276"));
        assert_eq!(map.fill("276"), Some(highlight().as_str()));

        assert!(!map.pointer_enter("ZZZ"));
        assert!(!map.pointer_leave("156"));
    }

    #[test]
    fn moving_hover_restores_the_previous_country() {
        let mut map = map();
        map.pointer_enter("250");
        map.pointer_enter("276");
        assert_eq!(map.hovered(), Some("276"));
        assert_eq!(map.fill("250"), Some(land().as_str()));
        assert_eq!(map.fill("276"), Some(highlight().as_str()));
    }

    #[test]
    fn resize_updates_root_size_only() {
        let mut map = map();
        let before = map.country("840").map(|n| n.position);

        map.resize(Some(Length::Pixels(800.0)), Some(500.0));

        let root = map.scene().root();
        assert_eq!(map.scene().attr(root, "width"), Some("800"));
        assert_eq!(map.scene().attr(root, "height"), Some("500"));
        assert_eq!(map.country("840").map(|n| n.position), before);

        map.resize(None, Some(-1.0));
        assert_eq!(map.scene().attr(root, "height"), Some("500"));
    }

    #[test]
    fn failed_geography_leaves_map_uninitialized() {
        let mut map = FlowMap::new(MapOptions::default());
        let empty = Geography {
            view: [700.0, 400.0],
            continents: Vec::new(),
            countries: Vec::new(),
            sites: Vec::new(),
            aliases: BTreeMap::new(),
            projection: None,
        };

        assert!(matches!(
            map.initialize_with(&empty),
            Err(FlowMapError::Geography(_))
        ));
        assert!(!map.is_initialized());
        assert!(map.scene().is_empty());
        assert!(map.initialize().is_ok());
    }

    #[test]
    fn show_labels_adds_country_names() {
        let options = MapOptions {
            show_labels: true,
            ..MapOptions::default()
        };
        let mut map = FlowMap::new(options);
        assert!(map.initialize().is_ok());
        let svg = map.to_svg();
        assert!(svg.contains(">Germany</text>"));
        assert!(svg.contains(">South Korea</text>"));
    }
}
