use crate::app::actions::{read_records, write_snapshot};
use crate::logger::ConsoleLog;
use color_eyre::Result;
use std::path::PathBuf;
use std::time::Instant;
use tradeflow::{FlowMap, UpdateSummary};

/// Longest frame gap fed to the animations, so a stalled terminal does not
/// make markers jump.
const MAX_FRAME_MS: f64 = 250.0;

#[derive(Debug)]
pub struct App {
    pub running: bool,
    pub paused: bool,
    pub show_help: bool,
    pub map: FlowMap,
    pub flows_path: Option<PathBuf>,
    pub snapshot_dir: PathBuf,
    pub status_message: String,
    pub console: Option<ConsoleLog>,
    hover_index: Option<usize>,
    clock_ms: f64,
    last_frame: Instant,
}

impl App {
    pub fn new(map: FlowMap) -> Self {
        Self {
            running: true,
            paused: false,
            show_help: false,
            map,
            flows_path: None,
            snapshot_dir: PathBuf::from("."),
            status_message: String::new(),
            console: None,
            hover_index: None,
            clock_ms: 0.0,
            last_frame: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_flows_path(mut self, path: Option<PathBuf>) -> Self {
        self.flows_path = path;
        self
    }

    #[must_use]
    pub fn with_console(mut self, console: ConsoleLog) -> Self {
        self.console = Some(console);
        self
    }

    /// Animation clock in milliseconds. Stands still while paused.
    pub const fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Advances the animation clock and the map. Called once per frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f64() * 1000.0;
        self.last_frame = now;
        self.advance(delta);
    }

    fn advance(&mut self, delta_ms: f64) {
        if self.paused {
            return;
        }
        self.clock_ms += delta_ms.clamp(0.0, MAX_FRAME_MS);
        self.map.tick(self.clock_ms);
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        self.status_message = if self.paused { "Paused" } else { "Running" }.to_string();
    }

    pub fn clear(&mut self) {
        self.map.clear_flows();
        self.status_message = "Flows cleared".to_string();
    }

    pub fn show_demo(&mut self) {
        match self.map.add_demo_flows() {
            Ok(summary) => self.report("Demo flows", summary),
            Err(e) => self.status_message = format!("Error: {e}"),
        }
    }

    /// Reloads the flows file, if one was given.
    pub async fn reload(&mut self) -> Result<()> {
        let Some(path) = self.flows_path.clone() else {
            self.status_message = "No flows file to reload".to_string();
            return Ok(());
        };
        let records = read_records(&path).await?;
        let summary = self.map.update_data(&records)?;
        self.report(&path.display().to_string(), summary);
        Ok(())
    }

    pub async fn save_snapshot(&mut self) -> Result<PathBuf> {
        let path = write_snapshot(&self.snapshot_dir, &self.map.to_svg()).await?;
        log::info!("Saved snapshot to {}", path.display());
        self.status_message = format!("Saved {}", path.display());
        Ok(path)
    }

    fn report(&mut self, source: &str, summary: UpdateSummary) {
        self.status_message = if summary.skipped == 0 {
            format!("{source}: {} flows", summary.added)
        } else {
            format!(
                "{source}: {} flows, {} skipped",
                summary.added, summary.skipped
            )
        };
    }

    /// Code of the hovered country, if any.
    pub fn hovered(&self) -> Option<&str> {
        self.map.hovered()
    }

    pub fn hover_next(&mut self) {
        let count = self.map.countries().len();
        if count == 0 {
            return;
        }
        let next = self.hover_index.map_or(0, |index| (index + 1) % count);
        self.hover(next);
    }

    pub fn hover_prev(&mut self) {
        let count = self.map.countries().len();
        if count == 0 {
            return;
        }
        let prev = self
            .hover_index
            .map_or(count - 1, |index| (index + count - 1) % count);
        self.hover(prev);
    }

    pub fn clear_hover(&mut self) {
        if let Some(code) = self.map.hovered().map(str::to_string) {
            self.map.pointer_leave(&code);
        }
        self.hover_index = None;
    }

    fn hover(&mut self, index: usize) {
        let Some(code) = self.map.countries().keys().nth(index).cloned() else {
            return;
        };
        self.clear_hover();
        if self.map.pointer_enter(&code) {
            self.hover_index = Some(index);
            if let Some(node) = self.map.country(&code) {
                self.status_message = format!("{} ({code})", node.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeflow::MapOptions;

    fn app() -> App {
        let mut map = FlowMap::new(MapOptions::default());
        map.initialize().unwrap();
        App::new(map)
    }

    #[test]
    fn paused_clock_stands_still() {
        let mut app = app();
        app.advance(100.0);
        app.toggle_pause();
        app.advance(100.0);
        assert!((app.clock_ms() - 100.0).abs() < f64::EPSILON);
        assert_eq!(app.status_message, "Paused");
    }

    #[test]
    fn long_frames_are_clamped() {
        let mut app = app();
        app.advance(10_000.0);
        assert!((app.clock_ms() - MAX_FRAME_MS).abs() < f64::EPSILON);
    }

    #[test]
    fn demo_then_clear() {
        let mut app = app();
        app.show_demo();
        assert_eq!(app.map.flows().len(), 5);
        assert_eq!(app.status_message, "Demo flows: 5 flows");

        app.clear();
        assert!(app.map.flows().is_empty());
    }

    #[test]
    fn hover_cycles_through_countries() {
        let mut app = app();
        let count = app.map.countries().len();

        app.hover_next();
        let first = app.hovered().map(str::to_string);
        assert!(first.is_some());

        for _ in 0..count {
            app.hover_next();
        }
        assert_eq!(app.hovered().map(str::to_string), first);

        app.hover_prev();
        app.hover_next();
        assert_eq!(app.hovered().map(str::to_string), first);

        app.clear_hover();
        assert_eq!(app.hovered(), None);
    }

    #[tokio::test]
    async fn reload_without_a_file_keeps_flows() {
        let mut app = app();
        app.show_demo();
        assert!(app.reload().await.is_ok());
        assert_eq!(app.map.flows().len(), 5);
        assert_eq!(app.status_message, "No flows file to reload");
    }

    #[tokio::test]
    async fn reload_reads_the_flows_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.json");
        std::fs::write(&path, r#"[{"from": "840", "to": "124", "value": 5000}]"#).unwrap();

        let mut app = app().with_flows_path(Some(path));
        app.reload().await.unwrap();

        assert_eq!(app.map.flows().len(), 1);
        assert!(app.map.is_selected("124"));
    }
}
