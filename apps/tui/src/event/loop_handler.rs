use color_eyre::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use serde::Serialize;
use std::io::Stdout;
use std::path::Path;
use std::time::Duration;

use crate::app::{handle_input, App};
use crate::ui;

/// Frame interval for the animation, about 30 frames per second.
const FRAME_MS: u64 = 33;

/// Run the application in headless mode (no UI): print the map once.
pub async fn run_headless(app: &App, json: bool, output: Option<&Path>) -> Result<()> {
    let rendered = if json {
        serde_json::to_string_pretty(&build_report(app))?
    } else {
        app.map.to_svg()
    };

    match output {
        Some(path) => {
            tokio::fs::write(path, rendered).await?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn build_report(app: &App) -> HeadlessReport {
    let flows = app
        .map
        .flows()
        .iter()
        .map(|edge| HeadlessFlow {
            from: edge.from().to_string(),
            to: edge.to().to_string(),
            value: edge.value(),
            width: edge.width(),
            length: edge.curve().length(),
            label: edge.label().map(str::to_string),
        })
        .collect();

    HeadlessReport {
        countries: app.map.countries().len(),
        selected: app.map.selected().iter().cloned().collect(),
        flows,
    }
}

#[derive(Serialize)]
struct HeadlessReport {
    countries: usize,
    selected: Vec<String>,
    flows: Vec<HeadlessFlow>,
}

#[derive(Serialize)]
struct HeadlessFlow {
    from: String,
    to: String,
    value: f64,
    width: f64,
    length: f64,
    label: Option<String>,
}

/// Run the main application event loop
pub async fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Advance the flow animations
        app.update();

        if let Err(e) = terminal.draw(|f| ui::ui(app, f)) {
            return Err(color_eyre::eyre::eyre!("Terminal draw error: {e}"));
        }

        if matches!(event::poll(Duration::from_millis(FRAME_MS)), Ok(true)) {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    handle_input(app, key.code).await;
                    if !app.running {
                        break;
                    }
                }
                Ok(Event::Resize(_, _)) => {
                    // Next iteration redraws at the new size
                }
                Ok(_) | Err(_) => {}
            }
        }
    }
    Ok(())
}
