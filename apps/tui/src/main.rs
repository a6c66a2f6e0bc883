mod app;
mod cli;
mod event;
mod logger;
mod terminal;
mod ui;

use app::actions::{read_geography, read_records};
use app::App;
use clap::Parser;
use cli::CliArgs;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tradeflow::{FlowMap, MapOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    color_eyre::install()?;

    let args = CliArgs::parse();
    let headless = args.headless || args.json || args.output.is_some() || !is_terminal();

    let console = if headless {
        logger::init_headless(args.log_level());
        None
    } else {
        Some(logger::init(args.log_level()).map_err(|e| eyre!("Failed to install logger: {e}"))?)
    };

    // Defaults, then .env / TRADEFLOW_* variables, then flags
    let mut options = MapOptions::from_env()?;
    args.apply_overrides(&mut options)?;

    let mut map = FlowMap::new(options);
    if let Some(path) = &args.geography {
        let geography = read_geography(path).await?;
        map.initialize_with(&geography)?;
    } else {
        map.initialize()?;
    }

    if let Some(path) = &args.flows {
        let records = read_records(path).await?;
        let summary = map.update_data(&records)?;
        log::info!(
            "Loaded {} flows from {} ({} skipped)",
            summary.added,
            path.display(),
            summary.skipped
        );
    } else if args.demo {
        map.add_demo_flows()?;
    }

    let mut app = App::new(map).with_flows_path(args.flows.clone());
    if let Some(console) = console {
        app = app.with_console(console);
    }

    if headless {
        return event::run_headless(&app, args.json, args.output.as_deref()).await;
    }

    let mut terminal = terminal::setup()?;

    let result = event::run(&mut terminal, &mut app).await;

    // Restore terminal
    terminal::cleanup(true, true);

    result
}

// Check if we're running in a terminal
fn is_terminal() -> bool {
    atty::is(atty::Stream::Stdout)
}
