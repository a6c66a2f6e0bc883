use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use tradeflow::MapOptions;

#[derive(Debug, Parser)]
#[command(name = "tradeflow", version, about = "Animated trade flow map")]
pub struct CliArgs {
    /// JSON file with flow records
    #[arg(long, value_name = "PATH")]
    pub flows: Option<PathBuf>,

    /// JSON geography table to use instead of the built-in world
    #[arg(long, value_name = "PATH")]
    pub geography: Option<PathBuf>,

    /// Start with the demo trade routes
    #[arg(long)]
    pub demo: bool,

    /// Render once and print the SVG instead of opening the terminal view
    #[arg(long)]
    pub headless: bool,

    /// Print a JSON summary of the flows in headless mode
    #[arg(long)]
    pub json: bool,

    /// Write headless output to a file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Marker speed multiplier
    #[arg(long, value_name = "X")]
    pub speed: Option<f64>,

    /// SVG height in pixels
    #[arg(long, value_name = "N")]
    pub height: Option<f64>,

    /// Draw country names
    #[arg(long = "show-labels")]
    pub show_labels: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl CliArgs {
    /// Flags win over `.env` and `TRADEFLOW_*` values.
    pub fn apply_overrides(&self, options: &mut MapOptions) -> tradeflow::Result<()> {
        if let Some(speed) = self.speed {
            options.animation_speed = speed;
        }
        if let Some(height) = self.height {
            options.height = height;
        }
        if self.show_labels {
            options.show_labels = true;
        }
        options.validate()
    }

    pub const fn log_level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}
