// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platemap: menu page overlay engine.
//
// Entry point. Initialises logging, loads the engine config, and dispatches
// to the command handlers.

mod commands;
mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use platemap_core::error::Result;
use platemap_core::human_errors::humanize_error;
use platemap_core::{CornerSet, LetterboxMetrics, PlatemapConfig, Rect};
use serde::Serialize;

use commands::SplitPlan;
use services::data_dir;

#[derive(Parser, Debug)]
#[command(name = "platemap", version, about = "Prepare menu pages for dish overlays")]
struct Cli {
    /// Config file to use instead of `config.json` in the data directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Letterbox a page into the square analysis frame
    Normalize {
        input: PathBuf,
        output: PathBuf,
        /// Also write the letterbox metrics to this file
        #[arg(long)]
        metrics: Option<PathBuf>,
    },
    /// Flatten a photographed page using its four corners
    Rectify {
        input: PathBuf,
        output: PathBuf,
        /// Corner set JSON file on the 0-1000 scale; detected when omitted
        #[arg(long)]
        corners: Option<PathBuf>,
    },
    /// Report box sizes and columns for detected boxes on a page
    Analyze {
        /// JSON array of frame-space boxes `{x, y, w, h}`
        boxes: PathBuf,
        /// Letterbox metrics of the frame the boxes were detected on
        #[arg(long)]
        metrics: PathBuf,
    },
    /// Cut a page into column and strip sections
    Split {
        input: PathBuf,
        out_dir: PathBuf,
        /// Column split points in percent, e.g. `33,66`
        #[arg(long, value_delimiter = ',', conflicts_with = "boxes")]
        columns: Vec<f64>,
        #[arg(long, default_value_t = 1, conflicts_with = "boxes")]
        strips: u32,
        /// Derive the grid from detected boxes instead
        #[arg(long)]
        boxes: Option<PathBuf>,
    },
    /// Print the effective config
    Config {
        /// Write it to the data directory
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            let human = humanize_error(&e);
            if human.should_display() {
                eprintln!("{}\n{}", human.message, human.suggestion);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dir = data_dir::data_dir();
    let config = data_dir::load_config(cli.config.as_deref(), &dir)?;

    match cli.command {
        Command::Normalize {
            input,
            output,
            metrics,
        } => {
            let frame_metrics = commands::normalize(&config, &input, &output)?;
            if let Some(path) = metrics {
                std::fs::write(path, serde_json::to_string_pretty(&frame_metrics)?)?;
            }
            print_json(&frame_metrics)
        }
        Command::Rectify {
            input,
            output,
            corners,
        } => {
            let corners = corners
                .map(|path| commands::read_json::<CornerSet>(&path))
                .transpose()?;
            print_json(&commands::rectify_page(&config, &input, &output, corners).await?)
        }
        Command::Analyze { boxes, metrics } => {
            let boxes: Vec<Rect> = commands::read_json(&boxes)?;
            let metrics: LetterboxMetrics = commands::read_json(&metrics)?;
            print_json(&commands::layout(&config, metrics, &boxes)?)
        }
        Command::Split {
            input,
            out_dir,
            columns,
            strips,
            boxes,
        } => {
            let plan = match boxes {
                Some(path) => SplitPlan::FromBoxes(commands::read_json(&path)?),
                None => SplitPlan::Manual { columns, strips },
            };
            print_json(&commands::split(&config, &input, &out_dir, plan)?)
        }
        Command::Config { init } => {
            if init {
                let path = data_dir::persist_config(&dir, &config)?;
                tracing::info!(path = %path.display(), "Config written");
            }
            print_json::<PlatemapConfig>(&config)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
