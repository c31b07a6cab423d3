//! infiniscroll - Entry Point
//!
//! Runs the engine against a simulated feed and browser and prints a trace of
//! engine state after every step.

use clap::{Parser, ValueEnum};
use infiniscroll::config::{
    apply_cli_overrides, apply_env_overrides, load_config_with_precedence, merge_config,
    CliOverrides,
};
use infiniscroll::engine::{EngineSnapshot, Viewport};
use infiniscroll::integration::PumpReport;
use infiniscroll::model::{AppError, UrlParams};
use infiniscroll::sim::{feed, Simulation};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// Trace output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One JSON object per line.
    Json,
    /// Render summaries.
    Text,
}

/// infiniscroll - simulate a virtualized infinite-scroll list
#[derive(Parser, Debug)]
#[command(name = "infiniscroll")]
#[command(version)]
#[command(about = "Drive the scroll engine through a simulated session and trace it")]
pub struct Args {
    /// Number of items on the simulated backend
    #[arg(long, default_value = "200")]
    pub items: u64,

    /// Seed for item body lengths
    #[arg(long, default_value = "7")]
    pub seed: u64,

    /// Rows kept rendered at once
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub page_size: Option<u64>,

    /// Column count when no media query matches
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_items_per_row: Option<u64>,

    /// Viewport width in pixels
    #[arg(long, default_value = "400")]
    pub width: i64,

    /// Viewport height in pixels
    #[arg(long, default_value = "600")]
    pub height: i64,

    /// Offset of the list container from the document top
    #[arg(long, default_value = "0")]
    pub container_top: i64,

    /// Pixels per scroll step
    #[arg(long, default_value = "250", value_parser = clap::value_parser!(i64).range(1..))]
    pub step: i64,

    /// Resize to this width once the bottom is reached
    #[arg(long)]
    pub resize_width: Option<i64>,

    /// Items published while the list is open
    #[arg(long, default_value = "5")]
    pub new_items: u64,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: Format,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            page_size: self.page_size.map(|v| v as usize),
            max_items_per_row: self.max_items_per_row.map(|v| v as usize),
            log_file_path: self.log_file.clone(),
        }
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height).with_container_top(self.container_top)
    }
}

/// One line of the trace.
#[derive(Debug, Serialize)]
struct Frame<'a> {
    step: usize,
    action: &'a str,
    scroll_y: i64,
    max_scroll: i64,
    elements_created: usize,
    engine: EngineSnapshot,
    report: PumpReport,
    url: Option<UrlParams>,
}

struct Tracer<W: Write> {
    out: W,
    format: Format,
    step: usize,
}

impl<W: Write> Tracer<W> {
    fn frame(&mut self, sim: &Simulation, action: &str, report: PumpReport) -> Result<(), AppError> {
        self.step += 1;
        match self.format {
            Format::Json => {
                let frame = Frame {
                    step: self.step,
                    action,
                    scroll_y: sim.scroll_y(),
                    max_scroll: sim.max_scroll(),
                    elements_created: sim.host.elements_created(),
                    engine: sim.snapshot(),
                    report,
                    url: sim.host.url().cloned(),
                };
                serde_json::to_writer(&mut self.out, &frame)?;
                writeln!(self.out)?;
            }
            Format::Text => {
                writeln!(
                    self.out,
                    "== {} {} scroll_y={} max_scroll={}",
                    self.step,
                    action,
                    sim.scroll_y(),
                    sim.max_scroll()
                )?;
                write!(self.out, "{}", sim.engine.render().summary())?;
            }
        }
        Ok(())
    }
}

/// Scroll by `step` until the position stops changing.
fn sweep<W: Write>(
    sim: &mut Simulation,
    tracer: &mut Tracer<W>,
    step: i64,
    action: &str,
    limit: usize,
) -> Result<(), AppError> {
    for _ in 0..limit {
        let before = sim.scroll_y();
        let report = sim.scroll_by(step)?;
        let moved = sim.scroll_y() != before;
        tracer.frame(sim, action, report)?;
        if !moved {
            break;
        }
    }
    Ok(())
}

/// Run a full session: load, scroll to the end, refresh, resize, scroll back.
fn run<W: Write>(args: &Args, sim: &mut Simulation, out: W) -> Result<usize, AppError> {
    let mut tracer = Tracer {
        out,
        format: args.format,
        step: 0,
    };
    // Enough steps to cross every item even if they were all short
    let limit = (args.items as usize + args.new_items as usize) * 200 / args.step as usize + 8;

    let report = sim.mount()?;
    tracer.frame(sim, "mount", report)?;

    sweep(sim, &mut tracer, args.step, "scroll_down", limit)?;

    if args.new_items > 0 {
        sim.publish(feed(0..args.new_items, args.seed.wrapping_add(1)));
        sim.engine.refresh();
        let report = sim.settle()?;
        tracer.frame(sim, "refresh", report)?;
    }

    if let Some(width) = args.resize_width {
        let viewport = Viewport {
            width,
            ..sim.host.viewport()
        };
        let report = sim.resize(viewport)?;
        tracer.frame(sim, "resize", report)?;
    }

    sweep(sim, &mut tracer, -args.step, "scroll_up", limit)?;

    tracer.out.flush()?;
    Ok(tracer.step)
}

fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Load configuration with full precedence chain:
    // Defaults → Config File → Env Vars → CLI Args
    let config = {
        let config_file = load_config_with_precedence(args.config.clone())?;
        let merged = merge_config(config_file);
        let with_env = apply_env_overrides(merged);
        apply_cli_overrides(with_env, args.overrides())
    };

    infiniscroll::logging::init(&config.log_file_path)?;

    info!(
        config = ?config,
        "Configuration loaded and resolved"
    );

    let engine_config = config.to_engine_config()?;
    let items = feed(args.new_items..args.new_items + args.items, args.seed);
    let mut sim = Simulation::new(engine_config, args.viewport(), items);

    let stdout = std::io::stdout();
    let frames = run(&args, &mut sim, BufWriter::new(stdout.lock()))?;
    info!(frames, "Simulation finished");

    Ok(())
}
