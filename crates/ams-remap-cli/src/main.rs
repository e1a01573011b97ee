//! ams-remap CLI - share AMS slots between slicer colors
//!
//! Reads a sliced Bambu job, plans the manual filament changes for the
//! requested slot shares and writes a copy of the job with pauses inserted.

use std::fs;
use std::path::{Path, PathBuf};

use ams_remap::{plan_pauses, ColorGroups, PlanOutcome, RemapConfig, Report, ShareGroup};
use ams_remap_bambu::{paused_output_path, PlateJob};
use ams_remap_gcode::{insert_pauses, GcodeFlavor, TimelineExtractor};
use anyhow::{Context, Result};
use clap::Parser;

/// Report file name used when `--report` is not given.
const DEFAULT_REPORT: &str = "filament_changes.txt";

#[derive(Parser, Debug)]
#[command(name = "ams-remap")]
#[command(about = "Print more colors than AMS slots by pausing for manual filament swaps", long_about = None)]
struct Cli {
    /// Sliced job (.gcode.3mf)
    input: PathBuf,

    /// Slot shares as guest:host, 1-based (e.g. 5:2 7:3). Longer lists such
    /// as 5:6:2 put every color before the last into the last color's slot.
    #[arg(value_parser = parse_share_group)]
    shares: Vec<ShareGroup>,

    /// Plate number (default: first plate in the job)
    #[arg(short, long)]
    plate: Option<u32>,

    /// Number of AMS slots (overrides the config file)
    #[arg(short, long)]
    slots: Option<u32>,

    /// TOML file with shares and settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Firmware flavor of the pause command
    #[arg(short, long, default_value = "bambu")]
    flavor: GcodeFlavor,

    /// Also reject same-slot colors printed back to back across a layer change
    #[arg(long)]
    strict: bool,

    /// Output job (default: <name>_with_pauses.gcode.3mf next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report file (default: filament_changes.txt next to the input)
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Write the report as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Merge the config file, if any, with the command line.
    fn settings(&self) -> Result<RemapConfig> {
        let mut config = match &self.config {
            Some(path) => RemapConfig::load(path)?,
            None => RemapConfig::default(),
        };
        config
            .share
            .extend(self.shares.iter().flat_map(|g| g.shares().iter().copied()));
        if let Some(slots) = self.slots {
            config.slots = slots;
        }
        config.strict |= self.strict;
        Ok(config)
    }

    fn report_path(&self) -> PathBuf {
        self.report
            .clone()
            .unwrap_or_else(|| sibling(&self.input, DEFAULT_REPORT))
    }

    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| paused_output_path(&self.input))
    }
}

fn parse_share_group(s: &str) -> std::result::Result<ShareGroup, String> {
    s.parse().map_err(|e: ams_remap::ConfigurationError| e.to_string())
}

fn sibling(path: &Path, name: &str) -> PathBuf {
    path.parent()
        .map(|dir| dir.join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

fn log_level(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .with_target(false)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let settings = cli.settings()?;
    let job = PlateJob::open(&cli.input, cli.plate)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let extracted = TimelineExtractor::new()?.extract(&job.gcode.lines[..])?;
    let timeline = &extracted.timeline;
    let color_count = match job.metadata.color_count() {
        0 => timeline.max_color().map_or(0, |c| c.0),
        n => n,
    };
    tracing::info!(
        "Plate {}: {} colors, {} color requests, {} filament changes",
        job.plate,
        color_count,
        timeline.len(),
        timeline.filament_changes()
    );

    let groups = settings.resolve(color_count)?;
    log_groups(&groups, &job);

    let outcome = plan_pauses(timeline, &groups, settings.policy())?;
    write_report(outcome.report(), &cli.report_path(), cli.json)?;
    println!("{}", outcome.report().initial_load_line());
    for line in outcome.report().transcript() {
        println!("{}", line);
    }

    match outcome {
        PlanOutcome::Success { plan, report } => {
            let paused = insert_pauses(&job.gcode, &extracted, &plan, cli.flavor)?;
            let output = cli.output_path();
            job.write_with_gcode(&output, &paused)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!();
            println!("Filament change times: {}", report.filament_changes);
            println!("Manual filament change times: {}", report.manual_changes);
            println!("Wrote {}", output.display());
            Ok(())
        }
        PlanOutcome::Infeasible { report } => {
            eprintln!(
                "The print order has to be changed in the slicer, so that the following colors are not printed after each other:"
            );
            for range in &report.conflicts {
                eprintln!("{}", range);
            }
            anyhow::bail!(
                "{} conflicting layer range(s), job not written",
                report.conflicts.len()
            )
        }
    }
}

fn log_groups(groups: &ColorGroups, job: &PlateJob) {
    for group in groups.groups().iter().filter(|g| !g.guests.is_empty()) {
        let colors: Vec<String> = group
            .anchor
            .into_iter()
            .chain(group.guests.iter().copied())
            .map(|c| match job.metadata.hex_color(c.tool()) {
                Some(hex) => format!("{} ({})", c, hex),
                None => c.to_string(),
            })
            .collect();
        tracing::info!("Slot {}: {}", group.slot, colors.join(", "));
    }
}

fn write_report(report: &Report, path: &Path, json: bool) -> Result<()> {
    let contents = if json {
        report.to_json()?
    } else {
        report.to_string()
    };
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote report to {}", path.display());
    Ok(())
}
