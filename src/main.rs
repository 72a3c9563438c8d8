//! hackable-host
//!
//! Runs a libretro core headless for a number of frames, then lists the
//! core's memory regions and optionally searches them.

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use hh_core::Config;
use hh_integration::Session;
use hh_memory::{Encoding, Operator, Width};
use std::path::PathBuf;

/// Addresses printed per region before the list is cut short
const MAX_LISTED_MATCHES: usize = 32;

#[derive(Debug, Parser)]
#[command(name = "hackable-host", version, about)]
struct Cli {
    /// libretro core library, defaults to the last core in the config
    #[arg(long)]
    core: Option<PathBuf>,

    /// Content to load; omit for cores that run without content
    #[arg(long)]
    content: Option<PathBuf>,

    /// Number of frames to run before inspecting memory
    #[arg(long)]
    frames: Option<u32>,

    /// Search memory for values matching OP VALUE, e.g. `--search == 0x42`
    #[arg(long, num_args = 2, value_names = ["OP", "VALUE"], allow_hyphen_values = true)]
    search: Option<Vec<String>>,

    /// Value width in bytes (1 to 4)
    #[arg(long, default_value_t = 1)]
    width: usize,

    /// Value encoding: le, be, bcd-le or bcd-be
    #[arg(long, default_value = "le")]
    encoding: Encoding,

    /// Configuration file to use instead of the default one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Don't open an audio device
    #[arg(long)]
    no_audio: bool,
}

fn parse_value(text: &str) -> anyhow::Result<u32> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    value.with_context(|| format!("invalid search value \"{}\"", text))
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Using default configuration: {}", e);
            Config::default()
        }),
    };

    if cli.no_audio {
        config.audio.enable = false;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    hh_core::logging::init(&config);

    // Validate the search before spending time running the core
    let search = match &cli.search {
        Some(args) => {
            let [op, value] = args.as_slice() else {
                bail!("--search takes an operator and a value");
            };
            let op: Operator = op.parse().map_err(|e: String| anyhow!(e))?;
            let width =
                Width::try_from(cli.width).map_err(|w| anyhow!("invalid width {}, expected 1 to 4", w))?;
            Some((op, parse_value(value)?, width))
        }
        None => None,
    };

    let core = cli
        .core
        .clone()
        .or_else(|| config.general.last_core.clone())
        .context("no core given and none configured")?;
    let frames = cli.frames.unwrap_or(config.general.default_frames);

    tracing::info!("Starting hackable-host");

    let mut session = Session::new(&config);
    session
        .open(&core, cli.content.as_deref())
        .with_context(|| format!("starting {}", core.display()))?;

    let ran = session.run_frames(frames)?;
    tracing::info!("Ran {} frames", ran);

    let regions = session.regions();
    if regions.is_empty() {
        println!("No memory regions exposed by the core");
    }
    for region in &regions {
        println!(
            "{:<10} 0x{:06X} {:>8} bytes",
            region.name(),
            region.base(),
            region.len()
        );
    }
    drop(regions);

    if let Some((op, value, width)) = search {
        for result in session.search(width, cli.encoding, op, value) {
            println!(
                "{}: {} matches for {} {}",
                result.region,
                result.matches.len(),
                op,
                value
            );

            let listed: Vec<String> = result
                .matches
                .iter()
                .take(MAX_LISTED_MATCHES)
                .map(|address| format!("0x{:06X}", address))
                .collect();
            if !listed.is_empty() {
                println!("  {}", listed.join(" "));
            }
            if result.matches.len() > MAX_LISTED_MATCHES {
                println!("  ...");
            }
        }
    }

    session.close();
    Ok(())
}
