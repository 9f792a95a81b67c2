//! # dead-time
//! Histogram of the time between consecutive events for all detectors of a
//! group, TOFu against the original DAQ. The gap at small deltas is the
//! dead time of each system.
use std::path::PathBuf;

use clap::Parser;
use eyre::Result;

use count_rates::{
    deadtime::delta_histogram,
    plot,
    sources::{CachedSource, DirectorySource, EventSource},
    workspace::Workspace,
};

#[cfg(target_family = "unix")]
use tikv_jemallocator::Jemalloc;
#[cfg(target_family = "unix")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Arg {
    /// Path to the config file in yaml format
    pub config_file: PathBuf,
    /// Pulse number
    #[arg(long)]
    pub pulse: u32,
    /// Detector name prefix (S1, S2)
    #[arg(long, default_value = "S1")]
    pub group: String,
    /// Fetch time stamps again instead of reading them from the cache
    #[arg(long)]
    pub refresh: bool,
    /// Open the plot in a browser
    #[arg(long)]
    pub show: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Arg::parse();
    let workspace = Workspace::load(&args.config_file)?;
    let pulse = args.pulse;

    let tofu_dir = DirectorySource::new(&workspace.data_root, "tofu");
    let tofu = CachedSource::new(tofu_dir.clone(), &workspace.cache_root).refreshing(args.refresh);
    let tofor = CachedSource::new(DirectorySource::new(&workspace.data_root, "tofor"), &workspace.cache_root)
        .refreshing(args.refresh);

    let detectors = tofu_dir.detectors(pulse, &args.group)?;
    log::info!("pulse {pulse}: {} detectors in {}", detectors.len(), args.group);

    let mut tofu_streams = vec![];
    let mut tofor_streams = vec![];
    for detector in &detectors {
        tofu_streams.push(tofu.times(pulse, detector).await?);
        tofor_streams.push(tofor.times(pulse, detector).await?);
    }

    let delta = workspace.delta;
    let tofu_hist = delta_histogram(&tofu_streams, delta.width, delta.max)?;
    let tofor_hist = delta_histogram(&tofor_streams, delta.width, delta.max)?;

    println!("delta\ttofu\ttofor");
    for (idx, x) in tofu_hist.centres.iter().enumerate() {
        println!("{x}\t{}\t{}", tofu_hist.counts[idx], tofor_hist.counts[idx]);
    }

    let figure = plot::delta_overlay(
        &format!("JPN {pulse} {}", args.group),
        &[("TOFu", &tofu_hist), ("Original DAQ", &tofor_hist)],
    );
    let filepath = workspace
        .output_dir
        .join(pulse.to_string())
        .join(format!("dead-time-{}.html", args.group));
    plot::save(&figure, &filepath)?;
    log::info!("plot written to {filepath:?}");

    if args.show {
        figure.show();
    }

    Ok(())
}
