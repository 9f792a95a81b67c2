//! # compare-count-rates
//! Overlay of the count rates measured by TOFu and the original DAQ (TOFOR)
//! for each detector, with the fission chamber rate on a second axis.
//! One html plot per detector and a tsv table of all curves are written to
//! `{output_dir}/{pulse}/`.
use std::{fmt::Write as _, path::PathBuf};

use clap::Parser;
use eyre::{Result, WrapErr};
use indicatif::ProgressStyle;

use count_rates::{
    compare::detector_rates,
    plot,
    rate::RateCurve,
    sources::{aligned_times, to_seconds, CachedSource, DirectorySource, EventSource, ReferenceSource},
    workspace::Workspace,
};

#[cfg(target_family = "unix")]
use tikv_jemallocator::Jemalloc;
#[cfg(target_family = "unix")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Detectors shown when neither `--all` nor `--detector` is given.
const DEFAULT_DETECTORS: [&str; 2] = ["S1_01", "S2_01"];

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Arg {
    /// Path to the config file in yaml format
    pub config_file: PathBuf,
    /// Pulse number
    #[arg(long)]
    pub pulse: u32,
    /// Compare every detector of the pulse
    #[arg(long, conflicts_with = "detector")]
    pub all: bool,
    /// Detectors to compare (S1_01 and S2_01 if omitted)
    #[arg(long, short)]
    pub detector: Vec<String>,
    /// Fetch time stamps again instead of reading them from the cache
    #[arg(long)]
    pub refresh: bool,
    /// Open the plots in a browser
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
    let kn1 = DirectorySource::new(&workspace.data_root, "kn1");

    let detectors = if args.all {
        tofu_dir.detectors(pulse, "")?
    } else if args.detector.is_empty() {
        DEFAULT_DETECTORS.iter().map(|d| d.to_string()).collect()
    } else {
        args.detector.clone()
    };
    log::info!("pulse {pulse}: {} detectors", detectors.len());

    let reference = kn1
        .reference_rate(pulse)
        .await
        .wrap_err_with(|| format!("can't load fission chamber rate for {pulse}"))?
        .shifted(workspace.time_origin);

    let out_dir = workspace.output_dir.join(pulse.to_string());
    let mut table = "detector\tsystem\tt\trate\n".to_string();

    let pb = if args.all {
        let pb = indicatif::ProgressBar::new(detectors.len() as u64);
        pb.set_style(ProgressStyle::with_template("[{elapsed_precise}] {bar} {pos:>7}/{len:7} {msg}")?);
        pb
    } else {
        indicatif::ProgressBar::hidden()
    };

    // the table keeps the detectors done so far even if one of them fails
    let outcome = async {
        for detector in &detectors {
            pb.set_message(detector.clone());

            let tofu_times = aligned_times(&tofu, pulse, detector).await?;
            let tofor_times = to_seconds(&tofor.times(pulse, detector).await?);

            let rates = pb.suspend(|| detector_rates(&workspace, detector, &tofu_times, &tofor_times))?;
            if let Some(ratio) = rates.ratio {
                pb.suspend(|| log::info!("TOFu/TOFOR {detector}: {ratio:.2}"));
            }

            append_rows(&mut table, detector, "tofu", &rates.tofu);
            append_rows(&mut table, detector, "tofor", &rates.tofor);

            let figure = plot::rate_overlay(
                &format!("JPN {pulse} {detector}"),
                &[("TOFu", &rates.tofu), ("Original DAQ", &rates.tofor)],
                Some(("Fission chambers", &reference)),
            );
            plot::save(&figure, &out_dir.join(format!("{detector}.html")))?;
            if args.show {
                figure.show();
            }

            pb.inc(1);
        }
        Ok::<_, eyre::Report>(())
    }
    .await;
    pb.finish_and_clear();

    let table_path = out_dir.join("count-rates.tsv");
    std::fs::create_dir_all(&out_dir)?;
    std::fs::write(&table_path, table).wrap_err_with(|| format!("can't write {table_path:?}"))?;
    log::info!("results written to {out_dir:?}");

    outcome
}

fn append_rows(table: &mut String, detector: &str, system: &str, curve: &RateCurve) {
    curve.centres.iter().zip(&curve.rate).for_each(|(t, rate)| {
        // writing into a String never fails
        let _ = writeln!(table, "{detector}\t{system}\t{t}\t{rate}");
    });
}
