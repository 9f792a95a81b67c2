//! # Sources
//! Access to detector time stamps and reference rates of a pulse.
//!
//! Data is laid out per pulse:
//! ```text
//! {root}/{pulse}/{system}/{detector}.json   time stamps, ns
//! {root}/{pulse}/{system}/offsets.json      {detector: offset ns}
//! {root}/{pulse}/kn1.json                   {"time": [..], "rate": [..]}
//! ```
use std::{collections::BTreeMap, path::{Path, PathBuf}};

use async_trait::async_trait;
use cached::IOCachedAsync;
use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;

use crate::{cache::CacacheBackend, rate::RateCurve};

/// Time stamp system of a detector array (TOFu, TOFOR).
#[async_trait]
pub trait EventSource: Send + Sync {
    fn name(&self) -> &str;

    /// Event times of `detector` during `pulse`, ns.
    async fn times(&self, pulse: u32, detector: &str) -> Result<Vec<i64>>;

    /// Clock offset of `detector` during `pulse`, ns.
    async fn offset(&self, pulse: u32, detector: &str) -> Result<i64>;
}

/// Instrument that already provides a rate (fission chambers).
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn reference_rate(&self, pulse: u32) -> Result<RateCurve>;
}

/// Event times corrected for the clock offset, in seconds.
/// An unavailable offset counts as 0.
pub async fn aligned_times<S>(source: &S, pulse: u32, detector: &str) -> Result<Vec<f64>>
where
    S: EventSource + ?Sized,
{
    let times = source.times(pulse, detector).await?;

    let offset = match source.offset(pulse, detector).await {
        Ok(offset) => offset,
        Err(err) => {
            log::warn!("{} {detector}: no offset for pulse {pulse} ({err}), using 0", source.name());
            0
        }
    };

    Ok(times.into_iter().map(|t| (t - offset) as f64 / 1e9).collect())
}

/// Nanosecond time stamps in seconds.
pub fn to_seconds(times: &[i64]) -> Vec<f64> {
    times.iter().map(|&t| t as f64 / 1e9).collect()
}

#[derive(Deserialize)]
struct ReferenceFile {
    time: Vec<f64>,
    rate: Vec<f64>,
}

/// Pulse data stored as json files in a directory tree.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    system: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, system: &str) -> Self {
        Self { root: root.into(), system: system.to_owned() }
    }

    fn pulse_dir(&self, pulse: u32) -> PathBuf {
        self.root.join(pulse.to_string())
    }

    fn system_dir(&self, pulse: u32) -> PathBuf {
        self.pulse_dir(pulse).join(&self.system)
    }

    /// Detectors of `pulse` whose names start with `prefix`, in natural order
    /// (`S2_2` before `S2_10`).
    pub fn detectors(&self, pulse: u32, prefix: &str) -> Result<Vec<String>> {
        let dir = self.system_dir(pulse);
        let pattern = format!("{}/{prefix}*.json", glob::Pattern::escape(&dir.to_string_lossy()));

        let mut detectors = glob::glob(&pattern)?
            .filter_map(|path| path.ok())
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_owned))
            .filter(|name| name != "offsets")
            .collect::<Vec<_>>();
        detectors.sort_by(|a, b| natord::compare(a, b));

        Ok(detectors)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(filepath: &Path) -> Result<T> {
    let bytes = tokio::fs::read(filepath)
        .await
        .wrap_err_with(|| format!("can't read {filepath:?}"))?;
    serde_json::from_slice(&bytes).wrap_err_with(|| format!("can't parse {filepath:?}"))
}

#[async_trait]
impl EventSource for DirectorySource {
    fn name(&self) -> &str {
        &self.system
    }

    async fn times(&self, pulse: u32, detector: &str) -> Result<Vec<i64>> {
        read_json(&self.system_dir(pulse).join(format!("{detector}.json"))).await
    }

    async fn offset(&self, pulse: u32, detector: &str) -> Result<i64> {
        let offsets: BTreeMap<String, i64> =
            read_json(&self.system_dir(pulse).join("offsets.json")).await?;
        offsets
            .get(detector)
            .copied()
            .ok_or_else(|| eyre!("no offset for {detector}"))
    }
}

#[async_trait]
impl ReferenceSource for DirectorySource {
    async fn reference_rate(&self, pulse: u32) -> Result<RateCurve> {
        let ReferenceFile { time, rate } = read_json(&self.pulse_dir(pulse).join("kn1.json")).await?;
        Ok(RateCurve::new(time, rate)?)
    }
}

/// Keeps fetched time stamps of `S` on disk.
pub struct CachedSource<S> {
    inner: S,
    cache: CacacheBackend<String, Vec<i64>>,
}

impl<S: EventSource> CachedSource<S> {
    pub fn new(inner: S, cache_root: impl Into<PathBuf>) -> Self {
        Self { inner, cache: CacacheBackend::new(cache_root) }
    }

    /// Ignore (and overwrite) previously cached entries.
    pub fn refreshing(mut self, refresh: bool) -> Self {
        self.cache.cache_set_refresh(refresh);
        self
    }

    fn key(&self, pulse: u32, detector: &str) -> String {
        format!("{}/{pulse}/{detector}", self.inner.name())
    }
}

#[async_trait]
impl<S: EventSource> EventSource for CachedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn times(&self, pulse: u32, detector: &str) -> Result<Vec<i64>> {
        let key = self.key(pulse, detector);

        if !self.cache.refresh() {
            if let Some(times) = self.cache.cache_get(&key).await? {
                return Ok(times);
            }
        }

        let times = self.inner.times(pulse, detector).await?;
        self.cache.cache_set(key, times.clone()).await?;
        Ok(times)
    }

    async fn offset(&self, pulse: u32, detector: &str) -> Result<i64> {
        self.inner.offset(pulse, detector).await
    }
}
