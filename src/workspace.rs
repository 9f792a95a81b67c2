// Defaults shared by the binaries. Every value can be overridden from the
// yaml config passed on the command line.

use std::{collections::BTreeMap, path::{Path, PathBuf}};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::rate::Normalization;

pub fn get_data_root() -> PathBuf {
    PathBuf::from("data")
}

pub fn get_cache_root() -> PathBuf {
    get_data_root().join("cache")
}

pub fn get_output_dir() -> PathBuf {
    PathBuf::from("produced")
}

/// Start of the pulse in JET time, plots are drawn relative to it.
pub fn get_time_origin() -> f64 {
    40.0
}

/// Time range (s) in which count rates are computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Default for Window {
    fn default() -> Self {
        Window { start: 40.0, end: 80.0 }
    }
}

fn default_comparison() -> Window {
    Window { start: 48.0, end: 53.0 }
}

/// Bin widths (s) by detector name prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widths {
    #[serde(default)]
    pub prefixes: BTreeMap<String, f64>,
    pub default: f64,
}

impl Default for Widths {
    fn default() -> Self {
        Widths {
            prefixes: BTreeMap::from([("S1".to_owned(), 0.006)]),
            default: 0.1,
        }
    }
}

impl Widths {
    /// Width of the longest matching prefix, or the default one.
    pub fn for_detector(&self, detector: &str) -> f64 {
        self.prefixes
            .iter()
            .filter(|(prefix, _)| detector.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, width)| *width)
            .unwrap_or(self.default)
    }
}

/// Inter-arrival histogram parameters (ns).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaParams {
    pub width: f64,
    pub max: f64,
}

impl Default for DeltaParams {
    fn default() -> Self {
        DeltaParams { width: 2.0, max: 260.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    pub data_root: PathBuf,
    pub cache_root: PathBuf,
    pub output_dir: PathBuf,
    pub window: Window,
    pub time_origin: f64,
    pub widths: Widths,
    pub normalization: Normalization,
    pub comparison: Window,
    pub delta: DeltaParams,
}

impl Default for Workspace {
    fn default() -> Self {
        Workspace {
            data_root: get_data_root(),
            cache_root: get_cache_root(),
            output_dir: get_output_dir(),
            window: Window::default(),
            time_origin: get_time_origin(),
            widths: Widths::default(),
            normalization: Normalization::default(),
            comparison: default_comparison(),
            delta: DeltaParams::default(),
        }
    }
}

impl Workspace {
    pub fn load(filepath: &Path) -> Result<Self> {
        let file = std::fs::File::open(filepath)
            .wrap_err_with(|| format!("can't open config {filepath:?}"))?;
        serde_yaml::from_reader(file).wrap_err_with(|| format!("can't parse config {filepath:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_widths() {
        let widths = Widths::default();
        assert_eq!(widths.for_detector("S1_01"), 0.006);
        assert_eq!(widths.for_detector("S2_17"), 0.1);

        let widths = Widths {
            prefixes: BTreeMap::from([("S1".to_owned(), 0.006), ("S1_05".to_owned(), 0.01)]),
            default: 0.2,
        };
        assert_eq!(widths.for_detector("S1_05"), 0.01);
        assert_eq!(widths.for_detector("S1_04"), 0.006);
        assert_eq!(widths.for_detector("KN1"), 0.2);
    }

    #[test]
    fn partial_config() {
        let workspace: Workspace = serde_yaml::from_str(
            "data_root: /data/jet\nnormalization:\n  kind: integral\nwindow:\n  start: 45.0\n  end: 60.0\n",
        )
        .unwrap();

        assert_eq!(workspace.data_root, PathBuf::from("/data/jet"));
        assert_eq!(workspace.normalization, Normalization::Integral);
        assert_eq!(workspace.window, Window { start: 45.0, end: 60.0 });
        assert_eq!(workspace.cache_root, get_cache_root());
        assert_eq!(workspace.comparison, Window { start: 48.0, end: 53.0 });
        assert_eq!(workspace.widths, Widths::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "time_origin: 0.0\ndelta:\n  width: 4.0\n  max: 100.0\n").unwrap();

        let workspace = Workspace::load(&path).unwrap();
        assert_eq!(workspace.time_origin, 0.0);
        assert_eq!(workspace.delta, DeltaParams { width: 4.0, max: 100.0 });

        assert!(Workspace::load(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("workspace.yaml");
        assert_eq!(Workspace::load(&path).unwrap(), Workspace::default());
    }
}
