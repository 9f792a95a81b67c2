//! Count rates of neutron detectors during a single pulse: time stamps are
//! binned into rate curves, normalized on demand and overlaid for comparison
//! between detector systems.
pub mod cache;
pub mod compare;
pub mod deadtime;
pub mod error;
pub mod plot;
pub mod rate;
pub mod sources;
pub mod workspace;

pub use error::{Error, Result};
pub use rate::{count_rate, normalize_by_integral, Normalization, RateCurve};
