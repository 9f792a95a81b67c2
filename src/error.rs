/// Errors of the numerical core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("length mismatch: {centres} centres, {rate} rate values")]
    LengthMismatch { centres: usize, rate: usize },
    #[error("rate curve integral is {0}, cannot normalize")]
    ZeroIntegral(f64),
    #[error("rate curve peak is {0}, cannot normalize")]
    ZeroPeak(f64),
}

pub type Result<T> = std::result::Result<T, Error>;
