//! Error types for codec operations.

use thiserror::Error;

/// Errors surfaced by the hardware encoder and decoder.
///
/// These are the only values a caller observes across the encode/decode
/// boundary; hardware faults never unwind through it.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Invalid or unsupported codec settings. Fatal to the call, not
    /// to the instance.
    #[error("invalid codec parameters: {0}")]
    Parameter(String),

    /// Method called before init or after release.
    #[error("codec not initialized")]
    Uninitialized,

    /// A simulcast layer layout the hardware cannot serve. Distinct
    /// from generic parameter errors so negotiation can react.
    #[error("simulcast configuration not supported: {0}")]
    SimulcastUnsupported(String),

    /// The underlying hardware encode call failed. May be transient
    /// (e.g. session exhaustion).
    #[error("hardware encoder failure: {0}")]
    EncoderFailure(String),

    /// The underlying hardware decode call failed.
    #[error("hardware decoder failure: {0}")]
    DecoderFailure(String),

    /// The hardware produced no usable output this call. A retry
    /// signal, not a fault.
    #[error("no output available")]
    NoOutput,

    /// A GPU buffer operation failed beneath the codec.
    #[error(transparent)]
    Gpu(#[from] framebridge_gpu::GpuError),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
