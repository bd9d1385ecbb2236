//! Unified error types for the AirSense firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! top-level error handling uniform. All variants are `Copy` so they can
//! be passed through the event loop without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A PM sensor frame failed validation.
    Frame(FrameError),
    /// A moving-average query was malformed.
    Average(AverageError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Average(e) => write!(f, "average: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// PM frame errors
// ---------------------------------------------------------------------------

/// Why a candidate PM sensor frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The two-byte magic header did not match.
    BadMagic,
    /// Fewer bytes were available than a full frame needs.
    ShortRead,
    /// The additive checksum did not match the trailer field.
    ChecksumMismatch { computed: u16, expected: u16 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic => write!(f, "bad magic header"),
            Self::ShortRead => write!(f, "short read"),
            Self::ChecksumMismatch { computed, expected } => {
                write!(f, "bad checksum: {computed:04X} != {expected:04X}")
            }
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Moving-average errors
// ---------------------------------------------------------------------------

/// Errors from ring-buffer average queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AverageError {
    /// More points were requested than the ring buffer can ever hold.
    TooManyPoints,
}

impl fmt::Display for AverageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyPoints => write!(f, "too many points requested"),
        }
    }
}

impl From<AverageError> for Error {
    fn from(e: AverageError) -> Self {
        Self::Average(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
