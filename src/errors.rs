//! Error types for the scatter/gather phases.
//!
//! Errors are stage-specific so diagnostics stay precise: configuration
//! problems, master-file problems, and map-file problems each get their own
//! enum, summed into [`RunError`] at the driver boundary. All enums are
//! `#[non_exhaustive]`; consumers should keep a fallback match arm.
//!
//! Every failure site maps to a distinct nonzero process exit code via
//! [`RunError::exit_code`]:
//!
//! | code | failure |
//! |------|---------|
//! | 10 | batch count below the pipeline minimum of 3 |
//! | 11 | co-filter map allocation failure |
//! | 12 | master file open/map failure |
//! | 13 | master file shorter than the requested span |
//! | 14 | map file create/write failure |
//! | 15 | map file open/map failure |
//! | 16 | map file shorter than header + slots |
//! | 17 | shuffle post-condition violation (not a bijection) |
//! | 18 | invalid parameter combination |
//! | 20–22 | container busy-flag collision in worker 1–3 (aborts in place) |

use std::fmt;
use std::io;

/// Errors from parameter validation and batch planning.
#[derive(Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// Parameter combination violates a rolling-hash or layout precondition.
    InvalidParams { reason: &'static str },
    /// The stream is too short for the three-stage pipeline.
    BatchCountTooSmall { batches: u64 },
    /// The generated byte permutation failed its bijection check.
    ShuffleNotBijective,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParams { reason } => write!(f, "invalid parameters: {reason}"),
            Self::BatchCountTooSmall { batches } => {
                write!(f, "batch count {batches} below the pipeline minimum of 3")
            }
            Self::ShuffleNotBijective => write!(f, "byte shuffle is not a bijection"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from the master (input) file.
#[derive(Debug)]
#[non_exhaustive]
pub enum MasterFileError {
    /// Open or metadata failure.
    Open(io::Error),
    /// Memory-mapping the file failed.
    Mmap(io::Error),
    /// The file does not cover the requested byte span.
    TooSmall { len: u64, need: u64 },
}

impl fmt::Display for MasterFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(err) => write!(f, "can't open master file: {err}"),
            Self::Mmap(err) => write!(f, "can't map master file: {err}"),
            Self::TooSmall { len, need } => {
                write!(f, "master file length {len} below required {need}")
            }
        }
    }
}

impl std::error::Error for MasterFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open(err) | Self::Mmap(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors from the map file and the map allocation.
#[derive(Debug)]
#[non_exhaustive]
pub enum MapFileError {
    /// The slot array could not be allocated.
    Alloc { slots: usize },
    /// Create failure on the output path.
    Create(io::Error),
    /// Write failure while persisting the map.
    Write(io::Error),
    /// Open or metadata failure on the input path.
    Open(io::Error),
    /// Memory-mapping the file failed.
    Mmap(io::Error),
    /// The file is shorter than seed header + slot array.
    TooShort { len: u64, need: u64 },
}

impl fmt::Display for MapFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc { slots } => write!(f, "can't allocate {slots} map slots"),
            Self::Create(err) => write!(f, "can't create map file: {err}"),
            Self::Write(err) => write!(f, "can't write map file: {err}"),
            Self::Open(err) => write!(f, "can't open map file: {err}"),
            Self::Mmap(err) => write!(f, "can't map map file: {err}"),
            Self::TooShort { len, need } => {
                write!(f, "map file length {len} below required {need}")
            }
        }
    }
}

impl std::error::Error for MapFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Create(err) | Self::Write(err) | Self::Open(err) | Self::Mmap(err) => Some(err),
            _ => None,
        }
    }
}

/// Top-level error for a scatter or gather run.
#[derive(Debug)]
#[non_exhaustive]
pub enum RunError {
    Config(ConfigError),
    Master(MasterFileError),
    Map(MapFileError),
}

impl RunError {
    /// Distinct process exit code per failure site.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(ConfigError::BatchCountTooSmall { .. }) => 10,
            Self::Map(MapFileError::Alloc { .. }) => 11,
            Self::Master(MasterFileError::Open(_) | MasterFileError::Mmap(_)) => 12,
            Self::Master(MasterFileError::TooSmall { .. }) => 13,
            Self::Map(MapFileError::Create(_) | MapFileError::Write(_)) => 14,
            Self::Map(MapFileError::Open(_) | MapFileError::Mmap(_)) => 15,
            Self::Map(MapFileError::TooShort { .. }) => 16,
            Self::Config(ConfigError::ShuffleNotBijective) => 17,
            Self::Config(ConfigError::InvalidParams { .. }) => 18,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Master(err) => write!(f, "{err}"),
            Self::Map(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Master(err) => Some(err),
            Self::Map(err) => Some(err),
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<MasterFileError> for RunError {
    fn from(err: MasterFileError) -> Self {
        Self::Master(err)
    }
}

impl From<MapFileError> for RunError {
    fn from(err: MapFileError) -> Self {
        Self::Map(err)
    }
}
