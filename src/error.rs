//! Error types for the driver
//!
//! This module defines error types for configuration building ([`BuilderError`]),
//! panel operations ([`Error`]) and pixel buffer validation ([`BufferTooSmall`]).
//!
//! ## Error Types
//!
//! - [`BuilderError`] - Errors during configuration construction
//! - [`Error`] - Runtime errors during panel operations
//! - [`InterfaceError`](crate::interface::InterfaceError) - Low-level bus errors
//! - [`TeError`](crate::tearing::TeError) - Tearing signal setup and wait errors
//! - [`FlushError`](crate::flush::FlushError) - Errors surfaced by a flush
//!
//! ## Example
//!
//! ```
//! use co5300::{Builder, BuilderError, Dimensions};
//!
//! // Missing dimensions
//! let result = Builder::new().build();
//! assert!(matches!(result, Err(BuilderError::MissingDimensions)));
//!
//! // Invalid dimensions
//! let result = Dimensions::new(1000, 500); // Too wide
//! assert!(result.is_err());
//! ```

use crate::config::{MAX_COLUMNS, MAX_ROWS};
use crate::interface::PanelInterface;

/// Errors that can occur when interacting with the panel
///
/// Generic over the interface type to preserve the specific bus error type.
pub enum Error<I: PanelInterface> {
    /// Bus or panel transaction failed
    ///
    /// Wraps the underlying error from the [`PanelInterface`] implementation.
    /// Not retried; a flush that hits it abandons its remaining slices.
    Interface(I::Error),
    /// Operation attempted before [`Panel::init`](crate::panel::Panel::init)
    /// or after [`Panel::shutdown`](crate::panel::Panel::shutdown)
    InvalidState,
    /// Region is inverted or falls outside the panel
    InvalidArea {
        /// First column
        x1: u16,
        /// First row
        y1: u16,
        /// Last column (inclusive)
        x2: u16,
        /// Last row (inclusive)
        y2: u16,
    },
    /// Pixel buffer length does not match the region
    BufferSizeMismatch {
        /// Required buffer size in bytes
        required: usize,
        /// Provided buffer size in bytes
        provided: usize,
    },
    /// Active area offset pushes the window past the controller's RAM
    InvalidGap {
        /// Column offset
        x_gap: u16,
        /// Row offset
        y_gap: u16,
    },
}

impl<I: PanelInterface> core::fmt::Debug for Error<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Interface(e) => f.debug_tuple("Interface").field(e).finish(),
            Self::InvalidState => f.write_str("InvalidState"),
            Self::InvalidArea { x1, y1, x2, y2 } => f
                .debug_struct("InvalidArea")
                .field("x1", x1)
                .field("y1", y1)
                .field("x2", x2)
                .field("y2", y2)
                .finish(),
            Self::BufferSizeMismatch { required, provided } => f
                .debug_struct("BufferSizeMismatch")
                .field("required", required)
                .field("provided", provided)
                .finish(),
            Self::InvalidGap { x_gap, y_gap } => f
                .debug_struct("InvalidGap")
                .field("x_gap", x_gap)
                .field("y_gap", y_gap)
                .finish(),
        }
    }
}

impl<I: PanelInterface> core::fmt::Display for Error<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Interface(e) => write!(f, "Interface error: {e:?}"),
            Self::InvalidState => write!(f, "Panel not initialized"),
            Self::InvalidArea { x1, y1, x2, y2 } => {
                write!(f, "Invalid area: ({x1},{y1})..=({x2},{y2})")
            }
            Self::BufferSizeMismatch { required, provided } => {
                write!(
                    f,
                    "Buffer size mismatch: required {required} bytes, provided {provided}"
                )
            }
            Self::InvalidGap { x_gap, y_gap } => {
                write!(f, "Gap ({x_gap},{y_gap}) exceeds {MAX_COLUMNS}x{MAX_ROWS} RAM")
            }
        }
    }
}

impl<I: PanelInterface> core::error::Error for Error<I> {}

/// Pixel buffer shorter than the area it is supposed to cover
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferTooSmall {
    /// Required buffer size in bytes
    pub required: usize,
    /// Provided buffer size in bytes
    pub provided: usize,
}

impl core::fmt::Display for BufferTooSmall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Buffer too small: required {} bytes, provided {}",
            self.required, self.provided
        )
    }
}

impl core::error::Error for BufferTooSmall {}

/// Errors that can occur when building configuration
///
/// These errors occur during the builder pattern before the panel is created.
#[derive(Debug)]
pub enum BuilderError {
    /// Dimensions were not specified
    ///
    /// [`Builder::dimensions()`](crate::config::Builder::dimensions) must be called before building.
    MissingDimensions,
    /// Invalid dimensions provided
    ///
    /// See [`Dimensions::new()`](crate::config::Dimensions::new) for constraints.
    InvalidDimensions {
        /// Width requested
        width: u16,
        /// Height requested
        height: u16,
    },
    /// Flush chunk line count must be at least 1
    InvalidChunkLines,
    /// Bus transfer line count must be at least 1
    InvalidTransferLines,
    /// Gap plus dimensions exceed [`MAX_COLUMNS`] x [`MAX_ROWS`]
    InvalidGap {
        /// Column offset requested
        x_gap: u16,
        /// Row offset requested
        y_gap: u16,
    },
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingDimensions => write!(f, "Dimensions must be specified"),
            Self::InvalidDimensions { width, height } => write!(
                f,
                "Invalid dimensions {width}x{height} (max {MAX_COLUMNS}x{MAX_ROWS})"
            ),
            Self::InvalidChunkLines => write!(f, "Chunk lines must be non-zero"),
            Self::InvalidTransferLines => write!(f, "Max transfer lines must be non-zero"),
            Self::InvalidGap { x_gap, y_gap } => {
                write!(f, "Gap ({x_gap},{y_gap}) exceeds {MAX_COLUMNS}x{MAX_ROWS} RAM")
            }
        }
    }
}

impl core::error::Error for BuilderError {}
