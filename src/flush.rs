//! Chunked flush engine
//!
//! Adapts dirty rectangles of any height to a bounded number of rows per
//! transfer. Each slice is byte-swapped in place (when enabled) and handed
//! to a [`FlushTarget`] in top-to-bottom order. The renderer is told the
//! buffer is free exactly once per flush, whether or not every slice made
//! it to the panel.
//!
//! ## Example
//!
//! ```
//! use co5300::flush::Area;
//!
//! let area = Area::new(0, 0, 409, 89);
//! let rows: Vec<(u16, u16)> = area.slices(30).map(|s| (s.area.y1, s.area.y2)).collect();
//! assert_eq!(rows, [(0, 29), (30, 59), (60, 89)]);
//! ```

use core::ops::Range;

use crate::config::{BYTES_PER_PIXEL, FlushConfig};
use crate::error::BufferTooSmall;
use crate::target::FlushTarget;

/// Inclusive pixel rectangle `[x1, x2] x [y1, y2]`
///
/// A rectangle with `x2 < x1` or `y2 < y1` is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Area {
    /// First column
    pub x1: u16,
    /// First row
    pub y1: u16,
    /// Last column
    pub x2: u16,
    /// Last row
    pub y2: u16,
}

impl Area {
    /// Create an area from its inclusive corners
    pub const fn new(x1: u16, y1: u16, x2: u16, y2: u16) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Whether the area covers no pixels
    pub fn is_empty(&self) -> bool {
        self.x2 < self.x1 || self.y2 < self.y1
    }

    /// Columns covered
    pub fn width(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.x2 - self.x1) as usize + 1
        }
    }

    /// Rows covered
    pub fn height(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.y2 - self.y1) as usize + 1
        }
    }

    /// Pixels covered
    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    /// Bytes of a row-major RGB565 buffer for this area
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }

    /// Bytes per row
    pub fn bytes_per_line(&self) -> usize {
        self.width() * BYTES_PER_PIXEL
    }

    /// Split into horizontal slices of at most `lines` rows
    ///
    /// Slices keep the column range and tile the row range top to bottom.
    /// An empty area yields nothing. `lines` of zero is treated as one.
    pub fn slices(&self, lines: u16) -> Slices {
        Slices {
            area: *self,
            lines: lines.max(1),
            next_row: if self.is_empty() { None } else { Some(self.y1) },
        }
    }
}

/// One slice of a flush
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slice {
    /// Rows and columns covered
    pub area: Area,
    /// Byte range of the slice within the flush buffer
    pub bytes: Range<usize>,
}

/// Iterator returned by [`Area::slices`]
#[derive(Clone, Debug)]
pub struct Slices {
    area: Area,
    lines: u16,
    next_row: Option<u16>,
}

impl Iterator for Slices {
    type Item = Slice;

    fn next(&mut self) -> Option<Slice> {
        let y1 = self.next_row?;
        let last = self.area.y2;
        let y2 = y1.saturating_add(self.lines - 1).min(last);
        self.next_row = if y2 >= last { None } else { Some(y2 + 1) };

        let line = self.area.bytes_per_line();
        let start = (y1 - self.area.y1) as usize * line;
        let end = (y2 - self.area.y1 + 1) as usize * line;
        Some(Slice {
            area: Area::new(self.area.x1, y1, self.area.x2, y2),
            bytes: start..end,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.next_row.map_or(0, |row| {
            let rows = (self.area.y2 - row) as usize + 1;
            rows.div_ceil(self.lines as usize)
        });
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Slices {}

/// Swap the two bytes of every RGB565 pixel in place
///
/// A trailing odd byte is left alone. Applying it twice restores the input.
pub fn swap_rgb565_bytes(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        pixel.swap(0, 1);
    }
}

/// Renderer hook released at the end of every flush
///
/// Maps to the rendering library's "flush ready" call: once it runs, the
/// renderer may reuse the buffer it passed in.
pub trait FlushReady {
    /// The buffer of the last flush is free again
    fn flush_ready(&mut self);
}

impl<F: FnMut()> FlushReady for F {
    fn flush_ready(&mut self) {
        self();
    }
}

/// Errors surfaced by [`FlushEngine::flush`]
#[derive(Debug, PartialEq)]
pub enum FlushError<E> {
    /// The target failed a slice; the rest of the flush was dropped
    Target(E),
    /// The pixel buffer does not cover the area
    Buffer(BufferTooSmall),
}

impl<E: core::fmt::Debug> core::fmt::Display for FlushError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Target(e) => write!(f, "Flush target error: {e:?}"),
            Self::Buffer(e) => write!(f, "{e}"),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for FlushError<E> {}

/// Chunked flush engine
///
/// Sole caller of its target. Created once and driven from the rendering
/// task's flush callback.
#[derive(Debug)]
pub struct FlushEngine<T> {
    target: T,
    config: FlushConfig,
}

impl<T: FlushTarget> FlushEngine<T> {
    /// Create an engine around `target`
    pub fn new(target: T, config: FlushConfig) -> Self {
        Self { target, config }
    }

    /// Transport `pixels` for `area` and release the renderer
    ///
    /// `pixels` holds the area row-major in RGB565, native byte order. When
    /// byte swapping is enabled it is swapped in place slice by slice, so a
    /// slice that was transported leaves its bytes swapped.
    ///
    /// `ready` runs exactly once before this returns, including for empty
    /// areas and failed flushes.
    ///
    /// # Errors
    ///
    /// - `FlushError::Buffer` if `pixels` is shorter than the area; nothing
    ///   is sent
    /// - `FlushError::Target` from the first slice the target rejects; later
    ///   slices are not attempted
    pub fn flush<R>(
        &mut self,
        area: Area,
        pixels: &mut [u8],
        ready: &mut R,
    ) -> Result<(), FlushError<T::Error>>
    where
        R: FlushReady + ?Sized,
    {
        let result = self.transport(area, pixels);

        self.target.flush_complete();
        ready.flush_ready();

        if let Err(e) = &result {
            log::warn!("Flush of {area:?} failed: {e}");
        }
        result
    }

    fn transport(&mut self, area: Area, pixels: &mut [u8]) -> Result<(), FlushError<T::Error>> {
        if area.is_empty() {
            log::debug!("Skipping empty flush area {area:?}");
            return Ok(());
        }

        let required = area.byte_len();
        if pixels.len() < required {
            return Err(FlushError::Buffer(BufferTooSmall {
                required,
                provided: pixels.len(),
            }));
        }

        let slices = area.slices(self.config.chunk_lines);
        if slices.len() > 1 {
            log::debug!(
                "Splitting {} rows into {} slices of {} lines",
                area.height(),
                slices.len(),
                self.config.chunk_lines
            );
        }

        for slice in slices {
            let bytes = &mut pixels[slice.bytes];
            if self.config.byte_swap {
                swap_rgb565_bytes(bytes);
            }
            self.target
                .draw_slice(slice.area, bytes)
                .map_err(FlushError::Target)?;
        }

        Ok(())
    }

    /// Flush settings in use
    pub fn config(&self) -> FlushConfig {
        self.config
    }

    /// Borrow the target
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Mutably borrow the target
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Release the target
    pub fn release(self) -> T {
        self.target
    }
}
