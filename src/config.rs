//! Panel and flush configuration types and builder
//!
//! The board profile is fixed at build time: the defaults below describe the
//! 410x502 CO5300 module this driver was written for. [`Builder`] exists so
//! tests and other carrier boards can override individual values.

pub use crate::error::BuilderError;

/// Native panel width in pixels
pub const PANEL_WIDTH: u16 = 410;

/// Native panel height in pixels
pub const PANEL_HEIGHT: u16 = 502;

/// Largest column count addressable by the controller
pub const MAX_COLUMNS: u16 = 480;

/// Largest row count addressable by the controller
pub const MAX_ROWS: u16 = 640;

/// Bytes per RGB565 pixel
pub const BYTES_PER_PIXEL: usize = 2;

/// QSPI clock rate
pub const DEFAULT_PCLK_HZ: u32 = 80_000_000;

/// Depth of the bus driver's transaction queue
pub const DEFAULT_TRANS_QUEUE_DEPTH: u16 = 64;

/// Rows per bus transfer; sizes the DMA buffer of the bus
pub const DEFAULT_MAX_TRANSFER_LINES: u16 = 30;

/// Rows per flush slice
pub const DEFAULT_CHUNK_LINES: u16 = 30;

/// Swap RGB565 bytes before they hit the bus
pub const DEFAULT_BYTE_SWAP: bool = true;

/// Bound on the once-per-frame tearing wait
pub const DEFAULT_TE_TIMEOUT_MS: u32 = 100;

/// Column offset of the active area on this module
pub const DEFAULT_X_GAP: u16 = 22;

/// Brightness written during bring-up
pub const DEFAULT_BRIGHTNESS: u8 = 0xFF;

/// Display dimensions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    /// Width in pixels (columns)
    pub width: u16,
    /// Height in pixels (rows)
    pub height: u16,
}

impl Dimensions {
    /// Create new dimensions with validation
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidDimensions` if either side is zero or
    /// exceeds [`MAX_COLUMNS`] x [`MAX_ROWS`].
    pub fn new(width: u16, height: u16) -> Result<Self, BuilderError> {
        if width == 0 || width > MAX_COLUMNS || height == 0 || height > MAX_ROWS {
            return Err(BuilderError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Dimensions of the stock 410x502 module
    pub const fn panel() -> Self {
        Self {
            width: PANEL_WIDTH,
            height: PANEL_HEIGHT,
        }
    }

    /// Whether an area of this size offset by `(x_gap, y_gap)` stays inside
    /// the controller's [`MAX_COLUMNS`] x [`MAX_ROWS`] RAM
    pub fn fits_with_gap(&self, x_gap: u16, y_gap: u16) -> bool {
        let columns = x_gap.checked_add(self.width);
        let rows = y_gap.checked_add(self.height);
        columns.is_some_and(|end| end <= MAX_COLUMNS) && rows.is_some_and(|end| end <= MAX_ROWS)
    }

    /// Size in bytes of one full RGB565 frame
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::panel()
    }
}

/// Tearing effect output mode (parameter of command 0x35)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum TeMode {
    /// One pulse per frame at the start of vertical blanking
    #[default]
    VBlank = 0x00,
    /// Pulses during vertical and horizontal blanking (once per line)
    VBlankAndHBlank = 0x01,
}

/// Whether display updates are paced by the tearing effect line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// TE output off, flushes go straight to the bus
    #[default]
    Disabled,
    /// TE output on in the given mode
    Enabled(TeMode),
}

impl SyncMode {
    /// The TE mode if sync is enabled
    pub fn te_mode(self) -> Option<TeMode> {
        match self {
            Self::Disabled => None,
            Self::Enabled(mode) => Some(mode),
        }
    }
}

/// Settings consumed by the flush engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushConfig {
    /// Rows per slice; areas taller than this are split
    pub chunk_lines: u16,
    /// Swap the two bytes of every pixel before transport
    pub byte_swap: bool,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            chunk_lines: DEFAULT_CHUNK_LINES,
            byte_swap: DEFAULT_BYTE_SWAP,
        }
    }
}

/// Panel configuration
///
/// Use [`Builder`] to create a Config.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Display dimensions
    pub dimensions: Dimensions,
    /// Column offset of the active area in controller RAM
    pub x_gap: u16,
    /// Row offset of the active area in controller RAM
    pub y_gap: u16,
    /// QSPI clock rate, for the bus bring-up code
    pub pclk_hz: u32,
    /// Bus transaction queue depth, for the bus bring-up code
    pub trans_queue_depth: u16,
    /// Rows per bus transfer
    pub max_transfer_lines: u16,
    /// Tearing effect configuration
    pub sync: SyncMode,
    /// Timeout of the once-per-frame tearing wait
    pub te_timeout_ms: u32,
    /// Brightness written during bring-up
    pub brightness: u8,
    /// Flush engine settings
    pub flush: FlushConfig,
}

impl Config {
    /// Largest payload of a single bus write in bytes
    ///
    /// Bus drivers should size their DMA buffer with this value.
    pub fn max_transfer_bytes(&self) -> usize {
        self.dimensions.width as usize * self.max_transfer_lines as usize * BYTES_PER_PIXEL
    }

    /// Settings for [`FlushEngine`](crate::flush::FlushEngine)
    pub fn flush_config(&self) -> FlushConfig {
        self.flush
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::panel(),
            x_gap: DEFAULT_X_GAP,
            y_gap: 0,
            pclk_hz: DEFAULT_PCLK_HZ,
            trans_queue_depth: DEFAULT_TRANS_QUEUE_DEPTH,
            max_transfer_lines: DEFAULT_MAX_TRANSFER_LINES,
            sync: SyncMode::Disabled,
            te_timeout_ms: DEFAULT_TE_TIMEOUT_MS,
            brightness: DEFAULT_BRIGHTNESS,
            flush: FlushConfig::default(),
        }
    }
}

/// Builder for constructing panel configuration
///
/// # Example
///
/// ```
/// use co5300::{Builder, Dimensions, SyncMode, TeMode};
///
/// let config = match Builder::new()
///     .dimensions(Dimensions::panel())
///     .sync(SyncMode::Enabled(TeMode::VBlank))
///     .chunk_lines(40)
///     .build()
/// {
///     Ok(config) => config,
///     Err(_) => return,
/// };
/// assert_eq!(config.flush_config().chunk_lines, 40);
/// ```
#[must_use]
pub struct Builder {
    /// Display dimensions (required)
    dimensions: Option<Dimensions>,
    /// Values for everything else
    config: Config,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            dimensions: None,
            config: Config::default(),
        }
    }
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set display dimensions (required)
    pub fn dimensions(mut self, dims: Dimensions) -> Self {
        self.dimensions = Some(dims);
        self
    }

    /// Set the active area offset in controller RAM
    pub fn gap(mut self, x: u16, y: u16) -> Self {
        self.config.x_gap = x;
        self.config.y_gap = y;
        self
    }

    /// Set the QSPI clock rate
    pub fn pclk_hz(mut self, hz: u32) -> Self {
        self.config.pclk_hz = hz;
        self
    }

    /// Set the bus transaction queue depth
    pub fn trans_queue_depth(mut self, depth: u16) -> Self {
        self.config.trans_queue_depth = depth;
        self
    }

    /// Set rows per bus transfer
    pub fn max_transfer_lines(mut self, lines: u16) -> Self {
        self.config.max_transfer_lines = lines;
        self
    }

    /// Set tearing effect sync mode
    pub fn sync(mut self, sync: SyncMode) -> Self {
        self.config.sync = sync;
        self
    }

    /// Set the once-per-frame tearing wait timeout (0 waits forever)
    pub fn te_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.config.te_timeout_ms = timeout_ms;
        self
    }

    /// Set bring-up brightness
    pub fn brightness(mut self, level: u8) -> Self {
        self.config.brightness = level;
        self
    }

    /// Set rows per flush slice
    pub fn chunk_lines(mut self, lines: u16) -> Self {
        self.config.flush.chunk_lines = lines;
        self
    }

    /// Enable or disable RGB565 byte swapping
    pub fn byte_swap(mut self, enabled: bool) -> Self {
        self.config.flush.byte_swap = enabled;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// - `BuilderError::MissingDimensions` if dimensions were not set
    /// - `BuilderError::InvalidChunkLines` if chunk lines is zero
    /// - `BuilderError::InvalidTransferLines` if max transfer lines is zero
    /// - `BuilderError::InvalidGap` if the gap pushes the panel out of
    ///   controller RAM
    pub fn build(self) -> Result<Config, BuilderError> {
        let dimensions = self.dimensions.ok_or(BuilderError::MissingDimensions)?;
        let Config { x_gap, y_gap, .. } = self.config;
        if !dimensions.fits_with_gap(x_gap, y_gap) {
            return Err(BuilderError::InvalidGap { x_gap, y_gap });
        }
        if self.config.flush.chunk_lines == 0 {
            return Err(BuilderError::InvalidChunkLines);
        }
        if self.config.max_transfer_lines == 0 {
            return Err(BuilderError::InvalidTransferLines);
        }
        Ok(Config {
            dimensions,
            ..self.config
        })
    }
}
