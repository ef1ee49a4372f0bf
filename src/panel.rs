//! Panel transport: bring-up and pixel region writes

use embedded_hal::delay::DelayNs;

use crate::command::{
    COLUMN_ADDRESS_SET, DISPLAY_OFF, DISPLAY_ON, HBM_BRIGHTNESS, HIGH_CONTRAST, MEMORY_WRITE,
    MEMORY_WRITE_CONTINUE, PAGE_ADDRESS_SET, PAGE_SWITCH, PIXEL_FORMAT, PIXEL_FORMAT_RGB565,
    SET_TEAR_SCANLINE, SLEEP_IN, SLEEP_OUT, SPI_MODE_CONTROL, TEARING_EFFECT_OFF,
    TEARING_EFFECT_ON, WRITE_BRIGHTNESS, WRITE_CTRL_DISPLAY, address_range,
};
use crate::config::{BYTES_PER_PIXEL, Config, Dimensions, MAX_COLUMNS, MAX_ROWS};
use crate::error::Error;
use crate::interface::PanelInterface;

type PanelResult<I> = core::result::Result<(), Error<I>>;

/// Delay after sleep out / sleep in
const SLEEP_DELAY_MS: u32 = 120;

/// Delay after the last bring-up command
const INIT_SETTLE_MS: u32 = 10;

/// Handler run when a pixel transfer has physically completed
///
/// Runs in the context that observed completion, which on DMA-backed
/// interfaces is an interrupt. Keep it short and non-blocking. Return `true`
/// if the handler woke a higher-priority task.
///
/// Closures and `fn` items with the right signature implement this trait, so
/// `static` handlers carry their own context.
pub trait TransferDone: Sync {
    /// Called once per completed [`Panel::draw_region`] transfer
    fn on_transfer_done(&self) -> bool;
}

impl<F> TransferDone for F
where
    F: Fn() -> bool + Sync,
{
    fn on_transfer_done(&self) -> bool {
        self()
    }
}

/// CO5300 panel driver
///
/// Owns the bus session with the controller. Exactly one instance should
/// exist per panel; it is created once at startup and driven only from the
/// rendering task.
pub struct Panel<I>
where
    I: PanelInterface,
{
    /// Hardware interface
    interface: I,
    /// Panel configuration
    config: Config,
    /// Bring-up completed and the panel is awake
    initialized: bool,
    /// Transfer-complete handler (latest registration wins)
    transfer_done: Option<&'static dyn TransferDone>,
}

impl<I> Panel<I>
where
    I: PanelInterface,
{
    /// Create a new Panel instance
    ///
    /// Nothing is sent to the controller until [`init`](Self::init).
    pub fn new(interface: I, config: Config) -> Self {
        Self {
            interface,
            config,
            initialized: false,
            transfer_done: None,
        }
    }

    /// Reset the panel and run the bring-up sequence
    ///
    /// Calling this again on an initialized panel does nothing and returns
    /// `Ok`. On failure the panel stays uninitialized and `init` may be
    /// retried.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidGap` if the configured gap does not fit controller
    ///   RAM; nothing is sent
    /// - `Error::Interface` if the reset line or any command fails
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> PanelResult<I> {
        if self.initialized {
            log::warn!("Panel already initialized");
            return Ok(());
        }

        let (x_gap, y_gap) = (self.config.x_gap, self.config.y_gap);
        if !self.config.dimensions.fits_with_gap(x_gap, y_gap) {
            log::error!("Gap ({x_gap},{y_gap}) does not fit controller RAM");
            return Err(Error::InvalidGap { x_gap, y_gap });
        }

        log::info!("Reset and start panel");
        self.interface.reset(delay).map_err(Error::Interface)?;
        self.init_sequence(delay).inspect_err(|e| {
            log::error!("Panel init failed: {e}");
        })?;

        self.initialized = true;
        match self.config.sync.te_mode() {
            Some(mode) => log::info!("CO5300 init OK (TE enabled, mode: 0x{:02X})", mode as u8),
            None => log::info!("CO5300 init OK (TE disabled)"),
        }
        Ok(())
    }

    /// Vendor bring-up sequence
    fn init_sequence<D: DelayNs>(&mut self, delay: &mut D) -> PanelResult<I> {
        self.send_command(SLEEP_OUT, &[])?;
        delay.delay_ms(SLEEP_DELAY_MS);

        match self.config.sync.te_mode() {
            Some(mode) => {
                self.send_command(TEARING_EFFECT_ON, &[mode as u8])?;
                // Scan line 0: pulse at the start of vertical blanking
                self.send_command(SET_TEAR_SCANLINE, &[0x00, 0x00])?;
            }
            None => self.send_command(TEARING_EFFECT_OFF, &[])?,
        }

        self.send_command(PAGE_SWITCH, &[0x00])?;
        // Enable SRAM writes over SPI
        self.send_command(SPI_MODE_CONTROL, &[0x80])?;
        self.send_command(PIXEL_FORMAT, &[PIXEL_FORMAT_RGB565])?;
        self.send_command(WRITE_CTRL_DISPLAY, &[0x20])?;
        self.send_command(HBM_BRIGHTNESS, &[0xFF])?;

        let Dimensions { width, height } = self.config.dimensions;
        self.set_window(0, 0, width.saturating_sub(1), height.saturating_sub(1))?;

        self.send_command(DISPLAY_ON, &[])?;
        self.send_command(WRITE_BRIGHTNESS, &[self.config.brightness])?;
        self.send_command(HIGH_CONTRAST, &[0x00])?;
        delay.delay_ms(INIT_SETTLE_MS);

        Ok(())
    }

    /// Write RGB565 pixels into the inclusive window `[x1, x2] x [y1, y2]`
    ///
    /// `pixels` must hold exactly `(x2 - x1 + 1) * (y2 - y1 + 1)` pixels,
    /// two bytes each, row-major. They go out in the byte order given; the
    /// controller expects the high byte first.
    ///
    /// Blocks until the interface has completed or queued the transfer.
    /// Payloads larger than [`Config::max_transfer_bytes`] are written as one
    /// memory write followed by memory-write-continue transfers. The
    /// registered [`TransferDone`] handler runs once the last one returns.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` if the panel is not initialized
    /// - `Error::InvalidArea` if the window is inverted or off-panel
    /// - `Error::BufferSizeMismatch` if `pixels` does not match the window
    /// - `Error::InvalidGap` if the gap shifts the window out of controller RAM
    /// - `Error::Interface` if a bus transaction fails; not retried
    pub fn draw_region(
        &mut self,
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        pixels: &[u8],
    ) -> PanelResult<I> {
        if !self.initialized {
            return Err(Error::InvalidState);
        }

        let Dimensions { width, height } = self.config.dimensions;
        if x1 > x2 || y1 > y2 || x2 >= width || y2 >= height {
            return Err(Error::InvalidArea { x1, y1, x2, y2 });
        }

        let required = (x2 - x1 + 1) as usize * (y2 - y1 + 1) as usize * BYTES_PER_PIXEL;
        if pixels.len() != required {
            return Err(Error::BufferSizeMismatch {
                required,
                provided: pixels.len(),
            });
        }

        self.set_window(x1, y1, x2, y2)?;

        let mut command = MEMORY_WRITE;
        for transfer in pixels.chunks(self.config.max_transfer_bytes()) {
            self.interface
                .send_pixels(command, transfer)
                .map_err(Error::Interface)?;
            command = MEMORY_WRITE_CONTINUE;
        }

        if let Some(handler) = self.transfer_done {
            let woken = handler.on_transfer_done();
            log::trace!("Transfer done (woken: {woken})");
        }

        Ok(())
    }

    /// Install the transfer-complete handler, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the panel is not initialized.
    pub fn register_transfer_done_callback(
        &mut self,
        handler: &'static dyn TransferDone,
    ) -> PanelResult<I> {
        if !self.initialized {
            log::error!("Panel not initialized");
            return Err(Error::InvalidState);
        }
        self.transfer_done = Some(handler);
        Ok(())
    }

    /// Remove the transfer-complete handler
    pub fn clear_transfer_done_callback(&mut self) {
        self.transfer_done = None;
    }

    /// Direct access to the bus session
    ///
    /// Escape hatch for integration code that needs commands this driver
    /// does not wrap. Not meant for the steady-state flush path.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the panel is not initialized.
    pub fn raw_handles(&mut self) -> Result<&mut I, Error<I>> {
        if !self.initialized {
            log::error!("Panel not initialized");
            return Err(Error::InvalidState);
        }
        Ok(&mut self.interface)
    }

    /// Set the offset of the active area in controller RAM
    ///
    /// Compensates for how the glass is mounted over the controller's
    /// address space. Takes effect on the next [`draw_region`](Self::draw_region).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGap` if the panel offset by the gap would not
    /// fit controller RAM. The previous gap stays in effect.
    pub fn set_gap(&mut self, x_gap: u16, y_gap: u16) -> PanelResult<I> {
        if !self.config.dimensions.fits_with_gap(x_gap, y_gap) {
            log::error!("Gap ({x_gap},{y_gap}) does not fit controller RAM");
            return Err(Error::InvalidGap { x_gap, y_gap });
        }
        self.config.x_gap = x_gap;
        self.config.y_gap = y_gap;
        Ok(())
    }

    /// Set display brightness
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the panel is not initialized.
    pub fn set_brightness(&mut self, level: u8) -> PanelResult<I> {
        if !self.initialized {
            return Err(Error::InvalidState);
        }
        self.send_command(WRITE_BRIGHTNESS, &[level])
    }

    /// Turn the display output on or off; RAM contents are kept
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the panel is not initialized.
    pub fn set_display_on(&mut self, on: bool) -> PanelResult<I> {
        if !self.initialized {
            return Err(Error::InvalidState);
        }
        self.send_command(if on { DISPLAY_ON } else { DISPLAY_OFF }, &[])
    }

    /// Turn the display off and put the controller to sleep
    ///
    /// Afterwards every operation returns `Error::InvalidState` until
    /// [`init`](Self::init) runs again.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the panel is not initialized, or
    /// `Error::Interface` if a command fails. The panel counts as shut down
    /// either way.
    pub fn shutdown<D: DelayNs>(&mut self, delay: &mut D) -> PanelResult<I> {
        if !self.initialized {
            return Err(Error::InvalidState);
        }
        self.initialized = false;
        self.transfer_done = None;

        self.send_command(DISPLAY_OFF, &[])?;
        self.send_command(SLEEP_IN, &[])?;
        delay.delay_ms(SLEEP_DELAY_MS);
        log::info!("Panel shut down");
        Ok(())
    }

    /// Whether bring-up has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Send a command to the panel controller
    fn send_command(&mut self, command: u8, params: &[u8]) -> PanelResult<I> {
        self.interface
            .send_command(command, params)
            .map_err(Error::Interface)
    }

    /// Address the panel window `[x1, x2] x [y1, y2]` shifted by the gap
    fn set_window(&mut self, x1: u16, y1: u16, x2: u16, y2: u16) -> PanelResult<I> {
        let (x_gap, y_gap) = (self.config.x_gap, self.config.y_gap);
        let columns = x1.checked_add(x_gap).zip(x2.checked_add(x_gap));
        let rows = y1.checked_add(y_gap).zip(y2.checked_add(y_gap));
        let (Some((col_start, col_end)), Some((row_start, row_end))) = (columns, rows) else {
            return Err(Error::InvalidGap { x_gap, y_gap });
        };
        if col_end >= MAX_COLUMNS || row_end >= MAX_ROWS {
            return Err(Error::InvalidGap { x_gap, y_gap });
        }

        self.send_command(COLUMN_ADDRESS_SET, &address_range(col_start, col_end))?;
        self.send_command(PAGE_ADDRESS_SET, &address_range(row_start, row_end))
    }

    /// Get display dimensions
    pub fn dimensions(&self) -> &Dimensions {
        &self.config.dimensions
    }

    /// Access the underlying configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Release the interface
    pub fn release(self) -> I {
        self.interface
    }
}
