//! CO5300 AMOLED Panel Driver
//!
//! A driver for the CO5300 QSPI AMOLED controller as fitted to 410x502
//! round-corner modules, with tearing-effect (TE) paced frame flushing.
//!
//! ## Features
//!
//! - `no_std` compatible
//! - `embedded-hal` v1.0 support
//! - `embedded-graphics` integration (with `graphics` feature)
//! - QSPI command and pixel framing with vendor bring-up sequence
//! - Single-slot TE signal fed from a GPIO interrupt
//! - Frame sync that waits for vertical blanking once per flush
//! - Chunked flushing of tall dirty areas with RGB565 byte swapping
//!
//! ## Pipeline
//!
//! The renderer hands each dirty rectangle to a [`FlushEngine`]. The engine
//! splits it into slices of at most
//! [`chunk_lines`](config::FlushConfig::chunk_lines) rows and sends them to a
//! [`FlushTarget`](target::FlushTarget): a [`DirectTarget`] writes straight to
//! the [`Panel`], a [`TeSyncedTarget`] first waits for the TE signal on the
//! first slice of the flush. Whatever happens, the renderer is released once
//! per flush.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core::convert::Infallible;
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::digital::OutputPin;
//! use embedded_hal::spi::{Operation, SpiDevice};
//! use co5300::tearing::Instant;
//! use co5300::{
//!     Area, Builder, Dimensions, Edge, EdgeInterruptPin, FlushEngine, Panel, QspiInterface,
//!     SyncMode, TeMode, TeSyncedTarget, TearingMonitor, TearingSignal,
//! };
//!
//! # struct MockSpi;
//! # impl embedded_hal::spi::ErrorType for MockSpi { type Error = Infallible; }
//! # impl SpiDevice for MockSpi {
//! #     fn transaction(
//! #         &mut self,
//! #         _operations: &mut [Operation<'_, u8>],
//! #     ) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! # }
//! # struct MockPin;
//! # impl embedded_hal::digital::ErrorType for MockPin { type Error = Infallible; }
//! # impl OutputPin for MockPin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl EdgeInterruptPin for MockPin {
//! #     type Error = Infallible;
//! #     fn listen(&mut self, _edge: Edge) -> Result<(), Infallible> { Ok(()) }
//! #     fn unlisten(&mut self) -> Result<(), Infallible> { Ok(()) }
//! # }
//! # #[derive(Clone)]
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let (spi, rst, te_pin, mut delay) = (MockSpi, MockPin, MockPin, MockDelay);
//! # fn system_time_us() -> u64 { 0 }
//! static TE_SIGNAL: TearingSignal = TearingSignal::new();
//!
//! // GPIO interrupt handler of the TE pin calls `TE_SIGNAL.on_edge()`
//!
//! let config = match Builder::new()
//!     .dimensions(Dimensions::panel())
//!     .sync(SyncMode::Enabled(TeMode::VBlank))
//!     .build()
//! {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//!
//! let mut panel = Panel::new(QspiInterface::new(spi, rst), config);
//! if panel.init(&mut delay).is_err() {
//!     return;
//! }
//! if panel.set_gap(23, 0).is_err() {
//!     return;
//! }
//!
//! // Monotonic microsecond time from the platform's system timer
//! let clock = || Instant::from_ticks(system_time_us());
//! let monitor = match TearingMonitor::new(
//!     te_pin,
//!     Edge::Rising,
//!     TeMode::VBlank,
//!     &TE_SIGNAL,
//!     delay.clone(),
//!     clock,
//! ) {
//!     Ok(monitor) => monitor,
//!     Err(_) => return,
//! };
//! let flush_config = panel.config().flush_config();
//! let target = match TeSyncedTarget::new(panel, monitor) {
//!     Ok(target) => target,
//!     Err(_) => return,
//! };
//! let mut engine = FlushEngine::new(target, flush_config);
//!
//! // From the renderer's flush callback
//! let area = Area::new(0, 0, 409, 89);
//! let mut pixels = vec![0u8; area.byte_len()];
//! let _ = engine.flush(area, &mut pixels, &mut || { /* renderer flush ready */ });
//! ```

#![no_std]

#[cfg(test)]
extern crate alloc;

/// CO5300 command definitions
pub mod command;
/// Panel configuration types and builder
pub mod config;
/// Error types for the driver
pub mod error;
/// Chunked flush engine
pub mod flush;
/// Frame-sync state machine
pub mod frame_sync;
/// Hardware interface abstraction
pub mod interface;
/// Panel bring-up and region writes
pub mod panel;
/// Flush target variants
pub mod target;
/// Tearing effect signal
pub mod tearing;

/// Graphics support via embedded-graphics (requires `graphics` feature)
#[cfg(feature = "graphics")]
pub mod graphics;

pub use config::{
    Builder, Config, Dimensions, FlushConfig, MAX_COLUMNS, MAX_ROWS, PANEL_HEIGHT, PANEL_WIDTH,
    SyncMode, TeMode,
};
pub use error::{BufferTooSmall, BuilderError, Error};
pub use flush::{Area, FlushEngine, FlushError, FlushReady, swap_rgb565_bytes};
pub use frame_sync::{FrameSync, FrameSyncState, SyncOutcome, SyncStats};
pub use interface::{InterfaceError, PanelInterface, QspiInterface};
pub use panel::{Panel, TransferDone};
pub use target::{DirectTarget, FlushTarget, TeSyncedTarget};
pub use tearing::{
    Clock, Edge, EdgeInterruptPin, TeError, TeWait, TearingMonitor, TearingSignal,
};

#[cfg(feature = "graphics")]
pub use graphics::Canvas;
