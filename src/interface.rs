//! Hardware interface abstraction
//!
//! This module provides the [`PanelInterface`] trait and the [`QspiInterface`]
//! struct for talking to the CO5300 controller over its QSPI framing.
//!
//! ## Hardware Requirements
//!
//! The CO5300 requires:
//! - QSPI bus (CLK, CS, D0..D3)
//! - 1 GPIO pin:
//!   - **RST**: Reset (output, active low)
//!
//! There is no D/C pin; the opcode in the transaction header selects between
//! register writes and pixel writes (see [`crate::command`]).
//!
//! The bus is driven through [`SpiDevice`]. Whether the payload goes out on one
//! or four data lines is configured on the platform's bus driver; on ESP32-S3
//! this is the `quad_mode` flag of the panel IO. The bus driver owns chip
//! select, so every call here is one CS-framed transaction.
//!
//! ## Example
//!
//! ```rust,no_run
//! use embedded_hal::digital::OutputPin;
//! use embedded_hal::spi::{Operation, SpiDevice};
//! use co5300::{command, PanelInterface, QspiInterface};
//! # use core::convert::Infallible;
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
//! let mut interface = QspiInterface::new(MockSpi, MockPin);
//!
//! // Sleep out
//! let _ = interface.send_command(command::SLEEP_OUT, &[]);
//!
//! // Pixel format RGB565
//! let _ = interface.send_command(command::PIXEL_FORMAT, &[command::PIXEL_FORMAT_RGB565]);
//! ```

use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Operation, SpiDevice};

use crate::command::{OPCODE_WRITE_CMD, OPCODE_WRITE_COLOR, header};

type InterfaceResult<T, E> = core::result::Result<T, E>;

/// Time the reset line is held low
pub const RESET_PULSE_MS: u32 = 10;

/// Time the controller needs after reset is released
pub const RESET_RECOVERY_MS: u32 = 120;

/// Trait for the bus session with a CO5300 controller
///
/// This trait abstracts over different hardware implementations,
/// allowing the [`Panel`](crate::panel::Panel) to work with any bus
/// that can frame CO5300 transactions.
///
/// ## Implementing
///
/// For most cases, use the provided [`QspiInterface`]. Implement this trait
/// yourself when the platform exposes a native LCD panel IO (for example
/// a DMA-backed transaction queue) instead of a plain [`SpiDevice`].
pub trait PanelInterface {
    /// Error type for interface operations
    ///
    /// Must implement [`Debug`] for error reporting.
    type Error: Debug;

    /// Write a register: command byte followed by its parameters
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    fn send_command(&mut self, command: u8, params: &[u8]) -> InterfaceResult<(), Self::Error>;

    /// Write pixel data following a memory write command
    ///
    /// `command` is [`MEMORY_WRITE`](crate::command::MEMORY_WRITE) for the first
    /// transfer of a window and [`MEMORY_WRITE_CONTINUE`](crate::command::MEMORY_WRITE_CONTINUE)
    /// for the transfers that follow.
    ///
    /// Returns once the transfer has completed or has been accepted into the
    /// bus driver's queue. A full queue blocks the caller until a slot frees.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    fn send_pixels(&mut self, command: u8, pixels: &[u8]) -> InterfaceResult<(), Self::Error>;

    /// Perform hardware reset
    ///
    /// The implementation must:
    /// 1. Set RST pin low
    /// 2. Wait at least [`RESET_PULSE_MS`]
    /// 3. Set RST pin high
    /// 4. Wait at least [`RESET_RECOVERY_MS`]
    ///
    /// # Errors
    ///
    /// Returns an error if the reset pin cannot be driven.
    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> InterfaceResult<(), Self::Error>;
}

/// Errors that can occur at the interface level
///
/// Generic over SPI and GPIO error types.
#[derive(Debug)]
pub enum InterfaceError<SpiErr, PinErr> {
    /// SPI communication error
    Spi(SpiErr),
    /// GPIO pin error
    Pin(PinErr),
}

impl<SpiErr: Debug, PinErr: Debug> core::fmt::Display for InterfaceError<SpiErr, PinErr> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI error: {e:?}"),
            Self::Pin(e) => write!(f, "Pin error: {e:?}"),
        }
    }
}

impl<SpiErr: Debug, PinErr: Debug> core::error::Error for InterfaceError<SpiErr, PinErr> {}

/// QSPI interface implementation for CO5300
///
/// Implements [`PanelInterface`] for an embedded-hal v1.0 [`SpiDevice`] and
/// reset [`OutputPin`].
///
/// ## Type Parameters
///
/// * `SPI` - SPI device implementing [`SpiDevice`], with the bus in quad mode
/// * `RST` - Reset pin implementing [`OutputPin`]
pub struct QspiInterface<SPI, RST> {
    /// SPI device for communication
    spi: SPI,
    /// Reset pin (active low)
    rst: RST,
}

impl<SPI, RST> QspiInterface<SPI, RST>
where
    SPI: SpiDevice,
    RST: OutputPin,
{
    /// Create a new QspiInterface
    ///
    /// # Arguments
    ///
    /// * `spi` - SPI device (must implement [`SpiDevice`])
    /// * `rst` - Reset pin (output, active low)
    pub fn new(spi: SPI, rst: RST) -> Self {
        Self { spi, rst }
    }

    /// Direct access to the SPI device
    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Direct access to the reset pin
    pub fn reset_pin_mut(&mut self) -> &mut RST {
        &mut self.rst
    }

    /// Release the SPI device and reset pin
    pub fn release(self) -> (SPI, RST) {
        (self.spi, self.rst)
    }

    fn write_framed(&mut self, opcode: u8, command: u8, payload: &[u8]) -> Result<(), SPI::Error> {
        let header = header(opcode, command);
        if payload.is_empty() {
            self.spi.write(&header)
        } else {
            self.spi
                .transaction(&mut [Operation::Write(&header), Operation::Write(payload)])
        }
    }
}

impl<SPI, RST> PanelInterface for QspiInterface<SPI, RST>
where
    SPI: SpiDevice,
    SPI::Error: Debug,
    RST: OutputPin,
    RST::Error: Debug,
{
    type Error = InterfaceError<SPI::Error, RST::Error>;

    fn send_command(&mut self, command: u8, params: &[u8]) -> InterfaceResult<(), Self::Error> {
        self.write_framed(OPCODE_WRITE_CMD, command, params)
            .map_err(InterfaceError::Spi)
    }

    fn send_pixels(&mut self, command: u8, pixels: &[u8]) -> InterfaceResult<(), Self::Error> {
        self.write_framed(OPCODE_WRITE_COLOR, command, pixels)
            .map_err(InterfaceError::Spi)
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> InterfaceResult<(), Self::Error> {
        // Reset sequence: LOW -> wait 10ms -> HIGH -> wait 120ms
        self.rst.set_low().map_err(InterfaceError::Pin)?;
        delay.delay_ms(RESET_PULSE_MS);
        self.rst.set_high().map_err(InterfaceError::Pin)?;
        delay.delay_ms(RESET_RECOVERY_MS);
        Ok(())
    }
}
