//! CO5300 command definitions
//!
//! This module defines the command bytes used to control the CO5300 AMOLED
//! controller, plus the opcodes of its QSPI framing.
//!
//! ## Frame Structure
//!
//! The CO5300 has no D/C line. Every transaction starts with a 4-byte header
//! carrying an opcode and the command byte:
//!
//! | Byte | Value                                              |
//! |------|----------------------------------------------------|
//! | 0    | [`OPCODE_WRITE_CMD`] or [`OPCODE_WRITE_COLOR`]     |
//! | 1    | `0x00`                                             |
//! | 2    | command byte                                       |
//! | 3    | `0x00`                                             |
//!
//! Command parameters follow on a single data line; pixel data written with
//! [`OPCODE_WRITE_COLOR`] follows on all four lines.
//!
//! ## Example
//!
//! ```
//! use co5300::command;
//!
//! let header = command::header(command::OPCODE_WRITE_CMD, command::SLEEP_OUT);
//! assert_eq!(header, [0x02, 0x00, 0x11, 0x00]);
//! ```

// QSPI opcodes

/// Opcode for register writes (command + parameters on one line)
pub const OPCODE_WRITE_CMD: u8 = 0x02;

/// Opcode for pixel writes (payload on four lines)
pub const OPCODE_WRITE_COLOR: u8 = 0x32;

// System control commands

/// Software reset (0x01)
pub const SOFT_RESET: u8 = 0x01;

/// Enter sleep mode (0x10)
///
/// Wait 120ms before issuing [`SLEEP_OUT`] again.
pub const SLEEP_IN: u8 = 0x10;

/// Exit sleep mode (0x11)
///
/// The panel needs 120ms after this command before it accepts further writes.
pub const SLEEP_OUT: u8 = 0x11;

/// Display off (0x28)
pub const DISPLAY_OFF: u8 = 0x28;

/// Display on (0x29)
pub const DISPLAY_ON: u8 = 0x29;

// Address window and memory commands

/// Column address set (0x2A)
///
/// Requires 4 bytes: [start_MSB, start_LSB, end_MSB, end_LSB]
pub const COLUMN_ADDRESS_SET: u8 = 0x2A;

/// Page (row) address set (0x2B)
///
/// Requires 4 bytes: [start_MSB, start_LSB, end_MSB, end_LSB]
pub const PAGE_ADDRESS_SET: u8 = 0x2B;

/// Memory write (0x2C)
///
/// Starts writing at the beginning of the current address window.
pub const MEMORY_WRITE: u8 = 0x2C;

/// Memory write continue (0x3C)
///
/// Continues writing where the previous memory write stopped.
pub const MEMORY_WRITE_CONTINUE: u8 = 0x3C;

// Tearing effect commands

/// Tearing effect line off (0x34)
pub const TEARING_EFFECT_OFF: u8 = 0x34;

/// Tearing effect line on (0x35)
///
/// Requires 1 byte: 0x00 = V-blanking only, 0x01 = V-blanking + H-blanking
pub const TEARING_EFFECT_ON: u8 = 0x35;

/// Set tear scan line (0x44)
///
/// Requires 2 bytes: [line_MSB, line_LSB]
pub const SET_TEAR_SCANLINE: u8 = 0x44;

// Pixel format and brightness commands

/// Interface pixel format (0x3A)
///
/// Requires 1 byte, see [`PIXEL_FORMAT_RGB565`].
pub const PIXEL_FORMAT: u8 = 0x3A;

/// 16 bits per pixel (RGB565) on both SPI and RGB interfaces
pub const PIXEL_FORMAT_RGB565: u8 = 0x55;

/// Write display brightness (0x51)
pub const WRITE_BRIGHTNESS: u8 = 0x51;

/// Write CTRL display (0x53)
///
/// 0x20 enables the brightness control block.
pub const WRITE_CTRL_DISPLAY: u8 = 0x53;

/// High contrast mode (0x58)
pub const HIGH_CONTRAST: u8 = 0x58;

/// HBM brightness (0x63)
pub const HBM_BRIGHTNESS: u8 = 0x63;

// Vendor commands

/// Manufacturer command page switch (0xFE)
pub const PAGE_SWITCH: u8 = 0xFE;

/// SPI mode control (0xC4)
///
/// 0x80 enables writing display SRAM over SPI.
pub const SPI_MODE_CONTROL: u8 = 0xC4;

/// Build the 4-byte transaction header for an opcode and command
pub const fn header(opcode: u8, command: u8) -> [u8; 4] {
    [opcode, 0x00, command, 0x00]
}

/// Encode an inclusive address range as [start_MSB, start_LSB, end_MSB, end_LSB]
pub const fn address_range(start: u16, end: u16) -> [u8; 4] {
    [
        (start >> 8) as u8,
        (start & 0xFF) as u8,
        (end >> 8) as u8,
        (end & 0xFF) as u8,
    ]
}
