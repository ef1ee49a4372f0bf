//! Graphics support via embedded-graphics
//!
//! [`Canvas`] is a partial RGB565 draw buffer covering one [`Area`] of the
//! panel. It implements the embedded-graphics
//! [`DrawTarget`](embedded_graphics_core::draw_target::DrawTarget) in panel
//! coordinates and hands its area to a [`FlushEngine`] when drawing is done.
//! The buffer can be moved to the next dirty area and reused, the way a
//! renderer reuses its partial buffers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use co5300::flush::{Area, FlushEngine};
//! use co5300::graphics::Canvas;
//! use co5300::target::DirectTarget;
//! use co5300::{Builder, Dimensions, Panel};
//! use embedded_graphics::{
//!     pixelcolor::Rgb565,
//!     prelude::*,
//!     primitives::{Circle, PrimitiveStyle},
//! };
//! # use core::convert::Infallible;
//! # use embedded_hal::delay::DelayNs;
//! # use co5300::PanelInterface;
//! # struct Bus;
//! # impl PanelInterface for Bus {
//! #     type Error = Infallible;
//! #     fn send_command(&mut self, _c: u8, _p: &[u8]) -> Result<(), Infallible> { Ok(()) }
//! #     fn send_pixels(&mut self, _c: u8, _p: &[u8]) -> Result<(), Infallible> { Ok(()) }
//! #     fn reset<D: DelayNs>(&mut self, _d: &mut D) -> Result<(), Infallible> { Ok(()) }
//! # }
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let config = match Builder::new().dimensions(Dimensions::panel()).build() {
//! #     Ok(config) => config,
//! #     Err(_) => return,
//! # };
//! let mut panel = Panel::new(Bus, config);
//! if panel.init(&mut MockDelay).is_err() {
//!     return;
//! }
//! let flush_config = panel.config().flush_config();
//! let mut engine = FlushEngine::new(DirectTarget::new(panel), flush_config);
//!
//! // 410 x 60 partial buffer, first placed over the top of the panel
//! let mut canvas = match Canvas::new(Area::new(0, 0, 409, 59), vec![0u8; 410 * 60 * 2]) {
//!     Ok(canvas) => canvas,
//!     Err(_) => return,
//! };
//! let _ = canvas.clear(Rgb565::BLACK);
//! let _ = Circle::new(Point::new(180, 5), 50)
//!     .into_styled(PrimitiveStyle::with_fill(Rgb565::GREEN))
//!     .draw(&mut canvas);
//!
//! let _ = canvas.flush(&mut engine, &mut || {});
//! ```

use core::convert::Infallible;
use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{Dimensions as GeometryDimensions, Point, Size},
    pixelcolor::{IntoStorage, Rgb565},
    prelude::Pixel,
    primitives::Rectangle,
};

use crate::config::BYTES_PER_PIXEL;
use crate::error::BufferTooSmall;
use crate::flush::{Area, FlushEngine, FlushError, FlushReady};
use crate::target::FlushTarget;

/// RGB565 draw buffer for one panel area
///
/// Pixels are stored row-major in native (little-endian) byte order. A
/// flush with byte swapping enabled leaves the buffer in wire order, so the
/// area must be redrawn before it is flushed again.
///
/// ## Type Parameters
///
/// * `B` - Buffer type implementing `AsMut<[u8]>`, at least
///   [`Area::byte_len`] bytes long
pub struct Canvas<B>
where
    B: AsMut<[u8]>,
{
    /// Panel area covered by the buffer
    area: Area,
    /// Pixel storage
    buffer: B,
}

impl<B> Canvas<B>
where
    B: AsMut<[u8]>,
{
    /// Create a canvas over `area`
    ///
    /// # Errors
    ///
    /// Returns [`BufferTooSmall`] if `buffer` cannot hold the area.
    pub fn new(area: Area, mut buffer: B) -> Result<Self, BufferTooSmall> {
        check_len(area, buffer.as_mut().len())?;
        Ok(Self { area, buffer })
    }

    /// Panel area covered
    pub fn area(&self) -> Area {
        self.area
    }

    /// Reuse the buffer for another area
    ///
    /// The contents are not cleared.
    ///
    /// # Errors
    ///
    /// Returns [`BufferTooSmall`] if the buffer cannot hold `area`; the
    /// canvas keeps its previous area.
    pub fn move_to(&mut self, area: Area) -> Result<(), BufferTooSmall> {
        check_len(area, self.buffer.as_mut().len())?;
        self.area = area;
        Ok(())
    }

    /// Pixel bytes of the covered area
    pub fn pixels(&mut self) -> &mut [u8] {
        let len = self.area.byte_len();
        &mut self.buffer.as_mut()[..len]
    }

    /// Send the covered area through `engine`
    ///
    /// `ready` runs once the engine is done with the buffer, as for
    /// [`FlushEngine::flush`].
    ///
    /// # Errors
    ///
    /// Returns whatever the engine reports.
    pub fn flush<T, R>(
        &mut self,
        engine: &mut FlushEngine<T>,
        ready: &mut R,
    ) -> Result<(), FlushError<T::Error>>
    where
        T: FlushTarget,
        R: FlushReady + ?Sized,
    {
        let area = self.area;
        engine.flush(area, self.pixels(), ready)
    }

    /// Release the buffer
    pub fn release(self) -> B {
        self.buffer
    }

    /// Set a pixel given in panel coordinates
    ///
    /// Internal method used by the [`DrawTarget`] implementation.
    fn set_pixel(&mut self, x: u16, y: u16, color: Rgb565) {
        let Area { x1, y1, x2, y2 } = self.area;
        if x < x1 || x > x2 || y < y1 || y > y2 {
            return;
        }

        let index = ((y - y1) as usize * self.area.width() + (x - x1) as usize) * BYTES_PER_PIXEL;
        let raw = color.into_storage().to_le_bytes();
        if let Some(pixel) = self.buffer.as_mut().get_mut(index..index + BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&raw);
        }
    }
}

fn check_len(area: Area, provided: usize) -> Result<(), BufferTooSmall> {
    let required = area.byte_len();
    if provided < required {
        return Err(BufferTooSmall { required, provided });
    }
    Ok(())
}

impl<B> DrawTarget for Canvas<B>
where
    B: AsMut<[u8]>,
{
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<Iter>(&mut self, pixels: Iter) -> Result<(), Self::Error>
    where
        Iter: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(Point { x, y }, color) in pixels {
            let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
                continue;
            };
            self.set_pixel(x, y, color);
        }

        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let raw = color.into_storage().to_le_bytes();
        for pixel in self.pixels().chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&raw);
        }
        Ok(())
    }
}

impl<B> GeometryDimensions for Canvas<B>
where
    B: AsMut<[u8]>,
{
    fn bounding_box(&self) -> Rectangle {
        Rectangle::new(
            Point::new(self.area.x1 as i32, self.area.y1 as i32),
            Size::new(self.area.width() as u32, self.area.height() as u32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlushConfig;
    use alloc::vec::Vec;
    use embedded_graphics::{
        Drawable,
        pixelcolor::RgbColor,
        primitives::{Primitive, PrimitiveStyle},
    };

    #[derive(Default)]
    struct RecordingTarget {
        slices: Vec<(Area, Vec<u8>)>,
    }

    impl FlushTarget for RecordingTarget {
        type Error = Infallible;

        fn draw_slice(&mut self, area: Area, pixels: &[u8]) -> Result<(), Infallible> {
            self.slices.push((area, pixels.to_vec()));
            Ok(())
        }
    }

    fn pixel_at(canvas: &mut Canvas<Vec<u8>>, x: u16, y: u16) -> [u8; 2] {
        let area = canvas.area();
        let index = ((y - area.y1) as usize * area.width() + (x - area.x1) as usize) * 2;
        [canvas.pixels()[index], canvas.pixels()[index + 1]]
    }

    #[test]
    fn test_new_rejects_small_buffer() {
        let result = Canvas::new(Area::new(0, 0, 9, 9), alloc::vec![0u8; 199]);
        assert!(matches!(
            result,
            Err(BufferTooSmall {
                required: 200,
                provided: 199
            })
        ));
    }

    #[test]
    fn test_bounding_box_matches_area() {
        let canvas = Canvas::new(Area::new(10, 20, 19, 24), alloc::vec![0u8; 100]).unwrap();
        assert_eq!(
            canvas.bounding_box(),
            Rectangle::new(Point::new(10, 20), Size::new(10, 5))
        );
    }

    #[test]
    fn test_draw_uses_panel_coordinates_and_clips() {
        let mut canvas = Canvas::new(Area::new(10, 20, 13, 21), alloc::vec![0u8; 16]).unwrap();

        Rectangle::new(Point::new(8, 18), Size::new(4, 4))
            .into_styled(PrimitiveStyle::with_fill(Rgb565::RED))
            .draw(&mut canvas)
            .unwrap();

        // Red is 0xF800, stored little-endian
        assert_eq!(pixel_at(&mut canvas, 10, 20), [0x00, 0xF8]);
        assert_eq!(pixel_at(&mut canvas, 11, 21), [0x00, 0xF8]);
        assert_eq!(pixel_at(&mut canvas, 12, 20), [0x00, 0x00]);
        assert_eq!(pixel_at(&mut canvas, 13, 21), [0x00, 0x00]);
    }

    #[test]
    fn test_negative_coordinates_are_ignored() {
        let mut canvas = Canvas::new(Area::new(0, 0, 1, 1), alloc::vec![0u8; 8]).unwrap();
        canvas
            .draw_iter([Pixel(Point::new(-1, 0), Rgb565::WHITE)])
            .unwrap();
        assert_eq!(canvas.pixels(), [0u8; 8]);
    }

    #[test]
    fn test_clear_fills_only_the_area() {
        let mut canvas = Canvas::new(Area::new(0, 0, 1, 0), alloc::vec![0xAAu8; 6]).unwrap();
        canvas.clear(Rgb565::BLUE).unwrap();
        assert_eq!(canvas.release(), [0x1F, 0x00, 0x1F, 0x00, 0xAA, 0xAA]);
    }

    #[test]
    fn test_move_to_checks_capacity() {
        let mut canvas = Canvas::new(Area::new(0, 0, 3, 3), alloc::vec![0u8; 32]).unwrap();
        assert!(canvas.move_to(Area::new(100, 200, 107, 201)).is_ok());
        assert_eq!(canvas.area(), Area::new(100, 200, 107, 201));
        assert!(canvas.move_to(Area::new(0, 0, 8, 1)).is_err());
        assert_eq!(canvas.area(), Area::new(100, 200, 107, 201));
    }

    #[test]
    fn test_flush_sends_area_in_wire_order() {
        let mut engine = FlushEngine::new(
            RecordingTarget::default(),
            FlushConfig {
                chunk_lines: 1,
                byte_swap: true,
            },
        );
        let mut canvas = Canvas::new(Area::new(5, 5, 5, 6), alloc::vec![0u8; 4]).unwrap();
        canvas.clear(Rgb565::RED).unwrap();
        let mut acks = 0;

        canvas.flush(&mut engine, &mut || acks += 1).unwrap();

        let target = engine.release();
        assert_eq!(
            target.slices,
            [
                (Area::new(5, 5, 5, 5), alloc::vec![0xF8, 0x00]),
                (Area::new(5, 6, 5, 6), alloc::vec![0xF8, 0x00]),
            ]
        );
        assert_eq!(acks, 1);
    }
}
