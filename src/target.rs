//! Flush targets
//!
//! A [`FlushTarget`] is where the flush engine sends its slices. Two variants
//! exist and one is picked when the display stack is built:
//!
//! - [`DirectTarget`] writes every slice straight to the panel
//! - [`TeSyncedTarget`] runs every slice through a [`FrameSync`] first, so
//!   the first slice of each flush waits for vertical blanking

use core::fmt::Debug;

use crate::error::Error;
use crate::flush::Area;
use crate::frame_sync::{FrameSync, FrameSyncState, SyncStats};
use crate::interface::PanelInterface;
use crate::panel::Panel;
use crate::tearing::{TeError, TeWait};

/// Destination of flush slices
pub trait FlushTarget {
    /// Error returned when a slice cannot be transported
    type Error: Debug;

    /// Transport one slice
    ///
    /// `pixels` covers `area` row-major, already in wire byte order.
    fn draw_slice(&mut self, area: Area, pixels: &[u8]) -> Result<(), Self::Error>;

    /// The whole dirty rectangle of the current flush has been handled
    fn flush_complete(&mut self) {}
}

/// Slices go straight to the panel
pub struct DirectTarget<I: PanelInterface> {
    panel: Panel<I>,
}

impl<I: PanelInterface> DirectTarget<I> {
    /// Wrap a panel
    pub fn new(panel: Panel<I>) -> Self {
        Self { panel }
    }

    /// Borrow the panel
    pub fn panel(&self) -> &Panel<I> {
        &self.panel
    }

    /// Mutably borrow the panel
    pub fn panel_mut(&mut self) -> &mut Panel<I> {
        &mut self.panel
    }

    /// Unwrap the panel
    pub fn into_panel(self) -> Panel<I> {
        self.panel
    }
}

impl<I: PanelInterface> FlushTarget for DirectTarget<I> {
    type Error = Error<I>;

    fn draw_slice(&mut self, area: Area, pixels: &[u8]) -> Result<(), Error<I>> {
        self.panel.draw_region(area.x1, area.y1, area.x2, area.y2, pixels)
    }
}

/// Slices are paced by the panel's tearing effect line
///
/// The first slice of each flush waits on `W` (usually a
/// [`TearingMonitor`](crate::tearing::TearingMonitor)); the rest follow
/// without waiting. The wait is bounded by
/// [`Config::te_timeout_ms`](crate::config::Config::te_timeout_ms) and a
/// timeout only costs a possible tear.
pub struct TeSyncedTarget<I: PanelInterface, W> {
    panel: Panel<I>,
    sync: FrameSync,
    waiter: W,
}

impl<I, W> TeSyncedTarget<I, W>
where
    I: PanelInterface,
    W: TeWait,
{
    /// Pair a panel with its tearing signal waiter
    ///
    /// The panel must be configured with
    /// [`SyncMode::Enabled`](crate::config::SyncMode::Enabled); otherwise it
    /// never pulses TE and every flush would sit out the full timeout.
    ///
    /// # Errors
    ///
    /// - [`TeError::InvalidState`] if the panel has TE output disabled
    /// - [`TeError::ModeMismatch`] if `waiter` filters edges for another
    ///   TE mode than the panel emits
    ///
    /// Both parts are dropped on error.
    pub fn new(panel: Panel<I>, waiter: W) -> Result<Self, TeError> {
        let config = panel.config();
        let Some(mode) = config.sync.te_mode() else {
            log::error!("TE sync requested but panel has TE disabled");
            return Err(TeError::InvalidState);
        };
        if let Some(monitor) = waiter.te_mode().filter(|m| *m != mode) {
            log::error!("TE mode mismatch (panel: {mode:?}, monitor: {monitor:?})");
            return Err(TeError::ModeMismatch {
                panel: mode,
                monitor,
            });
        }

        let sync = FrameSync::new(config.te_timeout_ms);
        Ok(Self {
            panel,
            sync,
            waiter,
        })
    }

    /// Block until the next tearing signal, outside of any flush
    ///
    /// For application code that wants to align its own panel access with
    /// vertical blanking. Does not touch the frame-sync state.
    ///
    /// # Errors
    ///
    /// - [`TeError::InvalidState`] if the panel is not initialized
    /// - [`TeError::TimedOut`] if no signal arrived in time
    pub fn wait_te_signal(&mut self, timeout_ms: u32) -> Result<(), TeError> {
        if !self.panel.is_initialized() {
            log::error!("Panel not initialized");
            return Err(TeError::InvalidState);
        }
        self.waiter.wait_te(timeout_ms)
    }

    /// Frame-sync state of the flush in progress
    pub fn state(&self) -> FrameSyncState {
        self.sync.state()
    }

    /// Cumulative sync statistics
    pub fn stats(&self) -> SyncStats {
        self.sync.stats()
    }

    /// Borrow the panel
    pub fn panel(&self) -> &Panel<I> {
        &self.panel
    }

    /// Mutably borrow the panel
    pub fn panel_mut(&mut self) -> &mut Panel<I> {
        &mut self.panel
    }

    /// Mutably borrow the waiter
    pub fn waiter_mut(&mut self) -> &mut W {
        &mut self.waiter
    }

    /// Split back into panel and waiter
    pub fn release(self) -> (Panel<I>, W) {
        (self.panel, self.waiter)
    }
}

impl<I, W> FlushTarget for TeSyncedTarget<I, W>
where
    I: PanelInterface,
    W: TeWait,
{
    type Error = Error<I>;

    fn draw_slice(&mut self, area: Area, pixels: &[u8]) -> Result<(), Error<I>> {
        // Nothing to pace if the panel will refuse the slice
        if !self.panel.is_initialized() {
            return Err(Error::InvalidState);
        }
        self.sync.before_region(&mut self.waiter);
        self.panel.draw_region(area.x1, area.y1, area.x2, area.y2, pixels)
    }

    fn flush_complete(&mut self) {
        self.sync.flush_complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Builder, Dimensions, FlushConfig, SyncMode, TeMode};
    use crate::flush::FlushEngine;
    use alloc::vec::Vec;
    use embedded_hal::delay::DelayNs;

    #[derive(Debug, Default)]
    struct MockInterface {
        windows: Vec<(u8, Vec<u8>)>,
        writes: u32,
    }

    impl PanelInterface for MockInterface {
        type Error = core::convert::Infallible;

        fn send_command(&mut self, command: u8, params: &[u8]) -> Result<(), Self::Error> {
            self.windows.push((command, params.to_vec()));
            Ok(())
        }

        fn send_pixels(&mut self, _command: u8, _pixels: &[u8]) -> Result<(), Self::Error> {
            self.writes += 1;
            Ok(())
        }

        fn reset<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    struct NoDelay;
    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Waiter that succeeds while it has pending edges, else times out
    #[derive(Default)]
    struct EdgeCounter {
        pending: bool,
        waits: u32,
        mode: Option<TeMode>,
    }

    impl TeWait for EdgeCounter {
        fn wait_te(&mut self, _timeout_ms: u32) -> Result<(), TeError> {
            self.waits += 1;
            if core::mem::take(&mut self.pending) {
                Ok(())
            } else {
                Err(TeError::TimedOut)
            }
        }

        fn te_mode(&self) -> Option<TeMode> {
            self.mode
        }
    }

    fn panel() -> Panel<MockInterface> {
        let config = Builder::new()
            .dimensions(Dimensions::new(20, 90).unwrap())
            .gap(0, 0)
            .sync(SyncMode::Enabled(TeMode::VBlank))
            .build()
            .unwrap();
        let mut panel = Panel::new(MockInterface::default(), config);
        panel.init(&mut NoDelay).unwrap();
        panel
    }

    fn flush_config() -> FlushConfig {
        FlushConfig {
            chunk_lines: 30,
            byte_swap: true,
        }
    }

    #[test]
    fn test_direct_target_draws_each_slice() {
        let mut engine = FlushEngine::new(DirectTarget::new(panel()), flush_config());
        let area = Area::new(0, 0, 19, 89);
        let mut pixels = alloc::vec![0u8; area.byte_len()];

        engine.flush(area, &mut pixels, &mut || {}).unwrap();

        assert_eq!(engine.target().panel().config().dimensions.height, 90);
        let panel = engine.release().into_panel();
        assert_eq!(panel.release().writes, 3);
    }

    #[test]
    fn test_synced_target_waits_once_per_flush() {
        let waiter = EdgeCounter {
            pending: true,
            waits: 0,
            mode: Some(TeMode::VBlank),
        };
        let target = TeSyncedTarget::new(panel(), waiter).unwrap();
        let mut engine = FlushEngine::new(target, flush_config());
        let area = Area::new(0, 0, 19, 59);
        let mut pixels = alloc::vec![0u8; area.byte_len()];

        engine.flush(area, &mut pixels, &mut || {}).unwrap();

        let target = engine.target_mut();
        assert_eq!(target.waiter_mut().waits, 1);
        assert_eq!(target.stats().syncs, 1);
        assert_eq!(target.stats().timeouts, 0);
        assert!(target.state().frame_start);
        assert_eq!(target.state().flush_count, 0);
    }

    #[test]
    fn test_synced_target_draws_after_timeout() {
        let target = TeSyncedTarget::new(panel(), EdgeCounter::default()).unwrap();
        let mut engine = FlushEngine::new(target, flush_config());
        let area = Area::new(0, 0, 19, 9);
        let mut pixels = alloc::vec![0u8; area.byte_len()];

        engine.flush(area, &mut pixels, &mut || {}).unwrap();
        engine.flush(area, &mut pixels, &mut || {}).unwrap();

        assert_eq!(engine.target().stats().timeouts, 2);
        let (panel, waiter) = engine.release().release();
        assert_eq!(waiter.waits, 2);
        assert_eq!(panel.release().writes, 2);
    }

    #[test]
    fn test_synced_target_rejects_uninitialized_panel_without_waiting() {
        let config = Builder::new()
            .dimensions(Dimensions::new(20, 90).unwrap())
            .sync(SyncMode::Enabled(TeMode::VBlank))
            .build()
            .unwrap();
        let panel = Panel::new(MockInterface::default(), config);
        let mut target = TeSyncedTarget::new(panel, EdgeCounter::default()).unwrap();

        assert!(matches!(
            target.draw_slice(Area::new(0, 0, 0, 0), &[0, 0]),
            Err(Error::InvalidState)
        ));
        assert_eq!(target.wait_te_signal(10), Err(TeError::InvalidState));
        assert_eq!(target.waiter_mut().waits, 0);
        assert!(target.state().frame_start);
    }

    #[test]
    fn test_wait_te_signal_leaves_frame_state_alone() {
        let mut target = TeSyncedTarget::new(panel(), EdgeCounter::default()).unwrap();
        target.waiter_mut().pending = true;

        assert_eq!(target.wait_te_signal(100), Ok(()));
        assert_eq!(target.wait_te_signal(1), Err(TeError::TimedOut));
        assert_eq!(target.stats().syncs, 0);
        assert!(target.state().frame_start);
    }

    #[test]
    fn test_direct_target_surfaces_window_errors() {
        let mut target = DirectTarget::new(panel());
        assert!(matches!(
            target.draw_slice(Area::new(0, 0, 20, 0), &[0u8; 42]),
            Err(Error::InvalidArea { .. })
        ));
        assert!(target.panel_mut().set_brightness(0x10).is_ok());
    }

    #[test]
    fn test_synced_target_requires_te_enabled_panel() {
        let config = Builder::new()
            .dimensions(Dimensions::new(20, 90).unwrap())
            .build()
            .unwrap();
        let mut panel = Panel::new(MockInterface::default(), config);
        panel.init(&mut NoDelay).unwrap();

        let result = TeSyncedTarget::new(panel, EdgeCounter::default());
        assert!(matches!(result, Err(TeError::InvalidState)));
    }

    #[test]
    fn test_synced_target_rejects_mode_mismatch() {
        let config = Builder::new()
            .dimensions(Dimensions::new(20, 90).unwrap())
            .sync(SyncMode::Enabled(TeMode::VBlankAndHBlank))
            .build()
            .unwrap();
        let panel = Panel::new(MockInterface::default(), config);
        let waiter = EdgeCounter {
            mode: Some(TeMode::VBlank),
            ..EdgeCounter::default()
        };

        let result = TeSyncedTarget::new(panel, waiter);
        assert!(matches!(
            result,
            Err(TeError::ModeMismatch {
                panel: TeMode::VBlankAndHBlank,
                monitor: TeMode::VBlank
            })
        ));
    }
}
