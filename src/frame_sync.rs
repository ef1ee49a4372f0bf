//! Frame-sync orchestration
//!
//! Decides when a flush consults the tearing signal. The first region of a
//! frame waits for the next TE assertion (bounded by a timeout); every later
//! region of the same frame goes straight to the panel. A frame ends when the
//! flush engine reports the whole dirty rectangle as done.
//!
//! A timed-out wait is not an error. The region is transported anyway, at
//! the risk of a visible tear, so a disconnected TE line never stalls
//! rendering.

use crate::tearing::{TeError, TeWait};

/// Completed flushes between two statistics log lines
pub const STATS_LOG_INTERVAL: u32 = 100;

/// Per-frame state and cumulative counters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSyncState {
    /// No region of the current frame has been sent yet
    pub frame_start: bool,
    /// Regions sent in the current frame
    pub flush_count: u32,
    /// TE waits that saw an assertion
    pub sync_count: u32,
    /// TE waits that gave up
    pub timeout_count: u32,
}

impl Default for FrameSyncState {
    fn default() -> Self {
        Self {
            frame_start: true,
            flush_count: 0,
            sync_count: 0,
            timeout_count: 0,
        }
    }
}

/// Cumulative sync statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// TE waits that saw an assertion
    pub syncs: u32,
    /// TE waits that gave up
    pub timeouts: u32,
    /// Flushes reported complete
    pub completed_flushes: u32,
}

/// What [`FrameSync::before_region`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Not the first region of the frame; no wait
    Skipped,
    /// Waited and saw a TE assertion
    Synced,
    /// Waited without seeing one
    Missed(TeError),
}

/// Frame-sync state machine
#[derive(Debug)]
pub struct FrameSync {
    state: FrameSyncState,
    /// Bound on the once-per-frame wait (0 waits forever)
    timeout_ms: u32,
    completed_flushes: u32,
}

impl FrameSync {
    /// Start in the frame-start state
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            state: FrameSyncState::default(),
            timeout_ms,
            completed_flushes: 0,
        }
    }

    /// Run before a region is transported
    ///
    /// Waits on `waiter` only for the first region of a frame. The outcome
    /// is recorded but never stops the region from being sent.
    pub fn before_region<W: TeWait>(&mut self, waiter: &mut W) -> SyncOutcome {
        let outcome = if self.state.frame_start {
            self.state.frame_start = false;
            match waiter.wait_te(self.timeout_ms) {
                Ok(()) => {
                    self.state.sync_count = self.state.sync_count.wrapping_add(1);
                    SyncOutcome::Synced
                }
                Err(e) => {
                    self.state.timeout_count = self.state.timeout_count.wrapping_add(1);
                    log::debug!("TE wait missed: {e}");
                    SyncOutcome::Missed(e)
                }
            }
        } else {
            SyncOutcome::Skipped
        };

        self.state.flush_count = self.state.flush_count.wrapping_add(1);
        log::trace!("Region {} of frame ({outcome:?})", self.state.flush_count);
        outcome
    }

    /// Mark the current frame as fully transported
    pub fn flush_complete(&mut self) {
        self.state.frame_start = true;
        self.state.flush_count = 0;
        self.completed_flushes = self.completed_flushes.wrapping_add(1);

        if self.completed_flushes % STATS_LOG_INTERVAL == 0 {
            log::info!(
                "TE stats: {} synced, {} timeouts over {} flushes",
                self.state.sync_count,
                self.state.timeout_count,
                self.completed_flushes
            );
        }
    }

    /// Current state
    pub fn state(&self) -> FrameSyncState {
        self.state
    }

    /// Cumulative statistics
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            syncs: self.state.sync_count,
            timeouts: self.state.timeout_count,
            completed_flushes: self.completed_flushes,
        }
    }

    /// Timeout applied to the once-per-frame wait
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}

impl Default for FrameSync {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TE_TIMEOUT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Waiter that answers from a fixed result and counts calls
    struct ScriptedWaiter {
        result: Result<(), TeError>,
        calls: u32,
        last_timeout: Option<u32>,
    }

    impl ScriptedWaiter {
        fn new(result: Result<(), TeError>) -> Self {
            Self {
                result,
                calls: 0,
                last_timeout: None,
            }
        }
    }

    impl TeWait for ScriptedWaiter {
        fn wait_te(&mut self, timeout_ms: u32) -> Result<(), TeError> {
            self.calls += 1;
            self.last_timeout = Some(timeout_ms);
            self.result
        }
    }

    #[test]
    fn test_initial_state_is_frame_start() {
        let sync = FrameSync::new(100);
        assert_eq!(sync.state(), FrameSyncState::default());
        assert!(sync.state().frame_start);
    }

    #[test]
    fn test_waits_once_per_frame() {
        let mut sync = FrameSync::new(100);
        let mut waiter = ScriptedWaiter::new(Ok(()));

        assert_eq!(sync.before_region(&mut waiter), SyncOutcome::Synced);
        for _ in 0..4 {
            assert_eq!(sync.before_region(&mut waiter), SyncOutcome::Skipped);
        }

        assert_eq!(waiter.calls, 1);
        assert_eq!(waiter.last_timeout, Some(100));
        let state = sync.state();
        assert!(!state.frame_start);
        assert_eq!(state.flush_count, 5);
        assert_eq!(state.sync_count, 1);
        assert_eq!(state.timeout_count, 0);
    }

    #[test]
    fn test_flush_complete_resets_frame() {
        let mut sync = FrameSync::new(100);
        let mut waiter = ScriptedWaiter::new(Ok(()));
        sync.before_region(&mut waiter);
        sync.before_region(&mut waiter);

        sync.flush_complete();
        let state = sync.state();
        assert!(state.frame_start);
        assert_eq!(state.flush_count, 0);

        // Next frame waits again
        sync.before_region(&mut waiter);
        assert_eq!(waiter.calls, 2);
        assert_eq!(sync.stats().syncs, 2);
        assert_eq!(sync.stats().completed_flushes, 1);
    }

    #[test]
    fn test_timeout_is_counted_and_frame_proceeds() {
        let mut sync = FrameSync::new(1);
        let mut waiter = ScriptedWaiter::new(Err(TeError::TimedOut));

        assert_eq!(
            sync.before_region(&mut waiter),
            SyncOutcome::Missed(TeError::TimedOut)
        );
        assert_eq!(sync.before_region(&mut waiter), SyncOutcome::Skipped);

        let state = sync.state();
        assert_eq!(state.timeout_count, 1);
        assert_eq!(state.sync_count, 0);
        assert_eq!(state.flush_count, 2);
    }

    #[test]
    fn test_invalid_state_counts_as_miss() {
        let mut sync = FrameSync::default();
        let mut waiter = ScriptedWaiter::new(Err(TeError::InvalidState));
        assert_eq!(
            sync.before_region(&mut waiter),
            SyncOutcome::Missed(TeError::InvalidState)
        );
        assert_eq!(sync.stats().timeouts, 1);
        assert_eq!(sync.timeout_ms(), crate::config::DEFAULT_TE_TIMEOUT_MS);
    }

    #[test]
    fn test_flush_complete_without_regions() {
        let mut sync = FrameSync::new(100);
        sync.flush_complete();
        sync.flush_complete();
        assert_eq!(
            sync.stats(),
            SyncStats {
                syncs: 0,
                timeouts: 0,
                completed_flushes: 2
            }
        );
        assert!(sync.state().frame_start);
    }
}
