//! Tearing effect (TE) signal monitoring
//!
//! The CO5300 pulses its TE output at the start of vertical blanking. This
//! module turns those edges into a software-waitable event:
//!
//! - [`TearingSignal`] is a single-slot binary signal meant to live in a
//!   `static`. The GPIO interrupt handler calls [`TearingSignal::on_edge`];
//!   the rendering task consumes it.
//! - [`TearingMonitor`] owns the TE pin, claims the signal and blocks on it
//!   with a timeout measured on a [`Clock`].
//!
//! The slot holds at most one pending assertion. Edges that arrive while
//! nobody waits overwrite each other, so a late waiter sees the most recent
//! blanking period rather than a backlog.
//!
//! ## Example
//!
//! ```rust,no_run
//! use co5300::tearing::Instant;
//! use co5300::{Edge, EdgeInterruptPin, TeMode, TearingMonitor, TearingSignal};
//! # use core::convert::Infallible;
//! # use embedded_hal::delay::DelayNs;
//! # struct TePin;
//! # impl EdgeInterruptPin for TePin {
//! #     type Error = Infallible;
//! #     fn listen(&mut self, _edge: Edge) -> Result<(), Self::Error> { Ok(()) }
//! #     fn unlisten(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct RtosDelay;
//! # impl DelayNs for RtosDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # fn system_time_us() -> u64 { 0 }
//! static TE_SIGNAL: TearingSignal = TearingSignal::new();
//!
//! // In the GPIO interrupt handler:
//! fn te_isr() {
//!     TE_SIGNAL.on_edge();
//! }
//!
//! // Any monotonic microsecond counter will do
//! let clock = || Instant::from_ticks(system_time_us());
//!
//! let mut monitor = match TearingMonitor::new(
//!     TePin,
//!     Edge::Rising,
//!     TeMode::VBlank,
//!     &TE_SIGNAL,
//!     RtosDelay,
//!     clock,
//! ) {
//!     Ok(monitor) => monitor,
//!     Err(_) => return,
//! };
//! let _ = monitor.wait(100);
//! ```

use core::fmt::Debug;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use embedded_hal::delay::DelayNs;
use fugit::{MicrosDurationU64, TimerInstantU64};

use crate::config::TeMode;

/// Polling interval of [`TearingMonitor::wait`] in microseconds
pub const TE_POLL_INTERVAL_US: u32 = 50;

/// Edges per release in [`TeMode::VBlankAndHBlank`]
///
/// The panel pulses once per line in that mode; 502 lines per frame, with
/// some tolerance for missed edges.
pub const TE_HBLANK_FILTER_EDGES: u32 = 500;

/// Microsecond timestamp
pub type Instant = TimerInstantU64<1_000_000>;

/// Monotonic time source bounding TE waits
///
/// Closures returning an [`Instant`] implement this, so a HAL's system timer
/// can be passed as `|| Instant::from_ticks(now_us())`.
pub trait Clock {
    /// Current time; must never go backwards
    fn now(&mut self) -> Instant;
}

impl<F> Clock for F
where
    F: FnMut() -> Instant,
{
    fn now(&mut self) -> Instant {
        self()
    }
}

/// Errors from tearing signal setup and waits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeError {
    /// The TE pin could not be configured for edge interrupts
    HardwareConfig,
    /// The signal slot is already claimed by another monitor
    ResourceExhausted,
    /// The signal is not set up, the panel is not initialized, or the panel
    /// has TE output disabled
    InvalidState,
    /// The monitor filters edges for a different TE mode than the panel emits
    ModeMismatch {
        /// Mode the panel is configured with
        panel: TeMode,
        /// Mode the monitor was created with
        monitor: TeMode,
    },
    /// No TE edge arrived before the deadline
    TimedOut,
}

impl core::fmt::Display for TeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HardwareConfig => write!(f, "TE pin configuration failed"),
            Self::ResourceExhausted => write!(f, "TE signal already in use"),
            Self::InvalidState => write!(f, "TE signal not initialized"),
            Self::ModeMismatch { panel, monitor } => {
                write!(f, "TE mode mismatch: panel {panel:?}, monitor {monitor:?}")
            }
            Self::TimedOut => write!(f, "Timeout waiting for TE signal"),
        }
    }
}

impl core::error::Error for TeError {}

/// Edge that triggers the TE interrupt
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Edge {
    /// Low to high; start of blanking
    #[default]
    Rising,
    /// High to low; end of blanking
    Falling,
    /// Both edges
    Any,
}

/// Input pin that can deliver edge interrupts
///
/// embedded-hal has no interrupt configuration trait, so platforms implement
/// this on their GPIO input type. `listen` must route the edge to a handler
/// that calls [`TearingSignal::on_edge`].
pub trait EdgeInterruptPin {
    /// Error type for pin configuration
    type Error: Debug;

    /// Enable edge interrupts on this pin
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the pin configuration.
    fn listen(&mut self, edge: Edge) -> Result<(), Self::Error>;

    /// Disable edge interrupts on this pin
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the pin configuration.
    fn unlisten(&mut self) -> Result<(), Self::Error>;
}

/// Something that can block until the next tearing signal
///
/// Implemented by [`TearingMonitor`]. Platforms with a blocking primitive
/// (an RTOS semaphore given from the ISR) can implement it directly for
/// wake-up latency below one scheduler tick.
pub trait TeWait {
    /// Block until a TE edge arrives or `timeout_ms` elapses (0 waits forever)
    ///
    /// # Errors
    ///
    /// Returns [`TeError::TimedOut`] on expiry.
    fn wait_te(&mut self, timeout_ms: u32) -> Result<(), TeError>;

    /// TE mode the waiter filters edges for, if it knows
    fn te_mode(&self) -> Option<TeMode> {
        None
    }
}

/// Single-slot binary signal set from interrupt context
///
/// Capacity is one: repeated [`on_edge`](Self::on_edge) calls without a
/// consumer leave exactly one pending assertion.
#[derive(Debug)]
pub struct TearingSignal {
    /// An assertion is waiting to be consumed
    pending: AtomicBool,
    /// Owned by a monitor
    claimed: AtomicBool,
    /// Edges seen since the last release
    edges: AtomicU32,
    /// Edges required per release
    edges_per_release: AtomicU32,
}

impl TearingSignal {
    /// Create an unclaimed, empty signal
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            claimed: AtomicBool::new(false),
            edges: AtomicU32::new(0),
            edges_per_release: AtomicU32::new(1),
        }
    }

    /// Record a TE edge; call from the GPIO interrupt handler
    ///
    /// Never blocks, allocates or logs. Returns `true` when the edge released
    /// the slot, so the caller can request a context switch on interrupt exit
    /// if its platform needs one. Edges on an unclaimed signal are ignored.
    pub fn on_edge(&self) -> bool {
        if !self.claimed.load(Ordering::Acquire) {
            return false;
        }
        let seen = self.edges.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if seen < self.edges_per_release.load(Ordering::Relaxed) {
            return false;
        }
        self.edges.store(0, Ordering::Relaxed);
        self.pending.store(true, Ordering::Release);
        true
    }

    /// Consume the pending assertion, if any
    pub fn try_take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether an assertion is waiting to be consumed
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether a monitor currently owns this signal
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    fn claim(&self, mode: TeMode) -> Result<(), TeError> {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TeError::ResourceExhausted);
        }
        let edges_per_release = match mode {
            TeMode::VBlank => 1,
            TeMode::VBlankAndHBlank => TE_HBLANK_FILTER_EDGES,
        };
        self.edges_per_release.store(edges_per_release, Ordering::Relaxed);
        self.edges.store(0, Ordering::Relaxed);
        self.pending.store(false, Ordering::Release);
        Ok(())
    }

    fn unclaim(&self) {
        self.pending.store(false, Ordering::Release);
        self.claimed.store(false, Ordering::Release);
    }
}

impl Default for TearingSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of the TE pin and consumer of its [`TearingSignal`]
///
/// Dropping the monitor disables the interrupt and frees the signal, same as
/// [`release`](Self::release) minus getting the pin back.
///
/// ## Type Parameters
///
/// * `P` - TE input pin implementing [`EdgeInterruptPin`]
/// * `D` - Delay used between polls. On an RTOS this should yield
///   (e.g. a task delay) so the wait does not spin the core. Its
///   granularity bounds how late an edge or a timeout is noticed.
/// * `C` - [`Clock`] the timeout is measured on
pub struct TearingMonitor<'s, P, D, C>
where
    P: EdgeInterruptPin,
{
    /// TE input pin; `None` once released
    pin: Option<P>,
    /// Slot released by the interrupt handler
    signal: &'s TearingSignal,
    /// Delay between polls
    delay: D,
    /// Time source for deadlines
    clock: C,
    /// Mode the signal filters edges for
    mode: TeMode,
}

impl<'s, P, D, C> TearingMonitor<'s, P, D, C>
where
    P: EdgeInterruptPin,
    D: DelayNs,
    C: Clock,
{
    /// Claim `signal` and enable edge interrupts on `pin`
    ///
    /// `mode` must match the TE mode the panel is configured with.
    ///
    /// # Errors
    ///
    /// - [`TeError::ResourceExhausted`] if another monitor holds `signal`
    /// - [`TeError::HardwareConfig`] if the pin rejects the interrupt setup;
    ///   the signal is released again before returning
    pub fn new(
        mut pin: P,
        edge: Edge,
        mode: TeMode,
        signal: &'s TearingSignal,
        delay: D,
        clock: C,
    ) -> Result<Self, TeError> {
        signal.claim(mode).inspect_err(|_| {
            log::error!("TE signal already claimed");
        })?;

        if let Err(e) = pin.listen(edge) {
            log::error!("TE pin config failed: {e:?}");
            signal.unclaim();
            return Err(TeError::HardwareConfig);
        }

        log::info!("TE configured (edge: {edge:?}, mode: 0x{:02X})", mode as u8);
        Ok(Self {
            pin: Some(pin),
            signal,
            delay,
            clock,
            mode,
        })
    }

    /// Block until the next TE assertion or until `timeout_ms` elapses
    ///
    /// A `timeout_ms` of 0 waits forever. An assertion that arrived before
    /// this call is consumed immediately. The deadline is checked against
    /// the clock after every poll, so a coarse delay overshoots it by at most
    /// one delay period.
    ///
    /// # Errors
    ///
    /// - [`TeError::TimedOut`] if no assertion arrived in time
    /// - [`TeError::InvalidState`] if the signal lost its claim
    pub fn wait(&mut self, timeout_ms: u32) -> Result<(), TeError> {
        if !self.signal.is_claimed() {
            return Err(TeError::InvalidState);
        }

        let timeout = MicrosDurationU64::millis(u64::from(timeout_ms));
        let start = self.clock.now();

        loop {
            if self.signal.try_take() {
                return Ok(());
            }

            if timeout_ms > 0 {
                let elapsed = self
                    .clock
                    .now()
                    .checked_duration_since(start)
                    .unwrap_or(MicrosDurationU64::from_ticks(0));
                if elapsed >= timeout {
                    log::warn!("TE timeout ({timeout_ms} ms)");
                    return Err(TeError::TimedOut);
                }
            }

            self.delay.delay_us(TE_POLL_INTERVAL_US);
        }
    }

    /// The signal this monitor consumes
    pub fn signal(&self) -> &'s TearingSignal {
        self.signal
    }

    /// TE mode the signal filters edges for
    pub fn mode(&self) -> TeMode {
        self.mode
    }

    /// Disable the interrupt, free the signal and return the pin
    ///
    /// # Errors
    ///
    /// Returns [`TeError::HardwareConfig`] if the interrupt could not be
    /// disabled. The signal is freed regardless.
    pub fn release(mut self) -> Result<P, TeError> {
        let Some(mut pin) = self.pin.take() else {
            return Err(TeError::InvalidState);
        };
        let result = pin.unlisten();
        self.signal.unclaim();
        match result {
            Ok(()) => Ok(pin),
            Err(e) => {
                log::error!("TE pin unlisten failed: {e:?}");
                Err(TeError::HardwareConfig)
            }
        }
    }
}

impl<P, D, C> TeWait for TearingMonitor<'_, P, D, C>
where
    P: EdgeInterruptPin,
    D: DelayNs,
    C: Clock,
{
    fn wait_te(&mut self, timeout_ms: u32) -> Result<(), TeError> {
        self.wait(timeout_ms)
    }

    fn te_mode(&self) -> Option<TeMode> {
        Some(self.mode)
    }
}

impl<P, D, C> Drop for TearingMonitor<'_, P, D, C>
where
    P: EdgeInterruptPin,
{
    fn drop(&mut self) {
        if let Some(mut pin) = self.pin.take() {
            if let Err(e) = pin.unlisten() {
                log::error!("TE pin unlisten failed: {e:?}");
            }
            self.signal.unclaim();
        }
    }
}
