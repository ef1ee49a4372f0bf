//! End-to-end flush pipeline tests
//!
//! A background thread stands in for the TE interrupt, firing
//! `TearingSignal::on_edge` while the test thread renders.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use co5300::command::{MEMORY_WRITE, PAGE_ADDRESS_SET};
use co5300::{
    Area, Builder, Clock, Dimensions, Edge, EdgeInterruptPin, FlushEngine, Panel, PanelInterface,
    SyncMode, TeError, TeMode, TeSyncedTarget, TearingMonitor, TearingSignal, tearing,
};
use embedded_hal::delay::DelayNs;

/// Delay backed by the OS scheduler
#[derive(Clone, Copy)]
struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Delay that sleeps whole milliseconds, like a 1 kHz RTOS tick
#[derive(Clone, Copy)]
struct TickDelay;

impl DelayNs for TickDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_millis(u64::from(ns.div_ceil(1_000_000))));
    }
}

/// Monotonic clock counting from its creation
#[derive(Clone, Copy)]
struct StdClock(Instant);

impl StdClock {
    fn new() -> Self {
        Self(Instant::now())
    }
}

impl Clock for StdClock {
    fn now(&mut self) -> tearing::Instant {
        let micros = u64::try_from(self.0.elapsed().as_micros()).unwrap_or(u64::MAX);
        tearing::Instant::from_ticks(micros)
    }
}

/// TE pin whose edges are produced by the test itself
struct SimulatedTePin;

impl EdgeInterruptPin for SimulatedTePin {
    type Error = Infallible;

    fn listen(&mut self, _edge: Edge) -> Result<(), Infallible> {
        Ok(())
    }

    fn unlisten(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Bus that records row windows and pixel writes
#[derive(Debug, Default)]
struct RecordingBus {
    row_windows: Vec<(u16, u16)>,
    pixel_writes: usize,
}

impl PanelInterface for RecordingBus {
    type Error = Infallible;

    fn send_command(&mut self, command: u8, params: &[u8]) -> Result<(), Infallible> {
        if command == PAGE_ADDRESS_SET {
            let start = u16::from_be_bytes([params[0], params[1]]);
            let end = u16::from_be_bytes([params[2], params[3]]);
            self.row_windows.push((start, end));
        }
        Ok(())
    }

    fn send_pixels(&mut self, command: u8, _pixels: &[u8]) -> Result<(), Infallible> {
        if command == MEMORY_WRITE {
            self.pixel_writes += 1;
        }
        Ok(())
    }

    fn reset<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), Infallible> {
        Ok(())
    }
}

type Monitor<D> = TearingMonitor<'static, SimulatedTePin, D, StdClock>;
type Engine = FlushEngine<TeSyncedTarget<RecordingBus, Monitor<StdDelay>>>;

fn monitor<D: DelayNs>(signal: &'static TearingSignal, delay: D) -> Monitor<D> {
    let clock = StdClock::new();
    TearingMonitor::new(SimulatedTePin, Edge::Rising, TeMode::VBlank, signal, delay, clock).unwrap()
}

fn engine(signal: &'static TearingSignal, te_timeout_ms: u32) -> Engine {
    let config = Builder::new()
        .dimensions(Dimensions::panel())
        .gap(0, 0)
        .sync(SyncMode::Enabled(TeMode::VBlank))
        .te_timeout_ms(te_timeout_ms)
        .build()
        .unwrap();
    let flush_config = config.flush_config();

    let mut panel = Panel::new(RecordingBus::default(), config);
    panel.init(&mut StdDelay).unwrap();
    // Drop the bring-up window
    panel.raw_handles().unwrap().row_windows.clear();

    let target = TeSyncedTarget::new(panel, monitor(signal, StdDelay)).unwrap();
    FlushEngine::new(target, flush_config)
}

fn into_bus(engine: Engine) -> RecordingBus {
    let (panel, _monitor) = engine.release().release();
    panel.release()
}

/// Fire TE edges at roughly 60 Hz until the returned flag is cleared
fn start_vsync(signal: &'static TearingSignal) -> (Arc<AtomicBool>, thread::JoinHandle<()>) {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let handle = thread::spawn(move || {
        while flag.load(Ordering::Relaxed) {
            signal.on_edge();
            thread::sleep(Duration::from_millis(16));
        }
    });
    (running, handle)
}

#[test]
fn one_wait_per_flush_while_vsync_runs() {
    static SIGNAL: TearingSignal = TearingSignal::new();
    let mut engine = engine(&SIGNAL, 100);
    let (running, vsync) = start_vsync(&SIGNAL);

    let area = Area::new(0, 0, 409, 89);
    let mut pixels = vec![0u8; area.byte_len()];
    let mut acks = 0;
    for _ in 0..5 {
        engine.flush(area, &mut pixels, &mut || acks += 1).unwrap();
        assert!(engine.target().state().frame_start);
    }

    running.store(false, Ordering::Relaxed);
    vsync.join().unwrap();

    let stats = engine.target().stats();
    assert_eq!(acks, 5);
    assert_eq!(stats.completed_flushes, 5);
    assert_eq!(stats.syncs + stats.timeouts, 5);
    assert_eq!(stats.syncs, 5);

    let bus = into_bus(engine);
    assert_eq!(bus.pixel_writes, 15);
}

#[test]
fn edges_before_a_wait_coalesce() {
    static SIGNAL: TearingSignal = TearingSignal::new();
    let mut monitor = monitor(&SIGNAL, StdDelay);

    let isr = thread::spawn(|| {
        for _ in 0..10 {
            SIGNAL.on_edge();
        }
    });
    isr.join().unwrap();

    assert_eq!(monitor.wait(10), Ok(()));
    assert_eq!(monitor.wait(1), Err(TeError::TimedOut));
    assert_eq!(monitor.wait(1), Err(TeError::TimedOut));
}

#[test]
fn wait_wakes_on_edge_from_another_thread() {
    static SIGNAL: TearingSignal = TearingSignal::new();
    let mut monitor = monitor(&SIGNAL, StdDelay);

    let isr = thread::spawn(|| {
        thread::sleep(Duration::from_millis(5));
        SIGNAL.on_edge();
    });

    let started = Instant::now();
    assert_eq!(monitor.wait(2_000), Ok(()));
    assert!(started.elapsed() < Duration::from_millis(1_000));
    isr.join().unwrap();
}

#[test]
fn timeout_holds_with_millisecond_tick_delay() {
    static SIGNAL: TearingSignal = TearingSignal::new();
    let mut monitor = monitor(&SIGNAL, TickDelay);

    let started = Instant::now();
    assert_eq!(monitor.wait(20), Err(TeError::TimedOut));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(20));
    assert!(elapsed < Duration::from_millis(150));
}

#[test]
fn timeout_is_bounded_and_flush_still_draws() {
    static SIGNAL: TearingSignal = TearingSignal::new();
    let mut engine = engine(&SIGNAL, 1);

    let started = Instant::now();
    assert_eq!(engine.target_mut().wait_te_signal(1), Err(TeError::TimedOut));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1));
    assert!(elapsed < Duration::from_millis(250));

    let area = Area::new(0, 0, 409, 9);
    let mut pixels = vec![0u8; area.byte_len()];
    engine.flush(area, &mut pixels, &mut || {}).unwrap();

    let stats = engine.target().stats();
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.syncs, 0);
    assert_eq!(into_bus(engine).pixel_writes, 1);
}

#[test]
fn pending_edge_syncs_two_slice_flush() {
    static SIGNAL: TearingSignal = TearingSignal::new();
    let mut engine = engine(&SIGNAL, 100);
    assert!(engine.target().state().frame_start);

    thread::spawn(|| SIGNAL.on_edge()).join().unwrap();

    let area = Area::new(0, 0, 409, 59);
    let mut pixels = vec![0u8; area.byte_len()];
    engine.flush(area, &mut pixels, &mut || {}).unwrap();

    let stats = engine.target().stats();
    assert_eq!(stats.syncs, 1);
    assert_eq!(stats.timeouts, 0);
    assert!(!SIGNAL.is_pending());

    let bus = into_bus(engine);
    assert_eq!(bus.pixel_writes, 2);
    assert_eq!(bus.row_windows, [(0, 29), (30, 59)]);
}
