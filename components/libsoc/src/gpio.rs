//! GPIO lines
//!
//! A `Gpio` is configured as input or output when it is opened. Inputs can be configured to
//! detect edges, which can then be waited for with `poll` and `wait_for_interrupt`, or handled by
//! a background thread started with `start_interrupt_handler`.

use std::cmp;
use std::convert::TryFrom;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use crate::backend::{RawHandle, INT_TIMEOUT, INT_TRIGGERED};
use crate::error::*;
use crate::resource::{check, Resource, Slot};
use crate::{Ownership, Soc};

/// Interval at which an interrupt handler checks whether it should stop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

raw_enum! {
    pub enum Direction {
        Input = 0 => "in" | "input",
        Output = 1 => "out" | "output",
    }
}

raw_enum! {
    /// Value read from or written to a GPIO line.
    pub enum Level {
        Low = 0 => "low" | "0",
        High = 1 => "high" | "1",
    }
}

impl From<bool> for Level {
    fn from(val: bool) -> Level {
        if val {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<u8> for Level {
    fn from(val: u8) -> Level {
        Level::from(val != 0)
    }
}

raw_enum! {
    /// The transition on an input that counts as an interrupt.
    pub enum Edge {
        Rising = 0 => "rising",
        Falling = 1 => "falling",
        None = 2 => "none",
        Both = 3 => "both",
    }
}

impl Default for Edge {
    fn default() -> Edge {
        Edge::None
    }
}

#[derive(Copy, Clone, Debug)]
struct Config {
    direction: Direction,
    edge: Edge,
}

/// A single GPIO line.
pub struct Gpio {
    soc: Soc,
    id: u32,
    ownership: Ownership,
    config: Mutex<Config>,
    slot: Slot,
}

impl Gpio {
    /// Describe GPIO `id`. Nothing is requested until `open` is called.
    pub fn new(soc: &Soc, id: u32, direction: Direction) -> Gpio {
        Gpio {
            soc: soc.clone(),
            id,
            ownership: Ownership::default(),
            config: Mutex::new(Config {
                direction,
                edge: Edge::None,
            }),
            slot: Slot::new(),
        }
    }

    /// The edge to detect once opened. Only applied to inputs.
    pub fn edge(self, edge: Edge) -> Gpio {
        self.config_mut(|config| config.edge = edge);
        self
    }

    pub fn ownership(mut self, ownership: Ownership) -> Gpio {
        self.ownership = ownership;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Request the line and apply the configured direction and edge.
    pub fn open(&self) -> Result<()> {
        let backend = self.soc.backend();
        let Config { direction, edge } = self.config();
        self.slot.open(|| {
            let handle = backend
                .gpio_request(self.id, self.ownership.to_raw())
                .ok_or_else(|| Error::Unavailable(format!("Unable to open {}", self)))?;
            if let Err(err) = self.configure(handle, direction, edge) {
                if backend.gpio_free(handle) != 0 {
                    warn!(gpio = self.id, "could not free after failed configuration");
                }
                return Err(err);
            }
            debug!(gpio = self.id, %direction, %edge, ownership = %self.ownership, "opened");
            Ok(handle)
        })
    }

    pub fn close(&self) -> Result<()> {
        let backend = self.soc.backend();
        self.slot.close(|handle| {
            debug!(gpio = self.id, "closing");
            check(backend.gpio_free(handle), || {
                format!("Unable to free {}", self)
            })
        })
    }

    pub fn is_open(&self) -> bool {
        self.slot.is_open()
    }

    /// Reconfigure the direction, `edge` is applied if `direction` is `Input`.
    pub fn set_direction(&self, direction: Direction, edge: Edge) -> Result<()> {
        self.slot.with(|handle| self.configure(handle, direction, edge))?;
        self.config_mut(|config| config.edge = edge);
        Ok(())
    }

    /// The direction as reported by the line itself.
    pub fn direction(&self) -> Result<Direction> {
        let raw = self.slot.with(|handle| Ok(self.soc.backend().gpio_get_direction(handle)))?;
        Direction::try_from(raw)
            .map_err(|_| Error::Operation(format!("Error reading {} direction", self)))
    }

    pub fn set_edge(&self, edge: Edge) -> Result<()> {
        self.require(Direction::Input, "configure the edge of")?;
        self.slot.with(|handle| {
            check(self.soc.backend().gpio_set_edge(handle, edge.to_raw()), || {
                format!("Error setting edge for {}", self)
            })
        })?;
        self.config_mut(|config| config.edge = edge);
        Ok(())
    }

    /// The edge as reported by the line itself.
    pub fn get_edge(&self) -> Result<Edge> {
        self.require(Direction::Input, "read the edge of")?;
        let raw = self.slot.with(|handle| Ok(self.soc.backend().gpio_get_edge(handle)))?;
        Edge::try_from(raw).map_err(|_| Error::Operation(format!("Error reading {} edge", self)))
    }

    pub fn set_level<T: Into<Level>>(&self, level: T) -> Result<()> {
        self.require(Direction::Output, "drive")?;
        let level = level.into();
        self.slot.with(|handle| {
            check(self.soc.backend().gpio_set_level(handle, level.to_raw()), || {
                format!("Error setting {} {}", self, level)
            })
        })
    }

    pub fn set_high(&self) -> Result<()> {
        self.set_level(Level::High)
    }

    pub fn set_low(&self) -> Result<()> {
        self.set_level(Level::Low)
    }

    pub fn level(&self) -> Result<Level> {
        let raw = self.slot.with(|handle| Ok(self.soc.backend().gpio_get_level(handle)))?;
        Level::try_from(raw).map_err(|_| Error::Operation(format!("Error reading {} level", self)))
    }

    pub fn is_high(&self) -> Result<bool> {
        Ok(self.level()? == Level::High)
    }

    /// Wait for the configured edge.
    ///
    /// Returns whether the edge occurred before the timeout passed. `None` waits indefinitely.
    pub fn poll(&self, timeout: Option<Duration>) -> Result<bool> {
        let raw = self.slot.with(|handle| {
            Ok(self.soc.backend().gpio_poll(handle, timeout_ms(timeout)))
        })?;
        self.interrupt_result(raw, "polling")
    }

    /// Like `poll`, but the line must be an input and the library also verifies that an edge is
    /// configured.
    pub fn wait_for_interrupt(&self, timeout: Option<Duration>) -> Result<bool> {
        self.require(Direction::Input, "wait for interrupts on")?;
        let raw = self.slot.with(|handle| {
            Ok(self.soc.backend().gpio_wait_interrupt(handle, timeout_ms(timeout)))
        })?;
        self.interrupt_result(raw, "waiting for interrupt on")
    }

    /// Spawn a thread that calls `callback` each time the configured edge occurs.
    ///
    /// See `start_interrupt_handler_every`, this uses `DEFAULT_POLL_INTERVAL`.
    pub fn start_interrupt_handler<F>(self: &Arc<Self>, callback: F) -> Result<InterruptHandler>
    where
        F: FnMut() + Send + 'static,
    {
        self.start_interrupt_handler_every(DEFAULT_POLL_INTERVAL, callback)
    }

    /// Spawn a thread that calls `callback` each time the configured edge occurs.
    ///
    /// The thread polls with `interval` as timeout and checks whether it has been stopped between
    /// polls, so stopping it may take up to one interval. This returns once the thread is running.
    ///
    /// A failed poll is retried after one interval, a signal can interrupt the native poll. The
    /// thread only ends by itself once the GPIO is closed.
    pub fn start_interrupt_handler_every<F>(
        self: &Arc<Self>,
        interval: Duration,
        mut callback: F,
    ) -> Result<InterruptHandler>
    where
        F: FnMut() + Send + 'static,
    {
        self.require(Direction::Input, "handle interrupts on")?;
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel();

        let gpio = Arc::clone(self);
        let thread_running = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name(format!("gpio{}-interrupt", self.id))
            .spawn(move || {
                let _ = ready_tx.send(());
                while thread_running.load(Ordering::SeqCst) {
                    match gpio.poll(Some(interval)) {
                        Ok(true) => {
                            debug!(gpio = gpio.id, "caught interrupt");
                            callback();
                        }
                        Ok(false) => {}
                        Err(Error::Closed) => {
                            warn!(gpio = gpio.id, "closed, interrupt handler stopped");
                            thread_running.store(false, Ordering::SeqCst);
                            return Err(Error::Closed);
                        }
                        Err(err) => {
                            warn!(gpio = gpio.id, %err, "poll failed, retrying");
                            thread::sleep(interval);
                        }
                    }
                }
                Ok(())
            })?;
        let _ = ready_rx.recv();

        Ok(InterruptHandler {
            running,
            thread: Some(thread),
        })
    }

    fn configure(&self, handle: RawHandle, direction: Direction, edge: Edge) -> Result<()> {
        let backend = self.soc.backend();
        check(backend.gpio_set_direction(handle, direction.to_raw()), || {
            format!("Error setting direction for {}", self)
        })?;
        self.config_mut(|config| config.direction = direction);
        if direction == Direction::Input {
            check(backend.gpio_set_edge(handle, edge.to_raw()), || {
                format!("Error setting edge for {}", self)
            })?;
        }
        Ok(())
    }

    fn interrupt_result(&self, raw: i32, action: &str) -> Result<bool> {
        match raw {
            INT_TRIGGERED => Ok(true),
            INT_TIMEOUT => Ok(false),
            _ => Err(Error::Operation(format!("Error {} {}", action, self))),
        }
    }

    fn require(&self, direction: Direction, action: &str) -> Result<()> {
        if self.config().direction == direction {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "can not {} {}, it is not configured as {}",
                action, self, direction
            )))
        }
    }

    fn config(&self) -> Config {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn config_mut<F: FnOnce(&mut Config)>(&self, f: F) {
        f(&mut self.config.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl fmt::Display for Gpio {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GPIO_{}", self.id)
    }
}

impl fmt::Debug for Gpio {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let config = self.config();
        f.debug_struct("Gpio")
            .field("id", &self.id)
            .field("direction", &config.direction)
            .field("edge", &config.edge)
            .field("ownership", &self.ownership)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Resource for Gpio {
    fn open(&self) -> Result<()> {
        Gpio::open(self)
    }

    fn close(&self) -> Result<()> {
        Gpio::close(self)
    }

    fn is_open(&self) -> bool {
        Gpio::is_open(self)
    }
}

impl Drop for Gpio {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            // best effort
            warn!(gpio = self.id, %err, "could not close on drop");
        }
    }
}

/// A background thread started by `Gpio::start_interrupt_handler`.
///
/// Dropping the handler stops the thread and waits for it to exit.
pub struct InterruptHandler {
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl InterruptHandler {
    /// Ask the thread to stop. It will do so after its current poll returns.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the thread is still polling. False after `stop` or once the GPIO was closed.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the thread and wait for it to exit.
    ///
    /// Returns `Closed` if the loop ended because the GPIO was closed.
    pub fn join(mut self) -> Result<()> {
        self.stop();
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .unwrap_or_else(|_| Err(Error::Operation("interrupt handler panicked".to_string()))),
            None => Ok(()),
        }
    }
}

impl Drop for InterruptHandler {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn timeout_ms(timeout: Option<Duration>) -> i32 {
    match timeout {
        Some(t) => cmp::min(t.as_millis(), i32::max_value() as u128) as i32,
        None => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;
    use crate::sim::SimBoard;

    macro_rules! timeout {
        ($timeout:expr, $block:block) => {
            let (tx, rx) = mpsc::sync_channel(1);
            thread::spawn(move || {
                $block;
                let _ = tx.send(());
            });
            if let Err(_) = rx.recv_timeout($timeout) {
                panic!("Timeout expired");
            }
        };
    }

    fn board(ids: &[u32]) -> (Arc<SimBoard>, Soc) {
        let board = Arc::new(SimBoard::new());
        for &id in ids {
            board.add_gpio(id);
        }
        let soc = Soc::shared(Arc::clone(&board));
        (board, soc)
    }

    #[test]
    fn lifecycle() {
        let (_, soc) = board(&[4]);
        let gpio = Gpio::new(&soc, 4, Direction::Output);
        match gpio.set_high() {
            Err(Error::Closed) => {}
            other => panic!("expected Closed, got {:?}", other),
        }
        gpio.open().unwrap();
        match gpio.open() {
            Err(Error::AlreadyOpen) => {}
            other => panic!("expected AlreadyOpen, got {:?}", other),
        }
        gpio.close().unwrap();
        gpio.close().unwrap();
        assert!(!gpio.is_open());
        gpio.open().unwrap();
        assert!(gpio.is_open());
    }

    #[test]
    fn missing_line_is_unavailable() {
        let (_, soc) = board(&[]);
        let gpio = Gpio::new(&soc, 99, Direction::Input);
        match gpio.open() {
            Err(err @ Error::Unavailable(_)) => {
                assert!(err.is_io());
                assert_eq!(err.to_string(), "Unable to open GPIO_99");
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
        assert!(!gpio.is_open());
    }

    #[test]
    fn weak_request_of_held_line_fails() {
        let (_, soc) = board(&[8]);
        let first = Gpio::new(&soc, 8, Direction::Output);
        first.open().unwrap();

        let weak = Gpio::new(&soc, 8, Direction::Input).ownership(Ownership::Weak);
        assert!(weak.open().is_err());
        let shared = Gpio::new(&soc, 8, Direction::Output);
        shared.open().unwrap();

        first.close().unwrap();
        shared.close().unwrap();
        weak.open().unwrap();
    }

    #[test]
    fn levels_follow_linked_output() {
        let (board, soc) = board(&[1, 2]);
        board.link(1, 2);
        let out = Gpio::new(&soc, 1, Direction::Output);
        let inp = Gpio::new(&soc, 2, Direction::Input);
        crate::with_resources(&[&inp, &out], || {
            assert_eq!(inp.direction()?, Direction::Input);
            assert_eq!(out.direction()?, Direction::Output);

            out.set_high()?;
            assert!(out.is_high()?);
            assert!(inp.is_high()?);
            out.set_level(false)?;
            assert!(!out.is_high()?);
            assert_eq!(inp.level()?, Level::Low);
            Ok(())
        })
        .unwrap();
        assert!(!inp.is_open() && !out.is_open());
    }

    #[test]
    fn direction_preconditions() {
        let (_, soc) = board(&[3]);
        let gpio = Gpio::new(&soc, 3, Direction::Input);
        gpio.open().unwrap();
        match gpio.set_high() {
            Err(Error::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
        gpio.set_direction(Direction::Output, Edge::None).unwrap();
        gpio.set_low().unwrap();
        assert!(gpio.set_edge(Edge::Rising).is_err());
        assert!(gpio.wait_for_interrupt(Some(Duration::from_millis(1))).is_err());
    }

    #[test]
    fn edge_round_trip() {
        let (_, soc) = board(&[5]);
        let gpio = Gpio::new(&soc, 5, Direction::Input);
        gpio.open().unwrap();
        for &edge in &[Edge::Rising, Edge::Falling, Edge::Both, Edge::None] {
            gpio.set_edge(edge).unwrap();
            assert_eq!(gpio.get_edge().unwrap(), edge);
        }
    }

    #[test]
    fn poll_times_out_without_edges() {
        let (_, soc) = board(&[6]);
        let gpio = Gpio::new(&soc, 6, Direction::Input).edge(Edge::Both);
        gpio.open().unwrap();
        let start = Instant::now();
        assert!(!gpio.poll(Some(Duration::from_millis(20))).unwrap());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn wait_for_interrupt_requires_edge() {
        let (_, soc) = board(&[7]);
        let gpio = Gpio::new(&soc, 7, Direction::Input);
        gpio.open().unwrap();
        match gpio.wait_for_interrupt(Some(Duration::from_millis(1))) {
            Err(Error::Operation(msg)) => assert_eq!(msg, "Error waiting for interrupt on GPIO_7"),
            other => panic!("expected Operation, got {:?}", other),
        }
    }

    #[test]
    fn wait_for_falling_edge() {
        let (board, soc) = board(&[10, 11]);
        board.link(10, 11);
        let out = Gpio::new(&soc, 10, Direction::Output);
        let inp = Gpio::new(&soc, 11, Direction::Input).edge(Edge::Falling);
        out.open().unwrap();
        inp.open().unwrap();
        out.set_low().unwrap();

        timeout!(Duration::from_secs(5), {
            let signaller = thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                out.set_high().unwrap();
                out.set_low().unwrap();
                out
            });
            assert!(inp.wait_for_interrupt(Some(Duration::from_millis(1000))).unwrap());
            signaller.join().unwrap();
        });
    }

    #[test]
    fn interrupt_handler_counts_edges() {
        let (board, soc) = board(&[20, 21]);
        board.link(20, 21);
        let out = Gpio::new(&soc, 20, Direction::Output);
        out.open().unwrap();
        out.set_low().unwrap();
        let inp = Arc::new(Gpio::new(&soc, 21, Direction::Input).edge(Edge::Falling));
        inp.open().unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handler = inp
            .start_interrupt_handler_every(Duration::from_millis(10), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert!(handler.is_running());

        for _ in 0..20 {
            out.set_high().unwrap();
            out.set_low().unwrap();
        }
        let deadline = Instant::now() + Duration::from_secs(5);
        while hits.load(Ordering::SeqCst) < 20 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        handler.join().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn interrupt_handler_stops_within_interval() {
        let (_, soc) = board(&[30]);
        let inp = Arc::new(Gpio::new(&soc, 30, Direction::Input).edge(Edge::Rising));
        inp.open().unwrap();
        let handler = inp
            .start_interrupt_handler_every(Duration::from_millis(50), || {})
            .unwrap();
        let start = Instant::now();
        handler.stop();
        assert!(!handler.is_running());
        handler.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn interrupt_handler_survives_failed_poll() {
        let (board, soc) = board(&[31]);
        let inp = Arc::new(Gpio::new(&soc, 31, Direction::Input).edge(Edge::Rising));
        inp.open().unwrap();
        board.fail_gpio(31, 1);

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handler = inp
            .start_interrupt_handler_every(Duration::from_millis(10), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        board.drive(31, Level::High);
        let deadline = Instant::now() + Duration::from_secs(5);
        while hits.load(Ordering::SeqCst) < 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(handler.is_running());
        handler.join().unwrap();
    }

    #[test]
    fn interrupt_handler_ends_when_closed() {
        let (_, soc) = board(&[32]);
        let inp = Arc::new(Gpio::new(&soc, 32, Direction::Input).edge(Edge::Rising));
        inp.open().unwrap();
        let handler = inp
            .start_interrupt_handler_every(Duration::from_millis(10), || {})
            .unwrap();
        inp.close().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while handler.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!handler.is_running());
        match handler.join() {
            Err(Error::Closed) => {}
            other => panic!("expected Closed, got {:?}", other),
        }
    }

    #[test]
    fn interrupt_handler_with_default_interval() {
        let (board, soc) = board(&[33]);
        let inp = Arc::new(Gpio::new(&soc, 33, Direction::Input).edge(Edge::Both));
        inp.open().unwrap();
        let (tx, rx) = mpsc::channel();
        let handler = inp
            .start_interrupt_handler(move || {
                let _ = tx.send(());
            })
            .unwrap();
        board.drive(33, Level::High);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let start = Instant::now();
        handler.join().unwrap();
        assert!(start.elapsed() < DEFAULT_POLL_INTERVAL + Duration::from_millis(500));
    }

    #[test]
    fn direction_is_kept_when_edge_fails() {
        let (board, soc) = board(&[34]);
        let gpio = Gpio::new(&soc, 34, Direction::Output);
        gpio.open().unwrap();
        board.fail_gpio(34, 1);
        assert!(gpio.set_direction(Direction::Input, Edge::Rising).is_err());
        assert_eq!(gpio.direction().unwrap(), Direction::Input);
        match gpio.set_high() {
            Err(Error::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
        gpio.set_edge(Edge::Rising).unwrap();
        assert_eq!(gpio.get_edge().unwrap(), Edge::Rising);
    }

    #[test]
    fn conversions() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::from(0u8), Level::Low);
        assert_eq!("1".parse::<Level>().unwrap(), Level::High);
        assert_eq!("out".parse::<Direction>().unwrap(), Direction::Output);
        assert_eq!("Both".parse::<Edge>().unwrap(), Edge::Both);
        assert_eq!(Edge::try_from(2).unwrap(), Edge::None);
        assert!(Edge::try_from(-1).is_err());
        assert!(Direction::try_from(2).is_err());
        assert_eq!(timeout_ms(None), -1);
        assert_eq!(timeout_ms(Some(Duration::from_millis(1500))), 1500);
        assert_eq!(timeout_ms(Some(Duration::from_secs(u64::max_value()))), i32::max_value());
    }
}
