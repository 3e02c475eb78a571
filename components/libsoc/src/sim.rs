//! An in-memory board.
//!
//! `SimBoard` implements `Backend` with the same return conventions as libsoc, which makes it
//! useful for tests and for trying out programs on a machine without peripherals. Lines,
//! converters and buses only exist after they have been added.
//!
//! * GPIO lines can be linked, an output then drives the level of the inputs linked to it. Edges
//!   are queued per line, so every edge that occurs while nobody polls is reported later.
//!   `fail_gpio` makes the next calls on a line fail.
//! * ADC pins report a fixed value set with `set_adc`.
//! * PWM outputs keep their settings and refuse a duty cycle longer than the period.
//! * I2C devices are register files of 256 bytes. A write selects the register with its first
//!   byte and stores the remaining bytes from there on, a read returns the bytes starting at the
//!   selected register.
//! * SPI devices are loopbacks: a transfer returns what it sends, a read returns what the last
//!   write sent.

use std::collections::{HashMap, VecDeque};
use std::convert::TryFrom;
use std::path::Path;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use crate::backend::*;
use crate::conffile::{ConfFile, GPIO_SECTION};
use crate::error::*;
use crate::gpio::{Direction, Edge, Level};
use crate::pwm::Polarity;
use crate::spi::{BitsPerWord, SpiMode};
use crate::Ownership;

const I2C_REGISTERS: usize = 256;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Claim {
    Board,
    Gpio(u32),
    Adc(u32, u32),
    Pwm(u32, u32),
    I2c(u8, u8),
    Spi(u8, u8),
}

struct Line {
    direction: Direction,
    level: Level,
    edge: Edge,
    holders: usize,
    pending: usize,
    failures: usize,
}

struct PwmOutput {
    enabled: bool,
    polarity: Polarity,
    duty: u32,
    period: u32,
    holders: usize,
}

struct I2cDevice {
    registers: [u8; I2C_REGISTERS],
    pointer: usize,
    timeout: i32,
}

struct SpiDevice {
    mode: SpiMode,
    speed: u32,
    bits: BitsPerWord,
    shift: VecDeque<u8>,
}

#[derive(Default)]
struct State {
    debug: bool,
    next_handle: usize,
    claims: HashMap<usize, Claim>,
    gpios: HashMap<u32, Line>,
    links: HashMap<u32, Vec<u32>>,
    adcs: HashMap<(u32, u32), i32>,
    pwms: HashMap<(u32, u32), PwmOutput>,
    i2c: HashMap<(u8, u8), I2cDevice>,
    spi: HashMap<(u8, u8), SpiDevice>,
    config: Option<ConfFile>,
}

impl State {
    fn claim(&mut self, claim: Claim) -> Option<RawHandle> {
        self.next_handle += 1;
        self.claims.insert(self.next_handle, claim);
        trace!(?claim, handle = self.next_handle, "claimed");
        RawHandle::new(self.next_handle)
    }

    fn claimed(&self, handle: RawHandle) -> Option<Claim> {
        self.claims.get(&handle.value()).cloned()
    }

    fn line(&mut self, handle: RawHandle) -> Option<&mut Line> {
        match self.claimed(handle)? {
            Claim::Gpio(id) => self.gpios.get_mut(&id),
            _ => None,
        }
    }

    fn pwm(&mut self, handle: RawHandle) -> Option<&mut PwmOutput> {
        match self.claimed(handle)? {
            Claim::Pwm(chip, pin) => self.pwms.get_mut(&(chip, pin)),
            _ => None,
        }
    }

    fn i2c(&mut self, handle: RawHandle) -> Option<&mut I2cDevice> {
        match self.claimed(handle)? {
            Claim::I2c(bus, address) => self.i2c.get_mut(&(bus, address)),
            _ => None,
        }
    }

    fn spi(&mut self, handle: RawHandle) -> Option<&mut SpiDevice> {
        match self.claimed(handle)? {
            Claim::Spi(device, cs) => self.spi.get_mut(&(device, cs)),
            _ => None,
        }
    }

    /// Changes the level of a line and of every line linked to it, queueing edges on the way.
    fn drive(&mut self, id: u32, level: Level) {
        let line = match self.gpios.get_mut(&id) {
            Some(line) if line.level != level => line,
            _ => return,
        };
        line.level = level;
        let triggered = match line.edge {
            Edge::Rising => level == Level::High,
            Edge::Falling => level == Level::Low,
            Edge::Both => true,
            Edge::None => false,
        };
        if triggered {
            line.pending += 1;
        }
        let targets = self.links.get(&id).cloned().unwrap_or_default();
        for target in targets {
            self.drive(target, level);
        }
    }
}

/// A board that only exists in memory.
#[derive(Default)]
pub struct SimBoard {
    state: Mutex<State>,
    changed: Condvar,
}

impl SimBoard {
    pub fn new() -> SimBoard {
        SimBoard::default()
    }

    pub fn debug_enabled(&self) -> bool {
        self.lock().debug
    }

    /// Add a GPIO line. It starts as a low input without edge detection.
    pub fn add_gpio(&self, id: u32) {
        self.lock().gpios.entry(id).or_insert(Line {
            direction: Direction::Input,
            level: Level::Low,
            edge: Edge::None,
            holders: 0,
            pending: 0,
            failures: 0,
        });
    }

    /// Remove a GPIO line. Calls on handles to it fail from now on, including pending polls.
    pub fn remove_gpio(&self, id: u32) {
        let mut state = self.lock();
        state.gpios.remove(&id);
        state.links.remove(&id);
        for targets in state.links.values_mut() {
            targets.retain(|&target| target != id);
        }
        drop(state);
        self.changed.notify_all();
    }

    /// Make the next `count` edge writes and polls on a line fail, like a call interrupted by a
    /// signal would.
    pub fn fail_gpio(&self, id: u32, count: usize) {
        if let Some(line) = self.lock().gpios.get_mut(&id) {
            line.failures = count;
        }
    }

    /// Make `input` follow the level of `output`.
    pub fn link(&self, output: u32, input: u32) {
        let mut state = self.lock();
        let targets = state.links.entry(output).or_insert_with(Vec::new);
        if output != input && !targets.contains(&input) {
            targets.push(input);
        }
    }

    /// Drive a line from outside the board, like a button or a sensor would.
    pub fn drive(&self, id: u32, level: Level) {
        self.lock().drive(id, level);
        self.changed.notify_all();
    }

    pub fn gpio_level(&self, id: u32) -> Option<Level> {
        self.lock().gpios.get(&id).map(|line| line.level)
    }

    pub fn set_adc(&self, chip: u32, pin: u32, value: u32) {
        let value = i32::try_from(value).unwrap_or(i32::max_value());
        self.lock().adcs.insert((chip, pin), value);
    }

    /// Make reads from an ADC pin fail.
    pub fn set_adc_error(&self, chip: u32, pin: u32) {
        self.lock().adcs.insert((chip, pin), -1);
    }

    /// Add a disabled PWM output with a zero period.
    pub fn add_pwm(&self, chip: u32, pin: u32) {
        self.lock().pwms.entry((chip, pin)).or_insert(PwmOutput {
            enabled: false,
            polarity: Polarity::Normal,
            duty: 0,
            period: 0,
            holders: 0,
        });
    }

    /// Add an I2C device with all registers zeroed.
    pub fn add_i2c(&self, bus: u8, address: u8) {
        self.lock().i2c.entry((bus, address)).or_insert(I2cDevice {
            registers: [0; I2C_REGISTERS],
            pointer: 0,
            timeout: 0,
        });
    }

    pub fn i2c_register(&self, bus: u8, address: u8, register: u8) -> Option<u8> {
        self.lock()
            .i2c
            .get(&(bus, address))
            .map(|dev| dev.registers[register as usize])
    }

    /// The timeout last set on an I2C device, in units of 10ms.
    pub fn i2c_timeout(&self, bus: u8, address: u8) -> Option<i32> {
        self.lock().i2c.get(&(bus, address)).map(|dev| dev.timeout)
    }

    pub fn set_i2c_register(&self, bus: u8, address: u8, register: u8, value: u8) {
        if let Some(dev) = self.lock().i2c.get_mut(&(bus, address)) {
            dev.registers[register as usize] = value;
        }
    }

    /// Add an SPI device in mode 0 with 8 bits per word.
    pub fn add_spi(&self, device: u8, chip_select: u8) {
        self.lock().spi.entry((device, chip_select)).or_insert(SpiDevice {
            mode: SpiMode::Mode0,
            speed: 1_000_000,
            bits: BitsPerWord::Eight,
            shift: VecDeque::new(),
        });
    }

    /// Use a board configuration so pin names can be resolved.
    pub fn set_board_config(&self, config: ConfFile) {
        self.lock().config = Some(config);
    }

    pub fn load_board_config<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = ConfFile::load(path)?;
        self.set_board_config(config);
        Ok(())
    }

    /// Number of handles that have been handed out and not freed.
    pub fn open_handles(&self) -> usize {
        self.lock().claims.len()
    }

    fn lock(&self) -> MutexGuard<State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, handle: RawHandle, kind: fn(Claim) -> bool) -> Option<Claim> {
        let mut state = self.lock();
        match state.claimed(handle) {
            Some(claim) if kind(claim) => {
                state.claims.remove(&handle.value());
                trace!(?claim, ?handle, "released");
                Some(claim)
            }
            _ => None,
        }
    }
}

fn status(ok: bool) -> i32 {
    if ok {
        0
    } else {
        -1
    }
}

fn saturate(val: u32) -> i32 {
    i32::try_from(val).unwrap_or(i32::max_value())
}

impl Backend for SimBoard {
    fn set_debug(&self, level: i32) {
        debug!(level, "simulated board debug output");
        self.lock().debug = level != 0;
    }

    fn board_init(&self) -> Option<RawHandle> {
        let mut state = self.lock();
        if state.config.is_none() {
            return None;
        }
        state.claim(Claim::Board)
    }

    fn board_free(&self, board: RawHandle) {
        self.release(board, |claim| claim == Claim::Board);
    }

    fn board_gpio_id(&self, board: RawHandle, pin: &str) -> i32 {
        let state = self.lock();
        if state.claimed(board) != Some(Claim::Board) {
            return -1;
        }
        state
            .config
            .as_ref()
            .and_then(|conf| conf.get_int(GPIO_SECTION, pin))
            .unwrap_or(-1)
    }

    fn gpio_request(&self, id: u32, mode: i32) -> Option<RawHandle> {
        let mode = Ownership::try_from(mode).ok()?;
        let mut state = self.lock();
        let line = state.gpios.get_mut(&id)?;
        if line.holders > 0 && mode == Ownership::Weak {
            debug!(gpio = id, "refusing weak request of a held line");
            return None;
        }
        line.holders += 1;
        state.claim(Claim::Gpio(id))
    }

    fn gpio_free(&self, gpio: RawHandle) -> i32 {
        match self.release(gpio, |claim| matches!(claim, Claim::Gpio(_))) {
            Some(Claim::Gpio(id)) => {
                if let Some(line) = self.lock().gpios.get_mut(&id) {
                    line.holders = line.holders.saturating_sub(1);
                }
                0
            }
            _ => -1,
        }
    }

    fn gpio_set_direction(&self, gpio: RawHandle, direction: i32) -> i32 {
        let direction = match Direction::try_from(direction) {
            Ok(direction) => direction,
            Err(_) => return -1,
        };
        let mut state = self.lock();
        match state.line(gpio) {
            Some(line) => {
                line.direction = direction;
                0
            }
            None => -1,
        }
    }

    fn gpio_get_direction(&self, gpio: RawHandle) -> i32 {
        let mut state = self.lock();
        state.line(gpio).map(|line| line.direction.to_raw()).unwrap_or(-1)
    }

    fn gpio_set_level(&self, gpio: RawHandle, level: i32) -> i32 {
        let level = match Level::try_from(level) {
            Ok(level) => level,
            Err(_) => return -1,
        };
        let mut state = self.lock();
        let id = match state.claimed(gpio) {
            Some(Claim::Gpio(id)) => id,
            _ => return -1,
        };
        match state.gpios.get(&id) {
            Some(line) if line.direction == Direction::Output => {}
            _ => return -1,
        }
        state.drive(id, level);
        drop(state);
        self.changed.notify_all();
        0
    }

    fn gpio_get_level(&self, gpio: RawHandle) -> i32 {
        let mut state = self.lock();
        state.line(gpio).map(|line| line.level.to_raw()).unwrap_or(-1)
    }

    fn gpio_set_edge(&self, gpio: RawHandle, edge: i32) -> i32 {
        let edge = match Edge::try_from(edge) {
            Ok(edge) => edge,
            Err(_) => return -1,
        };
        let mut state = self.lock();
        match state.line(gpio) {
            Some(line) if line.failures > 0 => {
                line.failures -= 1;
                -1
            }
            Some(line) if line.direction == Direction::Input || edge == Edge::None => {
                line.edge = edge;
                line.pending = 0;
                0
            }
            _ => -1,
        }
    }

    fn gpio_get_edge(&self, gpio: RawHandle) -> i32 {
        let mut state = self.lock();
        state.line(gpio).map(|line| line.edge.to_raw()).unwrap_or(-1)
    }

    fn gpio_poll(&self, gpio: RawHandle, timeout_ms: i32) -> i32 {
        let deadline = if timeout_ms >= 0 {
            Some(Instant::now() + Duration::from_millis(timeout_ms as u64))
        } else {
            None
        };
        let mut state = self.lock();
        loop {
            match state.line(gpio) {
                Some(line) if line.failures > 0 => {
                    line.failures -= 1;
                    return INT_ERROR;
                }
                Some(line) if line.pending > 0 => {
                    line.pending -= 1;
                    return INT_TRIGGERED;
                }
                Some(_) => {}
                None => return INT_ERROR,
            }
            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return INT_TIMEOUT;
                    }
                    self.changed
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self.changed.wait(state).unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    fn gpio_wait_interrupt(&self, gpio: RawHandle, timeout_ms: i32) -> i32 {
        {
            let mut state = self.lock();
            match state.line(gpio) {
                Some(line) if line.direction == Direction::Input && line.edge != Edge::None => {}
                _ => return INT_ERROR,
            }
        }
        self.gpio_poll(gpio, timeout_ms)
    }

    fn adc_request(&self, chip: u32, pin: u32) -> Option<RawHandle> {
        let mut state = self.lock();
        if !state.adcs.contains_key(&(chip, pin)) {
            return None;
        }
        state.claim(Claim::Adc(chip, pin))
    }

    fn adc_get_value(&self, adc: RawHandle) -> i32 {
        let state = self.lock();
        match state.claimed(adc) {
            Some(Claim::Adc(chip, pin)) => state.adcs.get(&(chip, pin)).cloned().unwrap_or(-1),
            _ => -1,
        }
    }

    fn adc_free(&self, adc: RawHandle) -> i32 {
        status(self.release(adc, |claim| matches!(claim, Claim::Adc(..))).is_some())
    }

    fn pwm_request(&self, chip: u32, pin: u32, mode: i32) -> Option<RawHandle> {
        let mode = Ownership::try_from(mode).ok()?;
        let mut state = self.lock();
        let output = state.pwms.get_mut(&(chip, pin))?;
        if output.holders > 0 && mode == Ownership::Weak {
            return None;
        }
        output.holders += 1;
        state.claim(Claim::Pwm(chip, pin))
    }

    fn pwm_free(&self, pwm: RawHandle) -> i32 {
        match self.release(pwm, |claim| matches!(claim, Claim::Pwm(..))) {
            Some(Claim::Pwm(chip, pin)) => {
                if let Some(output) = self.lock().pwms.get_mut(&(chip, pin)) {
                    output.holders = output.holders.saturating_sub(1);
                }
                0
            }
            _ => -1,
        }
    }

    fn pwm_set_enabled(&self, pwm: RawHandle, enabled: i32) -> i32 {
        let mut state = self.lock();
        match (state.pwm(pwm), enabled) {
            (Some(output), 0) | (Some(output), 1) => {
                output.enabled = enabled == 1;
                0
            }
            _ => -1,
        }
    }

    fn pwm_get_enabled(&self, pwm: RawHandle) -> i32 {
        let mut state = self.lock();
        state.pwm(pwm).map(|output| output.enabled as i32).unwrap_or(-1)
    }

    fn pwm_set_polarity(&self, pwm: RawHandle, polarity: i32) -> i32 {
        let polarity = match Polarity::try_from(polarity) {
            Ok(polarity) => polarity,
            Err(_) => return -1,
        };
        let mut state = self.lock();
        match state.pwm(pwm) {
            Some(output) => {
                output.polarity = polarity;
                0
            }
            None => -1,
        }
    }

    fn pwm_get_polarity(&self, pwm: RawHandle) -> i32 {
        let mut state = self.lock();
        state.pwm(pwm).map(|output| output.polarity.to_raw()).unwrap_or(-1)
    }

    fn pwm_set_duty_cycle(&self, pwm: RawHandle, duty: u32) -> i32 {
        let mut state = self.lock();
        match state.pwm(pwm) {
            Some(output) if duty <= output.period => {
                output.duty = duty;
                0
            }
            _ => -1,
        }
    }

    fn pwm_get_duty_cycle(&self, pwm: RawHandle) -> i32 {
        let mut state = self.lock();
        state.pwm(pwm).map(|output| saturate(output.duty)).unwrap_or(-1)
    }

    fn pwm_set_period(&self, pwm: RawHandle, period: u32) -> i32 {
        let mut state = self.lock();
        match state.pwm(pwm) {
            Some(output) if period >= output.duty => {
                output.period = period;
                0
            }
            _ => -1,
        }
    }

    fn pwm_get_period(&self, pwm: RawHandle) -> i32 {
        let mut state = self.lock();
        state.pwm(pwm).map(|output| saturate(output.period)).unwrap_or(-1)
    }

    fn i2c_init(&self, bus: u8, address: u8) -> Option<RawHandle> {
        let mut state = self.lock();
        if !state.i2c.contains_key(&(bus, address)) {
            return None;
        }
        state.claim(Claim::I2c(bus, address))
    }

    fn i2c_free(&self, i2c: RawHandle) -> i32 {
        status(self.release(i2c, |claim| matches!(claim, Claim::I2c(..))).is_some())
    }

    fn i2c_set_timeout(&self, i2c: RawHandle, timeout: i32) -> i32 {
        let mut state = self.lock();
        match state.i2c(i2c) {
            Some(dev) if timeout >= 0 => {
                dev.timeout = timeout;
                0
            }
            _ => -1,
        }
    }

    fn i2c_read(&self, i2c: RawHandle, buf: &mut [u8]) -> i32 {
        let mut state = self.lock();
        match state.i2c(i2c) {
            Some(dev) if !buf.is_empty() => {
                for (i, b) in buf.iter_mut().enumerate() {
                    *b = dev.registers[(dev.pointer + i) % I2C_REGISTERS];
                }
                i32::try_from(buf.len()).unwrap_or(-1)
            }
            _ => -1,
        }
    }

    fn i2c_write(&self, i2c: RawHandle, buf: &[u8]) -> i32 {
        let mut state = self.lock();
        match (state.i2c(i2c), buf.split_first()) {
            (Some(dev), Some((&register, data))) => {
                dev.pointer = register as usize;
                for (i, &b) in data.iter().enumerate() {
                    dev.registers[(dev.pointer + i) % I2C_REGISTERS] = b;
                }
                i32::try_from(buf.len()).unwrap_or(-1)
            }
            _ => -1,
        }
    }

    fn spi_init(&self, device: u8, chip_select: u8) -> Option<RawHandle> {
        let mut state = self.lock();
        if !state.spi.contains_key(&(device, chip_select)) {
            return None;
        }
        state.claim(Claim::Spi(device, chip_select))
    }

    fn spi_free(&self, spi: RawHandle) -> i32 {
        status(self.release(spi, |claim| matches!(claim, Claim::Spi(..))).is_some())
    }

    fn spi_set_mode(&self, spi: RawHandle, mode: i32) -> i32 {
        let mode = match SpiMode::try_from(mode) {
            Ok(mode) => mode,
            Err(_) => return -1,
        };
        let mut state = self.lock();
        match state.spi(spi) {
            Some(dev) => {
                dev.mode = mode;
                0
            }
            None => -1,
        }
    }

    fn spi_get_mode(&self, spi: RawHandle) -> i32 {
        let mut state = self.lock();
        state.spi(spi).map(|dev| dev.mode.to_raw()).unwrap_or(-1)
    }

    fn spi_set_speed(&self, spi: RawHandle, speed: u32) -> i32 {
        let mut state = self.lock();
        match state.spi(spi) {
            Some(dev) if speed > 0 => {
                dev.speed = speed;
                0
            }
            _ => -1,
        }
    }

    fn spi_get_speed(&self, spi: RawHandle) -> u32 {
        let mut state = self.lock();
        state.spi(spi).map(|dev| dev.speed).unwrap_or(SPEED_ERROR)
    }

    fn spi_set_bits_per_word(&self, spi: RawHandle, bits: i32) -> i32 {
        let bits = match BitsPerWord::try_from(bits) {
            Ok(bits) => bits,
            Err(_) => return -1,
        };
        let mut state = self.lock();
        match state.spi(spi) {
            Some(dev) => {
                dev.bits = bits;
                0
            }
            None => -1,
        }
    }

    fn spi_get_bits_per_word(&self, spi: RawHandle) -> i32 {
        let mut state = self.lock();
        state.spi(spi).map(|dev| dev.bits.to_raw()).unwrap_or(-1)
    }

    fn spi_read(&self, spi: RawHandle, rx: &mut [u8]) -> i32 {
        let mut state = self.lock();
        match state.spi(spi) {
            Some(dev) if !rx.is_empty() => {
                for b in rx.iter_mut() {
                    *b = dev.shift.pop_front().unwrap_or(0);
                }
                0
            }
            _ => -1,
        }
    }

    fn spi_write(&self, spi: RawHandle, tx: &[u8]) -> i32 {
        let mut state = self.lock();
        match state.spi(spi) {
            Some(dev) if !tx.is_empty() => {
                dev.shift = tx.iter().cloned().collect();
                0
            }
            _ => -1,
        }
    }

    fn spi_rw(&self, spi: RawHandle, tx: &[u8], rx: &mut [u8]) -> i32 {
        let mut state = self.lock();
        match state.spi(spi) {
            Some(_) if !tx.is_empty() && tx.len() == rx.len() => {
                rx.copy_from_slice(tx);
                0
            }
            _ => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn handles_are_typed() {
        let board = SimBoard::new();
        board.add_gpio(1);
        board.set_adc(0, 1, 7);
        let gpio = board.gpio_request(1, Ownership::Shared.to_raw()).unwrap();
        let adc = board.adc_request(0, 1).unwrap();
        assert_ne!(gpio, adc);
        assert_eq!(board.adc_get_value(gpio), -1);
        assert_eq!(board.gpio_get_level(adc), -1);
        assert_eq!(board.adc_get_value(adc), 7);
        assert_eq!(board.open_handles(), 2);

        assert_eq!(board.adc_free(gpio), -1);
        assert_eq!(board.gpio_free(gpio), 0);
        assert_eq!(board.gpio_free(gpio), -1);
        assert_eq!(board.adc_free(adc), 0);
        assert_eq!(board.open_handles(), 0);
    }

    #[test]
    fn unknown_peripherals_are_refused() {
        let board = SimBoard::new();
        assert!(board.gpio_request(3, 0).is_none());
        assert!(board.adc_request(0, 0).is_none());
        assert!(board.pwm_request(0, 0, 0).is_none());
        assert!(board.i2c_init(1, 0x20).is_none());
        assert!(board.spi_init(0, 0).is_none());
        assert!(board.board_init().is_none());
    }

    #[test]
    fn links_propagate_levels_and_edges() {
        let board = SimBoard::new();
        for id in 1..=3 {
            board.add_gpio(id);
        }
        board.link(1, 2);
        board.link(2, 3);
        board.link(3, 1);
        let inp = board.gpio_request(3, 0).unwrap();
        assert_eq!(board.gpio_set_edge(inp, Edge::Rising.to_raw()), 0);

        board.drive(1, Level::High);
        assert_eq!(board.gpio_level(2), Some(Level::High));
        assert_eq!(board.gpio_level(3), Some(Level::High));
        board.drive(1, Level::Low);
        board.drive(1, Level::High);
        assert_eq!(board.gpio_poll(inp, 0), INT_TRIGGERED);
        assert_eq!(board.gpio_poll(inp, 0), INT_TRIGGERED);
        assert_eq!(board.gpio_poll(inp, 0), INT_TIMEOUT);
    }

    #[test]
    fn injected_gpio_failures() {
        let board = SimBoard::new();
        board.add_gpio(12);
        let gpio = board.gpio_request(12, 0).unwrap();
        board.fail_gpio(12, 2);
        assert_eq!(board.gpio_set_edge(gpio, Edge::Rising.to_raw()), -1);
        assert_eq!(board.gpio_poll(gpio, 0), INT_ERROR);
        assert_eq!(board.gpio_set_edge(gpio, Edge::Rising.to_raw()), 0);
        board.drive(12, Level::High);
        assert_eq!(board.gpio_poll(gpio, 0), INT_TRIGGERED);
        board.remove_gpio(12);
        assert_eq!(board.gpio_poll(gpio, 0), INT_ERROR);
    }

    #[test]
    fn output_rules() {
        let board = SimBoard::new();
        board.add_gpio(9);
        let gpio = board.gpio_request(9, 0).unwrap();
        assert_eq!(board.gpio_set_level(gpio, 1), -1);
        assert_eq!(board.gpio_set_direction(gpio, Direction::Output.to_raw()), 0);
        assert_eq!(board.gpio_set_level(gpio, 1), 0);
        assert_eq!(board.gpio_set_level(gpio, 2), -1);
        assert_eq!(board.gpio_set_edge(gpio, Edge::Both.to_raw()), -1);
        assert_eq!(board.gpio_set_edge(gpio, Edge::None.to_raw()), 0);
        assert_eq!(board.gpio_wait_interrupt(gpio, 0), INT_ERROR);
        assert_eq!(board.gpio_get_level(gpio), 1);
    }

    #[test]
    fn poll_wakes_on_drive() {
        let board = Arc::new(SimBoard::new());
        board.add_gpio(4);
        let gpio = board.gpio_request(4, 0).unwrap();
        board.gpio_set_edge(gpio, Edge::Both.to_raw());

        let driver = Arc::clone(&board);
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            driver.drive(4, Level::High);
        });
        assert_eq!(board.gpio_poll(gpio, -1), INT_TRIGGERED);
        t.join().unwrap();
    }

    #[test]
    fn pwm_duty_never_exceeds_period() {
        let board = SimBoard::new();
        board.add_pwm(0, 1);
        let pwm = board.pwm_request(0, 1, 0).unwrap();
        assert_eq!(board.pwm_set_duty_cycle(pwm, 10), -1);
        assert_eq!(board.pwm_set_period(pwm, 100), 0);
        assert_eq!(board.pwm_set_duty_cycle(pwm, 40), 0);
        assert_eq!(board.pwm_set_period(pwm, 30), -1);
        assert_eq!(board.pwm_get_period(pwm), 100);
        assert_eq!(board.pwm_get_duty_cycle(pwm), 40);
        assert!(board.pwm_request(0, 1, Ownership::Weak.to_raw()).is_none());
    }

    #[test]
    fn i2c_register_file() {
        let board = SimBoard::new();
        board.add_i2c(1, 0x3e);
        let dev = board.i2c_init(1, 0x3e).unwrap();
        assert_eq!(board.i2c_write(dev, &[0x02, 0xff, 0x10]), 3);
        assert_eq!(board.i2c_register(1, 0x3e, 0x03), Some(0x10));
        let mut buf = [0; 2];
        assert_eq!(board.i2c_read(dev, &mut buf), 2);
        assert_eq!(buf, [0xff, 0x10]);
        assert_eq!(board.i2c_write(dev, &[]), -1);
        assert_eq!(board.i2c_set_timeout(dev, -1), -1);
    }

    #[test]
    fn spi_loopback() {
        let board = SimBoard::new();
        board.add_spi(1, 0);
        let dev = board.spi_init(1, 0).unwrap();
        let mut rx = [0; 3];
        assert_eq!(board.spi_rw(dev, &[1, 2, 3], &mut rx), 0);
        assert_eq!(rx, [1, 2, 3]);
        assert_eq!(board.spi_write(dev, &[9, 8]), 0);
        assert_eq!(board.spi_read(dev, &mut rx), 0);
        assert_eq!(rx, [9, 8, 0]);
        assert_eq!(board.spi_rw(dev, &[1], &mut rx), -1);
        assert_eq!(board.spi_set_speed(dev, 0), -1);
        assert_eq!(board.spi_set_bits_per_word(dev, 12), -1);
        assert_eq!(board.spi_free(dev), 0);
        assert_eq!(board.spi_get_speed(dev), SPEED_ERROR);
    }

    #[test]
    fn pin_names_need_a_config() {
        let board = SimBoard::new();
        assert!(board.board_init().is_none());
        board.set_board_config("[GPIO]\nP9_12 = 60\n".parse().unwrap());
        let handle = board.board_init().unwrap();
        assert_eq!(board.board_gpio_id(handle, "P9_12"), 60);
        assert_eq!(board.board_gpio_id(handle, "P9_13"), -1);
        board.board_free(handle);
        assert_eq!(board.board_gpio_id(handle, "P9_12"), -1);
    }
}
