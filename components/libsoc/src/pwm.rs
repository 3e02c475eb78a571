//! Pulse width modulated outputs
//!
//! Periods and duty cycles are in nanoseconds.

use std::convert::TryFrom;
use std::fmt;
use tracing::{debug, warn};
use crate::backend::RawHandle;
use crate::error::*;
use crate::resource::{check, Resource, Slot};
use crate::{Ownership, Soc};

raw_enum! {
    pub enum Polarity {
        Normal = 0 => "normal" | "n",
        Inversed = 1 => "inversed" | "inverse" | "i",
    }
}

impl Default for Polarity {
    fn default() -> Polarity {
        Polarity::Normal
    }
}

/// Settings applied when the output is opened.
#[derive(Copy, Clone, Debug, Default)]
struct Initial {
    period: Option<u32>,
    duty_cycle: Option<u32>,
    polarity: Option<Polarity>,
    enabled: Option<bool>,
}

pub struct Pwm {
    soc: Soc,
    chip: u32,
    pin: u32,
    ownership: Ownership,
    initial: Initial,
    slot: Slot,
}

impl Pwm {
    pub fn new(soc: &Soc, chip: u32, pin: u32) -> Pwm {
        Pwm {
            soc: soc.clone(),
            chip,
            pin,
            ownership: Ownership::default(),
            initial: Initial::default(),
            slot: Slot::new(),
        }
    }

    pub fn ownership(mut self, ownership: Ownership) -> Pwm {
        self.ownership = ownership;
        self
    }

    pub fn period(mut self, period: u32) -> Pwm {
        self.initial.period = Some(period);
        self
    }

    pub fn duty_cycle(mut self, duty_cycle: u32) -> Pwm {
        self.initial.duty_cycle = Some(duty_cycle);
        self
    }

    pub fn polarity(mut self, polarity: Polarity) -> Pwm {
        self.initial.polarity = Some(polarity);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Pwm {
        self.initial.enabled = Some(enabled);
        self
    }

    /// Request the output and apply the settings given to the builder, in the order period, duty
    /// cycle, polarity, enabled.
    ///
    /// The duty cycle goes before the period if the duty cycle left on the output exceeds the new
    /// period.
    pub fn open(&self) -> Result<()> {
        let backend = self.soc.backend();
        self.slot.open(|| {
            let handle = backend
                .pwm_request(self.chip, self.pin, self.ownership.to_raw())
                .ok_or_else(|| Error::Unavailable(format!("Unable to open {}", self)))?;
            if let Err(err) = self.apply_initial(handle) {
                if backend.pwm_free(handle) != 0 {
                    warn!(chip = self.chip, pin = self.pin, "could not free after failed setup");
                }
                return Err(err);
            }
            debug!(chip = self.chip, pin = self.pin, initial = ?self.initial, "pwm opened");
            Ok(handle)
        })
    }

    pub fn close(&self) -> Result<()> {
        let backend = self.soc.backend();
        self.slot.close(|handle| {
            check(backend.pwm_free(handle), || format!("Unable to free {}", self))
        })
    }

    pub fn is_open(&self) -> bool {
        self.slot.is_open()
    }

    pub fn get_period(&self) -> Result<u32> {
        self.slot.with(|handle| self.read_period(handle))
    }

    pub fn set_period(&self, period: u32) -> Result<()> {
        self.slot.with(|handle| self.write_period(handle, period))
    }

    pub fn get_duty_cycle(&self) -> Result<u32> {
        self.slot.with(|handle| self.read_duty_cycle(handle))
    }

    /// Fails with `Error::InvalidArgument` if `duty_cycle` exceeds the current period.
    pub fn set_duty_cycle(&self, duty_cycle: u32) -> Result<()> {
        self.slot.with(|handle| self.write_duty_cycle(handle, duty_cycle))
    }

    pub fn get_polarity(&self) -> Result<Polarity> {
        let raw = self.slot.with(|handle| Ok(self.soc.backend().pwm_get_polarity(handle)))?;
        Polarity::try_from(raw)
            .map_err(|_| Error::Operation(format!("Error reading {} polarity", self)))
    }

    pub fn set_polarity(&self, polarity: Polarity) -> Result<()> {
        self.slot.with(|handle| self.write_polarity(handle, polarity))
    }

    pub fn is_enabled(&self) -> Result<bool> {
        let raw = self.slot.with(|handle| Ok(self.soc.backend().pwm_get_enabled(handle)))?;
        match raw {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::Operation(format!("Error reading {} enabled", self))),
        }
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.slot.with(|handle| self.write_enabled(handle, enabled))
    }

    pub fn on(&self) -> Result<()> {
        self.set_enabled(true)
    }

    pub fn off(&self) -> Result<()> {
        self.set_enabled(false)
    }

    fn apply_initial(&self, handle: RawHandle) -> Result<()> {
        let Initial {
            period,
            duty_cycle,
            polarity,
            enabled,
        } = self.initial;
        match (period, duty_cycle) {
            (Some(period), Some(duty_cycle))
                if duty_cycle <= period && self.read_duty_cycle(handle)? > period =>
            {
                self.write_duty_cycle(handle, duty_cycle)?;
                self.write_period(handle, period)?;
            }
            _ => {
                if let Some(period) = period {
                    self.write_period(handle, period)?;
                }
                if let Some(duty_cycle) = duty_cycle {
                    self.write_duty_cycle(handle, duty_cycle)?;
                }
            }
        }
        if let Some(polarity) = polarity {
            self.write_polarity(handle, polarity)?;
        }
        if let Some(enabled) = enabled {
            self.write_enabled(handle, enabled)?;
        }
        Ok(())
    }

    fn read_period(&self, handle: RawHandle) -> Result<u32> {
        self.value(self.soc.backend().pwm_get_period(handle), "period")
    }

    fn read_duty_cycle(&self, handle: RawHandle) -> Result<u32> {
        self.value(self.soc.backend().pwm_get_duty_cycle(handle), "duty cycle")
    }

    fn write_period(&self, handle: RawHandle, period: u32) -> Result<()> {
        check(self.soc.backend().pwm_set_period(handle, period), || {
            format!("Error setting {} period to {}", self, period)
        })
    }

    fn write_duty_cycle(&self, handle: RawHandle, duty_cycle: u32) -> Result<()> {
        let period = self.read_period(handle)?;
        if duty_cycle > period {
            return Err(Error::InvalidArgument(format!(
                "duty cycle {} of {} exceeds its period {}",
                duty_cycle, self, period
            )));
        }
        check(self.soc.backend().pwm_set_duty_cycle(handle, duty_cycle), || {
            format!("Error setting {} duty cycle to {}", self, duty_cycle)
        })
    }

    fn write_polarity(&self, handle: RawHandle, polarity: Polarity) -> Result<()> {
        check(self.soc.backend().pwm_set_polarity(handle, polarity.to_raw()), || {
            format!("Error setting {} polarity to {}", self, polarity)
        })
    }

    fn write_enabled(&self, handle: RawHandle, enabled: bool) -> Result<()> {
        check(self.soc.backend().pwm_set_enabled(handle, enabled as i32), || {
            let state = if enabled { "enabling" } else { "disabling" };
            format!("Error {} {}", state, self)
        })
    }

    fn value(&self, raw: i32, what: &str) -> Result<u32> {
        if raw < 0 {
            return Err(Error::Operation(format!("Error reading {} {}", self, what)));
        }
        Ok(raw as u32)
    }
}

impl fmt::Display for Pwm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "pwm chip({}) pin({})", self.chip, self.pin)
    }
}

impl Resource for Pwm {
    fn open(&self) -> Result<()> {
        Pwm::open(self)
    }

    fn close(&self) -> Result<()> {
        Pwm::close(self)
    }

    fn is_open(&self) -> bool {
        Pwm::is_open(self)
    }
}

impl Drop for Pwm {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(chip = self.chip, pin = self.pin, %err, "could not close on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::sim::SimBoard;

    fn board() -> (Arc<SimBoard>, Soc) {
        let board = Arc::new(SimBoard::new());
        board.add_pwm(0, 1);
        let soc = Soc::shared(Arc::clone(&board));
        (board, soc)
    }

    #[test]
    fn setters_round_trip() {
        let (_, soc) = board();
        let pwm = Pwm::new(&soc, 0, 1);
        pwm.open().unwrap();
        pwm.set_period(20_000).unwrap();
        assert_eq!(pwm.get_period().unwrap(), 20_000);
        pwm.set_duty_cycle(5_000).unwrap();
        assert_eq!(pwm.get_duty_cycle().unwrap(), 5_000);
        pwm.set_polarity(Polarity::Inversed).unwrap();
        assert_eq!(pwm.get_polarity().unwrap(), Polarity::Inversed);
        pwm.on().unwrap();
        assert!(pwm.is_enabled().unwrap());
        pwm.off().unwrap();
        assert!(!pwm.is_enabled().unwrap());
    }

    #[test]
    fn initial_settings_apply_in_order() {
        let (_, soc) = board();
        let pwm = Pwm::new(&soc, 0, 1)
            .duty_cycle(250)
            .period(1000)
            .polarity(Polarity::Normal)
            .enabled(true);
        pwm.open().unwrap();
        assert_eq!(pwm.get_period().unwrap(), 1000);
        assert_eq!(pwm.get_duty_cycle().unwrap(), 250);
        assert!(pwm.is_enabled().unwrap());
    }

    #[test]
    fn shorter_period_after_longer_duty_cycle() {
        let (_, soc) = board();
        let pwm = Pwm::new(&soc, 0, 1).period(1000).duty_cycle(800);
        pwm.open().unwrap();
        pwm.close().unwrap();

        let pwm = Pwm::new(&soc, 0, 1).period(400).duty_cycle(100);
        pwm.open().unwrap();
        assert_eq!(pwm.get_period().unwrap(), 400);
        assert_eq!(pwm.get_duty_cycle().unwrap(), 100);
        pwm.close().unwrap();

        let pwm = Pwm::new(&soc, 0, 1).period(2000).duty_cycle(1500);
        pwm.open().unwrap();
        assert_eq!(pwm.get_period().unwrap(), 2000);
        assert_eq!(pwm.get_duty_cycle().unwrap(), 1500);
    }

    #[test]
    fn duty_cycle_above_period_is_rejected() {
        let (board, soc) = board();
        let pwm = Pwm::new(&soc, 0, 1);
        pwm.open().unwrap();
        pwm.set_period(10).unwrap();
        match pwm.set_duty_cycle(100) {
            Err(Error::InvalidArgument(msg)) => assert!(msg.contains("exceeds its period 10")),
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
        assert_eq!(pwm.get_duty_cycle().unwrap(), 0);
        pwm.close().unwrap();

        let invalid = Pwm::new(&soc, 0, 1).period(10).duty_cycle(11);
        assert!(invalid.open().is_err());
        assert!(!invalid.is_open());
        assert_eq!(board.open_handles(), 0);
    }

    #[test]
    fn weak_request_of_held_output_fails() {
        let (_, soc) = board();
        let first = Pwm::new(&soc, 0, 1);
        first.open().unwrap();
        let weak = Pwm::new(&soc, 0, 1).ownership(Ownership::Weak);
        match weak.open() {
            Err(Error::Unavailable(msg)) => assert_eq!(msg, "Unable to open pwm chip(0) pin(1)"),
            other => panic!("expected Unavailable, got {:?}", other),
        }
        first.close().unwrap();
        weak.open().unwrap();
    }

    #[test]
    fn polarity_names() {
        assert_eq!("i".parse::<Polarity>().unwrap(), Polarity::Inversed);
        assert_eq!("Normal".parse::<Polarity>().unwrap(), Polarity::Normal);
        assert_eq!(Polarity::Inversed.to_string(), "inversed");
        assert_eq!(Polarity::try_from(1).unwrap(), Polarity::Inversed);
    }
}
