//! Analog to digital converters

use std::fmt;
use tracing::{debug, warn};
use crate::error::*;
use crate::resource::{check, Resource, Slot};
use crate::Soc;

pub struct Adc {
    soc: Soc,
    chip: u32,
    pin: u32,
    slot: Slot,
}

impl Adc {
    pub fn new(soc: &Soc, chip: u32, pin: u32) -> Adc {
        Adc {
            soc: soc.clone(),
            chip,
            pin,
            slot: Slot::new(),
        }
    }

    pub fn chip(&self) -> u32 {
        self.chip
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    pub fn open(&self) -> Result<()> {
        let backend = self.soc.backend();
        self.slot.open(|| {
            let handle = backend
                .adc_request(self.chip, self.pin)
                .ok_or_else(|| Error::Unavailable(format!("Unable to open {}", self)))?;
            debug!(chip = self.chip, pin = self.pin, "adc opened");
            Ok(handle)
        })
    }

    pub fn close(&self) -> Result<()> {
        let backend = self.soc.backend();
        self.slot.close(|handle| {
            check(backend.adc_free(handle), || format!("Unable to free {}", self))
        })
    }

    pub fn is_open(&self) -> bool {
        self.slot.is_open()
    }

    /// Sample the converter.
    pub fn read(&self) -> Result<u32> {
        let raw = self.slot.with(|handle| Ok(self.soc.backend().adc_get_value(handle)))?;
        if raw < 0 {
            return Err(Error::Operation(format!("Error reading {} value", self)));
        }
        Ok(raw as u32)
    }
}

impl fmt::Display for Adc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "adc chip({}) pin({})", self.chip, self.pin)
    }
}

impl Resource for Adc {
    fn open(&self) -> Result<()> {
        Adc::open(self)
    }

    fn close(&self) -> Result<()> {
        Adc::close(self)
    }

    fn is_open(&self) -> bool {
        Adc::is_open(self)
    }
}

impl Drop for Adc {
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

    #[test]
    fn read_value() {
        let board = Arc::new(SimBoard::new());
        board.set_adc(0, 3, 1234);
        let soc = Soc::shared(Arc::clone(&board));
        let adc = Adc::new(&soc, 0, 3);
        match adc.read() {
            Err(Error::Closed) => {}
            other => panic!("expected Closed, got {:?}", other),
        }
        adc.open().unwrap();
        assert_eq!(adc.read().unwrap(), 1234);
        board.set_adc(0, 3, 0);
        assert_eq!(adc.read().unwrap(), 0);
    }

    #[test]
    fn failures() {
        let board = Arc::new(SimBoard::new());
        board.set_adc_error(1, 0);
        let soc = Soc::shared(Arc::clone(&board));

        let missing = Adc::new(&soc, 1, 7);
        match missing.open() {
            Err(Error::Unavailable(msg)) => assert_eq!(msg, "Unable to open adc chip(1) pin(7)"),
            other => panic!("expected Unavailable, got {:?}", other),
        }

        let broken = Adc::new(&soc, 1, 0);
        broken.open().unwrap();
        match broken.read() {
            Err(err @ Error::Operation(_)) => {
                assert!(err.is_io());
                assert_eq!(err.to_string(), "Error reading adc chip(1) pin(0) value");
            }
            other => panic!("expected Operation, got {:?}", other),
        }
        broken.close().unwrap();
        assert_eq!(board.open_handles(), 0);
    }
}
