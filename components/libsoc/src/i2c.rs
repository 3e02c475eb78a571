//! I2C devices
//!
//! An `I2c` talks to one 7-bit slave address on one bus.

use std::cmp;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use crate::error::*;
use crate::resource::{check, Resource, Slot};
use crate::Soc;

/// The largest transfer libsoc accepts at once.
pub const MAX_TRANSFER: usize = u16::max_value() as usize;

/// Resolution of `I2c::set_timeout`.
const TIMEOUT_TICK_MS: u128 = 10;

pub struct I2c {
    soc: Soc,
    bus: u8,
    address: u8,
    slot: Slot,
}

impl I2c {
    pub fn new(soc: &Soc, bus: u8, address: u8) -> Result<I2c> {
        if address > 0x7f {
            return Err(Error::InvalidArgument(format!(
                "I2C address {:#04x} is not a 7-bit address",
                address
            )));
        }
        Ok(I2c {
            soc: soc.clone(),
            bus,
            address,
            slot: Slot::new(),
        })
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn open(&self) -> Result<()> {
        let backend = self.soc.backend();
        self.slot.open(|| {
            let handle = backend
                .i2c_init(self.bus, self.address)
                .ok_or_else(|| Error::Unavailable(format!("Unable to open {}", self)))?;
            debug!(bus = self.bus, address = self.address, "i2c opened");
            Ok(handle)
        })
    }

    pub fn close(&self) -> Result<()> {
        let backend = self.soc.backend();
        self.slot.close(|handle| {
            check(backend.i2c_free(handle), || format!("Unable to free {}", self))
        })
    }

    pub fn is_open(&self) -> bool {
        self.slot.is_open()
    }

    /// Set the bus timeout. libsoc counts in units of 10ms, `timeout` is rounded up to them.
    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        let ticks = (timeout.as_millis() + TIMEOUT_TICK_MS - 1) / TIMEOUT_TICK_MS;
        let ticks = cmp::min(ticks, i32::max_value() as u128) as i32;
        self.slot.with(|handle| {
            check(self.soc.backend().i2c_set_timeout(handle, ticks), || {
                format!("Error setting {} timeout", self)
            })
        })
    }

    pub fn read(&self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Fill `buf` completely.
    pub fn read_into(&self, buf: &mut [u8]) -> Result<()> {
        self.check_len(buf.len())?;
        let count = self.slot.with(|handle| Ok(self.soc.backend().i2c_read(handle, buf)))?;
        self.check_count(count, buf.len(), "reading from")
    }

    pub fn write(&self, buf: &[u8]) -> Result<()> {
        self.check_len(buf.len())?;
        let count = self.slot.with(|handle| Ok(self.soc.backend().i2c_write(handle, buf)))?;
        self.check_count(count, buf.len(), "writing to")
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len == 0 || len > MAX_TRANSFER {
            return Err(Error::InvalidArgument(format!(
                "transfers with {} must be 1 to {} bytes, not {}",
                self, MAX_TRANSFER, len
            )));
        }
        Ok(())
    }

    fn check_count(&self, count: i32, expected: usize, action: &str) -> Result<()> {
        if count < 0 || count as usize != expected {
            return Err(Error::Operation(format!("Error {} {}", action, self)));
        }
        Ok(())
    }
}

impl fmt::Display for I2c {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "i2c bus({}) address({:#04x})", self.bus, self.address)
    }
}

impl Resource for I2c {
    fn open(&self) -> Result<()> {
        I2c::open(self)
    }

    fn close(&self) -> Result<()> {
        I2c::close(self)
    }

    fn is_open(&self) -> bool {
        I2c::is_open(self)
    }
}

impl Drop for I2c {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(bus = self.bus, address = self.address, %err, "could not close on drop");
        }
    }
}
