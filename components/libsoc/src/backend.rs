//! The seam between the wrappers and the library that does the actual work.
//!
//! `Backend` mirrors libsoc's C interface one method per function and keeps its conventions: calls
//! that acquire something return `None` where libsoc returns a null pointer, everything else
//! returns libsoc's integer status or value unchanged. Translating these into `Result`s is the job
//! of the wrappers, so every backend is held to the same contract.

use std::fmt;

/// Poll and interrupt results.
pub const INT_ERROR: i32 = -1;
pub const INT_TRIGGERED: i32 = 0;
pub const INT_TIMEOUT: i32 = 1;

/// Returned by `spi_get_speed` on failure, libsoc's `-1` as an unsigned value.
pub const SPEED_ERROR: u32 = u32::max_value();

/// Opaque reference to a resource held by a backend.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct RawHandle(usize);

impl RawHandle {
    pub fn new(value: usize) -> Option<RawHandle> {
        if value == 0 {
            None
        } else {
            Some(RawHandle(value))
        }
    }

    pub fn from_ptr<T>(ptr: *mut T) -> Option<RawHandle> {
        RawHandle::new(ptr as usize)
    }

    pub fn as_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    pub fn value(self) -> usize {
        self.0
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RawHandle({:#x})", self.0)
    }
}

/// libsoc's call surface.
///
/// Unless noted otherwise, methods returning `i32` follow libsoc's status convention: `0` on
/// success and nonzero on failure. Getters return the value or `-1`.
pub trait Backend: Send + Sync {
    fn set_debug(&self, level: i32);

    fn board_init(&self) -> Option<RawHandle>;
    fn board_free(&self, board: RawHandle);
    /// The GPIO number mapped to `pin`, or `-1` if the board does not know it.
    fn board_gpio_id(&self, board: RawHandle, pin: &str) -> i32;

    fn gpio_request(&self, id: u32, mode: i32) -> Option<RawHandle>;
    fn gpio_free(&self, gpio: RawHandle) -> i32;
    fn gpio_set_direction(&self, gpio: RawHandle, direction: i32) -> i32;
    fn gpio_get_direction(&self, gpio: RawHandle) -> i32;
    fn gpio_set_level(&self, gpio: RawHandle, level: i32) -> i32;
    fn gpio_get_level(&self, gpio: RawHandle) -> i32;
    fn gpio_set_edge(&self, gpio: RawHandle, edge: i32) -> i32;
    fn gpio_get_edge(&self, gpio: RawHandle) -> i32;
    /// Blocks until the configured edge occurs or `timeout_ms` passes, `-1` waits forever.
    /// Returns one of `INT_TRIGGERED`, `INT_TIMEOUT` or `INT_ERROR`.
    fn gpio_poll(&self, gpio: RawHandle, timeout_ms: i32) -> i32;
    /// Like `gpio_poll`, but fails unless the line is an input with an edge configured.
    fn gpio_wait_interrupt(&self, gpio: RawHandle, timeout_ms: i32) -> i32;

    fn adc_request(&self, chip: u32, pin: u32) -> Option<RawHandle>;
    fn adc_get_value(&self, adc: RawHandle) -> i32;
    fn adc_free(&self, adc: RawHandle) -> i32;

    fn pwm_request(&self, chip: u32, pin: u32, mode: i32) -> Option<RawHandle>;
    fn pwm_free(&self, pwm: RawHandle) -> i32;
    fn pwm_set_enabled(&self, pwm: RawHandle, enabled: i32) -> i32;
    fn pwm_get_enabled(&self, pwm: RawHandle) -> i32;
    fn pwm_set_polarity(&self, pwm: RawHandle, polarity: i32) -> i32;
    fn pwm_get_polarity(&self, pwm: RawHandle) -> i32;
    fn pwm_set_duty_cycle(&self, pwm: RawHandle, duty: u32) -> i32;
    fn pwm_get_duty_cycle(&self, pwm: RawHandle) -> i32;
    fn pwm_set_period(&self, pwm: RawHandle, period: u32) -> i32;
    fn pwm_get_period(&self, pwm: RawHandle) -> i32;

    fn i2c_init(&self, bus: u8, address: u8) -> Option<RawHandle>;
    fn i2c_free(&self, i2c: RawHandle) -> i32;
    /// Timeout in units of 10ms.
    fn i2c_set_timeout(&self, i2c: RawHandle, timeout: i32) -> i32;
    /// Returns the number of bytes read or `-1`.
    fn i2c_read(&self, i2c: RawHandle, buf: &mut [u8]) -> i32;
    /// Returns the number of bytes written or `-1`.
    fn i2c_write(&self, i2c: RawHandle, buf: &[u8]) -> i32;

    fn spi_init(&self, device: u8, chip_select: u8) -> Option<RawHandle>;
    fn spi_free(&self, spi: RawHandle) -> i32;
    fn spi_set_mode(&self, spi: RawHandle, mode: i32) -> i32;
    fn spi_get_mode(&self, spi: RawHandle) -> i32;
    fn spi_set_speed(&self, spi: RawHandle, speed: u32) -> i32;
    /// Returns `SPEED_ERROR` on failure.
    fn spi_get_speed(&self, spi: RawHandle) -> u32;
    fn spi_set_bits_per_word(&self, spi: RawHandle, bits: i32) -> i32;
    fn spi_get_bits_per_word(&self, spi: RawHandle) -> i32;
    fn spi_read(&self, spi: RawHandle, rx: &mut [u8]) -> i32;
    fn spi_write(&self, spi: RawHandle, tx: &[u8]) -> i32;
    /// Full duplex transfer, `tx` and `rx` have the same length.
    fn spi_rw(&self, spi: RawHandle, tx: &[u8], rx: &mut [u8]) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_no_handle() {
        assert_eq!(RawHandle::new(0), None);
        assert_eq!(RawHandle::from_ptr(std::ptr::null_mut::<u8>()), None);
        let handle = RawHandle::new(0x1000).unwrap();
        assert_eq!(handle.as_ptr::<u8>() as usize, 0x1000);
        assert_eq!(format!("{:?}", handle), "RawHandle(0x1000)");
    }
}
