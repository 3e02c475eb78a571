//! The system's libsoc.

use libsoc_sys as ffi;
use nix::errno::Errno;
use std::convert::TryFrom;
use std::ffi::CString;
use std::os::raw::c_int;
use tracing::debug;
use crate::backend::*;

/// Calls straight into the shared library.
///
/// libsoc keeps no global state apart from its debug flag, so any number of `Libsoc` values may
/// be used at once.
#[derive(Copy, Clone, Debug, Default)]
pub struct Libsoc;

/// Logs the reason of a failed call. libsoc itself only reports it through `errno`.
fn traced(call: &'static str, failed: bool) {
    if failed {
        debug!(call, errno = %Errno::last(), "libsoc call failed");
    }
}

fn status(call: &'static str, ret: c_int) -> i32 {
    traced(call, ret != ffi::EXIT_SUCCESS);
    ret
}

fn value(call: &'static str, ret: c_int) -> i32 {
    traced(call, ret < 0);
    ret
}

fn handle<T>(call: &'static str, ptr: *mut T) -> Option<RawHandle> {
    let handle = RawHandle::from_ptr(ptr);
    traced(call, handle.is_none());
    handle
}

/// libsoc answers I2C transfers with a status, the backend contract wants a byte count.
fn transferred(call: &'static str, ret: c_int, len: usize) -> i32 {
    if status(call, ret) == ffi::EXIT_SUCCESS {
        i32::try_from(len).unwrap_or(-1)
    } else {
        -1
    }
}

impl Backend for Libsoc {
    fn set_debug(&self, level: i32) {
        unsafe { ffi::libsoc_set_debug(level) }
    }

    fn board_init(&self) -> Option<RawHandle> {
        handle("libsoc_board_init", unsafe { ffi::libsoc_board_init() })
    }

    fn board_free(&self, board: RawHandle) {
        unsafe { ffi::libsoc_board_free(board.as_ptr()) }
    }

    fn board_gpio_id(&self, board: RawHandle, pin: &str) -> i32 {
        let pin = match CString::new(pin) {
            Ok(pin) => pin,
            Err(_) => return -1,
        };
        value("libsoc_board_gpio_id", unsafe {
            ffi::libsoc_board_gpio_id(board.as_ptr(), pin.as_ptr())
        })
    }

    fn gpio_request(&self, id: u32, mode: i32) -> Option<RawHandle> {
        handle("libsoc_gpio_request", unsafe { ffi::libsoc_gpio_request(id, mode) })
    }

    fn gpio_free(&self, gpio: RawHandle) -> i32 {
        status("libsoc_gpio_free", unsafe { ffi::libsoc_gpio_free(gpio.as_ptr()) })
    }

    fn gpio_set_direction(&self, gpio: RawHandle, direction: i32) -> i32 {
        status("libsoc_gpio_set_direction", unsafe {
            ffi::libsoc_gpio_set_direction(gpio.as_ptr(), direction)
        })
    }

    fn gpio_get_direction(&self, gpio: RawHandle) -> i32 {
        value("libsoc_gpio_get_direction", unsafe {
            ffi::libsoc_gpio_get_direction(gpio.as_ptr())
        })
    }

    fn gpio_set_level(&self, gpio: RawHandle, level: i32) -> i32 {
        status("libsoc_gpio_set_level", unsafe {
            ffi::libsoc_gpio_set_level(gpio.as_ptr(), level)
        })
    }

    fn gpio_get_level(&self, gpio: RawHandle) -> i32 {
        value("libsoc_gpio_get_level", unsafe { ffi::libsoc_gpio_get_level(gpio.as_ptr()) })
    }

    fn gpio_set_edge(&self, gpio: RawHandle, edge: i32) -> i32 {
        status("libsoc_gpio_set_edge", unsafe {
            ffi::libsoc_gpio_set_edge(gpio.as_ptr(), edge)
        })
    }

    fn gpio_get_edge(&self, gpio: RawHandle) -> i32 {
        value("libsoc_gpio_get_edge", unsafe { ffi::libsoc_gpio_get_edge(gpio.as_ptr()) })
    }

    fn gpio_poll(&self, gpio: RawHandle, timeout_ms: i32) -> i32 {
        value("libsoc_gpio_poll", unsafe {
            ffi::libsoc_gpio_poll(gpio.as_ptr(), timeout_ms)
        })
    }

    fn gpio_wait_interrupt(&self, gpio: RawHandle, timeout_ms: i32) -> i32 {
        value("libsoc_gpio_wait_interrupt", unsafe {
            ffi::libsoc_gpio_wait_interrupt(gpio.as_ptr(), timeout_ms)
        })
    }

    fn adc_request(&self, chip: u32, pin: u32) -> Option<RawHandle> {
        handle("libsoc_adc_request", unsafe { ffi::libsoc_adc_request(chip, pin) })
    }

    fn adc_get_value(&self, adc: RawHandle) -> i32 {
        value("libsoc_adc_get_value", unsafe { ffi::libsoc_adc_get_value(adc.as_ptr()) })
    }

    fn adc_free(&self, adc: RawHandle) -> i32 {
        status("libsoc_adc_free", unsafe { ffi::libsoc_adc_free(adc.as_ptr()) })
    }

    fn pwm_request(&self, chip: u32, pin: u32, mode: i32) -> Option<RawHandle> {
        handle("libsoc_pwm_request", unsafe { ffi::libsoc_pwm_request(chip, pin, mode) })
    }

    fn pwm_free(&self, pwm: RawHandle) -> i32 {
        status("libsoc_pwm_free", unsafe { ffi::libsoc_pwm_free(pwm.as_ptr()) })
    }

    fn pwm_set_enabled(&self, pwm: RawHandle, enabled: i32) -> i32 {
        status("libsoc_pwm_set_enabled", unsafe {
            ffi::libsoc_pwm_set_enabled(pwm.as_ptr(), enabled)
        })
    }

    fn pwm_get_enabled(&self, pwm: RawHandle) -> i32 {
        value("libsoc_pwm_get_enabled", unsafe { ffi::libsoc_pwm_get_enabled(pwm.as_ptr()) })
    }

    fn pwm_set_polarity(&self, pwm: RawHandle, polarity: i32) -> i32 {
        status("libsoc_pwm_set_polarity", unsafe {
            ffi::libsoc_pwm_set_polarity(pwm.as_ptr(), polarity)
        })
    }

    fn pwm_get_polarity(&self, pwm: RawHandle) -> i32 {
        value("libsoc_pwm_get_polarity", unsafe {
            ffi::libsoc_pwm_get_polarity(pwm.as_ptr())
        })
    }

    fn pwm_set_duty_cycle(&self, pwm: RawHandle, duty: u32) -> i32 {
        status("libsoc_pwm_set_duty_cycle", unsafe {
            ffi::libsoc_pwm_set_duty_cycle(pwm.as_ptr(), duty)
        })
    }

    fn pwm_get_duty_cycle(&self, pwm: RawHandle) -> i32 {
        value("libsoc_pwm_get_duty_cycle", unsafe {
            ffi::libsoc_pwm_get_duty_cycle(pwm.as_ptr())
        })
    }

    fn pwm_set_period(&self, pwm: RawHandle, period: u32) -> i32 {
        status("libsoc_pwm_set_period", unsafe {
            ffi::libsoc_pwm_set_period(pwm.as_ptr(), period)
        })
    }

    fn pwm_get_period(&self, pwm: RawHandle) -> i32 {
        value("libsoc_pwm_get_period", unsafe { ffi::libsoc_pwm_get_period(pwm.as_ptr()) })
    }

    fn i2c_init(&self, bus: u8, address: u8) -> Option<RawHandle> {
        handle("libsoc_i2c_init", unsafe { ffi::libsoc_i2c_init(bus, address) })
    }

    fn i2c_free(&self, i2c: RawHandle) -> i32 {
        status("libsoc_i2c_free", unsafe { ffi::libsoc_i2c_free(i2c.as_ptr()) })
    }

    fn i2c_set_timeout(&self, i2c: RawHandle, timeout: i32) -> i32 {
        status("libsoc_i2c_set_timeout", unsafe {
            ffi::libsoc_i2c_set_timeout(i2c.as_ptr(), timeout)
        })
    }

    fn i2c_read(&self, i2c: RawHandle, buf: &mut [u8]) -> i32 {
        let len = match u16::try_from(buf.len()) {
            Ok(len) => len,
            Err(_) => return -1,
        };
        let ret = unsafe { ffi::libsoc_i2c_read(i2c.as_ptr(), buf.as_mut_ptr(), len) };
        transferred("libsoc_i2c_read", ret, buf.len())
    }

    fn i2c_write(&self, i2c: RawHandle, buf: &[u8]) -> i32 {
        let len = match u16::try_from(buf.len()) {
            Ok(len) => len,
            Err(_) => return -1,
        };
        // libsoc does not modify the buffer despite the mutable pointer.
        let ret = unsafe { ffi::libsoc_i2c_write(i2c.as_ptr(), buf.as_ptr() as *mut u8, len) };
        transferred("libsoc_i2c_write", ret, buf.len())
    }

    fn spi_init(&self, device: u8, chip_select: u8) -> Option<RawHandle> {
        handle("libsoc_spi_init", unsafe { ffi::libsoc_spi_init(device, chip_select) })
    }

    fn spi_free(&self, spi: RawHandle) -> i32 {
        status("libsoc_spi_free", unsafe { ffi::libsoc_spi_free(spi.as_ptr()) })
    }

    fn spi_set_mode(&self, spi: RawHandle, mode: i32) -> i32 {
        status("libsoc_spi_set_mode", unsafe { ffi::libsoc_spi_set_mode(spi.as_ptr(), mode) })
    }

    fn spi_get_mode(&self, spi: RawHandle) -> i32 {
        let mode = unsafe { ffi::libsoc_spi_get_mode(spi.as_ptr()) };
        traced("libsoc_spi_get_mode", mode == ffi::MODE_ERROR);
        mode
    }

    fn spi_set_speed(&self, spi: RawHandle, speed: u32) -> i32 {
        status("libsoc_spi_set_speed", unsafe {
            ffi::libsoc_spi_set_speed(spi.as_ptr(), speed)
        })
    }

    fn spi_get_speed(&self, spi: RawHandle) -> u32 {
        let speed = unsafe { ffi::libsoc_spi_get_speed(spi.as_ptr()) };
        traced("libsoc_spi_get_speed", speed == SPEED_ERROR);
        speed
    }

    fn spi_set_bits_per_word(&self, spi: RawHandle, bits: i32) -> i32 {
        status("libsoc_spi_set_bits_per_word", unsafe {
            ffi::libsoc_spi_set_bits_per_word(spi.as_ptr(), bits)
        })
    }

    fn spi_get_bits_per_word(&self, spi: RawHandle) -> i32 {
        let bits = unsafe { ffi::libsoc_spi_get_bits_per_word(spi.as_ptr()) };
        traced("libsoc_spi_get_bits_per_word", bits == ffi::BPW_ERROR);
        bits
    }

    fn spi_read(&self, spi: RawHandle, rx: &mut [u8]) -> i32 {
        let len = match u32::try_from(rx.len()) {
            Ok(len) => len,
            Err(_) => return -1,
        };
        status("libsoc_spi_read", unsafe {
            ffi::libsoc_spi_read(spi.as_ptr(), rx.as_mut_ptr(), len)
        })
    }

    fn spi_write(&self, spi: RawHandle, tx: &[u8]) -> i32 {
        let len = match u32::try_from(tx.len()) {
            Ok(len) => len,
            Err(_) => return -1,
        };
        status("libsoc_spi_write", unsafe {
            ffi::libsoc_spi_write(spi.as_ptr(), tx.as_ptr() as *mut u8, len)
        })
    }

    fn spi_rw(&self, spi: RawHandle, tx: &[u8], rx: &mut [u8]) -> i32 {
        if tx.len() != rx.len() {
            return -1;
        }
        let len = match u32::try_from(tx.len()) {
            Ok(len) => len,
            Err(_) => return -1,
        };
        status("libsoc_spi_rw", unsafe {
            ffi::libsoc_spi_rw(spi.as_ptr(), tx.as_ptr() as *mut u8, rx.as_mut_ptr(), len)
        })
    }
}
