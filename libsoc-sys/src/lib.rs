//! Raw bindings to [libsoc](https://github.com/jackmitch/libsoc).
//!
//! Only the public call surface of the library is declared here. The structs behind the returned
//! pointers are private to the library and must be treated as opaque.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_int, c_uint, c_void};

pub enum gpio {}

pub enum adc {}

pub enum pwm {}

pub enum i2c {}

pub enum spi {}

pub enum board_config {}

// gpio_direction
pub const DIRECTION_ERROR: c_int = -1;
pub const INPUT: c_int = 0;
pub const OUTPUT: c_int = 1;

// gpio_level
pub const LEVEL_ERROR: c_int = -1;
pub const LOW: c_int = 0;
pub const HIGH: c_int = 1;

// gpio_edge
pub const EDGE_ERROR: c_int = -1;
pub const RISING: c_int = 0;
pub const FALLING: c_int = 1;
pub const NONE: c_int = 2;
pub const BOTH: c_int = 3;

// gpio_mode and shared_mode share their values.
pub const LS_SHARED: c_int = 0;
pub const LS_GREEDY: c_int = 1;
pub const LS_WEAK: c_int = 2;

// gpio_int_ret
pub const LS_INT_ERROR: c_int = -1;
pub const LS_INT_TRIGGERED: c_int = 0;
pub const LS_INT_TIMEOUT: c_int = 1;

// pwm_enabled
pub const ENABLED_ERROR: c_int = -1;
pub const DISABLED: c_int = 0;
pub const ENABLED: c_int = 1;

// pwm_polarity
pub const POLARITY_ERROR: c_int = -1;
pub const NORMAL: c_int = 0;
pub const INVERSED: c_int = 1;

// spi_bpw
pub const BITS_8: c_int = 8;
pub const BITS_16: c_int = 16;
pub const BPW_ERROR: c_int = 17;

// spi_mode
pub const MODE_0: c_int = 0;
pub const MODE_1: c_int = 1;
pub const MODE_2: c_int = 2;
pub const MODE_3: c_int = 3;
pub const MODE_ERROR: c_int = 4;

pub const EXIT_SUCCESS: c_int = 0;
pub const EXIT_FAILURE: c_int = 1;

extern "C" {
    pub fn libsoc_set_debug(level: c_int);
    pub fn libsoc_get_debug() -> c_int;

    pub fn libsoc_board_init() -> *mut board_config;
    pub fn libsoc_board_free(config: *mut board_config);
    pub fn libsoc_board_gpio_id(config: *mut board_config, pin: *const c_char) -> c_int;

    pub fn libsoc_gpio_request(gpio_id: c_uint, mode: c_int) -> *mut gpio;
    pub fn libsoc_gpio_free(gpio: *mut gpio) -> c_int;
    pub fn libsoc_gpio_set_direction(gpio: *mut gpio, direction: c_int) -> c_int;
    pub fn libsoc_gpio_get_direction(gpio: *mut gpio) -> c_int;
    pub fn libsoc_gpio_set_level(gpio: *mut gpio, level: c_int) -> c_int;
    pub fn libsoc_gpio_get_level(gpio: *mut gpio) -> c_int;
    pub fn libsoc_gpio_set_edge(gpio: *mut gpio, edge: c_int) -> c_int;
    pub fn libsoc_gpio_get_edge(gpio: *mut gpio) -> c_int;
    pub fn libsoc_gpio_poll(gpio: *mut gpio, timeout: c_int) -> c_int;
    pub fn libsoc_gpio_wait_interrupt(gpio: *mut gpio, timeout: c_int) -> c_int;
    pub fn libsoc_gpio_callback_interrupt(
        gpio: *mut gpio,
        callback_fn: Option<unsafe extern "C" fn(*mut c_void) -> c_int>,
        arg: *mut c_void,
    ) -> c_int;
    pub fn libsoc_gpio_callback_interrupt_cancel(gpio: *mut gpio) -> c_int;

    pub fn libsoc_adc_request(adc_chip: c_uint, adc_num: c_uint) -> *mut adc;
    pub fn libsoc_adc_get_value(adc: *mut adc) -> c_int;
    pub fn libsoc_adc_free(adc: *mut adc) -> c_int;

    pub fn libsoc_pwm_request(pwm_chip: c_uint, pwm_num: c_uint, mode: c_int) -> *mut pwm;
    pub fn libsoc_pwm_free(pwm: *mut pwm) -> c_int;
    pub fn libsoc_pwm_set_enabled(pwm: *mut pwm, enabled: c_int) -> c_int;
    pub fn libsoc_pwm_get_enabled(pwm: *mut pwm) -> c_int;
    pub fn libsoc_pwm_set_polarity(pwm: *mut pwm, polarity: c_int) -> c_int;
    pub fn libsoc_pwm_get_polarity(pwm: *mut pwm) -> c_int;
    pub fn libsoc_pwm_set_duty_cycle(pwm: *mut pwm, duty: c_uint) -> c_int;
    pub fn libsoc_pwm_get_duty_cycle(pwm: *mut pwm) -> c_int;
    pub fn libsoc_pwm_set_period(pwm: *mut pwm, period: c_uint) -> c_int;
    pub fn libsoc_pwm_get_period(pwm: *mut pwm) -> c_int;

    pub fn libsoc_i2c_init(i2c_bus: u8, i2c_address: u8) -> *mut i2c;
    pub fn libsoc_i2c_free(i2c: *mut i2c) -> c_int;
    pub fn libsoc_i2c_write(i2c: *mut i2c, buffer: *mut u8, len: u16) -> c_int;
    pub fn libsoc_i2c_read(i2c: *mut i2c, buffer: *mut u8, len: u16) -> c_int;
    pub fn libsoc_i2c_set_timeout(i2c: *mut i2c, timeout: c_int) -> c_int;

    pub fn libsoc_spi_init(spidev_device: u8, chip_select: u8) -> *mut spi;
    pub fn libsoc_spi_free(spi: *mut spi) -> c_int;
    pub fn libsoc_spi_set_mode(spi: *mut spi, mode: c_int) -> c_int;
    pub fn libsoc_spi_get_mode(spi: *mut spi) -> c_int;
    pub fn libsoc_spi_set_speed(spi: *mut spi, speed: u32) -> c_int;
    pub fn libsoc_spi_get_speed(spi: *mut spi) -> u32;
    pub fn libsoc_spi_set_bits_per_word(spi: *mut spi, bpw: c_int) -> c_int;
    pub fn libsoc_spi_get_bits_per_word(spi: *mut spi) -> c_int;
    pub fn libsoc_spi_write(spi: *mut spi, tx: *mut u8, len: u32) -> c_int;
    pub fn libsoc_spi_read(spi: *mut spi, rx: *mut u8, len: u32) -> c_int;
    pub fn libsoc_spi_rw(spi: *mut spi, tx: *mut u8, rx: *mut u8, len: u32) -> c_int;
}
