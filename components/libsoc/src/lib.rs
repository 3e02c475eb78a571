//! libsoc bindings
//!
//! Typed wrappers around [libsoc](https://github.com/jackmitch/libsoc), a C library that drives
//! GPIO, ADC, PWM, I2C and SPI peripherals of embedded Linux boards through sysfs and spidev.
//!
//! All peripherals are reached through a `Soc`, which holds the `Backend` doing the actual work.
//! With the `native` feature enabled `Soc::native()` calls into the shared library. The `sim`
//! module provides an in-memory board honoring the same contract, so code using the wrappers can
//! be exercised without hardware.
//!
//! Every peripheral follows the same lifecycle: construct it, `open()` it, use it, `close()` it.
//! Dropping an open peripheral closes it. Several peripherals can be opened as a group with
//! `request_all`, which closes them in reverse order.
//!
//! ```
//! use libsoc::{Direction, Gpio, Soc};
//! use libsoc::sim::SimBoard;
//!
//! let board = SimBoard::new();
//! board.add_gpio(17);
//! let soc = Soc::new(board);
//! let led = Gpio::new(&soc, 17, Direction::Output);
//! led.open().unwrap();
//! led.set_high().unwrap();
//! assert!(led.is_high().unwrap());
//! ```

#[macro_use]
extern crate derive_error;

#[macro_use]
mod macros;
mod resource;

pub mod adc;
pub mod backend;
pub mod board;
pub mod conffile;
pub mod error;
pub mod gpio;
pub mod i2c;
#[cfg(feature = "native")]
pub mod native;
pub mod pwm;
pub mod sim;
pub mod spi;

use std::fmt;
use std::sync::Arc;
use tracing::debug;
use crate::backend::Backend;

pub use crate::adc::Adc;
pub use crate::board::Board;
pub use crate::error::{Error, Result};
pub use crate::gpio::{Direction, Edge, Gpio, InterruptHandler, Level};
pub use crate::i2c::I2c;
pub use crate::pwm::{Polarity, Pwm};
pub use crate::resource::{request_all, with_resources, Requested, Resource};
pub use crate::spi::{BitsPerWord, Spi, SpiMode};

raw_enum! {
    /// How a pin is shared with other users of libsoc.
    pub enum Ownership {
        /// Use the pin even if it is already exported, leave it exported when done.
        Shared = 0 => "shared",
        /// Use the pin even if it is already exported, unexport it when done.
        Greedy = 1 => "greedy",
        /// Refuse the pin if it is already exported.
        Weak = 2 => "weak",
    }
}

impl Default for Ownership {
    fn default() -> Ownership {
        Ownership::Shared
    }
}

/// Handle to the library providing peripheral access.
///
/// Cloning is cheap, all clones share the same backend.
#[derive(Clone)]
pub struct Soc {
    backend: Arc<dyn Backend>,
}

impl Soc {
    pub fn new<B: Backend + 'static>(backend: B) -> Soc {
        Soc {
            backend: Arc::new(backend),
        }
    }

    /// Use a backend that is also referenced elsewhere, e.g. a `SimBoard` that a test drives.
    pub fn shared<B: Backend + 'static>(backend: Arc<B>) -> Soc {
        Soc { backend }
    }

    /// The system's libsoc.
    #[cfg(feature = "native")]
    pub fn native() -> Soc {
        Soc::new(native::Libsoc)
    }

    /// Toggle the debug output of the backend.
    pub fn set_debug(&self, enabled: bool) {
        debug!(enabled, "setting backend debug output");
        self.backend.set_debug(if enabled { 1 } else { 0 });
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        &*self.backend
    }
}

impl fmt::Debug for Soc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Soc")
    }
}
