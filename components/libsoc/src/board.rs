//! Board pin names
//!
//! libsoc reads a board configuration mapping the names printed on a board's headers to GPIO
//! numbers. The file is found through the `LIBSOC_CONF` environment variable.

use std::fmt;
use tracing::{debug, warn};
use crate::error::*;
use crate::gpio::{Direction, Gpio};
use crate::resource::{Resource, Slot};
use crate::Soc;

pub struct Board {
    soc: Soc,
    slot: Slot,
}

impl Board {
    pub fn new(soc: &Soc) -> Board {
        Board {
            soc: soc.clone(),
            slot: Slot::new(),
        }
    }

    /// Load the board configuration.
    pub fn open(&self) -> Result<()> {
        let backend = self.soc.backend();
        self.slot.open(|| {
            let handle = backend.board_init().ok_or_else(|| {
                Error::Unavailable("Unable to load board configuration".to_string())
            })?;
            debug!("board configuration loaded");
            Ok(handle)
        })
    }

    pub fn close(&self) -> Result<()> {
        let backend = self.soc.backend();
        self.slot.close(|handle| {
            backend.board_free(handle);
            Ok(())
        })
    }

    pub fn is_open(&self) -> bool {
        self.slot.is_open()
    }

    /// The GPIO number of a pin name such as `P9_12`.
    pub fn gpio_id(&self, pin: &str) -> Result<u32> {
        let invalid = || Error::InvalidArgument(format!("Invalid GPIO pin name({})", pin));
        if pin.is_empty() || pin.contains('\0') {
            return Err(invalid());
        }
        let id = self
            .slot
            .with(|handle| Ok(self.soc.backend().board_gpio_id(handle, pin)))?;
        if id < 0 {
            return Err(invalid());
        }
        Ok(id as u32)
    }

    /// A GPIO described by its pin name. It still has to be opened.
    pub fn gpio(&self, pin: &str, direction: Direction) -> Result<Gpio> {
        let id = self.gpio_id(pin)?;
        debug!(pin, gpio = id, "resolved pin name");
        Ok(Gpio::new(&self.soc, id, direction))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("board configuration")
    }
}

impl Resource for Board {
    fn open(&self) -> Result<()> {
        Board::open(self)
    }

    fn close(&self) -> Result<()> {
        Board::close(self)
    }

    fn is_open(&self) -> bool {
        Board::is_open(self)
    }
}

impl Drop for Board {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(%err, "could not free board configuration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::sim::SimBoard;

    fn beaglebone() -> (Arc<SimBoard>, Soc) {
        let board = Arc::new(SimBoard::new());
        board.set_board_config("[GPIO]\nP9_12 = 60\nP8_7 = 66\n".parse().unwrap());
        board.add_gpio(60);
        let soc = Soc::shared(Arc::clone(&board));
        (board, soc)
    }

    #[test]
    fn resolves_pin_names() {
        let (_, soc) = beaglebone();
        let board = Board::new(&soc);
        board.open().unwrap();
        assert_eq!(board.gpio_id("P9_12").unwrap(), 60);
        assert_eq!(board.gpio_id("P8_7").unwrap(), 66);

        let gpio = board.gpio("P9_12", Direction::Output).unwrap();
        assert_eq!(gpio.id(), 60);
        gpio.open().unwrap();
    }

    #[test]
    fn unknown_names_are_invalid() {
        let (_, soc) = beaglebone();
        let board = Board::new(&soc);
        board.open().unwrap();
        for name in &["P9_99", "", "P9\012"] {
            match board.gpio_id(name) {
                Err(Error::InvalidArgument(msg)) => assert!(msg.starts_with("Invalid GPIO pin name")),
                other => panic!("{:?} resolved to {:?}", name, other),
            }
        }
    }

    #[test]
    fn needs_configuration() {
        let soc = Soc::new(SimBoard::new());
        let board = Board::new(&soc);
        match board.gpio_id("P9_12") {
            Err(Error::Closed) => {}
            other => panic!("expected Closed, got {:?}", other),
        }
        match board.open() {
            Err(Error::Unavailable(msg)) => assert_eq!(msg, "Unable to load board configuration"),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn close_releases_configuration() {
        let (sim, soc) = beaglebone();
        let board = Board::new(&soc);
        board.open().unwrap();
        assert_eq!(sim.open_handles(), 1);
        drop(board);
        assert_eq!(sim.open_handles(), 0);
    }
}
