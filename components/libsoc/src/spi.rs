//! SPI devices through spidev
//!
//! Every transfer is a single message with chip select held for its whole length.

use byteorder::{ByteOrder, NativeEndian};
use std::convert::TryFrom;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};
use crate::backend::{RawHandle, SPEED_ERROR};
use crate::error::*;
use crate::resource::{check, Resource, Slot};
use crate::Soc;

raw_enum! {
    /// Clock polarity and phase.
    pub enum SpiMode {
        Mode0 = 0 => "0" | "mode0",
        Mode1 = 1 => "1" | "mode1",
        Mode2 = 2 => "2" | "mode2",
        Mode3 = 3 => "3" | "mode3",
    }
}

raw_enum! {
    pub enum BitsPerWord {
        Eight = 8 => "8",
        Sixteen = 16 => "16",
    }
}

#[derive(Copy, Clone, Debug)]
struct Settings {
    mode: SpiMode,
    speed: u32,
    bits_per_word: BitsPerWord,
}

pub struct Spi {
    soc: Soc,
    device: u8,
    chip_select: u8,
    settings: Mutex<Settings>,
    slot: Slot,
}

impl Spi {
    /// Describe `/dev/spidev<device>.<chip_select>`. The settings are applied on `open`.
    pub fn new(
        soc: &Soc,
        device: u8,
        chip_select: u8,
        mode: SpiMode,
        speed: u32,
        bits_per_word: BitsPerWord,
    ) -> Result<Spi> {
        if speed == 0 {
            return Err(Error::InvalidArgument("SPI speed must be above 0Hz".to_string()));
        }
        Ok(Spi {
            soc: soc.clone(),
            device,
            chip_select,
            settings: Mutex::new(Settings {
                mode,
                speed,
                bits_per_word,
            }),
            slot: Slot::new(),
        })
    }

    pub fn open(&self) -> Result<()> {
        let backend = self.soc.backend();
        let settings = self.settings();
        self.slot.open(|| {
            let handle = backend
                .spi_init(self.device, self.chip_select)
                .ok_or_else(|| Error::Unavailable(format!("Unable to open {}", self)))?;
            if let Err(err) = self.configure(handle, settings) {
                if backend.spi_free(handle) != 0 {
                    warn!(device = self.device, cs = self.chip_select, "could not free after failed setup");
                }
                return Err(err);
            }
            debug!(device = self.device, cs = self.chip_select, ?settings, "spi opened");
            Ok(handle)
        })
    }

    pub fn close(&self) -> Result<()> {
        let backend = self.soc.backend();
        self.slot.close(|handle| {
            check(backend.spi_free(handle), || format!("Unable to free {}", self))
        })
    }

    pub fn is_open(&self) -> bool {
        self.slot.is_open()
    }

    pub fn mode(&self) -> Result<SpiMode> {
        self.slot.with(|handle| self.read_mode(handle))
    }

    pub fn set_mode(&self, mode: SpiMode) -> Result<()> {
        self.slot.with(|handle| self.write_mode(handle, mode))?;
        self.settings_mut(|settings| settings.mode = mode);
        Ok(())
    }

    /// The clock speed in Hz.
    pub fn speed(&self) -> Result<u32> {
        self.slot.with(|handle| self.read_speed(handle))
    }

    pub fn set_speed(&self, speed: u32) -> Result<()> {
        if speed == 0 {
            return Err(Error::InvalidArgument("SPI speed must be above 0Hz".to_string()));
        }
        self.slot.with(|handle| self.write_speed(handle, speed))?;
        self.settings_mut(|settings| settings.speed = speed);
        Ok(())
    }

    pub fn bits_per_word(&self) -> Result<BitsPerWord> {
        self.slot.with(|handle| self.read_bits_per_word(handle))
    }

    pub fn set_bits_per_word(&self, bits_per_word: BitsPerWord) -> Result<()> {
        self.slot.with(|handle| self.write_bits_per_word(handle, bits_per_word))?;
        self.settings_mut(|settings| settings.bits_per_word = bits_per_word);
        Ok(())
    }

    pub fn read(&self, len: usize) -> Result<Vec<u8>> {
        check_len(len)?;
        let mut rx = vec![0; len];
        let status = self.slot.with(|handle| Ok(self.soc.backend().spi_read(handle, &mut rx)))?;
        check(status, || format!("Error reading from {}", self))?;
        Ok(rx)
    }

    pub fn write(&self, tx: &[u8]) -> Result<()> {
        check_len(tx.len())?;
        let status = self.slot.with(|handle| Ok(self.soc.backend().spi_write(handle, tx)))?;
        check(status, || format!("Error writing to {}", self))
    }

    /// Full duplex transfer, returns as many bytes as were sent.
    pub fn transfer(&self, tx: &[u8]) -> Result<Vec<u8>> {
        check_len(tx.len())?;
        let mut rx = vec![0; tx.len()];
        let status = self
            .slot
            .with(|handle| Ok(self.soc.backend().spi_rw(handle, tx, &mut rx)))?;
        check(status, || format!("Error transferring with {}", self))?;
        Ok(rx)
    }

    /// Write 16-bit words. The device must be set to 16 bits per word.
    pub fn write_words(&self, words: &[u16]) -> Result<()> {
        self.require_words()?;
        self.write(&words_to_bytes(words))
    }

    /// Full duplex transfer of 16-bit words. The device must be set to 16 bits per word.
    pub fn transfer_words(&self, words: &[u16]) -> Result<Vec<u16>> {
        self.require_words()?;
        let rx = self.transfer(&words_to_bytes(words))?;
        let mut out = vec![0; words.len()];
        NativeEndian::read_u16_into(&rx, &mut out);
        Ok(out)
    }

    fn require_words(&self) -> Result<()> {
        match self.bits_per_word()? {
            BitsPerWord::Sixteen => Ok(()),
            BitsPerWord::Eight => Err(Error::InvalidArgument(format!(
                "{} is not set to 16 bits per word",
                self
            ))),
        }
    }

    /// Apply each setting and verify the device took it.
    fn configure(&self, handle: RawHandle, settings: Settings) -> Result<()> {
        self.write_mode(handle, settings.mode)?;
        if self.read_mode(handle)? != settings.mode {
            return Err(Error::Operation(format!("Set mode incorrectly on {}", self)));
        }
        self.write_speed(handle, settings.speed)?;
        if self.read_speed(handle)? != settings.speed {
            return Err(Error::Operation(format!("Set speed incorrectly on {}", self)));
        }
        self.write_bits_per_word(handle, settings.bits_per_word)?;
        if self.read_bits_per_word(handle)? != settings.bits_per_word {
            return Err(Error::Operation(format!(
                "Set bits per word incorrectly on {}",
                self
            )));
        }
        Ok(())
    }

    fn read_mode(&self, handle: RawHandle) -> Result<SpiMode> {
        SpiMode::try_from(self.soc.backend().spi_get_mode(handle))
            .map_err(|_| Error::Operation(format!("Error reading {} mode", self)))
    }

    fn write_mode(&self, handle: RawHandle, mode: SpiMode) -> Result<()> {
        check(self.soc.backend().spi_set_mode(handle, mode.to_raw()), || {
            format!("Error setting {} to mode {}", self, mode)
        })
    }

    fn read_speed(&self, handle: RawHandle) -> Result<u32> {
        match self.soc.backend().spi_get_speed(handle) {
            SPEED_ERROR => Err(Error::Operation(format!("Error reading {} speed", self))),
            speed => Ok(speed),
        }
    }

    fn write_speed(&self, handle: RawHandle, speed: u32) -> Result<()> {
        check(self.soc.backend().spi_set_speed(handle, speed), || {
            format!("Error setting {} speed to {}Hz", self, speed)
        })
    }

    fn read_bits_per_word(&self, handle: RawHandle) -> Result<BitsPerWord> {
        BitsPerWord::try_from(self.soc.backend().spi_get_bits_per_word(handle))
            .map_err(|_| Error::Operation(format!("Error reading {} bits per word", self)))
    }

    fn write_bits_per_word(&self, handle: RawHandle, bits_per_word: BitsPerWord) -> Result<()> {
        check(
            self.soc.backend().spi_set_bits_per_word(handle, bits_per_word.to_raw()),
            || format!("Error setting {} to {} bits per word", self, bits_per_word),
        )
    }

    fn settings(&self) -> Settings {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settings_mut<F: FnOnce(&mut Settings)>(&self, f: F) {
        f(&mut self.settings.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn check_len(len: usize) -> Result<()> {
    if len == 0 {
        return Err(Error::InvalidArgument("empty SPI transfer".to_string()));
    }
    Ok(())
}

fn words_to_bytes(words: &[u16]) -> Vec<u8> {
    let mut bytes = vec![0; words.len() * 2];
    NativeEndian::write_u16_into(words, &mut bytes);
    bytes
}

impl fmt::Display for Spi {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "spidev{}.{}", self.device, self.chip_select)
    }
}

impl Resource for Spi {
    fn open(&self) -> Result<()> {
        Spi::open(self)
    }

    fn close(&self) -> Result<()> {
        Spi::close(self)
    }

    fn is_open(&self) -> bool {
        Spi::is_open(self)
    }
}

impl Drop for Spi {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(device = self.device, cs = self.chip_select, %err, "could not close on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate rand;
    use self::rand::Rng;
    use super::*;
    use std::sync::Arc;
    use crate::sim::SimBoard;

    fn board() -> (Arc<SimBoard>, Soc) {
        let board = Arc::new(SimBoard::new());
        board.add_spi(1, 0);
        let soc = Soc::shared(Arc::clone(&board));
        (board, soc)
    }

    fn spi(soc: &Soc, bits: BitsPerWord) -> Spi {
        let spi = Spi::new(soc, 1, 0, SpiMode::Mode0, 1_000_000, bits).unwrap();
        spi.open().unwrap();
        spi
    }

    #[test]
    fn open_applies_settings() {
        let (_, soc) = board();
        let spi = Spi::new(&soc, 1, 0, SpiMode::Mode3, 4_000_000, BitsPerWord::Sixteen).unwrap();
        spi.open().unwrap();
        assert_eq!(spi.mode().unwrap(), SpiMode::Mode3);
        assert_eq!(spi.speed().unwrap(), 4_000_000);
        assert_eq!(spi.bits_per_word().unwrap(), BitsPerWord::Sixteen);
    }

    #[test]
    fn setters_round_trip() {
        let (_, soc) = board();
        let spi = spi(&soc, BitsPerWord::Eight);
        for &mode in &[SpiMode::Mode1, SpiMode::Mode2, SpiMode::Mode0] {
            spi.set_mode(mode).unwrap();
            assert_eq!(spi.mode().unwrap(), mode);
        }
        spi.set_speed(10_000).unwrap();
        assert_eq!(spi.speed().unwrap(), 10_000);
        spi.set_bits_per_word(BitsPerWord::Sixteen).unwrap();
        assert_eq!(spi.bits_per_word().unwrap(), BitsPerWord::Sixteen);
        assert!(spi.set_speed(0).is_err());

        spi.close().unwrap();
        spi.open().unwrap();
        assert_eq!(spi.speed().unwrap(), 10_000);
    }

    #[test]
    fn loopback_transfer() {
        let (_, soc) = board();
        let spi = spi(&soc, BitsPerWord::Eight);
        let tx = [0x01, 0x80, 0x00];
        assert_eq!(spi.transfer(&tx).unwrap(), tx.to_vec());

        let mut rng = rand::thread_rng();
        let payload: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
        spi.write(&payload).unwrap();
        assert_eq!(spi.read(payload.len()).unwrap(), payload);
        assert!(spi.transfer(&[]).is_err());
        assert!(spi.read(0).is_err());
    }

    #[test]
    fn sixteen_bit_words() {
        let (_, soc) = board();
        let spi = spi(&soc, BitsPerWord::Eight);
        match spi.write_words(&[0x1234]) {
            Err(Error::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
        spi.set_bits_per_word(BitsPerWord::Sixteen).unwrap();
        spi.write_words(&[0xbeef]).unwrap();
        assert_eq!(spi.transfer_words(&[0x0102, 0xfffe]).unwrap(), vec![0x0102, 0xfffe]);
    }

    #[test]
    fn zero_speed_is_rejected() {
        let (_, soc) = board();
        match Spi::new(&soc, 1, 0, SpiMode::Mode0, 0, BitsPerWord::Eight) {
            Err(Error::InvalidArgument(_)) => {}
            _ => panic!("expected InvalidArgument"),
        }
    }

    #[test]
    fn absent_device() {
        let (board, soc) = board();
        let spi = Spi::new(&soc, 0, 1, SpiMode::Mode0, 500_000, BitsPerWord::Eight).unwrap();
        match spi.open() {
            Err(Error::Unavailable(msg)) => assert_eq!(msg, "Unable to open spidev0.1"),
            other => panic!("expected Unavailable, got {:?}", other),
        }
        assert_eq!(board.open_handles(), 0);
    }

    #[test]
    fn names() {
        assert_eq!("2".parse::<SpiMode>().unwrap(), SpiMode::Mode2);
        assert_eq!("MODE3".parse::<SpiMode>().unwrap(), SpiMode::Mode3);
        assert_eq!("16".parse::<BitsPerWord>().unwrap(), BitsPerWord::Sixteen);
        assert!("12".parse::<BitsPerWord>().is_err());
        assert_eq!(BitsPerWord::try_from(8).unwrap(), BitsPerWord::Eight);
        assert!(SpiMode::try_from(4).is_err());
    }
}
