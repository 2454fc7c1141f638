//! Display interface using SPI
//!
//! Command/data framing over the D/C line, the reset pulse, the power line
//! and the busy line poll.

use std::time::{Duration, Instant};

use display_interface::DisplayError;
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use crate::ssd1677::error::{Error, Result};

/// Largest single SPI write, the default spidev transfer limit
pub const MAX_TRANSFER: usize = 4096;

const RESET_HOLD_MS: u32 = 20;
const RESET_PULSE_MS: u32 = 2;
const POWER_SETTLE_MS: u32 = 100;

/// Outcome of a busy line wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyStatus {
    /// Line went low after `polls` reads that saw it high
    Ready { polls: u32 },
    /// Gave up after `polls` reads, the panel may still be working
    TimedOut { polls: u32 },
}

impl BusyStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, BusyStatus::Ready { .. })
    }
}

/// Bus and control lines of one panel
pub struct DisplayInterface<SPI, BSY, DC, RST, PWR, DELAY> {
    /// SPI device, frames every write with chip select
    spi: SPI,
    /// High while the controller is busy
    busy: BSY,
    /// Data/Command Control Pin (High for data, Low for command)
    dc: DC,
    /// Active low reset
    rst: RST,
    /// Panel power enable, high = on
    pwr: PWR,
    delay: DELAY,
    busy_poll_interval_ms: u32,
    busy_timeout_ms: u32,
}

impl<SPI, BSY, DC, RST, PWR, DELAY> DisplayInterface<SPI, BSY, DC, RST, PWR, DELAY> {
    pub fn new(spi: SPI, busy: BSY, dc: DC, rst: RST, pwr: PWR, delay: DELAY) -> Self {
        DisplayInterface {
            spi,
            busy,
            dc,
            rst,
            pwr,
            delay,
            busy_poll_interval_ms: 10,
            busy_timeout_ms: 10_000,
        }
    }

    /// Poll interval and overall limit of [`wait_busy_low`](Self::wait_busy_low)
    pub fn with_busy_timing(mut self, poll_interval_ms: u32, timeout_ms: u32) -> Self {
        self.busy_poll_interval_ms = poll_interval_ms.max(1);
        self.busy_timeout_ms = timeout_ms;
        self
    }

    fn max_polls(&self) -> u32 {
        (self.busy_timeout_ms / self.busy_poll_interval_ms).max(1)
    }
}

impl<SPI, BSY, DC, RST, PWR, DELAY> DisplayInterface<SPI, BSY, DC, RST, PWR, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    PWR: OutputPin,
    DELAY: DelayNs,
{
    /// Basic function for sending commands
    pub fn cmd(&mut self, command: u8) -> Result<()> {
        // low for commands
        self.dc.set_low().map_err(|_| DisplayError::DCError)?;

        log::debug!("cmd 0x{:02X}", command);
        match self.spi.write(&[command]) {
            Ok(_) => Ok(()),
            Err(e) => {
                log::error!("SPI write error for command 0x{:02X}: {:?}", command, e);
                Err(DisplayError::BusWriteError.into())
            }
        }
    }

    /// Send data bytes, split into transfers of at most [`MAX_TRANSFER`]
    pub fn data(&mut self, data: &[u8]) -> Result<()> {
        // high for data
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;

        let chunks = data.len().div_ceil(MAX_TRANSFER);
        for (i, chunk) in data.chunks(MAX_TRANSFER).enumerate() {
            if chunks > 1 {
                log::debug!("data chunk {}/{} ({} bytes)", i + 1, chunks, chunk.len());
            }
            if let Err(e) = self.spi.write(chunk) {
                log::error!("SPI write error after {} data bytes: {:?}", i * MAX_TRANSFER, e);
                return Err(DisplayError::BusWriteError.into());
            }
        }
        Ok(())
    }

    /// Basic function for sending a command and the data belonging to it.
    pub fn cmd_with_data(&mut self, command: u8, data: &[u8]) -> Result<()> {
        self.cmd(command)?;
        self.data(data)
    }

    /// Hardware reset pulse: high 20 ms, low 2 ms, high 20 ms
    pub fn reset(&mut self) -> Result<()> {
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_HOLD_MS);
        self.rst.set_low().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_PULSE_MS);
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_HOLD_MS);
        Ok(())
    }

    /// Switch panel power on and let it settle
    pub fn power_on(&mut self) -> Result<()> {
        log::debug!("Panel power on");
        self.pwr.set_high().map_err(|_| Error::PowerLine)?;
        self.delay.delay_ms(POWER_SETTLE_MS);
        Ok(())
    }

    pub fn power_off(&mut self) -> Result<()> {
        log::debug!("Panel power off");
        self.pwr.set_low().map_err(|_| Error::PowerLine)
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Wait for the busy line to go low.
    ///
    /// Gives up after the poll cap or the wall-clock timeout, whichever comes
    /// first, and reports [`BusyStatus::TimedOut`] instead of blocking forever.
    /// Only a failing read of the line is an error.
    pub fn wait_busy_low(&mut self) -> Result<BusyStatus> {
        let max_polls = self.max_polls();
        let deadline = Duration::from_millis(self.busy_timeout_ms as u64);
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            match self.busy.is_high() {
                Ok(false) => {
                    log::debug!("Busy line low after {} polls", polls);
                    return Ok(BusyStatus::Ready { polls });
                }
                Ok(true) => polls += 1,
                Err(e) => {
                    log::error!("Error reading BUSY pin state: {:?}", e);
                    return Err(Error::BusyRead);
                }
            }

            if polls >= max_polls || started.elapsed() >= deadline {
                log::warn!(
                    "Busy line still high after {} polls ({:?}), continuing",
                    polls,
                    started.elapsed()
                );
                return Ok(BusyStatus::TimedOut { polls });
            }
            self.delay.delay_ms(self.busy_poll_interval_ms);
        }
    }
}
