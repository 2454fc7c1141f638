//! Linux transport: `/dev/spidevB.C` plus sysfs GPIO lines
//!
//! Lines are exported and configured when opened and unexported again when
//! their handle is dropped. With a manual chip-select line the raw bus is
//! framed by an [`ExclusiveDevice`], otherwise the kernel frames transfers.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, Error as _, Operation, SpiDevice};
use embedded_hal_bus::spi::ExclusiveDevice;
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::sysfs_gpio::Direction;
use linux_embedded_hal::{Delay, SpidevBus, SpidevDevice, SysfsPin};

use crate::ssd1677::config::Config;
use crate::ssd1677::epd::Epd;
use crate::ssd1677::error::{Error, Result};

const EXPORT_POLL_MS: u32 = 10;
const EXPORT_ATTEMPTS: u32 = 100;

/// Fully wired panel on Linux
pub type LinuxEpd = Epd<LinuxSpi, LinuxPin, LinuxPin, LinuxPin, LinuxPin, Delay>;

/// Exported sysfs GPIO line, unexported on drop
pub struct LinuxPin {
    pin: SysfsPin,
    number: u64,
}

impl LinuxPin {
    /// Export line `number` and set its direction.
    ///
    /// For outputs, `Direction::High`/`Direction::Low` also set the initial level.
    pub fn claim(number: u64, direction: Direction) -> Result<Self> {
        let pin = SysfsPin::new(number);
        let open_err = |reason: String| Error::TransportOpen {
            what: format!("gpio{number}"),
            reason,
        };

        pin.export().map_err(|e| open_err(e.to_string()))?;
        // Claim right away so a failure below still unexports the line
        let claimed = LinuxPin { pin, number };

        // udev may need a moment before the value/direction files appear
        let mut attempts = 0;
        while !claimed.pin.is_exported() {
            attempts += 1;
            if attempts > EXPORT_ATTEMPTS {
                return Err(open_err("export did not complete".to_string()));
            }
            Delay.delay_ms(EXPORT_POLL_MS);
        }

        claimed
            .pin
            .set_direction(direction)
            .map_err(|e| open_err(e.to_string()))?;
        log::debug!("Claimed gpio{} as {:?}", number, direction);
        Ok(claimed)
    }
}

impl Drop for LinuxPin {
    fn drop(&mut self) {
        if let Err(e) = self.pin.unexport() {
            log::warn!("Failed to unexport gpio{}: {}", self.number, e);
        } else {
            log::debug!("Released gpio{}", self.number);
        }
    }
}

impl digital::ErrorType for LinuxPin {
    type Error = <SysfsPin as digital::ErrorType>::Error;
}

impl InputPin for LinuxPin {
    fn is_high(&mut self) -> core::result::Result<bool, Self::Error> {
        self.pin.is_high()
    }

    fn is_low(&mut self) -> core::result::Result<bool, Self::Error> {
        self.pin.is_low()
    }
}

impl OutputPin for LinuxPin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.pin.set_low()
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.pin.set_high()
    }
}

/// SPI with kernel or manual chip-select framing
pub enum LinuxSpi {
    Kernel(SpidevDevice),
    Manual(ExclusiveDevice<SpidevBus, LinuxPin, Delay>),
}

impl spi::ErrorType for LinuxSpi {
    type Error = spi::ErrorKind;
}

impl SpiDevice for LinuxSpi {
    fn transaction(
        &mut self,
        operations: &mut [Operation<'_, u8>],
    ) -> core::result::Result<(), Self::Error> {
        match self {
            LinuxSpi::Kernel(dev) => dev.transaction(operations).map_err(|e| e.kind()),
            LinuxSpi::Manual(dev) => dev.transaction(operations).map_err(|e| e.kind()),
        }
    }
}

fn spi_options(config: &Config, manual_cs: bool) -> SpidevOptions {
    let mut mode = SpiModeFlags::SPI_MODE_0;
    if manual_cs {
        mode |= SpiModeFlags::SPI_NO_CS;
    }
    SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(config.spi_speed_hz)
        .mode(mode)
        .build()
}

/// Open the SPI device named in `config`
pub fn open_spi(config: &Config) -> Result<LinuxSpi> {
    let open_err = |reason: String| Error::TransportOpen {
        what: config.spi_device.clone(),
        reason,
    };

    match config.cs_pin {
        None => {
            let mut dev =
                SpidevDevice::open(&config.spi_device).map_err(|e| open_err(format!("{e:?}")))?;
            dev.0
                .configure(&spi_options(config, false))
                .map_err(|e| open_err(format!("{e:?}")))?;
            Ok(LinuxSpi::Kernel(dev))
        }
        Some(cs) => {
            let cs = LinuxPin::claim(cs, Direction::High)?;
            let mut bus =
                SpidevBus::open(&config.spi_device).map_err(|e| open_err(format!("{e:?}")))?;
            bus.0
                .configure(&spi_options(config, true))
                .map_err(|e| open_err(format!("{e:?}")))?;
            let dev = ExclusiveDevice::new(bus, cs, Delay)
                .map_err(|e| open_err(format!("chip select: {e:?}")))?;
            Ok(LinuxSpi::Manual(dev))
        }
    }
}

/// Claim every line and the bus, then build the driver.
///
/// Anything claimed before a failure is released again.
pub fn open(config: &Config) -> Result<LinuxEpd> {
    config.validate()?;
    log::info!(
        "Opening panel on {} (rst {}, dc {}, busy {}, pwr {})",
        config.spi_device,
        config.rst_pin,
        config.dc_pin,
        config.busy_pin,
        config.pwr_pin
    );

    let pwr = LinuxPin::claim(config.pwr_pin, Direction::Low)?;
    let rst = LinuxPin::claim(config.rst_pin, Direction::High)?;
    let dc = LinuxPin::claim(config.dc_pin, Direction::Low)?;
    let busy = LinuxPin::claim(config.busy_pin, Direction::In)?;
    let spi = open_spi(config)?;

    Epd::new(spi, busy, dc, rst, pwr, Delay, config)
}
