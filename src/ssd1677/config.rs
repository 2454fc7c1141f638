//! Runtime configuration: bus device, GPIO lines, panel size and timing knobs

use std::env;
use std::str::FromStr;

use crate::ssd1677::error::{Error, Result};
use crate::ssd1677::pins::Pins;
use crate::ssd1677::{HEIGHT, WIDTH};

const ENV_PREFIX: &str = "INKPANEL_";

/// Everything needed to open a panel session.
///
/// Defaults match the wiring in [`Pins`] and an 800x480 glass.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub spi_device: String,
    pub spi_speed_hz: u32,
    pub rst_pin: u64,
    pub dc_pin: u64,
    pub busy_pin: u64,
    pub pwr_pin: u64,
    /// Manual chip-select line; `None` leaves framing to the kernel driver
    pub cs_pin: Option<u64>,
    pub width: u16,
    pub height: u16,
    /// Report per-phase elapsed times
    pub verbose_timing: bool,
    pub busy_poll_interval_ms: u32,
    pub busy_timeout_ms: u32,
    /// Also blank the secondary (0x26) RAM bank on clear
    pub clear_secondary_ram: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            spi_device: Pins::SPI_DEVICE.to_string(),
            spi_speed_hz: Pins::SPI_SPEED_HZ,
            rst_pin: Pins::RST,
            dc_pin: Pins::DC,
            busy_pin: Pins::BSY,
            pwr_pin: Pins::PWR,
            cs_pin: None,
            width: WIDTH,
            height: HEIGHT,
            verbose_timing: false,
            busy_poll_interval_ms: 10,
            busy_timeout_ms: 10_000,
            clear_secondary_ram: true,
        }
    }
}

impl Config {
    /// Defaults overlaid with any `INKPANEL_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Config::default();

        if let Some(device) = get("SPI_DEVICE") {
            config.spi_device = device;
        }
        if let Some(v) = get("SPI_SPEED_HZ") {
            config.spi_speed_hz = parse("SPI_SPEED_HZ", &v)?;
        }
        if let Some(v) = get("RST_PIN") {
            config.rst_pin = parse("RST_PIN", &v)?;
        }
        if let Some(v) = get("DC_PIN") {
            config.dc_pin = parse("DC_PIN", &v)?;
        }
        if let Some(v) = get("BUSY_PIN") {
            config.busy_pin = parse("BUSY_PIN", &v)?;
        }
        if let Some(v) = get("PWR_PIN") {
            config.pwr_pin = parse("PWR_PIN", &v)?;
        }
        if let Some(v) = get("CS_PIN") {
            config.cs_pin = match v.trim() {
                "" | "none" => None,
                other => Some(parse("CS_PIN", other)?),
            };
        }
        if let Some(v) = get("WIDTH") {
            config.width = parse("WIDTH", &v)?;
        }
        if let Some(v) = get("HEIGHT") {
            config.height = parse("HEIGHT", &v)?;
        }
        if let Some(v) = get("VERBOSE_TIMING") {
            config.verbose_timing = parse_bool("VERBOSE_TIMING", &v)?;
        }

        log::debug!("Configuration: {:?}", config);
        Ok(config)
    }

    pub fn with_spi_device(mut self, device: impl Into<String>) -> Self {
        self.spi_device = device.into();
        self
    }

    pub fn with_spi_speed_hz(mut self, hz: u32) -> Self {
        self.spi_speed_hz = hz;
        self
    }

    /// Set reset, data/command, busy and power lines at once
    pub fn with_pins(mut self, rst: u64, dc: u64, busy: u64, pwr: u64) -> Self {
        self.rst_pin = rst;
        self.dc_pin = dc;
        self.busy_pin = busy;
        self.pwr_pin = pwr;
        self
    }

    /// Frame transfers with a GPIO chip select, e.g. `Some(Pins::CS)` for CE0
    pub fn with_cs_pin(mut self, cs: Option<u64>) -> Self {
        self.cs_pin = cs;
        self
    }

    pub fn with_size(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_verbose_timing(mut self, on: bool) -> Self {
        self.verbose_timing = on;
        self
    }

    pub fn with_busy_timing(mut self, poll_interval_ms: u32, timeout_ms: u32) -> Self {
        self.busy_poll_interval_ms = poll_interval_ms;
        self.busy_timeout_ms = timeout_ms;
        self
    }

    pub fn with_clear_secondary_ram(mut self, on: bool) -> Self {
        self.clear_secondary_ram = on;
        self
    }

    /// Checks the panel size is usable for a packed 1-bpp buffer
    pub fn validate(&self) -> Result<()> {
        let (w, h) = (self.width as u32, self.height as u32);
        if w == 0 || h == 0 || w % 8 != 0 || h % 8 != 0 {
            return Err(Error::InvalidDimensions {
                width: w,
                height: h,
            });
        }
        if self.busy_poll_interval_ms == 0 {
            return Err(Error::Config(
                "busy poll interval must be at least 1 ms".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{ENV_PREFIX}{name}: invalid value {value:?}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::Config(format!(
            "{ENV_PREFIX}{name}: invalid value {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.spi_device, "/dev/spidev0.0");
        assert_eq!(config.spi_speed_hz, 4_000_000);
        assert_eq!((config.width, config.height), (800, 480));
        assert_eq!(config.cs_pin, None);
        assert_eq!((config.busy_poll_interval_ms, config.busy_timeout_ms), (10, 10_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overlay() {
        assert_eq!(Config::default().with_cs_pin(Some(Pins::CS)).cs_pin, Some(8));

        let config = Config::from_lookup(lookup(&[
            ("INKPANEL_SPI_DEVICE", "/dev/spidev1.1"),
            ("INKPANEL_RST_PIN", "5"),
            ("INKPANEL_CS_PIN", "7"),
            ("INKPANEL_HEIGHT", "240"),
            ("INKPANEL_VERBOSE_TIMING", "true"),
        ]))
        .unwrap();

        assert_eq!(config.spi_device, "/dev/spidev1.1");
        assert_eq!(config.rst_pin, 5);
        assert_eq!(config.dc_pin, Pins::DC);
        assert_eq!(config.cs_pin, Some(7));
        assert_eq!(config.height, 240);
        assert!(config.verbose_timing);
    }

    #[test]
    fn env_garbage_is_a_config_error() {
        let err = Config::from_lookup(lookup(&[("INKPANEL_BUSY_PIN", "twenty")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup(&[("INKPANEL_VERBOSE_TIMING", "maybe")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn odd_sizes_rejected() {
        let err = Config::default().with_size(801, 480).validate().unwrap_err();
        assert_eq!(
            err,
            Error::InvalidDimensions {
                width: 801,
                height: 480
            }
        );
        assert!(Config::default().with_size(0, 8).validate().is_err());
    }
}
