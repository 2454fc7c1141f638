//! Default GPIO line numbering for the panel on a Raspberry Pi style header
//!
//! BCM numbering, matching the common e-paper HAT wiring. Every value can be
//! overridden through [`Config`](super::config::Config).

/// Pin configuration constants for the panel
pub struct Pins;

impl Pins {
    /// Chip Select, used only when manual CS framing is configured (CE0)
    pub const CS: u64 = 8;
    /// Data/Command control pin (High for data, Low for command)
    pub const DC: u64 = 25;
    /// Reset pin for display
    pub const RST: u64 = 17;
    /// Busy status pin (High when display is busy)
    pub const BSY: u64 = 24;
    /// Panel power enable (High to power the panel)
    pub const PWR: u64 = 18;

    /// SPI device node the panel sits on
    pub const SPI_DEVICE: &'static str = "/dev/spidev0.0";
    /// SPI clock
    pub const SPI_SPEED_HZ: u32 = 4_000_000;
}
