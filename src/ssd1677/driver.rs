//! SSD1677 panel protocol
//!
//! [`Panel`] drives the controller through its session lifecycle:
//!
//! ```text
//! Unpowered -> Resetting -> AwaitingReady -> Configured -> Idle
//! Idle -> Transferring -> Refreshing -> Idle
//! Idle -> Sleeping                     (needs a new init)
//! any  -> Closed                       (terminal)
//! ```
//!
//! ## BUSY Pin Wait
//!
//! Every wait on the busy line is capped. A sequence that hits the cap logs a
//! warning, counts it in [`Panel::busy_timeouts`] and carries on, so a dead
//! busy line cannot hang the caller. [`Panel::wait_until_idle`] is the one
//! place where a capped wait is reported as [`Error::BusyTimeout`].
//!
//! ## Failures
//!
//! A transport error in the middle of a sequence leaves the controller in an
//! unknown state, so the panel drops back to `Unpowered` and needs `init`.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::ssd1677::error::{Error, Result};
use crate::ssd1677::framebuffer::buffer_len;
use crate::ssd1677::interface::{BusyStatus, DisplayInterface};
use crate::ssd1677::{cmd::Cmd, flag::Flag};

const SLEEP_SETTLE_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Unpowered,
    Resetting,
    AwaitingReady,
    Configured,
    Idle,
    Transferring,
    Refreshing,
    Sleeping,
    /// Bus and lines released, nothing works any more
    Closed,
}

/// Waveform selection for one refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    /// Full waveform, slow but without ghosting
    #[default]
    Full,
    Fast,
}

impl RefreshMode {
    /// Parameter of the display update control 2 command
    pub fn update_control(self) -> u8 {
        match self {
            RefreshMode::Full => Flag::DISPLAY_UPDATE_FULL,
            RefreshMode::Fast => Flag::DISPLAY_UPDATE_FAST,
        }
    }
}

/// RAM address window, X and Y both in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelAddressWindow {
    pub x_start: u16,
    pub x_end: u16,
    pub y_start: u16,
    pub y_end: u16,
}

impl PanelAddressWindow {
    /// Window covering the whole panel
    pub fn full(width: u16, height: u16) -> Self {
        PanelAddressWindow {
            x_start: 0,
            x_end: width.saturating_sub(1),
            y_start: 0,
            y_end: height.saturating_sub(1),
        }
    }

    /// Parameters of `SET_RAMXPOS`, little endian start then end
    pub fn x_params(&self) -> [u8; 4] {
        le_pair(self.x_start, self.x_end)
    }

    /// Parameters of `SET_RAMYPOS`
    pub fn y_params(&self) -> [u8; 4] {
        le_pair(self.y_start, self.y_end)
    }
}

fn le_pair(start: u16, end: u16) -> [u8; 4] {
    let [s0, s1] = start.to_le_bytes();
    let [e0, e1] = end.to_le_bytes();
    [s0, s1, e0, e1]
}

/// SSD1677 E-Paper Panel
///
/// ## Type Parameters
///
/// - `SPI` - SPI device for communication
/// - `BSY` - BUSY input pin (HIGH when display is busy)
/// - `DC` - Data/Command output pin
/// - `RST` - Reset output pin
/// - `PWR` - Power enable output pin
/// - `DELAY` - Delay provider for timing
pub struct Panel<SPI, BSY, DC, RST, PWR, DELAY> {
    /// The display interface
    pub interface: DisplayInterface<SPI, BSY, DC, RST, PWR, DELAY>,
    state: PanelState,
    width: u16,
    height: u16,
    clear_secondary_ram: bool,
    busy_timeouts: u32,
}

impl<SPI, BSY, DC, RST, PWR, DELAY> Panel<SPI, BSY, DC, RST, PWR, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    PWR: OutputPin,
    DELAY: DelayNs,
{
    /// Wrap an interface. Nothing is sent until [`init`](Self::init).
    pub fn new(
        interface: DisplayInterface<SPI, BSY, DC, RST, PWR, DELAY>,
        width: u16,
        height: u16,
    ) -> Self {
        Panel {
            interface,
            state: PanelState::Unpowered,
            width,
            height,
            clear_secondary_ram: true,
            busy_timeouts: 0,
        }
    }

    /// Whether [`clear`](Self::clear) also blanks the 0x26 RAM bank
    pub fn with_clear_secondary_ram(mut self, on: bool) -> Self {
        self.clear_secondary_ram = on;
        self
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Busy waits that gave up since construction
    pub fn busy_timeouts(&self) -> u32 {
        self.busy_timeouts
    }

    /// Bytes in one full frame
    pub fn frame_len(&self) -> usize {
        buffer_len(self.width as u32, self.height as u32)
    }

    fn is_initialized(&self) -> bool {
        matches!(
            self.state,
            PanelState::Idle | PanelState::Transferring | PanelState::Refreshing
        )
    }

    fn require_idle(&self) -> Result<()> {
        match self.state {
            PanelState::Idle => Ok(()),
            PanelState::Closed => Err(Error::Closed),
            other => {
                log::warn!("Panel used in state {:?} without init", other);
                Err(Error::NotInitialized)
            }
        }
    }

    /// Run `op`, dropping back to `Unpowered` if it fails halfway
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = op(self);
        if let Err(e) = &result {
            log::error!("Panel sequence failed in state {:?}: {}", self.state, e);
            self.state = PanelState::Unpowered;
        }
        result
    }

    /// Capped busy wait that never fails on a timeout
    fn wait_busy(&mut self) -> Result<BusyStatus> {
        let status = self.interface.wait_busy_low()?;
        if let BusyStatus::TimedOut { .. } = status {
            self.busy_timeouts += 1;
        }
        Ok(status)
    }

    /// Power up, reset and program the controller
    ///
    /// # Sequence
    /// power on, reset pulse, software reset, temperature sensor, booster
    /// soft start, driver output, border waveform, data entry mode, RAM window,
    /// RAM counters, busy wait.
    ///
    /// Valid from any state but `Closed`, including `Sleeping`.
    pub fn init(&mut self) -> Result<()> {
        if self.state == PanelState::Closed {
            return Err(Error::Closed);
        }
        log::info!(
            "Initializing {}x{} e-paper panel",
            self.width,
            self.height
        );
        self.state = PanelState::Unpowered;
        self.guarded(|p| p.init_sequence())?;
        log::info!("Panel ready");
        Ok(())
    }

    fn init_sequence(&mut self) -> Result<()> {
        self.interface.power_on()?;

        self.state = PanelState::Resetting;
        self.interface.reset()?;

        self.state = PanelState::AwaitingReady;
        self.interface.cmd(Cmd::SW_RESET)?;
        self.wait_busy()?;

        self.interface
            .cmd_with_data(Cmd::TEMP_CONTROL, &[Flag::INTERNAL_TEMP_SENSOR])?;
        self.interface
            .cmd_with_data(Cmd::BOOST_SOFT_START_CONTROL, &Flag::BOOSTER_SOFT_START)?;

        let window = PanelAddressWindow::full(self.width, self.height);
        let [gates_lo, gates_hi] = window.y_end.to_le_bytes();
        self.interface.cmd_with_data(
            Cmd::DRIVER_CONTROL,
            &[gates_lo, gates_hi, Flag::DRIVER_OUTPUT_SCAN],
        )?;
        self.interface
            .cmd_with_data(Cmd::BORDER_WAVEFORM_CONTROL, &[Flag::BORDER_WAVEFORM_WHITE])?;
        self.interface
            .cmd_with_data(Cmd::DATA_ENTRY_MODE, &[Flag::DATA_ENTRY_INCRY_INCRX])?;

        self.interface
            .cmd_with_data(Cmd::SET_RAMXPOS, &window.x_params())?;
        self.interface
            .cmd_with_data(Cmd::SET_RAMYPOS, &window.y_params())?;
        self.set_ram_counters()?;
        self.state = PanelState::Configured;

        self.wait_busy()?;
        self.state = PanelState::Idle;
        Ok(())
    }

    /// Point both RAM address counters at the origin
    fn set_ram_counters(&mut self) -> Result<()> {
        self.interface.cmd_with_data(Cmd::SET_RAMX_COUNTER, &[0x00, 0x00])?;
        self.interface.cmd_with_data(Cmd::SET_RAMY_COUNTER, &[0x00, 0x00])
    }

    /// Stream a full frame into one RAM bank
    fn write_ram(&mut self, bank: u8, frame: &[u8]) -> Result<()> {
        log::debug!("Writing {} bytes to RAM bank 0x{:02X}", frame.len(), bank);
        self.set_ram_counters()?;
        self.interface.cmd(bank)?;
        self.interface.data(frame)
    }

    /// Trigger a display update and wait for it to finish
    fn refresh(&mut self, mode: RefreshMode) -> Result<()> {
        self.state = PanelState::Refreshing;
        log::info!("Refreshing panel ({:?})", mode);
        self.interface
            .cmd_with_data(Cmd::UPDATE_DISPLAY_CTRL2, &[mode.update_control()])?;
        self.interface.cmd(Cmd::MASTER_ACTIVATE)?;
        self.wait_busy()?;
        self.state = PanelState::Idle;
        Ok(())
    }

    fn check_frame(&self, frame: &[u8]) -> Result<()> {
        let expected = self.frame_len();
        if frame.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: frame.len(),
            });
        }
        Ok(())
    }

    /// Write `frame` to the black/white RAM and refresh.
    ///
    /// # Arguments
    ///
    /// * `frame` - packed 1-bpp data, exactly one frame long
    /// * `mode` - refresh waveform
    pub fn display(&mut self, frame: &[u8], mode: RefreshMode) -> Result<()> {
        self.require_idle()?;
        self.check_frame(frame)?;
        self.guarded(|p| {
            p.state = PanelState::Transferring;
            p.write_ram(Cmd::WRITE_BW_DATA, frame)?;
            p.refresh(mode)
        })
    }

    /// Blank the RAM (both banks unless configured otherwise) and do a full refresh
    pub fn clear(&mut self) -> Result<()> {
        self.require_idle()?;
        log::info!("Clearing panel");
        let white = vec![Flag::RAM_ALL_WHITE; self.frame_len()];
        self.guarded(|p| {
            p.state = PanelState::Transferring;
            p.write_ram(Cmd::WRITE_BW_DATA, &white)?;
            if p.clear_secondary_ram {
                p.write_ram(Cmd::WRITE_RED_DATA, &white)?;
            }
            p.refresh(RefreshMode::Full)
        })
    }

    /// Enter deep sleep. The panel needs [`init`](Self::init) afterwards.
    pub fn sleep(&mut self) -> Result<()> {
        if self.state == PanelState::Closed {
            return Err(Error::Closed);
        }
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        log::info!("Putting panel into deep sleep");
        self.guarded(|p| {
            p.interface
                .cmd_with_data(Cmd::DEEP_SLEEP_MODE, &[Flag::DEEP_SLEEP_MODE_1])?;
            p.interface.delay_ms(SLEEP_SETTLE_MS);
            p.state = PanelState::Sleeping;
            Ok(())
        })
    }

    /// Wait for the busy line, reporting a capped wait as an error
    pub fn wait_until_idle(&mut self) -> Result<()> {
        if self.state == PanelState::Closed {
            return Err(Error::Closed);
        }
        match self.wait_busy()? {
            BusyStatus::Ready { .. } => Ok(()),
            BusyStatus::TimedOut { polls } => Err(Error::BusyTimeout { polls }),
        }
    }

    /// Switch panel power off and mark the session finished. Repeat calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.state == PanelState::Closed {
            return Ok(());
        }
        log::info!("Releasing panel");
        self.state = PanelState::Closed;
        self.interface.power_off()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssd1677::error::DisplayError;
    use crate::ssd1677::test_spy::{
        ram_write, refresh, sends, BusyMode, Line, Sent, Spy, SpyBusy, SpyDc, SpyDelay, SpyPwr,
        SpyRst, SpySpi,
    };

    type TestPanel = Panel<SpySpi, SpyBusy, SpyDc, SpyRst, SpyPwr, SpyDelay>;

    fn panel(spy: &Spy, width: u16, height: u16) -> TestPanel {
        let (spi, busy, dc, rst, pwr, delay) = spy.parts();
        let iface = DisplayInterface::new(spi, busy, dc, rst, pwr, delay).with_busy_timing(10, 100);
        Panel::new(iface, width, height)
    }

    fn init_trace() -> Vec<Sent> {
        sends![
            0x12;
            0x18 => [0x80];
            0x0C => [0xAE, 0xC7, 0xC3, 0xC0, 0x80];
            0x01 => [0xDF, 0x01, 0x02];
            0x3C => [0x01];
            0x11 => [0x03];
            0x44 => [0x00, 0x00, 0x1F, 0x03];
            0x45 => [0x00, 0x00, 0xDF, 0x01];
            0x4E => [0x00, 0x00];
            0x4F => [0x00, 0x00];
        ]
    }

    #[test]
    fn address_window() {
        let w = PanelAddressWindow::full(800, 480);
        assert_eq!(w.x_params(), [0x00, 0x00, 0x1F, 0x03]);
        assert_eq!(w.y_params(), [0x00, 0x00, 0xDF, 0x01]);
    }

    #[test]
    fn init_program_is_exact() {
        let spy = Spy::new();
        let mut p = panel(&spy, 800, 480);
        assert_eq!(p.state(), PanelState::Unpowered);

        p.init().unwrap();
        assert_eq!(spy.take(), init_trace());
        assert_eq!(p.state(), PanelState::Idle);
        assert_eq!(
            spy.lines(),
            vec![
                Line::Pwr(true),
                Line::Rst(true),
                Line::Rst(false),
                Line::Rst(true)
            ]
        );
        // power settle plus reset pulse
        assert_eq!(spy.delay_ms(), 142);
    }

    #[test]
    fn display_before_init_sends_nothing() {
        let spy = Spy::new();
        let mut p = panel(&spy, 16, 8);
        let frame = [0u8; 16];
        assert_eq!(p.display(&frame, RefreshMode::Full), Err(Error::NotInitialized));
        assert_eq!(p.clear(), Err(Error::NotInitialized));
        assert_eq!(p.sleep(), Err(Error::NotInitialized));
        assert_eq!(spy.writes(), 0);
        assert!(spy.lines().is_empty());
    }

    #[test]
    fn display_streams_frame_and_refreshes() {
        let spy = Spy::new();
        let mut p = panel(&spy, 16, 8);
        p.init().unwrap();
        spy.take();

        let frame: Vec<u8> = (0..16).collect();
        p.display(&frame, RefreshMode::Full).unwrap();

        let mut expected = ram_write(0x24, &frame);
        expected.extend(refresh(0xF7));
        assert_eq!(spy.take(), expected);
        assert_eq!(p.state(), PanelState::Idle);
    }

    #[test]
    fn fast_refresh_uses_fast_waveform() {
        let spy = Spy::new();
        let mut p = panel(&spy, 16, 8);
        p.init().unwrap();
        spy.take();

        p.display(&[0xFF; 16], RefreshMode::Fast).unwrap();
        let trace = spy.take();
        assert_eq!(&trace[trace.len() - 3..], refresh(0xC7).as_slice());
    }

    #[test]
    fn wrong_frame_size_is_rejected_before_io() {
        let spy = Spy::new();
        let mut p = panel(&spy, 16, 8);
        p.init().unwrap();
        spy.take();

        assert_eq!(
            p.display(&[0u8; 10], RefreshMode::Full),
            Err(Error::SizeMismatch {
                expected: 16,
                actual: 10
            })
        );
        assert!(spy.take().is_empty());
        assert_eq!(p.state(), PanelState::Idle);
    }

    #[test]
    fn clear_blanks_both_banks() {
        let spy = Spy::new();
        let mut p = panel(&spy, 16, 8);
        p.init().unwrap();
        spy.take();

        p.clear().unwrap();
        let white = [0xFF; 16];
        let mut expected = ram_write(0x24, &white);
        expected.extend(ram_write(0x26, &white));
        expected.extend(refresh(0xF7));
        assert_eq!(spy.take(), expected);
    }

    #[test]
    fn clear_primary_only() {
        let spy = Spy::new();
        let mut p = panel(&spy, 16, 8).with_clear_secondary_ram(false);
        p.init().unwrap();
        spy.take();

        p.clear().unwrap();
        let mut expected = ram_write(0x24, &[0xFF; 16]);
        expected.extend(refresh(0xF7));
        assert_eq!(spy.take(), expected);
    }

    #[test]
    fn sleep_then_display_needs_init() {
        let spy = Spy::new();
        let mut p = panel(&spy, 16, 8);
        p.init().unwrap();
        spy.take();
        spy.reset_delay();

        p.sleep().unwrap();
        assert_eq!(spy.take(), sends![0x10 => [0x01]]);
        assert_eq!(spy.delay_ms(), 100);
        assert_eq!(p.state(), PanelState::Sleeping);

        assert_eq!(p.display(&[0u8; 16], RefreshMode::Full), Err(Error::NotInitialized));
        assert!(spy.take().is_empty());

        p.init().unwrap();
        p.display(&[0u8; 16], RefreshMode::Full).unwrap();
    }

    #[test]
    fn stuck_busy_does_not_hang_sequences() {
        let spy = Spy::new();
        spy.set_busy(BusyMode::Stuck);
        let mut p = panel(&spy, 16, 8);

        p.init().unwrap();
        assert_eq!(p.state(), PanelState::Idle);
        assert_eq!(p.busy_timeouts(), 2);
        // two capped waits of 10 polls each
        assert_eq!(spy.busy_reads(), 20);

        assert_eq!(p.wait_until_idle(), Err(Error::BusyTimeout { polls: 10 }));
        assert_eq!(p.busy_timeouts(), 3);
    }

    #[test]
    fn busy_wait_follows_the_line() {
        let spy = Spy::new();
        spy.set_busy(BusyMode::HighFor(3));
        let mut p = panel(&spy, 16, 8);
        p.init().unwrap();
        assert_eq!(p.busy_timeouts(), 0);
        assert_eq!(spy.busy_reads(), 8);
        assert_eq!(p.wait_until_idle(), Ok(()));
    }

    #[test]
    fn transport_failure_drops_to_unpowered() {
        let spy = Spy::new();
        let mut p = panel(&spy, 16, 8);
        p.init().unwrap();

        spy.fail_spi(true);
        assert_eq!(
            p.display(&[0u8; 16], RefreshMode::Full),
            Err(Error::Transport(DisplayError::BusWriteError))
        );
        assert_eq!(p.state(), PanelState::Unpowered);

        spy.fail_spi(false);
        assert_eq!(p.display(&[0u8; 16], RefreshMode::Full), Err(Error::NotInitialized));
    }

    #[test]
    fn close_is_terminal() {
        let spy = Spy::new();
        let mut p = panel(&spy, 16, 8);
        p.init().unwrap();

        p.close().unwrap();
        p.close().unwrap();
        assert_eq!(p.state(), PanelState::Closed);
        assert_eq!(p.init(), Err(Error::Closed));
        assert_eq!(p.display(&[0u8; 16], RefreshMode::Full), Err(Error::Closed));
        assert_eq!(p.wait_until_idle(), Err(Error::Closed));
        assert_eq!(spy.lines().last(), Some(&Line::Pwr(false)));
        assert_eq!(
            spy.lines().iter().filter(|l| **l == Line::Pwr(false)).count(),
            1
        );
    }
}
