//! Driver facade: one panel session with its framebuffer
//!
//! Drawing works at any time, before `init` included. Anything that talks to
//! the panel needs a successful [`Epd::init`] first and fails with
//! [`Error::Closed`] once [`Epd::cleanup`] has run.

use std::path::Path;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::ssd1677::color::Color;
use crate::ssd1677::config::Config;
use crate::ssd1677::driver::{Panel, PanelState, RefreshMode};
use crate::ssd1677::error::{Error, Result};
use crate::ssd1677::framebuffer::Framebuffer;
use crate::ssd1677::image;
use crate::ssd1677::interface::DisplayInterface;

/// Receives `(phase, elapsed)` after each timed panel operation
pub type TimingHook = Box<dyn FnMut(&'static str, Duration)>;

/// Log target of the per-phase timing reports
pub const TIMING_TARGET: &str = "inkpanel::timing";

pub struct Epd<SPI, BSY, DC, RST, PWR, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    PWR: OutputPin,
    DELAY: DelayNs,
{
    /// `None` once released
    panel: Option<Panel<SPI, BSY, DC, RST, PWR, DELAY>>,
    framebuffer: Framebuffer,
    verbose_timing: bool,
    timing_hook: Option<TimingHook>,
}

impl<SPI, BSY, DC, RST, PWR, DELAY> Epd<SPI, BSY, DC, RST, PWR, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    PWR: OutputPin,
    DELAY: DelayNs,
{
    /// Take ownership of an opened transport. The panel is not touched yet.
    pub fn new(
        spi: SPI,
        busy: BSY,
        dc: DC,
        rst: RST,
        pwr: PWR,
        delay: DELAY,
        config: &Config,
    ) -> Result<Self> {
        config.validate()?;
        let framebuffer = Framebuffer::new(config.width as u32, config.height as u32)?;
        let interface = DisplayInterface::new(spi, busy, dc, rst, pwr, delay)
            .with_busy_timing(config.busy_poll_interval_ms, config.busy_timeout_ms);
        let panel = Panel::new(interface, config.width, config.height)
            .with_clear_secondary_ram(config.clear_secondary_ram);

        Ok(Epd {
            panel: Some(panel),
            framebuffer,
            verbose_timing: config.verbose_timing,
            timing_hook: None,
        })
    }

    /// Install a callback for per-phase timings
    pub fn set_timing_hook(&mut self, hook: impl FnMut(&'static str, Duration) + 'static) {
        self.timing_hook = Some(Box::new(hook));
    }

    fn report(&mut self, phase: &'static str, started: Instant) {
        let elapsed = started.elapsed();
        if self.verbose_timing {
            log::info!(target: TIMING_TARGET, "{}: {:?}", phase, elapsed);
        }
        if let Some(hook) = self.timing_hook.as_mut() {
            hook(phase, elapsed);
        }
    }

    fn panel(&mut self) -> Result<&mut Panel<SPI, BSY, DC, RST, PWR, DELAY>> {
        self.panel.as_mut().ok_or(Error::Closed)
    }

    pub fn init(&mut self) -> Result<()> {
        let started = Instant::now();
        self.panel()?.init()?;
        self.report("init", started);
        Ok(())
    }

    /// White framebuffer, white panel
    pub fn clear(&mut self) -> Result<()> {
        let started = Instant::now();
        let panel = self.panel.as_mut().ok_or(Error::Closed)?;
        panel.clear()?;
        self.framebuffer.clear();
        self.report("clear", started);
        Ok(())
    }

    /// Show `buffer`, or the framebuffer when `None`, with a full refresh
    pub fn display(&mut self, buffer: Option<&[u8]>) -> Result<()> {
        self.display_with_mode(buffer, RefreshMode::Full)
    }

    pub fn display_with_mode(&mut self, buffer: Option<&[u8]>, mode: RefreshMode) -> Result<()> {
        let started = Instant::now();
        let panel = self.panel.as_mut().ok_or(Error::Closed)?;
        let frame = buffer.unwrap_or_else(|| self.framebuffer.snapshot());
        log::info!("Displaying {} bytes", frame.len());
        panel.display(frame, mode)?;
        self.report("display", started);
        Ok(())
    }

    pub fn sleep(&mut self) -> Result<()> {
        let started = Instant::now();
        self.panel()?.sleep()?;
        self.report("sleep", started);
        Ok(())
    }

    /// Fails with [`Error::BusyTimeout`] if the busy line never drops
    pub fn wait_until_idle(&mut self) -> Result<()> {
        self.panel()?.wait_until_idle()
    }

    /// Power the panel off and release the bus and lines.
    ///
    /// Safe to call any number of times, including after a failed `init`.
    pub fn cleanup(&mut self) -> Result<()> {
        let Some(mut panel) = self.panel.take() else {
            return Ok(());
        };
        let started = Instant::now();
        let result = panel.close();
        drop(panel);
        self.report("cleanup", started);
        result
    }

    pub fn state(&self) -> PanelState {
        self.panel
            .as_ref()
            .map_or(PanelState::Closed, |p| p.state())
    }

    /// Busy waits that gave up during this session
    pub fn busy_timeouts(&self) -> u32 {
        self.panel.as_ref().map_or(0, |p| p.busy_timeouts())
    }

    /// Decode and pack an image file for this panel's size
    pub fn load_image(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        image::load(path, self.framebuffer.width(), self.framebuffer.height())
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// For drawing with `embedded-graphics`
    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.framebuffer.set_pixel(x, y, color);
    }

    pub fn draw_h_line(&mut self, x: i32, y: i32, len: u32, color: Color) {
        self.framebuffer.draw_h_line(x, y, len, color);
    }

    pub fn draw_v_line(&mut self, x: i32, y: i32, len: u32, color: Color) {
        self.framebuffer.draw_v_line(x, y, len, color);
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        self.framebuffer.draw_rect(x, y, w, h, color);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        self.framebuffer.fill_rect(x, y, w, h, color);
    }

    pub fn fill(&mut self, color: Color) {
        self.framebuffer.fill(color);
    }

    /// Replace the framebuffer with packed data, e.g. from [`load_image`](Self::load_image)
    pub fn load_buffer(&mut self, buffer: &[u8]) -> Result<()> {
        self.framebuffer.load(buffer)
    }
}

impl<SPI, BSY, DC, RST, PWR, DELAY> Drop for Epd<SPI, BSY, DC, RST, PWR, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    PWR: OutputPin,
    DELAY: DelayNs,
{
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            log::warn!("Panel cleanup on drop failed: {}", e);
        }
    }
}
