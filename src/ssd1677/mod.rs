//! SSD1677 ePaper Display Driver
//!
//! For the 800x480 monochrome panels built on the SSD1677 (Good Display
//! GDEQ0426T82, GDEY075T7 class glass).
//!
//! ### Usage
//! The driver keeps one black/white framebuffer next to the panel session:
//!
//! 1. open a transport, on Linux with [`linux::open`]
//! 1. [`epd::Epd::init`] powers, resets and programs the controller
//! 1. draw into [`epd::Epd::framebuffer_mut`], preferably with
//!    [`embedded_graphics`](https://github.com/embedded-graphics/embedded-graphics),
//!    or pack an image with [`epd::Epd::load_image`]
//! 1. [`epd::Epd::display`] writes the frame and refreshes
//! 1. [`epd::Epd::sleep`], then [`epd::Epd::cleanup`] to release everything
//!
//! The core is generic over the `embedded-hal` 1.0 traits, so any bus and GPIO
//! implementation works.

pub mod cmd;
pub mod color;
pub mod config;
pub mod driver;
pub mod epd;
pub mod error;
pub mod flag;
pub mod framebuffer;
pub mod image;
pub mod interface;
#[cfg(feature = "linux")]
pub mod linux;
pub mod pins;

#[cfg(test)]
pub(crate) mod test_spy;

/// Display height, pixels vertically
pub const HEIGHT: u16 = 480;

/// Display width, pixels horizontally
pub const WIDTH: u16 = 800;
