//! Monochrome 800x480 e-paper panels: framebuffer, image ingestion and the
//! SSD1677 refresh protocol.

pub mod ssd1677;

pub use crate::ssd1677::cmd::Cmd;
pub use crate::ssd1677::color::Color;
pub use crate::ssd1677::config::Config;
pub use crate::ssd1677::driver::{Panel, PanelAddressWindow, PanelState, RefreshMode};
pub use crate::ssd1677::epd::Epd;
pub use crate::ssd1677::error::{Error, Result};
pub use crate::ssd1677::flag::Flag;
pub use crate::ssd1677::framebuffer::Framebuffer;
pub use crate::ssd1677::interface::{BusyStatus, DisplayInterface};
pub use crate::ssd1677::pins::Pins;
