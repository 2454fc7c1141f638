use anyhow::Context;

use embedded_graphics::mono_font::{ascii::FONT_10X20, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::{prelude::*, text::Text};

use inkpanel::ssd1677::linux;
use inkpanel::{Color, Config};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().context("reading INKPANEL_* configuration")?;
    let image_path = std::env::args().nth(1);

    log::info!("Opening display transport");
    let mut epd = linux::open(&config).context("opening display transport")?;
    epd.set_timing_hook(|phase, elapsed| log::debug!("{} took {:?}", phase, elapsed));

    log::info!("Initializing display");
    epd.init()?;

    log::info!("Clearing display");
    epd.clear()?;

    match image_path {
        Some(path) => {
            log::info!("Loading image {}", path);
            let buffer = epd
                .load_image(&path)
                .with_context(|| format!("loading {path}"))?;
            epd.load_buffer(&buffer)?;
        }
        None => {
            let width = epd.framebuffer().width();
            let height = epd.framebuffer().height();
            epd.draw_rect(0, 0, width, height, Color::Black);
            epd.draw_rect(4, 4, width - 8, height - 8, Color::Black);

            let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
            Text::new("inkpanel", Point::new(24, 44), style).draw(epd.framebuffer_mut())?;
            let caption = format!("{}x{} on {}", width, height, config.spi_device);
            Text::new(&caption, Point::new(24, 72), style).draw(epd.framebuffer_mut())?;
        }
    }

    log::info!("Displaying frame");
    epd.display(None)?;

    log::info!("Putting display to sleep");
    epd.sleep()?;

    if epd.busy_timeouts() > 0 {
        log::warn!("{} busy waits timed out", epd.busy_timeouts());
    }

    epd.cleanup()?;
    log::info!("Done");
    Ok(())
}
