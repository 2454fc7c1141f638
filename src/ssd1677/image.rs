//! Image ingestion: decode, scale to fit, greyscale, threshold, center, pack
//!
//! The output is always a full panel buffer in the same layout as
//! [`Framebuffer`](crate::ssd1677::framebuffer::Framebuffer), white where the
//! source image does not reach.

use std::io::Cursor;
use std::path::Path;

use image::{imageops::FilterType, DynamicImage, ImageReader};

use crate::ssd1677::color::Color;
use crate::ssd1677::error::{Error, Result};
use crate::ssd1677::framebuffer::buffer_len;

/// Luma (and alpha) values below this are black (resp. transparent)
pub const THRESHOLD: u8 = 128;

/// Decode the file at `path` and pack it for a `width` x `height` panel.
///
/// The format is taken from the file extension first. If that fails the
/// contents are sniffed instead, so a bitmap saved under the wrong name
/// still loads.
pub fn load(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Vec<u8>> {
    let path = path.as_ref();
    log::info!("Loading image {}", path.display());
    let img = decode_path(path)?;
    pack_image(&img, width, height)
}

/// Same as [`load`] for an encoded image already in memory
pub fn pack_bytes(bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::DecodeFailure(e.to_string()))?
        .decode()
        .map_err(|e| Error::DecodeFailure(e.to_string()))?;
    pack_image(&img, width, height)
}

fn decode_path(path: &Path) -> Result<DynamicImage> {
    let by_extension = ImageReader::open(path)
        .map_err(|e| Error::DecodeFailure(format!("{}: {}", path.display(), e)))?
        .decode();

    match by_extension {
        Ok(img) => Ok(img),
        Err(first) => {
            log::debug!("Decoding by extension failed ({first}), sniffing contents");
            ImageReader::open(path)
                .and_then(|r| r.with_guessed_format())
                .map_err(|e| Error::DecodeFailure(format!("{}: {}", path.display(), e)))?
                .decode()
                .map_err(|e| Error::DecodeFailure(format!("{}: {}", path.display(), e)))
        }
    }
}

/// Size of the source after scaling to fit, never enlarged.
///
/// Equivalent to `floor(src * min(panel_w / src_w, panel_h / src_h, 1))`
/// without going through floating point.
pub fn fit_dimensions(src_w: u32, src_h: u32, panel_w: u32, panel_h: u32) -> (u32, u32) {
    if src_w <= panel_w && src_h <= panel_h {
        return (src_w, src_h);
    }
    let (sw, sh, pw, ph) = (src_w as u64, src_h as u64, panel_w as u64, panel_h as u64);
    if pw * sh <= ph * sw {
        // width is the tighter fit
        (panel_w, (sh * pw / sw) as u32)
    } else {
        ((sw * ph / sh) as u32, panel_h)
    }
}

/// Pack a decoded image for a `width` x `height` panel
pub fn pack_image(img: &DynamicImage, width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 || width % 8 != 0 || height % 8 != 0 {
        return Err(Error::InvalidDimensions { width, height });
    }

    let (src_w, src_h) = (img.width(), img.height());
    let (target_w, target_h) = if src_w == 0 || src_h == 0 {
        (0, 0)
    } else {
        fit_dimensions(src_w, src_h, width, height)
    };
    if target_w == 0 || target_h == 0 {
        log::error!("Image {src_w}x{src_h} scales to nothing on a {width}x{height} panel");
        return Err(Error::EmptyImage);
    }
    log::debug!("Image {src_w}x{src_h} -> {target_w}x{target_h}");

    let grey = if (target_w, target_h) == (src_w, src_h) {
        img.to_luma_alpha8()
    } else {
        img.resize_exact(target_w, target_h, FilterType::Lanczos3)
            .to_luma_alpha8()
    };

    let offset_x = (width - target_w) / 2;
    let offset_y = (height - target_h) / 2;
    log::debug!("Centering image with offset ({offset_x}, {offset_y})");

    let mut buffer = vec![Color::White.get_byte_value(); buffer_len(width, height)];
    for (x, y, px) in grey.enumerate_pixels() {
        let [luma, alpha] = px.0;
        if alpha < THRESHOLD || luma >= THRESHOLD {
            continue;
        }
        let (px_x, px_y) = ((x + offset_x) as usize, (y + offset_y) as usize);
        let idx = (px_x + px_y * width as usize) / 8;
        buffer[idx] &= !(0x80 >> (px_x % 8));
    }

    Ok(buffer)
}
