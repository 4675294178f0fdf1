//! Evidence capture over the Chrome DevTools Protocol
//!
//! Captures are PNG bytes held in memory until the outcome is classified;
//! only confirmed items ever persist an image. The dual-surface composite
//! serves the one portal whose confirmation spans a primary page and a
//! popup document viewer.

use crate::browser::BrowserSession;
use crate::error::Result;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::Tab;
use image::{imageops, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;
use veridoc_core::VeridocError;

/// Capture the session's working tab as a PNG.
pub async fn capture_page(session: &BrowserSession, full_page: bool) -> Result<Vec<u8>> {
    capture_tab(session.tab(), full_page).await
}

/// Capture an arbitrary tab (popup surfaces) as a PNG.
pub async fn capture_tab(tab: &Arc<Tab>, full_page: bool) -> Result<Vec<u8>> {
    let data = tab
        .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, full_page)
        .map_err(|e| VeridocError::Evidence(format!("CDP capture failed: {e}")))?;

    debug!("Captured screenshot ({} bytes)", data.len());
    Ok(data)
}

/// Compose two PNG captures side by side into one evidence image.
///
/// Canvas width is the sum of both widths, height the max of both heights,
/// with white fill under the shorter image. The second image starts exactly
/// at x = width of the first.
pub fn compose_side_by_side(left: &[u8], right: &[u8]) -> Result<Vec<u8>> {
    let left = decode(left)?;
    let right = decode(right)?;

    let width = left.width() + right.width();
    let height = left.height().max(right.height());

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    imageops::replace(&mut canvas, &left, 0, 0);
    imageops::replace(&mut canvas, &right, i64::from(left.width()), 0);

    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)
        .map_err(|e| VeridocError::Evidence(format!("PNG encode failed: {e}")))?;

    debug!("Composed evidence image {}x{}", width, height);
    Ok(out)
}

fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| VeridocError::Evidence(format!("PNG decode failed: {e}")))?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_compose_dimensions() {
        let a = solid_png(100, 50, [255, 0, 0, 255]);
        let b = solid_png(80, 70, [0, 0, 255, 255]);

        let composed = compose_side_by_side(&a, &b).unwrap();
        let img = image::load_from_memory(&composed).unwrap().to_rgba8();

        assert_eq!(img.width(), 180);
        assert_eq!(img.height(), 70);
    }

    #[test]
    fn test_compose_inset_and_fill() {
        let a = solid_png(100, 50, [255, 0, 0, 255]);
        let b = solid_png(80, 70, [0, 0, 255, 255]);

        let composed = compose_side_by_side(&a, &b).unwrap();
        let img = image::load_from_memory(&composed).unwrap().to_rgba8();

        // Second image content starts exactly at x = 100
        assert_eq!(*img.get_pixel(99, 10), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(100, 10), Rgba([0, 0, 255, 255]));
        // Gap below the shorter image is white fill
        assert_eq!(*img.get_pixel(10, 60), Rgba([255, 255, 255, 255]));
        // Taller image fills its full height
        assert_eq!(*img.get_pixel(150, 65), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_compose_rejects_garbage() {
        let a = solid_png(10, 10, [0, 0, 0, 255]);
        assert!(matches!(
            compose_side_by_side(&a, b"not a png"),
            Err(VeridocError::Evidence(_))
        ));
    }
}
