use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Luma, RgbImage};
use qrcode::{EcLevel, QrCode};

/// Pixel size of one QR module.
const MODULE_PX: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("payload does not fit in a QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("image could not be processed: {0}")]
    Image(#[from] image::ImageError),
    #[error("no QR code found in image")]
    NotFound,
    #[error("QR code could not be decoded: {0}")]
    Decode(#[from] rqrr::DeQRError),
}

/// Render `text` as a black-on-white QR code (error correction H, 4-module
/// quiet zone). A logo, when given, is scaled to a quarter of the code's
/// size and pasted at the centre.
pub fn render(text: &str, logo: Option<&[u8]>) -> Result<RgbImage, QrError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H)?;
    let modules = code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PX, MODULE_PX)
        .quiet_zone(true)
        .build();
    let mut qr = DynamicImage::ImageLuma8(modules).to_rgb8();

    if let Some(bytes) = logo {
        let (width, height) = qr.dimensions();
        let logo = image::load_from_memory(bytes)?
            .resize_exact(width / 4, height / 4, FilterType::Lanczos3)
            .to_rgb8();
        let x = (width - logo.width()) / 2;
        let y = (height - logo.height()) / 2;
        imageops::overlay(&mut qr, &logo, i64::from(x), i64::from(y));
    }

    Ok(qr)
}

/// Render and encode as PNG.
pub fn render_png(text: &str, logo: Option<&[u8]>) -> Result<Vec<u8>, QrError> {
    let qr = render(text, logo)?;
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(qr).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Find and decode the first readable QR code in an encoded image.
pub fn decode(bytes: &[u8]) -> Result<String, QrError> {
    let grey = image::load_from_memory(bytes)?.to_luma8();
    let (width, height) = grey.dimensions();

    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            grey.get_pixel(x as u32, y as u32).0[0]
        });

    let mut last_err = None;
    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_meta, content)) => return Ok(content),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.map_or(QrError::NotFound, QrError::Decode))
}

/// MIME type of an uploaded PNG or JPEG, `None` for anything else.
pub fn image_content_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_png(width: u32, height: u32, colour: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(colour));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn render_then_decode() {
        let text = "SIGNER:Jane\nID:7\nHASH:abc";
        let png = render_png(text, None).unwrap();
        assert_eq!(image_content_type(&png), Some("image/png"));
        assert_eq!(decode(&png).unwrap(), text);
    }

    #[test]
    fn image_is_square_with_quiet_zone() {
        let qr = render("hello", None).unwrap();
        assert_eq!(qr.width(), qr.height());
        assert_eq!(qr.width() % MODULE_PX, 0);
        // Quiet zone corner is white
        assert_eq!(qr.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn logo_is_pasted_at_the_centre() {
        let plain = render("hello", None).unwrap();
        let logo = solid_png(64, 64, [200, 0, 0]);
        let with_logo = render("hello", Some(&logo)).unwrap();

        assert_eq!(plain.dimensions(), with_logo.dimensions());
        let (w, h) = with_logo.dimensions();
        let [r, g, b] = with_logo.get_pixel(w / 2, h / 2).0;
        assert!(r > 190 && g < 10 && b < 10);
        assert_eq!(with_logo.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn invalid_logo_is_an_error() {
        assert!(matches!(render("hello", Some(b"not an image")), Err(QrError::Image(_))));
    }

    #[test]
    fn blank_image_has_no_code() {
        let blank = solid_png(120, 120, [255, 255, 255]);
        assert!(matches!(decode(&blank), Err(QrError::NotFound)));
    }

    #[test]
    fn garbage_bytes_are_unreadable() {
        assert!(matches!(decode(b"\x00\x01garbage"), Err(QrError::Image(_))));
        assert_eq!(image_content_type(b"GIF89a...."), None);
    }
}
