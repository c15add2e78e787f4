use std::path::{Path, PathBuf};

use base64::Engine as _;
use printpdf::image_crate::{self, imageops, ImageFormat, Rgba, RgbaImage};
use serde::Serialize;

use crate::error::AppError;

pub const LOGO_FILE_NAME: &str = "logo.png";
pub const LOGO_SIZE_PX: u32 = 400;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogoSelection {
    pub path: String,
    /// `data:image/png;base64,...` for the settings preview.
    pub preview: String,
}

/// Fits the image inside a `LOGO_SIZE_PX` square, centers it on a white
/// canvas and saves it as `<dest_dir>/logo.png`, replacing any earlier logo.
pub fn process_logo(src: &Path, dest_dir: &Path) -> Result<PathBuf, AppError> {
    let img = image_crate::open(src)?;
    let resized = img.resize(LOGO_SIZE_PX, LOGO_SIZE_PX, imageops::FilterType::Lanczos3);

    let mut canvas = RgbaImage::from_pixel(LOGO_SIZE_PX, LOGO_SIZE_PX, Rgba([255, 255, 255, 255]));
    let x = (LOGO_SIZE_PX - resized.width()) / 2;
    let y = (LOGO_SIZE_PX - resized.height()) / 2;
    imageops::overlay(&mut canvas, &resized.to_rgba8(), x as i64, y as i64);

    std::fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(LOGO_FILE_NAME);
    canvas.save_with_format(&dest, ImageFormat::Png)?;
    tracing::info!(src = %src.display(), dest = %dest.display(), "logo stored");
    Ok(dest)
}

pub fn preview_data_url(path: &Path) -> Result<String, AppError> {
    let bytes = std::fs::read(path)?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:image/png;base64,{b64}"))
}

pub fn select_logo(src: &Path, dest_dir: &Path) -> Result<LogoSelection, AppError> {
    let dest = process_logo(src, dest_dir)?;
    let preview = preview_data_url(&dest)?;
    Ok(LogoSelection {
        path: dest.to_string_lossy().to_string(),
        preview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_crate::{GenericImageView, Rgb, RgbImage};

    #[test]
    fn wide_logo_is_padded_to_a_square() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("wide.png");
        RgbImage::from_pixel(800, 200, Rgb([0, 0, 200])).save(&src).unwrap();

        let out = process_logo(&src, &dir.path().join("data")).unwrap();
        assert_eq!(out.file_name().unwrap(), LOGO_FILE_NAME);

        let img = image_crate::open(&out).unwrap();
        assert_eq!(img.dimensions(), (LOGO_SIZE_PX, LOGO_SIZE_PX));
        // Top band is padding, the middle row holds the logo.
        assert_eq!(img.get_pixel(200, 10), Rgba([255, 255, 255, 255]));
        let center = img.get_pixel(200, 200);
        assert!(center[2] > 150 && center[0] < 50, "unexpected center pixel {center:?}");
    }

    #[test]
    fn corrupt_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.jpg");
        std::fs::write(&src, b"definitely not a jpeg").unwrap();

        let err = process_logo(&src, dir.path()).unwrap_err();
        assert!(matches!(err, AppError::Image(_)), "got {err:?}");
        assert!(!dir.path().join(LOGO_FILE_NAME).exists());
    }

    #[test]
    fn selection_carries_a_png_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("square.png");
        RgbImage::from_pixel(50, 50, Rgb([10, 200, 10])).save(&src).unwrap();

        let sel = select_logo(&src, &dir.path().join("data")).unwrap();
        assert!(sel.preview.starts_with("data:image/png;base64,iVBOR"));
        assert!(sel.path.ends_with(LOGO_FILE_NAME));
    }
}
