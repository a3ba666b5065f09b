use std::borrow::Cow;

use anyhow::{Context, Result};
use fast_image_resize as fir;
use image::{Rgba, RgbaImage, imageops};
use serde::Deserialize;

use crate::media::{CanvasSize, RenderedFrame};
use crate::processing::layout::{CropRect, center_offset, contain_size, fill_crop};

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// How a photo is mapped onto a canvas with a different aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Keep the whole photo and pad the uncovered margins with black.
    #[default]
    Fit,
    /// Cover the whole canvas and crop the overflow evenly on both sides.
    Fill,
}

/// Places `source` on a black canvas of exactly `canvas` pixels.
pub fn compose(
    source: &RgbaImage,
    canvas: CanvasSize,
    fit: FitMode,
    max_upscale: f32,
) -> Result<RenderedFrame> {
    anyhow::ensure!(!canvas.is_empty(), "canvas dimensions must be positive");
    let source_size = CanvasSize::new(source.width(), source.height());
    anyhow::ensure!(!source_size.is_empty(), "source image is empty");

    let mut out = RgbaImage::from_pixel(canvas.width, canvas.height, BACKGROUND);
    match fit {
        FitMode::Fit => {
            let target = contain_size(canvas, source_size, max_upscale);
            let scaled = scale_region(source, CropRect::full(source_size), target)?;
            let (ox, oy) = center_offset(target, canvas);
            imageops::overlay(&mut out, &scaled, i64::from(ox), i64::from(oy));
        }
        FitMode::Fill => {
            // Crop in source pixels first so the scaled buffer is never
            // larger than the canvas.
            let region = fill_crop(canvas, source_size);
            let scaled = scale_region(source, region, canvas)?;
            // Translucent pixels still have to land on black.
            imageops::overlay(&mut out, &scaled, 0, 0);
        }
    }

    Ok(RenderedFrame::new(out))
}

/// Lanczos3-scales `region` of `source` to exactly `target` pixels.
fn scale_region(source: &RgbaImage, region: CropRect, target: CanvasSize) -> Result<RgbaImage> {
    let pixels: Cow<'_, RgbaImage> =
        if region == CropRect::full(CanvasSize::new(source.width(), source.height())) {
            Cow::Borrowed(source)
        } else {
            Cow::Owned(
                imageops::crop_imm(source, region.x, region.y, region.width, region.height)
                    .to_image(),
            )
        };
    if region.size() == target {
        return Ok(pixels.into_owned());
    }

    let src_view = fir::images::ImageRef::new(
        pixels.width(),
        pixels.height(),
        pixels.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to view photo pixels for scaling")?;
    let mut scaled = fir::images::Image::new(target.width, target.height, fir::PixelType::U8x4);
    let options =
        fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3));
    fir::Resizer::new()
        .resize(&src_view, &mut scaled, Some(&options))
        .with_context(|| format!("failed to scale {} region to {target}", region.size()))?;
    RgbaImage::from_raw(target.width, target.height, scaled.into_vec())
        .context("scaled buffer does not match the canvas")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn is_black(px: &Rgba<u8>) -> bool {
        px.0 == [0, 0, 0, 255]
    }

    fn is_reddish(px: &Rgba<u8>) -> bool {
        px.0[0] > 200 && px.0[1] < 40 && px.0[2] < 40
    }

    #[test]
    fn tall_source_on_square_canvas_is_pillarboxed() {
        let source = RgbaImage::from_pixel(100, 200, RED);
        let frame = compose(&source, CanvasSize::new(100, 100), FitMode::Fit, 1.0).unwrap();
        let img = frame.image();
        assert_eq!(frame.size(), CanvasSize::new(100, 100));

        for y in 0..100 {
            for x in (0..25).chain(75..100) {
                assert!(is_black(img.get_pixel(x, y)), "margin at ({x},{y})");
            }
        }
        for (x, y) in [(25, 0), (74, 0), (50, 50), (25, 99), (74, 99)] {
            assert!(is_reddish(img.get_pixel(x, y)), "content at ({x},{y})");
        }
    }

    #[test]
    fn fill_crops_to_cover_without_margins() {
        let source = RgbaImage::from_pixel(100, 200, RED);
        let frame = compose(&source, CanvasSize::new(100, 100), FitMode::Fill, 1.0).unwrap();
        assert_eq!(frame.size(), CanvasSize::new(100, 100));
        assert!(frame.image().pixels().all(is_reddish));
    }

    #[test]
    fn fill_of_a_one_pixel_wide_source_stays_small() {
        let source = RgbaImage::from_pixel(1, 1080, RED);
        let frame = compose(&source, CanvasSize::new(192, 108), FitMode::Fill, 1.0).unwrap();
        assert_eq!(frame.size(), CanvasSize::new(192, 108));
        assert!(frame.image().pixels().all(is_reddish));
    }

    #[test]
    fn fill_keeps_the_centre_of_the_source() {
        // Left third blue, middle red, right third blue: a square canvas
        // only sees the middle.
        let source = RgbaImage::from_fn(300, 100, |x, _| {
            if (100..200).contains(&x) { RED } else { Rgba([0, 0, 255, 255]) }
        });
        let frame = compose(&source, CanvasSize::new(50, 50), FitMode::Fill, 1.0).unwrap();
        for (x, y) in [(5, 5), (25, 25), (44, 44)] {
            assert!(is_reddish(frame.image().get_pixel(x, y)), "({x},{y})");
        }
    }

    #[test]
    fn small_source_is_centered_not_stretched() {
        let source = RgbaImage::from_pixel(10, 10, RED);
        let frame = compose(&source, CanvasSize::new(30, 20), FitMode::Fit, 1.0).unwrap();
        let img = frame.image();
        assert!(is_black(img.get_pixel(0, 0)));
        assert!(is_black(img.get_pixel(9, 4)));
        assert!(is_reddish(img.get_pixel(10, 5)));
        assert!(is_reddish(img.get_pixel(19, 14)));
        assert!(is_black(img.get_pixel(20, 15)));
    }

    #[test]
    fn transparent_pixels_land_on_black() {
        let source = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 0]));
        let frame = compose(&source, CanvasSize::new(4, 4), FitMode::Fit, 1.0).unwrap();
        assert!(frame.image().pixels().all(|px| px.0[3] == 255));
        assert!(frame.image().pixels().all(|px| px.0[0] == 0));
    }

    #[test]
    fn empty_canvas_is_rejected() {
        let source = RgbaImage::from_pixel(4, 4, RED);
        assert!(compose(&source, CanvasSize::new(0, 4), FitMode::Fit, 1.0).is_err());
    }
}
