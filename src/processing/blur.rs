use anyhow::{Context, Result};
use fast_image_resize as fir;
use image::{RgbaImage, imageops};

use crate::processing::layout::{Placement, ViewportSize};

pub fn apply_blur(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 || !sigma.is_finite() {
        return image.clone();
    }
    imageops::blur(image, sigma)
}

pub fn resize_rgba(source: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage> {
    let full = SourceCrop {
        left: 0.0,
        top: 0.0,
        width: f64::from(source.width()),
        height: f64::from(source.height()),
    };
    resize_region(source, full, target_w, target_h)
}

/// Region of a source image in source pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceCrop {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SourceCrop {
    fn is_full(&self, source: &RgbaImage) -> bool {
        self.left == 0.0
            && self.top == 0.0
            && self.width == f64::from(source.width())
            && self.height == f64::from(source.height())
    }
}

/// The part of a `frame_w x frame_h` frame that lands inside the viewport
/// when drawn at `placement`, clamped to the frame bounds.
pub fn visible_crop(
    frame_w: u32,
    frame_h: u32,
    viewport: ViewportSize,
    placement: &Placement,
) -> SourceCrop {
    let fw = f64::from(frame_w.max(1));
    let fh = f64::from(frame_h.max(1));
    let sx = fw / f64::from(placement.width.max(f32::EPSILON));
    let sy = fh / f64::from(placement.height.max(f32::EPSILON));

    let left = (-f64::from(placement.margin_left) * sx).clamp(0.0, fw);
    let top = (-f64::from(placement.margin_top) * sy).clamp(0.0, fh);
    let right = ((f64::from(viewport.width) - f64::from(placement.margin_left)) * sx).clamp(left, fw);
    let bottom = ((f64::from(viewport.height) - f64::from(placement.margin_top)) * sy).clamp(top, fh);
    SourceCrop {
        left,
        top,
        width: (right - left).max(f64::MIN_POSITIVE),
        height: (bottom - top).max(f64::MIN_POSITIVE),
    }
}

/// Resample only `crop` of `source` into a `target_w x target_h` image.
pub fn resize_region(
    source: &RgbaImage,
    crop: SourceCrop,
    target_w: u32,
    target_h: u32,
) -> Result<RgbaImage> {
    if target_w == 0 || target_h == 0 {
        anyhow::bail!("resize dimensions must be positive");
    }
    if source.width() == target_w && source.height() == target_h && crop.is_full(source) {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to create source view for backdrop resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear))
        .crop(crop.left, crop.top, crop.width, crop.height);
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("backdrop resize failed")?;
    let buffer = dst_image.into_vec();
    RgbaImage::from_raw(target_w, target_h, buffer)
        .ok_or_else(|| anyhow::anyhow!("failed to construct resized RGBA image"))
}

/// Draw `frame` at `placement` on a viewport-sized canvas and blur it.
///
/// Only the part of the frame visible inside the viewport is resampled, so
/// the cost is bounded by the canvas size whatever the source aspect ratio.
/// Work happens at a reduced resolution when the viewport exceeds
/// `max_sample_dim`; the blur radius is scaled to match so the result looks
/// the same once the host stretches it back over the viewport.
pub fn compose_backdrop(
    frame: &RgbaImage,
    viewport: ViewportSize,
    placement: &Placement,
    sigma: f32,
    max_sample_dim: u32,
) -> Result<RgbaImage> {
    let longest = viewport.width.max(viewport.height).max(1) as f32;
    let k = (max_sample_dim.max(1) as f32 / longest).min(1.0);
    let canvas_w = ((viewport.width as f32 * k).round() as u32).max(1);
    let canvas_h = ((viewport.height as f32 * k).round() as u32).max(1);

    let crop = visible_crop(frame.width(), frame.height(), viewport, placement);
    let canvas = resize_region(frame, crop, canvas_w, canvas_h)?;
    Ok(apply_blur(&canvas, sigma * k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::layout::{IntrinsicSize, cover};
    use image::Rgba;

    #[test]
    fn zero_sigma_is_identity() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        assert_eq!(apply_blur(&img, 0.0), img);
    }

    #[test]
    fn resize_hits_requested_size() {
        let img = RgbaImage::from_pixel(8, 4, Rgba([200, 0, 0, 255]));
        let out = resize_rgba(&img, 3, 2).unwrap();
        assert_eq!(out.dimensions(), (3, 2));
        assert!(resize_rgba(&img, 0, 2).is_err());
    }

    #[test]
    fn backdrop_fills_canvas_and_downsamples() {
        let viewport = ViewportSize::new(400, 200);
        let frame = RgbaImage::from_pixel(30, 30, Rgba([255, 255, 255, 255]));
        let placement = cover(viewport, IntrinsicSize::new(30, 30));
        let out = compose_backdrop(&frame, viewport, &placement, 2.0, 100).unwrap();
        assert_eq!(out.dimensions(), (100, 50));
        // Cover placement leaves no black edges behind the blur.
        assert!(out.get_pixel(0, 25)[0] > 200);
        assert!(out.get_pixel(99, 25)[0] > 200);
    }

    #[test]
    fn tall_source_only_samples_the_visible_band() {
        let viewport = ViewportSize::new(1920, 1080);
        let frame = RgbaImage::from_fn(20, 2000, |_, y| {
            if (990..1010).contains(&y) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let placement = cover(viewport, IntrinsicSize::new(20, 2000));
        assert!(placement.height > 100_000.0);

        let crop = visible_crop(20, 2000, viewport, &placement);
        assert_eq!(crop.left, 0.0);
        assert!((crop.width - 20.0).abs() < 1e-3);
        assert!((crop.height - 11.25).abs() < 1e-2, "height {}", crop.height);
        assert!((crop.top + crop.height / 2.0 - 1000.0).abs() < 1e-2);

        let out = compose_backdrop(&frame, viewport, &placement, 2.0, 256).unwrap();
        assert_eq!(out.dimensions(), (256, 144));
        // The centred white band fills the whole canvas.
        assert!(out.get_pixel(128, 72)[0] > 200);
        assert!(out.get_pixel(0, 0)[0] > 200);
    }

    #[test]
    fn visible_crop_follows_frame_resolution() {
        // A frame decoded at half the intrinsic size maps to half the crop.
        let viewport = ViewportSize::new(400, 200);
        let placement = cover(viewport, IntrinsicSize::new(200, 200));
        let full = visible_crop(200, 200, viewport, &placement);
        let half = visible_crop(100, 100, viewport, &placement);
        assert!((full.height - 100.0).abs() < 1e-3);
        assert!((half.height - 50.0).abs() < 1e-3);
        assert!((half.top - full.top / 2.0).abs() < 1e-3);
    }
}
