//! Pixel Operations - the numeric transforms behind each node
//!
//! Every function here leaves alpha untouched and only ever reads or writes
//! coordinates inside the image it was given.

use image::{Rgba, RgbaImage};
use rand::Rng;

use crate::operation::OperationError;
use crate::raster::Image;

pub fn greyscale(image: &mut Image) {
    image.to_grayscale();
}

/// Grayscale, then stretch the value range to the full `[0, 255]`.
///
/// A uniform image has no range to stretch and is left as its grayscale
/// conversion.
pub fn normalise(image: &mut Image) {
    image.to_grayscale();

    let mut old_min = u8::MAX;
    let mut old_max = u8::MIN;
    for pixel in image.pixels() {
        let v = pixel.0[0];
        old_min = old_min.min(v);
        old_max = old_max.max(v);
    }

    if old_max <= old_min {
        return;
    }

    let range = f64::from(old_max - old_min);
    for pixel in image.pixels_mut() {
        let [v, _, _, a] = pixel.0;
        let stretched = (255.0 * f64::from(v - old_min) / range).round() as u8;
        *pixel = Rgba([stretched, stretched, stretched, a]);
    }
}

/// Darken towards the corners with a squared radial falloff.
pub fn vignette(image: &mut Image) {
    let center_x = i64::from(image.width() / 2);
    let center_y = i64::from(image.height() / 2);
    let max_distance = floor_distance(center_x, center_y);

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let distance = floor_distance(center_x - i64::from(x), center_y - i64::from(y));
        let brightness = vignette_brightness(distance, max_distance);
        let [r, g, b, a] = pixel.0;
        *pixel = Rgba([
            scale_channel(r, brightness),
            scale_channel(g, brightness),
            scale_channel(b, brightness),
            a,
        ]);
    }
}

/// Multiplier applied to a pixel `distance` away from the centre
pub(crate) fn vignette_brightness(distance: f64, max_distance: f64) -> f64 {
    // A 1x1 image has its only pixel at the centre
    if max_distance <= 0.0 {
        return 1.0;
    }
    let falloff = (max_distance - distance) / max_distance;
    (falloff * falloff).clamp(0.0, 1.0)
}

fn floor_distance(dx: i64, dy: i64) -> f64 {
    ((dx * dx + dy * dy) as f64).sqrt().floor()
}

fn scale_channel(value: u8, factor: f64) -> u8 {
    (f64::from(value) * factor).clamp(0.0, 255.0) as u8
}

/// Add one uniform draw from `[-band, band)` to R, G and B of each pixel,
/// where `band = trunc(255 * |amount|)`, capped at [`MAX_NOISE_BAND`].
pub fn noise<R: Rng>(image: &mut Image, amount: f64, rng: &mut R) {
    let band = noise_band(amount);
    if band == 0 {
        return;
    }

    for pixel in image.pixels_mut() {
        let offset = rng.gen_range(-band..band);
        let [r, g, b, a] = pixel.0;
        *pixel = Rgba([
            offset_channel(r, offset),
            offset_channel(g, offset),
            offset_channel(b, offset),
            a,
        ]);
    }
}

/// Any offset of this size already pushes every channel to 0 or 255
pub const MAX_NOISE_BAND: i64 = 510;

pub(crate) fn noise_band(amount: f64) -> i64 {
    if amount.is_nan() {
        return 0;
    }
    (255.0 * amount.abs()).trunc().min(MAX_NOISE_BAND as f64) as i64
}

fn offset_channel(value: u8, offset: i64) -> u8 {
    i64::from(value).saturating_add(offset).clamp(0, 255) as u8
}

/// Cut out the `width` x `height` rectangle whose top-left corner sits at
/// `(origin_x, origin_y)` in the source.
///
/// The whole rectangle is checked against the source before anything is
/// allocated, so a failed crop never touches `image`.
pub fn crop(
    image: &mut Image,
    origin_x: i64,
    origin_y: i64,
    width: i64,
    height: i64,
) -> Result<(), OperationError> {
    if width <= 0 || height <= 0 {
        return Err(OperationError::EmptyCrop { width, height });
    }

    let out_of_bounds = || OperationError::OutOfBounds {
        origin_x,
        origin_y,
        width,
        height,
        image_width: image.width(),
        image_height: image.height(),
    };

    let fits = |origin: i64, len: i64, extent: u32| {
        origin >= 0
            && origin
                .checked_add(len)
                .map_or(false, |end| end <= i64::from(extent))
    };
    if !fits(origin_x, width, image.width()) || !fits(origin_y, height, image.height()) {
        return Err(out_of_bounds());
    }

    // All four values are now known to lie within the source's u32 extent
    let (ox, oy) = (origin_x as u32, origin_y as u32);
    let (w, h) = (width as u32, height as u32);

    let cropped = RgbaImage::from_fn(w, h, |x, y| image.pixel(ox + x, oy + y));
    *image = Image::from(cropped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 4x1 image with reds 10, 20, 30, 40 and distinct alphas
    fn ramp() -> Image {
        let mut img = Image::blank(4, 1);
        for x in 0..4u32 {
            let v = (x as u8 + 1) * 10;
            img.set_pixel(x, 0, Rgba([v, v, v, 100 + x as u8]));
        }
        img
    }

    #[test]
    fn test_normalise_stretches_to_full_range() {
        let mut img = ramp();
        normalise(&mut img);

        let reds: Vec<u8> = img.pixels().map(|p| p.0[0]).collect();
        assert_eq!(reds, vec![0, 85, 170, 255]);
        // alpha untouched
        assert_eq!(img.pixel(3, 0).0[3], 103);
    }

    #[test]
    fn test_normalise_uniform_is_grayscale() {
        let mut img = Image::filled(3, 3, Rgba([90, 90, 90, 255]));
        normalise(&mut img);
        assert!(img.pixels().all(|p| p.0 == [90, 90, 90, 255]));
    }

    #[test]
    fn test_vignette_brightness_edges() {
        assert_eq!(vignette_brightness(0.0, 5.0), 1.0);
        assert_eq!(vignette_brightness(5.0, 5.0), 0.0);
        assert_eq!(vignette_brightness(0.0, 0.0), 1.0);
        // Outside the nominal radius still never goes negative
        assert_eq!(vignette_brightness(7.0, 5.0), 0.0);
        assert!((vignette_brightness(2.5, 5.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_vignette_single_pixel_unchanged() {
        let mut img = Image::filled(1, 1, Rgba([12, 34, 56, 78]));
        vignette(&mut img);
        assert_eq!(img.pixel(0, 0).0, [12, 34, 56, 78]);
    }

    #[test]
    fn test_noise_band() {
        assert_eq!(noise_band(0.0), 0);
        assert_eq!(noise_band(0.5), 127);
        assert_eq!(noise_band(-0.5), 127);
        assert_eq!(noise_band(2.0), 510);
        assert_eq!(noise_band(f64::NAN), 0);
    }

    #[test]
    fn test_noise_band_saturates() {
        assert_eq!(noise_band(3.0), MAX_NOISE_BAND);
        assert_eq!(noise_band(1e300), MAX_NOISE_BAND);
        assert_eq!(noise_band(f64::INFINITY), MAX_NOISE_BAND);
        assert_eq!(noise_band(f64::NEG_INFINITY), MAX_NOISE_BAND);
    }

    #[test]
    fn test_offset_channel_extremes() {
        assert_eq!(offset_channel(200, i64::MAX), 255);
        assert_eq!(offset_channel(10, i64::MIN), 0);
        assert_eq!(offset_channel(10, -3), 7);
    }

    #[test]
    fn test_noise_huge_amount_still_adds_noise() {
        let mut img = Image::filled(16, 16, Rgba([128, 128, 128, 255]));
        noise(&mut img, f64::MAX, &mut StdRng::seed_from_u64(3));
        // Band 510 around 128 lands on 0 or 255 almost always, never all unchanged
        assert!(img.pixels().any(|p| p.0[0] != 128));
        assert!(img.pixels().all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2]));
    }

    #[test]
    fn test_noise_zero_amount_is_identity() {
        let mut img = ramp();
        let before = img.clone();
        noise(&mut img, 0.0, &mut StdRng::seed_from_u64(1));
        assert_eq!(img, before);
    }

    #[test]
    fn test_noise_shares_draw_across_channels() {
        let mut img = Image::filled(8, 8, Rgba([128, 128, 128, 9]));
        noise(&mut img, 0.3, &mut StdRng::seed_from_u64(42));

        for p in img.pixels() {
            let [r, g, b, a] = p.0;
            assert_eq!(r, g);
            assert_eq!(g, b);
            assert_eq!(a, 9);
            // band = 76, draws in [-76, 76)
            assert!((52..=203).contains(&r), "{} outside band", r);
        }
    }

    #[test]
    fn test_noise_clamps_large_amounts() {
        let mut img = Image::filled(16, 16, Rgba([250, 5, 128, 255]));
        noise(&mut img, 5.0, &mut StdRng::seed_from_u64(7));
        // Every channel was pushed far outside the byte range and clamped
        assert!(img.pixels().all(|p| p.0[3] == 255));
        assert!(img.pixels().any(|p| p.0[0] == 255 || p.0[0] == 0));
    }

    #[test]
    fn test_crop_copies_region() {
        let mut img = ramp();
        crop(&mut img, 1, 0, 2, 1).unwrap();
        assert_eq!(img.size(), [2, 1]);
        assert_eq!(img.pixel(0, 0).0, [20, 20, 20, 101]);
        assert_eq!(img.pixel(1, 0).0, [30, 30, 30, 102]);
    }

    #[test]
    fn test_crop_rejects_negative_origin() {
        let mut img = ramp();
        let err = crop(&mut img, -1, 0, 1, 1).unwrap_err();
        assert!(matches!(err, OperationError::OutOfBounds { .. }));
        assert_eq!(img, ramp());
    }

    #[test]
    fn test_crop_rejects_empty_size() {
        let mut img = ramp();
        let err = crop(&mut img, 0, 0, 0, 1).unwrap_err();
        assert!(matches!(err, OperationError::EmptyCrop { width: 0, height: 1 }));
    }

    #[test]
    fn test_crop_overflowing_extent() {
        let mut img = ramp();
        let err = crop(&mut img, 1, 0, i64::MAX, 1).unwrap_err();
        assert!(matches!(err, OperationError::OutOfBounds { .. }));
    }
}
