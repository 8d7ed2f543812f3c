//! Day/night blending along a time-shifted terminator mask.
//!
//! The mask asset is authored with its dawn line in the horizontal centre, so
//! the rotation applied for a given UTC hour is
//! `trunc(-(width / 24) * (hour + 12))` pixels. The mask is rotated
//! cyclically and used as a per-pixel blend weight: 255 keeps the day
//! pixel, 0 keeps the night pixel.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Pixel};
use tracing::debug;

use crate::clock::{Clock, SystemClock, hour_of_day};
use crate::error::GreylineError;
use crate::watermark::{Watermark, overlay_watermark};

/// Horizontal mask rotation for `hour`, truncated toward zero.
pub fn mask_shift(mask_width: u32, hour: f64) -> i64 {
    (-(f64::from(mask_width) / 24.0) * (hour + 12.0)) as i64
}

/// Rotate `mask` horizontally by `shift` pixels with wrap-around.
///
/// Column `x` of the result is column `(x - shift) mod width` of the input.
pub fn offset_mask(mask: &GrayImage, shift: i64) -> GrayImage {
    let mut shifted = mask.clone();
    let width = mask.width();
    if width == 0 {
        return shifted;
    }
    let offset = shift.rem_euclid(i64::from(width)) as usize;
    for row in shifted.chunks_exact_mut(width as usize) {
        row.rotate_right(offset);
    }
    shifted
}

/// Reduce a mask to 8-bit luminance.
///
/// 8-bit grey masks pass through untouched; everything else goes through RGB
/// and the ITU-R 601-2 fixed-point weights. Alpha is ignored.
pub fn mask_luminance(mask: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(luma) = mask {
        return luma.clone();
    }
    let rgb = mask.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([rec601_luma(r, g, b)])
    })
}

fn rec601_luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000;
    (weighted >> 16) as u8
}

/// Blend one channel: `weight` 0 yields `base`, 255 yields `over`.
pub(crate) fn blend_channel(base: u8, over: u8, weight: u8) -> u8 {
    let weight = u32::from(weight);
    let mixed = u32::from(base) * (255 - weight) + u32::from(over) * weight + 128;
    ((mixed + (mixed >> 8)) >> 8) as u8
}

/// Per-pixel blend of `day` over `night` weighted by `mask`.
///
/// All three buffers must have the same dimensions.
pub fn composite<P>(
    day: &ImageBuffer<P, Vec<u8>>,
    night: &ImageBuffer<P, Vec<u8>>,
    mask: &GrayImage,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let mut out = night.clone();
    for ((pixel, day_pixel), weight) in out.pixels_mut().zip(day.pixels()).zip(mask.pixels()) {
        let weight = weight.0[0];
        *pixel = pixel.map2(day_pixel, |night, day| blend_channel(night, day, weight));
    }
    out
}

fn check_dimensions(
    day: &DynamicImage,
    night: &DynamicImage,
    mask: &DynamicImage,
) -> Result<(), GreylineError> {
    let (expected_width, expected_height) = (day.width(), day.height());
    for (layer, image) in [("night", night), ("mask", mask)] {
        if (image.width(), image.height()) != (expected_width, expected_height) {
            return Err(GreylineError::DimensionMismatch {
                layer,
                expected_width,
                expected_height,
                actual_width: image.width(),
                actual_height: image.height(),
            });
        }
    }
    Ok(())
}

fn blend_layers<P>(
    day: ImageBuffer<P, Vec<u8>>,
    night: ImageBuffer<P, Vec<u8>>,
    mask: &GrayImage,
    watermark: Option<&Watermark>,
) -> Result<ImageBuffer<P, Vec<u8>>, GreylineError>
where
    P: Pixel<Subpixel = u8>,
{
    let mut out = composite(&day, &night, mask);
    if let Some(watermark) = watermark {
        overlay_watermark(&mut out, watermark)?;
    }
    Ok(out)
}

/// Render the greyline composite for an explicit `hour`.
///
/// Day and night are blended as RGB, or as RGBA when either carries alpha.
pub fn render_composite(
    day: &DynamicImage,
    night: &DynamicImage,
    mask: &DynamicImage,
    hour: f64,
    watermark: Option<&Watermark>,
) -> Result<DynamicImage, GreylineError> {
    if !hour.is_finite() {
        return Err(GreylineError::InvalidHour(hour));
    }
    check_dimensions(day, night, mask)?;

    let luma = mask_luminance(mask);
    let shift = mask_shift(luma.width(), hour);
    let shifted = offset_mask(&luma, shift);
    debug!(hour, shift, width = luma.width(), "rotated terminator mask");

    if day.color().has_alpha() || night.color().has_alpha() {
        let out = blend_layers(day.to_rgba8(), night.to_rgba8(), &shifted, watermark)?;
        Ok(DynamicImage::ImageRgba8(out))
    } else {
        let out = blend_layers(day.to_rgb8(), night.to_rgb8(), &shifted, watermark)?;
        Ok(DynamicImage::ImageRgb8(out))
    }
}

/// Renders composites, falling back to `clock` when no hour is given.
#[derive(Debug, Clone, Default)]
pub struct GreylineCompositor<C: Clock = SystemClock> {
    clock: C,
}

impl<C: Clock> GreylineCompositor<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// `hour` if given, otherwise the current UTC hour from the clock.
    pub fn resolve_hour(&self, hour: Option<f64>) -> f64 {
        hour.unwrap_or_else(|| hour_of_day(self.clock.now_utc()))
    }

    pub fn render(
        &self,
        day: &DynamicImage,
        night: &DynamicImage,
        mask: &DynamicImage,
        hour: Option<f64>,
        watermark: Option<&Watermark>,
    ) -> Result<DynamicImage, GreylineError> {
        render_composite(day, night, mask, self.resolve_hour(hour), watermark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use image::{LumaA, Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient_mask() -> GrayImage {
        GrayImage::from_fn(4, 2, |x, _| Luma([[255, 170, 85, 0][x as usize]]))
    }

    fn white() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, Rgb([255, 255, 255])))
    }

    fn black() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, Rgb([0, 0, 0])))
    }

    #[test]
    fn shift_is_zero_at_noon() {
        assert_eq!(mask_shift(4, 12.0), -4);
        assert_eq!(mask_shift(4, 12.0).rem_euclid(4), 0);
        assert_eq!(mask_shift(2048, 12.0), -2048);
    }

    #[test]
    fn shift_at_midnight_is_half_width() {
        assert_eq!(mask_shift(4, 0.0), -2);
        assert_eq!(mask_shift(1000, 0.0), -500);
    }

    #[test]
    fn shift_matches_negated_floor_for_the_day() {
        for width in [4u32, 24, 360, 1000, 2047] {
            for step in 0..96 {
                let hour = f64::from(step) / 4.0;
                let product = (f64::from(width) / 24.0) * (hour + 12.0);
                assert_eq!(mask_shift(width, hour), -(product.floor() as i64));
            }
        }
    }

    #[test]
    fn shift_is_periodic_over_a_day() {
        for width in [4u32, 24, 360, 1000, 2047] {
            let start = mask_shift(width, 0.0).rem_euclid(i64::from(width));
            let end = mask_shift(width, 24.0).rem_euclid(i64::from(width));
            assert_eq!(start, end, "width {width}");
        }
    }

    #[test]
    fn shift_truncates_toward_zero() {
        // -(24 / 24) * (-12.5 + 12) = 0.5, truncated to 0 where floor would give 0
        assert_eq!(mask_shift(24, -12.5), 0);
        // -(24 / 24) * (-11.5 + 12) = -0.5, truncated to 0 where floor would give -1
        assert_eq!(mask_shift(24, -11.5), 0);
        assert_eq!(mask_shift(10, 1.0), -5);
    }

    #[test]
    fn offset_mask_rotates_rows() {
        let mask = gradient_mask();
        let shifted = offset_mask(&mask, 1);
        let row: Vec<u8> = (0..4).map(|x| shifted.get_pixel(x, 0).0[0]).collect();
        assert_eq!(row, vec![0, 255, 170, 85]);

        let shifted = offset_mask(&mask, -2);
        let row: Vec<u8> = (0..4).map(|x| shifted.get_pixel(x, 1).0[0]).collect();
        assert_eq!(row, vec![85, 0, 255, 170]);
    }

    #[test]
    fn offset_by_full_width_is_identity() {
        let mask = gradient_mask();
        assert_eq!(offset_mask(&mask, 4), mask);
        assert_eq!(offset_mask(&mask, -8), mask);
    }

    #[test]
    fn luminance_passes_grey_through() {
        let mask = DynamicImage::ImageLuma8(gradient_mask());
        assert_eq!(mask_luminance(&mask), gradient_mask());
    }

    #[test]
    fn luminance_of_colour_uses_rec601_weights() {
        let mask = DynamicImage::ImageRgb8(RgbImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        }));
        let luma = mask_luminance(&mask);
        assert_eq!(luma.get_pixel(0, 0).0[0], 76);
        assert_eq!(luma.get_pixel(1, 0).0[0], 150);
        assert_eq!(luma.get_pixel(2, 0).0[0], 29);
    }

    #[test]
    fn luminance_ignores_alpha() {
        let mask = DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(2, 2, LumaA([128, 0])));
        assert!(mask_luminance(&mask).pixels().all(|p| p.0[0] == 128));
    }

    #[test]
    fn blend_channel_endpoints_are_exact() {
        for base in 0..=255u8 {
            for over in [0u8, 1, 77, 254, 255] {
                assert_eq!(blend_channel(base, over, 0), base);
                assert_eq!(blend_channel(base, over, 255), over);
            }
        }
    }

    #[test]
    fn composite_picks_day_and_night_at_mask_extremes() {
        let day = RgbImage::from_fn(2, 1, |x, _| Rgb([x as u8 * 10, 200, 7]));
        let night = RgbImage::from_fn(2, 1, |x, _| Rgb([3, x as u8 * 40, 90]));
        let mask = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 255 } else { 0 }]));
        let out = composite(&day, &night, &mask);
        assert_eq!(out.get_pixel(0, 0), day.get_pixel(0, 0));
        assert_eq!(out.get_pixel(1, 0), night.get_pixel(1, 0));
    }

    #[test]
    fn render_at_noon_follows_gradient() {
        let mask = DynamicImage::ImageLuma8(gradient_mask());
        let out = render_composite(&white(), &black(), &mask, 12.0, None)
            .unwrap()
            .to_rgb8();
        let row: Vec<u8> = (0..4).map(|x| out.get_pixel(x, 0).0[0]).collect();
        assert_eq!(row, vec![255, 170, 85, 0]);
    }

    #[test]
    fn rgba_inputs_produce_rgba_output() {
        let day = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255])));
        let mask = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 2, Luma([255])));
        let out = render_composite(&day, &black(), &mask, 12.0, None).unwrap();
        assert!(out.color().has_alpha());
        assert_eq!(*out.to_rgba8().get_pixel(3, 1), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let mask = DynamicImage::ImageLuma8(GrayImage::new(8, 2));
        let err = render_composite(&white(), &black(), &mask, 0.0, None).unwrap_err();
        assert!(matches!(
            err,
            GreylineError::DimensionMismatch {
                layer: "mask",
                actual_width: 8,
                ..
            }
        ));
    }

    #[test]
    fn mismatched_night_is_rejected() {
        let night = DynamicImage::ImageRgb8(RgbImage::new(4, 3));
        let mask = DynamicImage::ImageLuma8(gradient_mask());
        let err = render_composite(&white(), &night, &mask, 0.0, None).unwrap_err();
        assert!(matches!(
            err,
            GreylineError::DimensionMismatch { layer: "night", .. }
        ));
    }

    #[test]
    fn non_finite_hour_is_rejected() {
        let mask = DynamicImage::ImageLuma8(gradient_mask());
        let err = render_composite(&white(), &black(), &mask, f64::NAN, None).unwrap_err();
        assert!(matches!(err, GreylineError::InvalidHour(_)));
    }

    #[test]
    fn compositor_uses_clock_when_hour_missing() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 6, 30, 0).unwrap());
        let compositor = GreylineCompositor::new(clock);
        assert_eq!(compositor.resolve_hour(None), 6.5);
        assert_eq!(compositor.resolve_hour(Some(3.0)), 3.0);

        let mask = DynamicImage::ImageLuma8(gradient_mask());
        let implicit = compositor.render(&white(), &black(), &mask, None, None).unwrap();
        let explicit = render_composite(&white(), &black(), &mask, 6.5, None).unwrap();
        assert_eq!(implicit, explicit);
    }
}
