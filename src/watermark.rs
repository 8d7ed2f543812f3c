//! Callsign/watermark overlay pasted on top of a finished composite.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel, RgbaImage};

use crate::compositor::blend_channel;
use crate::error::GreylineError;

/// How to shrink a watermark and where to put its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkPlacement {
    /// Divisor applied to both sides of the watermark.
    pub scale: f64,
    pub x: i64,
    pub y: i64,
}

impl Default for WatermarkPlacement {
    fn default() -> Self {
        Self {
            scale: 1.0,
            x: 0,
            y: 0,
        }
    }
}

impl WatermarkPlacement {
    pub fn new(scale: f64, x: i64, y: i64) -> Self {
        Self { scale, x, y }
    }

    /// Size of a `width`x`height` watermark after dividing by `scale`, floored.
    pub fn scaled_size(&self, width: u32, height: u32) -> Result<(u32, u32), GreylineError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(GreylineError::placement(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        let scaled_width = scale_side(width, self.scale)?;
        let scaled_height = scale_side(height, self.scale)?;
        Ok((scaled_width, scaled_height))
    }
}

fn scale_side(side: u32, scale: f64) -> Result<u32, GreylineError> {
    let scaled = (f64::from(side) / scale).floor();
    if scaled < 1.0 || scaled > f64::from(u32::MAX) {
        return Err(GreylineError::placement(format!(
            "scale {scale} turns a {side}px side into {scaled}px"
        )));
    }
    Ok(scaled as u32)
}

/// A decoded watermark together with its placement.
#[derive(Clone)]
pub struct Watermark {
    pub image: RgbaImage,
    pub placement: WatermarkPlacement,
}

impl std::fmt::Debug for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watermark")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("placement", &self.placement)
            .finish()
    }
}

impl Watermark {
    pub fn new(image: RgbaImage, placement: WatermarkPlacement) -> Self {
        Self { image, placement }
    }

    /// The watermark resized according to its placement scale.
    pub fn scaled(&self) -> Result<Cow<'_, RgbaImage>, GreylineError> {
        let (width, height) = self
            .placement
            .scaled_size(self.image.width(), self.image.height())?;
        if (width, height) == self.image.dimensions() {
            return Ok(Cow::Borrowed(&self.image));
        }
        Ok(Cow::Owned(imageops::resize(
            &self.image,
            width,
            height,
            FilterType::Lanczos3,
        )))
    }
}

/// Paste `watermark` onto `canvas` using the watermark's alpha as the blend mask.
///
/// Parts hanging over the canvas edge are clipped. A watermark that misses the
/// canvas entirely is rejected.
pub fn overlay_watermark<P>(
    canvas: &mut ImageBuffer<P, Vec<u8>>,
    watermark: &Watermark,
) -> Result<(), GreylineError>
where
    P: Pixel<Subpixel = u8>,
{
    let scaled = watermark.scaled()?;
    let placement = watermark.placement;

    let x_start = placement.x.max(0);
    let y_start = placement.y.max(0);
    let x_end = placement
        .x
        .saturating_add(i64::from(scaled.width()))
        .min(i64::from(canvas.width()));
    let y_end = placement
        .y
        .saturating_add(i64::from(scaled.height()))
        .min(i64::from(canvas.height()));

    if x_start >= x_end || y_start >= y_end {
        return Err(GreylineError::placement(format!(
            "{}x{} watermark at ({}, {}) lies outside the {}x{} canvas",
            scaled.width(),
            scaled.height(),
            placement.x,
            placement.y,
            canvas.width(),
            canvas.height()
        )));
    }

    let channels = usize::from(P::CHANNEL_COUNT);
    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let source = scaled.get_pixel((tx - placement.x) as u32, (ty - placement.y) as u32);
            let alpha = source.0[3];
            if alpha == 0 {
                continue;
            }
            let top = *P::from_slice(&source.0[..channels]);
            let target = canvas.get_pixel_mut(tx as u32, ty as u32);
            *target = target.map2(&top, |base, over| blend_channel(base, over, alpha));
        }
    }
    Ok(())
}
