//! Bounding box types and the pixel ↔ normalized conversion.

use std::marker::PhantomData;

use super::{Normalized, Pixel};

/// An axis-aligned bounding box in corner (XYXY) form.
///
/// Construction does NOT enforce `min < max`; annotation documents routinely
/// contain degenerate boxes and the materializer decides what to drop via
/// [`BBoxXYXY::is_well_formed`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    _space: PhantomData<TSpace>,
}

/// An axis-aligned bounding box in center/extent (CxCyWH) form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBoxCxCyWh<TSpace> {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            _space: PhantomData,
        }
    }

    /// May be negative if the box is malformed.
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// May be negative if the box is malformed.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite()
            && self.ymin.is_finite()
            && self.xmax.is_finite()
            && self.ymax.is_finite()
    }

    /// Finite and strictly ordered on both axes.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.is_finite() && self.xmin < self.xmax && self.ymin < self.ymax
    }
}

impl<TSpace> BBoxCxCyWh<TSpace> {
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self {
            cx,
            cy,
            w,
            h,
            _space: PhantomData,
        }
    }

    /// Returns `(cx, cy, w, h)`.
    #[inline]
    pub fn to_tuple(&self) -> (f64, f64, f64, f64) {
        (self.cx, self.cy, self.w, self.h)
    }
}

impl BBoxXYXY<Pixel> {
    /// Converts a pixel corner box into normalized center/extent form.
    ///
    /// Every output component is clamped to `[0, 1]`, so boxes that spill
    /// over the image border are kept rather than rejected. Callers must
    /// pass non-zero image dimensions.
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBoxCxCyWh<Normalized> {
        let cx = (self.xmin + self.xmax) / (2.0 * image_width);
        let cy = (self.ymin + self.ymax) / (2.0 * image_height);
        let w = self.width() / image_width;
        let h = self.height() / image_height;

        BBoxCxCyWh::from_cxcywh(clamp_unit(cx), clamp_unit(cy), clamp_unit(w), clamp_unit(h))
    }
}

impl BBoxCxCyWh<Normalized> {
    /// Inverse of [`BBoxXYXY::to_normalized`] for in-bounds boxes.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Pixel> {
        let half_w = self.w * image_width / 2.0;
        let half_h = self.h * image_height / 2.0;
        let cx = self.cx * image_width;
        let cy = self.cy * image_height;

        BBoxXYXY::from_xyxy(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }

    /// True when every component lies in `[0, 1]`.
    pub fn is_within_unit(&self) -> bool {
        [self.cx, self.cy, self.w, self.h]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

/// Normalizes a pixel box against image dimensions.
///
/// Shorthand for [`BBoxXYXY::to_normalized`] taking integer dimensions as
/// read from the image header.
pub fn normalize(
    bbox: &BBoxXYXY<Pixel>,
    image_width: u32,
    image_height: u32,
) -> BBoxCxCyWh<Normalized> {
    bbox.to_normalized(image_width as f64, image_height as f64)
}

/// Inverse of [`normalize`] for boxes that were inside the image.
pub fn denormalize(
    bbox: &BBoxCxCyWh<Normalized>,
    image_width: u32,
    image_height: u32,
) -> BBoxXYXY<Pixel> {
    bbox.to_pixel(image_width as f64, image_height as f64)
}

fn clamp_unit(value: f64) -> f64 {
    // NaN would survive f64::clamp; map it to the lower bound instead.
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
