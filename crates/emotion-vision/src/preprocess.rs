//! Grayscale conversion and classifier input preparation.
//!
//! The classifier expects a single NHWC sample: shape `(1, 48, 48, 1)`,
//! intensities scaled to `[0.0, 1.0]`.

use std::borrow::Cow;

use emotion_models::FaceRegion;
use image::imageops;
use image::{DynamicImage, GrayImage, Luma};
use ndarray::Array4;

use crate::error::{VisionError, VisionResult};

/// Side length of the square classifier input.
pub const FACE_SIZE: u32 = 48;

/// Classifier input tensor, laid out as (batch, height, width, channels).
pub type FaceTensor = Array4<f32>;

/// BT.601 luma in 14-bit fixed point, rounded the way OpenCV's BGR2GRAY rounds.
#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    ((r as u32 * R + g as u32 * G + b as u32 * B + (1 << 13)) >> 14) as u8
}

/// Convert a decoded image to single-channel 8-bit grayscale.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }

    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}

/// Copy a face region out of the grayscale frame.
///
/// The region is clamped to the frame; a region entirely outside it is an error.
pub fn crop_region(gray: &GrayImage, region: FaceRegion) -> VisionResult<GrayImage> {
    let clamped = region
        .clamp_to(gray.width(), gray.height())
        .ok_or_else(|| {
            VisionError::InvalidRegion(format!(
                "{:?} lies outside the {}x{} frame",
                region,
                gray.width(),
                gray.height()
            ))
        })?;

    Ok(imageops::crop_imm(gray, clamped.x, clamped.y, clamped.width, clamped.height).to_image())
}

/// Fractional bits of the fixed-point interpolation weights.
const COEF_BITS: u32 = 11;

/// Source sample and fixed-point weights for one output coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tap {
    index: usize,
    w0: i32,
    w1: i32,
}

/// Half-pixel-centred linear taps mapping `src` samples onto `dst`.
///
/// No antialiasing: each output sample reads at most two neighbours, even
/// when shrinking. Weights are rounded to 11 bits the way OpenCV's 8-bit
/// `INTER_LINEAR` path rounds them.
fn linear_taps(src: u32, dst: u32) -> Vec<Tap> {
    let scale = 1.0 / (dst as f64 / src as f64);
    let last = src as i64 - 1;
    let one = (1 << COEF_BITS) as f32;

    (0..dst)
        .map(|d| {
            let pos = ((d as f64 + 0.5) * scale - 0.5) as f32;
            let mut index = pos.floor() as i64;
            let mut frac = pos - index as f32;

            if index < 0 {
                index = 0;
                frac = 0.0;
            }
            if index >= last {
                index = last;
                frac = 0.0;
            }

            Tap {
                index: index as usize,
                w0: ((1.0 - frac) * one).round_ties_even() as i32,
                w1: (frac * one).round_ties_even() as i32,
            }
        })
        .collect()
}

/// Bilinear resize matching OpenCV `resize(..., INTER_LINEAR)` on 8-bit input.
fn resize_linear(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let cols = linear_taps(src.width(), width);
    let rows = linear_taps(src.height(), height);
    let stride = src.width() as usize;
    let last_row = src.height() as usize - 1;
    let raw = src.as_raw();

    let horizontal = |row: usize| -> Vec<i32> {
        let line = &raw[row * stride..(row + 1) * stride];
        cols.iter()
            .map(|t| {
                let next = line.get(t.index + 1).copied().unwrap_or(0) as i32;
                line[t.index] as i32 * t.w0 + next * t.w1
            })
            .collect()
    };

    let round = 1 << (2 * COEF_BITS - 1);
    let mut out = GrayImage::new(width, height);
    for (y, tap) in rows.iter().enumerate() {
        let top = horizontal(tap.index);
        let bottom = horizontal((tap.index + 1).min(last_row));
        for (x, (a, b)) in top.iter().zip(&bottom).enumerate() {
            let value = (a * tap.w0 + b * tap.w1 + round) >> (2 * COEF_BITS);
            out.put_pixel(x as u32, y as u32, Luma([value.clamp(0, 255) as u8]));
        }
    }
    out
}

/// Resize a grayscale face to 48x48 and scale it into the classifier tensor.
pub fn preprocess_face(face: &GrayImage) -> VisionResult<FaceTensor> {
    if face.width() == 0 || face.height() == 0 {
        return Err(VisionError::InvalidRegion("empty face crop".to_string()));
    }

    let resized = if face.dimensions() == (FACE_SIZE, FACE_SIZE) {
        Cow::Borrowed(face)
    } else {
        Cow::Owned(resize_linear(face, FACE_SIZE, FACE_SIZE))
    };

    let data: Vec<f32> = resized.as_raw().iter().map(|&p| p as f32 / 255.0).collect();
    let side = FACE_SIZE as usize;

    Array4::from_shape_vec((1, side, side, 1), data)
        .map_err(|e| VisionError::internal(format!("face tensor shape: {e}")))
}
