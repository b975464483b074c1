//! Face regions in image pixel coordinates.

use serde::{Deserialize, Serialize};

/// Axis-aligned face rectangle reported by the detector.
///
/// Serialized as `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct FaceRegion {
    /// Left edge x-coordinate
    pub x: u32,
    /// Top edge y-coordinate
    pub y: u32,
    /// Region width
    pub width: u32,
    /// Region height
    pub height: u32,
}

impl FaceRegion {
    /// Create a new face region.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a region from signed detector output, clamping negatives to zero.
    pub fn from_signed(x: i32, y: i32, width: i32, height: i32) -> Self {
        let clamp = |v: i32| u32::try_from(v).unwrap_or(0);
        Self::new(clamp(x), clamp(y), clamp(width), clamp(height))
    }

    /// Right edge x-coordinate (exclusive).
    #[inline]
    pub fn x2(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge y-coordinate (exclusive).
    #[inline]
    pub fn y2(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Region area in pixels.
    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Intersect with a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` when nothing of the region lies inside the frame.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<FaceRegion> {
        let x = self.x.min(frame_width);
        let y = self.y.min(frame_height);
        let x2 = self.x2().min(frame_width);
        let y2 = self.y2().min(frame_height);

        if x2 <= x || y2 <= y {
            return None;
        }

        Some(FaceRegion::new(x, y, x2 - x, y2 - y))
    }
}

impl From<[u32; 4]> for FaceRegion {
    fn from([x, y, width, height]: [u32; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<FaceRegion> for [u32; 4] {
    fn from(region: FaceRegion) -> Self {
        [region.x, region.y, region.width, region.height]
    }
}
