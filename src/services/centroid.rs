//! Hand centroid estimation from a depth frame
//!
//! The hand is everything closer than the clipping distance. The centroid is
//! the rounded-up mean pixel position of that mass, with the depth read back
//! at that pixel.

use crate::domain::capture::DepthFrame;
use crate::domain::types::Centroid;

/// Centroid of all pixels with `0 < depth < clipping_distance_m`.
/// `None` when no pixel qualifies.
pub fn calculate_centroid(depth: &DepthFrame, clipping_distance_m: f64) -> Option<Centroid> {
    if depth.depth_scale() <= 0.0 {
        return None;
    }
    let clipping_raw = clipping_distance_m / depth.depth_scale();
    let width = depth.width();

    let mut sum_x = 0u64;
    let mut sum_y = 0u64;
    let mut count = 0u64;

    for (i, &raw) in depth.data().iter().enumerate() {
        if raw > 0 && f64::from(raw) < clipping_raw {
            sum_x += (i % width) as u64;
            sum_y += (i / width) as u64;
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }

    let center_x = (sum_x as f64 / count as f64).ceil();
    let center_y = (sum_y as f64 / count as f64).ceil();
    let z_m = depth.distance_m(center_x as usize, center_y as usize).unwrap_or(0.0);

    Some(Centroid::new(center_x, center_y, z_m))
}

/// True when the centroid sits at the prescribed distance (whole centimetres)
#[inline]
pub fn is_distance_valid(centroid: &Centroid, expected_cm: u32) -> bool {
    centroid.distance_cm() == i64::from(expected_cm)
}
