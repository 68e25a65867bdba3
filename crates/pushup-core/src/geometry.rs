//! Planar geometry for joint-angle features.

use nalgebra::Vector2;

use crate::types::Position2D;

/// Rays shorter than this (in pixels) have no defined direction
pub const DEGENERATE_RAY_PX: f64 = 1e-9;

/// Interior angle at `mid` formed by the rays `mid -> a` and `mid -> b`, in degrees.
///
/// Computed as the difference of the two ray headings and folded into
/// [0, 180], so the result is symmetric in `a` and `b`. Three collinear points
/// with `mid` between the others give 180.
///
/// If either ray is degenerate (`a` or `b` coincides with `mid`) the angle is
/// undefined and 0 is returned.
pub fn angle_between(a: &Position2D, mid: &Position2D, b: &Position2D) -> f64 {
    let ray_a: Vector2<f64> = a.to_nalgebra() - mid.to_nalgebra();
    let ray_b: Vector2<f64> = b.to_nalgebra() - mid.to_nalgebra();

    if ray_a.norm() < DEGENERATE_RAY_PX || ray_b.norm() < DEGENERATE_RAY_PX {
        return 0.0;
    }

    let radians = ray_b.y.atan2(ray_b.x) - ray_a.y.atan2(ray_a.x);
    let degrees = radians.abs().to_degrees();

    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}
