//! Per-hit kinematic derivation.

/// Spherical coordinates derived from a Cartesian hit position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCoords {
    /// Radial distance from the origin.
    pub r: f32,
    /// Polar angle, zero for a hit at the origin.
    pub theta: f32,
    /// Azimuthal angle in (-pi, pi].
    pub phi: f32,
}

/// Derives spherical coordinates from a Cartesian position.
///
/// `theta = acos(z / r)` with `theta = 0` when `r == 0`, so a hit at the
/// origin never produces a NaN. `phi = atan2(y, x)`, which is 0 at the
/// origin by the `atan2` convention.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn spherical_from_cartesian(x: f32, y: f32, z: f32) -> SphericalCoords {
    let (xd, yd, zd) = (f64::from(x), f64::from(y), f64::from(z));
    let r = (xd * xd + yd * yd + zd * zd).sqrt();
    let theta = if r == 0.0 { 0.0 } else { (zd / r).acos() };
    let phi = yd.atan2(xd);

    SphericalCoords {
        r: r as f32,
        theta: theta as f32,
        phi: phi as f32,
    }
}
