//! Planar geometry helpers for RPS coordinates.
//!
//! Headings follow the RPS convention: degrees in `[0, 360)`, 0° along +X,
//! increasing counter-clockwise. Positions are in course units (inches).
//!
//! # Example
//! ```rust
//! use dwb_core::utils::math::geometry::heading_error;
//! assert!((heading_error(350.0, 10.0) - 20.0).abs() < 1e-4);
//! ```

/// Wrap any angle in degrees into `[0, 360)`.
pub fn normalize_degrees(angle: f32) -> f32 {
    let a = libm::fmodf(angle, 360.0);
    let a = if a < 0.0 { a + 360.0 } else { a };
    // -tiny + 360 rounds to 360 in f32
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Signed shortest rotation from `current` to `target`, in `(-180, 180]`.
///
/// Positive means counter-clockwise.
pub fn heading_error(
    current: f32,
    target: f32,
) -> f32 {
    let e = normalize_degrees(target - current);
    if e > 180.0 {
        e - 360.0
    } else {
        e
    }
}

/// Bearing from `(from_x, from_y)` to `(to_x, to_y)` in degrees, `[0, 360)`.
pub fn bearing_deg(
    from_x: f32,
    from_y: f32,
    to_x: f32,
    to_y: f32,
) -> f32 {
    let rad = libm::atan2f(to_y - from_y, to_x - from_x);
    normalize_degrees(rad.to_degrees())
}

/// Euclidean distance between two points.
pub fn distance(
    from_x: f32,
    from_y: f32,
    to_x: f32,
    to_y: f32,
) -> f32 {
    libm::hypotf(to_x - from_x, to_y - from_y)
}

/// Fraction of cruise speed to use with `remaining` of `initial` distance left.
///
/// The result never drops below `floor`, so the robot keeps moving until the
/// arrival check fires.
pub fn approach_ratio(
    remaining: f32,
    initial: f32,
    floor: f32,
) -> f32 {
    let floor = sanitize(floor, f32::EPSILON, 1.0, 1.0);
    if initial <= 0.0 {
        return 1.0;
    }
    sanitize(remaining / initial, floor, 1.0, 1.0)
}

/// Clamp `value` into `[min, max]`, replacing NaN and infinities with `default`.
pub fn sanitize(
    value: f32,
    min: f32,
    max: f32,
    default: f32,
) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(
        a: f32,
        b: f32,
    ) -> bool {
        libm::fabsf(a - b) < 1e-3
    }

    #[test]
    fn test_normalize_degrees() {
        assert!(close(normalize_degrees(370.0), 10.0));
        assert!(close(normalize_degrees(-10.0), 350.0));
        assert!(close(normalize_degrees(720.0), 0.0));
        assert!(normalize_degrees(-1e-9) < 360.0);
    }

    #[test]
    fn test_heading_error_wraps() {
        assert!(close(heading_error(350.0, 10.0), 20.0));
        assert!(close(heading_error(10.0, 350.0), -20.0));
        assert!(close(heading_error(90.0, 90.0), 0.0));
        assert!(close(heading_error(0.0, 180.0), 180.0));
        assert!(close(heading_error(270.0, 45.0), 135.0));
    }

    #[test]
    fn test_bearing_quadrants() {
        assert!(close(bearing_deg(0.0, 0.0, 1.0, 0.0), 0.0));
        assert!(close(bearing_deg(0.0, 0.0, 0.0, 1.0), 90.0));
        assert!(close(bearing_deg(0.0, 0.0, -1.0, 0.0), 180.0));
        // atan2(-1, -1) = -135°
        assert!(close(bearing_deg(1.0, 1.0, 0.0, 0.0), 225.0));
    }

    #[test]
    fn test_approach_ratio_half_distance() {
        assert!(close(approach_ratio(5.0, 10.0, 0.2), 0.5));
        assert!(close(approach_ratio(1.0, 10.0, 0.2), 0.2));
        assert!(close(approach_ratio(12.0, 10.0, 0.2), 1.0));
        assert!(close(approach_ratio(3.0, 0.0, 0.2), 1.0));
    }

    #[test]
    fn test_sanitize_rejects_nan() {
        assert_eq!(sanitize(f32::NAN, -1.0, 1.0, 0.0), 0.0);
        assert_eq!(sanitize(5.0, -1.0, 1.0, 0.0), 1.0);
    }
}
