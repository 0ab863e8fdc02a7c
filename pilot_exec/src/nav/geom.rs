//! # Course geometry
//!
//! Pure, stateless functions over points in the arena frame: origin at the
//! arena centre, +y towards magnetic north, +x east, units of centimetres.
//!
//! Two views of direction are in play. A *heading* is compass convention -
//! degrees, 0 at north, clockwise positive. A *theta* is maths convention -
//! radians, 0 along +x, counter-clockwise positive. The conversion chain
//! vector -> slope -> angle -> theta -> heading is exact and round-trips,
//! with the quadrant derived from the signs of the vector components.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Point2, Vector2};

// Internal
use util::maths::rem_euclid;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const TAU: f64 = std::f64::consts::TAU;
const PI: f64 = std::f64::consts::PI;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Direction of rotation around a mark, viewed from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotDir {
    /// Clockwise - the vehicle keeps the mark to starboard.
    Cw,

    /// Counter-clockwise - the vehicle keeps the mark to port.
    Ccw,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Slope of a vector, `dy/dx`.
///
/// A vertical vector (`dx == 0`) maps to negative infinity, never NaN, so
/// the downstream `atan` still produces a usable angle.
pub fn slope_from_vector(dx: f64, dy: f64) -> f64 {
    if dx == 0.0 {
        f64::NEG_INFINITY
    } else {
        dy / dx
    }
}

/// Quadrant (1 to 4) of a vector from the signs of its components.
///
/// The boundaries use `>=`/`<` so that every vector, axes included, lands in
/// exactly one quadrant: +x is quadrant 1, +y quadrant 2, -x quadrant 3,
/// -y quadrant 4.
pub fn quad_from_vector(dx: f64, dy: f64) -> u8 {
    if dx > 0.0 && dy >= 0.0 {
        1
    } else if dx <= 0.0 && dy > 0.0 {
        2
    } else if dx < 0.0 && dy <= 0.0 {
        3
    } else {
        4
    }
}

/// Angle of a slope in radians, in `[-pi/2, pi/2]`.
pub fn angle_from_slope(slope: f64) -> f64 {
    slope.atan()
}

/// Lift a slope angle into a theta in `[0, 2pi)` using the vector's
/// quadrant.
pub fn theta_from_angle(angle: f64, dx: f64, dy: f64) -> f64 {
    match quad_from_vector(dx, dy) {
        1 => angle,
        2 | 3 => angle + PI,
        _ => angle + TAU,
    }
}

/// Compass heading of a theta: `(90 - degrees(theta)) mod 360`.
pub fn heading_from_theta(theta: f64) -> f64 {
    rem_euclid(90.0 - theta.to_degrees(), 360.0)
}

/// Theta of a compass heading, the exact inverse of [`heading_from_theta`].
pub fn theta_from_heading(heading: f64) -> f64 {
    rem_euclid((90.0 - heading).to_radians(), TAU)
}

/// Vector from `a` to `b`.
pub fn vector_of_line(a: &Point2<f64>, b: &Point2<f64>) -> Vector2<f64> {
    b - a
}

/// Euclidean length of the segment from `a` to `b`.
pub fn length_of_line(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    vector_of_line(a, b).norm()
}

/// Slope of the segment from `a` to `b`.
pub fn slope_of_line(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let v = vector_of_line(a, b);
    slope_from_vector(v[0], v[1])
}

/// Compass heading of the segment from `a` to `b`, via the full conversion
/// chain.
pub fn heading_of_line(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let v = vector_of_line(a, b);
    let angle = angle_from_slope(slope_from_vector(v[0], v[1]));
    heading_from_theta(theta_from_angle(angle, v[0], v[1]))
}

/// Theta of the point `p` relative to a circle centre, i.e. the angular
/// position of `p` on the circle.
pub fn theta_about_centre(centre: &Point2<f64>, p: &Point2<f64>) -> f64 {
    let v = vector_of_line(centre, p);
    let angle = angle_from_slope(slope_from_vector(v[0], v[1]));
    theta_from_angle(angle, v[0], v[1])
}

/// Dead reckoning: project `pos` forward by `distance` along `heading`.
///
/// A negative distance projects backwards.
pub fn reckon_line(pos: &Point2<f64>, heading_deg: f64, distance: f64) -> Point2<f64> {
    let theta = theta_from_heading(heading_deg);
    Point2::new(
        pos[0] + distance * theta.cos(),
        pos[1] + distance * theta.sin(),
    )
}

/// The two points on the line through `b` perpendicular to the segment
/// `ab`, each at distance `r` from `b`.
///
/// Returned as `(l, r)` where `l` is the left-hand point when facing from
/// `a` towards `b`.
pub fn line_perpendicular(
    a: &Point2<f64>,
    b: &Point2<f64>,
    r: f64,
) -> (Point2<f64>, Point2<f64>) {
    // Rotating the segment heading by -90 degrees points at the left-hand
    // side; the right-hand point is the same distance the other way.
    let perp_heading = rem_euclid(heading_of_line(a, b) - 90.0, 360.0);

    (
        reckon_line(b, perp_heading, r),
        reckon_line(b, perp_heading, -r),
    )
}

/// Angular sweep in radians from `tfrom` to `tto` going around in direction
/// `rdir`.
///
/// Equal angles yield the full circle, not zero: a mark whose entry and exit
/// coincide must still be rounded, never skipped.
pub fn length_of_arc_theta(tfrom: f64, tto: f64, rdir: RotDir) -> f64 {
    let sweep = match rdir {
        RotDir::Ccw => rem_euclid(tto - tfrom, TAU),
        RotDir::Cw => rem_euclid(tfrom - tto, TAU),
    };

    if sweep == 0.0 {
        TAU
    } else {
        sweep
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const TOL: f64 = 1e-9;

    /// Run the full conversion chain on a vector, returning
    /// (slope, angle, quad, theta, heading).
    fn chain(dx: f64, dy: f64) -> (f64, f64, u8, f64, f64) {
        let slope = slope_from_vector(dx, dy);
        let angle = angle_from_slope(slope);
        let quad = quad_from_vector(dx, dy);
        let theta = theta_from_angle(angle, dx, dy);
        let heading = heading_from_theta(theta);
        (slope, angle, quad, theta, heading)
    }

    #[test]
    fn test_literal_table() {
        // Seed values carried over from the arena survey notebook
        let (slope, angle, quad, theta, heading) = chain(4.0, 0.0);
        assert!((slope - 0.0).abs() < TOL);
        assert!((angle - 0.0).abs() < TOL);
        assert_eq!(quad, 1);
        assert!((theta - 0.0).abs() < TOL);
        assert!((heading - 90.0).abs() < TOL);

        let (slope, angle, quad, theta, heading) = chain(0.0, 4.0);
        assert_eq!(slope, f64::NEG_INFINITY);
        assert!((angle - (-1.571)).abs() < 1e-3);
        assert_eq!(quad, 2);
        assert!((theta - 1.571).abs() < 1e-3);
        assert!((heading - 0.0).abs() < 1e-3);

        let (slope, angle, quad, theta, heading) = chain(-4.0, -4.0);
        assert!((slope - 1.0).abs() < TOL);
        assert!((angle - 0.785).abs() < 1e-3);
        assert_eq!(quad, 3);
        assert!((theta - 3.927).abs() < 1e-3);
        assert!((heading - 225.0).abs() < 1e-3);
    }

    #[test]
    fn test_every_vector_has_one_quadrant() {
        // Axes and origin included
        assert_eq!(quad_from_vector(4.0, 0.0), 1);
        assert_eq!(quad_from_vector(0.0, 4.0), 2);
        assert_eq!(quad_from_vector(-4.0, 0.0), 3);
        assert_eq!(quad_from_vector(0.0, -4.0), 4);
        assert_eq!(quad_from_vector(4.0, 4.0), 1);
        assert_eq!(quad_from_vector(-4.0, 4.0), 2);
        assert_eq!(quad_from_vector(-4.0, -4.0), 3);
        assert_eq!(quad_from_vector(4.0, -4.0), 4);
    }

    #[test]
    fn test_heading_round_trip() {
        let mut heading = 0.0;
        while heading < 360.0 {
            let back = heading_from_theta(theta_from_heading(heading));
            assert!(
                (back - heading).abs() < 1e-9 || (back - heading).abs() > 360.0 - 1e-9,
                "round trip failed for heading {}",
                heading
            );
            heading += 0.25;
        }
    }

    #[test]
    fn test_theta_and_heading_agree_on_vectors() {
        // The quadrant derived from component signs and the one implied by
        // theta thresholds must agree for headings off the axes
        let cases = [
            (1.0, 1.0, 45.0),
            (-1.0, 1.0, 315.0),
            (-1.0, -1.0, 225.0),
            (1.0, -1.0, 135.0),
        ];

        for &(dx, dy, expected) in cases.iter() {
            let heading = heading_of_line(&Point2::new(0.0, 0.0), &Point2::new(dx, dy));
            assert!(
                (heading - expected).abs() < TOL,
                "vector ({}, {}) gave heading {}",
                dx,
                dy,
                heading
            );
        }
    }

    #[test]
    fn test_line_derivations() {
        let a = Point2::new(1.0, 1.0);
        let b = Point2::new(4.0, 5.0);

        assert!((length_of_line(&a, &b) - 5.0).abs() < TOL);
        assert!((slope_of_line(&a, &b) - 4.0 / 3.0).abs() < TOL);
    }

    #[test]
    fn test_reckon_line() {
        let pos = Point2::new(10.0, -20.0);

        // Due north
        let p = reckon_line(&pos, 0.0, 5.0);
        assert!((p[0] - 10.0).abs() < TOL);
        assert!((p[1] - -15.0).abs() < TOL);

        // Due east, backwards
        let p = reckon_line(&pos, 90.0, -5.0);
        assert!((p[0] - 5.0).abs() < TOL);
        assert!((p[1] - -20.0).abs() < TOL);
    }

    #[test]
    fn test_perpendicular_points() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        let r = 4.0;

        let (l, r_pt) = line_perpendicular(&a, &b, r);

        // Both points at distance r from b
        assert!((length_of_line(&l, &b) - r).abs() < TOL);
        assert!((length_of_line(&r_pt, &b) - r).abs() < TOL);

        // Facing east from a to b, left is north
        assert!((l[0] - 10.0).abs() < TOL);
        assert!((l[1] - 4.0).abs() < TOL);
        assert!((r_pt[0] - 10.0).abs() < TOL);
        assert!((r_pt[1] - -4.0).abs() < TOL);
    }

    #[test]
    fn test_perpendicular_slope_is_negative_reciprocal() {
        let a = Point2::new(1.0, 2.0);
        let b = Point2::new(7.0, 5.0);

        let (l, r_pt) = line_perpendicular(&a, &b, 3.0);

        let seg_slope = slope_of_line(&a, &b);
        let perp_slope = slope_of_line(&l, &r_pt);

        assert!((perp_slope - (-1.0 / seg_slope)).abs() < 1e-6);
    }

    #[test]
    fn test_arc_sweep_directions() {
        // Quarter circle CCW from east to north
        let sweep = length_of_arc_theta(0.0, PI / 2.0, RotDir::Ccw);
        assert!((sweep - PI / 2.0).abs() < TOL);

        // Going CW the same pair is three quarters
        let sweep = length_of_arc_theta(0.0, PI / 2.0, RotDir::Cw);
        assert!((sweep - 3.0 * PI / 2.0).abs() < TOL);
    }

    #[test]
    fn test_arc_sweep_full_circle_on_equality() {
        for &t in &[0.0, 1.0, PI, 5.5] {
            assert_eq!(length_of_arc_theta(t, t, RotDir::Ccw), TAU);
            assert_eq!(length_of_arc_theta(t, t, RotDir::Cw), TAU);
        }
    }
}
