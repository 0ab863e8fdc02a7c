//! # Route planning
//!
//! A route is the ordered sequence of legs the vehicle pilots through: a
//! line into each mark's entry point, an arc around the mark at the turning
//! radius, and finally a line home to the gate. Mark order and rotation
//! directions are supplied externally; this module only constructs the
//! geometry.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;

// Internal
use super::geom::{line_perpendicular, RotDir};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A circular waypoint the vehicle must round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mark {
    /// Centre of the mark, arena frame, centimetres.
    pub centre: Point2<f64>,

    /// Which way round the vehicle passes the mark.
    pub rot_dir: RotDir,

    /// Tangent point at which the vehicle joins the mark's circle.
    pub entry: Point2<f64>,

    /// Tangent point at which the vehicle leaves the mark's circle.
    pub exit: Point2<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// One segment of a planned route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Leg {
    /// A straight run between two points.
    Line {
        from: Point2<f64>,
        to: Point2<f64>,
    },

    /// An arc around a mark at the turning radius.
    Arc {
        from: Point2<f64>,
        to: Point2<f64>,
        centre: Point2<f64>,
        rot_dir: RotDir,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Leg {
    /// The point this leg ends at - the target the on-mark check runs
    /// against.
    pub fn to(&self) -> Point2<f64> {
        match *self {
            Leg::Line { to, .. } => to,
            Leg::Arc { to, .. } => to,
        }
    }

    /// The point this leg starts from.
    pub fn from(&self) -> Point2<f64> {
        match *self {
            Leg::Line { from, .. } => from,
            Leg::Arc { from, .. } => from,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the marks for a course from raw centres and rotation directions.
///
/// Each mark's entry point is the perpendicular tangent point of the line
/// arriving from the previous mark's centre (or the gate for the first
/// mark), and its exit the tangent point of the line departing towards the
/// next centre (or the gate for the last). Which of the two perpendicular
/// points is used depends on the rotation direction: clockwise takes the
/// left-hand point as entry and the right-hand as exit, counter-clockwise
/// the reverse. This selection, not the perpendicular construction, decides
/// which side of the mark the vehicle passes on.
pub fn build_marks(
    centres: &[Point2<f64>],
    rot_dirs: &[RotDir],
    gate: &Point2<f64>,
    turn_radius_cm: f64,
) -> Vec<Mark> {
    let mut marks = Vec::with_capacity(centres.len());

    for (i, centre) in centres.iter().enumerate() {
        let prev_centre = if i == 0 { *gate } else { centres[i - 1] };
        let next_centre = if i + 1 == centres.len() {
            *gate
        } else {
            centres[i + 1]
        };

        let rot_dir = rot_dirs.get(i).copied().unwrap_or(RotDir::Cw);

        let (entry_l, entry_r) = line_perpendicular(&prev_centre, centre, turn_radius_cm);
        let (exit_l, exit_r) = line_perpendicular(&next_centre, centre, turn_radius_cm);

        let (entry, exit) = match rot_dir {
            RotDir::Cw => (entry_l, exit_r),
            RotDir::Ccw => (entry_r, exit_l),
        };

        marks.push(Mark {
            centre: *centre,
            rot_dir,
            entry,
            exit,
        });
    }

    marks
}

/// Plan the route through the given marks, starting and ending at the gate.
///
/// For `N` marks the route always has `2*N + 1` legs: a line into each
/// mark's entry, an arc round the mark, and a closing line back to the
/// gate. Degenerate zero-length lines are kept - they complete on their
/// first on-mark evaluation rather than being pruned here.
pub fn plan_route(marks: &[Mark], gate: &Point2<f64>) -> Vec<Leg> {
    let mut legs = Vec::with_capacity(2 * marks.len() + 1);
    let mut prev_exit = *gate;

    for mark in marks {
        legs.push(Leg::Line {
            from: prev_exit,
            to: mark.entry,
        });
        legs.push(Leg::Arc {
            from: mark.entry,
            to: mark.exit,
            centre: mark.centre,
            rot_dir: mark.rot_dir,
        });

        prev_exit = mark.exit;
    }

    legs.push(Leg::Line {
        from: prev_exit,
        to: *gate,
    });

    legs
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::nav::geom::length_of_line;

    const TOL: f64 = 1e-9;

    fn plan(
        centres: &[Point2<f64>],
        rot_dirs: &[RotDir],
        gate: &Point2<f64>,
        radius: f64,
    ) -> Vec<Leg> {
        let marks = build_marks(centres, rot_dirs, gate, radius);
        plan_route(&marks, gate)
    }

    #[test]
    fn test_route_shape() {
        let gate = Point2::new(0.0, -100.0);

        for n in 1..=4 {
            let centres: Vec<_> = (0..n)
                .map(|i| Point2::new(100.0 * (i + 1) as f64, 50.0 * i as f64))
                .collect();
            let rot_dirs = vec![RotDir::Cw; n];

            let route = plan(&centres, &rot_dirs, &gate, 23.0);

            assert_eq!(route.len(), 2 * n + 1);
            assert_eq!(route.first().unwrap().from(), gate);
            assert_eq!(route.last().unwrap().to(), gate);
        }
    }

    #[test]
    fn test_single_cw_mark_scenario() {
        // The course used in bench trials: one mark due east-north-east of
        // the gate, rounded clockwise
        let gate = Point2::new(0.0, -100.0);
        let centre = Point2::new(100.0, 0.0);

        let route = plan(&[centre], &[RotDir::Cw], &gate, 23.0);

        assert_eq!(route.len(), 3);

        // Entry and exit both sit on the turning circle
        match route[1] {
            Leg::Arc {
                from,
                to,
                centre: c,
                rot_dir,
            } => {
                assert_eq!(rot_dir, RotDir::Cw);
                assert!((length_of_line(&from, &c) - 23.0).abs() < TOL);
                assert!((length_of_line(&to, &c) - 23.0).abs() < TOL);

                // Clockwise takes the left-hand perpendicular point as the
                // entry, the north-west side of the approach line
                assert!(from[0] < c[0]);
                assert!(from[1] > c[1]);
                assert!(to[0] > c[0]);
                assert!(to[1] < c[1]);
            }
            ref leg => panic!("expected an arc, found {:?}", leg),
        }

        // Legs chain: line into the entry, line home from the exit
        assert_eq!(route[0].to(), route[1].from());
        assert_eq!(route[1].to(), route[2].from());
    }

    #[test]
    fn test_ccw_swaps_sides() {
        let gate = Point2::new(0.0, -100.0);
        let centre = Point2::new(100.0, 0.0);

        let cw = plan(&[centre], &[RotDir::Cw], &gate, 23.0);
        let ccw = plan(&[centre], &[RotDir::Ccw], &gate, 23.0);

        // The CCW entry is the CW exit's side and vice versa
        match (cw[1], ccw[1]) {
            (
                Leg::Arc {
                    from: cw_entry,
                    to: cw_exit,
                    ..
                },
                Leg::Arc {
                    from: ccw_entry,
                    to: ccw_exit,
                    ..
                },
            ) => {
                assert!((length_of_line(&cw_entry, &ccw_exit)).abs() < TOL);
                assert!((length_of_line(&cw_exit, &ccw_entry)).abs() < TOL);
            }
            _ => panic!("expected arcs"),
        }
    }

    #[test]
    fn test_missing_rot_dirs_default_cw() {
        let gate = Point2::new(0.0, 0.0);
        let centres = [Point2::new(100.0, 0.0), Point2::new(200.0, 0.0)];

        // Only one direction supplied for two marks
        let marks = build_marks(&centres, &[RotDir::Ccw], &gate, 10.0);

        assert_eq!(marks[0].rot_dir, RotDir::Ccw);
        assert_eq!(marks[1].rot_dir, RotDir::Cw);
    }

    #[test]
    fn test_empty_course_is_gate_to_gate() {
        let gate = Point2::new(5.0, 5.0);
        let route = plan(&[], &[], &gate, 23.0);

        // A zero-length line is a valid route and completes immediately
        assert_eq!(route.len(), 1);
        assert_eq!(route[0].from(), gate);
        assert_eq!(route[0].to(), gate);
    }
}
