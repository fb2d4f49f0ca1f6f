//! Segment interpolation.
//!
//! `CurveValue` picks the interpolator per value family at compile time:
//! scalars support constant, linear and bezier segments; step values only
//! distinguish constant (take the next value) from everything else (hold).

pub mod functions;

use crate::config::BezierSolver;
use crate::keyframe::{Interpolation, Keyframe};

/// A value that can be stored in a `Curve` and evaluated between keyframes.
pub trait CurveValue: Clone + PartialEq {
    /// Value strictly inside the segment `left.time <= time < right.time`.
    /// The segment's mode comes from `left.interpolation`.
    fn interpolate(
        time: f64,
        left: &Keyframe<Self>,
        right: &Keyframe<Self>,
        solver: &BezierSolver,
    ) -> Self;
}

impl CurveValue for f32 {
    fn interpolate(
        time: f64,
        left: &Keyframe<Self>,
        right: &Keyframe<Self>,
        solver: &BezierSolver,
    ) -> Self {
        match left.interpolation {
            Interpolation::Constant => functions::constant_value(right),
            Interpolation::Linear => functions::linear_value(time, left, right),
            Interpolation::Bezier => functions::bezier_value(time, left, right, solver),
        }
    }
}

/// Attachment selection (by name): a pure step function.
impl CurveValue for Option<String> {
    fn interpolate(
        _time: f64,
        left: &Keyframe<Self>,
        right: &Keyframe<Self>,
        _solver: &BezierSolver,
    ) -> Self {
        match left.interpolation {
            Interpolation::Constant => functions::constant_value(right),
            Interpolation::Linear | Interpolation::Bezier => left.value.clone(),
        }
    }
}
