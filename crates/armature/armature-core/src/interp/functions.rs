//! Interpolation helpers:
//! - remap / lerp
//! - cubic bezier evaluation and the X -> Y inverse by bisection
//! - per-segment scalar interpolators (constant, linear, bezier)

use crate::config::BezierSolver;
use crate::keyframe::{Handle, HandleKind, Keyframe};

const ONE_THIRD: f32 = 1.0 / 3.0;
const TWO_THIRDS: f32 = 2.0 / 3.0;

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Map `input` from `[in_start, in_end]` onto `[out_start, out_end]`.
///
/// `clamp_input` clamps the input to its range first; `clamp_output` clamps
/// the result to the output range (either orientation).
pub fn remap(
    input: f64,
    in_start: f64,
    in_end: f64,
    out_start: f64,
    out_end: f64,
    clamp_input: bool,
    clamp_output: bool,
) -> f64 {
    let mut input = input;
    if clamp_input {
        let (lo, hi) = if in_end < in_start {
            (in_end, in_start)
        } else {
            (in_start, in_end)
        };
        input = input.clamp(lo, hi);
    }

    let mut ret = out_start + (input - in_start) * (out_end - out_start) / (in_end - in_start);

    if clamp_output {
        ret = if out_end < out_start {
            ret.clamp(out_end, out_start)
        } else {
            ret.clamp(out_start, out_end)
        };
    }
    ret
}

/// Cubic Bezier basis function
#[inline]
pub fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Point on the unit Bezier `(0,0) -> c1 -> c2 -> (1,1)` at parameter `u`.
#[inline]
pub fn cubic_bezier_point(c1: [f32; 2], c2: [f32; 2], u: f32) -> [f32; 2] {
    [
        cubic_bezier(0.0, c1[0], c2[0], 1.0, u),
        cubic_bezier(0.0, c1[1], c2[1], 1.0, u),
    ]
}

/// Y of the unit Bezier at the parameter whose X equals `target_x`.
///
/// Bisects the parameter in `[0, 1]`, returning as soon as X is within
/// `solver.epsilon`; otherwise the point at the last midpoint is used.
/// Assumes X is non-decreasing in the parameter, which holds while both
/// control X values lie in `[0, 1]`.
pub fn cubic_bezier_y_for_x(c1: [f32; 2], c2: [f32; 2], target_x: f32, solver: &BezierSolver) -> f32 {
    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let mut mid = 0.0f32;

    for _ in 0..solver.max_iterations {
        mid = 0.5 * (lo + hi);
        let [x, y] = cubic_bezier_point(c1, c2, mid);
        if (x - target_x).abs() < solver.epsilon {
            return y;
        }
        if x < target_x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    cubic_bezier_point(c1, c2, mid)[1]
}

/// Constant interpolation holds the *next* keyframe's value.
#[inline]
pub fn constant_value<V: Clone>(right: &Keyframe<V>) -> V {
    right.value.clone()
}

/// Linear remap of `time` between two scalar keyframes.
pub fn linear_value(time: f64, left: &Keyframe<f32>, right: &Keyframe<f32>) -> f32 {
    remap(
        time,
        left.time,
        right.time,
        left.value as f64,
        right.value as f64,
        true,
        false,
    ) as f32
}

/// Resolve one segment handle into the normalized (time, value) fraction space.
fn normalized_handle(
    handle: Option<&Handle<f32>>,
    left: &Keyframe<f32>,
    right: &Keyframe<f32>,
    auto: f32,
) -> [f32; 2] {
    match handle {
        Some(h) if h.kind == HandleKind::Free => {
            let span_t = right.time - left.time;
            let span_v = right.value - left.value;
            let x = if span_t > 0.0 {
                ((h.time - left.time) / span_t).clamp(0.0, 1.0) as f32
            } else {
                auto
            };
            let y = if span_v.abs() > f32::EPSILON {
                (h.value - left.value) / span_v
            } else {
                auto
            };
            [x, y]
        }
        _ => [auto, auto],
    }
}

/// Bezier segment: bisection on the normalized time, then remap the
/// resulting value fraction back into `[left.value, right.value]`.
pub fn bezier_value(
    time: f64,
    left: &Keyframe<f32>,
    right: &Keyframe<f32>,
    solver: &BezierSolver,
) -> f32 {
    let c1 = normalized_handle(left.right_handle.as_ref(), left, right, ONE_THIRD);
    let c2 = normalized_handle(right.left_handle.as_ref(), left, right, TWO_THIRDS);
    let target_x = remap(time, left.time, right.time, 0.0, 1.0, false, true) as f32;
    let factor = cubic_bezier_y_for_x(c1, c2, target_x, solver);
    lerp(left.value, right.value, factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    #[test]
    fn remap_basic_and_clamped() {
        assert_eq!(remap(5.0, 0.0, 10.0, 0.0, 1.0, false, false), 0.5);
        assert_eq!(remap(20.0, 0.0, 10.0, 0.0, 1.0, false, true), 1.0);
        assert_eq!(remap(-5.0, 0.0, 10.0, 0.0, 1.0, true, false), 0.0);
        // Inverted output range clamps the other way round.
        assert_eq!(remap(20.0, 0.0, 10.0, 1.0, 0.0, false, true), 0.0);
    }

    #[test]
    fn linear_control_points_are_identity() {
        let solver = BezierSolver::default();
        for i in 0..=10 {
            let x = i as f32 / 10.0;
            approx(
                cubic_bezier_y_for_x([ONE_THIRD, ONE_THIRD], [TWO_THIRDS, TWO_THIRDS], x, &solver),
                x,
                1e-4,
            );
        }
    }

    #[test]
    fn ease_in_is_below_diagonal() {
        let solver = BezierSolver::default();
        let y = cubic_bezier_y_for_x([0.8, 0.0], [0.9, 0.5], 0.25, &solver);
        assert!(y < 0.25, "y={y}");
    }

    #[test]
    fn zero_iterations_falls_back_to_start() {
        let solver = BezierSolver {
            max_iterations: 0,
            epsilon: 1e-5,
        };
        assert_eq!(cubic_bezier_y_for_x([0.3, 0.3], [0.6, 0.6], 0.5, &solver), 0.0);
    }

    #[test]
    fn free_handles_are_normalized_into_the_segment() {
        let solver = BezierSolver::default();
        // Handles placed on the straight line in curve space reproduce linear.
        let left = Keyframe::new(10.0, 100.0f32)
            .with_handles(None, Some(Handle::free(20.0, 200.0)));
        let right = Keyframe::new(40.0, 400.0f32)
            .with_handles(Some(Handle::free(30.0, 300.0)), None);
        approx(bezier_value(25.0, &left, &right, &solver), 250.0, 1e-2);
    }

    #[test]
    fn free_handle_time_outside_segment_is_clamped() {
        let solver = BezierSolver::default();
        let left = Keyframe::new(0.0, 0.0f32)
            .with_handles(None, Some(Handle::free(-5.0, 0.0)));
        let right = Keyframe::new(1.0, 1.0f32)
            .with_handles(Some(Handle::free(9.0, 1.0)), None);
        let v = bezier_value(0.5, &left, &right, &solver);
        assert!(v.is_finite());
        assert!((0.0..=1.0).contains(&v));
    }
}
