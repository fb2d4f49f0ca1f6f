//! Keyframe curves.
//!
//! `Curve<V>` keeps its keyframes sorted by time with at most one keyframe per
//! time. Evaluation clamps outside the keyed range and returns exact keyframe
//! values at keyed times; inside a segment it defers to `CurveValue`.
//!
//! Vector and color channels are parallel scalar curves (`Vec2Curve`,
//! `ColorCurve`) keyed together so their keyframe indices stay aligned.

use std::cmp::Ordering;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::BezierSolver;
use crate::error::{PoseError, Result};
use crate::interp::CurveValue;
use crate::keyframe::{Handle, Interpolation, Keyframe};
use crate::value::{Color, Vec2};

pub type ScalarCurve = Curve<f32>;
pub type StepCurve<T> = Curve<T>;

/// Reject non-finite times; clamp negative times to zero.
fn validate_time(time: f64) -> Result<f64> {
    if !time.is_finite() {
        return Err(PoseError::InvalidTime { time });
    }
    if time < 0.0 {
        warn!("keyframe time {time} is negative; clamping to 0");
        return Ok(0.0);
    }
    Ok(time)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Curve<V> {
    keyframes: Vec<Keyframe<V>>,
}

impl<V> Default for Curve<V> {
    fn default() -> Self {
        Self {
            keyframes: Vec::new(),
        }
    }
}

impl<V: CurveValue> Curve<V> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn keyframes(&self) -> &[Keyframe<V>] {
        &self.keyframes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keyframe<V>> {
        self.keyframes.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Keyframe<V>> {
        self.keyframes.get(index)
    }

    pub fn first(&self) -> Option<&Keyframe<V>> {
        self.keyframes.first()
    }

    pub fn last(&self) -> Option<&Keyframe<V>> {
        self.keyframes.last()
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.keyframes.iter().map(|k| k.time)
    }

    fn search(&self, time: f64) -> std::result::Result<usize, usize> {
        self.keyframes
            .binary_search_by(|k| k.time.partial_cmp(&time).unwrap_or(Ordering::Less))
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.keyframes.len() {
            Ok(())
        } else {
            Err(PoseError::KeyframeIndexOutOfRange {
                index,
                len: self.keyframes.len(),
            })
        }
    }

    /// Index of the keyframe exactly at `time`.
    pub fn find_index(&self, time: f64) -> Option<usize> {
        if time.is_nan() {
            return None;
        }
        self.search(time).ok()
    }

    /// Keyframe exactly at `time`.
    pub fn find(&self, time: f64) -> Option<&Keyframe<V>> {
        self.find_index(time).map(|i| &self.keyframes[i])
    }

    /// Key `value` at `time`. An existing keyframe at that time keeps its
    /// handles and interpolation and only takes the new value.
    pub fn insert(&mut self, time: f64, value: V) -> Result<usize> {
        let time = validate_time(time)?;
        match self.search(time) {
            Ok(i) => {
                self.keyframes[i].value = value;
                Ok(i)
            }
            Err(i) => {
                self.keyframes.insert(i, Keyframe::new(time, value));
                Ok(i)
            }
        }
    }

    /// Insert a fully specified keyframe, replacing any keyframe at its time.
    pub fn insert_keyframe(&mut self, mut keyframe: Keyframe<V>) -> Result<usize> {
        let time = validate_time(keyframe.time)?;
        if time != keyframe.time {
            keyframe.shift_to(time);
        }
        match self.search(time) {
            Ok(i) => {
                self.keyframes[i] = keyframe;
                Ok(i)
            }
            Err(i) => {
                self.keyframes.insert(i, keyframe);
                Ok(i)
            }
        }
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Keyframe<V>> {
        self.check_index(index)?;
        Ok(self.keyframes.remove(index))
    }

    /// Move a keyframe in time and restore ordering; returns its new index.
    /// A different keyframe already at `time` is replaced.
    pub fn set_keyframe_time(&mut self, index: usize, time: f64) -> Result<usize> {
        self.check_index(index)?;
        let time = validate_time(time)?;
        let mut keyframe = self.keyframes.remove(index);
        keyframe.shift_to(time);
        match self.search(time) {
            Ok(i) => {
                self.keyframes[i] = keyframe;
                Ok(i)
            }
            Err(i) => {
                self.keyframes.insert(i, keyframe);
                Ok(i)
            }
        }
    }

    pub fn set_keyframe_value(&mut self, index: usize, value: V) -> Result<()> {
        self.check_index(index)?;
        self.keyframes[index].value = value;
        Ok(())
    }

    pub fn set_interpolation(&mut self, index: usize, interpolation: Interpolation) -> Result<()> {
        self.check_index(index)?;
        self.keyframes[index].interpolation = interpolation;
        Ok(())
    }

    pub fn set_handles(
        &mut self,
        index: usize,
        left: Option<Handle<V>>,
        right: Option<Handle<V>>,
    ) -> Result<()> {
        self.check_index(index)?;
        let keyframe = &mut self.keyframes[index];
        keyframe.left_handle = left;
        keyframe.right_handle = right;
        Ok(())
    }

    /// Check that scaling by `factor` keeps every keyframe and handle time
    /// finite and the keyframe times strictly increasing.
    pub fn check_time_scale(&self, factor: f64) -> Result<()> {
        let invalid = || PoseError::InvalidTimeScale { factor };
        if !factor.is_finite() || factor <= 0.0 {
            return Err(invalid());
        }
        let mut previous: Option<f64> = None;
        for keyframe in &self.keyframes {
            let time = keyframe.time * factor;
            let handles_finite = [&keyframe.left_handle, &keyframe.right_handle]
                .into_iter()
                .flatten()
                .all(|h| (h.time * factor).is_finite());
            if !time.is_finite() || !handles_finite || previous.is_some_and(|p| time <= p) {
                return Err(invalid());
            }
            previous = Some(time);
        }
        Ok(())
    }

    /// Multiply every keyframe (and handle) time by `factor`. Leaves the
    /// curve untouched when the scaled times would overflow or collide.
    pub fn scale_time(&mut self, factor: f64) -> Result<()> {
        self.check_time_scale(factor)?;
        self.rescale(factor);
        Ok(())
    }

    fn rescale(&mut self, factor: f64) {
        for keyframe in &mut self.keyframes {
            *keyframe = keyframe.scaled(factor);
        }
    }

    /// Value at `time` with the default solver; `None` for an empty curve.
    pub fn value_at(&self, time: f64) -> Option<V> {
        self.value_at_with(time, &BezierSolver::default())
    }

    pub fn value_at_with(&self, time: f64, solver: &BezierSolver) -> Option<V> {
        let first = self.keyframes.first()?;
        if time.is_nan() || time <= first.time {
            return Some(first.value.clone());
        }
        let last = self.keyframes.last()?;
        if time >= last.time {
            return Some(last.value.clone());
        }

        match self.search(time) {
            Ok(i) => Some(self.keyframes[i].value.clone()),
            Err(i) => {
                // first.time < time < last.time, so 0 < i < len.
                let left = &self.keyframes[i - 1];
                let right = &self.keyframes[i];
                Some(V::interpolate(time, left, right, solver))
            }
        }
    }
}

/// Two parallel scalar curves keyed together.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2Curve {
    x: ScalarCurve,
    y: ScalarCurve,
}

impl Vec2Curve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(&self) -> &ScalarCurve {
        &self.x
    }

    pub fn y(&self) -> &ScalarCurve {
        &self.y
    }

    fn channels(&self) -> [&ScalarCurve; 2] {
        [&self.x, &self.y]
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    fn channels_mut(&mut self) -> [&mut ScalarCurve; 2] {
        [&mut self.x, &mut self.y]
    }

    pub fn insert(&mut self, time: f64, value: Vec2) -> Result<usize> {
        let index = self.x.insert(time, value.x)?;
        self.y.insert(time, value.y)?;
        Ok(index)
    }

    pub fn find_index(&self, time: f64) -> Option<usize> {
        self.x.find_index(time)
    }

    /// Keyed value at exactly `time`, if both channels carry a keyframe there.
    pub fn find(&self, time: f64) -> Option<Vec2> {
        let x = self.x.find(time)?;
        let y = self.y.find(time)?;
        Some(Vec2::new(x.value, y.value))
    }

    pub fn get(&self, index: usize) -> Option<(f64, Vec2)> {
        let x = self.x.get(index)?;
        let y = self.y.get(index)?;
        Some((x.time, Vec2::new(x.value, y.value)))
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.x.times()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.x.last().map(|k| k.time)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<()> {
        for curve in self.channels_mut() {
            curve.remove_at(index)?;
        }
        Ok(())
    }

    pub fn set_keyframe_time(&mut self, index: usize, time: f64) -> Result<usize> {
        let new_index = self.x.set_keyframe_time(index, time)?;
        self.y.set_keyframe_time(index, time)?;
        Ok(new_index)
    }

    pub fn set_keyframe_value(&mut self, index: usize, value: Vec2) -> Result<()> {
        self.x.set_keyframe_value(index, value.x)?;
        self.y.set_keyframe_value(index, value.y)
    }

    pub fn set_interpolation(&mut self, index: usize, interpolation: Interpolation) -> Result<()> {
        for curve in self.channels_mut() {
            curve.set_interpolation(index, interpolation)?;
        }
        Ok(())
    }

    pub fn check_time_scale(&self, factor: f64) -> Result<()> {
        self.channels()
            .into_iter()
            .try_for_each(|curve| curve.check_time_scale(factor))
    }

    /// Scale both channels, or neither.
    pub fn scale_time(&mut self, factor: f64) -> Result<()> {
        self.check_time_scale(factor)?;
        for curve in self.channels_mut() {
            curve.rescale(factor);
        }
        Ok(())
    }

    pub fn value_at_with(&self, time: f64, solver: &BezierSolver) -> Option<Vec2> {
        Some(Vec2::new(
            self.x.value_at_with(time, solver)?,
            self.y.value_at_with(time, solver)?,
        ))
    }

    pub fn value_at(&self, time: f64) -> Option<Vec2> {
        self.value_at_with(time, &BezierSolver::default())
    }
}

/// Four parallel percentage curves (0..=100 per channel).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorCurve {
    r: ScalarCurve,
    g: ScalarCurve,
    b: ScalarCurve,
    a: ScalarCurve,
}

impl ColorCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Red, green, blue and alpha percentage curves.
    pub fn channels(&self) -> [&ScalarCurve; 4] {
        [&self.r, &self.g, &self.b, &self.a]
    }

    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    fn channels_mut(&mut self) -> [&mut ScalarCurve; 4] {
        [&mut self.r, &mut self.g, &mut self.b, &mut self.a]
    }

    pub fn insert(&mut self, time: f64, color: Color) -> Result<usize> {
        let percent = color.to_percent();
        let mut index = 0;
        for (curve, p) in self.channels_mut().into_iter().zip(percent) {
            index = curve.insert(time, p)?;
        }
        Ok(index)
    }

    pub fn find_index(&self, time: f64) -> Option<usize> {
        self.r.find_index(time)
    }

    /// Keyed color at exactly `time`; all four channels must be keyed.
    pub fn find(&self, time: f64) -> Option<Color> {
        let mut percent = [0.0f32; 4];
        for (slot, curve) in percent.iter_mut().zip(self.channels()) {
            *slot = curve.find(time)?.value;
        }
        Some(Color::from_percent(percent))
    }

    pub fn get(&self, index: usize) -> Option<(f64, Color)> {
        let mut percent = [0.0f32; 4];
        let mut time = 0.0;
        for (slot, curve) in percent.iter_mut().zip(self.channels()) {
            let keyframe = curve.get(index)?;
            time = keyframe.time;
            *slot = keyframe.value;
        }
        Some((time, Color::from_percent(percent)))
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.r.times()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.r.last().map(|k| k.time)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<()> {
        for curve in self.channels_mut() {
            curve.remove_at(index)?;
        }
        Ok(())
    }

    pub fn set_keyframe_time(&mut self, index: usize, time: f64) -> Result<usize> {
        let mut new_index = index;
        for curve in self.channels_mut() {
            new_index = curve.set_keyframe_time(index, time)?;
        }
        Ok(new_index)
    }

    pub fn set_keyframe_value(&mut self, index: usize, color: Color) -> Result<()> {
        let percent = color.to_percent();
        for (curve, p) in self.channels_mut().into_iter().zip(percent) {
            curve.set_keyframe_value(index, p)?;
        }
        Ok(())
    }

    pub fn set_interpolation(&mut self, index: usize, interpolation: Interpolation) -> Result<()> {
        for curve in self.channels_mut() {
            curve.set_interpolation(index, interpolation)?;
        }
        Ok(())
    }

    pub fn check_time_scale(&self, factor: f64) -> Result<()> {
        self.channels()
            .into_iter()
            .try_for_each(|curve| curve.check_time_scale(factor))
    }

    pub fn scale_time(&mut self, factor: f64) -> Result<()> {
        self.check_time_scale(factor)?;
        for curve in self.channels_mut() {
            curve.rescale(factor);
        }
        Ok(())
    }

    pub fn value_at_with(&self, time: f64, solver: &BezierSolver) -> Option<Color> {
        let mut percent = [0.0f32; 4];
        for (slot, curve) in percent.iter_mut().zip(self.channels()) {
            *slot = curve.value_at_with(time, solver)?;
        }
        Some(Color::from_percent(percent))
    }

    pub fn value_at(&self, time: f64) -> Option<Color> {
        self.value_at_with(time, &BezierSolver::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(keys: &[(f64, f32)]) -> ScalarCurve {
        let mut curve = ScalarCurve::new();
        for &(t, v) in keys {
            let i = curve.insert(t, v).unwrap();
            curve.set_interpolation(i, Interpolation::Linear).unwrap();
        }
        curve
    }

    #[test]
    fn empty_curve_has_no_value() {
        let curve = ScalarCurve::new();
        assert_eq!(curve.value_at(0.5), None);
        assert!(curve.last().is_none());
    }

    #[test]
    fn insertion_keeps_order() {
        let curve = linear(&[(2.0, 2.0), (0.0, 0.0), (1.0, 1.0)]);
        let times: Vec<f64> = curve.times().collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn insert_at_occupied_time_overwrites_value() {
        let mut curve = linear(&[(0.0, 0.0), (1.0, 10.0)]);
        let i = curve.insert(1.0, 20.0).unwrap();
        assert_eq!(i, 1);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.get(1).unwrap().value, 20.0);
        // Interpolation set earlier survives the overwrite.
        assert_eq!(curve.get(1).unwrap().interpolation, Interpolation::Linear);
    }

    #[test]
    fn linear_midpoint() {
        let curve = linear(&[(0.0, 0.0), (1.0, 10.0)]);
        assert_eq!(curve.value_at(0.5), Some(5.0));
    }

    #[test]
    fn constant_holds_next_value() {
        let mut curve = linear(&[(0.0, 0.0), (1.0, 10.0)]);
        curve.set_interpolation(0, Interpolation::Constant).unwrap();
        assert_eq!(curve.value_at(0.5), Some(10.0));
    }

    #[test]
    fn nan_time_is_rejected_on_insert_and_clamped_on_eval() {
        let mut curve = linear(&[(0.0, 1.0), (1.0, 2.0)]);
        assert!(matches!(
            curve.insert(f64::NAN, 3.0),
            Err(PoseError::InvalidTime { .. })
        ));
        assert!(matches!(
            curve.insert(f64::INFINITY, 3.0),
            Err(PoseError::InvalidTime { .. })
        ));
        assert_eq!(curve.value_at(f64::NAN), Some(1.0));
    }

    #[test]
    fn negative_time_is_clamped_to_zero() {
        let mut curve = ScalarCurve::new();
        curve.insert(-2.0, 4.0).unwrap();
        assert_eq!(curve.first().unwrap().time, 0.0);
    }

    #[test]
    fn moving_a_keyframe_resorts_and_replaces_collisions() {
        let mut curve = linear(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        let i = curve.set_keyframe_time(0, 3.0).unwrap();
        assert_eq!(i, 2);
        assert_eq!(curve.times().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);

        let i = curve.set_keyframe_time(2, 1.0).unwrap();
        assert_eq!(i, 0);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.get(0).unwrap().value, 0.0);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let mut curve = linear(&[(0.0, 0.0)]);
        assert_eq!(
            curve.remove_at(4),
            Err(PoseError::KeyframeIndexOutOfRange { index: 4, len: 1 })
        );
    }

    #[test]
    fn step_curve_holds_left_unless_constant() {
        let mut curve: StepCurve<Option<String>> = StepCurve::new();
        curve.insert(0.0, Some("open".into())).unwrap();
        curve.insert(1.0, Some("closed".into())).unwrap();
        assert_eq!(curve.value_at(0.5), Some(Some("open".into())));
        curve.set_interpolation(0, Interpolation::Constant).unwrap();
        assert_eq!(curve.value_at(0.5), Some(Some("closed".into())));
        assert_eq!(curve.value_at(1.0), Some(Some("closed".into())));
    }

    #[test]
    fn vec2_curve_keys_both_channels() {
        let mut curve = Vec2Curve::new();
        curve.insert(0.0, Vec2::new(0.0, 10.0)).unwrap();
        curve.insert(2.0, Vec2::new(4.0, 30.0)).unwrap();
        curve.set_interpolation(0, Interpolation::Linear).unwrap();
        assert_eq!(curve.find(2.0), Some(Vec2::new(4.0, 30.0)));
        assert_eq!(curve.value_at(1.0), Some(Vec2::new(2.0, 20.0)));
        assert_eq!(curve.last_time(), Some(2.0));
    }

    #[test]
    fn time_scale_that_overflows_is_rejected() {
        let mut curve = linear(&[(0.0, 0.0), (10.0, 1.0)]);
        let before = curve.clone();
        assert_eq!(
            curve.scale_time(1e308),
            Err(PoseError::InvalidTimeScale { factor: 1e308 })
        );
        assert_eq!(curve, before);
    }

    #[test]
    fn time_scale_that_collapses_keyframes_is_rejected() {
        // 1e-300 * 1e-30 underflows to 0 and would land on the first key.
        let mut curve = linear(&[(0.0, 0.0), (1e-300, 1.0)]);
        assert!(curve.scale_time(1e-30).is_err());
        assert_eq!(curve.times().collect::<Vec<_>>(), vec![0.0, 1e-300]);

        curve.scale_time(0.5).unwrap();
        assert_eq!(curve.times().collect::<Vec<_>>(), vec![0.0, 1e-300 / 2.0]);
    }

    #[test]
    fn vec2_curve_scales_both_channels_or_neither() {
        let mut curve = Vec2Curve::new();
        curve.insert(4.0, Vec2::new(1.0, 2.0)).unwrap();
        assert!(curve.scale_time(f64::MAX).is_err());
        assert_eq!(curve.last_time(), Some(4.0));
        assert_eq!(curve.y().last().map(|k| k.time), Some(4.0));

        curve.scale_time(0.25).unwrap();
        assert_eq!(curve.x().last().map(|k| k.time), Some(1.0));
        assert_eq!(curve.y().last().map(|k| k.time), Some(1.0));
    }

    #[test]
    fn curve_serializes_with_handles_and_defaults() {
        let mut curve = linear(&[(0.0, 1.0), (2.0, 3.0)]);
        curve
            .set_handles(
                1,
                Some(Handle::free(1.5, 2.5)),
                Some(Handle::free(2.5, 3.5)),
            )
            .unwrap();
        let json = serde_json::to_string(&curve).unwrap();
        let back: ScalarCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(back, curve);

        // Optional keyframe fields fall back to their defaults.
        let sparse: ScalarCurve =
            serde_json::from_str(r#"{ "keyframes": [ { "time": 1.0, "value": 4.0 } ] }"#)
                .unwrap();
        let key = sparse.first().unwrap();
        assert_eq!(key.interpolation, Interpolation::Bezier);
        assert!(key.left_handle.is_none());
        assert_eq!(sparse.value_at(3.0), Some(4.0));
    }

    #[test]
    fn color_curve_round_trips_keyed_colors() {
        let mut curve = ColorCurve::new();
        let c = Color::rgba(12, 200, 77, 255);
        curve.insert(0.5, c).unwrap();
        assert_eq!(curve.find(0.5), Some(c));
        assert_eq!(curve.value_at(9.0), Some(c));
        assert_eq!(curve.get(0), Some((0.5, c)));
    }
}
