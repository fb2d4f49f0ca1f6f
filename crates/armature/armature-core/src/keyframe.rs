//! Keyframes and their tangent handles.

use serde::{Deserialize, Serialize};

/// Interpolation used for the segment that starts at a keyframe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpolation {
    /// Holds the next keyframe's value across the segment.
    Constant,
    Linear,
    #[default]
    Bezier,
}

/// Easing selection. Only `Automatic` has meaning today.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Automatic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Position is derived from the segment (linear-equivalent tangents).
    #[default]
    AutoClamped,
    /// Position is the stored `(time, value)`.
    Free,
}

/// A tangent control point in curve space (shares the keyframe's time axis).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Handle<V> {
    pub time: f64,
    pub value: V,
    pub kind: HandleKind,
}

impl<V> Handle<V> {
    pub fn free(time: f64, value: V) -> Self {
        Self {
            time,
            value,
            kind: HandleKind::Free,
        }
    }

    pub fn auto(time: f64, value: V) -> Self {
        Self {
            time,
            value,
            kind: HandleKind::AutoClamped,
        }
    }
}

/// A timed sample of `V`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: Deserialize<'de>"))]
pub struct Keyframe<V> {
    pub time: f64,
    pub value: V,
    #[serde(default)]
    pub left_handle: Option<Handle<V>>,
    #[serde(default)]
    pub right_handle: Option<Handle<V>>,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub easing: Easing,
}

impl<V: Clone> Keyframe<V> {
    /// Bezier keyframe with auto-clamped handles on both sides.
    pub fn new(time: f64, value: V) -> Self {
        Self {
            time,
            left_handle: Some(Handle::auto(time, value.clone())),
            right_handle: Some(Handle::auto(time, value.clone())),
            value,
            interpolation: Interpolation::Bezier,
            easing: Easing::Automatic,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_handles(mut self, left: Option<Handle<V>>, right: Option<Handle<V>>) -> Self {
        self.left_handle = left;
        self.right_handle = right;
        self
    }

    /// Copy with the time axis (keyframe and handle times) multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let scale_handle = |h: &Handle<V>| Handle {
            time: h.time * factor,
            value: h.value.clone(),
            kind: h.kind,
        };
        Self {
            time: self.time * factor,
            value: self.value.clone(),
            left_handle: self.left_handle.as_ref().map(scale_handle),
            right_handle: self.right_handle.as_ref().map(scale_handle),
            interpolation: self.interpolation,
            easing: self.easing,
        }
    }

    /// Move the keyframe in time, carrying free handles along.
    pub(crate) fn shift_to(&mut self, time: f64) {
        let delta = time - self.time;
        self.time = time;
        for handle in [self.left_handle.as_mut(), self.right_handle.as_mut()]
            .into_iter()
            .flatten()
        {
            handle.time += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_keyframe_defaults() {
        let kf = Keyframe::new(1.5, 3.0f32);
        assert_eq!(kf.interpolation, Interpolation::Bezier);
        assert_eq!(kf.easing, Easing::Automatic);
        assert_eq!(
            kf.left_handle.as_ref().map(|h| h.kind),
            Some(HandleKind::AutoClamped)
        );
        assert_eq!(
            kf.right_handle.as_ref().map(|h| h.kind),
            Some(HandleKind::AutoClamped)
        );
    }

    #[test]
    fn scaled_moves_handles_with_time() {
        let kf = Keyframe::new(2.0, 1.0f32).with_handles(
            Some(Handle::free(1.5, 0.5)),
            Some(Handle::free(2.5, 2.0)),
        );
        let s = kf.scaled(10.0);
        assert_eq!(s.time, 20.0);
        assert_eq!(s.left_handle.unwrap().time, 15.0);
        assert_eq!(s.right_handle.unwrap().time, 25.0);
        assert_eq!(s.value, 1.0);
    }

    #[test]
    fn shift_keeps_handle_offsets() {
        let mut kf = Keyframe::new(1.0, 0.0f32)
            .with_handles(Some(Handle::free(0.75, 0.0)), Some(Handle::free(1.25, 1.0)));
        kf.shift_to(3.0);
        assert_eq!(kf.time, 3.0);
        assert_eq!(kf.left_handle.unwrap().time, 2.75);
        assert_eq!(kf.right_handle.unwrap().time, 3.25);
    }
}
