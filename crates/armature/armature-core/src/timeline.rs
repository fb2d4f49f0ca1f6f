//! Timelines bind curves to one animatable property of one target.
//!
//! `Timeline` is a closed enum: one variant per bone property and axis split,
//! plus the two slot properties. Each variant owns the curve family that fits
//! its value (`ScalarCurve`, `Vec2Curve`, `ColorCurve`, `StepCurve`), so
//! evaluation never branches on the value's runtime type.
//!
//! Bone timelines write the current pose, which is an offset from the setup
//! pose. An empty curve writes the neutral offset, leaving the setup value.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::config::BezierSolver;
use crate::curve::{ColorCurve, ScalarCurve, StepCurve, Vec2Curve};
use crate::error::{PoseError, Result};
use crate::ids::{BoneId, SlotId, Target};
use crate::keyframe::Interpolation;
use crate::skeleton::Skeleton;
use crate::value::{Color, Vec2};

/// Animatable property of a bone or slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    Rotation,
    Translation,
    Scale,
    Shear,
    SlotColor,
    SlotAttachment,
}

impl Property {
    pub fn name(&self) -> &'static str {
        match self {
            Property::Rotation => "rotation",
            Property::Translation => "translation",
            Property::Scale => "scale",
            Property::Shear => "shear",
            Property::SlotColor => "slot color",
            Property::SlotAttachment => "slot attachment",
        }
    }

    /// Whether the property can be split into separate X and Y timelines.
    pub fn has_axes(&self) -> bool {
        matches!(
            self,
            Property::Translation | Property::Scale | Property::Shear
        )
    }

    pub fn is_bone_property(&self) -> bool {
        !matches!(self, Property::SlotColor | Property::SlotAttachment)
    }

    /// Axis a timeline of this property is stored under. Single-channel
    /// properties always use `Axis::Both`.
    pub fn normalize_axis(&self, axis: Axis) -> Axis {
        if self.has_axes() {
            axis
        } else {
            Axis::Both
        }
    }

    /// Cosmetic color used by authoring tools.
    pub fn display_color(&self) -> Color {
        match self {
            Property::Rotation => Color::rgba(50, 255, 50, 255),
            Property::Translation => Color::rgba(50, 50, 255, 255),
            Property::Scale => Color::rgba(255, 50, 50, 255),
            Property::Shear => Color::rgba(255, 255, 70, 255),
            Property::SlotColor => Color::rgba(255, 95, 175, 255),
            Property::SlotAttachment => Color::gray(170),
        }
    }
}

/// Which components of a two-channel property a timeline drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[default]
    Both,
    X,
    Y,
}

/// Whether a target's live value matches an authored keyframe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyframeState {
    NotKeyframed,
    /// A keyframe exists but the live value has diverged from it.
    PendingKeyframe,
    Keyframed,
}

/// Classify a live value against the keyframe stored at the same time.
pub fn keyframe_state<V: PartialEq>(stored: Option<&V>, live: &V) -> KeyframeState {
    match stored {
        None => KeyframeState::NotKeyframed,
        Some(v) if v == live => KeyframeState::Keyframed,
        Some(_) => KeyframeState::PendingKeyframe,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum KeyframeValue {
    Scalar(f32),
    Vec2(Vec2),
    Color(Color),
    Attachment(Option<String>),
}

impl KeyframeValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            KeyframeValue::Scalar(_) => "scalar",
            KeyframeValue::Vec2(_) => "vec2",
            KeyframeValue::Color(_) => "color",
            KeyframeValue::Attachment(_) => "attachment",
        }
    }
}

/// One keyframe across all parallel curves of a timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyframeGroup {
    pub index: usize,
    pub time: f64,
    pub value: KeyframeValue,
}

/// Single-channel bone timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveTimeline1 {
    bone: BoneId,
    curve: ScalarCurve,
}

impl CurveTimeline1 {
    pub fn bone(&self) -> BoneId {
        self.bone
    }

    pub fn curve(&self) -> &ScalarCurve {
        &self.curve
    }
}

/// Two-channel bone timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveTimeline2 {
    bone: BoneId,
    curve: Vec2Curve,
}

impl CurveTimeline2 {
    pub fn bone(&self) -> BoneId {
        self.bone
    }

    pub fn curve(&self) -> &Vec2Curve {
        &self.curve
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotColorTimeline {
    slot: SlotId,
    curve: ColorCurve,
}

impl SlotColorTimeline {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn curve(&self) -> &ColorCurve {
        &self.curve
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttachmentTimeline {
    slot: SlotId,
    curve: StepCurve<Option<String>>,
}

impl AttachmentTimeline {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn curve(&self) -> &StepCurve<Option<String>> {
        &self.curve
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Timeline {
    Rotate(CurveTimeline1),
    Translate(CurveTimeline2),
    TranslateX(CurveTimeline1),
    TranslateY(CurveTimeline1),
    Scale(CurveTimeline2),
    ScaleX(CurveTimeline1),
    ScaleY(CurveTimeline1),
    Shear(CurveTimeline2),
    ShearX(CurveTimeline1),
    ShearY(CurveTimeline1),
    SlotColor(SlotColorTimeline),
    Attachment(AttachmentTimeline),
}

/// Borrowed view of a timeline's curve family.
enum Channels<'a> {
    Scalar(&'a ScalarCurve),
    Vec2(&'a Vec2Curve),
    Color(&'a ColorCurve),
    Step(&'a StepCurve<Option<String>>),
}

enum ChannelsMut<'a> {
    Scalar(&'a mut ScalarCurve),
    Vec2(&'a mut Vec2Curve),
    Color(&'a mut ColorCurve),
    Step(&'a mut StepCurve<Option<String>>),
}

impl ChannelsMut<'_> {
    fn kind_name(&self) -> &'static str {
        match self {
            ChannelsMut::Scalar(_) => "scalar",
            ChannelsMut::Vec2(_) => "vec2",
            ChannelsMut::Color(_) => "color",
            ChannelsMut::Step(_) => "attachment",
        }
    }
}

impl Timeline {
    /// Empty timeline for `property` on `target`.
    pub fn new(target: Target, property: Property, axis: Axis) -> Result<Self> {
        let axis = property.normalize_axis(axis);
        let mismatch = || PoseError::PropertyMismatch {
            property: property.name(),
            target: target.kind_name(),
        };
        let timeline = match target {
            Target::Bone(bone) => {
                let one = || CurveTimeline1 {
                    bone,
                    curve: ScalarCurve::new(),
                };
                let two = || CurveTimeline2 {
                    bone,
                    curve: Vec2Curve::new(),
                };
                match (property, axis) {
                    (Property::Rotation, _) => Timeline::Rotate(one()),
                    (Property::Translation, Axis::Both) => Timeline::Translate(two()),
                    (Property::Translation, Axis::X) => Timeline::TranslateX(one()),
                    (Property::Translation, Axis::Y) => Timeline::TranslateY(one()),
                    (Property::Scale, Axis::Both) => Timeline::Scale(two()),
                    (Property::Scale, Axis::X) => Timeline::ScaleX(one()),
                    (Property::Scale, Axis::Y) => Timeline::ScaleY(one()),
                    (Property::Shear, Axis::Both) => Timeline::Shear(two()),
                    (Property::Shear, Axis::X) => Timeline::ShearX(one()),
                    (Property::Shear, Axis::Y) => Timeline::ShearY(one()),
                    (Property::SlotColor | Property::SlotAttachment, _) => return Err(mismatch()),
                }
            }
            Target::Slot(slot) => match property {
                Property::SlotColor => Timeline::SlotColor(SlotColorTimeline {
                    slot,
                    curve: ColorCurve::new(),
                }),
                Property::SlotAttachment => Timeline::Attachment(AttachmentTimeline {
                    slot,
                    curve: StepCurve::new(),
                }),
                _ => return Err(mismatch()),
            },
        };
        Ok(timeline)
    }

    pub fn target(&self) -> Target {
        match self {
            Timeline::Rotate(t)
            | Timeline::TranslateX(t)
            | Timeline::TranslateY(t)
            | Timeline::ScaleX(t)
            | Timeline::ScaleY(t)
            | Timeline::ShearX(t)
            | Timeline::ShearY(t) => Target::Bone(t.bone),
            Timeline::Translate(t) | Timeline::Scale(t) | Timeline::Shear(t) => {
                Target::Bone(t.bone)
            }
            Timeline::SlotColor(t) => Target::Slot(t.slot),
            Timeline::Attachment(t) => Target::Slot(t.slot),
        }
    }

    pub fn property(&self) -> Property {
        match self {
            Timeline::Rotate(_) => Property::Rotation,
            Timeline::Translate(_) | Timeline::TranslateX(_) | Timeline::TranslateY(_) => {
                Property::Translation
            }
            Timeline::Scale(_) | Timeline::ScaleX(_) | Timeline::ScaleY(_) => Property::Scale,
            Timeline::Shear(_) | Timeline::ShearX(_) | Timeline::ShearY(_) => Property::Shear,
            Timeline::SlotColor(_) => Property::SlotColor,
            Timeline::Attachment(_) => Property::SlotAttachment,
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Timeline::TranslateX(_) | Timeline::ScaleX(_) | Timeline::ShearX(_) => Axis::X,
            Timeline::TranslateY(_) | Timeline::ScaleY(_) | Timeline::ShearY(_) => Axis::Y,
            _ => Axis::Both,
        }
    }

    /// Whether this drives a single axis of a two-channel property.
    pub fn is_separated(&self) -> bool {
        self.axis() != Axis::Both
    }

    /// Whether this timeline is the one identified by the given key.
    pub fn matches(&self, target: Target, property: Property, axis: Axis) -> bool {
        self.target() == target
            && self.property() == property
            && self.axis() == property.normalize_axis(axis)
    }

    pub fn display_color(&self) -> Color {
        self.property().display_color()
    }

    fn channels(&self) -> Channels<'_> {
        match self {
            Timeline::Rotate(t)
            | Timeline::TranslateX(t)
            | Timeline::TranslateY(t)
            | Timeline::ScaleX(t)
            | Timeline::ScaleY(t)
            | Timeline::ShearX(t)
            | Timeline::ShearY(t) => Channels::Scalar(&t.curve),
            Timeline::Translate(t) | Timeline::Scale(t) | Timeline::Shear(t) => {
                Channels::Vec2(&t.curve)
            }
            Timeline::SlotColor(t) => Channels::Color(&t.curve),
            Timeline::Attachment(t) => Channels::Step(&t.curve),
        }
    }

    fn channels_mut(&mut self) -> ChannelsMut<'_> {
        match self {
            Timeline::Rotate(t)
            | Timeline::TranslateX(t)
            | Timeline::TranslateY(t)
            | Timeline::ScaleX(t)
            | Timeline::ScaleY(t)
            | Timeline::ShearX(t)
            | Timeline::ShearY(t) => ChannelsMut::Scalar(&mut t.curve),
            Timeline::Translate(t) | Timeline::Scale(t) | Timeline::Shear(t) => {
                ChannelsMut::Vec2(&mut t.curve)
            }
            Timeline::SlotColor(t) => ChannelsMut::Color(&mut t.curve),
            Timeline::Attachment(t) => ChannelsMut::Step(&mut t.curve),
        }
    }

    pub fn len(&self) -> usize {
        match self.channels() {
            Channels::Scalar(c) => c.len(),
            Channels::Vec2(c) => c.len(),
            Channels::Color(c) => c.len(),
            Channels::Step(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time of the last keyframe; `None` when empty.
    pub fn max_time(&self) -> Option<f64> {
        match self.channels() {
            Channels::Scalar(c) => c.last().map(|k| k.time),
            Channels::Vec2(c) => c.last_time(),
            Channels::Color(c) => c.last_time(),
            Channels::Step(c) => c.last().map(|k| k.time),
        }
    }

    pub fn keyframe_times(&self) -> Vec<f64> {
        match self.channels() {
            Channels::Scalar(c) => c.times().collect(),
            Channels::Vec2(c) => c.times().collect(),
            Channels::Color(c) => c.times().collect(),
            Channels::Step(c) => c.times().collect(),
        }
    }

    pub fn keyframes(&self) -> Vec<KeyframeGroup> {
        let group = |index: usize, time: f64, value: KeyframeValue| KeyframeGroup { index, time, value };
        match self.channels() {
            Channels::Scalar(c) => c
                .iter()
                .enumerate()
                .map(|(i, k)| group(i, k.time, KeyframeValue::Scalar(k.value)))
                .collect(),
            Channels::Vec2(c) => (0..c.len())
                .filter_map(|i| c.get(i).map(|(t, v)| group(i, t, KeyframeValue::Vec2(v))))
                .collect(),
            Channels::Color(c) => (0..c.len())
                .filter_map(|i| c.get(i).map(|(t, v)| group(i, t, KeyframeValue::Color(v))))
                .collect(),
            Channels::Step(c) => c
                .iter()
                .enumerate()
                .map(|(i, k)| group(i, k.time, KeyframeValue::Attachment(k.value.clone())))
                .collect(),
        }
    }

    /// Value stored by the keyframe exactly at `time`.
    pub fn keyframe_value_at(&self, time: f64) -> Option<KeyframeValue> {
        match self.channels() {
            Channels::Scalar(c) => c.find(time).map(|k| KeyframeValue::Scalar(k.value)),
            Channels::Vec2(c) => c.find(time).map(KeyframeValue::Vec2),
            Channels::Color(c) => c.find(time).map(KeyframeValue::Color),
            Channels::Step(c) => c
                .find(time)
                .map(|k| KeyframeValue::Attachment(k.value.clone())),
        }
    }

    /// Curve value at `time`; `None` when the timeline is empty.
    pub fn value_at(&self, time: f64, solver: &BezierSolver) -> Option<KeyframeValue> {
        match self.channels() {
            Channels::Scalar(c) => c.value_at_with(time, solver).map(KeyframeValue::Scalar),
            Channels::Vec2(c) => c.value_at_with(time, solver).map(KeyframeValue::Vec2),
            Channels::Color(c) => c.value_at_with(time, solver).map(KeyframeValue::Color),
            Channels::Step(c) => c
                .value_at_with(time, solver)
                .map(KeyframeValue::Attachment),
        }
    }

    /// The target's live value for this timeline's property.
    pub fn live_value(&self, skeleton: &Skeleton) -> Result<KeyframeValue> {
        use KeyframeValue::Scalar;
        let value = match self {
            Timeline::Rotate(t) => Scalar(skeleton.bone(t.bone)?.pose().rotation),
            Timeline::Translate(t) => KeyframeValue::Vec2(skeleton.bone(t.bone)?.pose().position),
            Timeline::TranslateX(t) => Scalar(skeleton.bone(t.bone)?.pose().position.x),
            Timeline::TranslateY(t) => Scalar(skeleton.bone(t.bone)?.pose().position.y),
            Timeline::Scale(t) => KeyframeValue::Vec2(skeleton.bone(t.bone)?.pose().scale),
            Timeline::ScaleX(t) => Scalar(skeleton.bone(t.bone)?.pose().scale.x),
            Timeline::ScaleY(t) => Scalar(skeleton.bone(t.bone)?.pose().scale.y),
            Timeline::Shear(t) => KeyframeValue::Vec2(skeleton.bone(t.bone)?.pose().shear),
            Timeline::ShearX(t) => Scalar(skeleton.bone(t.bone)?.pose().shear.x),
            Timeline::ShearY(t) => Scalar(skeleton.bone(t.bone)?.pose().shear.y),
            Timeline::SlotColor(t) => KeyframeValue::Color(skeleton.slot(t.slot)?.color()),
            Timeline::Attachment(t) => {
                KeyframeValue::Attachment(skeleton.slot(t.slot)?.attachment().map(str::to_owned))
            }
        };
        Ok(value)
    }

    /// Evaluate at `time` and write the result onto the target.
    pub fn apply(&self, skeleton: &mut Skeleton, time: f64) -> Result<()> {
        let solver = skeleton.config().bezier;
        trace!(
            "apply {} {:?} on {:?} at {time}",
            self.property().name(),
            self.axis(),
            self.target()
        );
        let scalar = |c: &ScalarCurve, neutral: f32| c.value_at_with(time, &solver).unwrap_or(neutral);
        let vec2 = |c: &Vec2Curve, neutral: Vec2| c.value_at_with(time, &solver).unwrap_or(neutral);

        match self {
            Timeline::Rotate(t) => {
                skeleton.bone_mut(t.bone)?.set_rotation(scalar(&t.curve, 0.0));
            }
            Timeline::Translate(t) => {
                skeleton
                    .bone_mut(t.bone)?
                    .set_position(vec2(&t.curve, Vec2::ZERO));
            }
            Timeline::TranslateX(t) => {
                skeleton.bone_mut(t.bone)?.set_position_x(scalar(&t.curve, 0.0));
            }
            Timeline::TranslateY(t) => {
                skeleton.bone_mut(t.bone)?.set_position_y(scalar(&t.curve, 0.0));
            }
            Timeline::Scale(t) => {
                skeleton.bone_mut(t.bone)?.set_scale(vec2(&t.curve, Vec2::ONE));
            }
            Timeline::ScaleX(t) => {
                skeleton.bone_mut(t.bone)?.set_scale_x(scalar(&t.curve, 1.0));
            }
            Timeline::ScaleY(t) => {
                skeleton.bone_mut(t.bone)?.set_scale_y(scalar(&t.curve, 1.0));
            }
            Timeline::Shear(t) => {
                skeleton.bone_mut(t.bone)?.set_shear(vec2(&t.curve, Vec2::ZERO));
            }
            Timeline::ShearX(t) => {
                skeleton.bone_mut(t.bone)?.set_shear_x(scalar(&t.curve, 0.0));
            }
            Timeline::ShearY(t) => {
                skeleton.bone_mut(t.bone)?.set_shear_y(scalar(&t.curve, 0.0));
            }
            Timeline::SlotColor(t) => {
                let mut slot = skeleton.slot_mut(t.slot)?;
                match t.curve.value_at_with(time, &solver) {
                    Some(color) => slot.set_color(color),
                    None => slot.reset_color(),
                };
            }
            Timeline::Attachment(t) => {
                let mut slot = skeleton.slot_mut(t.slot)?;
                match t.curve.value_at_with(time, &solver) {
                    Some(name) => {
                        slot.set_attachment(name.as_deref())?;
                    }
                    None => {
                        slot.reset_attachment();
                    }
                }
            }
        }
        Ok(())
    }

    /// Compare the live value with the keyframe stored at `time`.
    pub fn keyframed_at(&self, skeleton: &Skeleton, time: f64) -> Result<KeyframeState> {
        let live = self.live_value(skeleton)?;
        Ok(keyframe_state(self.keyframe_value_at(time).as_ref(), &live))
    }

    /// Key `value` at `time`, overwriting the value of an existing keyframe.
    pub fn insert_keyframe(&mut self, time: f64, value: KeyframeValue) -> Result<usize> {
        match (self.channels_mut(), value) {
            (ChannelsMut::Scalar(c), KeyframeValue::Scalar(v)) => c.insert(time, v),
            (ChannelsMut::Vec2(c), KeyframeValue::Vec2(v)) => c.insert(time, v),
            (ChannelsMut::Color(c), KeyframeValue::Color(v)) => c.insert(time, v),
            (ChannelsMut::Step(c), KeyframeValue::Attachment(v)) => c.insert(time, v),
            (channels, value) => Err(PoseError::ValueKindMismatch {
                expected: channels.kind_name(),
                actual: value.kind_name(),
            }),
        }
    }

    /// Key the target's live value at `time`.
    pub fn key_current(&mut self, skeleton: &Skeleton, time: f64) -> Result<usize> {
        let live = self.live_value(skeleton)?;
        self.insert_keyframe(time, live)
    }

    /// Move keyframe `index` across all channels; returns its new index.
    pub fn set_keyframe_time(&mut self, index: usize, time: f64) -> Result<usize> {
        match self.channels_mut() {
            ChannelsMut::Scalar(c) => c.set_keyframe_time(index, time),
            ChannelsMut::Vec2(c) => c.set_keyframe_time(index, time),
            ChannelsMut::Color(c) => c.set_keyframe_time(index, time),
            ChannelsMut::Step(c) => c.set_keyframe_time(index, time),
        }
    }

    pub fn set_keyframe_value(&mut self, index: usize, value: KeyframeValue) -> Result<()> {
        match (self.channels_mut(), value) {
            (ChannelsMut::Scalar(c), KeyframeValue::Scalar(v)) => c.set_keyframe_value(index, v),
            (ChannelsMut::Vec2(c), KeyframeValue::Vec2(v)) => c.set_keyframe_value(index, v),
            (ChannelsMut::Color(c), KeyframeValue::Color(v)) => c.set_keyframe_value(index, v),
            (ChannelsMut::Step(c), KeyframeValue::Attachment(v)) => c.set_keyframe_value(index, v),
            (channels, value) => Err(PoseError::ValueKindMismatch {
                expected: channels.kind_name(),
                actual: value.kind_name(),
            }),
        }
    }

    pub fn set_interpolation(&mut self, index: usize, interpolation: Interpolation) -> Result<()> {
        match self.channels_mut() {
            ChannelsMut::Scalar(c) => c.set_interpolation(index, interpolation),
            ChannelsMut::Vec2(c) => c.set_interpolation(index, interpolation),
            ChannelsMut::Color(c) => c.set_interpolation(index, interpolation),
            ChannelsMut::Step(c) => c.set_interpolation(index, interpolation),
        }
    }

    pub fn remove_keyframe(&mut self, index: usize) -> Result<()> {
        match self.channels_mut() {
            ChannelsMut::Scalar(c) => c.remove_at(index).map(|_| ()),
            ChannelsMut::Vec2(c) => c.remove_at(index),
            ChannelsMut::Color(c) => c.remove_at(index),
            ChannelsMut::Step(c) => c.remove_at(index).map(|_| ()),
        }
    }

    pub fn check_time_scale(&self, factor: f64) -> Result<()> {
        match self.channels() {
            Channels::Scalar(c) => c.check_time_scale(factor),
            Channels::Vec2(c) => c.check_time_scale(factor),
            Channels::Color(c) => c.check_time_scale(factor),
            Channels::Step(c) => c.check_time_scale(factor),
        }
    }

    /// Multiply every keyframe time by `factor`; fails without changes when
    /// a scaled time would be non-finite or collide with its neighbour.
    pub fn scale_time(&mut self, factor: f64) -> Result<()> {
        match self.channels_mut() {
            ChannelsMut::Scalar(c) => c.scale_time(factor),
            ChannelsMut::Vec2(c) => c.scale_time(factor),
            ChannelsMut::Color(c) => c.scale_time(factor),
            ChannelsMut::Step(c) => c.scale_time(factor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::SetupPose;

    fn rig() -> (Skeleton, BoneId, SlotId) {
        let mut sk = Skeleton::new();
        let bone = sk.add_bone("arm", None, SetupPose::at(2.0, 0.0)).unwrap();
        let slot = sk.add_slot("hand", bone).unwrap();
        sk.slot_mut(slot)
            .unwrap()
            .add_attachment("open")
            .add_attachment("fist");
        (sk, bone, slot)
    }

    #[test]
    fn keyframe_state_table() {
        assert_eq!(keyframe_state(None, &1.0), KeyframeState::NotKeyframed);
        assert_eq!(keyframe_state(Some(&1.0), &1.0), KeyframeState::Keyframed);
        assert_eq!(
            keyframe_state(Some(&1.0), &2.0),
            KeyframeState::PendingKeyframe
        );
    }

    #[test]
    fn new_picks_variant_from_property_and_axis() {
        let bone = Target::Bone(BoneId(0));
        let tl = Timeline::new(bone, Property::Translation, Axis::X).unwrap();
        assert!(matches!(tl, Timeline::TranslateX(_)));
        assert!(tl.is_separated());

        // Rotation has a single channel whatever axis is asked for.
        let tl = Timeline::new(bone, Property::Rotation, Axis::Y).unwrap();
        assert_eq!(tl.axis(), Axis::Both);
        assert!(tl.matches(bone, Property::Rotation, Axis::X));

        assert_eq!(
            Timeline::new(bone, Property::SlotColor, Axis::Both),
            Err(PoseError::PropertyMismatch {
                property: "slot color",
                target: "bone"
            })
        );
        assert!(Timeline::new(Target::Slot(SlotId(0)), Property::Scale, Axis::Both).is_err());
    }

    #[test]
    fn wrong_value_kind_is_rejected() {
        let mut tl = Timeline::new(BoneId(0).into(), Property::Rotation, Axis::Both).unwrap();
        assert_eq!(
            tl.insert_keyframe(0.0, KeyframeValue::Vec2(Vec2::ONE)),
            Err(PoseError::ValueKindMismatch {
                expected: "scalar",
                actual: "vec2"
            })
        );
        assert!(tl.is_empty());
    }

    #[test]
    fn apply_writes_current_pose() {
        let (mut sk, bone, _) = rig();
        let mut tl = Timeline::new(bone.into(), Property::Translation, Axis::Both).unwrap();
        tl.insert_keyframe(0.0, KeyframeValue::Vec2(Vec2::new(0.0, 0.0)))
            .unwrap();
        tl.insert_keyframe(1.0, KeyframeValue::Vec2(Vec2::new(4.0, 8.0)))
            .unwrap();
        tl.apply(&mut sk, 1.0).unwrap();
        assert_eq!(sk.bone(bone).unwrap().pose().position, Vec2::new(4.0, 8.0));
        // Offset from setup x = 2.
        assert_eq!(sk.world_transform(bone).unwrap().x(), 6.0);
    }

    #[test]
    fn empty_timeline_resets_component() {
        let (mut sk, bone, _) = rig();
        sk.bone_mut(bone).unwrap().set_scale_x(3.0).set_rotation(20.0);
        Timeline::new(bone.into(), Property::Scale, Axis::X)
            .unwrap()
            .apply(&mut sk, 0.5)
            .unwrap();
        let pose = sk.bone(bone).unwrap().pose();
        assert_eq!(pose.scale.x, 1.0);
        assert_eq!(pose.rotation, 20.0);
    }

    #[test]
    fn keyframed_at_tracks_live_value() {
        let (mut sk, bone, _) = rig();
        let mut tl = Timeline::new(bone.into(), Property::Rotation, Axis::Both).unwrap();
        sk.bone_mut(bone).unwrap().set_rotation(30.0);
        assert_eq!(tl.keyframed_at(&sk, 1.0), Ok(KeyframeState::NotKeyframed));
        tl.key_current(&sk, 1.0).unwrap();
        assert_eq!(tl.keyframed_at(&sk, 1.0), Ok(KeyframeState::Keyframed));
        sk.bone_mut(bone).unwrap().set_rotation(31.0);
        assert_eq!(tl.keyframed_at(&sk, 1.0), Ok(KeyframeState::PendingKeyframe));
        assert_eq!(tl.keyframed_at(&sk, 0.5), Ok(KeyframeState::NotKeyframed));
    }

    #[test]
    fn slot_color_and_attachment() {
        let (mut sk, _, slot) = rig();
        let red = Color::rgba(255, 0, 0, 255);
        let mut color = Timeline::new(slot.into(), Property::SlotColor, Axis::Both).unwrap();
        color.insert_keyframe(0.0, KeyframeValue::Color(red)).unwrap();
        let mut att = Timeline::new(slot.into(), Property::SlotAttachment, Axis::Both).unwrap();
        att.insert_keyframe(0.0, KeyframeValue::Attachment(Some("open".into())))
            .unwrap();
        att.insert_keyframe(1.0, KeyframeValue::Attachment(Some("fist".into())))
            .unwrap();

        color.apply(&mut sk, 0.3).unwrap();
        att.apply(&mut sk, 0.3).unwrap();
        assert_eq!(sk.slot(slot).unwrap().color(), red);
        assert_eq!(sk.slot(slot).unwrap().attachment(), Some("open"));
        assert_eq!(color.keyframed_at(&sk, 0.0), Ok(KeyframeState::Keyframed));

        att.apply(&mut sk, 1.0).unwrap();
        assert_eq!(sk.slot(slot).unwrap().attachment(), Some("fist"));

        att.insert_keyframe(2.0, KeyframeValue::Attachment(Some("ghost".into())))
            .unwrap();
        assert!(matches!(
            att.apply(&mut sk, 2.0),
            Err(PoseError::UnknownAttachment { .. })
        ));
    }

    #[test]
    fn keyframe_groups_and_edits() {
        let mut tl = Timeline::new(BoneId(0).into(), Property::Shear, Axis::Both).unwrap();
        tl.insert_keyframe(2.0, KeyframeValue::Vec2(Vec2::new(1.0, 2.0)))
            .unwrap();
        tl.insert_keyframe(0.5, KeyframeValue::Vec2(Vec2::new(3.0, 4.0)))
            .unwrap();
        assert_eq!(tl.keyframe_times(), vec![0.5, 2.0]);
        assert_eq!(tl.max_time(), Some(2.0));

        let i = tl.set_keyframe_time(0, 3.0).unwrap();
        assert_eq!(i, 1);
        tl.set_keyframe_value(0, KeyframeValue::Vec2(Vec2::ZERO))
            .unwrap();
        assert_eq!(
            tl.keyframes(),
            vec![
                KeyframeGroup {
                    index: 0,
                    time: 2.0,
                    value: KeyframeValue::Vec2(Vec2::ZERO)
                },
                KeyframeGroup {
                    index: 1,
                    time: 3.0,
                    value: KeyframeValue::Vec2(Vec2::new(3.0, 4.0))
                },
            ]
        );
        tl.remove_keyframe(1).unwrap();
        assert_eq!(tl.len(), 1);
    }

    #[test]
    fn timelines_serialize_and_expose_curves_read_only() {
        let mut tl = Timeline::new(BoneId(4).into(), Property::Translation, Axis::Both).unwrap();
        tl.insert_keyframe(0.0, KeyframeValue::Vec2(Vec2::new(1.0, 2.0)))
            .unwrap();
        tl.insert_keyframe(1.5, KeyframeValue::Vec2(Vec2::new(-3.0, 0.5)))
            .unwrap();
        let json = serde_json::to_string(&tl).unwrap();
        let back: Timeline = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tl);

        let Timeline::Translate(inner) = &back else {
            panic!("expected a translate timeline, got {back:?}");
        };
        assert_eq!(inner.bone(), BoneId(4));
        assert_eq!(inner.curve().x().len(), inner.curve().y().len());
        assert_eq!(inner.curve().get(1), Some((1.5, Vec2::new(-3.0, 0.5))));
    }

    #[test]
    fn display_colors() {
        let tl = Timeline::new(BoneId(0).into(), Property::Rotation, Axis::Both).unwrap();
        assert_eq!(tl.display_color(), Color::rgba(50, 255, 50, 255));
        assert_eq!(
            Property::SlotAttachment.display_color(),
            Color::rgba(170, 170, 170, 255)
        );
    }
}
