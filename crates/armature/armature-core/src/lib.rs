//! Armature Core (engine-agnostic)
//!
//! 2D skeletal posing and keyframe animation. Curves store animatable values
//! over time, timelines bind curves to one property of a bone or slot, and an
//! `Animation` applies its timelines to a `Skeleton` for a playback time.
//! World transforms are composed lazily through the bone hierarchy, honoring
//! each bone's `TransformMode`.
//!
//! The crate draws nothing and loads no files; hosts build skeletons and
//! curves, call `Animation::apply` once per frame and read world transforms,
//! slot colors and active attachments back.

pub mod animation;
pub mod config;
pub mod curve;
pub mod error;
pub mod ids;
pub mod interp;
pub mod keyframe;
pub mod skeleton;
pub mod timeline;
pub mod transform;
pub mod value;

// Re-exports for hosts
pub use animation::{Animation, AnimationObserver};
pub use config::{BezierSolver, Config};
pub use curve::{ColorCurve, Curve, ScalarCurve, StepCurve, Vec2Curve};
pub use error::{PoseError, Result};
pub use ids::{BoneId, SlotId, Target};
pub use interp::CurveValue;
pub use keyframe::{Easing, Handle, HandleKind, Interpolation, Keyframe};
pub use skeleton::{Bone, BoneMut, Pose, SetupPose, Skeleton, Slot, SlotMut};
pub use timeline::{
    keyframe_state, AttachmentTimeline, Axis, CurveTimeline1, CurveTimeline2, KeyframeGroup,
    KeyframeState, KeyframeValue, Property, SlotColorTimeline, Timeline,
};
pub use transform::{TransformMode, Transformation};
pub use value::{Color, Vec2};
