//! Error types for pose and animation operations.

use crate::ids::{BoneId, SlotId, Target};

/// Errors raised by the skeleton, curve and timeline APIs.
///
/// Numeric degeneracy (near-singular parent matrices) is recovered locally
/// and never surfaces here. Evaluating an empty curve is not an error either.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PoseError {
    /// A bone id does not refer to a bone of this skeleton.
    #[error("Bone not found: {0}")]
    UnknownBone(BoneId),

    /// A slot id does not refer to a slot of this skeleton.
    #[error("Slot not found: {0}")]
    UnknownSlot(SlotId),

    #[error("Duplicate bone name: {0}")]
    DuplicateBoneName(String),

    #[error("Duplicate slot name: {0}")]
    DuplicateSlotName(String),

    /// Adding the bone would exceed `Config::max_hierarchy_depth`.
    #[error("Bone '{bone}' would exceed the hierarchy depth limit of {limit}")]
    HierarchyTooDeep { bone: String, limit: usize },

    /// The animation has no timeline for this property on the target.
    #[error("No {property} timeline for {target}")]
    UnknownTimeline {
        property: &'static str,
        target: Target,
    },

    #[error("Attachment '{attachment}' is not registered on slot {slot}")]
    UnknownAttachment { slot: SlotId, attachment: String },

    /// A keyframe value of the wrong kind was handed to a timeline.
    #[error("Value kind mismatch: expected {expected}, got {actual}")]
    ValueKindMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid time value: {time}")]
    InvalidTime { time: f64 },

    #[error("Invalid time scale factor: {factor}")]
    InvalidTimeScale { factor: f64 },

    #[error("Keyframe index {index} out of range (len {len})")]
    KeyframeIndexOutOfRange { index: usize, len: usize },

    /// The property cannot be animated on the given kind of target.
    #[error("Property {property} cannot target a {target}")]
    PropertyMismatch {
        property: &'static str,
        target: &'static str,
    },
}

impl PoseError {
    /// Coarse grouping used when reporting errors to a host.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownBone(_)
            | Self::UnknownSlot(_)
            | Self::UnknownTimeline { .. }
            | Self::UnknownAttachment { .. } => "target",
            Self::DuplicateBoneName(_)
            | Self::DuplicateSlotName(_)
            | Self::HierarchyTooDeep { .. }
            | Self::KeyframeIndexOutOfRange { .. } => "data",
            Self::ValueKindMismatch { .. }
            | Self::InvalidTime { .. }
            | Self::InvalidTimeScale { .. }
            | Self::PropertyMismatch { .. } => "validation",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PoseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(PoseError::UnknownBone(BoneId(3)).category(), "target");
        assert_eq!(
            PoseError::DuplicateBoneName("root".into()).category(),
            "data"
        );
        assert_eq!(
            PoseError::InvalidTime { time: f64::NAN }.category(),
            "validation"
        );
    }

    #[test]
    fn display_names_the_target() {
        let err = PoseError::UnknownSlot(SlotId(7));
        assert_eq!(err.to_string(), "Slot not found: slot#7");

        let err = PoseError::UnknownTimeline {
            property: "rotation",
            target: Target::Bone(BoneId(2)),
        };
        assert_eq!(err.to_string(), "No rotation timeline for bone#2");
        assert_eq!(err.category(), "target");
    }
}
