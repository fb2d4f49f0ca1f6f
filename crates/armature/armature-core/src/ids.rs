//! Identifiers for skeleton nodes.
//!
//! Ids are dense indices into the owning `Skeleton`'s arenas. They are only
//! meaningful for the skeleton that issued them.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoneId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl BoneId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl SlotId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bone#{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// What a timeline writes to: a bone's pose or a slot's appearance.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Target {
    Bone(BoneId),
    Slot(SlotId),
}

impl Target {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Target::Bone(_) => "bone",
            Target::Slot(_) => "slot",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Bone(id) => id.fmt(f),
            Target::Slot(id) => id.fmt(f),
        }
    }
}

impl From<BoneId> for Target {
    fn from(id: BoneId) -> Self {
        Target::Bone(id)
    }
}

impl From<SlotId> for Target {
    fn from(id: SlotId) -> Self {
        Target::Slot(id)
    }
}
