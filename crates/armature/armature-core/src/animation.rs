//! Named animation clips.
//!
//! An `Animation` owns its timelines and applies them to a skeleton for a
//! playback time. Combined-axis timelines are applied first and
//! separated-axis timelines second, each pass in list order, so a
//! `TranslateX` timeline overrides the X component written by a `Translate`
//! timeline on the same bone.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use log::debug;

use crate::error::{PoseError, Result};
use crate::ids::{BoneId, Target};
use crate::skeleton::Skeleton;
use crate::timeline::{Axis, KeyframeValue, Property, Timeline};

/// Receives change notifications from an `Animation`, typically an authoring
/// tool that needs to redraw or re-measure the clip. Observers are `Send +
/// Sync` so an `Animation` can be shared across threads behind an `Arc`.
pub trait AnimationObserver: Send + Sync {
    fn animation_changed(&mut self, animation: &str);
}

pub struct Animation {
    name: String,
    timelines: Vec<Timeline>,
    separated: HashMap<Property, HashSet<BoneId>>,
    observer: Option<Box<dyn AnimationObserver>>,
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("name", &self.name)
            .field("timelines", &self.timelines)
            .field("separated", &self.separated)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Animation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timelines: Vec::new(),
            separated: HashMap::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn AnimationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn set_observer(&mut self, observer: Option<Box<dyn AnimationObserver>>) {
        self.observer = observer;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn notify(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer.animation_changed(&self.name);
        }
    }

    pub fn timelines(&self) -> &[Timeline] {
        &self.timelines
    }

    fn position(&self, target: Target, property: Property, axis: Axis) -> Option<usize> {
        self.timelines
            .iter()
            .position(|t| t.matches(target, property, axis))
    }

    pub fn timeline(&self, target: Target, property: Property, axis: Axis) -> Option<&Timeline> {
        self.position(target, property, axis)
            .map(|i| &self.timelines[i])
    }

    pub fn timeline_mut(
        &mut self,
        target: Target,
        property: Property,
        axis: Axis,
    ) -> Option<&mut Timeline> {
        self.position(target, property, axis)
            .map(|i| &mut self.timelines[i])
    }

    /// Find the timeline for the key, creating an empty one if missing.
    /// The flag reports whether it was created.
    pub fn timeline_or_insert(
        &mut self,
        target: Target,
        property: Property,
        axis: Axis,
    ) -> Result<(&mut Timeline, bool)> {
        let (index, created) = match self.position(target, property, axis) {
            Some(i) => (i, false),
            None => {
                self.timelines.push(Timeline::new(target, property, axis)?);
                self.notify();
                (self.timelines.len() - 1, true)
            }
        };
        Ok((&mut self.timelines[index], created))
    }

    /// Add a timeline, replacing (and returning) one with the same key.
    pub fn push_timeline(&mut self, timeline: Timeline) -> Option<Timeline> {
        let existing = self.position(timeline.target(), timeline.property(), timeline.axis());
        let replaced = match existing {
            Some(i) => Some(std::mem::replace(&mut self.timelines[i], timeline)),
            None => {
                self.timelines.push(timeline);
                None
            }
        };
        self.notify();
        replaced
    }

    pub fn remove_timeline(
        &mut self,
        target: Target,
        property: Property,
        axis: Axis,
    ) -> Option<Timeline> {
        let removed = self
            .position(target, property, axis)
            .map(|i| self.timelines.remove(i));
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    /// Run `edit` on the timeline for the key. A missing timeline is built
    /// aside and only added once `edit` succeeds, so a failed edit leaves
    /// the clip as it was.
    fn edit_or_create<F>(
        &mut self,
        target: Target,
        property: Property,
        axis: Axis,
        edit: F,
    ) -> Result<usize>
    where
        F: FnOnce(&mut Timeline) -> Result<usize>,
    {
        if let Some(i) = self.position(target, property, axis) {
            let index = edit(&mut self.timelines[i])?;
            self.notify();
            return Ok(index);
        }
        let mut timeline = Timeline::new(target, property, axis)?;
        let index = edit(&mut timeline)?;
        self.timelines.push(timeline);
        // One notification for the new timeline, one for the edit.
        self.notify();
        self.notify();
        Ok(index)
    }

    /// Key `value` at `time`, creating the timeline if needed.
    pub fn insert_keyframe(
        &mut self,
        target: Target,
        property: Property,
        axis: Axis,
        time: f64,
        value: KeyframeValue,
    ) -> Result<usize> {
        self.edit_or_create(target, property, axis, |timeline| {
            timeline.insert_keyframe(time, value)
        })
    }

    /// Key the live value of the target at `time`.
    pub fn key_current(
        &mut self,
        skeleton: &Skeleton,
        target: Target,
        property: Property,
        axis: Axis,
        time: f64,
    ) -> Result<usize> {
        self.edit_or_create(target, property, axis, |timeline| {
            timeline.key_current(skeleton, time)
        })
    }

    fn existing_mut(
        &mut self,
        target: Target,
        property: Property,
        axis: Axis,
    ) -> Result<&mut Timeline> {
        self.timeline_mut(target, property, axis)
            .ok_or(PoseError::UnknownTimeline {
                property: property.name(),
                target,
            })
    }

    /// Move a keyframe of one timeline; returns its new index.
    pub fn set_keyframe_time(
        &mut self,
        target: Target,
        property: Property,
        axis: Axis,
        index: usize,
        time: f64,
    ) -> Result<usize> {
        let index = self
            .existing_mut(target, property, axis)?
            .set_keyframe_time(index, time)?;
        self.notify();
        Ok(index)
    }

    pub fn set_keyframe_value(
        &mut self,
        target: Target,
        property: Property,
        axis: Axis,
        index: usize,
        value: KeyframeValue,
    ) -> Result<()> {
        self.existing_mut(target, property, axis)?
            .set_keyframe_value(index, value)?;
        self.notify();
        Ok(())
    }

    /// Apply every timeline at `time`.
    pub fn apply(&self, skeleton: &mut Skeleton, time: f64) -> Result<()> {
        for timeline in self.timelines.iter().filter(|t| !t.is_separated()) {
            timeline.apply(skeleton, time)?;
        }
        for timeline in self.timelines.iter().filter(|t| t.is_separated()) {
            timeline.apply(skeleton, time)?;
        }
        Ok(())
    }

    /// Time of the latest keyframe across all timelines; 0 for an empty clip.
    pub fn max_time(&self) -> f64 {
        self.timelines
            .iter()
            .filter_map(Timeline::max_time)
            .fold(0.0, f64::max)
    }

    /// Sorted, deduplicated keyframe times across all timelines.
    pub fn keyframe_times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .timelines
            .iter()
            .flat_map(Timeline::keyframe_times)
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// Whether the bone's `property` is edited as separate X/Y timelines.
    pub fn has_separated_property(&self, bone: BoneId, property: Property) -> bool {
        self.separated
            .get(&property)
            .is_some_and(|bones| bones.contains(&bone))
    }

    pub fn set_separated_property(&mut self, bone: BoneId, property: Property, separated: bool) {
        let changed = if separated {
            self.separated.entry(property).or_default().insert(bone)
        } else {
            self.separated
                .get_mut(&property)
                .is_some_and(|bones| bones.remove(&bone))
        };
        if changed {
            self.notify();
        }
    }

    /// Bones driven by this clip, directly or through one of their slots,
    /// in first-seen order.
    pub fn affected_bones(&self, skeleton: &Skeleton) -> Result<Vec<BoneId>> {
        let mut seen = HashSet::new();
        let mut bones = Vec::new();
        for timeline in &self.timelines {
            let bone = match timeline.target() {
                Target::Bone(id) => skeleton.bone(id).map(|_| id)?,
                Target::Slot(id) => skeleton.slot(id)?.bone(),
            };
            if seen.insert(bone) {
                bones.push(bone);
            }
        }
        Ok(bones)
    }

    /// Multiply every keyframe time by `factor`, e.g. to convert frame
    /// numbers into seconds. Either every timeline is scaled or, when a
    /// scaled time would overflow or collide, none is.
    pub fn scale_time(&mut self, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(PoseError::InvalidTimeScale { factor });
        }
        for timeline in &self.timelines {
            timeline.check_time_scale(factor)?;
        }
        debug!("scale '{}' by {factor}", self.name);
        for timeline in &mut self.timelines {
            timeline.scale_time(factor)?;
        }
        self.notify();
        Ok(())
    }
}
