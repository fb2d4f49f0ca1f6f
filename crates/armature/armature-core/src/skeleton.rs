//! Bone and slot hierarchy with lazily composed world transforms.
//!
//! The `Skeleton` owns every bone and slot in dense arenas. A bone refers to
//! its parent by id and keeps the ids of its children for invalidation
//! fan-out. Bones can only be attached to an existing parent, so the
//! hierarchy is acyclic by construction.
//!
//! Each bone caches its world transform. Writing any pose field clears the
//! cache of the bone and of its whole subtree; reading a world transform
//! recomputes the stale part of the chain from the nearest valid ancestor.
//! Because recomputation always validates a bone together with all of its
//! ancestors, an invalid bone never has a valid descendant.

use std::cell::Cell;

use hashbrown::HashMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{PoseError, Result};
use crate::ids::{BoneId, SlotId};
use crate::transform::{TransformMode, Transformation};
use crate::value::{Color, Vec2};

/// Current pose of a bone, stored as an offset from its setup pose.
///
/// Position, rotation and shear are added to the setup values; scale is
/// multiplied. `Pose::IDENTITY` therefore leaves the setup pose untouched.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    pub position: Vec2,
    /// Degrees.
    pub rotation: f32,
    pub scale: Vec2,
    /// Degrees per axis.
    pub shear: Vec2,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
        shear: Vec2::ZERO,
    };
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Authoring default of a bone.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupPose {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    pub shear: Vec2,
    pub transform_mode: TransformMode,
}

impl Default for SetupPose {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            shear: Vec2::ZERO,
            transform_mode: TransformMode::Normal,
        }
    }
}

impl SetupPose {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32) -> Self {
        self.scale = Vec2::new(x, y);
        self
    }

    pub fn with_shear(mut self, x: f32, y: f32) -> Self {
        self.shear = Vec2::new(x, y);
        self
    }

    pub fn with_mode(mut self, mode: TransformMode) -> Self {
        self.transform_mode = mode;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Bone {
    name: String,
    parent: Option<BoneId>,
    children: Vec<BoneId>,
    depth: usize,
    setup: SetupPose,
    pose: Pose,
    mode_override: Option<TransformMode>,
    can_pose: bool,
    world: Cell<Option<Transformation>>,
}

impl Bone {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<BoneId> {
        self.parent
    }

    pub fn children(&self) -> &[BoneId] {
        &self.children
    }

    /// Distance from the root (roots are at depth 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn setup(&self) -> &SetupPose {
        &self.setup
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn transform_mode_override(&self) -> Option<TransformMode> {
        self.mode_override
    }

    /// Mode used for composition: the override if set, else the setup mode.
    pub fn transform_mode(&self) -> TransformMode {
        if self.can_pose {
            self.mode_override.unwrap_or(self.setup.transform_mode)
        } else {
            self.setup.transform_mode
        }
    }

    pub fn can_pose(&self) -> bool {
        self.can_pose
    }

    /// Whether the cached world transform is up to date.
    pub fn is_world_valid(&self) -> bool {
        self.world.get().is_some()
    }

    /// Effective local pose: setup combined with the current offset.
    pub fn local(&self) -> SetupPose {
        let s = &self.setup;
        if !self.can_pose {
            return *s;
        }
        let p = &self.pose;
        SetupPose {
            position: s.position + p.position,
            rotation: s.rotation + p.rotation,
            scale: s.scale * p.scale,
            shear: s.shear + p.shear,
            transform_mode: self.transform_mode(),
        }
    }

    fn compose(&self, parent: Option<&Transformation>) -> Transformation {
        let local = self.local();
        Transformation::compose(
            local.position,
            local.rotation,
            local.scale,
            local.shear,
            local.transform_mode,
            parent,
        )
    }

    fn invalidate(&self) {
        self.world.set(None);
    }
}

/// A colored attachment point carried by a bone.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    name: String,
    bone: BoneId,
    setup_color: Color,
    color: Color,
    setup_attachment: Option<String>,
    attachment: Option<String>,
    attachments: Vec<String>,
}

impl Slot {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bone(&self) -> BoneId {
        self.bone
    }

    pub fn setup_color(&self) -> Color {
        self.setup_color
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn setup_attachment(&self) -> Option<&str> {
        self.setup_attachment.as_deref()
    }

    /// Name of the active attachment, if any.
    pub fn attachment(&self) -> Option<&str> {
        self.attachment.as_deref()
    }

    /// Registered attachment names, in registration order.
    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    pub fn has_attachment(&self, name: &str) -> bool {
        self.attachments.iter().any(|a| a == name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    config: Config,
    bones: Vec<Bone>,
    slots: Vec<Slot>,
    bone_names: HashMap<String, BoneId>,
    slot_names: HashMap<String, SlotId>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add a bone under `parent` (or as a root).
    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        parent: Option<BoneId>,
        setup: SetupPose,
    ) -> Result<BoneId> {
        let name = name.into();
        if self.bone_names.contains_key(&name) {
            return Err(PoseError::DuplicateBoneName(name));
        }
        let depth = match parent {
            Some(pid) => self.bone(pid)?.depth + 1,
            None => 0,
        };
        if depth > self.config.max_hierarchy_depth {
            return Err(PoseError::HierarchyTooDeep {
                bone: name,
                limit: self.config.max_hierarchy_depth,
            });
        }

        let id = BoneId(self.bones.len() as u32);
        if let Some(pid) = parent {
            self.bones[pid.index()].children.push(id);
        }
        debug!("add bone '{name}' as {id} (parent {parent:?}, depth {depth})");
        self.bone_names.insert(name.clone(), id);
        self.bones.push(Bone {
            name,
            parent,
            children: Vec::new(),
            depth,
            setup,
            pose: Pose::IDENTITY,
            mode_override: None,
            can_pose: true,
            world: Cell::new(None),
        });
        Ok(id)
    }

    /// Add a slot attached to `bone`, white and without attachments.
    pub fn add_slot(&mut self, name: impl Into<String>, bone: BoneId) -> Result<SlotId> {
        let name = name.into();
        self.bone(bone)?;
        if self.slot_names.contains_key(&name) {
            return Err(PoseError::DuplicateSlotName(name));
        }
        let id = SlotId(self.slots.len() as u32);
        debug!("add slot '{name}' as {id} on {bone}");
        self.slot_names.insert(name.clone(), id);
        self.slots.push(Slot {
            name,
            bone,
            setup_color: Color::WHITE,
            color: Color::WHITE,
            setup_attachment: None,
            attachment: None,
            attachments: Vec::new(),
        });
        Ok(id)
    }

    pub fn bone(&self, id: BoneId) -> Result<&Bone> {
        self.bones.get(id.index()).ok_or(PoseError::UnknownBone(id))
    }

    pub fn bone_mut(&mut self, id: BoneId) -> Result<BoneMut<'_>> {
        self.bone(id)?;
        Ok(BoneMut { skeleton: self, id })
    }

    pub fn slot(&self, id: SlotId) -> Result<&Slot> {
        self.slots.get(id.index()).ok_or(PoseError::UnknownSlot(id))
    }

    pub fn slot_mut(&mut self, id: SlotId) -> Result<SlotMut<'_>> {
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(PoseError::UnknownSlot(id))?;
        Ok(SlotMut { slot, id })
    }

    pub fn find_bone(&self, name: &str) -> Option<BoneId> {
        self.bone_names.get(name).copied()
    }

    pub fn find_slot(&self, name: &str) -> Option<SlotId> {
        self.slot_names.get(name).copied()
    }

    pub fn bones(&self) -> impl Iterator<Item = (BoneId, &Bone)> + '_ {
        self.bones
            .iter()
            .enumerate()
            .map(|(i, b)| (BoneId(i as u32), b))
    }

    pub fn slots(&self) -> impl Iterator<Item = (SlotId, &Slot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| (SlotId(i as u32), s))
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn parent(&self, id: BoneId) -> Result<Option<BoneId>> {
        Ok(self.bone(id)?.parent)
    }

    pub fn children(&self, id: BoneId) -> Result<&[BoneId]> {
        Ok(&self.bone(id)?.children)
    }

    /// World transform of `id`, recomputing stale ancestors first.
    pub fn world_transform(&self, id: BoneId) -> Result<Transformation> {
        let bone = self.bone(id)?;
        if let Some(world) = bone.world.get() {
            return Ok(world);
        }

        // Stale chain from `id` up to (excluding) the nearest valid ancestor.
        let mut chain = vec![id];
        let mut parent_world = None;
        let mut cursor = bone.parent;
        while let Some(pid) = cursor {
            let parent = &self.bones[pid.index()];
            if let Some(world) = parent.world.get() {
                parent_world = Some(world);
                break;
            }
            chain.push(pid);
            cursor = parent.parent;
        }

        trace!("recompose {} bone(s) for {id}", chain.len());
        let mut world = Transformation::IDENTITY;
        for bid in chain.into_iter().rev() {
            let bone = &self.bones[bid.index()];
            world = bone.compose(parent_world.as_ref());
            bone.world.set(Some(world));
            parent_world = Some(world);
        }
        Ok(world)
    }

    /// Clear the cached world transform of `id` and all of its descendants.
    pub fn invalidate_transform(&self, id: BoneId) -> Result<()> {
        self.bone(id)?;
        self.invalidate_subtree(id);
        Ok(())
    }

    fn invalidate_subtree(&self, id: BoneId) {
        let mut stack = vec![id];
        while let Some(bid) = stack.pop() {
            let bone = &self.bones[bid.index()];
            // Already stale: the whole subtree is stale too.
            if !bone.is_world_valid() {
                continue;
            }
            bone.invalidate();
            stack.extend_from_slice(&bone.children);
        }
    }

    /// Reset every bone's current pose and every slot to its setup state.
    pub fn reset_to_setup_pose(&mut self) {
        for bone in &mut self.bones {
            bone.pose = Pose::IDENTITY;
            bone.mode_override = None;
            bone.invalidate();
        }
        for slot in &mut self.slots {
            slot.color = slot.setup_color;
            slot.attachment = slot.setup_attachment.clone();
        }
    }
}

/// Mutable view of one bone. Every setter invalidates the bone's subtree;
/// setup setters also reset the bone to its setup pose.
pub struct BoneMut<'a> {
    skeleton: &'a mut Skeleton,
    id: BoneId,
}

impl BoneMut<'_> {
    pub fn id(&self) -> BoneId {
        self.id
    }

    pub fn bone(&self) -> &Bone {
        &self.skeleton.bones[self.id.index()]
    }

    fn edit(&mut self, f: impl FnOnce(&mut Bone)) -> &mut Self {
        f(&mut self.skeleton.bones[self.id.index()]);
        self.skeleton.invalidate_subtree(self.id);
        self
    }

    /// Setup edits also drop the current pose offsets and mode override, so
    /// the bone shows its new setup pose.
    fn edit_setup(&mut self, f: impl FnOnce(&mut SetupPose)) -> &mut Self {
        self.edit(|b| {
            f(&mut b.setup);
            b.pose = Pose::IDENTITY;
            b.mode_override = None;
        })
    }

    fn edit_pose(&mut self, f: impl FnOnce(&mut Pose)) -> &mut Self {
        self.edit(|b| f(&mut b.pose))
    }

    pub fn set_setup(&mut self, setup: SetupPose) -> &mut Self {
        self.edit_setup(|s| *s = setup)
    }

    pub fn set_setup_position(&mut self, position: Vec2) -> &mut Self {
        self.edit_setup(|s| s.position = position)
    }

    pub fn set_setup_position_x(&mut self, x: f32) -> &mut Self {
        self.edit_setup(|s| s.position.x = x)
    }

    pub fn set_setup_position_y(&mut self, y: f32) -> &mut Self {
        self.edit_setup(|s| s.position.y = y)
    }

    pub fn set_setup_rotation(&mut self, rotation: f32) -> &mut Self {
        self.edit_setup(|s| s.rotation = rotation)
    }

    pub fn set_setup_scale(&mut self, scale: Vec2) -> &mut Self {
        self.edit_setup(|s| s.scale = scale)
    }

    pub fn set_setup_scale_x(&mut self, x: f32) -> &mut Self {
        self.edit_setup(|s| s.scale.x = x)
    }

    pub fn set_setup_scale_y(&mut self, y: f32) -> &mut Self {
        self.edit_setup(|s| s.scale.y = y)
    }

    pub fn set_setup_shear(&mut self, shear: Vec2) -> &mut Self {
        self.edit_setup(|s| s.shear = shear)
    }

    pub fn set_setup_shear_x(&mut self, x: f32) -> &mut Self {
        self.edit_setup(|s| s.shear.x = x)
    }

    pub fn set_setup_shear_y(&mut self, y: f32) -> &mut Self {
        self.edit_setup(|s| s.shear.y = y)
    }

    pub fn set_setup_transform_mode(&mut self, mode: TransformMode) -> &mut Self {
        self.edit_setup(|s| s.transform_mode = mode)
    }

    pub fn set_pose(&mut self, pose: Pose) -> &mut Self {
        self.edit_pose(|p| *p = pose)
    }

    pub fn set_position(&mut self, position: Vec2) -> &mut Self {
        self.edit_pose(|p| p.position = position)
    }

    pub fn set_position_x(&mut self, x: f32) -> &mut Self {
        self.edit_pose(|p| p.position.x = x)
    }

    pub fn set_position_y(&mut self, y: f32) -> &mut Self {
        self.edit_pose(|p| p.position.y = y)
    }

    pub fn set_rotation(&mut self, rotation: f32) -> &mut Self {
        self.edit_pose(|p| p.rotation = rotation)
    }

    pub fn set_scale(&mut self, scale: Vec2) -> &mut Self {
        self.edit_pose(|p| p.scale = scale)
    }

    pub fn set_scale_x(&mut self, x: f32) -> &mut Self {
        self.edit_pose(|p| p.scale.x = x)
    }

    pub fn set_scale_y(&mut self, y: f32) -> &mut Self {
        self.edit_pose(|p| p.scale.y = y)
    }

    pub fn set_shear(&mut self, shear: Vec2) -> &mut Self {
        self.edit_pose(|p| p.shear = shear)
    }

    pub fn set_shear_x(&mut self, x: f32) -> &mut Self {
        self.edit_pose(|p| p.shear.x = x)
    }

    pub fn set_shear_y(&mut self, y: f32) -> &mut Self {
        self.edit_pose(|p| p.shear.y = y)
    }

    /// Override the setup transform mode for the current pose.
    pub fn set_transform_mode(&mut self, mode: TransformMode) -> &mut Self {
        self.edit(|b| b.mode_override = Some(mode))
    }

    pub fn clear_transform_mode(&mut self) -> &mut Self {
        self.edit(|b| b.mode_override = None)
    }

    pub fn reset_to_setup_pose(&mut self) -> &mut Self {
        self.edit(|b| {
            b.pose = Pose::IDENTITY;
            b.mode_override = None;
        })
    }

    /// When disabled, composition uses the setup pose only.
    pub fn set_can_pose(&mut self, can_pose: bool) -> &mut Self {
        self.edit(|b| b.can_pose = can_pose)
    }
}

/// Mutable view of one slot.
pub struct SlotMut<'a> {
    slot: &'a mut Slot,
    id: SlotId,
}

impl SlotMut<'_> {
    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn slot(&self) -> &Slot {
        self.slot
    }

    /// Register an attachment name. Registering a name twice is a no-op.
    pub fn add_attachment(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.slot.has_attachment(&name) {
            self.slot.attachments.push(name);
        }
        self
    }

    fn check_attachment(&self, name: Option<&str>) -> Result<Option<String>> {
        match name {
            None => Ok(None),
            Some(n) if self.slot.has_attachment(n) => Ok(Some(n.to_owned())),
            Some(n) => Err(PoseError::UnknownAttachment {
                slot: self.id,
                attachment: n.to_owned(),
            }),
        }
    }

    /// Set the setup attachment and make it the active one.
    pub fn set_setup_attachment(&mut self, name: Option<&str>) -> Result<&mut Self> {
        let name = self.check_attachment(name)?;
        self.slot.attachment = name.clone();
        self.slot.setup_attachment = name;
        Ok(self)
    }

    pub fn set_attachment(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.slot.attachment = self.check_attachment(name)?;
        Ok(self)
    }

    /// Set the setup color and make it the active one.
    pub fn set_setup_color(&mut self, color: Color) -> &mut Self {
        self.slot.setup_color = color;
        self.slot.color = color;
        self
    }

    pub fn set_color(&mut self, color: Color) -> &mut Self {
        self.slot.color = color;
        self
    }

    pub fn reset_color(&mut self) -> &mut Self {
        self.slot.color = self.slot.setup_color;
        self
    }

    pub fn reset_attachment(&mut self) -> &mut Self {
        self.slot.attachment = self.slot.setup_attachment.clone();
        self
    }

    pub fn reset_to_setup_pose(&mut self) -> &mut Self {
        self.reset_color().reset_attachment()
    }
}
