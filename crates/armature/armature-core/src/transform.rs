//! World transform composition for 2D bones.
//!
//! A `Transformation` is a 2x2 matrix `[a b; c d]` plus translation `(x, y)`.
//! Angles are in degrees, counter-clockwise positive. The local matrix of a
//! bone is built from rotation + shear for each axis:
//!
//! ```text
//! a = cos(rot + shearX) * scaleX     b = cos(rot + 90 + shearY) * scaleY
//! c = sin(rot + shearX) * scaleX     d = sin(rot + 90 + shearY) * scaleY
//! ```
//!
//! How much of the parent's matrix a child inherits is selected by
//! `TransformMode`.

use std::f32::consts::FRAC_PI_2;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::value::Vec2;

/// Column-normalization threshold for `NoRotationOrReflection`.
const NO_ROTATION_EPSILON: f32 = 1e-4;
/// Length threshold below which the `NoScale*` parent axis is treated as zero.
const NO_SCALE_EPSILON: f32 = 1e-5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformMode {
    /// Inherit the full parent matrix.
    #[default]
    Normal,
    /// Follow the parent's position only.
    OnlyTranslation,
    /// Inherit parent scale and skew but not its rotation or reflection.
    NoRotationOrReflection,
    /// Inherit parent rotation and reflection but not its scale.
    NoScale,
    /// Inherit parent rotation but neither scale nor reflection.
    NoScaleOrReflection,
}

/// Immutable world transform. Recomputed, never mutated in place.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    x: f32,
    y: f32,
    // Authored local rotation and X shear, kept for the rotation conversions.
    rotation: f32,
    shear_x: f32,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[inline]
fn sin_cos_deg(deg: f32) -> (f32, f32) {
    deg.to_radians().sin_cos()
}

/// Local 2x2 block from rotation, scale and shear (degrees).
fn local_matrix(rot: f32, scale: Vec2, shear: Vec2) -> (f32, f32, f32, f32) {
    let (sin_x, cos_x) = sin_cos_deg(rot + shear.x);
    let (sin_y, cos_y) = sin_cos_deg(rot + 90.0 + shear.y);
    (cos_x * scale.x, cos_y * scale.y, sin_x * scale.x, sin_y * scale.y)
}

impl Transformation {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        shear_x: 0.0,
    };

    #[allow(clippy::too_many_arguments)]
    pub fn new(a: f32, b: f32, c: f32, d: f32, x: f32, y: f32, rotation: f32, shear_x: f32) -> Self {
        Self {
            a,
            b,
            c,
            d,
            x,
            y,
            rotation,
            shear_x,
        }
    }

    /// Compose a local pose with an optional parent world transform.
    pub fn compose(
        pos: Vec2,
        rot: f32,
        scale: Vec2,
        shear: Vec2,
        mode: TransformMode,
        parent: Option<&Transformation>,
    ) -> Self {
        let Some(parent) = parent else {
            let (a, b, c, d) = local_matrix(rot, scale, shear);
            return Self::new(a, b, c, d, pos.x, pos.y, rot, shear.x);
        };

        let (mut pa, mut pb, mut pc, mut pd) = (parent.a, parent.b, parent.c, parent.d);
        let x = pa * pos.x + pb * pos.y + parent.x;
        let y = pc * pos.x + pd * pos.y + parent.y;

        let (a, b, c, d) = match mode {
            TransformMode::Normal => {
                let (la, lb, lc, ld) = local_matrix(rot, scale, shear);
                (
                    pa * la + pb * lc,
                    pa * lb + pb * ld,
                    pc * la + pd * lc,
                    pc * lb + pd * ld,
                )
            }
            TransformMode::OnlyTranslation => local_matrix(rot, scale, shear),
            TransformMode::NoRotationOrReflection => {
                let mut s = pa * pa + pc * pc;
                let parent_rot;
                if s > NO_ROTATION_EPSILON {
                    s = (pa * pd - pb * pc).abs() / s;
                    pb = pc * s;
                    pd = pa * s;
                    parent_rot = pc.atan2(pa).to_degrees();
                } else {
                    trace!("degenerate parent X axis under NoRotationOrReflection");
                    pa = 0.0;
                    pc = 0.0;
                    parent_rot = 90.0 - pd.atan2(pb).to_degrees();
                }
                let (sin_x, cos_x) = sin_cos_deg(rot + shear.x - parent_rot);
                let (sin_y, cos_y) = sin_cos_deg(rot + shear.y - parent_rot + 90.0);
                let (la, lb, lc, ld) = (
                    cos_x * scale.x,
                    cos_y * scale.y,
                    sin_x * scale.x,
                    sin_y * scale.y,
                );
                (
                    pa * la - pb * lc,
                    pa * lb - pb * ld,
                    pc * la + pd * lc,
                    pc * lb + pd * ld,
                )
            }
            TransformMode::NoScale | TransformMode::NoScaleOrReflection => {
                let (sin, cos) = sin_cos_deg(rot);
                let mut za = pa * cos + pb * sin;
                let mut zc = pc * cos + pd * sin;
                let mut s = (za * za + zc * zc).sqrt();
                if s > NO_SCALE_EPSILON {
                    s = 1.0 / s;
                } else {
                    trace!("degenerate parent axis under {mode:?}");
                }
                za *= s;
                zc *= s;
                s = (za * za + zc * zc).sqrt();
                if mode == TransformMode::NoScale && pa * pd - pb * pc < 0.0 {
                    s = -s;
                }
                let r = FRAC_PI_2 + zc.atan2(za);
                let zb = r.cos() * s;
                let zd = r.sin() * s;

                let (la, lb, lc, ld) = local_matrix(0.0, scale, shear);
                (
                    za * la + zb * lc,
                    za * lb + zb * ld,
                    zc * la + zd * lc,
                    zc * lb + zd * ld,
                )
            }
        };

        Self::new(a, b, c, d, x, y, rot, shear.x)
    }

    #[inline]
    pub fn a(&self) -> f32 {
        self.a
    }
    #[inline]
    pub fn b(&self) -> f32 {
        self.b
    }
    #[inline]
    pub fn c(&self) -> f32 {
        self.c
    }
    #[inline]
    pub fn d(&self) -> f32 {
        self.d
    }
    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }
    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn translation(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// `[a, b, c, d, x, y]`
    pub fn decompose(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.x, self.y]
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Angle of the transformed X axis, in degrees.
    pub fn world_rotation_x(&self) -> f32 {
        self.c.atan2(self.a).to_degrees()
    }

    pub fn world_scale_x(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }

    pub fn world_scale_y(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }

    pub fn world_to_local(&self, world: Vec2) -> Vec2 {
        let inv_det = 1.0 / self.determinant();
        let x = world.x - self.x;
        let y = world.y - self.y;
        Vec2::new(
            x * self.d * inv_det - y * self.b * inv_det,
            y * self.a * inv_det - x * self.c * inv_det,
        )
    }

    pub fn local_to_world(&self, local: Vec2) -> Vec2 {
        Vec2::new(
            local.x * self.a + local.y * self.b + self.x,
            local.x * self.c + local.y * self.d + self.y,
        )
    }

    /// World-space angle to this transform's local frame (degrees).
    pub fn world_to_local_rotation(&self, world_rotation: f32) -> f32 {
        let (sin, cos) = sin_cos_deg(world_rotation);
        (self.a * sin - self.c * cos)
            .atan2(self.d * cos - self.b * sin)
            .to_degrees()
            + self.rotation
            - self.shear_x
    }

    /// Inverse of `world_to_local_rotation`.
    pub fn local_to_world_rotation(&self, local_rotation: f32) -> f32 {
        let (sin, cos) = sin_cos_deg(local_rotation - (self.rotation - self.shear_x));
        (cos * self.c + sin * self.d)
            .atan2(cos * self.a + sin * self.b)
            .to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn root(rot: f32, scale: Vec2) -> Transformation {
        Transformation::compose(
            Vec2::ZERO,
            rot,
            scale,
            Vec2::ZERO,
            TransformMode::Normal,
            None,
        )
    }

    #[test]
    fn identity_pose_is_identity() {
        let t = root(0.0, Vec2::ONE);
        let [a, b, c, d, x, y] = t.decompose();
        assert_abs_diff_eq!(a, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(c, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(d, 1.0, epsilon = 1e-6);
        assert_eq!((x, y), (0.0, 0.0));
    }

    #[test]
    fn normal_child_follows_parent_rotation() {
        let parent = root(90.0, Vec2::ONE);
        let child = Transformation::compose(
            Vec2::new(10.0, 0.0),
            0.0,
            Vec2::ONE,
            Vec2::ZERO,
            TransformMode::Normal,
            Some(&parent),
        );
        assert_abs_diff_eq!(child.x(), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(child.y(), 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(child.world_rotation_x(), 90.0, epsilon = 1e-3);
    }

    #[test]
    fn only_translation_ignores_parent_orientation() {
        let parent = root(90.0, Vec2::new(3.0, 3.0));
        let child = Transformation::compose(
            Vec2::new(10.0, 0.0),
            0.0,
            Vec2::ONE,
            Vec2::ZERO,
            TransformMode::OnlyTranslation,
            Some(&parent),
        );
        assert_abs_diff_eq!(child.world_rotation_x(), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(child.world_scale_x(), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(child.x(), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(child.y(), 30.0, epsilon = 1e-3);
    }

    #[test]
    fn no_rotation_keeps_parent_scale() {
        let parent = root(45.0, Vec2::new(2.0, 2.0));
        let child = Transformation::compose(
            Vec2::ZERO,
            0.0,
            Vec2::ONE,
            Vec2::ZERO,
            TransformMode::NoRotationOrReflection,
            Some(&parent),
        );
        assert_abs_diff_eq!(child.world_rotation_x(), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(child.world_scale_x(), 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(child.world_scale_y(), 2.0, epsilon = 1e-4);
    }

    #[test]
    fn no_scale_keeps_parent_rotation_only() {
        let parent = root(30.0, Vec2::new(4.0, 4.0));
        let child = Transformation::compose(
            Vec2::ZERO,
            15.0,
            Vec2::new(1.5, 1.5),
            Vec2::ZERO,
            TransformMode::NoScale,
            Some(&parent),
        );
        assert_abs_diff_eq!(child.world_rotation_x(), 45.0, epsilon = 1e-3);
        assert_abs_diff_eq!(child.world_scale_x(), 1.5, epsilon = 1e-4);
        assert_abs_diff_eq!(child.world_scale_y(), 1.5, epsilon = 1e-4);
    }

    #[test]
    fn no_scale_reflection_handling() {
        // Parent mirrored on X.
        let parent = root(0.0, Vec2::new(-1.0, 1.0));
        let keep = Transformation::compose(
            Vec2::ZERO,
            0.0,
            Vec2::ONE,
            Vec2::ZERO,
            TransformMode::NoScale,
            Some(&parent),
        );
        let drop = Transformation::compose(
            Vec2::ZERO,
            0.0,
            Vec2::ONE,
            Vec2::ZERO,
            TransformMode::NoScaleOrReflection,
            Some(&parent),
        );
        assert!(keep.determinant() < 0.0);
        assert!(drop.determinant() > 0.0);
    }

    #[test]
    fn degenerate_parent_does_not_produce_nan() {
        let parent = root(0.0, Vec2::ZERO);
        for mode in [
            TransformMode::NoRotationOrReflection,
            TransformMode::NoScale,
            TransformMode::NoScaleOrReflection,
        ] {
            let child = Transformation::compose(
                Vec2::new(1.0, 1.0),
                20.0,
                Vec2::ONE,
                Vec2::ZERO,
                mode,
                Some(&parent),
            );
            for v in child.decompose() {
                assert!(v.is_finite(), "{mode:?} produced {v}");
            }
        }
    }

    #[test]
    fn point_round_trip() {
        let t = Transformation::compose(
            Vec2::new(3.0, -2.0),
            33.0,
            Vec2::new(1.5, 0.75),
            Vec2::new(10.0, -5.0),
            TransformMode::Normal,
            None,
        );
        let p = Vec2::new(-7.25, 12.5);
        let back = t.world_to_local(t.local_to_world(p));
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-4);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-4);
    }

    #[test]
    fn rotation_round_trip() {
        let t = root(30.0, Vec2::ONE);
        for r in [-170.0f32, -45.0, 0.0, 12.5, 90.0, 150.0] {
            let local = t.world_to_local_rotation(r);
            assert_abs_diff_eq!(t.local_to_world_rotation(local), r, epsilon = 1e-3);
        }
    }
}
