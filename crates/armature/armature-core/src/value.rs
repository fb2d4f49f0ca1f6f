//! Small value types animated by timelines.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// 2D vector used for positions, scales and shears.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    pub const ONE: Self = Self { x: 1.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Component-wise product.
impl Mul for Vec2 {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl From<[f32; 2]> for Vec2 {
    fn from(v: [f32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

/// 8-bit RGBA color.
///
/// Color timelines key each channel as a percentage (0..=100), so the
/// conversions below are the only place the 2.55 factor lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

const PERCENT_TO_BYTE: f32 = 2.55;

impl Color {
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    pub const BLANK: Self = Self::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn gray(v: u8) -> Self {
        Self::rgba(v, v, v, 255)
    }

    /// Convert a channel percentage to a byte, rounding and clamping.
    pub fn channel_from_percent(percent: f32) -> u8 {
        if !percent.is_finite() {
            return 0;
        }
        (percent * PERCENT_TO_BYTE).round().clamp(0.0, 255.0) as u8
    }

    pub fn channel_to_percent(byte: u8) -> f32 {
        byte as f32 / PERCENT_TO_BYTE
    }

    pub fn from_percent(rgba: [f32; 4]) -> Self {
        Self::rgba(
            Self::channel_from_percent(rgba[0]),
            Self::channel_from_percent(rgba[1]),
            Self::channel_from_percent(rgba[2]),
            Self::channel_from_percent(rgba[3]),
        )
    }

    pub fn to_percent(&self) -> [f32; 4] {
        [
            Self::channel_to_percent(self.r),
            Self::channel_to_percent(self.g),
            Self::channel_to_percent(self.b),
            Self::channel_to_percent(self.a),
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_conversion_is_exact_for_every_byte() {
        for byte in 0..=255u8 {
            let p = Color::channel_to_percent(byte);
            assert_eq!(Color::channel_from_percent(p), byte, "byte {byte}");
        }
    }

    #[test]
    fn percent_conversion_clamps() {
        assert_eq!(Color::channel_from_percent(150.0), 255);
        assert_eq!(Color::channel_from_percent(-3.0), 0);
        assert_eq!(Color::channel_from_percent(f32::NAN), 0);
    }

    #[test]
    fn vec2_ops() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(3.0, 4.0);
        assert_eq!(a + b, Vec2::new(4.0, 6.0));
        assert_eq!(b - a, Vec2::new(2.0, 2.0));
        assert_eq!(a * b, Vec2::new(3.0, 8.0));
        assert_eq!(a * 2.0, Vec2::new(2.0, 4.0));
    }
}
