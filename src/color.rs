//! Linear-space RGB color math.
//!
//! Light values are linear-space triples with non-negative components. The
//! engine combines contributions with a component-wise maximum, never a sum,
//! so a cell always holds the brightest path that reached it.

use std::ops::Mul;

/// Gamma exponent used when the host supplies gamma-space colors.
const GAMMA: f32 = 2.2;

/// Linear-space RGB triple. Components are >= 0; there is no upper bound
/// before normalization for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const ZERO: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    #[inline]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Rgb { r, g, b }
    }

    /// Component-wise maximum, the engine's only blend rule.
    #[inline]
    pub fn max(self, other: Rgb) -> Rgb {
        Rgb {
            r: self.r.max(other.r),
            g: self.g.max(other.g),
            b: self.b.max(other.b),
        }
    }

    #[inline]
    pub fn max_component(self) -> f32 {
        self.r.max(self.g).max(self.b)
    }

    /// True if propagating this color to a cell holding `other` could raise
    /// any channel. Used to skip directions that max-blend cannot improve.
    #[inline]
    pub fn brighter_than(self, other: Rgb) -> bool {
        self.r > other.r || self.g > other.g || self.b > other.b
    }

    /// Gamma-space to linear-space conversion for the hi-def path.
    #[inline]
    pub fn to_linear(self) -> Rgb {
        Rgb {
            r: self.r.powf(GAMMA),
            g: self.g.powf(GAMMA),
            b: self.b.powf(GAMMA),
        }
    }

    /// Inverse of [`Rgb::to_linear`].
    #[inline]
    pub fn to_gamma(self) -> Rgb {
        Rgb {
            r: self.r.powf(1.0 / GAMMA),
            g: self.g.powf(1.0 / GAMMA),
            b: self.b.powf(1.0 / GAMMA),
        }
    }

    /// Pack into 0x00RRGGBB for the minifb framebuffer. Values are clamped
    /// to [0, 1] first.
    #[inline]
    pub fn to_u32(self) -> u32 {
        let r = to_byte(self.r) as u32;
        let g = to_byte(self.g) as u32;
        let b = to_byte(self.b) as u32;
        (r << 16) | (g << 8) | b
    }
}

impl Mul<f32> for Rgb {
    type Output = Rgb;

    #[inline]
    fn mul(self, rhs: f32) -> Rgb {
        Rgb {
            r: self.r * rhs,
            g: self.g * rhs,
            b: self.b * rhs,
        }
    }
}

/// Convert a float value (0.0-1.0) to a byte (0-255)
#[inline]
pub fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_blend_never_darkens() {
        let a = Rgb::new(0.8, 0.1, 0.3);
        let b = Rgb::new(0.2, 0.5, 0.3);
        let m = a.max(b);
        assert_eq!((m.r, m.g, m.b), (0.8, 0.5, 0.3));
        // max with self is identity
        assert_eq!(a.max(a), a);
    }

    #[test]
    fn test_brighter_than() {
        let dim = Rgb::new(0.1, 0.1, 0.1);
        let bright = Rgb::new(0.5, 0.0, 0.0);
        assert!(bright.brighter_than(dim), "red channel can still be raised");
        assert!(!dim.brighter_than(Rgb::new(0.2, 0.2, 0.2)));
        assert!(!Rgb::ZERO.brighter_than(Rgb::ZERO));
    }

    #[test]
    fn test_gamma_round_trip() {
        let c = Rgb::new(0.25, 0.5, 0.75);
        let back = c.to_linear().to_gamma();
        assert!((back.r - c.r).abs() < 1e-5);
        assert!((back.g - c.g).abs() < 1e-5);
        assert!((back.b - c.b).abs() < 1e-5);
        // endpoints are exact
        assert_eq!(Rgb::ZERO.to_linear(), Rgb::ZERO);
        assert_eq!(Rgb::WHITE.to_linear(), Rgb::WHITE);
    }

    #[test]
    fn test_framebuffer_packing() {
        assert_eq!(Rgb::WHITE.to_u32(), 0x00FF_FFFF);
        assert_eq!(Rgb::ZERO.to_u32(), 0);
        assert_eq!(Rgb::new(1.0, 0.0, 0.0).to_u32(), 0x00FF_0000);
        // overbright values clamp instead of wrapping
        assert_eq!(Rgb::new(3.0, 0.0, 0.0).to_u32(), 0x00FF_0000);
    }
}
