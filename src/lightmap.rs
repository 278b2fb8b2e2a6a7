//! The host-facing light map and the engine's shared scatter-write surface.
//!
//! Tiles are stored column-major by height: moving one step right changes the
//! flat index by `height`, one step down changes it by +1 and one step up by
//! -1.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::color::Rgb;
use crate::engine::EngineError;
use crate::engine::decay::TileClass;

/// Dense per-tile grid of emissive colors and blocking classifications.
///
/// The host refreshes both buffers before each frame; the engine mutates
/// `colors` in place, turning emissions into the frame's propagated light
/// map.
#[derive(Clone)]
pub struct LightMap {
    width: usize,
    height: usize,
    colors: Vec<Rgb>,
    mask: Vec<TileClass>,
}

impl LightMap {
    /// All-dark, all-air map.
    pub fn new(width: usize, height: usize) -> Self {
        LightMap {
            width,
            height,
            colors: vec![Rgb::ZERO; width * height],
            mask: vec![TileClass::Air; width * height],
        }
    }

    /// Wrap host-owned buffers, validating that they cover the grid.
    pub fn from_parts(
        width: usize,
        height: usize,
        colors: Vec<Rgb>,
        mask: Vec<TileClass>,
    ) -> Result<Self, EngineError> {
        let expected = width * height;
        if colors.len() != expected || mask.len() != expected {
            return Err(EngineError::BufferMismatch {
                expected,
                colors: colors.len(),
                mask: mask.len(),
            });
        }
        Ok(LightMap {
            width,
            height,
            colors,
            mask,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        x * self.height + y
    }

    #[inline]
    pub fn color(&self, x: usize, y: usize) -> Rgb {
        self.colors[self.index(x, y)]
    }

    #[inline]
    pub fn set_color(&mut self, x: usize, y: usize, color: Rgb) {
        let i = self.index(x, y);
        self.colors[i] = color;
    }

    #[inline]
    pub fn class(&self, x: usize, y: usize) -> TileClass {
        self.mask[self.index(x, y)]
    }

    #[inline]
    pub fn set_class(&mut self, x: usize, y: usize, class: TileClass) {
        let i = self.index(x, y);
        self.mask[i] = class;
    }

    #[inline]
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    #[inline]
    pub fn colors_mut(&mut self) -> &mut [Rgb] {
        &mut self.colors
    }

    #[inline]
    pub fn mask(&self) -> &[TileClass] {
        &self.mask
    }

    #[inline]
    pub fn mask_mut(&mut self) -> &mut [TileClass] {
        &mut self.mask
    }

    /// Reset every tile to dark air.
    pub fn clear(&mut self) {
        self.colors.fill(Rgb::ZERO);
        self.mask.fill(TileClass::Air);
    }
}

/// One cell of the engine's concurrent scatter buffer.
///
/// Workers are partitioned by source index but write wherever their light
/// reaches, so two workers can hit the same destination cell. Every write is
/// a `fetch_max` per channel on the f32 bit pattern: for the non-negative
/// values the engine produces, the integer ordering of IEEE-754 bits equals
/// the float ordering, so a concurrent maximum is exact, lock-free and never
/// loses an update. Relaxed ordering suffices because the pass joins all
/// workers before anything reads the result.
pub struct AtomicRgb {
    r: AtomicU32,
    g: AtomicU32,
    b: AtomicU32,
}

impl AtomicRgb {
    pub fn zero() -> Self {
        AtomicRgb {
            r: AtomicU32::new(0),
            g: AtomicU32::new(0),
            b: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn store(&self, color: Rgb) {
        self.r.store(color.r.to_bits(), Ordering::Relaxed);
        self.g.store(color.g.to_bits(), Ordering::Relaxed);
        self.b.store(color.b.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> Rgb {
        Rgb {
            r: f32::from_bits(self.r.load(Ordering::Relaxed)),
            g: f32::from_bits(self.g.load(Ordering::Relaxed)),
            b: f32::from_bits(self.b.load(Ordering::Relaxed)),
        }
    }

    /// Raise each channel to at least the corresponding channel of `color`.
    #[inline]
    pub fn max_blend(&self, color: Rgb) {
        self.r.fetch_max(color.r.to_bits(), Ordering::Relaxed);
        self.g.fetch_max(color.g.to_bits(), Ordering::Relaxed);
        self.b.fetch_max(color.b.to_bits(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_indexing_is_column_major_by_height() {
        let map = LightMap::new(4, 3);
        assert_eq!(map.index(0, 0), 0);
        assert_eq!(map.index(0, 1), 1); // one step down
        assert_eq!(map.index(1, 0), 3); // one step right
        assert_eq!(map.index(3, 2), 11);
    }

    #[test]
    fn test_from_parts_rejects_short_buffers() {
        let result = LightMap::from_parts(3, 3, vec![Rgb::ZERO; 8], vec![TileClass::Air; 9]);
        assert!(result.is_err());
        let result = LightMap::from_parts(3, 3, vec![Rgb::ZERO; 9], vec![TileClass::Air; 9]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_atomic_max_blend_only_raises() {
        let cell = AtomicRgb::zero();
        cell.store(Rgb::new(0.5, 0.2, 0.0));
        cell.max_blend(Rgb::new(0.3, 0.4, 0.1));
        let got = cell.load();
        assert_eq!((got.r, got.g, got.b), (0.5, 0.4, 0.1));
        cell.max_blend(Rgb::ZERO);
        assert_eq!(cell.load(), got, "blending zero must not darken");
    }
}
