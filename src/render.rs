//! Normalization and debug output for propagated light maps.
//!
//! The engine produces unbounded linear light values; these helpers squeeze
//! them into a displayable range and can dump a map to a PPM image for
//! eyeballing propagation shapes.

use std::fs::File;
use std::io::{self, Write};

use crate::color::{Rgb, to_byte};
use crate::engine::decay::TileClass;
use crate::lightmap::LightMap;

/// Normalization mode for converting HDR light values to displayable range
#[derive(Debug, Clone, Copy)]
pub enum NormalizationMode {
    /// Standard global max scaling - divides all values by the maximum
    Standard,
    /// Per-pixel brightness limiting
    BrightnessLimit(f32),
    /// Perceptual luminance-based normalization
    PerceptualLuminance(f32),
}

/// Normalize a flat light buffer using the specified mode.
pub fn normalize(colors: &[Rgb], mode: NormalizationMode) -> Vec<Rgb> {
    match mode {
        NormalizationMode::Standard => normalize_standard(colors),
        NormalizationMode::BrightnessLimit(limit) => normalize_limit(colors, limit),
        NormalizationMode::PerceptualLuminance(target) => normalize_perceptual(colors, target),
    }
}

/// Scale all values by the global maximum.
fn normalize_standard(colors: &[Rgb]) -> Vec<Rgb> {
    let mut max_val = 0.0f32;
    for color in colors {
        max_val = max_val.max(color.max_component());
    }
    if max_val <= 0.0 {
        return colors.to_vec();
    }
    let scale = 1.0 / max_val;
    colors.iter().map(|&c| c * scale).collect()
}

/// Per-pixel brightness limiting: pixels above the limit keep their hue,
/// pixels below are scaled up toward the limit.
fn normalize_limit(colors: &[Rgb], limit: f32) -> Vec<Rgb> {
    colors
        .iter()
        .map(|&color| {
            let peak = color.max_component();
            if peak > limit {
                color * (limit / peak)
            } else {
                color * (1.0 / limit)
            }
        })
        .collect()
}

/// Perceptual luminance-based normalization (Rec. 709 weights).
fn normalize_perceptual(colors: &[Rgb], target: f32) -> Vec<Rgb> {
    const LUM_R: f32 = 0.2126;
    const LUM_G: f32 = 0.7152;
    const LUM_B: f32 = 0.0722;

    colors
        .iter()
        .map(|&color| {
            let luminance = color.r * LUM_R + color.g * LUM_G + color.b * LUM_B;
            if luminance > target {
                color * (target / luminance)
            } else if luminance > 0.0 {
                let scale = 1.0 / target.max(1.0);
                Rgb::new(
                    (color.r * scale).min(1.0),
                    (color.g * scale).min(1.0),
                    (color.b * scale).min(1.0),
                )
            } else {
                Rgb::ZERO
            }
        })
        .collect()
}

/// Save a light map to a PPM file. Solid tiles are drawn gray so walls stay
/// visible over the lighting.
pub fn save_ppm(map: &LightMap, filename: &str, scale: usize) -> io::Result<()> {
    let width = map.width();
    let height = map.height();
    let img_width = width * scale;
    let img_height = height * scale;

    let mut file = File::create(filename)?;
    writeln!(file, "P3")?;
    writeln!(file, "{} {}", img_width, img_height)?;
    writeln!(file, "255")?;

    let normalized = normalize(map.colors(), NormalizationMode::Standard);

    for img_y in 0..img_height {
        for img_x in 0..img_width {
            let x = img_x / scale;
            let y = img_y / scale;
            let (r, g, b) = if map.class(x, y) == TileClass::Solid {
                (64u8, 64u8, 64u8)
            } else {
                let pixel = normalized[map.index(x, y)];
                (to_byte(pixel.r), to_byte(pixel.g), to_byte(pixel.b))
            };
            write!(file, "{} {} {} ", r, g, b)?;
        }
        writeln!(file)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_normalization_scales_to_unit_peak() {
        let colors = vec![Rgb::new(0.5, 0.0, 0.0), Rgb::new(2.0, 1.0, 0.0)];
        let normalized = normalize(&colors, NormalizationMode::Standard);
        assert_eq!(normalized[1].r, 1.0);
        assert_eq!(normalized[0].r, 0.25);
    }

    #[test]
    fn test_standard_normalization_of_dark_map_is_identity() {
        let colors = vec![Rgb::ZERO; 4];
        let normalized = normalize(&colors, NormalizationMode::Standard);
        assert_eq!(normalized, colors);
    }

    #[test]
    fn test_brightness_limit_preserves_hue_above_limit() {
        let colors = vec![Rgb::new(4.0, 2.0, 0.0)];
        let normalized = normalize(&colors, NormalizationMode::BrightnessLimit(1.0));
        assert!((normalized[0].r - 1.0).abs() < 1e-6);
        assert!((normalized[0].g - 0.5).abs() < 1e-6);
    }
}
