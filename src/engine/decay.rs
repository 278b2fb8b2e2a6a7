//! Per-tile attenuation model.
//!
//! Every tile classification maps to one decay curve: attenuation multipliers
//! indexed by a quantized sub-tile distance in ticks, where a full tile is
//! `DISTANCE_TICKS` ticks. Light leaving a fully solid tile into a non-solid
//! one additionally pays a one-time exit loss.

/// Sub-tile distance resolution. `curve[DISTANCE_TICKS]` is one full tile of
/// attenuation; the spread table quantizes partial-tile distances to the same
/// ticks.
pub const DISTANCE_TICKS: usize = 256;

/// Blocking classification of a tile, supplied by the host each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileClass {
    /// Open space.
    Air,
    /// Fully solid; also triggers the exit loss when light leaves it.
    Solid,
    /// Weak partial blocking.
    Water,
    /// Strong partial blocking, still translucent.
    Murk,
}

/// Attenuation-per-distance table for one tile classification.
///
/// Values lie in [0, 1] and are non-increasing in the tick index.
#[derive(Clone)]
pub struct DecayCurve {
    values: [f32; DISTANCE_TICKS + 1],
}

impl DecayCurve {
    /// Curve with `curve[t] = rate^(t / DISTANCE_TICKS)`, so crossing one
    /// full tile multiplies light by `rate`.
    pub fn exponential(rate: f32) -> Self {
        let rate = rate.clamp(0.0, 1.0);
        let mut values = [0.0f32; DISTANCE_TICKS + 1];
        for (t, value) in values.iter_mut().enumerate() {
            *value = rate.powf(t as f32 / DISTANCE_TICKS as f32);
        }
        DecayCurve { values }
    }

    /// Curve sampled from an arbitrary function of the tick index. The
    /// samples are clamped to [0, 1]; monotonicity is the caller's business.
    pub fn from_fn(f: impl Fn(usize) -> f32) -> Self {
        let mut values = [0.0f32; DISTANCE_TICKS + 1];
        for (t, value) in values.iter_mut().enumerate() {
            *value = f(t).clamp(0.0, 1.0);
        }
        DecayCurve { values }
    }

    #[inline]
    pub fn at(&self, tick: u16) -> f32 {
        self.values[tick as usize]
    }

    /// Attenuation for one full tile of this class.
    #[inline]
    pub fn full_tile(&self) -> f32 {
        self.values[DISTANCE_TICKS]
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Per-tile attenuation rates, one per classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayRates {
    pub air: f32,
    pub solid: f32,
    pub water: f32,
    pub murk: f32,
}

impl Default for DecayRates {
    fn default() -> Self {
        DecayRates {
            air: 0.91,
            solid: 0.56,
            water: 0.88,
            murk: 0.64,
        }
    }
}

/// The decay curves for all tile classes plus the solid exit-loss multiplier.
///
/// Rebuilt whenever a rate or the exit-loss percentage changes; immutable and
/// shared read-only during a propagation pass.
#[derive(Clone)]
pub struct DecayModel {
    air: DecayCurve,
    solid: DecayCurve,
    water: DecayCurve,
    murk: DecayCurve,
    exit_multiplier: f32,
}

impl DecayModel {
    pub fn new(rates: DecayRates, exit_loss_percent: f32) -> Self {
        DecayModel {
            air: DecayCurve::exponential(rates.air),
            solid: DecayCurve::exponential(rates.solid),
            water: DecayCurve::exponential(rates.water),
            murk: DecayCurve::exponential(rates.murk),
            exit_multiplier: exit_multiplier(exit_loss_percent),
        }
    }

    /// Build a model from explicit curves. Mostly useful for driving the
    /// engine with non-exponential falloff.
    pub fn from_curves(
        air: DecayCurve,
        solid: DecayCurve,
        water: DecayCurve,
        murk: DecayCurve,
        exit_loss_percent: f32,
    ) -> Self {
        DecayModel {
            air,
            solid,
            water,
            murk,
            exit_multiplier: exit_multiplier(exit_loss_percent),
        }
    }

    #[inline]
    pub fn curve(&self, class: TileClass) -> &DecayCurve {
        match class {
            TileClass::Air => &self.air,
            TileClass::Solid => &self.solid,
            TileClass::Water => &self.water,
            TileClass::Murk => &self.murk,
        }
    }

    /// One-time multiplier applied when light crosses from a solid tile into
    /// a non-solid one. `1.0` means no loss, `0.0` swallows the light.
    #[inline]
    pub fn exit_multiplier(&self) -> f32 {
        self.exit_multiplier
    }
}

fn exit_multiplier(exit_loss_percent: f32) -> f32 {
    1.0 - exit_loss_percent.clamp(0.0, 100.0) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_endpoints() {
        let curve = DecayCurve::exponential(0.56);
        assert_eq!(curve.at(0), 1.0);
        assert!((curve.full_tile() - 0.56).abs() < 1e-6);
    }

    #[test]
    fn test_curves_monotonically_non_increasing() {
        let model = DecayModel::new(DecayRates::default(), 50.0);
        for class in [
            TileClass::Air,
            TileClass::Solid,
            TileClass::Water,
            TileClass::Murk,
        ] {
            let values = model.curve(class).values();
            for t in 0..DISTANCE_TICKS {
                assert!(
                    values[t] >= values[t + 1],
                    "{class:?} curve increases at tick {t}: {} < {}",
                    values[t],
                    values[t + 1]
                );
            }
        }
    }

    #[test]
    fn test_exit_multiplier_from_percent() {
        assert_eq!(DecayModel::new(DecayRates::default(), 0.0).exit_multiplier(), 1.0);
        assert_eq!(DecayModel::new(DecayRates::default(), 100.0).exit_multiplier(), 0.0);
        assert!((DecayModel::new(DecayRates::default(), 25.0).exit_multiplier() - 0.75).abs() < 1e-6);
        // out-of-range percentages clamp instead of going negative
        assert_eq!(DecayModel::new(DecayRates::default(), 250.0).exit_multiplier(), 0.0);
    }
}
