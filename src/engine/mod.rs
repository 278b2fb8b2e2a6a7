//! Grid light propagation engine.
//!
//! The engine turns a grid of emissive tiles into a fully lit grid using
//! precomputed boundary-crossing geometry, a per-class decay model, and a
//! per-source directional sweep fanned out over a worker pool. The three
//! accuracy variants share one const-generic implementation; [`LightEngine`]
//! dispatches to the variant selected at runtime.

pub mod circle;
pub mod decay;
pub mod propagate;
pub mod scheduler;
pub mod spread;

use thiserror::Error;

use crate::lightmap::LightMap;
use decay::{DecayModel, DecayRates};
use propagate::PropagationEngine;

/// Sub-tile resolution variant: how many lanes each tile edge is split into
/// when building the spread table. Higher is smoother and less axis-biased,
/// at more per-cell cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    X1,
    X2,
    X4,
}

impl Resolution {
    pub fn lanes(self) -> usize {
        match self {
            Resolution::X1 => 1,
            Resolution::X2 => 2,
            Resolution::X4 => 4,
        }
    }
}

/// Rectangular sub-area restriction for partial recomputation, half-open in
/// both axes. Only sources inside the area are processed; their light may
/// still spill past the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Area {
    pub fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Area { x0, y0, x1, y1 }
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Engine configuration. Owned and validated by the embedding layer;
/// [`EngineConfig::clamped`] is applied on the way in so the core never sees
/// out-of-range values.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub resolution: Resolution,
    /// Reuse last frame's per-source direction activity as a pre-filter.
    pub temporal: bool,
    /// Run the bounce-light diffusion pass after the main pass.
    pub bounce_light: bool,
    pub bounce_iterations: usize,
    /// Extra loss when light exits a solid tile, 0-100.
    pub exit_loss_percent: f32,
    pub workers: usize,
    pub max_light_range: usize,
    /// Treat host colors as gamma-space: convert to linear before
    /// propagation and back afterwards.
    pub hi_def: bool,
    pub decay_rates: DecayRates,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            resolution: Resolution::X2,
            temporal: false,
            bounce_light: false,
            bounce_iterations: 6,
            exit_loss_percent: 50.0,
            workers: 4,
            max_light_range: 64,
            hi_def: false,
            decay_rates: DecayRates::default(),
        }
    }
}

impl EngineConfig {
    /// Clamp every parameter into its valid range.
    pub fn clamped(mut self) -> Self {
        self.exit_loss_percent = self.exit_loss_percent.clamp(0.0, 100.0);
        self.workers = self.workers.max(1);
        self.max_light_range = self.max_light_range.max(1);
        self
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Degenerate input: the engine did no work and the host should fall
    /// back to its baseline lighting for this frame.
    #[error("cannot propagate light on a {width}x{height} grid")]
    EmptyGrid { width: usize, height: usize },
    #[error("expected {expected} tiles, got {colors} colors and {mask} mask entries")]
    BufferMismatch {
        expected: usize,
        colors: usize,
        mask: usize,
    },
    #[error("failed to build worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Runtime dispatcher over the three resolution variants.
pub enum LightEngine {
    X1(PropagationEngine<1>),
    X2(PropagationEngine<2>),
    X4(PropagationEngine<4>),
}

impl LightEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let config = config.clamped();
        Ok(match config.resolution {
            Resolution::X1 => LightEngine::X1(PropagationEngine::new(config)?),
            Resolution::X2 => LightEngine::X2(PropagationEngine::new(config)?),
            Resolution::X4 => LightEngine::X4(PropagationEngine::new(config)?),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        match self {
            LightEngine::X1(engine) => engine.config(),
            LightEngine::X2(engine) => engine.config(),
            LightEngine::X4(engine) => engine.config(),
        }
    }

    /// Apply a new configuration. A resolution change rebuilds the whole
    /// variant; anything else rebuilds only the tables it affects.
    pub fn update_config(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        let config = config.clamped();
        if config.resolution != self.config().resolution {
            let area = self.area();
            *self = LightEngine::new(config)?;
            self.set_area(area);
            return Ok(());
        }
        match self {
            LightEngine::X1(engine) => engine.update_config(config),
            LightEngine::X2(engine) => engine.update_config(config),
            LightEngine::X4(engine) => engine.update_config(config),
        }
    }

    pub fn set_area(&mut self, area: Option<Area>) {
        match self {
            LightEngine::X1(engine) => engine.set_area(area),
            LightEngine::X2(engine) => engine.set_area(area),
            LightEngine::X4(engine) => engine.set_area(area),
        }
    }

    pub fn area(&self) -> Option<Area> {
        match self {
            LightEngine::X1(engine) => engine.area(),
            LightEngine::X2(engine) => engine.area(),
            LightEngine::X4(engine) => engine.area(),
        }
    }

    /// Replace the decay model with explicit curves.
    pub fn set_decay_model(&mut self, model: DecayModel) {
        match self {
            LightEngine::X1(engine) => engine.set_decay_model(model),
            LightEngine::X2(engine) => engine.set_decay_model(model),
            LightEngine::X4(engine) => engine.set_decay_model(model),
        }
    }

    /// Propagate the map's emissions into a light map, in place.
    pub fn spread_light(&mut self, map: &mut LightMap) -> Result<(), EngineError> {
        match self {
            LightEngine::X1(engine) => engine.spread_light(map),
            LightEngine::X2(engine) => engine.spread_light(map),
            LightEngine::X4(engine) => engine.spread_light(map),
        }
    }
}
