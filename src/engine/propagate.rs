//! The per-frame light propagation engine.
//!
//! For every tile whose emission clears the brightness cutoff, light is swept
//! outward along the four cardinal directions and across the four quadrants
//! between them, attenuated per tile by the decay model and redistributed at
//! tile boundaries by the precomputed spread table. All writes land in a
//! shared atomic buffer via component-wise maximum, so the result is
//! independent of source order and worker interleaving.

use crate::color::Rgb;
use crate::engine::circle::CircleTable;
use crate::engine::decay::{DecayModel, TileClass};
use crate::engine::scheduler::WorkerPool;
use crate::engine::spread::SpreadTable;
use crate::engine::{Area, EngineConfig, EngineError};
use crate::lightmap::{AtomicRgb, LightMap};

/// Emissions at or below this are never treated as sources.
const INITIAL_CUTOFF: f32 = 1.0 / 255.0;
/// Light attenuated below this no longer extends the propagation range.
const RANGE_CUTOFF: f32 = 0.04;
/// Scale applied to the lit map when it re-emits during a bounce iteration.
const BOUNCE_FACTOR: f32 = 0.5;
/// Bounce iterations run at a fraction of the configured light range.
const BOUNCE_RANGE_DIVISOR: usize = 4;

// TemporalState bits: which of the 8 directions were eligible last frame,
// plus a bit recording that the source was processed at all.
const DIR_UP: u16 = 1 << 0;
const DIR_DOWN: u16 = 1 << 1;
const DIR_LEFT: u16 = 1 << 2;
const DIR_RIGHT: u16 = 1 << 3;
const DIR_UP_LEFT: u16 = 1 << 4;
const DIR_UP_RIGHT: u16 = 1 << 5;
const DIR_DOWN_LEFT: u16 = 1 << 6;
const DIR_DOWN_RIGHT: u16 = 1 << 7;
const PROCESSED: u16 = 1 << 8;

/// Propagation engine generic over the sub-tile resolution `N` (1, 2 or 4
/// edge lanes). The precomputed tables are immutable between configuration
/// changes; per-frame state is limited to the scatter buffer and the
/// temporal direction masks.
pub struct PropagationEngine<const N: usize> {
    config: EngineConfig,
    decay: DecayModel,
    spread: SpreadTable<N>,
    circles: CircleTable,
    pool: WorkerPool,
    area: Option<Area>,
    scratch: Vec<AtomicRgb>,
    temporal_prev: Vec<u16>,
    temporal_cur: Vec<u16>,
}

impl<const N: usize> PropagationEngine<N> {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Ok(PropagationEngine {
            decay: DecayModel::new(config.decay_rates, config.exit_loss_percent),
            spread: SpreadTable::build(config.max_light_range),
            circles: CircleTable::build(config.max_light_range),
            pool: WorkerPool::new(config.workers)?,
            area: None,
            scratch: Vec::new(),
            temporal_prev: Vec::new(),
            temporal_cur: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply a new configuration, rebuilding only what changed. The caller
    /// (the resolution dispatcher) has already handled resolution changes.
    pub fn update_config(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        if config.max_light_range != self.config.max_light_range {
            self.spread = SpreadTable::build(config.max_light_range);
            self.circles = CircleTable::build(config.max_light_range);
        }
        if config.decay_rates != self.config.decay_rates
            || config.exit_loss_percent != self.config.exit_loss_percent
        {
            self.decay = DecayModel::new(config.decay_rates, config.exit_loss_percent);
        }
        if config.workers != self.config.workers {
            self.pool = WorkerPool::new(config.workers)?;
        }
        self.config = config;
        Ok(())
    }

    /// Replace the decay model wholesale, e.g. with non-exponential curves.
    pub fn set_decay_model(&mut self, model: DecayModel) {
        self.decay = model;
    }

    pub fn set_area(&mut self, area: Option<Area>) {
        self.area = area;
    }

    pub fn area(&self) -> Option<Area> {
        self.area
    }

    /// Propagate the map's emissive colors into a full light map, in place.
    pub fn spread_light(&mut self, map: &mut LightMap) -> Result<(), EngineError> {
        let width = map.width();
        let height = map.height();
        if width == 0 || height == 0 {
            log::warn!("skipping propagation on a {width}x{height} grid");
            return Err(EngineError::EmptyGrid { width, height });
        }
        let len = width * height;
        if map.colors().len() != len || map.mask().len() != len {
            return Err(EngineError::BufferMismatch {
                expected: len,
                colors: map.colors().len(),
                mask: map.mask().len(),
            });
        }

        if self.config.hi_def {
            for color in map.colors_mut() {
                *color = color.to_linear();
            }
        }

        if self.scratch.len() != len {
            self.scratch = (0..len).map(|_| AtomicRgb::zero()).collect();
        }
        for (cell, &color) in self.scratch.iter().zip(map.colors()) {
            cell.store(color);
        }

        if self.temporal_prev.len() != len {
            self.temporal_prev = vec![0; len];
            self.temporal_cur = vec![0; len];
        }
        std::mem::swap(&mut self.temporal_prev, &mut self.temporal_cur);
        let mut temporal = std::mem::take(&mut self.temporal_cur);
        temporal.fill(0);

        // Sources are read from a frame-start snapshot so output does not
        // depend on how workers interleave their writes.
        let sources: Vec<Rgb> = map.colors().to_vec();
        self.run_pass(
            &sources,
            map.mask(),
            width,
            height,
            &mut temporal,
            self.config.max_light_range,
            self.config.temporal,
            true,
        );

        if self.config.bounce_light {
            let bounce_range = (self.config.max_light_range / BOUNCE_RANGE_DIVISOR).max(1);
            for _ in 0..self.config.bounce_iterations {
                // The scatter join above (and between iterations) is the
                // barrier: each bounce snapshot observes the fully written
                // map of the previous pass. Solid tiles do not re-emit.
                let secondary: Vec<Rgb> = self
                    .scratch
                    .iter()
                    .zip(map.mask())
                    .map(|(cell, &class)| {
                        if class == TileClass::Solid {
                            Rgb::ZERO
                        } else {
                            cell.load() * BOUNCE_FACTOR
                        }
                    })
                    .collect();
                self.run_pass(
                    &secondary,
                    map.mask(),
                    width,
                    height,
                    &mut temporal,
                    bounce_range,
                    false,
                    false,
                );
            }
        }

        self.temporal_cur = temporal;

        for (color, cell) in map.colors_mut().iter_mut().zip(&self.scratch) {
            *color = cell.load();
        }
        if self.config.hi_def {
            for color in map.colors_mut() {
                *color = color.to_gamma();
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pass(
        &self,
        sources: &[Rgb],
        mask: &[TileClass],
        width: usize,
        height: usize,
        temporal: &mut [u16],
        max_range: usize,
        use_temporal: bool,
        record_temporal: bool,
    ) {
        self.pool.scatter(temporal, &|base: usize, slots: &mut [u16]| {
            let mut working: Vec<[f32; N]> = Vec::new();
            for (offset, slot) in slots.iter_mut().enumerate() {
                self.process_light(
                    sources,
                    mask,
                    width,
                    height,
                    base + offset,
                    slot,
                    &mut working,
                    max_range,
                    use_temporal,
                    record_temporal,
                );
            }
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn process_light(
        &self,
        sources: &[Rgb],
        mask: &[TileClass],
        width: usize,
        height: usize,
        index: usize,
        temporal_slot: &mut u16,
        working: &mut Vec<[f32; N]>,
        max_range: usize,
        use_temporal: bool,
        record_temporal: bool,
    ) {
        let x = index / height;
        let y = index % height;
        if let Some(area) = self.area {
            if !area.contains(x, y) {
                return;
            }
        }

        let emitted = sources[index];
        if emitted.r <= INITIAL_CUTOFF && emitted.g <= INITIAL_CUTOFF && emitted.b <= INITIAL_CUTOFF
        {
            return;
        }

        // Light leaving a tile is first attenuated by its own material.
        let color = emitted * self.decay.curve(mask[index]).full_tile();

        // A direction is eligible only if the immediate neighbor can still be
        // raised; max-blend makes skipping the rest valid.
        let up_ok = y > 0 && color.brighter_than(sources[index - 1]);
        let down_ok = y + 1 < height && color.brighter_than(sources[index + 1]);
        let left_ok = x > 0 && color.brighter_than(sources[index - height]);
        let right_ok = x + 1 < width && color.brighter_than(sources[index + height]);

        let mut eligible = 0u16;
        eligible |= if up_ok { DIR_UP } else { 0 };
        eligible |= if down_ok { DIR_DOWN } else { 0 };
        eligible |= if left_ok { DIR_LEFT } else { 0 };
        eligible |= if right_ok { DIR_RIGHT } else { 0 };
        eligible |= if up_ok && left_ok { DIR_UP_LEFT } else { 0 };
        eligible |= if up_ok && right_ok { DIR_UP_RIGHT } else { 0 };
        eligible |= if down_ok && left_ok { DIR_DOWN_LEFT } else { 0 };
        eligible |= if down_ok && right_ok { DIR_DOWN_RIGHT } else { 0 };

        if record_temporal {
            // Record fresh eligibility, not the filtered set, so a direction
            // suppressed by stale data recovers on the next frame.
            *temporal_slot = PROCESSED | eligible;
        }

        let prev = self.temporal_prev[index];
        let run = if use_temporal && prev & PROCESSED != 0 {
            eligible & prev
        } else {
            eligible
        };
        if run == 0 {
            return;
        }

        let range = self.light_range(color, max_range);
        let up = y.min(range);
        let down = (height - 1 - y).min(range);
        let left = x.min(range);
        let right = (width - 1 - x).min(range);
        let h_step = height as isize;

        if run & DIR_UP != 0 {
            self.spread_line(color, mask, index, up, -1);
        }
        if run & DIR_DOWN != 0 {
            self.spread_line(color, mask, index, down, 1);
        }
        if run & DIR_LEFT != 0 {
            self.spread_line(color, mask, index, left, -h_step);
        }
        if run & DIR_RIGHT != 0 {
            self.spread_line(color, mask, index, right, h_step);
        }

        if run & (DIR_UP_LEFT | DIR_UP_RIGHT | DIR_DOWN_LEFT | DIR_DOWN_RIGHT) != 0 {
            let circle = self.circles.row(range);
            working.clear();
            working.resize(range + 1, [0.0; N]);
            if run & DIR_UP_LEFT != 0 {
                self.quadrant(working, circle, color, mask, index, up, left, -1, -h_step);
            }
            if run & DIR_UP_RIGHT != 0 {
                self.quadrant(working, circle, color, mask, index, up, right, -1, h_step);
            }
            if run & DIR_DOWN_LEFT != 0 {
                self.quadrant(working, circle, color, mask, index, down, left, 1, -h_step);
            }
            if run & DIR_DOWN_RIGHT != 0 {
                self.quadrant(working, circle, color, mask, index, down, right, 1, h_step);
            }
        }
    }

    /// Largest distance at which `color`, attenuated by the open-air curve,
    /// still clears the range cutoff.
    fn light_range(&self, color: Rgb, max_range: usize) -> usize {
        let peak = color.max_component();
        if peak <= RANGE_CUTOFF {
            return 1;
        }
        let air = self.decay.curve(TileClass::Air).full_tile();
        if air <= 0.0 {
            return 1;
        }
        if air >= 1.0 {
            return max_range.max(1);
        }
        let steps = (RANGE_CUTOFF / peak).ln() / air.ln();
        (steps as usize).clamp(1, max_range)
    }

    /// Straight cardinal sweep: one full tile of the previous tile's curve
    /// per step, with the exit loss applied exactly once per solid to
    /// non-solid crossing.
    fn spread_line(&self, color: Rgb, mask: &[TileClass], index: usize, distance: usize, step: isize) {
        if distance == 0 {
            return;
        }
        let mut i = index as isize + step;
        self.scratch[i as usize].max_blend(color);
        if distance < 2 {
            return;
        }
        let mut value = 1.0f32;
        let mut prev = mask[i as usize];
        for _ in 2..=distance {
            i += step;
            let class = mask[i as usize];
            let full = self.decay.curve(prev).full_tile();
            value *= if prev == TileClass::Solid && class != TileClass::Solid {
                self.decay.exit_multiplier() * full
            } else {
                full
            };
            prev = class;
            self.scratch[i as usize].max_blend(color * value);
        }
    }

    /// Fill the quadrant between two eligible cardinal directions.
    ///
    /// Two running lane vectors carry the light crossing each cell's vertical
    /// and horizontal incoming edges; the spread entry for the current
    /// displacement blends them into the destination cell and advances them
    /// to the next boundary. The inner loop is bounded by the circle table,
    /// which only culls sub-cutoff cells.
    #[allow(clippy::too_many_arguments)]
    fn quadrant(
        &self,
        working: &mut [[f32; N]],
        circle: &[usize],
        color: Rgb,
        mask: &[TileClass],
        index: usize,
        v_dist: usize,
        h_dist: usize,
        v_step: isize,
        h_step: isize,
    ) {
        let solid = TileClass::Solid;
        let exit = self.decay.exit_multiplier();

        // Seed the vertical edge from the axis sweep's first steps.
        working[0] = [1.0; N];
        let mut i = index as isize + v_step;
        let mut prev = mask[i as usize];
        let mut value = 1.0f32;
        working[1] = [self.decay.curve(prev).at(self.spread.entry(1, 0).to_right); N];
        for row in 2..=v_dist {
            i += v_step;
            let class = mask[i as usize];
            let full = self.decay.curve(prev).full_tile();
            value *= if prev == solid && class != solid {
                exit * full
            } else {
                full
            };
            prev = class;
            working[row] = [value * self.decay.curve(class).at(self.spread.entry(row, 0).to_right); N];
        }

        for col in 1..=h_dist {
            let mut i = index as isize + h_step * col as isize;
            let class = mask[i as usize];
            let curve = self.decay.curve(class);

            let mut vertical;
            {
                let horizontal = &mut working[0];
                if col > 1 && class != solid && mask[(i - h_step) as usize] == solid {
                    scale_lanes(horizontal, exit);
                }
                let tick = curve.at(self.spread.entry(0, col).to_top);
                vertical = horizontal.map(|lane| lane * tick);
                scale_lanes(horizontal, curve.full_tile());
            }

            let edge = v_dist.min(circle[col]);
            let mut prev = class;
            for row in 1..=edge {
                i += v_step;
                let class = mask[i as usize];
                let mut horizontal = working[row];
                if class != solid {
                    if prev == solid {
                        scale_lanes(&mut vertical, exit);
                    }
                    if mask[(i - h_step) as usize] == solid {
                        scale_lanes(&mut horizontal, exit);
                    }
                }
                prev = class;

                let entry = self.spread.entry(row, col);
                let reach =
                    dot(&vertical, &entry.from_bottom) + dot(&horizontal, &entry.from_left);
                self.scratch[i as usize].max_blend(color * reach);

                let curve = self.decay.curve(class);
                let next_horizontal = transfer(
                    &horizontal,
                    &entry.right_from_left,
                    &vertical,
                    &entry.right_from_bottom,
                    curve.at(entry.to_right),
                );
                vertical = transfer(
                    &horizontal,
                    &entry.top_from_left,
                    &vertical,
                    &entry.top_from_bottom,
                    curve.at(entry.to_top),
                );
                working[row] = next_horizontal;
            }
        }
    }
}

#[inline]
fn dot<const N: usize>(lanes: &[f32; N], weights: &[f32; N]) -> f32 {
    let mut total = 0.0;
    for k in 0..N {
        total += lanes[k] * weights[k];
    }
    total
}

#[inline]
fn scale_lanes<const N: usize>(lanes: &mut [f32; N], factor: f32) {
    for lane in lanes.iter_mut() {
        *lane *= factor;
    }
}

/// Advance the running vectors across one boundary: each exit lane gathers
/// from both incoming edges through the transfer matrices, then pays the
/// partial-tile attenuation for the extra distance to that boundary.
#[inline]
fn transfer<const N: usize>(
    horizontal: &[f32; N],
    from_horizontal: &[[f32; N]; N],
    vertical: &[f32; N],
    from_vertical: &[[f32; N]; N],
    tick: f32,
) -> [f32; N] {
    let mut out = [0.0f32; N];
    for entry in 0..N {
        let h = horizontal[entry];
        let v = vertical[entry];
        for exit in 0..N {
            out[exit] += h * from_horizontal[entry][exit] + v * from_vertical[entry][exit];
        }
    }
    for lane in out.iter_mut() {
        *lane *= tick;
    }
    out
}
