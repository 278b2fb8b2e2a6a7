//! Precomputed boundary-crossing geometry.
//!
//! For every integer displacement (Δrow, Δcol) from a light source the table
//! stores how light entering that tile through its bottom and left edges
//! redistributes to its top and right edges, plus the quantized extra
//! Euclidean distance traveled when exiting through each of them.
//!
//! Each incoming edge is discretized into `N` sub-segments (lanes). The
//! coefficients come from exact ray geometry, not simulation: a ray from the
//! source corner sweeps the tile, and the area it cuts off serves as a mass
//! coordinate along the tile boundary. Lane order is chosen so that exit lane
//! `k` of one tile feeds entry lane `k` of the next: left-edge lanes run
//! bottom to top, bottom-edge lanes left to right, top exits left to right,
//! right exits bottom to top.

use std::time::Instant;

use crate::engine::decay::DISTANCE_TICKS;

/// Spread coefficients for one (Δrow, Δcol) displacement.
///
/// Axis entries (Δrow == 0 or Δcol == 0) only carry the distance ticks; their
/// coefficient blocks are zero and never read. Transfer matrices are indexed
/// `[entry lane][exit lane]`, and each exit lane's incoming coefficients sum
/// to one over both matrices feeding it.
#[derive(Debug, Clone, Copy)]
pub struct SpreadEntry<const N: usize> {
    /// Extra distance (ticks) traveled by light exiting through the top edge.
    pub to_top: u16,
    /// Extra distance (ticks) traveled by light exiting through the right edge.
    pub to_right: u16,
    /// Share of the tile's total incoming light entering each left-edge lane.
    pub from_left: [f32; N],
    /// Share of the tile's total incoming light entering each bottom-edge lane.
    pub from_bottom: [f32; N],
    pub top_from_left: [[f32; N]; N],
    pub top_from_bottom: [[f32; N]; N],
    pub right_from_left: [[f32; N]; N],
    pub right_from_bottom: [[f32; N]; N],
}

impl<const N: usize> SpreadEntry<N> {
    fn trivial(to_top: u16, to_right: u16) -> Self {
        SpreadEntry {
            to_top,
            to_right,
            from_left: [0.0; N],
            from_bottom: [0.0; N],
            top_from_left: [[0.0; N]; N],
            top_from_bottom: [[0.0; N]; N],
            right_from_left: [[0.0; N]; N],
            right_from_bottom: [[0.0; N]; N],
        }
    }
}

/// Table of [`SpreadEntry`] values for all displacements up to the maximum
/// light range. Built once per (resolution, range) and immutable afterwards.
pub struct SpreadTable<const N: usize> {
    entries: Vec<SpreadEntry<N>>,
    stride: usize,
}

/// Accumulated exit distances for one row of the previous column, used to
/// correct quantization drift in long-range falloff.
#[derive(Clone, Copy, Default)]
struct DistanceCache {
    top: f64,
    right: f64,
}

impl<const N: usize> SpreadTable<N> {
    /// Build the table for displacements in `[0, max_range]²`. Axis rows and
    /// columns are filled first (their coefficients are unused), then the
    /// interior by increasing Δcol so each tile can correct against the
    /// accumulated distances of the tiles feeding it.
    pub fn build(max_range: usize) -> Self {
        let start = Instant::now();
        let stride = max_range + 1;
        let mut entries = vec![SpreadEntry::trivial(0, 0); stride * stride];
        let mut distances = vec![DistanceCache::default(); stride];
        let ticks = DISTANCE_TICKS as f64;

        for row in 0..=max_range {
            let entry = tile_spread::<N>(row, 0, 0.0, 0.0);
            distances[row] = DistanceCache {
                top: row as f64 + 1.0,
                right: row as f64 + entry.to_right as f64 / ticks,
            };
            entries[row] = entry;
        }

        for col in 1..=max_range {
            let entry = tile_spread::<N>(0, col, 0.0, 0.0);
            distances[0] = DistanceCache {
                top: col as f64 + entry.to_top as f64 / ticks,
                right: col as f64 + 1.0,
            };
            entries[col * stride] = entry;

            for row in 1..=max_range {
                let distance = (col as f64).hypot(row as f64);
                let entry = tile_spread::<N>(
                    row,
                    col,
                    distances[row].right - distance,
                    distances[row - 1].top - distance,
                );

                // Average share of each exit's light arriving from the left
                // and bottom edges, used to carry the accumulated distances
                // forward.
                let top_left = matrix_avg(&entry.top_from_left);
                let top_bottom = matrix_avg(&entry.top_from_bottom);
                let right_left = matrix_avg(&entry.right_from_left);
                let right_bottom = matrix_avg(&entry.right_from_bottom);

                distances[row] = DistanceCache {
                    top: entry.to_top as f64 / ticks
                        + top_left * distances[row].right
                        + top_bottom * distances[row - 1].top,
                    right: entry.to_right as f64 / ticks
                        + right_left * distances[row].right
                        + right_bottom * distances[row - 1].top,
                };
                entries[col * stride + row] = entry;
            }
        }

        log::info!(
            "built {N}x spread table for range {max_range} in {:?}",
            start.elapsed()
        );
        SpreadTable { entries, stride }
    }

    #[inline]
    pub fn entry(&self, d_row: usize, d_col: usize) -> &SpreadEntry<N> {
        &self.entries[d_col * self.stride + d_row]
    }
}

/// Spread geometry for the tile `[col, col+1] x [row, row+1]` with the light
/// source at the origin. The distance errors are quantization drift carried
/// in from the tiles feeding this one, subtracted from the raw geometric
/// distances weighted by how much of each exit's light they supply.
fn tile_spread<const N: usize>(
    row: usize,
    col: usize,
    left_error: f64,
    bottom_error: f64,
) -> SpreadEntry<N> {
    let rowf = row as f64;
    let colf = col as f64;
    let distance = colf.hypot(rowf);
    let mut to_top = colf.hypot(rowf + 1.0) - distance;
    let mut to_right = (colf + 1.0).hypot(rowf) - distance;

    if row == 0 || col == 0 {
        return SpreadEntry::trivial(to_ticks(to_top), to_ticks(to_right));
    }

    let lanes = N as f64;

    // Mass coordinates of the lane boundaries. `cut_area` is strictly
    // monotone along each boundary, and a ray's cut area is identical at its
    // entry and exit points, so overlaps in this coordinate are exactly the
    // light masses exchanged between lanes.
    //
    // Entry boundary, ordered by increasing mass: bottom edge right to left,
    // then left edge bottom to top.
    let mut entry_mass = [0.0f64; 16];
    for k in 0..=N {
        entry_mass[k] = cut_area(rowf, colf, colf + 1.0 - k as f64 / lanes, rowf);
    }
    for k in 1..=N {
        entry_mass[N + k] = cut_area(rowf, colf, colf, rowf + k as f64 / lanes);
    }
    // Exit boundary: right edge bottom to top, then top edge right to left.
    let mut exit_mass = [0.0f64; 16];
    for k in 0..=N {
        exit_mass[k] = cut_area(rowf, colf, colf + 1.0, rowf + k as f64 / lanes);
    }
    for k in 1..=N {
        exit_mass[N + k] = cut_area(rowf, colf, colf + 1.0 - k as f64 / lanes, rowf + 1.0);
    }

    // Lane intervals in the mass coordinate, in the table's lane order.
    let bottom = |lane: usize| (entry_mass[N - lane - 1], entry_mass[N - lane]);
    let left = |lane: usize| (entry_mass[N + lane], entry_mass[N + lane + 1]);
    let right = |lane: usize| (exit_mass[lane], exit_mass[lane + 1]);
    let top = |lane: usize| (exit_mass[2 * N - lane - 1], exit_mass[2 * N - lane]);

    let mut from_left = [0.0f32; N];
    let mut from_bottom = [0.0f32; N];
    for lane in 0..N {
        let (l0, l1) = left(lane);
        let (b0, b1) = bottom(lane);
        from_left[lane] = (l1 - l0) as f32;
        from_bottom[lane] = (b1 - b0) as f32;
    }

    // Transfer coefficient = overlap of the entry and exit intervals,
    // normalized by the exit lane's width so an unobstructed tile carries
    // lane attenuation through unchanged.
    let coefficient = |entry: (f64, f64), exit: (f64, f64)| -> f64 {
        let width = exit.1 - exit.0;
        if width <= f64::EPSILON {
            return 0.0;
        }
        (entry.1.min(exit.1) - entry.0.max(exit.0)).max(0.0) / width
    };

    let mut top_from_left = [[0.0f32; N]; N];
    let mut top_from_bottom = [[0.0f32; N]; N];
    let mut right_from_left = [[0.0f32; N]; N];
    let mut right_from_bottom = [[0.0f32; N]; N];
    let mut sums = [0.0f64; 4];
    for entry in 0..N {
        for exit in 0..N {
            let tl = coefficient(left(entry), top(exit));
            let tb = coefficient(bottom(entry), top(exit));
            let rl = coefficient(left(entry), right(exit));
            let rb = coefficient(bottom(entry), right(exit));
            top_from_left[entry][exit] = tl as f32;
            top_from_bottom[entry][exit] = tb as f32;
            right_from_left[entry][exit] = rl as f32;
            right_from_bottom[entry][exit] = rb as f32;
            sums[0] += tl;
            sums[1] += tb;
            sums[2] += rl;
            sums[3] += rb;
        }
    }

    to_top -= sums[0] / lanes * left_error + sums[1] / lanes * bottom_error;
    to_right -= sums[2] / lanes * left_error + sums[3] / lanes * bottom_error;

    SpreadEntry {
        to_top: to_ticks(to_top),
        to_right: to_ticks(to_right),
        from_left,
        from_bottom,
        top_from_left,
        top_from_bottom,
        right_from_left,
        right_from_bottom,
    }
}

/// Area of the tile `[col, col+1] x [row, row+1]` on the near side of the ray
/// from the origin through `(px, py)`. Strictly increasing as the ray sweeps
/// from the tile's bottom-right corner to its top-left corner.
fn cut_area(row: f64, col: f64, px: f64, py: f64) -> f64 {
    let slope = py / px;
    let x0 = (row / slope).clamp(col, col + 1.0);
    let x1 = ((row + 1.0) / slope).clamp(col, col + 1.0);
    0.5 * slope * (x1 * x1 - x0 * x0) - row * (x1 - x0) + (col + 1.0 - x1)
}

fn matrix_avg<const N: usize>(matrix: &[[f32; N]; N]) -> f64 {
    let mut total = 0.0f64;
    for entry in matrix {
        for &value in entry {
            total += value as f64;
        }
    }
    total / N as f64
}

fn to_ticks(distance: f64) -> u16 {
    (DISTANCE_TICKS as f64 * distance).round().clamp(0.0, DISTANCE_TICKS as f64) as u16
}
