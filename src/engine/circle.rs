//! Quadrant sweep culling table.
//!
//! For each light radius this precomputes how far the quadrant sweep may
//! extend in the orthogonal axis while staying within an approximately
//! circular radius. Purely a performance bound: omitting it would change
//! runtime, never output, because cells outside the circle only ever receive
//! sub-cutoff light.

/// Per-radius orthogonal extents: `row(r)[x]` is the largest `y` with
/// `x² + y² <= r²`.
pub struct CircleTable {
    rows: Vec<Vec<usize>>,
}

impl CircleTable {
    pub fn build(max_range: usize) -> Self {
        let rows = (0..=max_range)
            .map(|radius| {
                let rr = (radius * radius) as f64;
                (0..=radius)
                    .map(|x| (rr - (x * x) as f64).sqrt().floor() as usize)
                    .collect()
            })
            .collect();
        CircleTable { rows }
    }

    #[inline]
    pub fn row(&self, radius: usize) -> &[usize] {
        &self.rows[radius]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extents_stay_within_radius() {
        let table = CircleTable::build(32);
        for radius in 0..=32usize {
            let row = table.row(radius);
            assert_eq!(row.len(), radius + 1);
            for (x, &y) in row.iter().enumerate() {
                assert!(
                    x * x + y * y <= radius * radius,
                    "({x}, {y}) escapes radius {radius}"
                );
                // y is the largest such extent
                assert!(x * x + (y + 1) * (y + 1) > radius * radius);
            }
        }
    }

    #[test]
    fn test_axis_extent_is_full_radius() {
        let table = CircleTable::build(16);
        for radius in 0..=16 {
            assert_eq!(table.row(radius)[0], radius);
        }
    }
}
