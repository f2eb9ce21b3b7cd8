//! Uniform grid over the world rectangle.
//!
//! Cells are laid out row-major (`index = row * cells_x + col`), rows along the
//! second plane axis. Besides the static cell geometry the grid keeps a
//! per-step occupancy table built with a counting sort, so every cell's agents
//! are one contiguous slice and a rebuild reuses the same buffers.

use crate::config::{self, SimConfigError};
use crate::math::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub index: usize,
    pub center: Vec2,
    /// Half of the cell size on each axis.
    pub extents: Vec2,
}

impl Cell {
    pub fn min(&self) -> Vec2 {
        [self.center[0] - self.extents[0], self.center[1] - self.extents[1]]
    }

    pub fn max(&self) -> Vec2 {
        [self.center[0] + self.extents[0], self.center[1] + self.extents[1]]
    }
}

#[derive(Clone, Debug)]
pub struct GridIndex {
    min: Vec2,
    max: Vec2,
    cells_x: usize,
    cells_z: usize,
    cell_size: Vec2,
    cells: Vec<Cell>,
    // Occupancy: agents of cell `c` are `slots[cell_start[c]..cell_start[c + 1]]`.
    cell_start: Vec<usize>,
    cursor: Vec<usize>,
    slots: Vec<usize>,
    slot_cells: Vec<usize>,
}

impl GridIndex {
    pub fn build(
        world_min: Vec2,
        world_max: Vec2,
        cells_x: usize,
        cells_z: usize,
    ) -> Result<Self, SimConfigError> {
        config::validate_bounds(world_min, world_max)?;
        config::validate_resolution(cells_x, cells_z)?;

        let cell_size = [
            (world_max[0] - world_min[0]) / cells_x as f64,
            (world_max[1] - world_min[1]) / cells_z as f64,
        ];
        let extents = [cell_size[0] * 0.5, cell_size[1] * 0.5];
        let count = cells_x * cells_z;
        let mut cells = Vec::with_capacity(count);
        for row in 0..cells_z {
            for col in 0..cells_x {
                cells.push(Cell {
                    index: row * cells_x + col,
                    center: [
                        world_min[0] + cell_size[0] * (col as f64 + 0.5),
                        world_min[1] + cell_size[1] * (row as f64 + 0.5),
                    ],
                    extents,
                });
            }
        }

        Ok(Self {
            min: world_min,
            max: world_max,
            cells_x,
            cells_z,
            cell_size,
            cells,
            cell_start: vec![0; count + 1],
            cursor: vec![0; count],
            slots: Vec::new(),
            slot_cells: Vec::new(),
        })
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// `(cells_x, cells_z)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.cells_x, self.cells_z)
    }

    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.min, self.max)
    }

    #[inline]
    fn axis_index(value: f64, min: f64, size: f64, count: usize) -> usize {
        // NaN.max(0.0) is 0.0 and float->usize casts saturate, so this never panics.
        (((value - min) / size).max(0.0) as usize).min(count - 1)
    }

    /// `(col, row)` of the cell containing `position`, clamped to the grid.
    #[inline]
    pub fn cell_coords(&self, position: Vec2) -> (usize, usize) {
        (
            Self::axis_index(position[0], self.min[0], self.cell_size[0], self.cells_x),
            Self::axis_index(position[1], self.min[1], self.cell_size[1], self.cells_z),
        )
    }

    #[inline]
    pub fn cell_of(&self, position: Vec2) -> usize {
        let (col, row) = self.cell_coords(position);
        row * self.cells_x + col
    }

    /// Cells overlapping the bounding box of the circle at `position`.
    pub fn cell_span(&self, position: Vec2, radius: f64) -> CellSpan {
        let r = if radius.is_finite() && radius > 0.0 {
            radius
        } else {
            0.0
        };
        let (col_min, row_min) = self.cell_coords([position[0] - r, position[1] - r]);
        let (col_max, row_max) = self.cell_coords([position[0] + r, position[1] + r]);
        CellSpan {
            cells_x: self.cells_x,
            col_min,
            col_max,
            row_max,
            col: col_min,
            row: row_min,
        }
    }

    pub fn query_radius(&self, position: Vec2, radius: f64) -> Vec<usize> {
        self.cell_span(position, radius).collect()
    }

    /// Re-bin agent slots by position. Slot `i` is the `i`-th yielded position.
    pub fn rebuild<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = Vec2>,
    {
        self.cell_start.fill(0);
        self.slot_cells.clear();
        for position in positions {
            let cell = self.cell_of(position);
            self.slot_cells.push(cell);
            self.cell_start[cell + 1] += 1;
        }
        for c in 0..self.cells.len() {
            self.cell_start[c + 1] += self.cell_start[c];
        }
        self.cursor.copy_from_slice(&self.cell_start[..self.cells.len()]);
        self.slots.resize(self.slot_cells.len(), 0);
        for (slot, &cell) in self.slot_cells.iter().enumerate() {
            self.slots[self.cursor[cell]] = slot;
            self.cursor[cell] += 1;
        }
    }

    /// Slots binned into `cell` by the last `rebuild`, ascending.
    pub fn agents_in(&self, cell: usize) -> &[usize] {
        match (self.cell_start.get(cell), self.cell_start.get(cell + 1)) {
            (Some(&start), Some(&end)) => &self.slots[start..end],
            _ => &[],
        }
    }

    pub fn occupied_slots(&self) -> usize {
        self.slots.len()
    }
}

/// Row-major iterator over a rectangular block of cell indices.
#[derive(Clone, Debug)]
pub struct CellSpan {
    cells_x: usize,
    col_min: usize,
    col_max: usize,
    row_max: usize,
    col: usize,
    row: usize,
}

impl Iterator for CellSpan {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.row > self.row_max {
            return None;
        }
        let index = self.row * self.cells_x + self.col;
        if self.col == self.col_max {
            self.col = self.col_min;
            self.row += 1;
        } else {
            self.col += 1;
        }
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;
    use std::collections::HashSet;

    #[test]
    fn two_by_two_grid_has_expected_cells() {
        let grid = GridIndex::build([0.0, 0.0], [10.0, 10.0], 2, 2).unwrap();
        let centers: Vec<Vec2> = grid.cells().iter().map(|c| c.center).collect();
        assert_eq!(
            centers,
            vec![[2.5, 2.5], [7.5, 2.5], [2.5, 7.5], [7.5, 7.5]]
        );
        assert!(grid.cells().iter().all(|c| c.extents == [2.5, 2.5]));
        assert_eq!(grid.cell_size(), [5.0, 5.0]);
    }

    #[test]
    fn building_twice_is_identical() {
        let a = GridIndex::build([-3.0, 1.0], [17.0, 9.5], 7, 3).unwrap();
        let b = GridIndex::build([-3.0, 1.0], [17.0, 9.5], 7, 3).unwrap();
        assert_eq!(a.cells(), b.cells());
    }

    #[test]
    fn cells_tile_the_world_without_gaps() {
        let grid = GridIndex::build([-3.0, 1.0], [17.0, 9.5], 7, 3).unwrap();
        let (cx, cz) = grid.dims();
        for row in 0..cz {
            for col in 0..cx {
                let cell = grid.cells()[row * cx + col];
                assert_eq!(cell.index, row * cx + col);
                if col + 1 < cx {
                    let right = grid.cells()[row * cx + col + 1];
                    assert!((cell.max()[0] - right.min()[0]).abs() < 1e-9);
                }
                if row + 1 < cz {
                    let up = grid.cells()[(row + 1) * cx + col];
                    assert!((cell.max()[1] - up.min()[1]).abs() < 1e-9);
                }
            }
        }
        let first = grid.cells()[0];
        let last = grid.cells()[cx * cz - 1];
        assert!((first.min()[0] + 3.0).abs() < 1e-9 && (first.min()[1] - 1.0).abs() < 1e-9);
        assert!((last.max()[0] - 17.0).abs() < 1e-9 && (last.max()[1] - 9.5).abs() < 1e-9);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(GridIndex::build([0.0, 0.0], [0.0, 10.0], 2, 2).is_err());
        assert!(GridIndex::build([0.0, 0.0], [10.0, 10.0], 0, 2).is_err());
        assert!(GridIndex::build([0.0, f64::NAN], [10.0, 10.0], 2, 2).is_err());
    }

    #[test]
    fn cell_of_clamps_out_of_bounds_positions() {
        let grid = GridIndex::build([0.0, 0.0], [10.0, 10.0], 2, 2).unwrap();
        assert_eq!(grid.cell_of([1.0, 1.0]), 0);
        assert_eq!(grid.cell_of([6.0, 1.0]), 1);
        assert_eq!(grid.cell_of([1.0, 6.0]), 2);
        assert_eq!(grid.cell_of([10.0, 10.0]), 3);
        assert_eq!(grid.cell_of([-50.0, -50.0]), 0);
        assert_eq!(grid.cell_of([1e300, -1.0]), 1);
        assert_eq!(grid.cell_of([f64::NAN, f64::INFINITY]), 2);
    }

    #[test]
    fn query_radius_covers_circle_bounding_box() {
        let grid = GridIndex::build([0.0, 0.0], [10.0, 10.0], 10, 10).unwrap();
        let mut cells = grid.query_radius([5.5, 5.5], 1.0);
        cells.sort_unstable();
        assert_eq!(cells, vec![44, 45, 46, 54, 55, 56, 64, 65, 66]);
        assert_eq!(grid.query_radius([0.2, 0.2], 0.0), vec![0]);
        let all = grid.query_radius([5.0, 5.0], 100.0);
        assert_eq!(all.len(), 100);
    }

    #[test]
    fn rebuild_bins_every_slot_once() {
        let mut grid = GridIndex::build([0.0, 0.0], [10.0, 10.0], 2, 2).unwrap();
        grid.rebuild([[1.0, 1.0], [9.0, 1.0], [2.0, 2.0], [9.0, 9.0]]);
        assert_eq!(grid.agents_in(0), &[0, 2]);
        assert_eq!(grid.agents_in(1), &[1]);
        assert!(grid.agents_in(2).is_empty());
        assert_eq!(grid.agents_in(3), &[3]);
        assert!(grid.agents_in(99).is_empty());

        grid.rebuild([[9.0, 9.0]]);
        assert!(grid.agents_in(0).is_empty());
        assert_eq!(grid.agents_in(3), &[0]);
        assert_eq!(grid.occupied_slots(), 1);
    }

    #[test]
    fn grid_candidates_are_a_superset_of_brute_force() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let mut grid = GridIndex::build([0.0, 0.0], [50.0, 30.0], 8, 5).unwrap();
        let positions: Vec<Vec2> = (0..400)
            .map(|_| [rng.random_range(0.0..50.0), rng.random_range(0.0..30.0)])
            .collect();
        grid.rebuild(positions.iter().copied());

        for _ in 0..50 {
            let center = [rng.random_range(-5.0..55.0), rng.random_range(-5.0..35.0)];
            let radius = rng.random_range(0.0..12.0);
            let candidates: HashSet<usize> = grid
                .cell_span(center, radius)
                .flat_map(|c| grid.agents_in(c).iter().copied())
                .collect();
            for (slot, p) in positions.iter().enumerate() {
                if math::distance_sq(*p, center) <= radius * radius {
                    assert!(candidates.contains(&slot), "slot {slot} missing");
                }
            }
        }
    }
}
