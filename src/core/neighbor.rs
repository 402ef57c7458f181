//! Cell-decomposition neighbor search.
//!
//! The box is split into cells no narrower than the cutoff, so every pair within the
//! cutoff lives in the same or an adjacent cell. Small cutoffs in large boxes get wider
//! cells than needed: at most [`MAX_CELLS_PER_AXIS`] cells per axis. Adjacency wraps on
//! periodic axes.
//! Particles outside the box on a non-periodic axis are clamped into the border cells.

use crate::core::geometry::BoxGeometry;
use crate::core::particle::{Vec3, DIM};
use tracing::debug;

/// Upper bound on the cell count along one axis.
pub const MAX_CELLS_PER_AXIS: usize = 32;

#[derive(Debug, Clone)]
pub struct CellList {
    geometry: BoxGeometry,
    cutoff: f64,
    n_cells: [usize; DIM],
    cell_width: Vec3,
    /// Particle indices per cell, rebuilt on every [`CellList::rebuild`].
    cells: Vec<Vec<usize>>,
    /// Adjacent cells (including the cell itself), deduplicated.
    adjacent: Vec<Vec<usize>>,
    /// Unordered pairs `(i, j)`, `i < j`, closer than the cutoff.
    pairs: Vec<(usize, usize)>,
}

impl CellList {
    pub fn new(geometry: BoxGeometry, cutoff: f64) -> Self {
        let mut n_cells = [1usize; DIM];
        let mut cell_width = geometry.size;
        if cutoff > 0.0 {
            for k in 0..DIM {
                let n = (geometry.size[k] / cutoff)
                    .floor()
                    .min(MAX_CELLS_PER_AXIS as f64);
                n_cells[k] = if n >= 1.0 { n as usize } else { 1 };
                cell_width[k] = geometry.size[k] / n_cells[k] as f64;
            }
        }
        let total = n_cells.iter().product();
        let mut list = Self {
            geometry,
            cutoff,
            n_cells,
            cell_width,
            cells: vec![Vec::new(); total],
            adjacent: Vec::with_capacity(total),
            pairs: Vec::new(),
        };
        list.adjacent = (0..total).map(|c| list.adjacent_cells(c)).collect();
        debug!(cutoff, ?n_cells, "cell list allocated");
        list
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn n_cells(&self) -> [usize; DIM] {
        self.n_cells
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Recompute the cell occupancy and the pair list for `positions`.
    pub fn rebuild(&mut self, positions: &[Vec3]) {
        self.pairs.clear();
        for cell in &mut self.cells {
            cell.clear();
        }
        if self.cutoff <= 0.0 {
            return;
        }
        let mut cell_of = Vec::with_capacity(positions.len());
        for (i, x) in positions.iter().enumerate() {
            let c = self.cell_index(x);
            self.cells[c].push(i);
            cell_of.push(c);
        }
        let cutoff_sq = self.cutoff * self.cutoff;
        for (i, x_i) in positions.iter().enumerate() {
            for &nc in &self.adjacent[cell_of[i]] {
                for &j in &self.cells[nc] {
                    if j <= i {
                        continue;
                    }
                    if self.geometry.distance_squared(x_i, &positions[j]) <= cutoff_sq {
                        self.pairs.push((i, j));
                    }
                }
            }
        }
    }

    /// Symmetric adjacency: for each particle, the indices into [`CellList::pairs`] of the
    /// pairs it belongs to.
    pub fn adjacency(&self, n_particles: usize) -> Vec<Vec<usize>> {
        let mut adj = vec![Vec::new(); n_particles];
        for (k, &(i, j)) in self.pairs.iter().enumerate() {
            adj[i].push(k);
            adj[j].push(k);
        }
        adj
    }

    fn cell_index(&self, x: &Vec3) -> usize {
        let mut idx = [0usize; DIM];
        for k in 0..DIM {
            let shifted = (x[k] + 0.5 * self.geometry.size[k]) / self.cell_width[k];
            let c = shifted.floor();
            let n = self.n_cells[k] as f64;
            idx[k] = if c < 0.0 {
                0
            } else if c >= n {
                self.n_cells[k] - 1
            } else {
                c as usize
            };
        }
        self.flatten(idx)
    }

    fn flatten(&self, idx: [usize; DIM]) -> usize {
        (idx[0] * self.n_cells[1] + idx[1]) * self.n_cells[2] + idx[2]
    }

    fn unflatten(&self, c: usize) -> [usize; DIM] {
        let z = c % self.n_cells[2];
        let y = (c / self.n_cells[2]) % self.n_cells[1];
        let x = c / (self.n_cells[1] * self.n_cells[2]);
        [x, y, z]
    }

    fn adjacent_cells(&self, c: usize) -> Vec<usize> {
        let base = self.unflatten(c);
        let mut per_axis: [Vec<usize>; DIM] = Default::default();
        for k in 0..DIM {
            let n = self.n_cells[k] as isize;
            for off in -1isize..=1 {
                let mut i = base[k] as isize + off;
                if self.geometry.periodic[k] {
                    i = i.rem_euclid(n);
                } else if i < 0 || i >= n {
                    continue;
                }
                let i = i as usize;
                if !per_axis[k].contains(&i) {
                    per_axis[k].push(i);
                }
            }
        }
        let mut out = Vec::with_capacity(27);
        for &x in &per_axis[0] {
            for &y in &per_axis[1] {
                for &z in &per_axis[2] {
                    out.push(self.flatten([x, y, z]));
                }
            }
        }
        out
    }
}
