use crate::core::neighbor::CellList;
use crate::core::particle::{add, sub, Particle, Vec3};
use crate::core::resolved::ResolvedSystem;
use crate::error::{Error, Result};
use crate::kernel::{actions, Capabilities, ForceEvaluation, Kernel};
use rand::rngs::StdRng;
use rayon::prelude::*;

/// Multi-threaded kernel.
///
/// Pair and bond terms are evaluated in parallel, then every particle sums its own terms
/// (partitioned accumulation, no shared writes). Noise is drawn sequentially from the
/// simulation RNG before the parallel integration, so trajectories match
/// [`ReferenceKernel`](crate::kernel::ReferenceKernel) for the same seed.
#[derive(Debug, Default)]
pub struct CpuKernel {
    neighbors: Option<CellList>,
    /// Pair indices per particle.
    adjacency: Vec<Vec<usize>>,
}

impl CpuKernel {
    pub const NAME: &'static str = "cpu";

    pub fn new() -> Self {
        Self::default()
    }
}

fn bond_adjacency(n: usize, bonds: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut adj = vec![Vec::new(); n];
    for (k, &(i, j)) in bonds.iter().enumerate() {
        adj[i].push(k);
        adj[j].push(k);
    }
    adj
}

/// Apply the terms listed in `adjacent` to particle `i`: `-g` as first member, `+g` as second.
fn gather(
    i: usize,
    f: Vec3,
    adjacent: &[usize],
    pairs: &[(usize, usize)],
    terms: &[(Vec3, f64)],
) -> Vec3 {
    adjacent.iter().fold(f, |f, &k| {
        let g = &terms[k].0;
        if pairs[k].0 == i {
            sub(&f, g)
        } else {
            add(&f, g)
        }
    })
}

impl Kernel for CpuKernel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_run: true,
            supports_topologies: true,
            parallel_forces: true,
        }
    }

    fn initialize(&mut self, system: &ResolvedSystem) -> Result<()> {
        self.neighbors = Some(CellList::new(*system.geometry(), system.max_cutoff()));
        self.adjacency.clear();
        Ok(())
    }

    fn update_neighbor_list(&mut self, positions: &[Vec3]) -> Result<()> {
        let list = self
            .neighbors
            .as_mut()
            .ok_or_else(|| Error::precondition("kernel used before initialize"))?;
        list.rebuild(positions);
        self.adjacency = list.adjacency(positions.len());
        Ok(())
    }

    fn neighbor_pairs(&self) -> &[(usize, usize)] {
        match &self.neighbors {
            Some(list) => list.pairs(),
            None => &[],
        }
    }

    fn calculate_forces(
        &self,
        system: &ResolvedSystem,
        particles: &[Particle],
        bonds: &[(usize, usize)],
    ) -> Result<ForceEvaluation> {
        let pairs = self.neighbor_pairs();
        if self.adjacency.len() != particles.len() {
            return Err(Error::precondition(
                "neighbor list is stale; update it before calculating forces",
            ));
        }
        let pair_terms: Vec<(Vec3, f64)> = if system.has_pair_potentials() {
            pairs
                .par_iter()
                .map(|&pair| actions::pair_term(system, particles, pair))
                .collect::<Result<_>>()?
        } else {
            Vec::new()
        };
        let bond_terms: Vec<(Vec3, f64)> = bonds
            .par_iter()
            .map(|&bond| actions::bond_term(system, particles, bond))
            .collect::<Result<_>>()?;
        let bond_adj = bond_adjacency(particles.len(), bonds);

        let per_particle: Vec<(Vec3, f64)> = particles
            .par_iter()
            .enumerate()
            .map(|(i, p)| {
                let (mut f, e) = actions::external_term(system, p);
                if !pair_terms.is_empty() {
                    f = gather(i, f, &self.adjacency[i], pairs, &pair_terms);
                }
                f = gather(i, f, &bond_adj[i], bonds, &bond_terms);
                (f, e)
            })
            .collect();

        // Same summation order as the sequential kernel.
        let potential_energy = per_particle
            .iter()
            .chain(&pair_terms)
            .chain(&bond_terms)
            .fold(0.0, |acc, t| acc + t.1);
        Ok(ForceEvaluation {
            forces: per_particle.into_iter().map(|t| t.0).collect(),
            potential_energy,
        })
    }

    fn integrate(
        &self,
        system: &ResolvedSystem,
        particles: &[Particle],
        forces: &[Vec3],
        dt: f64,
        rng: &mut StdRng,
    ) -> Result<Vec<Vec3>> {
        let noise = actions::draw_noise(rng, particles.len());
        particles
            .par_iter()
            .zip(forces.par_iter())
            .zip(noise.par_iter())
            .map(|((p, f), xi)| actions::integrate_particle(system, p, f, xi, dt))
            .collect()
    }
}
