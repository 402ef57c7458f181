use crate::core::neighbor::CellList;
use crate::core::particle::{Particle, Vec3};
use crate::core::resolved::ResolvedSystem;
use crate::error::{Error, Result};
use crate::kernel::{actions, Capabilities, ForceEvaluation, Kernel};
use rand::rngs::StdRng;

/// Sequential kernel; the baseline other kernels are compared against.
#[derive(Debug, Default)]
pub struct ReferenceKernel {
    neighbors: Option<CellList>,
}

impl ReferenceKernel {
    pub const NAME: &'static str = "reference-kernel";

    pub fn new() -> Self {
        Self::default()
    }
}

impl Kernel for ReferenceKernel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_run: true,
            supports_topologies: true,
            parallel_forces: false,
        }
    }

    fn initialize(&mut self, system: &ResolvedSystem) -> Result<()> {
        self.neighbors = Some(CellList::new(*system.geometry(), system.max_cutoff()));
        Ok(())
    }

    fn update_neighbor_list(&mut self, positions: &[Vec3]) -> Result<()> {
        let list = self
            .neighbors
            .as_mut()
            .ok_or_else(|| Error::precondition("kernel used before initialize"))?;
        list.rebuild(positions);
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
        actions::accumulate_forces(system, particles, self.neighbor_pairs(), bonds)
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
            .iter()
            .zip(forces)
            .zip(&noise)
            .map(|((p, f), xi)| actions::integrate_particle(system, p, f, xi, dt))
            .collect()
    }
}
