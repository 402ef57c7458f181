//! Static configuration of a reaction-diffusion system.

use crate::core::compartment::CompartmentRegistry;
use crate::core::geometry::BoxGeometry;
use crate::core::input::ArrayLike;
use crate::core::particle::{ParticleTypeFlavor, ParticleTypeTable, TypeId, Vec3, DIM};
use crate::core::potential::PotentialRegistry;
use crate::core::reaction::ReactionRegistry;
use crate::core::resolved::ResolvedSystem;
use crate::core::sim::Simulation;
use crate::core::topology::TopologyRegistry;
use crate::error::{Error, Result};
use crate::kernel::KernelRegistry;
use tracing::debug;

/// Geometry, thermodynamics, species and interactions of a system.
///
/// The registries refer to species by name. Names are resolved by [`Context::configure`],
/// so interactions may be registered before the species they mention.
#[derive(Debug, Clone)]
pub struct Context {
    box_size: Vec3,
    periodic: [bool; DIM],
    kbt: f64,
    particle_types: ParticleTypeTable,
    potentials: PotentialRegistry,
    reactions: ReactionRegistry,
    topologies: TopologyRegistry,
    compartments: CompartmentRegistry,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            box_size: [1.0; DIM],
            periodic: [true; DIM],
            kbt: 1.0,
            particle_types: ParticleTypeTable::new(),
            potentials: PotentialRegistry::new(),
            reactions: ReactionRegistry::new(),
            topologies: TopologyRegistry::new(),
            compartments: CompartmentRegistry::new(),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn box_size(&self) -> Vec3 {
        self.box_size
    }

    /// Set the box edge lengths from a 3-sequence or a squeezable `(3,)` array.
    ///
    /// Errors:
    /// - `Error::InvalidConfiguration` for a wrong shape or a non-finite or non-positive edge.
    pub fn set_box_size(&mut self, input: impl Into<ArrayLike<f64>>) -> Result<()> {
        let size = input.into().into_vec3("box_size")?;
        if let Some(bad) = size.iter().find(|l| !l.is_finite() || **l <= 0.0) {
            return Err(Error::config(format!(
                "box_size components must be finite and > 0, got {bad}"
            )));
        }
        self.box_size = size;
        Ok(())
    }

    pub fn periodic_boundary_conditions(&self) -> [bool; DIM] {
        self.periodic
    }

    pub fn set_periodic_boundary_conditions(
        &mut self,
        input: impl Into<ArrayLike<bool>>,
    ) -> Result<()> {
        self.periodic = input.into().into_vec3("periodic_boundary_conditions")?;
        Ok(())
    }

    pub fn kbt(&self) -> f64 {
        self.kbt
    }

    /// Thermal energy. Negative values are only rejected when a simulation is prepared.
    pub fn set_kbt(&mut self, kbt: f64) -> Result<()> {
        if !kbt.is_finite() {
            return Err(Error::config(format!("kbt must be finite, got {kbt}")));
        }
        self.kbt = kbt;
        Ok(())
    }

    pub fn box_volume(&self) -> f64 {
        self.geometry().volume()
    }

    pub fn geometry(&self) -> BoxGeometry {
        BoxGeometry::new(self.box_size, self.periodic)
    }

    pub fn add_species(&mut self, name: &str, diffusion_constant: f64) -> Result<TypeId> {
        self.particle_types
            .add(name, diffusion_constant, ParticleTypeFlavor::Normal)
    }

    pub fn add_topology_species(&mut self, name: &str, diffusion_constant: f64) -> Result<TypeId> {
        self.particle_types
            .add(name, diffusion_constant, ParticleTypeFlavor::Topology)
    }

    /// Species names in registration order.
    pub fn registered_species(&self) -> Vec<String> {
        self.particle_types.names()
    }

    pub fn particle_types(&self) -> &ParticleTypeTable {
        &self.particle_types
    }

    pub fn potentials(&self) -> &PotentialRegistry {
        &self.potentials
    }

    pub fn potentials_mut(&mut self) -> &mut PotentialRegistry {
        &mut self.potentials
    }

    pub fn reactions(&self) -> &ReactionRegistry {
        &self.reactions
    }

    pub fn reactions_mut(&mut self) -> &mut ReactionRegistry {
        &mut self.reactions
    }

    pub fn topologies(&self) -> &TopologyRegistry {
        &self.topologies
    }

    pub fn topologies_mut(&mut self) -> &mut TopologyRegistry {
        &mut self.topologies
    }

    pub fn compartments(&self) -> &CompartmentRegistry {
        &self.compartments
    }

    pub fn compartments_mut(&mut self) -> &mut CompartmentRegistry {
        &mut self.compartments
    }

    /// Validate cross references and resolve species names to type ids.
    ///
    /// Does not allocate any neighbor structure; safe to call repeatedly.
    pub fn configure(&self) -> Result<ResolvedSystem> {
        let system = ResolvedSystem::resolve(self)?;
        debug!(
            n_types = system.types().len(),
            max_cutoff = system.max_cutoff(),
            "context configured"
        );
        Ok(system)
    }

    /// Largest interaction distance of the current configuration.
    ///
    /// Runs [`Context::configure`] first, so it fails on dangling species references.
    pub fn calculate_max_cutoff(&self) -> Result<f64> {
        Ok(self.configure()?.max_cutoff())
    }

    /// Create a simulation bound to the kernel `kernel_name`, holding a snapshot of `self`.
    pub fn simulation(&self, registry: &KernelRegistry, kernel_name: &str) -> Result<Simulation> {
        let mut sim = Simulation::new(self.clone());
        sim.select_kernel(registry, kernel_name)?;
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let ctx = Context::new();
        assert_eq!(ctx.box_size(), [1.0; DIM]);
        assert_eq!(ctx.periodic_boundary_conditions(), [true; DIM]);
        assert_eq!(ctx.kbt(), 1.0);
        assert_eq!(ctx.box_volume(), 1.0);
        assert!(ctx.registered_species().is_empty());
    }

    #[test]
    fn box_size_rejects_bad_values_and_keeps_old() -> Result<()> {
        let mut ctx = Context::new();
        ctx.set_box_size(vec![2.0, 3.0, 4.0])?;
        assert!(ctx.set_box_size(vec![1.0, 2.0]).is_err());
        assert!(ctx.set_box_size([1.0, -2.0, 3.0]).is_err());
        assert!(ctx.set_box_size([1.0, f64::NAN, 3.0]).is_err());
        assert_eq!(ctx.box_size(), [2.0, 3.0, 4.0]);
        assert_eq!(ctx.box_volume(), 24.0);
        Ok(())
    }

    #[test]
    fn kbt_accepts_negative_but_not_nan() -> Result<()> {
        let mut ctx = Context::new();
        ctx.set_kbt(-1.0)?;
        assert_eq!(ctx.kbt(), -1.0);
        assert!(ctx.set_kbt(f64::INFINITY).is_err());
        Ok(())
    }

    #[test]
    fn registry_edits_visible_through_context() -> Result<()> {
        let mut ctx = Context::new();
        ctx.potentials_mut()
            .add_harmonic_repulsion("A", "B", 1.0, 2.0)?;
        assert_eq!(ctx.potentials().pair_potentials().len(), 1);
        // species are checked lazily
        assert!(ctx.configure().is_err());
        ctx.add_species("A", 1.0)?;
        ctx.add_species("B", 1.0)?;
        assert_eq!(ctx.calculate_max_cutoff()?, 2.0);
        Ok(())
    }
}
