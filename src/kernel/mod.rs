//! Execution backends and the registry that creates them by name.

pub mod actions;
pub mod cpu;
pub mod reference;

use crate::core::particle::{Particle, Vec3};
use crate::core::resolved::ResolvedSystem;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use cpu::CpuKernel;
pub use reference::ReferenceKernel;

/// What a kernel can do; checked when a simulation is prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_run: bool,
    pub supports_topologies: bool,
    pub parallel_forces: bool,
}

/// Forces on every particle plus the total potential energy of the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceEvaluation {
    pub forces: Vec<Vec3>,
    pub potential_energy: f64,
}

/// A pluggable backend executing the stages of one timestep.
///
/// Stages are called in order by the simulation: neighbor list, forces, integration,
/// reactions. Each stage sees the full result of the previous one.
pub trait Kernel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Allocate the neighbor structure for the cutoff of `system`.
    fn initialize(&mut self, system: &ResolvedSystem) -> Result<()>;

    fn update_neighbor_list(&mut self, positions: &[Vec3]) -> Result<()>;

    /// Pairs `(i, j)`, `i < j`, found by the last neighbor list update.
    fn neighbor_pairs(&self) -> &[(usize, usize)];

    /// Forces from pair potentials (over the neighbor pairs), external potentials and the
    /// harmonic bonds listed in `bonds`.
    fn calculate_forces(
        &self,
        system: &ResolvedSystem,
        particles: &[Particle],
        bonds: &[(usize, usize)],
    ) -> Result<ForceEvaluation>;

    /// New (wrapped) positions after one overdamped Langevin step of length `dt`.
    fn integrate(
        &self,
        system: &ResolvedSystem,
        particles: &[Particle],
        forces: &[Vec3],
        dt: f64,
        rng: &mut StdRng,
    ) -> Result<Vec<Vec3>>;

    /// Fire the reactions scheduled within `dt`; returns the firing count per reaction.
    fn perform_reactions(
        &self,
        system: &ResolvedSystem,
        particles: &mut Vec<Particle>,
        dt: f64,
        rng: &mut StdRng,
        next_id: &mut u64,
    ) -> Result<Vec<usize>> {
        actions::perform_reactions(system, particles, self.neighbor_pairs(), dt, rng, next_id)
    }
}

/// Builds a fresh kernel instance.
pub type KernelFactory = Arc<dyn Fn() -> Box<dyn Kernel> + Send + Sync>;

/// Name-to-factory registry of kernels.
#[derive(Clone, Default)]
pub struct KernelRegistry {
    factories: BTreeMap<String, KernelFactory>,
}

impl fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("kernels", &self.names())
            .finish()
    }
}

impl KernelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `reference-kernel` (alias `SingleCPU`) and `cpu` (alias `CPU`).
    pub fn with_builtin_kernels() -> Self {
        let mut reg = Self::new();
        let reference: KernelFactory =
            Arc::new(|| -> Box<dyn Kernel> { Box::new(ReferenceKernel::new()) });
        let cpu: KernelFactory =
            Arc::new(|| -> Box<dyn Kernel> { Box::new(CpuKernel::new()) });
        reg.factories
            .insert(ReferenceKernel::NAME.to_string(), Arc::clone(&reference));
        reg.factories.insert("SingleCPU".to_string(), reference);
        reg.factories
            .insert(CpuKernel::NAME.to_string(), Arc::clone(&cpu));
        reg.factories.insert("CPU".to_string(), cpu);
        reg
    }

    /// Register a kernel factory under `name`.
    ///
    /// Errors:
    /// - `Error::InvalidConfiguration` if the name is empty or already taken.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Kernel> + Send + Sync + 'static,
    {
        if name.trim().is_empty() {
            return Err(Error::config("kernel name must not be empty"));
        }
        if self.factories.contains_key(name) {
            return Err(Error::config(format!(
                "kernel '{name}' is already registered"
            )));
        }
        self.factories.insert(name.to_string(), Arc::new(factory));
        Ok(())
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Kernel>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            Error::KernelNotFound(format!(
                "'{name}' (available: {})",
                self.names().join(", ")
            ))
        })?;
        Ok(factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, aliases included, sorted.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_kernels_and_aliases() -> Result<()> {
        let reg = KernelRegistry::with_builtin_kernels();
        assert_eq!(reg.create("SingleCPU")?.name(), ReferenceKernel::NAME);
        assert_eq!(reg.create("reference-kernel")?.name(), ReferenceKernel::NAME);
        assert_eq!(reg.create("CPU")?.name(), CpuKernel::NAME);
        assert!(reg.create("cpu")?.capabilities().parallel_forces);
        Ok(())
    }

    #[test]
    fn unknown_kernel_is_not_found() {
        let err = KernelRegistry::new().create("GPU").unwrap_err();
        assert!(matches!(err, Error::KernelNotFound(_)));
    }

    #[test]
    fn user_factories_can_be_registered() -> Result<()> {
        let mut reg = KernelRegistry::new();
        reg.register("mine", || -> Box<dyn Kernel> { Box::new(ReferenceKernel::new()) })?;
        assert!(reg.contains("mine"));
        assert!(reg
            .register("mine", || -> Box<dyn Kernel> { Box::new(CpuKernel::new()) })
            .is_err());
        Ok(())
    }
}
