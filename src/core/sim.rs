use crate::core::context::Context;
use crate::core::particle::{ParticleTypeFlavor, Particle, TypeId, Vec3, DIM};
use crate::core::resolved::ResolvedSystem;
use crate::core::topology::Topology;
use crate::error::{Error, Result};
use crate::kernel::{actions, Kernel, KernelRegistry};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, trace, warn};

/// Lifecycle of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationState {
    Unconfigured,
    KernelSelected,
    Ready,
    Running,
    Completed,
    Failed,
}

/// Observables recorded after every completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u64,
    pub time: f64,
    pub n_particles: usize,
    /// Potential energy of the configuration the step started from.
    pub potential_energy: f64,
    pub reactions_performed: usize,
    /// Firings per reaction, in registration order (see [`Simulation::reaction_names`]).
    pub reaction_counts: Vec<usize>,
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => SeedableRng::seed_from_u64(s),
        None => SeedableRng::seed_from_u64(rng().random()),
    }
}

/// A kernel bound to a frozen snapshot of a [`Context`], plus the particle ensemble.
///
/// Created by [`Context::simulation`]. Runs advance through the states
/// `Unconfigured -> KernelSelected -> Ready -> Running -> {Completed, Failed}`.
#[derive(Debug)]
pub struct Simulation {
    context: Context,
    kernel: Option<Box<dyn Kernel>>,
    system: Option<ResolvedSystem>,
    state: SimulationState,
    particles: Vec<Particle>,
    topologies: Vec<Topology>,
    records: Vec<StepRecord>,
    rng: StdRng,
    next_id: u64,
    step: u64,
    time: f64,
}

impl Simulation {
    /// A simulation without a kernel, owning `context`.
    pub fn new(context: Context) -> Self {
        Self {
            context,
            kernel: None,
            system: None,
            state: SimulationState::Unconfigured,
            particles: Vec::new(),
            topologies: Vec::new(),
            records: Vec::new(),
            rng: seeded_rng(None),
            next_id: 0,
            step: 0,
            time: 0.0,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn kernel_name(&self) -> Option<&str> {
        self.kernel.as_ref().map(|k| k.name())
    }

    /// Bind the kernel registered as `name`. Allowed once per simulation.
    ///
    /// Errors:
    /// - `Error::RunPrecondition` if a kernel is already selected.
    /// - `Error::KernelNotFound` for unknown names.
    pub fn select_kernel(&mut self, registry: &KernelRegistry, name: &str) -> Result<()> {
        if self.state != SimulationState::Unconfigured {
            return Err(Error::precondition(format!(
                "kernel '{}' is already selected",
                self.kernel_name().unwrap_or_default()
            )));
        }
        let kernel = registry.create(name)?;
        info!(requested = name, kernel = kernel.name(), "kernel selected");
        self.kernel = Some(kernel);
        self.state = SimulationState::KernelSelected;
        Ok(())
    }

    /// Reseed the random number generator; `None` draws a fresh seed.
    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.rng = seeded_rng(seed);
    }

    fn ensure_editable(&self, what: &str) -> Result<()> {
        match self.state {
            SimulationState::Unconfigured
            | SimulationState::KernelSelected
            | SimulationState::Ready => Ok(()),
            state => Err(Error::precondition(format!(
                "cannot {what} in state {state:?}; call reset() first"
            ))),
        }
    }

    fn new_particle(&mut self, type_id: TypeId, position: Vec3) -> Result<Particle> {
        let wrapped = self.context.geometry().wrap(&position);
        let p = Particle::new(self.next_id, type_id, wrapped)?;
        self.next_id += 1;
        Ok(p)
    }

    /// Add a particle of a normal species; periodic axes are wrapped into the box.
    ///
    /// Returns the particle id.
    pub fn add_particle(&mut self, species: &str, position: Vec3) -> Result<u64> {
        self.ensure_editable("add particles")?;
        let types = self.context.particle_types();
        let type_id = types.require(species, "add_particle")?;
        if types.get(type_id).map(|t| t.flavor) != Some(ParticleTypeFlavor::Normal) {
            return Err(Error::config(format!(
                "'{species}' is a topology species; use add_topology"
            )));
        }
        let p = self.new_particle(type_id, position)?;
        let id = p.id;
        self.particles.push(p);
        Ok(id)
    }

    /// Add a topology of type `topology_type` made of `particles` (species, position) and
    /// bonded along `edges`, which index into `particles`.
    ///
    /// Returns the index of the new topology.
    pub fn add_topology(
        &mut self,
        topology_type: &str,
        particles: &[(&str, Vec3)],
        edges: &[(usize, usize)],
    ) -> Result<usize> {
        self.ensure_editable("add topologies")?;
        let type_id = self.context.topologies().id_of(topology_type).ok_or_else(|| {
            Error::config(format!("unregistered topology type '{topology_type}'"))
        })?;
        if particles.is_empty() {
            return Err(Error::config("a topology needs at least one particle"));
        }
        if let Some(&(a, b)) = edges
            .iter()
            .find(|&&(a, b)| a == b || a >= particles.len() || b >= particles.len())
        {
            return Err(Error::config(format!(
                "invalid topology edge ({a}, {b}) for {} particles",
                particles.len()
            )));
        }
        let index = self.topologies.len();
        let mut members = Vec::with_capacity(particles.len());
        for &(species, position) in particles {
            let types = self.context.particle_types();
            let t = types.require(species, "add_topology")?;
            if types.get(t).map(|p| p.flavor) != Some(ParticleTypeFlavor::Topology) {
                return Err(Error::config(format!(
                    "'{species}' is not a topology species"
                )));
            }
            let mut p = self.new_particle(t, position)?;
            p.topology_id = Some(index);
            members.push(p);
        }
        let particle_ids = members.iter().map(|p| p.id).collect();
        self.particles.extend(members);
        self.topologies.push(Topology {
            type_id,
            particle_ids,
            edges: edges.to_vec(),
        });
        // bond checks happen in prepare()
        if self.state == SimulationState::Ready {
            self.state = SimulationState::KernelSelected;
        }
        Ok(index)
    }

    /// Configure the context snapshot, validate run preconditions and allocate the kernel's
    /// neighbor structure. A no-op once `Ready`.
    ///
    /// Errors:
    /// - `Error::RunPrecondition` without a kernel or in a terminal state.
    /// - `Error::InvalidConfiguration` for negative `kbt`, a periodic axis shorter than twice
    ///   the cutoff, unconfigured bonds or a kernel lacking a needed capability.
    pub fn prepare(&mut self) -> Result<()> {
        match self.state {
            SimulationState::Ready => return Ok(()),
            SimulationState::KernelSelected => {}
            state => {
                return Err(Error::precondition(format!(
                    "cannot prepare in state {state:?}"
                )))
            }
        }
        let system = self.context.configure()?;
        let cutoff = system.max_cutoff();
        if system.kbt() < 0.0 {
            return Err(Error::config(format!(
                "kbt must be >= 0, got {}",
                system.kbt()
            )));
        }
        let geometry = *system.geometry();
        for k in 0..DIM {
            if geometry.periodic[k] && geometry.size[k] < 2.0 * cutoff {
                return Err(Error::config(format!(
                    "periodic box edge {k} ({}) is shorter than twice the max cutoff ({cutoff})",
                    geometry.size[k]
                )));
            }
            if !geometry.periodic[k] && !system.has_external_potentials() {
                warn!(axis = k, "non-periodic axis without external confinement");
            }
        }
        let kernel = self
            .kernel
            .as_mut()
            .ok_or_else(|| Error::precondition("no kernel selected"))?;
        let caps = kernel.capabilities();
        if !caps.can_run {
            return Err(Error::config(format!(
                "kernel '{}' cannot run simulations",
                kernel.name()
            )));
        }
        if !self.topologies.is_empty() && !caps.supports_topologies {
            return Err(Error::config(format!(
                "kernel '{}' does not support topologies",
                kernel.name()
            )));
        }
        let species_of: HashMap<u64, TypeId> =
            self.particles.iter().map(|p| (p.id, p.type_id)).collect();
        for top in &self.topologies {
            for &(a, b) in &top.edges {
                let ta = species_of.get(&top.particle_ids[a]).copied();
                let tb = species_of.get(&top.particle_ids[b]).copied();
                let configured = match (ta, tb) {
                    (Some(ta), Some(tb)) => system.bond(ta, tb).is_some(),
                    _ => false,
                };
                if !configured {
                    return Err(Error::config(format!(
                        "topology edge ({a}, {b}) has no configured bond potential"
                    )));
                }
            }
        }
        kernel.initialize(&system)?;
        debug!(
            cutoff,
            kernel = kernel.name(),
            n_particles = self.particles.len(),
            "simulation prepared"
        );
        self.system = Some(system);
        self.state = SimulationState::Ready;
        Ok(())
    }

    /// Advance `n_steps` steps of length `timestep`.
    ///
    /// On failure the simulation moves to `Failed`, keeps the state of the last completed
    /// step and returns the error.
    pub fn run(&mut self, n_steps: u64, timestep: f64) -> Result<()> {
        match self.state {
            SimulationState::Unconfigured => {
                return Err(Error::precondition("run requires a selected kernel"))
            }
            SimulationState::Completed | SimulationState::Failed => {
                return Err(Error::precondition(format!(
                    "simulation is {:?}; call reset() before running again",
                    self.state
                )))
            }
            _ => {}
        }
        if !timestep.is_finite() || timestep <= 0.0 {
            return Err(Error::config(format!(
                "timestep must be finite and > 0, got {timestep}"
            )));
        }
        self.prepare()?;
        self.state = SimulationState::Running;
        info!(
            n_steps,
            timestep,
            n_particles = self.particles.len(),
            "run started"
        );
        for _ in 0..n_steps {
            match self.advance(timestep) {
                Ok(record) => {
                    trace!(
                        step = record.step,
                        n_particles = record.n_particles,
                        energy = record.potential_energy,
                        reactions = record.reactions_performed,
                        "step"
                    );
                    self.records.push(record);
                }
                Err(e) => {
                    self.state = SimulationState::Failed;
                    warn!(step = self.step + 1, error = %e, "run failed");
                    return Err(e);
                }
            }
        }
        self.state = SimulationState::Completed;
        info!(steps = self.step, time = self.time, "run completed");
        Ok(())
    }

    /// One timestep on a staged copy of the ensemble, committed only on success.
    fn advance(&mut self, dt: f64) -> Result<StepRecord> {
        let bonds = self.bond_indices();
        let kernel = self
            .kernel
            .as_mut()
            .ok_or_else(|| Error::precondition("no kernel selected"))?;
        let system = self
            .system
            .as_ref()
            .ok_or_else(|| Error::precondition("simulation is not prepared"))?;

        let positions: Vec<Vec3> = self.particles.iter().map(|p| p.r).collect();
        kernel.update_neighbor_list(&positions)?;
        let eval = kernel.calculate_forces(system, &self.particles, &bonds)?;
        let moved = kernel.integrate(system, &self.particles, &eval.forces, dt, &mut self.rng)?;

        let mut staged = self.particles.clone();
        for (p, r) in staged.iter_mut().zip(moved) {
            p.set_position(r)?;
        }
        let mut next_id = self.next_id;
        let mut counts = vec![0; system.reactions().len()];
        if !system.reactions().is_empty() {
            if system.reactions().iter().any(|r| r.scheme.educt_distance().is_some()) {
                let positions: Vec<Vec3> = staged.iter().map(|p| p.r).collect();
                kernel.update_neighbor_list(&positions)?;
            }
            counts =
                kernel.perform_reactions(system, &mut staged, dt, &mut self.rng, &mut next_id)?;
        }
        let converted = actions::apply_compartments(system, &mut staged);
        if converted > 0 {
            trace!(converted, "compartment conversions");
        }

        self.particles = staged;
        self.next_id = next_id;
        self.step += 1;
        self.time += dt;
        Ok(StepRecord {
            step: self.step,
            time: self.time,
            n_particles: self.particles.len(),
            potential_energy: eval.potential_energy,
            reactions_performed: counts.iter().sum(),
            reaction_counts: counts,
        })
    }

    /// Bond edges as particle index pairs into the current ensemble.
    fn bond_indices(&self) -> Vec<(usize, usize)> {
        if self.topologies.is_empty() {
            return Vec::new();
        }
        let index_of: HashMap<u64, usize> = self
            .particles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
        self.topologies
            .iter()
            .flat_map(|top| {
                top.edges.iter().filter_map(|&(a, b)| {
                    let i = index_of.get(&top.particle_ids[a])?;
                    let j = index_of.get(&top.particle_ids[b])?;
                    Some((*i, *j))
                })
            })
            .collect()
    }

    /// Return a finished (or prepared) simulation to `KernelSelected`, keeping particles,
    /// records and the clock.
    pub fn reset(&mut self) -> Result<()> {
        match self.state {
            SimulationState::Unconfigured => {
                Err(Error::precondition("reset requires a selected kernel"))
            }
            _ => {
                self.system = None;
                self.state = SimulationState::KernelSelected;
                Ok(())
            }
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.particles.iter().map(|p| p.r).collect()
    }

    /// Species name of every particle, in ensemble order.
    pub fn species(&self) -> Vec<String> {
        let types = self.context.particle_types();
        self.particles
            .iter()
            .map(|p| types.get(p.type_id).map(|t| t.name.clone()).unwrap_or_default())
            .collect()
    }

    /// Number of particles of `species`.
    pub fn count(&self, species: &str) -> usize {
        match self.context.particle_types().id_of(species) {
            Some(t) => self.particles.iter().filter(|p| p.type_id == t).count(),
            None => 0,
        }
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn topologies(&self) -> &[Topology] {
        &self.topologies
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Reaction names in the order of [`StepRecord::reaction_counts`].
    pub fn reaction_names(&self) -> Vec<String> {
        self.context.reactions().iter().map(|r| r.name.clone()).collect()
    }

    /// Total firings of reaction `name` over all recorded steps.
    pub fn reaction_count(&self, name: &str) -> usize {
        match self.reaction_names().iter().position(|n| n == name) {
            Some(k) => self.records.iter().filter_map(|r| r.reaction_counts.get(k)).sum(),
            None => 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Cutoff the kernel was prepared with; `None` before [`Simulation::prepare`].
    pub fn max_cutoff(&self) -> Option<f64> {
        self.system.as_ref().map(|s| s.max_cutoff())
    }
}
