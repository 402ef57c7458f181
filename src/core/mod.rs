//! Configuration model, interaction descriptors and the simulation state machine.

pub mod compartment;
pub mod context;
pub mod event;
pub mod geometry;
pub mod input;
pub mod neighbor;
pub mod particle;
pub mod potential;
pub mod reaction;
pub mod resolved;
pub mod sim;
pub mod topology;

pub use context::Context;
pub use event::{Event, EventKind};
pub use input::ArrayLike;
pub use particle::{Particle, ParticleTypeFlavor, Vec3};
pub use potential::{
    CustomPotential, ExternalPotential, HarmonicRepulsion, LennardJones, PairPotential,
};
pub use resolved::ResolvedSystem;
pub use sim::{Simulation, SimulationState, StepRecord};
