//! Particle-based reaction-diffusion simulation.
//!
//! Build a [`Context`] (box, species, potentials, reactions), pick a kernel from a
//! [`KernelRegistry`] and run the resulting [`Simulation`]. A [`SystemConfig`] describes
//! the same setup as JSON. With the `python` feature the crate doubles as an extension
//! module.

pub mod config;
pub mod core;
pub mod error;
pub mod kernel;

#[cfg(feature = "python")]
mod python;

pub use crate::config::SystemConfig;
pub use crate::core::{Context, Simulation, SimulationState, StepRecord};
pub use crate::error::{Error, Result};
pub use crate::kernel::{Kernel, KernelRegistry};
