use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed spatial dimension (3D).
pub const DIM: usize = 3;

/// Position, force and displacement vectors.
pub type Vec3 = [f64; DIM];

/// Index of a species in its [`ParticleTypeTable`] (insertion order).
pub type TypeId = u16;

/// Distinguishes ordinary particles from particles that can be bound into topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleTypeFlavor {
    Normal,
    Topology,
}

/// A registered species.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleType {
    pub name: String,
    pub diffusion_constant: f64,
    pub flavor: ParticleTypeFlavor,
}

/// Species table keyed by name; ids are assigned in insertion order and never change.
#[derive(Debug, Clone, Default)]
pub struct ParticleTypeTable {
    types: Vec<ParticleType>,
    by_name: HashMap<String, TypeId>,
}

impl ParticleTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a species.
    ///
    /// Errors:
    /// - `Error::InvalidConfiguration` if the name is empty or taken, or if the diffusion
    ///   constant is not finite and > 0.
    pub fn add(
        &mut self,
        name: &str,
        diffusion_constant: f64,
        flavor: ParticleTypeFlavor,
    ) -> Result<TypeId> {
        if name.trim().is_empty() {
            return Err(Error::config("species name must not be empty"));
        }
        if self.by_name.contains_key(name) {
            return Err(Error::config(format!(
                "species '{name}' is already registered"
            )));
        }
        if !diffusion_constant.is_finite() || diffusion_constant <= 0.0 {
            return Err(Error::config(format!(
                "diffusion constant of '{name}' must be finite and > 0, got {diffusion_constant}"
            )));
        }
        let id = TypeId::try_from(self.types.len())
            .map_err(|_| Error::config("too many species registered"))?;
        self.types.push(ParticleType {
            name: name.to_string(),
            diffusion_constant,
            flavor,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Like [`id_of`](Self::id_of) but reports the context in which the name was used.
    pub fn require(&self, name: &str, used_by: &str) -> Result<TypeId> {
        self.id_of(name).ok_or_else(|| {
            Error::config(format!("{used_by} references unregistered species '{name}'"))
        })
    }

    pub fn get(&self, id: TypeId) -> Option<&ParticleType> {
        self.types.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Species names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.types.iter().map(|t| t.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &ParticleType)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (i as TypeId, t))
    }
}

/// A particle of the simulated ensemble.
///
/// Fields:
/// - `id`: stable identifier, unique within one simulation
/// - `type_id`: species index into the simulation's type table
/// - `r`: position vector [x, y, z]
/// - `topology_id`: index of the owning topology, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: u64,
    pub type_id: TypeId,
    pub r: Vec3,
    pub topology_id: Option<usize>,
}

impl Particle {
    /// Create a new particle after validating that its position is finite.
    pub fn new(id: u64, type_id: TypeId, r: Vec3) -> Result<Self> {
        if !r.iter().all(|x| x.is_finite()) {
            return Err(Error::config("particle position must be finite"));
        }
        Ok(Self {
            id,
            type_id,
            r,
            topology_id: None,
        })
    }

    /// Set position (validated as finite).
    pub fn set_position(&mut self, r: Vec3) -> Result<()> {
        if !r.iter().all(|x| x.is_finite()) {
            return Err(Error::divergence(format!(
                "particle {} would move to non-finite position {:?}",
                self.id, r
            )));
        }
        self.r = r;
        Ok(())
    }
}

// ============ Vector helpers ============

#[inline]
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn scale(a: &Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn norm(a: &Vec3) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
pub fn is_finite(a: &Vec3) -> bool {
    a.iter().all(|x| x.is_finite())
}
