//! Pair (order-2) and external (order-1) potentials and their registry.
//!
//! Force convention: `force` returns the derivative of the energy with respect to the first
//! position argument. Kernels apply its negation to particle i and, for pair potentials, the
//! vector itself to particle j.

use crate::core::particle::{dot, norm, scale, sub, Vec3, DIM};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Error type returned by user-supplied potential callables.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// User-supplied energy callable: `energy(x_i, x_j)`.
pub type EnergyFn = dyn Fn(&Vec3, &Vec3) -> std::result::Result<f64, CallbackError> + Send + Sync;

/// User-supplied force callable: `force(x_i, x_j)`.
pub type ForceFn = dyn Fn(&Vec3, &Vec3) -> std::result::Result<Vec3, CallbackError> + Send + Sync;

/// Pairwise interaction between two particles.
///
/// Evaluations must be side-effect free and depend only on the two positions. Periodic
/// images are resolved by the kernel before the call.
pub trait PairPotential: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Distance beyond which the potential is identically zero.
    fn cutoff_radius(&self) -> f64;

    fn energy(&self, x_i: &Vec3, x_j: &Vec3) -> Result<f64>;

    fn force(&self, x_i: &Vec3, x_j: &Vec3) -> Result<Vec3>;
}

/// Single-particle interaction, e.g. confinement on non-periodic axes.
pub trait ExternalPotential: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn energy(&self, x: &Vec3) -> f64;

    fn force(&self, x: &Vec3) -> Vec3;
}

fn require_finite(what: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::config(format!("{what} must be finite, got {value}")))
    }
}

fn require_non_negative(what: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::config(format!("{what} must be finite and >= 0, got {value}")))
    }
}

/// Soft repulsion `k (d - r0)^2` for `d < r0`.
///
/// Coincident particles (`d == 0`) get energy `k r0^2` and a zero force since there is no
/// direction to push along.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicRepulsion {
    pub force_constant: f64,
    pub interaction_distance: f64,
}

impl HarmonicRepulsion {
    pub const NAME: &'static str = "HarmonicRepulsion";

    pub fn new(force_constant: f64, interaction_distance: f64) -> Result<Self> {
        Ok(Self {
            force_constant: require_finite("force_constant", force_constant)?,
            interaction_distance: require_non_negative(
                "interaction_distance",
                interaction_distance,
            )?,
        })
    }
}

impl PairPotential for HarmonicRepulsion {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn cutoff_radius(&self) -> f64 {
        self.interaction_distance
    }

    fn energy(&self, x_i: &Vec3, x_j: &Vec3) -> Result<f64> {
        let dist = norm(&sub(x_i, x_j));
        if dist < self.interaction_distance {
            let d = dist - self.interaction_distance;
            Ok(self.force_constant * d * d)
        } else {
            Ok(0.0)
        }
    }

    fn force(&self, x_i: &Vec3, x_j: &Vec3) -> Result<Vec3> {
        let x_ij = sub(x_i, x_j);
        let dist = norm(&x_ij);
        if dist >= self.interaction_distance || dist == 0.0 {
            return Ok([0.0; DIM]);
        }
        let factor = 2.0 * self.force_constant * (dist - self.interaction_distance) / dist;
        Ok(scale(&x_ij, factor))
    }
}

/// Lennard-Jones 12-6 potential truncated at `cutoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct LennardJones {
    pub epsilon: f64,
    pub sigma: f64,
    pub cutoff: f64,
}

impl LennardJones {
    pub const NAME: &'static str = "LennardJones";

    pub fn new(epsilon: f64, sigma: f64, cutoff: f64) -> Result<Self> {
        let sigma = require_non_negative("sigma", sigma)?;
        if sigma == 0.0 {
            return Err(Error::config("sigma must be > 0"));
        }
        Ok(Self {
            epsilon: require_finite("epsilon", epsilon)?,
            sigma,
            cutoff: require_non_negative("cutoff", cutoff)?,
        })
    }
}

impl PairPotential for LennardJones {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn cutoff_radius(&self) -> f64 {
        self.cutoff
    }

    fn energy(&self, x_i: &Vec3, x_j: &Vec3) -> Result<f64> {
        let r = norm(&sub(x_i, x_j));
        if r >= self.cutoff || r < 1e-10 {
            return Ok(0.0);
        }
        let s_r6 = (self.sigma / r).powi(6);
        Ok(4.0 * self.epsilon * (s_r6 * s_r6 - s_r6))
    }

    fn force(&self, x_i: &Vec3, x_j: &Vec3) -> Result<Vec3> {
        let x_ij = sub(x_i, x_j);
        let r = norm(&x_ij);
        if r >= self.cutoff || r < 1e-10 {
            return Ok([0.0; DIM]);
        }
        let s_r6 = (self.sigma / r).powi(6);
        // dV/dr = 24ε/r [(σ/r)^6 - 2(σ/r)^12]
        let dv_dr = 24.0 * self.epsilon / r * (s_r6 - 2.0 * s_r6 * s_r6);
        Ok(scale(&x_ij, dv_dr / r))
    }
}

/// Pair potential backed by two independently supplied callables.
///
/// Nothing checks that `force` is the gradient of `energy`; that is up to the caller.
#[derive(Clone)]
pub struct CustomPotential {
    name: String,
    cutoff: f64,
    energy_fn: Arc<EnergyFn>,
    force_fn: Arc<ForceFn>,
}

impl CustomPotential {
    pub fn new<E, F>(name: &str, cutoff: f64, energy: E, force: F) -> Result<Self>
    where
        E: Fn(&Vec3, &Vec3) -> std::result::Result<f64, CallbackError> + Send + Sync + 'static,
        F: Fn(&Vec3, &Vec3) -> std::result::Result<Vec3, CallbackError> + Send + Sync + 'static,
    {
        Ok(Self {
            name: name.to_string(),
            cutoff: require_non_negative("cutoff", cutoff)?,
            energy_fn: Arc::new(energy),
            force_fn: Arc::new(force),
        })
    }

    /// Convenience constructor for callables that cannot fail.
    pub fn from_fns<E, F>(name: &str, cutoff: f64, energy: E, force: F) -> Result<Self>
    where
        E: Fn(&Vec3, &Vec3) -> f64 + Send + Sync + 'static,
        F: Fn(&Vec3, &Vec3) -> Vec3 + Send + Sync + 'static,
    {
        Self::new(
            name,
            cutoff,
            move |a: &Vec3, b: &Vec3| Ok(energy(a, b)),
            move |a: &Vec3, b: &Vec3| Ok(force(a, b)),
        )
    }
}

impl fmt::Debug for CustomPotential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPotential")
            .field("name", &self.name)
            .field("cutoff", &self.cutoff)
            .finish_non_exhaustive()
    }
}

impl PairPotential for CustomPotential {
    fn name(&self) -> &str {
        &self.name
    }

    fn cutoff_radius(&self) -> f64 {
        self.cutoff
    }

    fn energy(&self, x_i: &Vec3, x_j: &Vec3) -> Result<f64> {
        (self.energy_fn)(x_i, x_j).map_err(|e| {
            Error::divergence(format!("energy of custom potential '{}' failed: {e}", self.name))
        })
    }

    fn force(&self, x_i: &Vec3, x_j: &Vec3) -> Result<Vec3> {
        (self.force_fn)(x_i, x_j).map_err(|e| {
            Error::divergence(format!("force of custom potential '{}' failed: {e}", self.name))
        })
    }
}

/// Harmonic confinement to the axis-aligned region `[origin, origin + extent]`.
///
/// Inside the region the potential is zero; outside it grows as `0.5 k d^2` with `d` the
/// per-axis distance to the region.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxPotential {
    pub force_constant: f64,
    pub origin: Vec3,
    pub extent: Vec3,
}

impl BoxPotential {
    pub const NAME: &'static str = "Box";

    pub fn new(force_constant: f64, origin: Vec3, extent: Vec3) -> Result<Self> {
        require_non_negative("force_constant", force_constant)?;
        for k in 0..DIM {
            require_finite("origin", origin[k])?;
            require_non_negative("extent", extent[k])?;
        }
        Ok(Self {
            force_constant,
            origin,
            extent,
        })
    }

    fn displacement(&self, x: &Vec3) -> Vec3 {
        let mut d = [0.0; DIM];
        for (k, dk) in d.iter_mut().enumerate() {
            let lo = self.origin[k];
            let hi = self.origin[k] + self.extent[k];
            if x[k] < lo {
                *dk = x[k] - lo;
            } else if x[k] > hi {
                *dk = x[k] - hi;
            }
        }
        d
    }
}

impl ExternalPotential for BoxPotential {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn energy(&self, x: &Vec3) -> f64 {
        let d = self.displacement(x);
        0.5 * self.force_constant * dot(&d, &d)
    }

    fn force(&self, x: &Vec3) -> Vec3 {
        scale(&self.displacement(x), self.force_constant)
    }
}

/// A pair potential registered for an unordered pair of species names.
#[derive(Debug, Clone)]
pub struct PairPotentialEntry {
    pub type_a: String,
    pub type_b: String,
    pub potential: Arc<dyn PairPotential>,
}

impl PairPotentialEntry {
    fn matches(&self, a: &str, b: &str) -> bool {
        (self.type_a == a && self.type_b == b) || (self.type_a == b && self.type_b == a)
    }
}

/// An external potential registered for one species.
#[derive(Debug, Clone)]
pub struct ExternalPotentialEntry {
    pub species: String,
    pub potential: Arc<dyn ExternalPotential>,
}

/// Numeric parameters for building a built-in potential by name.
pub type PotentialParams = BTreeMap<String, f64>;

/// The cutoff of a custom potential given by keyword parameters; `cutoff` is the only
/// parameter accepted.
pub fn custom_cutoff(name: &str, params: &PotentialParams) -> Result<f64> {
    if let Some(unknown) = params.keys().find(|k| k.as_str() != "cutoff") {
        return Err(Error::config(format!(
            "unknown parameter '{unknown}' for custom potential '{name}'"
        )));
    }
    let cutoff = params.get("cutoff").copied().ok_or_else(|| {
        Error::config(format!("custom potential '{name}' requires parameter 'cutoff'"))
    })?;
    require_non_negative("cutoff", cutoff)
}

/// Potentials of a context, keyed by species names.
///
/// Names are checked against the species table when the context is configured, not here.
/// At most one pair potential per unordered species pair is accepted.
#[derive(Debug, Clone, Default)]
pub struct PotentialRegistry {
    pair: Vec<PairPotentialEntry>,
    external: Vec<ExternalPotentialEntry>,
}

impl PotentialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pair potential for the unordered pair `(type_a, type_b)`.
    ///
    /// Errors:
    /// - `Error::InvalidConfiguration` if the pair already has a potential.
    pub fn add_pair(
        &mut self,
        type_a: &str,
        type_b: &str,
        potential: Arc<dyn PairPotential>,
    ) -> Result<()> {
        if let Some(existing) = self.pair.iter().find(|e| e.matches(type_a, type_b)) {
            return Err(Error::config(format!(
                "pair ({type_a}, {type_b}) already has potential '{}'; duplicate registration rejected",
                existing.potential.name()
            )));
        }
        self.pair.push(PairPotentialEntry {
            type_a: type_a.to_string(),
            type_b: type_b.to_string(),
            potential,
        });
        Ok(())
    }

    pub fn add_harmonic_repulsion(
        &mut self,
        type_a: &str,
        type_b: &str,
        force_constant: f64,
        interaction_distance: f64,
    ) -> Result<()> {
        let pot = HarmonicRepulsion::new(force_constant, interaction_distance)?;
        self.add_pair(type_a, type_b, Arc::new(pot))
    }

    pub fn add_lennard_jones(
        &mut self,
        type_a: &str,
        type_b: &str,
        epsilon: f64,
        sigma: f64,
        cutoff: f64,
    ) -> Result<()> {
        let pot = LennardJones::new(epsilon, sigma, cutoff)?;
        self.add_pair(type_a, type_b, Arc::new(pot))
    }

    pub fn add_custom(&mut self, type_a: &str, type_b: &str, pot: CustomPotential) -> Result<()> {
        self.add_pair(type_a, type_b, Arc::new(pot))
    }

    /// Build a built-in pair potential from its name and numeric parameters.
    ///
    /// Known kinds: `HarmonicRepulsion {force_constant, interaction_distance}` and
    /// `LennardJones {epsilon, sigma, cutoff}`. Missing or unknown parameters are rejected.
    pub fn register(
        &mut self,
        kind: &str,
        type_a: &str,
        type_b: &str,
        params: &PotentialParams,
    ) -> Result<()> {
        let expected: &[&str] = match kind {
            HarmonicRepulsion::NAME => &["force_constant", "interaction_distance"],
            LennardJones::NAME => &["epsilon", "sigma", "cutoff"],
            other => {
                return Err(Error::config(format!("unknown built-in potential '{other}'")))
            }
        };
        if let Some(unknown) = params.keys().find(|k| !expected.contains(&k.as_str())) {
            return Err(Error::config(format!(
                "unknown parameter '{unknown}' for potential '{kind}'"
            )));
        }
        let get = |key: &str| {
            params.get(key).copied().ok_or_else(|| {
                Error::config(format!("potential '{kind}' requires parameter '{key}'"))
            })
        };
        match kind {
            HarmonicRepulsion::NAME => self.add_harmonic_repulsion(
                type_a,
                type_b,
                get("force_constant")?,
                get("interaction_distance")?,
            ),
            _ => self.add_lennard_jones(
                type_a,
                type_b,
                get("epsilon")?,
                get("sigma")?,
                get("cutoff")?,
            ),
        }
    }

    pub fn add_external(&mut self, species: &str, potential: Arc<dyn ExternalPotential>) {
        self.external.push(ExternalPotentialEntry {
            species: species.to_string(),
            potential,
        });
    }

    pub fn add_box(
        &mut self,
        species: &str,
        force_constant: f64,
        origin: Vec3,
        extent: Vec3,
    ) -> Result<()> {
        let pot = BoxPotential::new(force_constant, origin, extent)?;
        self.add_external(species, Arc::new(pot));
        Ok(())
    }

    pub fn pair_potentials(&self) -> &[PairPotentialEntry] {
        &self.pair
    }

    pub fn external_potentials(&self) -> &[ExternalPotentialEntry] {
        &self.external
    }

    pub fn is_empty(&self) -> bool {
        self.pair.is_empty() && self.external.is_empty()
    }
}
