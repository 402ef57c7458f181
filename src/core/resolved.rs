//! Output of the configure pass: the context with every species name resolved.

use crate::core::compartment::CompartmentShape;
use crate::core::context::Context;
use crate::core::geometry::BoxGeometry;
use crate::core::particle::{ParticleTypeFlavor, ParticleTypeTable, TypeId};
use crate::core::potential::{ExternalPotential, PairPotential};
use crate::core::reaction::ReactionKind;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// A reaction scheme with species resolved to type ids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReactionScheme {
    Conversion {
        from: TypeId,
        to: TypeId,
    },
    Decay {
        from: TypeId,
    },
    Fission {
        from: TypeId,
        to1: TypeId,
        to2: TypeId,
        product_distance: f64,
        weight1: f64,
        weight2: f64,
    },
    Fusion {
        from1: TypeId,
        from2: TypeId,
        to: TypeId,
        educt_distance: f64,
        weight1: f64,
        weight2: f64,
    },
    Enzymatic {
        catalyst: TypeId,
        from: TypeId,
        to: TypeId,
        educt_distance: f64,
    },
}

impl ReactionScheme {
    /// Educt types: one for unary schemes, two for binary ones.
    pub fn educts(&self) -> (TypeId, Option<TypeId>) {
        match *self {
            ReactionScheme::Conversion { from, .. }
            | ReactionScheme::Decay { from }
            | ReactionScheme::Fission { from, .. } => (from, None),
            ReactionScheme::Fusion { from1, from2, .. } => (from1, Some(from2)),
            ReactionScheme::Enzymatic { from, catalyst, .. } => (from, Some(catalyst)),
        }
    }

    pub fn educt_distance(&self) -> Option<f64> {
        match *self {
            ReactionScheme::Fusion { educt_distance, .. }
            | ReactionScheme::Enzymatic { educt_distance, .. } => Some(educt_distance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReaction {
    pub name: String,
    pub rate: f64,
    pub scheme: ReactionScheme,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCompartment {
    pub name: String,
    pub shape: CompartmentShape,
    pub conversions: HashMap<TypeId, TypeId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBond {
    pub force_constant: f64,
    pub length: f64,
}

/// Immutable, validated view of a [`Context`] that kernels consume.
#[derive(Debug, Clone)]
pub struct ResolvedSystem {
    geometry: BoxGeometry,
    kbt: f64,
    types: ParticleTypeTable,
    pair: HashMap<(TypeId, TypeId), Arc<dyn PairPotential>>,
    external: Vec<Vec<Arc<dyn ExternalPotential>>>,
    reactions: Vec<ResolvedReaction>,
    bonds: HashMap<(TypeId, TypeId), ResolvedBond>,
    compartments: Vec<ResolvedCompartment>,
    topology_types: Vec<String>,
    max_cutoff: f64,
}

fn pair_key(a: TypeId, b: TypeId) -> (TypeId, TypeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Resolve a name that must belong to an ordinary (non-topology) species.
fn require_normal(types: &ParticleTypeTable, name: &str, used_by: &str) -> Result<TypeId> {
    let id = types.require(name, used_by)?;
    match types.get(id).map(|t| t.flavor) {
        Some(ParticleTypeFlavor::Normal) => Ok(id),
        _ => Err(Error::config(format!(
            "{used_by} references topology species '{name}'; only normal species can react"
        ))),
    }
}

fn resolve_reaction(
    types: &ParticleTypeTable,
    kind: &ReactionKind,
    used_by: &str,
) -> Result<ReactionScheme> {
    let id = |name: &str| require_normal(types, name, used_by);
    Ok(match kind {
        ReactionKind::Conversion { from, to } => ReactionScheme::Conversion {
            from: id(from)?,
            to: id(to)?,
        },
        ReactionKind::Decay { from } => ReactionScheme::Decay { from: id(from)? },
        ReactionKind::Fission {
            from,
            to1,
            to2,
            product_distance,
            weight1,
            weight2,
        } => ReactionScheme::Fission {
            from: id(from)?,
            to1: id(to1)?,
            to2: id(to2)?,
            product_distance: *product_distance,
            weight1: *weight1,
            weight2: *weight2,
        },
        ReactionKind::Fusion {
            from1,
            from2,
            to,
            educt_distance,
            weight1,
            weight2,
        } => ReactionScheme::Fusion {
            from1: id(from1)?,
            from2: id(from2)?,
            to: id(to)?,
            educt_distance: *educt_distance,
            weight1: *weight1,
            weight2: *weight2,
        },
        ReactionKind::Enzymatic {
            catalyst,
            from,
            to,
            educt_distance,
        } => ReactionScheme::Enzymatic {
            catalyst: id(catalyst)?,
            from: id(from)?,
            to: id(to)?,
            educt_distance: *educt_distance,
        },
    })
}

impl ResolvedSystem {
    /// Run the configure pass over `ctx`.
    ///
    /// Errors:
    /// - `Error::InvalidConfiguration` for references to unregistered species or topology
    ///   types, reactions or compartments that mention topology species, and bonds between
    ///   non-topology species.
    pub fn resolve(ctx: &Context) -> Result<Self> {
        let types = ctx.particle_types().clone();

        let mut pair = HashMap::new();
        for entry in ctx.potentials().pair_potentials() {
            let used_by = format!("potential '{}'", entry.potential.name());
            let a = types.require(&entry.type_a, &used_by)?;
            let b = types.require(&entry.type_b, &used_by)?;
            pair.insert(pair_key(a, b), Arc::clone(&entry.potential));
        }

        let mut external = vec![Vec::new(); types.len()];
        for entry in ctx.potentials().external_potentials() {
            let used_by = format!("external potential '{}'", entry.potential.name());
            let t = types.require(&entry.species, &used_by)?;
            external[t as usize].push(Arc::clone(&entry.potential));
        }

        let reactions = ctx
            .reactions()
            .iter()
            .map(|r| {
                let used_by = format!("reaction '{}'", r.name);
                Ok(ResolvedReaction {
                    name: r.name.clone(),
                    rate: r.rate,
                    scheme: resolve_reaction(&types, &r.kind, &used_by)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let topologies = ctx.topologies();
        for sr in topologies.spatial_reactions() {
            for t in [&sr.type1, &sr.type2] {
                if topologies.id_of(t).is_none() {
                    return Err(Error::config(format!(
                        "spatial topology reaction '{}' references unregistered topology type '{t}'",
                        sr.name
                    )));
                }
            }
        }

        let mut bonds = HashMap::new();
        for bond in topologies.bonds() {
            let used_by = format!("bond ({}, {})", bond.type1, bond.type2);
            let a = types.require(&bond.type1, &used_by)?;
            let b = types.require(&bond.type2, &used_by)?;
            for (name, t) in [(&bond.type1, a), (&bond.type2, b)] {
                if types.get(t).map(|p| p.flavor) != Some(ParticleTypeFlavor::Topology) {
                    return Err(Error::config(format!(
                        "{used_by} references '{name}', which is not a topology species"
                    )));
                }
            }
            bonds.insert(
                pair_key(a, b),
                ResolvedBond {
                    force_constant: bond.force_constant,
                    length: bond.length,
                },
            );
        }

        let compartments = ctx
            .compartments()
            .iter()
            .map(|c| {
                let used_by = format!("compartment '{}'", c.name);
                let mut conversions = HashMap::new();
                for (from, to) in &c.conversions {
                    let from = require_normal(&types, from, &used_by)?;
                    let to = require_normal(&types, to, &used_by)?;
                    conversions.insert(from, to);
                }
                Ok(ResolvedCompartment {
                    name: c.name.clone(),
                    shape: c.shape.clone(),
                    conversions,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut system = Self {
            geometry: ctx.geometry(),
            kbt: ctx.kbt(),
            types,
            pair,
            external,
            reactions,
            bonds,
            compartments,
            topology_types: topologies.type_names().to_vec(),
            max_cutoff: 0.0,
        };
        let topology_radii = topologies.spatial_reactions().iter().map(|r| r.radius);
        system.max_cutoff = system.compute_max_cutoff(topology_radii);
        Ok(system)
    }

    /// Maximum over pair potential cutoffs, binary reaction radii and spatial topology
    /// reaction radii; 0 when there is nothing to interact.
    fn compute_max_cutoff(&self, topology_radii: impl Iterator<Item = f64>) -> f64 {
        let potentials = self.pair.values().map(|p| p.cutoff_radius());
        let reactions = self.reactions.iter().filter_map(|r| r.scheme.educt_distance());
        potentials
            .chain(reactions)
            .chain(topology_radii)
            .fold(0.0, f64::max)
    }

    pub fn max_cutoff(&self) -> f64 {
        self.max_cutoff
    }

    pub fn geometry(&self) -> &BoxGeometry {
        &self.geometry
    }

    pub fn kbt(&self) -> f64 {
        self.kbt
    }

    pub fn types(&self) -> &ParticleTypeTable {
        &self.types
    }

    pub fn diffusion_constant(&self, t: TypeId) -> f64 {
        self.types.get(t).map_or(0.0, |p| p.diffusion_constant)
    }

    pub fn flavor(&self, t: TypeId) -> Option<ParticleTypeFlavor> {
        self.types.get(t).map(|p| p.flavor)
    }

    pub fn pair_potential(&self, a: TypeId, b: TypeId) -> Option<&Arc<dyn PairPotential>> {
        self.pair.get(&pair_key(a, b))
    }

    pub fn has_pair_potentials(&self) -> bool {
        !self.pair.is_empty()
    }

    pub fn external_potentials(&self, t: TypeId) -> &[Arc<dyn ExternalPotential>] {
        match self.external.get(t as usize) {
            Some(potentials) => potentials,
            None => &[],
        }
    }

    /// Whether some species has an external potential attached.
    pub fn has_external_potentials(&self) -> bool {
        self.external.iter().any(|v| !v.is_empty())
    }

    pub fn bond(&self, a: TypeId, b: TypeId) -> Option<&ResolvedBond> {
        self.bonds.get(&pair_key(a, b))
    }

    pub fn reactions(&self) -> &[ResolvedReaction] {
        &self.reactions
    }

    pub fn compartments(&self) -> &[ResolvedCompartment] {
        &self.compartments
    }

    pub fn topology_type_id(&self, name: &str) -> Option<usize> {
        self.topology_types.iter().position(|t| t == name)
    }
}
