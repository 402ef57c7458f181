//! JSON configuration documents.
//!
//! A [`SystemConfig`] describes a whole system (geometry, species, interactions, initial
//! particles) plus an optional run section, and builds a [`Context`] or a ready-to-run
//! [`Simulation`] from it.

use crate::core::particle::{ParticleTypeFlavor, Vec3, DIM};
use crate::core::potential::PotentialParams;
use crate::core::reaction::ReactionKind;
use crate::core::{Context, Simulation};
use crate::error::Result;
use crate::kernel::{KernelRegistry, ReferenceKernel};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

fn default_flavor() -> ParticleTypeFlavor {
    ParticleTypeFlavor::Normal
}

fn half() -> f64 {
    0.5
}

fn yes() -> bool {
    true
}

fn default_kernel() -> String {
    ReferenceKernel::NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    pub diffusion_constant: f64,
    #[serde(default = "default_flavor")]
    pub flavor: ParticleTypeFlavor,
}

/// Built-in pair potentials, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PotentialConfig {
    HarmonicRepulsion {
        type_a: String,
        type_b: String,
        force_constant: f64,
        interaction_distance: f64,
    },
    LennardJones {
        type_a: String,
        type_b: String,
        epsilon: f64,
        sigma: f64,
        cutoff: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ExternalPotentialConfig {
    Box {
        species: String,
        force_constant: f64,
        origin: Vec3,
        extent: Vec3,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ReactionConfig {
    Conversion {
        name: String,
        from: String,
        to: String,
        rate: f64,
    },
    Decay {
        name: String,
        from: String,
        rate: f64,
    },
    Fission {
        name: String,
        from: String,
        to1: String,
        to2: String,
        rate: f64,
        product_distance: f64,
        #[serde(default = "half")]
        weight1: f64,
        #[serde(default = "half")]
        weight2: f64,
    },
    Fusion {
        name: String,
        from1: String,
        from2: String,
        to: String,
        rate: f64,
        educt_distance: f64,
        #[serde(default = "half")]
        weight1: f64,
        #[serde(default = "half")]
        weight2: f64,
    },
    Enzymatic {
        name: String,
        catalyst: String,
        from: String,
        to: String,
        rate: f64,
        educt_distance: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeConfig {
    Sphere {
        origin: Vec3,
        radius: f64,
        #[serde(default = "yes")]
        inside: bool,
    },
    Plane {
        normal: Vec3,
        distance: f64,
        #[serde(default = "yes")]
        larger: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompartmentConfig {
    pub name: String,
    pub shape: ShapeConfig,
    #[serde(default)]
    pub conversions: Vec<ConversionConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialReactionConfig {
    pub name: String,
    pub type1: String,
    pub type2: String,
    pub rate: f64,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondConfig {
    pub type1: String,
    pub type2: String,
    pub force_constant: f64,
    pub length: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub types: Vec<String>,
    pub spatial_reactions: Vec<SpatialReactionConfig>,
    pub bonds: Vec<BondConfig>,
}

/// An initial particle of a normal species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleConfig {
    pub species: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_kernel")]
    pub kernel: String,
    pub n_steps: u64,
    pub timestep: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Whole-system configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub kbt: f64,
    pub box_size: Vec3,
    pub periodic: [bool; DIM],
    pub species: Vec<SpeciesConfig>,
    pub potentials: Vec<PotentialConfig>,
    pub external_potentials: Vec<ExternalPotentialConfig>,
    pub reactions: Vec<ReactionConfig>,
    pub compartments: Vec<CompartmentConfig>,
    pub topologies: TopologyConfig,
    pub particles: Vec<ParticleConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            kbt: 1.0,
            box_size: [1.0; DIM],
            periodic: [true; DIM],
            species: Vec::new(),
            potentials: Vec::new(),
            external_potentials: Vec::new(),
            reactions: Vec::new(),
            compartments: Vec::new(),
            topologies: TopologyConfig::default(),
            particles: Vec::new(),
            run: None,
        }
    }
}

impl SystemConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        debug!(path = %path.display(), n_species = config.species.len(), "configuration loaded");
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the context the document describes. Particles and the run section are ignored.
    pub fn build_context(&self) -> Result<Context> {
        let mut ctx = Context::new();
        ctx.set_kbt(self.kbt)?;
        ctx.set_box_size(self.box_size)?;
        ctx.set_periodic_boundary_conditions(self.periodic)?;
        for s in &self.species {
            match s.flavor {
                ParticleTypeFlavor::Normal => ctx.add_species(&s.name, s.diffusion_constant)?,
                ParticleTypeFlavor::Topology => {
                    ctx.add_topology_species(&s.name, s.diffusion_constant)?
                }
            };
        }
        for p in &self.potentials {
            match p {
                PotentialConfig::HarmonicRepulsion {
                    type_a,
                    type_b,
                    force_constant,
                    interaction_distance,
                } => {
                    let params = PotentialParams::from([
                        ("force_constant".to_string(), *force_constant),
                        ("interaction_distance".to_string(), *interaction_distance),
                    ]);
                    ctx.potentials_mut()
                        .register("HarmonicRepulsion", type_a, type_b, &params)?
                }
                PotentialConfig::LennardJones {
                    type_a,
                    type_b,
                    epsilon,
                    sigma,
                    cutoff,
                } => {
                    let params = PotentialParams::from([
                        ("epsilon".to_string(), *epsilon),
                        ("sigma".to_string(), *sigma),
                        ("cutoff".to_string(), *cutoff),
                    ]);
                    ctx.potentials_mut()
                        .register("LennardJones", type_a, type_b, &params)?
                }
            }
        }
        for e in &self.external_potentials {
            match e {
                ExternalPotentialConfig::Box {
                    species,
                    force_constant,
                    origin,
                    extent,
                } => ctx
                    .potentials_mut()
                    .add_box(species, *force_constant, *origin, *extent)?,
            }
        }
        for r in &self.reactions {
            let (name, rate, kind) = r.to_kind();
            ctx.reactions_mut().add(name, rate, kind)?;
        }
        for c in &self.compartments {
            let conversions = c
                .conversions
                .iter()
                .map(|cv| (cv.from.clone(), cv.to.clone()))
                .collect();
            match &c.shape {
                ShapeConfig::Sphere {
                    origin,
                    radius,
                    inside,
                } => ctx
                    .compartments_mut()
                    .add_sphere(&c.name, conversions, *origin, *radius, *inside)?,
                ShapeConfig::Plane {
                    normal,
                    distance,
                    larger,
                } => ctx
                    .compartments_mut()
                    .add_plane(&c.name, conversions, *normal, *distance, *larger)?,
            }
        }
        let topologies = ctx.topologies_mut();
        for t in &self.topologies.types {
            topologies.add_type(t)?;
        }
        for sr in &self.topologies.spatial_reactions {
            topologies.add_spatial_reaction(&sr.name, &sr.type1, &sr.type2, sr.rate, sr.radius)?;
        }
        for b in &self.topologies.bonds {
            topologies.configure_bond_potential(&b.type1, &b.type2, b.force_constant, b.length)?;
        }
        Ok(ctx)
    }

    /// Build the context, bind the kernel of the run section (the reference kernel when
    /// absent), seed it and add the initial particles.
    pub fn build_simulation(&self, registry: &KernelRegistry) -> Result<Simulation> {
        let ctx = self.build_context()?;
        let kernel = self
            .run
            .as_ref()
            .map_or_else(default_kernel, |r| r.kernel.clone());
        let mut sim = ctx.simulation(registry, &kernel)?;
        sim.set_seed(self.run.as_ref().and_then(|r| r.seed));
        for p in &self.particles {
            sim.add_particle(&p.species, p.position)?;
        }
        Ok(sim)
    }
}

impl ReactionConfig {
    fn to_kind(&self) -> (&str, f64, ReactionKind) {
        match self {
            ReactionConfig::Conversion {
                name,
                from,
                to,
                rate,
            } => (
                name.as_str(),
                *rate,
                ReactionKind::Conversion {
                    from: from.clone(),
                    to: to.clone(),
                },
            ),
            ReactionConfig::Decay { name, from, rate } => {
                (name.as_str(), *rate, ReactionKind::Decay { from: from.clone() })
            }
            ReactionConfig::Fission {
                name,
                from,
                to1,
                to2,
                rate,
                product_distance,
                weight1,
                weight2,
            } => (
                name.as_str(),
                *rate,
                ReactionKind::Fission {
                    from: from.clone(),
                    to1: to1.clone(),
                    to2: to2.clone(),
                    product_distance: *product_distance,
                    weight1: *weight1,
                    weight2: *weight2,
                },
            ),
            ReactionConfig::Fusion {
                name,
                from1,
                from2,
                to,
                rate,
                educt_distance,
                weight1,
                weight2,
            } => (
                name.as_str(),
                *rate,
                ReactionKind::Fusion {
                    from1: from1.clone(),
                    from2: from2.clone(),
                    to: to.clone(),
                    educt_distance: *educt_distance,
                    weight1: *weight1,
                    weight2: *weight2,
                },
            ),
            ReactionConfig::Enzymatic {
                name,
                catalyst,
                from,
                to,
                rate,
                educt_distance,
            } => (
                name.as_str(),
                *rate,
                ReactionKind::Enzymatic {
                    catalyst: catalyst.clone(),
                    from: from.clone(),
                    to: to.clone(),
                    educt_distance: *educt_distance,
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_uses_defaults() -> Result<()> {
        let cfg = SystemConfig::from_json_str("{}")?;
        assert_eq!(cfg, SystemConfig::default());
        let ctx = cfg.build_context()?;
        assert_eq!(ctx.box_size(), [1.0; DIM]);
        assert_eq!(ctx.kbt(), 1.0);
        Ok(())
    }

    #[test]
    fn tagged_entries_parse() -> Result<()> {
        let cfg = SystemConfig::from_json_str(
            r#"{
                "box_size": [10, 10, 10],
                "species": [
                    {"name": "A", "diffusion_constant": 1.0},
                    {"name": "T", "diffusion_constant": 0.5, "flavor": "Topology"}
                ],
                "potentials": [
                    {"kind": "HarmonicRepulsion", "type_a": "A", "type_b": "A",
                     "force_constant": 2.0, "interaction_distance": 1.5}
                ],
                "reactions": [
                    {"kind": "Fusion", "name": "A+A->A", "from1": "A", "from2": "A",
                     "to": "A", "rate": 0.1, "educt_distance": 2.0}
                ],
                "compartments": [
                    {"name": "core", "shape": {"type": "Sphere", "origin": [0, 0, 0], "radius": 1},
                     "conversions": [{"from": "A", "to": "A"}]}
                ]
            }"#,
        )?;
        assert!(matches!(
            cfg.reactions[0],
            ReactionConfig::Fusion { weight1, .. } if weight1 == 0.5
        ));
        let ctx = cfg.build_context()?;
        assert_eq!(ctx.registered_species(), vec!["A", "T"]);
        assert_eq!(ctx.calculate_max_cutoff()?, 2.0);
        Ok(())
    }

    #[test]
    fn unknown_tag_is_a_serialization_error() {
        let err =
            SystemConfig::from_json_str(r#"{"potentials": [{"kind": "Morse"}]}"#).unwrap_err();
        assert!(matches!(err, crate::error::Error::Serialization(_)));
    }
}
