//! Topology types, spatial topology reactions and bond configuration.
//!
//! Only the parts the run loop needs are modelled: topology type names, the interaction
//! radius of spatial topology reactions (it bounds the neighbor search) and harmonic bonds
//! between topology species. Rewriting topology graphs is not supported.

use crate::error::{Error, Result};

/// A spatial topology reaction between two topology species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialTopologyReaction {
    pub name: String,
    pub type1: String,
    pub type2: String,
    pub rate: f64,
    pub radius: f64,
}

/// Harmonic bond `k (d - length)^2` between two topology species.
#[derive(Debug, Clone, PartialEq)]
pub struct BondConfig {
    pub type1: String,
    pub type2: String,
    pub force_constant: f64,
    pub length: f64,
}

impl BondConfig {
    fn matches(&self, a: &str, b: &str) -> bool {
        (self.type1 == a && self.type2 == b) || (self.type1 == b && self.type2 == a)
    }
}

/// A topology instance in a simulation: particles bound by bond edges.
///
/// `edges` index into `particle_ids`.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub type_id: usize,
    pub particle_ids: Vec<u64>,
    pub edges: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Default)]
pub struct TopologyRegistry {
    types: Vec<String>,
    spatial_reactions: Vec<SpatialTopologyReaction>,
    bonds: Vec<BondConfig>,
}

impl TopologyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topology type; returns its index.
    pub fn add_type(&mut self, name: &str) -> Result<usize> {
        if name.trim().is_empty() {
            return Err(Error::config("topology type name must not be empty"));
        }
        if self.types.iter().any(|t| t == name) {
            return Err(Error::config(format!(
                "topology type '{name}' is already registered"
            )));
        }
        self.types.push(name.to_string());
        Ok(self.types.len() - 1)
    }

    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.types.iter().position(|t| t == name)
    }

    pub fn type_names(&self) -> &[String] {
        &self.types
    }

    pub fn add_spatial_reaction(
        &mut self,
        name: &str,
        type1: &str,
        type2: &str,
        rate: f64,
        radius: f64,
    ) -> Result<()> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(Error::config(format!(
                "rate of spatial topology reaction '{name}' must be finite and >= 0"
            )));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(Error::config(format!(
                "radius of spatial topology reaction '{name}' must be finite and >= 0"
            )));
        }
        self.spatial_reactions.push(SpatialTopologyReaction {
            name: name.to_string(),
            type1: type1.to_string(),
            type2: type2.to_string(),
            rate,
            radius,
        });
        Ok(())
    }

    pub fn spatial_reactions(&self) -> &[SpatialTopologyReaction] {
        &self.spatial_reactions
    }

    /// Configure the bond between two topology species, replacing an earlier one.
    pub fn configure_bond_potential(
        &mut self,
        type1: &str,
        type2: &str,
        force_constant: f64,
        length: f64,
    ) -> Result<()> {
        if !force_constant.is_finite() || !length.is_finite() || length < 0.0 {
            return Err(Error::config(format!(
                "bond ({type1}, {type2}) needs a finite force constant and length >= 0"
            )));
        }
        self.bonds.retain(|b| !b.matches(type1, type2));
        self.bonds.push(BondConfig {
            type1: type1.to_string(),
            type2: type2.to_string(),
            force_constant,
            length,
        });
        Ok(())
    }

    pub fn bond(&self, type1: &str, type2: &str) -> Option<&BondConfig> {
        self.bonds.iter().find(|b| b.matches(type1, type2))
    }

    pub fn bonds(&self) -> &[BondConfig] {
        &self.bonds
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.spatial_reactions.is_empty() && self.bonds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_are_unique() -> Result<()> {
        let mut reg = TopologyRegistry::new();
        assert_eq!(reg.add_type("polymer")?, 0);
        assert_eq!(reg.add_type("ring")?, 1);
        assert!(reg.add_type("polymer").is_err());
        assert_eq!(reg.id_of("ring"), Some(1));
        Ok(())
    }

    #[test]
    fn bond_lookup_is_unordered_and_replaces() -> Result<()> {
        let mut reg = TopologyRegistry::new();
        reg.configure_bond_potential("T1", "T2", 10.0, 1.0)?;
        reg.configure_bond_potential("T2", "T1", 5.0, 2.0)?;
        assert_eq!(reg.bonds().len(), 1);
        let bond = reg.bond("T1", "T2").map(|b| (b.force_constant, b.length));
        assert_eq!(bond, Some((5.0, 2.0)));
        Ok(())
    }

    #[test]
    fn spatial_reaction_radius_validated() {
        let mut reg = TopologyRegistry::new();
        assert!(reg.add_spatial_reaction("bind", "T1", "T2", 1.0, -1.0).is_err());
        assert!(reg.add_spatial_reaction("bind", "T1", "T2", 1.0, 3.0).is_ok());
        assert_eq!(reg.spatial_reactions()[0].radius, 3.0);
    }
}
