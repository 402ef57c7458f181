//! Reaction descriptors and their registry.

use crate::error::{Error, Result};

/// Reaction schemes supported by the kernels.
///
/// Species are referenced by name and resolved when the context is configured.
#[derive(Debug, Clone, PartialEq)]
pub enum ReactionKind {
    /// `A -> B`
    Conversion { from: String, to: String },
    /// `A -> ∅`
    Decay { from: String },
    /// `A -> B + C`; products are placed `product_distance` apart along a random axis,
    /// at `weight1` and `weight2` of that distance on either side of the educt.
    Fission {
        from: String,
        to1: String,
        to2: String,
        product_distance: f64,
        weight1: f64,
        weight2: f64,
    },
    /// `A + B -> C` for educts closer than `educt_distance`; the product sits at
    /// `x_A + weight1 * (x_B - x_A)`.
    Fusion {
        from1: String,
        from2: String,
        to: String,
        educt_distance: f64,
        weight1: f64,
        weight2: f64,
    },
    /// `A + C -> B + C` for educts closer than `educt_distance`; the catalyst C is unchanged.
    Enzymatic {
        catalyst: String,
        from: String,
        to: String,
        educt_distance: f64,
    },
}

impl ReactionKind {
    /// Number of educts (1 or 2).
    pub fn order(&self) -> usize {
        match self {
            ReactionKind::Conversion { .. }
            | ReactionKind::Decay { .. }
            | ReactionKind::Fission { .. } => 1,
            ReactionKind::Fusion { .. } | ReactionKind::Enzymatic { .. } => 2,
        }
    }

    /// Reaction radius of binary reactions; `None` for unary ones.
    pub fn educt_distance(&self) -> Option<f64> {
        match self {
            ReactionKind::Fusion { educt_distance, .. }
            | ReactionKind::Enzymatic { educt_distance, .. } => Some(*educt_distance),
            _ => None,
        }
    }

    /// Every species name the reaction mentions.
    pub fn species(&self) -> Vec<&str> {
        let names: Vec<&String> = match self {
            ReactionKind::Conversion { from, to } => vec![from, to],
            ReactionKind::Decay { from } => vec![from],
            ReactionKind::Fission { from, to1, to2, .. } => vec![from, to1, to2],
            ReactionKind::Fusion {
                from1, from2, to, ..
            } => vec![from1, from2, to],
            ReactionKind::Enzymatic {
                catalyst, from, to, ..
            } => vec![catalyst, from, to],
        };
        names.into_iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub name: String,
    pub rate: f64,
    pub kind: ReactionKind,
}

fn check_distance(what: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::config(format!("{what} must be finite and >= 0, got {value}")))
    }
}

fn check_weights(name: &str, w1: f64, w2: f64) -> Result<()> {
    if !(w1.is_finite() && w2.is_finite() && w1 >= 0.0 && w2 >= 0.0) {
        return Err(Error::config(format!(
            "weights of reaction '{name}' must be finite and >= 0"
        )));
    }
    if ((w1 + w2) - 1.0).abs() > 1e-9 {
        return Err(Error::config(format!(
            "weights of reaction '{name}' must sum to 1, got {w1} + {w2}"
        )));
    }
    Ok(())
}

/// Reactions of a context, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ReactionRegistry {
    reactions: Vec<Reaction>,
}

impl ReactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reaction after validating its numeric parameters.
    ///
    /// Species names are not checked here; the configure pass does that.
    pub fn add(&mut self, name: &str, rate: f64, kind: ReactionKind) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::config("reaction name must not be empty"));
        }
        if self.reactions.iter().any(|r| r.name == name) {
            return Err(Error::config(format!(
                "reaction '{name}' is already registered"
            )));
        }
        if !rate.is_finite() || rate < 0.0 {
            return Err(Error::config(format!(
                "rate of reaction '{name}' must be finite and >= 0, got {rate}"
            )));
        }
        match &kind {
            ReactionKind::Fission {
                product_distance,
                weight1,
                weight2,
                ..
            } => {
                check_distance("product_distance", *product_distance)?;
                check_weights(name, *weight1, *weight2)?;
            }
            ReactionKind::Fusion {
                educt_distance,
                weight1,
                weight2,
                ..
            } => {
                check_distance("educt_distance", *educt_distance)?;
                check_weights(name, *weight1, *weight2)?;
            }
            ReactionKind::Enzymatic { educt_distance, .. } => {
                check_distance("educt_distance", *educt_distance)?;
            }
            ReactionKind::Conversion { .. } | ReactionKind::Decay { .. } => {}
        }
        self.reactions.push(Reaction {
            name: name.to_string(),
            rate,
            kind,
        });
        Ok(())
    }

    pub fn add_conversion(&mut self, name: &str, from: &str, to: &str, rate: f64) -> Result<()> {
        self.add(
            name,
            rate,
            ReactionKind::Conversion {
                from: from.into(),
                to: to.into(),
            },
        )
    }

    pub fn add_decay(&mut self, name: &str, from: &str, rate: f64) -> Result<()> {
        self.add(name, rate, ReactionKind::Decay { from: from.into() })
    }

    /// Fission with products placed symmetrically around the educt.
    pub fn add_fission(
        &mut self,
        name: &str,
        from: &str,
        to1: &str,
        to2: &str,
        rate: f64,
        product_distance: f64,
    ) -> Result<()> {
        self.add(
            name,
            rate,
            ReactionKind::Fission {
                from: from.into(),
                to1: to1.into(),
                to2: to2.into(),
                product_distance,
                weight1: 0.5,
                weight2: 0.5,
            },
        )
    }

    /// Fusion with the product placed halfway between the educts.
    pub fn add_fusion(
        &mut self,
        name: &str,
        from1: &str,
        from2: &str,
        to: &str,
        rate: f64,
        educt_distance: f64,
    ) -> Result<()> {
        self.add(
            name,
            rate,
            ReactionKind::Fusion {
                from1: from1.into(),
                from2: from2.into(),
                to: to.into(),
                educt_distance,
                weight1: 0.5,
                weight2: 0.5,
            },
        )
    }

    pub fn add_enzymatic(
        &mut self,
        name: &str,
        catalyst: &str,
        from: &str,
        to: &str,
        rate: f64,
        educt_distance: f64,
    ) -> Result<()> {
        self.add(
            name,
            rate,
            ReactionKind::Enzymatic {
                catalyst: catalyst.into(),
                from: from.into(),
                to: to.into(),
                educt_distance,
            },
        )
    }

    pub fn get(&self, name: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.iter()
    }

    pub fn n_order1(&self) -> usize {
        self.reactions.iter().filter(|r| r.kind.order() == 1).count()
    }

    pub fn n_order2(&self) -> usize {
        self.reactions.iter().filter(|r| r.kind.order() == 2).count()
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
}
