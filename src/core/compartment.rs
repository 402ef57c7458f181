//! Compartments: geometric regions that convert species found inside them.

use crate::core::particle::{dot, norm, sub, Vec3};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum CompartmentShape {
    /// Inside (or outside when `inside` is false) of a sphere.
    Sphere {
        origin: Vec3,
        radius: f64,
        inside: bool,
    },
    /// Half space `normal · x > distance` when `larger`, otherwise `normal · x < distance`.
    Plane {
        normal: Vec3,
        distance: f64,
        larger: bool,
    },
}

impl CompartmentShape {
    pub fn contains(&self, x: &Vec3) -> bool {
        match self {
            CompartmentShape::Sphere {
                origin,
                radius,
                inside,
            } => {
                let d = sub(x, origin);
                let within = dot(&d, &d) < radius * radius;
                within == *inside
            }
            CompartmentShape::Plane {
                normal,
                distance,
                larger,
            } => {
                let proj = dot(normal, x);
                if *larger {
                    proj > *distance
                } else {
                    proj < *distance
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compartment {
    pub name: String,
    pub shape: CompartmentShape,
    /// `(from, to)` species pairs converted inside the compartment.
    pub conversions: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct CompartmentRegistry {
    compartments: Vec<Compartment>,
}

impl CompartmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: &str,
        shape: CompartmentShape,
        conversions: Vec<(String, String)>,
    ) -> Result<()> {
        if self.compartments.iter().any(|c| c.name == name) {
            return Err(Error::config(format!(
                "compartment '{name}' is already registered"
            )));
        }
        match &shape {
            CompartmentShape::Sphere { origin, radius, .. } => {
                if !origin.iter().all(|x| x.is_finite()) || !radius.is_finite() || *radius <= 0.0 {
                    return Err(Error::config(format!(
                        "sphere compartment '{name}' needs a finite origin and radius > 0"
                    )));
                }
            }
            CompartmentShape::Plane {
                normal, distance, ..
            } => {
                let n = norm(normal);
                if !n.is_finite() || n == 0.0 || !distance.is_finite() {
                    return Err(Error::config(format!(
                        "plane compartment '{name}' needs a finite non-zero normal"
                    )));
                }
            }
        }
        self.compartments.push(Compartment {
            name: name.to_string(),
            shape,
            conversions,
        });
        Ok(())
    }

    pub fn add_sphere(
        &mut self,
        name: &str,
        conversions: Vec<(String, String)>,
        origin: Vec3,
        radius: f64,
        inside: bool,
    ) -> Result<()> {
        self.add(
            name,
            CompartmentShape::Sphere {
                origin,
                radius,
                inside,
            },
            conversions,
        )
    }

    pub fn add_plane(
        &mut self,
        name: &str,
        conversions: Vec<(String, String)>,
        normal: Vec3,
        distance: f64,
        larger: bool,
    ) -> Result<()> {
        self.add(
            name,
            CompartmentShape::Plane {
                normal,
                distance,
                larger,
            },
            conversions,
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &Compartment> {
        self.compartments.iter()
    }

    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::particle::DIM;

    #[test]
    fn sphere_inside_and_outside() {
        let inner = CompartmentShape::Sphere {
            origin: [0.0; DIM],
            radius: 1.0,
            inside: true,
        };
        let outer = CompartmentShape::Sphere {
            origin: [0.0; DIM],
            radius: 1.0,
            inside: false,
        };
        assert!(inner.contains(&[0.5, 0.0, 0.0]));
        assert!(!inner.contains(&[1.5, 0.0, 0.0]));
        assert!(outer.contains(&[0.0, 2.0, 0.0]));
    }

    #[test]
    fn plane_half_spaces() {
        let pos_x = CompartmentShape::Plane {
            normal: [1.0, 0.0, 0.0],
            distance: 0.0,
            larger: true,
        };
        assert!(pos_x.contains(&[0.1, -3.0, 2.0]));
        assert!(!pos_x.contains(&[-0.1, 0.0, 0.0]));
    }

    #[test]
    fn degenerate_shapes_rejected() {
        let mut reg = CompartmentRegistry::new();
        assert!(reg
            .add_sphere("s", vec![], [0.0; DIM], 0.0, true)
            .is_err());
        assert!(reg.add_plane("p", vec![], [0.0; DIM], 1.0, true).is_err());
        assert!(reg
            .add_plane("p", vec![("A".into(), "B".into())], [0.0, 0.0, 1.0], 1.0, true)
            .is_ok());
        assert!(reg.add_plane("p", vec![], [0.0, 0.0, 1.0], 1.0, true).is_err());
        assert_eq!(reg.len(), 1);
    }
}
