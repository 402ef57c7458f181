use crate::core::particle::{Vec3, DIM};

/// Simulation box centred at the origin, periodic per axis.
///
/// The valid region on axis `d` is `[-L_d / 2, L_d / 2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxGeometry {
    pub size: Vec3,
    pub periodic: [bool; DIM],
}

impl BoxGeometry {
    pub fn new(size: Vec3, periodic: [bool; DIM]) -> Self {
        Self { size, periodic }
    }

    /// Fold periodic axes into `[-L/2, L/2)`; non-periodic axes are left alone.
    pub fn wrap(&self, x: &Vec3) -> Vec3 {
        let mut out = *x;
        for k in 0..DIM {
            if self.periodic[k] {
                out[k] = wrap_axis(x[k], self.size[k]);
            }
        }
        out
    }

    /// `a - b` with the minimum image convention on periodic axes.
    pub fn displacement(&self, a: &Vec3, b: &Vec3) -> Vec3 {
        let mut d = [0.0; DIM];
        for k in 0..DIM {
            d[k] = a[k] - b[k];
            if self.periodic[k] {
                d[k] = minimum_image(d[k], self.size[k]);
            }
        }
        d
    }

    pub fn distance_squared(&self, a: &Vec3, b: &Vec3) -> f64 {
        let d = self.displacement(a, b);
        d.iter().map(|x| x * x).sum()
    }

    pub fn volume(&self) -> f64 {
        self.size.iter().product()
    }
}

fn wrap_axis(x: f64, l: f64) -> f64 {
    let half = 0.5 * l;
    let mut w = x - l * ((x + half) / l).floor();
    // Rounding can land exactly on the upper bound.
    if w >= half {
        w -= l;
    }
    if w < -half {
        w = -half;
    }
    w
}

fn minimum_image(d: f64, l: f64) -> f64 {
    let half = 0.5 * l;
    if d > half {
        d - l * ((d + half) / l).floor()
    } else if d < -half {
        d + l * ((half - d) / l).floor()
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wrap_into_half_open_box() {
        let g = BoxGeometry::new([10.0, 10.0, 10.0], [true, true, false]);
        let w = g.wrap(&[6.0, -5.0, 7.5]);
        assert_relative_eq!(w[0], -4.0);
        assert_relative_eq!(w[1], -5.0);
        // non-periodic axis untouched
        assert_relative_eq!(w[2], 7.5);
        let w = g.wrap(&[5.0, 25.0, 0.0]);
        assert_relative_eq!(w[0], -5.0);
        assert_relative_eq!(w[1], -5.0);
    }

    #[test]
    fn minimum_image_displacement() {
        let g = BoxGeometry::new([10.0, 10.0, 10.0], [true, true, false]);
        let d = g.displacement(&[4.5, 0.0, 4.5], &[-4.5, 0.0, -4.5]);
        assert_relative_eq!(d[0], -1.0);
        assert_relative_eq!(d[2], 9.0);
        assert_relative_eq!(g.distance_squared(&[4.5, 0.0, 0.0], &[-4.5, 0.0, 0.0]), 1.0);
        let far = g.displacement(&[23.0, 0.0, 0.0], &[0.0, 0.0, 0.0]);
        assert_relative_eq!(far[0], 3.0);
    }
}
