use approx::assert_relative_eq;
use rdsim::core::potential::{BoxPotential, PotentialParams};
use rdsim::core::{
    CustomPotential, ExternalPotential, HarmonicRepulsion, LennardJones, PairPotential, Vec3,
};
use rdsim::error::{Error, Result};
use rdsim::Context;

fn numeric_gradient(pot: &dyn PairPotential, x_i: &Vec3, x_j: &Vec3) -> Result<Vec3> {
    let h = 1e-6;
    let mut g = [0.0; 3];
    for k in 0..3 {
        let mut plus = *x_i;
        let mut minus = *x_i;
        plus[k] += h;
        minus[k] -= h;
        g[k] = (pot.energy(&plus, x_j)? - pot.energy(&minus, x_j)?) / (2.0 * h);
    }
    Ok(g)
}

#[test]
fn harmonic_repulsion_inside_range() -> Result<()> {
    let pot = HarmonicRepulsion::new(2.0, 3.0)?;
    let x_i = [1.0, 0.0, 0.0];
    let x_j = [0.0, 0.0, 0.0];
    assert_relative_eq!(pot.energy(&x_i, &x_j)?, 8.0);
    let f = pot.force(&x_i, &x_j)?;
    assert_relative_eq!(f[0], -8.0);
    assert_eq!(f[1], 0.0);
    assert_eq!(f[2], 0.0);

    let x_i = [0.3, -1.1, 0.7];
    let x_j = [-0.2, 0.4, 1.5];
    let f = pot.force(&x_i, &x_j)?;
    let g = numeric_gradient(&pot, &x_i, &x_j)?;
    for k in 0..3 {
        assert_relative_eq!(f[k], g[k], epsilon = 1e-5);
    }
    Ok(())
}

#[test]
fn harmonic_repulsion_vanishes_at_and_beyond_range() -> Result<()> {
    let pot = HarmonicRepulsion::new(1.0, 5.0)?;
    let origin = [0.0, 0.0, 0.0];
    for x in [[5.0, 0.0, 0.0], [0.0, 3.0, 4.0], [7.0, -1.0, 2.0]] {
        assert_eq!(pot.energy(&x, &origin)?, 0.0);
        assert_eq!(pot.force(&x, &origin)?, [0.0; 3]);
    }
    Ok(())
}

#[test]
fn coincident_particles_get_zero_force() -> Result<()> {
    let pot = HarmonicRepulsion::new(1.5, 2.0)?;
    let x = [0.25, -0.5, 1.0];
    assert_relative_eq!(pot.energy(&x, &x)?, 1.5 * 4.0);
    let f = pot.force(&x, &x)?;
    assert!(f.iter().all(|c| *c == 0.0));
    Ok(())
}

#[test]
fn lennard_jones_minimum_and_cutoff() -> Result<()> {
    let pot = LennardJones::new(0.7, 1.0, 2.5)?;
    let origin = [0.0; 3];
    let r_min = 2f64.powf(1.0 / 6.0);
    let at_min = [r_min, 0.0, 0.0];
    assert_relative_eq!(pot.energy(&at_min, &origin)?, -0.7, epsilon = 1e-12);
    assert_relative_eq!(pot.force(&at_min, &origin)?[0], 0.0, epsilon = 1e-12);

    let x_i = [0.9, 0.6, -0.3];
    let f = pot.force(&x_i, &origin)?;
    let g = numeric_gradient(&pot, &x_i, &origin)?;
    for k in 0..3 {
        assert_relative_eq!(f[k], g[k], epsilon = 1e-4, max_relative = 1e-5);
    }

    let outside = [2.5, 0.0, 0.0];
    assert_eq!(pot.energy(&outside, &origin)?, 0.0);
    assert_eq!(pot.force(&outside, &origin)?, [0.0; 3]);
    assert_eq!(pot.force(&origin, &origin)?, [0.0; 3]);
    Ok(())
}

#[test]
fn box_potential_confines() -> Result<()> {
    let pot = BoxPotential::new(2.0, [-1.0, -1.0, -1.0], [2.0, 2.0, 2.0])?;
    assert_eq!(pot.energy(&[0.5, 0.0, -0.9]), 0.0);
    assert_eq!(pot.force(&[0.5, 0.0, -0.9]), [0.0; 3]);
    assert_relative_eq!(pot.energy(&[2.0, 0.0, 0.0]), 1.0);
    assert_eq!(pot.force(&[2.0, 0.0, -1.5]), [2.0, 0.0, -1.0]);
    Ok(())
}

#[test]
fn duplicate_pair_registration_rejected_in_both_orders() -> Result<()> {
    let mut ctx = Context::new();
    ctx.potentials_mut().add_harmonic_repulsion("A", "B", 1.0, 1.0)?;
    for (a, b) in [("A", "B"), ("B", "A")] {
        let err = ctx
            .potentials_mut()
            .add_lennard_jones(a, b, 1.0, 1.0, 2.0)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }
    // other pairs are unaffected
    ctx.potentials_mut().add_harmonic_repulsion("A", "A", 1.0, 1.0)?;
    assert_eq!(ctx.potentials().pair_potentials().len(), 2);
    Ok(())
}

#[test]
fn built_in_potentials_by_name() -> Result<()> {
    let mut ctx = Context::new();
    ctx.add_species("A", 1.0)?;
    let params = PotentialParams::from([
        ("force_constant".to_string(), 1.0),
        ("interaction_distance".to_string(), 1.5),
    ]);
    ctx.potentials_mut()
        .register("HarmonicRepulsion", "A", "A", &params)?;
    assert_eq!(ctx.calculate_max_cutoff()?, 1.5);

    let missing = PotentialParams::from([("epsilon".to_string(), 1.0)]);
    let err = ctx
        .potentials_mut()
        .register("LennardJones", "A", "B", &missing)
        .unwrap_err();
    assert!(err.to_string().contains("sigma"));

    let err = ctx
        .potentials_mut()
        .register("Morse", "A", "B", &params)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));

    let extra = PotentialParams::from([
        ("force_constant".to_string(), 1.0),
        ("interaction_distance".to_string(), 1.5),
        ("depth".to_string(), 3.0),
    ]);
    let err = ctx
        .potentials_mut()
        .register("HarmonicRepulsion", "A", "B", &extra)
        .unwrap_err();
    assert!(err.to_string().contains("depth"));
    Ok(())
}

#[test]
fn failing_custom_callable_is_numerical_divergence() -> Result<()> {
    let pot = CustomPotential::new(
        "flaky",
        1.0,
        |_: &Vec3, _: &Vec3| Err("energy unavailable".into()),
        |_: &Vec3, _: &Vec3| Ok([0.0; 3]),
    )?;
    let err = pot.energy(&[0.0; 3], &[0.5, 0.0, 0.0]).unwrap_err();
    assert!(matches!(err, Error::NumericalDivergence(_)));
    assert!(err.to_string().contains("flaky"));
    assert_eq!(pot.force(&[0.0; 3], &[0.5, 0.0, 0.0])?, [0.0; 3]);
    Ok(())
}

#[test]
fn invalid_parameters_rejected() {
    assert!(HarmonicRepulsion::new(f64::NAN, 1.0).is_err());
    assert!(HarmonicRepulsion::new(1.0, -1.0).is_err());
    assert!(LennardJones::new(1.0, 0.0, 2.0).is_err());
    assert!(CustomPotential::from_fns("c", -1.0, |_, _| 0.0, |_, _| [0.0; 3]).is_err());
}
