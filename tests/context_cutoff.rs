use approx::assert_relative_eq;
use rdsim::core::ArrayLike;
use rdsim::error::{Error, Result};
use rdsim::Context;

#[test]
fn box_size_and_periodic_round_trip() -> Result<()> {
    let mut ctx = Context::new();
    let inputs: Vec<ArrayLike<f64>> = vec![
        vec![1.0, 3.6, 7.0].into(),
        (1.0, 3.6, 7.0).into(),
        [1.0, 3.6, 7.0].into(),
        ArrayLike::Array {
            shape: vec![1, 3],
            data: vec![1.0, 3.6, 7.0],
        },
        ArrayLike::Array {
            shape: vec![3, 1, 1],
            data: vec![1.0, 3.6, 7.0],
        },
    ];
    for input in inputs {
        ctx.set_box_size(input)?;
        assert_eq!(ctx.box_size(), [1.0, 3.6, 7.0]);
    }

    let flags: Vec<ArrayLike<bool>> = vec![
        vec![true, false, true].into(),
        (true, false, true).into(),
        ArrayLike::Array {
            shape: vec![1, 3],
            data: vec![true, false, true],
        },
        ArrayLike::Array {
            shape: vec![3],
            data: vec![1.0, 0.0, 2.0],
        }
        .truthy(),
    ];
    for input in flags {
        ctx.set_periodic_boundary_conditions(input)?;
        assert_eq!(ctx.periodic_boundary_conditions(), [true, false, true]);
    }
    Ok(())
}

#[test]
fn wrong_lengths_are_invalid_configuration() {
    let mut ctx = Context::new();
    for data in [vec![], vec![1.0], vec![1.0, 2.0], vec![1.0, 2.0, 3.0, 4.0]] {
        let err = ctx.set_box_size(data).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }
    for data in [vec![true], vec![true; 4]] {
        let err = ctx.set_periodic_boundary_conditions(data).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }
    let err = ctx
        .set_box_size(ArrayLike::Array {
            shape: vec![3, 3],
            data: vec![1.0; 9],
        })
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    assert_eq!(ctx.box_size(), [1.0; 3]);
    assert_eq!(ctx.periodic_boundary_conditions(), [true; 3]);
}

#[test]
fn box_volume_is_product_of_edges() -> Result<()> {
    let mut ctx = Context::new();
    ctx.set_box_size(vec![1.0, 3.6, 7.0])?;
    assert_relative_eq!(ctx.box_volume(), 25.2, max_relative = 1e-12);
    ctx.set_box_size(vec![0.5, 2.0, 11.0])?;
    assert_relative_eq!(ctx.box_volume(), 11.0, max_relative = 1e-12);
    Ok(())
}

#[test]
fn species_listed_in_insertion_order() -> Result<()> {
    let mut ctx = Context::new();
    ctx.add_species("B", 1.0)?;
    ctx.add_topology_species("T", 0.5)?;
    ctx.add_species("A", 2.0)?;
    assert_eq!(ctx.registered_species(), vec!["B", "T", "A"]);
    let err = ctx.add_species("A", 3.0).unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    Ok(())
}

#[test]
fn empty_system_has_zero_cutoff() -> Result<()> {
    let mut ctx = Context::new();
    assert_eq!(ctx.calculate_max_cutoff()?, 0.0);
    ctx.add_species("A", 1.0)?;
    assert_eq!(ctx.calculate_max_cutoff()?, 0.0);
    Ok(())
}

#[test]
fn cutoff_grows_with_interactions() -> Result<()> {
    let mut ctx = Context::new();
    ctx.set_box_size(vec![50.0, 50.0, 50.0])?;
    ctx.add_species("A", 1.0)?;
    ctx.add_species("B", 1.0)?;
    ctx.add_species("C", 1.0)?;
    ctx.add_topology_species("T", 1.0)?;

    let mut last = ctx.calculate_max_cutoff()?;
    ctx.potentials_mut().add_harmonic_repulsion("A", "B", 1.0, 2.0)?;
    let c = ctx.calculate_max_cutoff()?;
    assert_eq!(c, 2.0);
    assert!(c >= last);
    last = c;

    // smaller radius leaves the maximum alone
    ctx.potentials_mut().add_harmonic_repulsion("A", "A", 1.0, 0.5)?;
    let c = ctx.calculate_max_cutoff()?;
    assert_eq!(c, last);

    ctx.reactions_mut().add_fusion("fus", "A", "B", "C", 1.0, 3.0)?;
    let c = ctx.calculate_max_cutoff()?;
    assert_eq!(c, 3.0);
    assert!(c >= last);
    last = c;

    // order-1 reactions have no radius
    ctx.reactions_mut().add_decay("dec", "C", 1.0)?;
    assert_eq!(ctx.calculate_max_cutoff()?, last);

    let topologies = ctx.topologies_mut();
    topologies.add_type("chain")?;
    topologies.add_spatial_reaction("link", "chain", "chain", 1.0, 4.5)?;
    let c = ctx.calculate_max_cutoff()?;
    assert_eq!(c, 4.5);
    assert!(c >= last);
    Ok(())
}

#[test]
fn unregistered_species_fail_at_configure_time() -> Result<()> {
    let mut ctx = Context::new();
    ctx.add_species("A", 1.0)?;
    // registration only records names
    ctx.potentials_mut().add_harmonic_repulsion("A", "ghost", 1.0, 1.0)?;
    let err = ctx.calculate_max_cutoff().unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    assert!(err.to_string().contains("ghost"));
    assert!(ctx.configure().is_err());
    Ok(())
}

#[test]
fn reactions_between_topology_species_are_rejected() -> Result<()> {
    let mut ctx = Context::new();
    ctx.add_species("A", 1.0)?;
    ctx.add_topology_species("T", 1.0)?;
    ctx.reactions_mut().add_conversion("conv", "A", "T", 1.0)?;
    let err = ctx.configure().unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    Ok(())
}
