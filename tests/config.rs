use rdsim::config::{ParticleConfig, RunConfig, SpeciesConfig};
use rdsim::core::potential::PotentialParams;
use rdsim::core::{PairPotential, ParticleTypeFlavor};
use rdsim::error::{Error, Result};
use rdsim::{Context, KernelRegistry, SimulationState, SystemConfig};
use std::io::Write;

const DOCUMENT: &str = r#"{
    "kbt": 2.5,
    "box_size": [12, 12, 12],
    "periodic": [true, true, false],
    "species": [
        {"name": "A", "diffusion_constant": 1.0},
        {"name": "B", "diffusion_constant": 0.5},
        {"name": "T", "diffusion_constant": 0.2, "flavor": "Topology"}
    ],
    "potentials": [
        {"kind": "HarmonicRepulsion", "type_a": "A", "type_b": "B",
         "force_constant": 1.0, "interaction_distance": 2.0},
        {"kind": "LennardJones", "type_a": "B", "type_b": "B",
         "epsilon": 0.5, "sigma": 1.0, "cutoff": 2.5}
    ],
    "external_potentials": [
        {"kind": "Box", "species": "A", "force_constant": 10.0,
         "origin": [-5, -5, -5], "extent": [10, 10, 10]},
        {"kind": "Box", "species": "B", "force_constant": 10.0,
         "origin": [-5, -5, -5], "extent": [10, 10, 10]}
    ],
    "reactions": [
        {"kind": "Conversion", "name": "a2b", "from": "A", "to": "B", "rate": 0.01},
        {"kind": "Enzymatic", "name": "cat", "catalyst": "B", "from": "A", "to": "B",
         "rate": 0.1, "educt_distance": 1.0}
    ],
    "compartments": [
        {"name": "floor", "shape": {"type": "Plane", "normal": [0, 0, 1], "distance": 4.0},
         "conversions": [{"from": "B", "to": "A"}]}
    ],
    "topologies": {
        "types": ["chain"],
        "spatial_reactions": [
            {"name": "join", "type1": "chain", "type2": "chain", "rate": 1.0, "radius": 3.0}
        ],
        "bonds": [{"type1": "T", "type2": "T", "force_constant": 10.0, "length": 1.0}]
    },
    "particles": [
        {"species": "A", "position": [0, 0, 0]},
        {"species": "B", "position": [1, 0, 0]},
        {"species": "A", "position": [7, 0, 0]}
    ],
    "run": {"kernel": "CPU", "n_steps": 10, "timestep": 0.01, "seed": 11}
}"#;

#[test]
fn document_builds_equivalent_context() -> Result<()> {
    let cfg = SystemConfig::from_json_str(DOCUMENT)?;
    let ctx = cfg.build_context()?;
    assert_eq!(ctx.kbt(), 2.5);
    assert_eq!(ctx.box_size(), [12.0; 3]);
    assert_eq!(ctx.periodic_boundary_conditions(), [true, true, false]);
    assert_eq!(ctx.registered_species(), vec!["A", "B", "T"]);
    assert_eq!(ctx.potentials().pair_potentials().len(), 2);
    assert_eq!(ctx.potentials().external_potentials().len(), 2);
    assert_eq!(ctx.reactions().len(), 2);
    assert_eq!(ctx.compartments().len(), 1);
    assert_eq!(ctx.topologies().type_names(), ["chain".to_string()]);
    assert!(ctx.topologies().bond("T", "T").is_some());
    assert_eq!(ctx.calculate_max_cutoff()?, 3.0);
    Ok(())
}

#[test]
fn serialized_document_parses_back() -> Result<()> {
    let cfg = SystemConfig::from_json_str(DOCUMENT)?;
    let text = cfg.to_json_string()?;
    assert_eq!(SystemConfig::from_json_str(&text)?, cfg);
    Ok(())
}

#[test]
fn document_from_file_runs() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(DOCUMENT.as_bytes())?;
    file.flush()?;

    let cfg = SystemConfig::from_path(file.path())?;
    let run = cfg.run.clone().expect("document has a run section");
    let registry = KernelRegistry::with_builtin_kernels();
    let mut sim = cfg.build_simulation(&registry)?;
    assert_eq!(sim.kernel_name(), Some("cpu"));
    // the third particle sits outside the box on a periodic axis and is wrapped
    assert_eq!(sim.positions()[2], [-5.0, 0.0, 0.0]);

    sim.run(run.n_steps, run.timestep)?;
    assert_eq!(sim.state(), SimulationState::Completed);
    assert_eq!(sim.records().len(), 10);
    Ok(())
}

#[test]
fn built_documents_match_hand_written_ones() -> Result<()> {
    let cfg = SystemConfig {
        kbt: 1.0,
        box_size: [4.0, 4.0, 4.0],
        species: vec![SpeciesConfig {
            name: "A".into(),
            diffusion_constant: 1.0,
            flavor: ParticleTypeFlavor::Normal,
        }],
        particles: vec![ParticleConfig {
            species: "A".into(),
            position: [0.5, 0.5, 0.5],
        }],
        run: Some(RunConfig {
            kernel: "reference-kernel".into(),
            n_steps: 5,
            timestep: 0.1,
            seed: None,
        }),
        ..SystemConfig::default()
    };
    let parsed = SystemConfig::from_json_str(
        r#"{
            "box_size": [4, 4, 4],
            "species": [{"name": "A", "diffusion_constant": 1.0}],
            "particles": [{"species": "A", "position": [0.5, 0.5, 0.5]}],
            "run": {"n_steps": 5, "timestep": 0.1}
        }"#,
    )?;
    assert_eq!(parsed, cfg);
    Ok(())
}

#[test]
fn document_potentials_match_named_registration() -> Result<()> {
    let cfg = SystemConfig::from_json_str(DOCUMENT)?;
    let ctx = cfg.build_context()?;
    let pairs = ctx.potentials().pair_potentials();
    let names: Vec<&str> = pairs.iter().map(|p| p.potential.name()).collect();
    assert_eq!(names, ["HarmonicRepulsion", "LennardJones"]);
    assert_eq!(pairs[1].potential.cutoff_radius(), 2.5);

    let mut by_name = Context::new();
    let params = PotentialParams::from([
        ("epsilon".to_string(), 0.5),
        ("sigma".to_string(), 1.0),
        ("cutoff".to_string(), 2.5),
    ]);
    by_name
        .potentials_mut()
        .register("LennardJones", "B", "B", &params)?;
    let x_i = [1.2, 0.3, 0.0];
    let x_j = [0.0; 3];
    let from_doc = &pairs[1].potential;
    let direct = &by_name.potentials().pair_potentials()[0].potential;
    assert_eq!(from_doc.energy(&x_i, &x_j)?, direct.energy(&x_i, &x_j)?);
    assert_eq!(from_doc.force(&x_i, &x_j)?, direct.force(&x_i, &x_j)?);

    // document entries go through the same parameter checks as named registration
    let bad = SystemConfig::from_json_str(
        r#"{
            "species": [{"name": "A", "diffusion_constant": 1.0}],
            "potentials": [{"kind": "LennardJones", "type_a": "A", "type_b": "A",
                            "epsilon": 1.0, "sigma": 0.0, "cutoff": 2.0}]
        }"#,
    )?;
    let err = bad.build_context().unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = SystemConfig::from_path(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn unknown_species_in_particles_is_invalid() -> Result<()> {
    let cfg = SystemConfig::from_json_str(
        r#"{
            "species": [{"name": "A", "diffusion_constant": 1.0}],
            "particles": [{"species": "Z", "position": [0, 0, 0]}]
        }"#,
    )?;
    let registry = KernelRegistry::with_builtin_kernels();
    let err = cfg.build_simulation(&registry).unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    Ok(())
}
