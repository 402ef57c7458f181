use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArrayDyn};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::core::potential::{custom_cutoff, CallbackError, CustomPotential, PotentialParams};
use crate::core::{ArrayLike, Context, Simulation, Vec3};
use crate::kernel::KernelRegistry;

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Accept a list/tuple or a NumPy array of any shape; shape checks happen in the core.
fn float_input(obj: &Bound<'_, PyAny>) -> PyResult<ArrayLike<f64>> {
    if let Ok(arr) = obj.extract::<PyReadonlyArrayDyn<'_, f64>>() {
        let view = arr.as_array();
        return Ok(ArrayLike::Array {
            shape: view.shape().to_vec(),
            data: view.iter().copied().collect(),
        });
    }
    Ok(ArrayLike::Sequence(obj.extract::<Vec<f64>>()?))
}

fn bool_input(obj: &Bound<'_, PyAny>) -> PyResult<ArrayLike<bool>> {
    if let Ok(arr) = obj.extract::<PyReadonlyArrayDyn<'_, bool>>() {
        let view = arr.as_array();
        return Ok(ArrayLike::Array {
            shape: view.shape().to_vec(),
            data: view.iter().copied().collect(),
        });
    }
    if let Ok(flags) = obj.extract::<Vec<bool>>() {
        return Ok(ArrayLike::Sequence(flags));
    }
    Ok(float_input(obj)?.truthy())
}

fn vec3_input(obj: &Bound<'_, PyAny>, what: &str) -> PyResult<Vec3> {
    float_input(obj)?.into_vec3(what).map_err(py_err)
}

fn callback_err(e: PyErr) -> CallbackError {
    Box::new(e)
}

/// ReactionDiffusionSystem: Python-facing builder for the simulation context.
///
/// - box_size / periodic_boundary_conditions accept lists or NumPy arrays that squeeze
///   to length 3
/// - register_potential(kind, type_a, type_b, **params) for built-in potentials
/// - register_potential(name, type_a, type_b, energy=f, force=g, cutoff=c) for callables
/// - simulation(kernel="SingleCPU") -> Simulation
#[pyclass(name = "ReactionDiffusionSystem")]
pub struct PyReactionDiffusionSystem {
    ctx: Context,
}

#[pymethods]
impl PyReactionDiffusionSystem {
    #[new]
    #[pyo3(signature = (box_size=None, periodic_boundary_conditions=None, kbt=1.0))]
    fn new(
        box_size: Option<&Bound<'_, PyAny>>,
        periodic_boundary_conditions: Option<&Bound<'_, PyAny>>,
        kbt: f64,
    ) -> PyResult<Self> {
        let mut ctx = Context::new();
        if let Some(size) = box_size {
            ctx.set_box_size(float_input(size)?).map_err(py_err)?;
        }
        if let Some(flags) = periodic_boundary_conditions {
            ctx.set_periodic_boundary_conditions(bool_input(flags)?)
                .map_err(py_err)?;
        }
        ctx.set_kbt(kbt).map_err(py_err)?;
        Ok(Self { ctx })
    }

    #[getter]
    fn kbt(&self) -> f64 {
        self.ctx.kbt()
    }

    #[setter]
    fn set_kbt(&mut self, kbt: f64) -> PyResult<()> {
        self.ctx.set_kbt(kbt).map_err(py_err)
    }

    #[getter]
    fn box_size(&self) -> Vec3 {
        self.ctx.box_size()
    }

    #[setter]
    fn set_box_size(&mut self, size: &Bound<'_, PyAny>) -> PyResult<()> {
        self.ctx.set_box_size(float_input(size)?).map_err(py_err)
    }

    #[getter]
    fn periodic_boundary_conditions(&self) -> [bool; 3] {
        self.ctx.periodic_boundary_conditions()
    }

    #[setter]
    fn set_periodic_boundary_conditions(&mut self, flags: &Bound<'_, PyAny>) -> PyResult<()> {
        self.ctx
            .set_periodic_boundary_conditions(bool_input(flags)?)
            .map_err(py_err)
    }

    #[getter]
    fn box_volume(&self) -> f64 {
        self.ctx.box_volume()
    }

    #[getter]
    fn registered_species(&self) -> Vec<String> {
        self.ctx.registered_species()
    }

    #[pyo3(signature = (name, diffusion_constant=1.0))]
    fn add_species(&mut self, name: &str, diffusion_constant: f64) -> PyResult<()> {
        self.ctx
            .add_species(name, diffusion_constant)
            .map(|_| ())
            .map_err(py_err)
    }

    #[pyo3(signature = (name, diffusion_constant=1.0))]
    fn add_topology_species(&mut self, name: &str, diffusion_constant: f64) -> PyResult<()> {
        self.ctx
            .add_topology_species(name, diffusion_constant)
            .map(|_| ())
            .map_err(py_err)
    }

    /// Register a pair potential between `type_a` and `type_b`.
    ///
    /// - built-in: `register_potential("HarmonicRepulsion", "A", "B", force_constant=1.0,
    ///   interaction_distance=2.0)`
    /// - custom: `register_potential(name, "A", "B", energy=f, force=g, cutoff=2.0)` with
    ///   callables `f(x_i, x_j) -> float` and `g(x_i, x_j) -> 3-sequence`. Exceptions raised
    ///   by the callables surface as a failed run.
    #[pyo3(signature = (kind, type_a, type_b, energy=None, force=None, **params))]
    fn register_potential(
        &mut self,
        kind: &str,
        type_a: &str,
        type_b: &str,
        energy: Option<Py<PyAny>>,
        force: Option<Py<PyAny>>,
        params: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<()> {
        let params: PotentialParams = match params {
            Some(d) => d.extract()?,
            None => PotentialParams::new(),
        };
        let (energy, force) = match (energy, force) {
            (None, None) => {
                return self
                    .ctx
                    .potentials_mut()
                    .register(kind, type_a, type_b, &params)
                    .map_err(py_err)
            }
            (Some(e), Some(f)) => (e, f),
            _ => {
                return Err(PyValueError::new_err(
                    "custom potentials need both `energy` and `force`",
                ))
            }
        };
        let cutoff = custom_cutoff(kind, &params).map_err(py_err)?;
        let pot = CustomPotential::new(
            kind,
            cutoff,
            move |x_i: &Vec3, x_j: &Vec3| {
                Python::attach(|py| -> PyResult<f64> {
                    energy.call1(py, (x_i.to_vec(), x_j.to_vec()))?.extract(py)
                })
                .map_err(callback_err)
            },
            move |x_i: &Vec3, x_j: &Vec3| {
                Python::attach(|py| -> PyResult<Vec3> {
                    let out = force.call1(py, (x_i.to_vec(), x_j.to_vec()))?;
                    out.extract::<[f64; 3]>(py)
                })
                .map_err(callback_err)
            },
        )
        .map_err(py_err)?;
        self.ctx
            .potentials_mut()
            .add_custom(type_a, type_b, pot)
            .map_err(py_err)
    }

    fn add_conversion(&mut self, name: &str, from: &str, to: &str, rate: f64) -> PyResult<()> {
        self.ctx
            .reactions_mut()
            .add_conversion(name, from, to, rate)
            .map_err(py_err)
    }

    fn add_decay(&mut self, name: &str, from: &str, rate: f64) -> PyResult<()> {
        self.ctx.reactions_mut().add_decay(name, from, rate).map_err(py_err)
    }

    fn add_fusion(
        &mut self,
        name: &str,
        from1: &str,
        from2: &str,
        to: &str,
        rate: f64,
        educt_distance: f64,
    ) -> PyResult<()> {
        self.ctx
            .reactions_mut()
            .add_fusion(name, from1, from2, to, rate, educt_distance)
            .map_err(py_err)
    }

    fn add_fission(
        &mut self,
        name: &str,
        from: &str,
        to1: &str,
        to2: &str,
        rate: f64,
        product_distance: f64,
    ) -> PyResult<()> {
        self.ctx
            .reactions_mut()
            .add_fission(name, from, to1, to2, rate, product_distance)
            .map_err(py_err)
    }

    fn calculate_max_cutoff(&self) -> PyResult<f64> {
        self.ctx.calculate_max_cutoff().map_err(py_err)
    }

    #[pyo3(signature = (kernel="SingleCPU"))]
    fn simulation(&self, kernel: &str) -> PyResult<PySimulation> {
        let registry = KernelRegistry::with_builtin_kernels();
        let sim = self.ctx.simulation(&registry, kernel).map_err(py_err)?;
        Ok(PySimulation { sim })
    }
}

/// Simulation handle returned by `ReactionDiffusionSystem.simulation`.
#[pyclass(name = "Simulation")]
pub struct PySimulation {
    sim: Simulation,
}

#[pymethods]
impl PySimulation {
    /// Add a particle of a normal species; returns its id.
    fn add_particle(&mut self, species: &str, position: &Bound<'_, PyAny>) -> PyResult<u64> {
        let r = vec3_input(position, "position")?;
        self.sim.add_particle(species, r).map_err(py_err)
    }

    #[pyo3(signature = (seed=None))]
    fn set_seed(&mut self, seed: Option<u64>) {
        self.sim.set_seed(seed);
    }

    /// Run `n_steps` steps of length `timestep`; the GIL is released meanwhile.
    fn run(&mut self, py: Python<'_>, n_steps: u64, timestep: f64) -> PyResult<()> {
        py.detach(|| self.sim.run(n_steps, timestep)).map_err(py_err)
    }

    fn reset(&mut self) -> PyResult<()> {
        self.sim.reset().map_err(py_err)
    }

    #[getter]
    fn state(&self) -> String {
        format!("{:?}", self.sim.state())
    }

    #[getter]
    fn time(&self) -> f64 {
        self.sim.time()
    }

    /// Return positions as a NumPy array of shape (N, 3).
    fn get_positions<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let particles = self.sim.particles();
        let mut arr = Array2::<f64>::zeros((particles.len(), 3));
        for (i, p) in particles.iter().enumerate() {
            for k in 0..3 {
                arr[[i, k]] = p.r[k];
            }
        }
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    fn get_species(&self) -> Vec<String> {
        self.sim.species()
    }

    /// Per-step records as (step, time, n_particles, potential_energy, reactions).
    fn get_records<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let records = self.sim.records();
        let mut arr = Array2::<f64>::zeros((records.len(), 5));
        for (i, r) in records.iter().enumerate() {
            arr[[i, 0]] = r.step as f64;
            arr[[i, 1]] = r.time;
            arr[[i, 2]] = r.n_particles as f64;
            arr[[i, 3]] = r.potential_energy;
            arr[[i, 4]] = r.reactions_performed as f64;
        }
        Ok(arr.into_pyarray(py).to_owned().into())
    }
}

#[pymodule]
fn rdsim(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyReactionDiffusionSystem>()?;
    m.add_class::<PySimulation>()?;
    Ok(())
}
