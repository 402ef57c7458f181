//! Kernel-independent building blocks of a timestep.
//!
//! Both built-in kernels share these; they differ only in how the loops over pairs and
//! particles are scheduled.

use crate::core::event::{Event, EventKind};
use crate::core::particle::{add, is_finite, scale, sub, Particle, Vec3, DIM};
use crate::core::resolved::{ReactionScheme, ResolvedSystem};
use crate::error::{Error, Result};
use crate::kernel::ForceEvaluation;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Exp, StandardNormal, UnitSphere};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Energy gradient with respect to `x_i` of one neighbor pair, and its energy.
///
/// Returns zeros when no potential is registered for the pair's types.
pub fn pair_term(
    system: &ResolvedSystem,
    particles: &[Particle],
    (i, j): (usize, usize),
) -> Result<(Vec3, f64)> {
    let (p_i, p_j) = (&particles[i], &particles[j]);
    let Some(pot) = system.pair_potential(p_i.type_id, p_j.type_id) else {
        return Ok(([0.0; DIM], 0.0));
    };
    // Image of j closest to i.
    let d = system.geometry().displacement(&p_i.r, &p_j.r);
    let x_j = sub(&p_i.r, &d);
    let grad = pot.force(&p_i.r, &x_j)?;
    let energy = pot.energy(&p_i.r, &x_j)?;
    if !is_finite(&grad) || !energy.is_finite() {
        return Err(Error::divergence(format!(
            "potential '{}' returned a non-finite value for particles {} and {}",
            pot.name(),
            p_i.id,
            p_j.id
        )));
    }
    Ok((grad, energy))
}

/// Harmonic bond `k (d - l)^2` between particles `i` and `j`: gradient wrt `x_i` and energy.
pub fn bond_term(
    system: &ResolvedSystem,
    particles: &[Particle],
    (i, j): (usize, usize),
) -> Result<(Vec3, f64)> {
    let (p_i, p_j) = (&particles[i], &particles[j]);
    let bond = system.bond(p_i.type_id, p_j.type_id).ok_or_else(|| {
        Error::config(format!(
            "no bond potential configured between particles {} and {}",
            p_i.id, p_j.id
        ))
    })?;
    let d = system.geometry().displacement(&p_i.r, &p_j.r);
    let dist = d.iter().map(|x| x * x).sum::<f64>().sqrt();
    let stretch = dist - bond.length;
    let energy = bond.force_constant * stretch * stretch;
    if dist == 0.0 {
        return Ok(([0.0; DIM], energy));
    }
    Ok((scale(&d, 2.0 * bond.force_constant * stretch / dist), energy))
}

/// Force and energy from the external potentials acting on one particle.
pub fn external_term(system: &ResolvedSystem, p: &Particle) -> (Vec3, f64) {
    let mut force = [0.0; DIM];
    let mut energy = 0.0;
    for pot in system.external_potentials(p.type_id) {
        force = sub(&force, &pot.force(&p.r));
        energy += pot.energy(&p.r);
    }
    (force, energy)
}

/// Sequential force accumulation over neighbor pairs, external potentials and bonds.
///
/// For each pair, the gradient `g` is applied as `-g` to the first particle and `+g` to the
/// second.
pub fn accumulate_forces(
    system: &ResolvedSystem,
    particles: &[Particle],
    pairs: &[(usize, usize)],
    bonds: &[(usize, usize)],
) -> Result<ForceEvaluation> {
    let mut forces = vec![[0.0; DIM]; particles.len()];
    let mut potential_energy = 0.0;
    for (p, f) in particles.iter().zip(forces.iter_mut()) {
        let (ext, e) = external_term(system, p);
        *f = ext;
        potential_energy += e;
    }
    if system.has_pair_potentials() {
        for &(i, j) in pairs {
            let (g, e) = pair_term(system, particles, (i, j))?;
            forces[i] = sub(&forces[i], &g);
            forces[j] = add(&forces[j], &g);
            potential_energy += e;
        }
    }
    for &(i, j) in bonds {
        let (g, e) = bond_term(system, particles, (i, j))?;
        forces[i] = sub(&forces[i], &g);
        forces[j] = add(&forces[j], &g);
        potential_energy += e;
    }
    Ok(ForceEvaluation {
        forces,
        potential_energy,
    })
}

/// One standard normal 3-vector per particle, drawn in particle order.
pub fn draw_noise(rng: &mut StdRng, n: usize) -> Vec<Vec3> {
    (0..n)
        .map(|_| {
            let mut xi = [0.0; DIM];
            for x in xi.iter_mut() {
                *x = rng.sample(StandardNormal);
            }
            xi
        })
        .collect()
}

/// Euler-Maruyama step `x + (D / kT) F dt + sqrt(2 D dt) xi`, wrapped into the box.
///
/// With `kT == 0` a zero force component has zero drift; any other component diverges.
pub fn integrate_particle(
    system: &ResolvedSystem,
    p: &Particle,
    force: &Vec3,
    noise: &Vec3,
    dt: f64,
) -> Result<Vec3> {
    let d = system.diffusion_constant(p.type_id);
    let kbt = system.kbt();
    let amplitude = (2.0 * d * dt).sqrt();
    let mut x = p.r;
    for k in 0..DIM {
        let drift = if force[k] == 0.0 {
            0.0
        } else {
            d / kbt * force[k] * dt
        };
        x[k] += drift + amplitude * noise[k];
    }
    if !is_finite(&x) {
        return Err(Error::divergence(format!(
            "particle {} left the finite domain (force {:?}, kbt {kbt})",
            p.id, force
        )));
    }
    Ok(system.geometry().wrap(&x))
}

/// Schedule and fire reactions for one step of length `dt`.
///
/// Every candidate (particle and unary reaction, or neighbor pair within the educt
/// distance and binary reaction) draws an exponential waiting time with the reaction
/// rate. Candidates firing before `dt` run in time order; a candidate whose educts were
/// consumed by an earlier one is dropped. Topology particles never react.
///
/// Returns how often each reaction fired, indexed like [`ResolvedSystem::reactions`].
pub fn perform_reactions(
    system: &ResolvedSystem,
    particles: &mut Vec<Particle>,
    pairs: &[(usize, usize)],
    dt: f64,
    rng: &mut StdRng,
    next_id: &mut u64,
) -> Result<Vec<usize>> {
    let reactions = system.reactions();
    let mut counts = vec![0usize; reactions.len()];
    if reactions.is_empty() || particles.is_empty() {
        return Ok(counts);
    }

    let mut queue = BinaryHeap::new();
    for (i, p) in particles.iter().enumerate() {
        if p.topology_id.is_some() {
            continue;
        }
        for (ri, r) in reactions.iter().enumerate() {
            if r.rate <= 0.0 || r.scheme.educts() != (p.type_id, None) {
                continue;
            }
            let t = waiting_time(r.rate, rng)?;
            if t < dt {
                queue.push(Reverse(Event::new(t, ri, EventKind::Unary { i })?));
            }
        }
    }
    for &(a, b) in pairs {
        let (p_a, p_b) = (&particles[a], &particles[b]);
        if p_a.topology_id.is_some() || p_b.topology_id.is_some() {
            continue;
        }
        let dist_sq = system.geometry().distance_squared(&p_a.r, &p_b.r);
        for (ri, r) in reactions.iter().enumerate() {
            let (Some(radius), (e1, Some(e2))) = (r.scheme.educt_distance(), r.scheme.educts())
            else {
                continue;
            };
            if r.rate <= 0.0 || dist_sq >= radius * radius {
                continue;
            }
            // Orient the pair so that `i` carries the first educt type.
            let kind = if (p_a.type_id, p_b.type_id) == (e1, e2) {
                EventKind::Binary { i: a, j: b }
            } else if (p_b.type_id, p_a.type_id) == (e1, e2) {
                EventKind::Binary { i: b, j: a }
            } else {
                continue;
            };
            let t = waiting_time(r.rate, rng)?;
            if t < dt {
                queue.push(Reverse(Event::new(t, ri, kind)?));
            }
        }
    }

    let geometry = *system.geometry();
    let n = particles.len();
    let mut consumed = vec![false; n];
    let mut removed = vec![false; n];
    let mut created = Vec::new();

    while let Some(Reverse(ev)) = queue.pop() {
        if !ev.is_valid(&consumed) {
            continue;
        }
        match (reactions[ev.reaction].scheme, ev.kind) {
            (ReactionScheme::Conversion { to, .. }, EventKind::Unary { i }) => {
                particles[i].type_id = to;
                consumed[i] = true;
            }
            (ReactionScheme::Decay { .. }, EventKind::Unary { i }) => {
                removed[i] = true;
                consumed[i] = true;
            }
            (
                ReactionScheme::Fission {
                    to1,
                    to2,
                    product_distance,
                    weight1,
                    weight2,
                    ..
                },
                EventKind::Unary { i },
            ) => {
                let axis: [f64; DIM] = UnitSphere.sample(rng);
                let x = particles[i].r;
                let x1 = geometry.wrap(&add(&x, &scale(&axis, weight1 * product_distance)));
                let x2 = geometry.wrap(&sub(&x, &scale(&axis, weight2 * product_distance)));
                particles[i].type_id = to1;
                particles[i].set_position(x1)?;
                created.push(Particle::new(*next_id, to2, x2)?);
                *next_id += 1;
                consumed[i] = true;
            }
            (
                ReactionScheme::Fusion { to, weight1, .. },
                EventKind::Binary { i, j },
            ) => {
                let x_i = particles[i].r;
                let towards_j = geometry.displacement(&particles[j].r, &x_i);
                let x = geometry.wrap(&add(&x_i, &scale(&towards_j, weight1)));
                particles[i].type_id = to;
                particles[i].set_position(x)?;
                removed[j] = true;
                consumed[i] = true;
                consumed[j] = true;
            }
            (ReactionScheme::Enzymatic { to, .. }, EventKind::Binary { i, .. }) => {
                // The catalyst stays available for further events.
                particles[i].type_id = to;
                consumed[i] = true;
            }
            (scheme, kind) => {
                return Err(Error::divergence(format!(
                    "reaction '{}' ({scheme:?}) scheduled with mismatched educts {kind:?}",
                    reactions[ev.reaction].name
                )));
            }
        }
        counts[ev.reaction] += 1;
    }

    if removed.iter().any(|&r| r) {
        let mut k = 0;
        particles.retain(|_| {
            let keep = !removed[k];
            k += 1;
            keep
        });
    }
    particles.extend(created);
    Ok(counts)
}

fn waiting_time(rate: f64, rng: &mut StdRng) -> Result<f64> {
    let exp = Exp::new(rate)
        .map_err(|e| Error::config(format!("invalid reaction rate {rate}: {e}")))?;
    Ok(exp.sample(rng))
}

/// Convert particles found inside compartments; returns the number converted.
///
/// Each particle is converted at most once per call, by the first matching compartment.
pub fn apply_compartments(system: &ResolvedSystem, particles: &mut [Particle]) -> usize {
    let compartments = system.compartments();
    if compartments.is_empty() {
        return 0;
    }
    let mut converted = 0;
    for p in particles.iter_mut() {
        let hit = compartments
            .iter()
            .filter(|c| c.shape.contains(&p.r))
            .find_map(|c| c.conversions.get(&p.type_id).copied());
        if let Some(to) = hit {
            p.type_id = to;
            converted += 1;
        }
    }
    converted
}
