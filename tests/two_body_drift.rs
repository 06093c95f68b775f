use approx::assert_relative_eq;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use quicksilver::constants::DPI;
use quicksilver::{drift_one, specific_angular_momentum, specific_energy};

mod common;
use common::{assert_vec3_close, orbital_period};

#[test]
fn circular_orbit_closes_after_one_period() {
    let mu = 1.0;
    let mut x = Vector3::new(1.0, 0.0, 0.0);
    let mut v = Vector3::new(0.0, 1.0, 0.0);

    drift_one(mu, &mut x, &mut v, DPI).unwrap();

    assert_vec3_close(&x, &Vector3::new(1.0, 0.0, 0.0), 1e-10, "position");
    assert_vec3_close(&v, &Vector3::new(0.0, 1.0, 0.0), 1e-10, "velocity");
}

#[test]
fn eccentric_orbit_returns_to_periapsis() {
    let mu = 1.0;
    let x0 = Vector3::new(1.0, 0.0, 0.0);
    let v0 = Vector3::new(0.0, 0.5, 0.0);
    let period = orbital_period(mu, &x0, &v0);

    let mut x = x0;
    let mut v = v0;
    drift_one(mu, &mut x, &mut v, period).unwrap();

    assert_vec3_close(&x, &x0, 1e-10, "position after one period");
    assert_vec3_close(&v, &v0, 1e-10, "velocity after one period");
}

#[test]
fn hyperbolic_flyby_conserves_energy() {
    let mu = 1.0;
    let mut x = Vector3::new(10.0, 0.0, 0.0);
    let mut v = Vector3::new(0.0, 0.5, 0.0);
    let e0 = specific_energy(mu, &x, &v);
    assert!(e0 > 0.0);

    drift_one(mu, &mut x, &mut v, 20.0).unwrap();
    assert_relative_eq!(specific_energy(mu, &x, &v), e0, max_relative = 1e-12);

    // And back again.
    drift_one(mu, &mut x, &mut v, -20.0).unwrap();
    assert_vec3_close(&x, &Vector3::new(10.0, 0.0, 0.0), 1e-10, "position");
}

/// Randomized sweep across bound and unbound states: every drift conserves
/// energy and angular momentum, and reversing the step restores the state.
#[test]
fn random_states_conserve_invariants() {
    let mut rng = StdRng::seed_from_u64(0x5EED_CAFE);
    let mu = 1.0;

    for trial in 0..250 {
        let x0 = Vector3::new(
            rng.random_range(0.5..2.0) * if rng.random::<bool>() { 1.0 } else { -1.0 },
            rng.random_range(-1.5..1.5),
            rng.random_range(-1.0..1.0),
        );
        let v0 = Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-0.5..0.5),
        );
        let dt = rng.random_range(-3.0..3.0);

        let e0 = specific_energy(mu, &x0, &v0);
        let l0 = specific_angular_momentum(&x0, &v0);
        if l0.norm() < 0.05 {
            // Nearly radial orbits dive toward the singularity, where the
            // caller is responsible for collision handling before drifting.
            continue;
        }

        let mut x = x0;
        let mut v = v0;
        drift_one(mu, &mut x, &mut v, dt)
            .unwrap_or_else(|e| panic!("trial {trial} failed: {e} (x0={x0:?}, v0={v0:?}, dt={dt})"));

        let e1 = specific_energy(mu, &x, &v);
        let l1 = specific_angular_momentum(&x, &v);
        assert!(
            (e1 - e0).abs() <= 1e-12 * e0.abs().max(1.0),
            "trial {trial}: energy drift {:.3e}",
            e1 - e0
        );
        assert!(
            (l1 - l0).norm() <= 1e-12 * l0.norm(),
            "trial {trial}: angular momentum drift"
        );

        drift_one(mu, &mut x, &mut v, -dt).unwrap();
        assert_vec3_close(&x, &x0, 1e-10, &format!("trial {trial} round-trip position"));
        assert_vec3_close(&v, &v0, 1e-10, &format!("trial {trial} round-trip velocity"));
    }
}

/// Long multi-revolution drifts stay on the orbit thanks to the mod-2pi
/// reduction of the mean-anomaly increment.
#[test]
fn many_revolutions_single_drift() {
    let mu = 1.0;
    let x0 = Vector3::new(1.0, 0.0, 0.0);
    let v0 = Vector3::new(0.0, 0.9, 0.0);
    let period = orbital_period(mu, &x0, &v0);

    let mut x = x0;
    let mut v = v0;
    drift_one(mu, &mut x, &mut v, 1000.25 * period).unwrap();

    let mut xq = x0;
    let mut vq = v0;
    drift_one(mu, &mut xq, &mut vq, 0.25 * period).unwrap();

    assert_vec3_close(&x, &xq, 1e-7, "position after 1000.25 periods");
    assert_vec3_close(&v, &vq, 1e-7, "velocity after 1000.25 periods");
}
