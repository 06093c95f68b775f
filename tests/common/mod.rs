use nalgebra::Vector3;
use quicksilver::constants::DPI;

/// Orbital period of a bound two-body orbit from its current state.
pub fn orbital_period(mu: f64, x: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    let alpha = 2.0 * mu / x.norm() - v.norm_squared();
    assert!(alpha > 0.0, "state is not bound (alpha = {alpha})");
    let a = mu / alpha;
    DPI * (a * a * a / mu).sqrt()
}

pub fn assert_vec3_close(got: &Vector3<f64>, exp: &Vector3<f64>, tol: f64, what: &str) {
    let scale = exp.norm().max(1.0);
    let diff = (got - exp).norm();
    assert!(
        diff <= tol * scale,
        "{what}: |Δ| = {diff:.3e} > {:.3e} (got = {got:?}, exp = {exp:?})",
        tol * scale
    );
}
