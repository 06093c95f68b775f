//! Two-body Kepler drift.
//!
//! Advances one body around a fixed central mass across a time step by solving
//! Kepler's equation, either in the small-increment difference form (fast path
//! for low-eccentricity, low-mean-motion elliptic steps) or in universal
//! variables (every other regime). The state update always goes through the
//! Gauss f/g coefficients, which keeps the map symplectic to solver tolerance.

use nalgebra::Vector3;

use crate::constants::{GravParam, DANBYB, DPI};
use crate::kepler::solve_universal;
use crate::quicksilver_errors::QuicksilverError;

/// How a successful [`drift_one`] got to its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftOutcome {
    /// The full step converged directly.
    Direct,
    /// The step only converged after subdivision into 10 equal sub-steps.
    Subdivided,
}

/// Gauss f/g coefficients relating the state at the end of a drift to the
/// state at its start: `x' = f*x + g*v`, `v' = fdot*x + gdot*v`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FgCoefficients {
    pub f: f64,
    pub g: f64,
    pub fdot: f64,
    pub gdot: f64,
}

impl FgCoefficients {
    pub(crate) fn advance(
        &self,
        x: &Vector3<f64>,
        v: &Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        (x * self.f + v * self.g, x * self.fdot + v * self.gdot)
    }

    /// `f*gdot - fdot*g`, identically 1 on an exact two-body arc.
    #[cfg(test)]
    pub(crate) fn wronskian(&self) -> f64 {
        self.f * self.gdot - self.fdot * self.g
    }
}

/// Advance a body on its two-body orbit around a central mass `mu` over `dt`.
///
/// Mutates `(x, v)` in place on success. If the single-step solve fails, the
/// step is retried as 10 equal sub-steps; a failure inside the retry loop is
/// surfaced immediately, leaving `(x, v)` at the last successfully drifted
/// sub-step.
///
/// Arguments
/// -----------------
/// * `mu`: gravitational parameter of the central body (must be positive).
/// * `x`: position relative to the central body. `‖x‖ = 0` (a collision) is
///   not trapped here; remove colliding bodies before drifting.
/// * `v`: velocity relative to the central body.
/// * `dt`: time step, either sign.
///
/// Return
/// ----------
/// * `Ok(DriftOutcome)` on success, telling whether subdivision was needed.
/// * `Err` with the Kepler failure of the first sub-step that did not
///   converge.
///
/// See also
/// ------------
/// * [`specific_energy`] – conserved to `DANBYB` relative across a drift.
/// * [`specific_angular_momentum`] – likewise conserved.
pub fn drift_one(
    mu: GravParam,
    x: &mut Vector3<f64>,
    v: &mut Vector3<f64>,
    dt: f64,
) -> Result<DriftOutcome, QuicksilverError> {
    if drift_dan(mu, x, v, dt).is_ok() {
        return Ok(DriftOutcome::Direct);
    }

    let sub = dt / 10.;
    for _ in 0..10 {
        drift_dan(mu, x, v, sub)?;
    }
    Ok(DriftOutcome::Subdivided)
}

/// Single-attempt Kepler drift (Danby-style).
///
/// On elliptic orbits the step is first reduced modulo one period, then routed
/// to the small-increment solver when both the mean-anomaly increment and the
/// eccentricity are small; anything else goes to the universal-variable
/// solver. A failure leaves `(x, v)` untouched.
pub(crate) fn drift_dan(
    mu: GravParam,
    x: &mut Vector3<f64>,
    v: &mut Vector3<f64>,
    dt0: f64,
) -> Result<(), QuicksilverError> {
    let r0 = x.norm();
    let v0s = v.norm_squared();
    let u = x.dot(v);
    let alpha = 2. * mu / r0 - v0s;

    let mut dt = dt0;

    if alpha > 0. {
        let a = mu / alpha;
        let asq = a * a;
        let en = (mu / (a * asq)).sqrt();
        let ec = 1. - r0 / a;
        let es = u / (en * asq);
        let esq = ec * ec + es * es;

        // Reduce the step to less than one orbit, preserving its sign.
        let dm = dt0 * en - (dt0 * en / DPI).trunc() * DPI;
        dt = dm / en;

        if dm * dm <= 0.16 && esq <= 0.36 && esq * dm * dm < 0.0016 {
            let (xkep, s, c) = kepmd(dm, es, ec);

            // kepmd does not verify its own root; the residual is checked
            // here so a bad fast-path solve falls out as code 1.
            let fchk = xkep - ec * s + es * (1. - c) - dm;
            if fchk * fchk > DANBYB {
                return Err(QuicksilverError::KeplerResidualTooLarge);
            }

            let fp = 1. - ec * c + es * s;
            let fg = FgCoefficients {
                f: (a / r0) * (c - 1.) + 1.,
                g: dt + (s - xkep) / en,
                fdot: -(a / (r0 * fp)) * en * s,
                gdot: (c - 1.) / fp + 1.,
            };
            let (xn, vn) = fg.advance(x, v);
            *x = xn;
            *v = vn;
            return Ok(());
        }
    }

    let sol = solve_universal(dt, r0, mu, alpha, u)?;
    let fg = FgCoefficients {
        f: 1. - (mu / r0) * sol.c2,
        g: dt - mu * sol.c3,
        fdot: -(mu / (sol.fp * r0)) * sol.c1,
        gdot: 1. - (mu / sol.fp) * sol.c2,
    };
    let (xn, vn) = fg.advance(x, v);
    *x = xn;
    *v = vn;
    Ok(())
}

/// Solve the difference form of Kepler's equation,
/// `x - ec*sin(x) + es*(1 - cos(x)) = dm`, for small `dm` and small
/// eccentricity components. Returns `(x, sin(x), cos(x))`.
///
/// The residual is deliberately not checked here; the caller owns the check.
fn kepmd(dm: f64, es: f64, ec: f64) -> (f64, f64, f64) {
    // Coefficients of an 11th-degree odd polynomial for sin; accurate to
    // well below DANBYB over the |x| <= 0.4 range this path accepts.
    const A0: f64 = 39916800.;
    const A1: f64 = 6652800.;
    const A2: f64 = 332640.;
    const A3: f64 = 7920.;
    const A4: f64 = 110.;

    let fac1 = 1. / (1. - ec);
    let q = fac1 * dm;
    let fac2 = es * es * fac1 - ec / 3.;
    let mut x = q * (1. - 0.5 * fac1 * q * (es - q * fac2));

    let y = x * x;
    let mut s = x * (A0 - y * (A1 - y * (A2 - y * (A3 - y * (A4 - y))))) / A0;
    let mut c = (1. - s * s).sqrt();

    // One quartic Newton correction.
    let f = x - ec * s + es * (1. - c) - dm;
    let fp = 1. - ec * c + es * s;
    let fpp = ec * s + es * c;
    let fppp = ec * c - es * s;
    let mut dx = -f / fp;
    dx = -f / (fp + 0.5 * dx * fpp);
    dx = -f / (fp + 0.5 * dx * fpp + dx * dx * fppp / 6.);
    x += dx;

    let y = x * x;
    s = x * (A0 - y * (A1 - y * (A2 - y * (A3 - y * (A4 - y))))) / A0;
    c = (1. - s * s).sqrt();

    (x, s, c)
}

/// Two-body specific orbital energy `v^2/2 - mu/‖x‖`.
pub fn specific_energy(mu: GravParam, x: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    v.norm_squared() / 2. - mu / x.norm()
}

/// Specific angular momentum `x × v`.
pub fn specific_angular_momentum(x: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    x.cross(v)
}
