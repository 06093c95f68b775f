//! Universal-variable Kepler solver.
//!
//! Finds the universal anomaly `s` satisfying
//! `r0*c1(s^2*alpha)*s + u*c2*s^2 + mu*c3*s^3 = dt`, valid for every conic.
//! A cheap initial guess is polished by a third-order Newton iteration; when
//! that diverges, an order-5 Laguerre iteration takes over from whichever of
//! the Newton endpoint and the original guess has the smaller residual.

use crate::constants::{DANBYB, LAGUERRE_ORDER, NLAG2};
use crate::quicksilver_errors::QuicksilverError;
use crate::stumpff::stumpff;

/// Converged output of the universal solver.
///
/// The Stumpff values are pre-scaled by the powers of `s` they carry in
/// Kepler's equation: `c1 = c1(x)*s`, `c2 = c2(x)*s^2`, `c3 = c3(x)*s^3`,
/// so the Gauss f/g coefficients read directly off them.
pub(crate) struct UniversalSolution {
    pub s: f64,
    pub fp: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
}

/// Solve the universal Kepler equation for a time step `dt` from radius `r0`,
/// radial momentum `u = x.v` and energy parameter `alpha = 2*mu/r0 - v.v`.
pub(crate) fn solve_universal(
    dt: f64,
    r0: f64,
    mu: f64,
    alpha: f64,
    u: f64,
) -> Result<UniversalSolution, QuicksilverError> {
    let s_guess = initial_guess(dt, r0, mu, alpha, u);

    let (s_newton, converged) = newton(s_guess, dt, r0, mu, alpha, u);
    if let Some(solution) = converged {
        return Ok(solution);
    }

    // Restart Laguerre from whichever iterate is closer to the root.
    let f_guess = residual(s_guess, dt, r0, mu, alpha, u);
    let f_newton = residual(s_newton, dt, r0, mu, alpha, u);
    let s = if f_guess.abs() < f_newton.abs() {
        s_guess
    } else {
        s_newton
    };

    laguerre(s, dt, r0, mu, alpha, u)
}

/// Initial estimate of the universal anomaly.
fn initial_guess(dt: f64, r0: f64, mu: f64, alpha: f64, u: f64) -> f64 {
    if alpha > 0. {
        // Elliptic motion
        if dt / r0 <= 0.4 {
            return dt / r0 - (dt * dt * u) / (2. * r0 * r0 * r0);
        }
        let a = mu / alpha;
        let en = (mu / (a * a * a)).sqrt();
        let ec = 1. - r0 / a;
        let es = u / (en * a * a);
        let e = (ec * ec + es * es).sqrt();
        let y = en * dt - es;
        let sigma = 1f64.copysign(es * y.cos() + ec * y.sin());
        (y + sigma * 0.85 * e) / alpha.sqrt()
    } else {
        // Hyperbolic or parabolic motion
        cubic_guess(dt, r0, mu, alpha, u).unwrap_or(dt / r0)
    }
}

/// Real root of `(mu - alpha*r0)/6 * s^3 + u/2 * s^2 + r0*s - dt = 0` by
/// Cardano's formula. `None` when the discriminant is negative; the caller
/// falls back to the crude `dt/r0` estimate.
fn cubic_guess(dt: f64, r0: f64, mu: f64, alpha: f64, u: f64) -> Option<f64> {
    let denom = (mu - alpha * r0) / 6.;
    let a2 = 0.5 * u / denom;
    let a1 = r0 / denom;
    let a0 = -dt / denom;

    let q = (a1 - a2 * a2 / 3.) / 3.;
    let r = (a1 * a2 - 3. * a0) / 6. - a2 * a2 * a2 / 27.;
    let sq2 = q * q * q + r * r;

    if sq2 < 0. {
        return None;
    }
    let sq = sq2.sqrt();
    let p1 = cbrt_signed(r + sq);
    let p2 = cbrt_signed(r - sq);

    Some(p1 + p2 - a2 / 3.)
}

fn cbrt_signed(x: f64) -> f64 {
    if x <= 0. {
        -(-x).cbrt()
    } else {
        x.cbrt()
    }
}

/// Third-order Newton refinement, at most 6 passes.
///
/// Returns the last iterate together with the converged solution, if any. The
/// Stumpff values carried out are those of the evaluation point; `s` has the
/// final correction applied on top, which is what makes the f/g coefficients
/// accurate once the residual test passes.
fn newton(
    mut s: f64,
    dt: f64,
    r0: f64,
    mu: f64,
    alpha: f64,
    u: f64,
) -> (f64, Option<UniversalSolution>) {
    for _ in 0..6 {
        let x = s * s * alpha;
        let (c0, c1, c2, c3) = stumpff(x);
        let c1 = c1 * s;
        let c2 = c2 * s * s;
        let c3 = c3 * s * s * s;

        let f = r0 * c1 + u * c2 + mu * c3 - dt;
        let fp = r0 * c0 + u * c1 + mu * c2;
        let fpp = (mu - r0 * alpha) * c1 + u * c0;
        let fppp = (mu - r0 * alpha) * c0 - u * alpha * c1;

        let mut ds = -f / fp;
        ds = -f / (fp + ds * fpp / 2.);
        ds = -f / (fp + ds * fpp / 2. + ds * ds * fppp / 6.);
        s += ds;

        // A zero dt makes the relative test 0/0; an exactly vanishing
        // residual is converged regardless.
        let fdt = f / dt;
        if f == 0. || fdt * fdt < DANBYB * DANBYB {
            return (s, Some(UniversalSolution { s, fp, c1, c2, c3 }));
        }
    }
    (s, None)
}

/// Laguerre fallback with fixed order 5.
///
/// The cap is `NLAG2` for both the elliptic and hyperbolic energy signs; the
/// hyperbolic arm was probably once meant to get a larger budget, but the
/// single cap is kept.
fn laguerre(
    mut s: f64,
    dt: f64,
    r0: f64,
    mu: f64,
    alpha: f64,
    u: f64,
) -> Result<UniversalSolution, QuicksilverError> {
    let ln = LAGUERRE_ORDER;
    for _ in 0..NLAG2 {
        let x = s * s * alpha;
        let (c0, c1, c2, c3) = stumpff(x);
        let c1 = c1 * s;
        let c2 = c2 * s * s;
        let c3 = c3 * s * s * s;

        let f = r0 * c1 + u * c2 + mu * c3 - dt;
        let fp = r0 * c0 + u * c1 + mu * c2;
        let fpp = (mu - r0 * alpha) * c1 + u * c0;

        let radical = ((ln - 1.) * (ln - 1.) * fp * fp - (ln - 1.) * ln * f * fpp)
            .abs()
            .sqrt();
        let ds = -ln * f / (fp + radical.copysign(fp));
        s += ds;

        let fdt = f / dt;
        if f == 0. || fdt * fdt < DANBYB * DANBYB {
            return Ok(UniversalSolution { s, fp, c1, c2, c3 });
        }
    }

    Err(QuicksilverError::KeplerLaguerreFailed(NLAG2))
}

/// Residual of the universal Kepler equation at a candidate anomaly.
fn residual(s: f64, dt: f64, r0: f64, mu: f64, alpha: f64, u: f64) -> f64 {
    let x = s * s * alpha;
    let (_, c1, c2, c3) = stumpff(x);
    r0 * c1 * s + u * c2 * s * s + mu * c3 * s * s * s - dt
}
