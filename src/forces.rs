//! Acceleration callback seam for the Bulirsch-Stoer step.
//!
//! The step integrators consume accelerations through the [`Acceleration`]
//! trait and know nothing about the physics behind it. A direct-summation
//! heliocentric Newtonian evaluator is provided, covering mutual gravity,
//! central-body oblateness and the enumerated non-gravitational models; a
//! plain closure wrapped in [`FnForce`] works just as well.

use nalgebra::Vector3;
use smallvec::SmallVec;

use crate::constants::GravParam;

/// Black-box acceleration evaluator.
///
/// `masses` holds the gravitational masses `G*m_i` (index 0 is the central
/// body), `x`/`v` the heliocentric state, and `accel` receives one vector per
/// body. Implementations must not keep hidden mutable state that feeds back
/// into their inputs; the step-size controller's error estimate is undefined
/// otherwise.
pub trait Acceleration {
    fn eval(
        &mut self,
        t: f64,
        masses: &[GravParam],
        x: &[Vector3<f64>],
        v: &[Vector3<f64>],
        accel: &mut [Vector3<f64>],
    );
}

/// Adapter turning a plain closure into an [`Acceleration`].
pub struct FnForce<F>(pub F);

impl<F> Acceleration for FnForce<F>
where
    F: FnMut(f64, &[GravParam], &[Vector3<f64>], &[Vector3<f64>], &mut [Vector3<f64>]),
{
    fn eval(
        &mut self,
        t: f64,
        masses: &[GravParam],
        x: &[Vector3<f64>],
        v: &[Vector3<f64>],
        accel: &mut [Vector3<f64>],
    ) {
        (self.0)(t, masses, x, v, accel)
    }
}

/// Non-gravitational force model applied per body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonGravModel {
    #[default]
    None,
    /// Marsden-style cometary outgassing, coefficients `A1..A3`.
    CometaryJet,
    /// Radial radiation pressure, coefficient `beta` (fraction of central
    /// gravity).
    RadiationPressure,
    /// Both of the above.
    Both,
}

/// Zonal harmonics of the central body. The moments multiply even powers of
/// `radius`, so a zeroed struct disables the whole term.
#[derive(Debug, Clone, Copy, Default)]
pub struct Oblateness {
    pub j2: f64,
    pub j4: f64,
    pub j6: f64,
    /// Equatorial radius the moments refer to, in position units.
    pub radius: f64,
}

impl Oblateness {
    fn is_zero(&self) -> bool {
        self.j2 == 0. && self.j4 == 0. && self.j6 == 0.
    }
}

/// Liveness flag per body; removed bodies exert and feel no forces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyStatus {
    #[default]
    Active,
    Removed,
}

/// Close-encounter pair list `(i, j)`, indices into the body arrays.
pub type EncounterPairs = SmallVec<[(usize, usize); 8]>;

/// Auxiliary parameters of the provided Newtonian evaluator.
///
/// `ngf[k]` holds the per-body non-gravitational coefficients
/// `[A1, A2, A3, beta]`; `spin` is carried for custom force models layered on
/// top (the Newtonian evaluator itself does not read it). An empty `status`
/// vector means every body is active. When `encounters` is non-empty, the
/// mutual-perturbation sum is restricted to the listed pairs and only the
/// central attraction is applied globally, which is the cheap evaluation the
/// close-encounter machinery asks for.
#[derive(Debug, Clone, Default)]
pub struct ForceParams {
    pub non_grav: NonGravModel,
    pub oblateness: Oblateness,
    pub ngf: Vec<[f64; 4]>,
    pub spin: Vec<Vector3<f64>>,
    pub status: Vec<BodyStatus>,
    pub encounters: EncounterPairs,
}

impl ForceParams {
    fn active(&self, k: usize) -> bool {
        self.status.get(k).copied().unwrap_or_default() == BodyStatus::Active
    }
}

/// Direct-summation heliocentric Newtonian gravity.
///
/// Accelerations are expressed in the frame of the fixed central body
/// (index 0), so the central term carries the combined mass and each
/// perturber contributes both its direct pull and the indirect term from its
/// pull on the centre:
/// `a_k = -(m0 + m_k)*x_k/r_k^3 + sum_j m_j*((x_j - x_k)/d^3 - x_j/r_j^3)`.
#[derive(Debug, Clone, Default)]
pub struct NewtonianGravity {
    pub params: ForceParams,
}

impl NewtonianGravity {
    pub fn new(params: ForceParams) -> Self {
        Self { params }
    }
}

// Marsden et al. (1973) outgassing law g(r) = ALPHA*q^-M*(1+q^N)^-K with
// q = r/R0; R0 in the caller's position unit.
const NGF_ALPHA: f64 = 0.111262;
const NGF_R0: f64 = 2.808;
const NGF_M: f64 = 2.15;
const NGF_N: f64 = 5.093;
const NGF_K: f64 = 4.6142;

impl Acceleration for NewtonianGravity {
    fn eval(
        &mut self,
        _t: f64,
        masses: &[GravParam],
        x: &[Vector3<f64>],
        v: &[Vector3<f64>],
        accel: &mut [Vector3<f64>],
    ) {
        let nbod = x.len();
        let p = &self.params;
        for a in accel.iter_mut() {
            *a = Vector3::zeros();
        }

        // Central attraction (+ optional oblateness and non-grav terms).
        for k in 1..nbod {
            if !p.active(k) {
                continue;
            }
            let r2 = x[k].norm_squared();
            let r_1 = 1. / r2.sqrt();
            let r_3 = r_1 / r2;
            accel[k] -= (masses[0] + masses[k]) * r_3 * x[k];

            if !p.oblateness.is_zero() {
                accel[k] += oblateness_accel(masses[0], &p.oblateness, &x[k], r2);
            }

            match p.non_grav {
                NonGravModel::None => {}
                NonGravModel::CometaryJet => {
                    accel[k] += jet_accel(p.ngf.get(k), &x[k], &v[k]);
                }
                NonGravModel::RadiationPressure => {
                    accel[k] += radiation_accel(p.ngf.get(k), masses[0], &x[k], r_3);
                }
                NonGravModel::Both => {
                    accel[k] += jet_accel(p.ngf.get(k), &x[k], &v[k]);
                    accel[k] += radiation_accel(p.ngf.get(k), masses[0], &x[k], r_3);
                }
            }
        }

        // Mutual perturbations: direct plus indirect (heliocentric frame).
        if p.encounters.is_empty() {
            for j in 1..nbod {
                if !p.active(j) || masses[j] == 0. {
                    continue;
                }
                for k in 1..nbod {
                    if k == j || !p.active(k) {
                        continue;
                    }
                    accel[k] += pair_perturbation(masses[j], &x[j], &x[k]);
                }
            }
        } else {
            for &(i, j) in p.encounters.iter() {
                if !p.active(i) || !p.active(j) {
                    continue;
                }
                if masses[j] != 0. {
                    accel[i] += pair_perturbation(masses[j], &x[j], &x[i]);
                }
                if masses[i] != 0. {
                    accel[j] += pair_perturbation(masses[i], &x[i], &x[j]);
                }
            }
        }
    }
}

/// Direct + indirect pull of perturber at `xj` on a body at `xk`.
fn pair_perturbation(mj: GravParam, xj: &Vector3<f64>, xk: &Vector3<f64>) -> Vector3<f64> {
    let d = xj - xk;
    let d3 = d.norm_squared() * d.norm();
    let rj2 = xj.norm_squared();
    let rj3 = rj2 * rj2.sqrt();
    mj * (d / d3 - xj / rj3)
}

/// J2/J4/J6 acceleration in the frame of the oblate central body.
fn oblateness_accel(
    mu: GravParam,
    ob: &Oblateness,
    x: &Vector3<f64>,
    r2: f64,
) -> Vector3<f64> {
    let r_2 = 1. / r2;
    let r_1 = r_2.sqrt();
    let gm_r3 = mu * r_2 * r_1;
    let u2 = x.z * x.z * r_2;
    let u4 = u2 * u2;
    let u6 = u4 * u2;

    let rr = ob.radius * ob.radius * r_2;
    let jr2 = ob.j2 * rr;
    let jr4 = ob.j4 * rr * rr;
    let jr6 = ob.j6 * rr * rr * rr;

    let tmp2 = jr2 * (7.5 * u2 - 1.5)
        + jr4 * (39.375 * u4 - 26.25 * u2 + 1.875)
        + jr6 * (187.6875 * u6 - 216.5625 * u4 + 59.0625 * u2 - 2.1875);
    let tmp3 = jr2 * 3.
        + jr4 * (17.5 * u2 - 7.5)
        + jr6 * (86.625 * u4 - 78.75 * u2 + 13.125);

    gm_r3 * Vector3::new(x.x * tmp2, x.y * tmp2, x.z * (tmp2 - tmp3))
}

/// Marsden A1/A2/A3 outgassing acceleration in the radial / transverse /
/// orbit-normal frame. Degenerate (radial) orbits only keep the radial term.
fn jet_accel(ngf: Option<&[f64; 4]>, x: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    let Some(&[a1, a2, a3, _]) = ngf else {
        return Vector3::zeros();
    };
    if a1 == 0. && a2 == 0. && a3 == 0. {
        return Vector3::zeros();
    }

    let r = x.norm();
    let q = r / NGF_R0;
    let g = NGF_ALPHA * q.powf(-NGF_M) * (1. + q.powf(NGF_N)).powf(-NGF_K);

    let er = x / r;
    let h = x.cross(v);
    let hn = h.norm();
    if hn == 0. {
        return g * a1 * er;
    }
    let en = h / hn;
    let et = en.cross(&er);
    g * (a1 * er + a2 * et + a3 * en)
}

/// Radial radiation-pressure acceleration, `beta` times the central gravity.
fn radiation_accel(
    ngf: Option<&[f64; 4]>,
    mu: GravParam,
    x: &Vector3<f64>,
    r_3: f64,
) -> Vector3<f64> {
    let beta = ngf.map(|c| c[3]).unwrap_or(0.);
    beta * mu * r_3 * x
}
