//! Adaptive Bulirsch-Stoer step.
//!
//! Advances the bodies of an N-body system over one step at controlled
//! relative error: modified-midpoint integrations at an increasing substep
//! count are folded into a polynomial extrapolation table, the last correction
//! column serves as the error estimate, and the step is halved and retried
//! until the estimate passes the tolerance.
//!
//! Two variants share the machinery. [`BulirschStoer::step`] handles forces
//! that depend on velocity (drag, outgassing) with `2n` leapfrog
//! half-substeps; [`BulirschStoer::step_conservative`] assumes a
//! position-only force and covers the step with `n` Stoermer substeps, which
//! buys four more extrapolation columns for the same budget.

use nalgebra::Vector3;

use crate::constants::{GravParam, BS1_SEQ_MAX, BS2_SEQ_MAX, GROW, SHRINK};
use crate::forces::Acceleration;
use crate::quicksilver_errors::QuicksilverError;

/// Controller parameters for the Bulirsch-Stoer step.
///
/// Defaults
/// -----------------
/// * `tol`: 1e-12
/// * `min_step`: 0.0 (disabled; the halvings cap is the active bound)
/// * `max_halvings`: 40
#[derive(Debug, Clone)]
pub struct BsParams {
    /// Relative error tolerance per step, `0 < tol < 1`.
    pub tol: f64,
    /// Hard floor on `|h0|`; going below it aborts the step.
    pub min_step: f64,
    /// Consecutive halvings allowed within one step before giving up.
    pub max_halvings: u32,
}

impl Default for BsParams {
    fn default() -> Self {
        Self {
            tol: 1e-12,
            min_step: 0.,
            max_halvings: 40,
        }
    }
}

impl BsParams {
    /// Create a new [`BsParamsBuilder`] to configure custom parameters.
    pub fn builder() -> BsParamsBuilder {
        BsParamsBuilder::new()
    }
}

/// Builder for [`BsParams`], with validation.
#[derive(Debug, Clone)]
pub struct BsParamsBuilder {
    params: BsParams,
}

impl Default for BsParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BsParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: BsParams::default(),
        }
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.params.tol = tol;
        self
    }

    pub fn min_step(mut self, min_step: f64) -> Self {
        self.params.min_step = min_step;
        self
    }

    pub fn max_halvings(mut self, max_halvings: u32) -> Self {
        self.params.max_halvings = max_halvings;
        self
    }

    /// Finalize the builder and produce a [`BsParams`] instance.
    ///
    /// Return
    /// ----------
    /// * `Err(QuicksilverError::InvalidStepParams)` unless `0 < tol < 1`,
    ///   `min_step >= 0` and `max_halvings >= 1`.
    pub fn build(self) -> Result<BsParams, QuicksilverError> {
        let p = &self.params;
        if !(p.tol > 0. && p.tol < 1.) {
            return Err(QuicksilverError::InvalidStepParams(format!(
                "tol must lie in (0, 1), got {}",
                p.tol
            )));
        }
        if !(p.min_step >= 0.) {
            return Err(QuicksilverError::InvalidStepParams(format!(
                "min_step must be non-negative, got {}",
                p.min_step
            )));
        }
        if p.max_halvings == 0 {
            return Err(QuicksilverError::InvalidStepParams(
                "max_halvings must be at least 1".into(),
            ));
        }
        Ok(self.params)
    }
}

/// Bulirsch-Stoer stepper with preallocated working storage.
///
/// All buffers are sized once for the largest body count the caller will
/// pass; the step methods themselves never allocate, so a stepper can sit in
/// the hot loop of a long simulation.
#[derive(Debug, Clone)]
pub struct BulirschStoer {
    params: BsParams,
    nmax: usize,
    // substep state
    x: Vec<Vector3<f64>>,
    v: Vec<Vector3<f64>>,
    xend: Vec<Vector3<f64>>,
    vend: Vec<Vector3<f64>>,
    a: Vec<Vector3<f64>>,
    a0: Vec<Vector3<f64>>,
    // Stoermer accumulators (conservative variant)
    b: Vec<Vector3<f64>>,
    c: Vec<Vector3<f64>>,
    // error scales
    xscal: Vec<f64>,
    vscal: Vec<f64>,
    // extrapolation table, column-major: d[col * nmax + body]
    d: Vec<[f64; 6]>,
    h2: [f64; BS2_SEQ_MAX],
}

impl BulirschStoer {
    /// Stepper with default parameters, sized for `max_bodies`.
    pub fn new(max_bodies: usize) -> Self {
        Self::with_params(BsParams::default(), max_bodies)
    }

    pub fn with_params(params: BsParams, max_bodies: usize) -> Self {
        Self {
            params,
            nmax: max_bodies,
            x: vec![Vector3::zeros(); max_bodies],
            v: vec![Vector3::zeros(); max_bodies],
            xend: vec![Vector3::zeros(); max_bodies],
            vend: vec![Vector3::zeros(); max_bodies],
            a: vec![Vector3::zeros(); max_bodies],
            a0: vec![Vector3::zeros(); max_bodies],
            b: vec![Vector3::zeros(); max_bodies],
            c: vec![Vector3::zeros(); max_bodies],
            xscal: vec![0.; max_bodies],
            vscal: vec![0.; max_bodies],
            d: vec![[0.; 6]; BS2_SEQ_MAX * max_bodies],
            h2: [0.; BS2_SEQ_MAX],
        }
    }

    pub fn params(&self) -> &BsParams {
        &self.params
    }

    /// Advance the system by one step of attempted size `*h0` using a force
    /// that may depend on velocity.
    ///
    /// Bodies `1..n` are integrated; the central body at index 0 stays put.
    /// On success `(x0, v0)` hold the new state, `*h0` the recommended next
    /// step, and the accepted size is returned. On failure (the halvings cap
    /// or the `min_step` floor was hit) the state is left at the start of the
    /// step.
    ///
    /// Arguments
    /// -----------------
    /// * `t`: epoch at the start of the step, forwarded to the force.
    /// * `masses`: gravitational masses, one per body.
    /// * `x0`, `v0`: heliocentric state, mutated in place on success.
    /// * `h0`: attempted step size in, recommended next size out.
    /// * `force`: acceleration evaluator.
    ///
    /// Return
    /// ----------
    /// * `Ok(hdid)` – the step size actually taken (the entry value of `*h0`
    ///   after any internal halving).
    pub fn step<F: Acceleration + ?Sized>(
        &mut self,
        t: f64,
        masses: &[GravParam],
        x0: &mut [Vector3<f64>],
        v0: &mut [Vector3<f64>],
        h0: &mut f64,
        force: &mut F,
    ) -> Result<f64, QuicksilverError> {
        let nbod = x0.len();
        assert!(nbod <= self.nmax, "stepper sized for {} bodies, got {nbod}", self.nmax);
        assert_eq!(nbod, v0.len());
        assert_eq!(nbod, masses.len());

        let tol2 = self.params.tol * self.params.tol;
        for k in 1..nbod {
            self.xscal[k] = 1. / x0[k].norm_squared();
            self.vscal[k] = 1. / v0[k].norm_squared();
        }

        force.eval(t, masses, x0, v0, &mut self.a0[..nbod]);

        let mut halvings = 0u32;
        loop {
            for n in 1..=BS1_SEQ_MAX {
                let h = *h0 / (2. * n as f64);
                // The h0^2 factor is common to every column and cancels in
                // the extrapolation weights.
                self.h2[n - 1] = 0.25 / (n * n) as f64;
                let hx2 = h * 2.;

                // First half-substep seeds the two staggered sequences.
                for k in 1..nbod {
                    self.x[k] = x0[k] + h * v0[k];
                    self.v[k] = v0[k] + h * self.a0[k];
                }
                force.eval(t, masses, &self.x[..nbod], &self.v[..nbod], &mut self.a[..nbod]);
                for k in 1..nbod {
                    self.xend[k] = x0[k] + hx2 * self.v[k];
                    self.vend[k] = v0[k] + hx2 * self.a[k];
                }

                // Leapfrog the sequences across each other.
                for _ in 2..=n {
                    force.eval(
                        t,
                        masses,
                        &self.xend[..nbod],
                        &self.vend[..nbod],
                        &mut self.a[..nbod],
                    );
                    for k in 1..nbod {
                        self.x[k] += hx2 * self.vend[k];
                        self.v[k] += hx2 * self.a[k];
                    }
                    force.eval(t, masses, &self.x[..nbod], &self.v[..nbod], &mut self.a[..nbod]);
                    for k in 1..nbod {
                        self.xend[k] += hx2 * self.v[k];
                        self.vend[k] += hx2 * self.a[k];
                    }
                }
                force.eval(
                    t,
                    masses,
                    &self.xend[..nbod],
                    &self.vend[..nbod],
                    &mut self.a[..nbod],
                );

                // Synchronized endpoint of the two sequences.
                for k in 1..nbod {
                    let xs = 0.5 * (self.xend[k] + self.x[k] + h * self.vend[k]);
                    let vs = 0.5 * (self.vend[k] + self.v[k] + h * self.a[k]);
                    self.d[(n - 1) * self.nmax + k] = [xs.x, xs.y, xs.z, vs.x, vs.y, vs.z];
                }
                self.extrapolate(n, nbod);

                if n >= 4 {
                    if self.error_norm(nbod) <= tol2 {
                        self.commit(n, nbod, x0, v0);
                        let hdid = *h0;
                        if n == BS1_SEQ_MAX {
                            *h0 *= SHRINK;
                        } else if n < 7 {
                            *h0 *= GROW;
                        }
                        return Ok(hdid);
                    }
                }
            }

            halvings += 1;
            *h0 *= 0.5;
            if halvings >= self.params.max_halvings || h0.abs() < self.params.min_step {
                return Err(QuicksilverError::StepSizeUnderflow {
                    halvings,
                    h0: *h0,
                });
            }
        }
    }

    /// Advance the system by one step using a force that depends on position
    /// only.
    ///
    /// Stoermer substeps need a single force evaluation each, so the substep
    /// sequence extends to 12 columns. The start-of-step velocities are what
    /// the force receives at every substep; a velocity-dependent force fed
    /// through here produces garbage error estimates.
    pub fn step_conservative<F: Acceleration + ?Sized>(
        &mut self,
        t: f64,
        masses: &[GravParam],
        x0: &mut [Vector3<f64>],
        v0: &mut [Vector3<f64>],
        h0: &mut f64,
        force: &mut F,
    ) -> Result<f64, QuicksilverError> {
        let nbod = x0.len();
        assert!(nbod <= self.nmax, "stepper sized for {} bodies, got {nbod}", self.nmax);
        assert_eq!(nbod, v0.len());
        assert_eq!(nbod, masses.len());

        let tol2 = self.params.tol * self.params.tol;
        for k in 1..nbod {
            self.xscal[k] = 1. / x0[k].norm_squared();
            self.vscal[k] = 1. / v0[k].norm_squared();
        }

        force.eval(t, masses, x0, v0, &mut self.a0[..nbod]);

        let mut halvings = 0u32;
        loop {
            for n in 1..=BS2_SEQ_MAX {
                let h = *h0 / n as f64;
                let hby2 = 0.5 * h;
                self.h2[n - 1] = h * h;

                for k in 1..nbod {
                    self.b[k] = 0.5 * self.a0[k];
                    self.c[k] = Vector3::zeros();
                    self.x[k] = x0[k] + h * (v0[k] + hby2 * self.a0[k]);
                }
                force.eval(t, masses, &self.x[..nbod], v0, &mut self.a[..nbod]);

                for j in 2..=n {
                    for k in 1..nbod {
                        self.b[k] += self.a[k];
                        self.c[k] += self.b[k];
                        self.x[k] = x0[k]
                            + self.h2[n - 1] * (self.c[k] + 0.5 * self.a0[k])
                            + (j as f64) * h * v0[k];
                    }
                    force.eval(t, masses, &self.x[..nbod], v0, &mut self.a[..nbod]);
                }

                for k in 1..nbod {
                    let vs = v0[k] + h * self.b[k] + hby2 * self.a[k];
                    let xs = self.x[k];
                    self.d[(n - 1) * self.nmax + k] = [xs.x, xs.y, xs.z, vs.x, vs.y, vs.z];
                }
                self.extrapolate(n, nbod);

                if n >= 4 {
                    if self.error_norm(nbod) <= tol2 {
                        self.commit(n, nbod, x0, v0);
                        let hdid = *h0;
                        if n >= 8 {
                            *h0 *= SHRINK;
                        } else if n < 7 {
                            *h0 *= GROW;
                        }
                        return Ok(hdid);
                    }
                }
            }

            halvings += 1;
            *h0 *= 0.5;
            if halvings >= self.params.max_halvings || h0.abs() < self.params.min_step {
                return Err(QuicksilverError::StepSizeUnderflow {
                    halvings,
                    h0: *h0,
                });
            }
        }
    }

    /// Fold the freshly computed column `n` (1-based) into the table,
    /// updating columns `n-1` down to 1 in place.
    fn extrapolate(&mut self, n: usize, nbod: usize) {
        for j in (1..n).rev() {
            let t0 = 1. / (self.h2[j - 1] - self.h2[n - 1]);
            let t1 = t0 * self.h2[j];
            let t2 = t0 * self.h2[n - 1];
            for k in 1..nbod {
                let upper = self.d[j * self.nmax + k];
                let entry = &mut self.d[(j - 1) * self.nmax + k];
                for c in 0..6 {
                    entry[c] = t1 * upper[c] - t2 * entry[c];
                }
            }
        }
    }

    /// Squared relative error of the last correction column.
    ///
    /// Position and velocity components use the squared same-component
    /// product throughout (the historical source mixed components in one
    /// velocity term; that reading is not reproduced).
    fn error_norm(&self, nbod: usize) -> f64 {
        let mut errmax = 0f64;
        for k in 1..nbod {
            let e = &self.d[k];
            let ex = (e[0] * e[0]).max(e[1] * e[1]).max(e[2] * e[2]);
            let ev = (e[3] * e[3]).max(e[4] * e[4]).max(e[5] * e[5]);
            errmax = errmax.max(ex * self.xscal[k]).max(ev * self.vscal[k]);
        }
        errmax
    }

    /// Accepted state: the sum of the first `n` table columns per body.
    fn commit(&self, n: usize, nbod: usize, x0: &mut [Vector3<f64>], v0: &mut [Vector3<f64>]) {
        for k in 1..nbod {
            let mut sum = [0f64; 6];
            for j in 0..n {
                let e = &self.d[j * self.nmax + k];
                for c in 0..6 {
                    sum[c] += e[c];
                }
            }
            x0[k] = Vector3::new(sum[0], sum[1], sum[2]);
            v0[k] = Vector3::new(sum[3], sum[4], sum[5]);
        }
    }
}
