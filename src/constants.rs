use std::f64::consts::PI;

// Constants
pub const DPI: f64 = 2. * PI;

/// Convergence criterion for the universal-variable Kepler solvers (Danby §6.9).
///
/// The Newton and Laguerre iterations stop once `(f/dt)^2 < DANBYB^2`, i.e. the
/// residual of Kepler's equation drops below `DANBYB` relative to the time step.
pub const DANBYB: f64 = 1.0e-14;

/// Iteration cap for the Laguerre fallback solver.
///
/// Deep hyperbolic encounters can need far more passes than the Newton stage is
/// allowed, hence the generous cap.
pub const NLAG2: usize = 400;

/// Order of the Laguerre fallback iteration.
pub const LAGUERRE_ORDER: f64 = 5.0;

/// Step deflation factor applied when a Bulirsch-Stoer step only converges at
/// the top of the substep sequence.
pub const SHRINK: f64 = 0.55;

/// Step amplification factor applied when a Bulirsch-Stoer step converges early.
pub const GROW: f64 = 1.3;

/// Longest substep sequence tried by the general (velocity-dependent) BS step.
pub const BS1_SEQ_MAX: usize = 8;

/// Longest substep sequence tried by the conservative BS step.
pub const BS2_SEQ_MAX: usize = 12;

// type def

/// Gravitational parameter G * M, in whatever units the caller works in.
pub type GravParam = f64;
