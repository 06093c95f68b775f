use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuicksilverError {
    #[error("Kepler solver residual stayed above tolerance after Newton iteration")]
    KeplerResidualTooLarge,

    #[error("Laguerre fallback exhausted {0} iterations without converging")]
    KeplerLaguerreFailed(usize),

    #[error("Bulirsch-Stoer step size underflowed after {halvings} halvings (h0 = {h0:e})")]
    StepSizeUnderflow { halvings: u32, h0: f64 },

    #[error("Invalid step parameter: {0}")]
    InvalidStepParams(String),
}

impl QuicksilverError {
    /// Legacy integer code of this failure. Success is code 0 and has no error
    /// value; the Kepler codes 1 and 2 match the historical convention some
    /// callers still dispatch on.
    pub fn code(&self) -> i32 {
        match self {
            QuicksilverError::KeplerResidualTooLarge => 1,
            QuicksilverError::KeplerLaguerreFailed(_) => 2,
            QuicksilverError::StepSizeUnderflow { .. } => 3,
            QuicksilverError::InvalidStepParams(_) => 4,
        }
    }
}
