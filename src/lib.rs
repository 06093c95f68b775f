pub mod bulirsch_stoer;
pub mod constants;
pub mod conversion;
pub mod drift;
pub mod forces;
mod kepler;
pub mod quicksilver_errors;
pub mod stumpff;

pub use bulirsch_stoer::{BsParams, BsParamsBuilder, BulirschStoer};
pub use drift::{drift_one, specific_angular_momentum, specific_energy, DriftOutcome};
pub use forces::{
    Acceleration, BodyStatus, EncounterPairs, FnForce, ForceParams, NewtonianGravity,
    NonGravModel, Oblateness,
};
pub use quicksilver_errors::QuicksilverError;
pub use stumpff::stumpff;
