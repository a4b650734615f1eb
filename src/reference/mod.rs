pub mod handle;
pub mod snapshot;
pub mod types;

pub use handle::ReferenceHandle;
pub use snapshot::{ReferenceSnapshot, ReferenceTables};
pub use types::{AgeBand, InteractionRule, NutrientInfo, ReferenceRange, Trigger};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Reference data load failed ({0}): {1}")]
    Load(String, String),

    #[error("Reference data parse failed ({0}): {1}")]
    Parse(String, String),

    #[error("Invalid reference data: {0}")]
    Invalid(String),

    #[error("Internal lock failed")]
    LockFailed,
}
