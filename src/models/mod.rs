pub mod enums;
pub mod nutrient;
pub mod profile;
pub mod report;

pub use nutrient::*;
pub use profile::*;
pub use report::*;
