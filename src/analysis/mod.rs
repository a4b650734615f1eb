pub mod aggregate;
pub mod dose;
pub mod engine;
pub mod interactions;
pub mod messages;
pub mod types;
pub mod units;


pub use aggregate::{aggregate, tier_counts, TierCounts};
pub use dose::{evaluate_dose, DoseAssessment};
pub use engine::DefaultSafetyEngine;
pub use interactions::check_interactions;
pub use messages::{advice, AdviceCategory, AdviceItem, MessageTemplates};
pub use types::{AnalysisError, SafetyEngine, ScanRequest};
pub use units::normalize;
