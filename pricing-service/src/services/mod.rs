//! Services module for pricing-service.

pub mod canonical;
pub mod constraints;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod pricing;
pub mod store;

pub use constraints::{admit, AdmissionDecision, AdmissionRequest, NightBounds, StayDefaults};
pub use database::Database;
pub use memory::MemoryStore;
pub use metrics::{
    get_metrics, init_metrics, record_admission, record_error, record_quote, record_redemption,
    record_rule_mutation,
};
pub use pricing::{has_base_rate, price_stay, PricingRequest};
pub use store::RuleStore;
