pub mod classify;
pub mod contract;

pub use classify::{Classification, ExpiryBucket, ExpiryThresholds};
pub use contract::{
    Contract, ContractStatus, LegalNote, LifecycleEntry, ParseEnumError, RiskLevel, Role,
};
