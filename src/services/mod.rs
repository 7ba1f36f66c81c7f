// Content Shield Core Services

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod detection;
pub mod assessments;
pub mod analyzer;
pub mod errors;

pub use text_processor::*;
pub use config_store::*;
pub use providers::*;
pub use errors::*;
pub use assessments::*;
pub use analyzer::ContentAnalyzer;

// Re-export detection module types
pub use detection::{
    compute_consensus,
    risk_from_points,
    score_breakdown,
    ConsensusEngine,
    RiskAggregator,
    Strategy,
    StrategyRegistry,
    DEFAULT_PROVIDER_TIMEOUT,
    DEFAULT_STRATEGY,
};
