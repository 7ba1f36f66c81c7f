// Detection Module
// Multi-provider AI detection core organized into:
// - strategy: named provider sets, weights and thresholds
// - consensus: concurrent fan-out and weighted consensus
// - risk: overall risk point table

pub mod strategy;
pub mod consensus;
pub mod risk;

pub use strategy::{Strategy, StrategyRegistry, DEFAULT_STRATEGY};
pub use consensus::{compute_consensus, ConsensusEngine, DEFAULT_PROVIDER_TIMEOUT};
pub use risk::{risk_from_points, score_breakdown, RiskAggregator};
