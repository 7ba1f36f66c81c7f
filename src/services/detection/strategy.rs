// Strategy Registry
// Named detection strategies: provider set, per-provider weights, decision threshold.
// The registry is immutable once built; built-ins live in a process-wide OnceLock.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use tracing::info;

use crate::services::errors::ShieldError;

pub const DEFAULT_STRATEGY: &str = "conservative";
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

static BUILTIN_REGISTRY: OnceLock<StrategyRegistry> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Configured order; also the order of per-provider results
    pub provider_ids: Vec<String>,
    pub weights: BTreeMap<String, f64>,
    /// Decision boundary in [0, 1]; compared against probability / 100
    pub threshold: f64,
}

impl Strategy {
    pub fn new(name: &str, description: &str, weighted: &[(&str, f64)], threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            provider_ids: weighted.iter().map(|(id, _)| id.to_string()).collect(),
            weights: weighted.iter().map(|(id, w)| (id.to_string(), *w)).collect(),
            threshold,
        }
    }

    pub fn weight(&self, provider_id: &str) -> f64 {
        self.weights.get(provider_id).copied().unwrap_or(0.0)
    }

    /// Threshold on the 0-100 probability scale
    pub fn threshold_percent(&self) -> f64 {
        self.threshold * 100.0
    }

    pub fn validate(&self) -> Result<(), ShieldError> {
        let fail = |reason: String| ShieldError::InvalidStrategyWeights {
            strategy: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(ShieldError::Config("strategy name must not be empty".to_string()));
        }
        if self.provider_ids.is_empty() {
            return Err(fail("no providers configured".to_string()));
        }

        let mut seen = HashSet::new();
        for id in &self.provider_ids {
            if !seen.insert(id.as_str()) {
                return Err(fail(format!("duplicate provider '{}'", id)));
            }
            match self.weights.get(id) {
                None => return Err(fail(format!("missing weight for provider '{}'", id))),
                Some(w) if !w.is_finite() || *w <= 0.0 || *w > 1.0 => {
                    return Err(fail(format!("weight {} for '{}' is outside (0, 1]", w, id)))
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = self.weights.keys().find(|k| !seen.contains(k.as_str())) {
            return Err(fail(format!("weight given for unlisted provider '{}'", extra)));
        }

        let sum: f64 = self.weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(fail(format!("weights sum to {:.6}, expected 1", sum)));
        }

        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(fail(format!("threshold {} is outside [0, 1]", self.threshold)));
        }

        Ok(())
    }
}

fn builtin_strategies() -> Vec<Strategy> {
    vec![
        Strategy::new(
            "conservative",
            "Uses multiple APIs and requires consensus for high confidence",
            &[("openai", 0.4), ("gptzero", 0.35), ("sapling", 0.25)],
            0.7,
        ),
        Strategy::new(
            "aggressive",
            "Uses all available APIs and weights results by accuracy",
            &[
                ("openai", 0.3),
                ("gptzero", 0.25),
                ("sapling", 0.2),
                ("copyleaks", 0.15),
                ("huggingface", 0.1),
            ],
            0.5,
        ),
        Strategy::new(
            "fast",
            "Uses fastest APIs for quick results",
            &[("openai", 0.7), ("huggingface", 0.3)],
            0.6,
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: Vec<Strategy>,
}

impl StrategyRegistry {
    /// Validates every strategy; names must be unique.
    pub fn new(strategies: Vec<Strategy>) -> Result<Self, ShieldError> {
        let mut names = HashSet::new();
        for strategy in &strategies {
            strategy.validate()?;
            if !names.insert(strategy.name.clone()) {
                return Err(ShieldError::Config(format!(
                    "strategy '{}' registered twice",
                    strategy.name
                )));
            }
        }
        Ok(Self { strategies })
    }

    /// The three built-in strategies, initialized once per process.
    pub fn builtin() -> &'static StrategyRegistry {
        BUILTIN_REGISTRY.get_or_init(|| StrategyRegistry {
            strategies: builtin_strategies(),
        })
    }

    /// Built-ins plus configured extras. Call at startup only.
    pub fn with_extra(extra: Vec<Strategy>) -> Result<Self, ShieldError> {
        let mut strategies = builtin_strategies();
        strategies.extend(extra);
        let registry = Self::new(strategies)?;
        info!(
            "[STRATEGY] Registry ready with {} strategies: {}",
            registry.strategies.len(),
            registry.names().join(", ")
        );
        Ok(registry)
    }

    pub fn list(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name.as_str()).collect()
    }

    /// Case-sensitive exact lookup
    pub fn get(&self, name: &str) -> Result<&Strategy, ShieldError> {
        self.strategies
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ShieldError::UnknownStrategy(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_weights_sum_to_one() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(registry.names(), vec!["conservative", "aggressive", "fast"]);
        for strategy in registry.list() {
            let sum: f64 = strategy.weights.values().sum();
            assert!((sum - 1.0).abs() <= 1e-6, "{} sums to {}", strategy.name, sum);
            assert!(strategy.validate().is_ok());
        }
    }

    #[test]
    fn test_builtin_shapes() {
        let registry = StrategyRegistry::builtin();
        let conservative = registry.get("conservative").unwrap();
        assert_eq!(conservative.provider_ids, vec!["openai", "gptzero", "sapling"]);
        assert_eq!(conservative.threshold, 0.7);
        assert_eq!(registry.get("aggressive").unwrap().provider_ids.len(), 5);
        assert_eq!(registry.get("aggressive").unwrap().threshold, 0.5);
        assert_eq!(registry.get("fast").unwrap().provider_ids.len(), 2);
        assert_eq!(registry.get("fast").unwrap().threshold, 0.6);
    }

    #[test]
    fn test_get_is_case_sensitive() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(
            registry.get("Conservative").unwrap_err(),
            ShieldError::UnknownStrategy("Conservative".to_string())
        );
        assert!(registry.get("").is_err());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let bad_sum = Strategy::new("bad", "", &[("a", 0.5), ("b", 0.4)], 0.5);
        assert!(matches!(
            bad_sum.validate(),
            Err(ShieldError::InvalidStrategyWeights { .. })
        ));

        let duplicate = Strategy {
            provider_ids: vec!["a".to_string(), "a".to_string()],
            ..Strategy::new("dup", "", &[("a", 1.0)], 0.5)
        };
        assert!(duplicate.validate().is_err());

        let mut missing = Strategy::new("missing", "", &[("a", 0.5), ("b", 0.5)], 0.5);
        missing.weights.remove("b");
        missing.weights.insert("a".to_string(), 1.0);
        assert!(missing.validate().is_err());

        let empty = Strategy::new("empty", "", &[], 0.5);
        assert!(empty.validate().is_err());

        let zero = Strategy::new("zero", "", &[("a", 0.0), ("b", 1.0)], 0.5);
        assert!(zero.validate().is_err());

        let threshold = Strategy::new("t", "", &[("a", 1.0)], 1.5);
        assert!(threshold.validate().is_err());
    }

    #[test]
    fn test_with_extra() {
        let extra = Strategy::new("solo", "single provider", &[("sapling", 1.0)], 0.5);
        let registry = StrategyRegistry::with_extra(vec![extra]).unwrap();
        assert_eq!(registry.list().len(), 4);
        assert!(registry.get("solo").is_ok());

        let clash = Strategy::new("fast", "", &[("openai", 1.0)], 0.5);
        assert!(matches!(
            StrategyRegistry::with_extra(vec![clash]),
            Err(ShieldError::Config(_))
        ));
    }
}
