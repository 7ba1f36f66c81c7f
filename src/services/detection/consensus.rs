// Consensus Engine
// Fans a text out to every provider of a strategy, settles all outcomes and
// folds the survivors into one weighted probability/confidence verdict.
// - Settle-all: one outcome per configured provider, never short-circuits
// - Weight redistribution over succeeding providers
// - Degraded fallback when nothing succeeds

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{Confidence, ConsensusResult, ProviderOutcome, ProviderResult};
use crate::services::errors::ShieldError;
use crate::services::providers::{DetectionProvider, ProviderError};

use super::strategy::{Strategy, StrategyRegistry};

/// Spread above which providers are considered to disagree
const LOW_CONFIDENCE_SPREAD: f64 = 30.0;
/// Spread at or below which agreement can be rated high
const HIGH_CONFIDENCE_SPREAD: f64 = 10.0;
const MIN_PROVIDERS_FOR_AGREEMENT: usize = 2;

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ConsensusEngine {
    registry: Arc<StrategyRegistry>,
    providers: HashMap<String, Arc<dyn DetectionProvider>>,
    provider_timeout: Duration,
}

impl ConsensusEngine {
    pub fn new(registry: Arc<StrategyRegistry>, provider_timeout: Duration) -> Self {
        Self {
            registry,
            providers: HashMap::new(),
            provider_timeout,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn DetectionProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Later registrations replace earlier ones with the same id.
    pub fn register(&mut self, provider: Arc<dyn DetectionProvider>) {
        self.providers.insert(provider.id().to_string(), provider);
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn provider_timeout(&self) -> Duration {
        self.provider_timeout
    }

    pub fn has_provider(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    pub async fn analyze(&self, text: &str, strategy_name: &str) -> Result<ConsensusResult, ShieldError> {
        self.analyze_with_cancel(text, strategy_name, &CancellationToken::new())
            .await
    }

    /// Resolves the strategy before touching any provider, so an unknown
    /// name or an already-cancelled token issues zero provider calls.
    pub async fn analyze_with_cancel(
        &self,
        text: &str,
        strategy_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ConsensusResult, ShieldError> {
        let strategy = self.registry.get(strategy_name)?;
        if cancel.is_cancelled() {
            return Err(ShieldError::Cancelled);
        }

        let started = Instant::now();
        info!(
            strategy = %strategy.name,
            providers = strategy.provider_ids.len(),
            "[CONSENSUS] Starting fan-out"
        );

        let outcomes = self.fan_out(strategy, text, cancel).await?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let result = compute_consensus(strategy, outcomes, elapsed_ms);

        if result.provider_count == 0 {
            warn!(
                strategy = %strategy.name,
                "[CONSENSUS] All providers failed, returning degraded fallback"
            );
        }
        info!(
            strategy = %result.strategy_name,
            probability = result.overall_probability,
            confidence = result.confidence.as_str(),
            consensus_score = result.consensus_score,
            succeeded = result.provider_count,
            elapsed_ms = result.processing_time_ms,
            "[CONSENSUS] Done"
        );

        Ok(result)
    }

    async fn fan_out(
        &self,
        strategy: &Strategy,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProviderOutcome>, ShieldError> {
        let text: Arc<str> = Arc::from(text);
        let mut slots: Vec<Option<ProviderOutcome>> = vec![None; strategy.provider_ids.len()];
        let mut join_set: JoinSet<(usize, ProviderOutcome)> = JoinSet::new();

        for (idx, provider_id) in strategy.provider_ids.iter().enumerate() {
            let Some(provider) = self.providers.get(provider_id) else {
                warn!(provider = %provider_id, "[CONSENSUS] Provider not configured");
                slots[idx] = Some(ProviderOutcome::Failure(
                    ProviderError::unavailable(provider_id, "provider not configured").into(),
                ));
                continue;
            };

            let provider = Arc::clone(provider);
            let text = Arc::clone(&text);
            let provider_id = provider_id.clone();
            let timeout = self.provider_timeout;

            join_set.spawn(async move {
                let outcome = match tokio::time::timeout(timeout, provider.detect(&text)).await {
                    Ok(Ok(result)) => checked_result(&provider_id, result),
                    Ok(Err(e)) => ProviderOutcome::Failure(e.into()),
                    Err(_) => ProviderOutcome::Failure(
                        ProviderError::Timeout {
                            provider_id: provider_id.clone(),
                            timeout_ms: timeout.as_millis() as u64,
                        }
                        .into(),
                    ),
                };
                (idx, outcome)
            });
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    join_set.abort_all();
                    warn!(strategy = %strategy.name, "[CONSENSUS] Cancelled, in-flight provider calls aborted");
                    return Err(ShieldError::Cancelled);
                }
                next = join_set.join_next() => match next {
                    Some(Ok((idx, outcome))) => {
                        match &outcome {
                            ProviderOutcome::Success(r) => debug!(
                                provider = %r.provider_id,
                                probability = r.probability,
                                response_ms = r.response_time_ms,
                                "[CONSENSUS] Provider ok"
                            ),
                            ProviderOutcome::Failure(f) => warn!(
                                provider = %f.provider_id,
                                kind = ?f.kind,
                                "[CONSENSUS] Provider failed: {}",
                                f.message
                            ),
                        }
                        slots[idx] = Some(outcome);
                    }
                    Some(Err(e)) => warn!("[CONSENSUS] Provider task failed: {}", e),
                    None => break,
                }
            }
        }

        Ok(slots
            .into_iter()
            .zip(strategy.provider_ids.iter())
            .map(|(slot, provider_id)| {
                slot.unwrap_or_else(|| {
                    ProviderOutcome::Failure(
                        ProviderError::unavailable(provider_id, "detection task terminated unexpectedly")
                            .into(),
                    )
                })
            })
            .collect())
    }
}

/// Rejects out-of-range probabilities and pins the configured provider id.
fn checked_result(provider_id: &str, mut result: ProviderResult) -> ProviderOutcome {
    if !result.probability.is_finite() || !(0.0..=100.0).contains(&result.probability) {
        return ProviderOutcome::Failure(
            ProviderError::invalid(
                provider_id,
                format!("probability out of range: {}", result.probability),
            )
            .into(),
        );
    }
    result.provider_id = provider_id.to_string();
    result.response_time_ms = result.response_time_ms.max(0.0);
    ProviderOutcome::Success(result)
}

/// Pure consensus math over settled outcomes, in configured order.
pub fn compute_consensus(
    strategy: &Strategy,
    outcomes: Vec<ProviderOutcome>,
    processing_time_ms: f64,
) -> ConsensusResult {
    let succeeded: Vec<&ProviderResult> = outcomes.iter().filter_map(|o| o.as_success()).collect();

    if succeeded.is_empty() {
        return ConsensusResult {
            strategy_name: strategy.name.clone(),
            overall_probability: 0.0,
            confidence: Confidence::Low,
            is_ai_generated: false,
            threshold: strategy.threshold,
            per_provider: outcomes,
            provider_count: 0,
            consensus_score: 0.0,
            processing_time_ms,
        };
    }

    // Renormalize surviving weights so they sum to 1
    let total_weight: f64 = succeeded.iter().map(|r| strategy.weight(&r.provider_id)).sum();
    let overall_probability = if total_weight > 0.0 {
        succeeded
            .iter()
            .map(|r| strategy.weight(&r.provider_id) / total_weight * r.probability)
            .sum::<f64>()
    } else {
        succeeded.iter().map(|r| r.probability).sum::<f64>() / succeeded.len() as f64
    }
    .clamp(0.0, 100.0);

    let max = succeeded.iter().map(|r| r.probability).fold(f64::MIN, f64::max);
    let min = succeeded.iter().map(|r| r.probability).fold(f64::MAX, f64::min);
    let spread = max - min;
    let consensus_score = (1.0 - spread / 100.0).clamp(0.0, 1.0);

    let boundary = strategy.threshold_percent();
    let consensus_above = overall_probability >= boundary;
    let confidence = if succeeded.len() < MIN_PROVIDERS_FOR_AGREEMENT || spread > LOW_CONFIDENCE_SPREAD {
        Confidence::Low
    } else if spread <= HIGH_CONFIDENCE_SPREAD
        && succeeded.iter().all(|r| (r.probability >= boundary) == consensus_above)
    {
        Confidence::High
    } else {
        Confidence::Medium
    };

    let provider_count = succeeded.len();
    ConsensusResult {
        strategy_name: strategy.name.clone(),
        overall_probability,
        confidence,
        is_ai_generated: consensus_above,
        threshold: strategy.threshold,
        per_provider: outcomes,
        provider_count,
        consensus_score,
        processing_time_ms,
    }
}
