// AI Detection Provider Gateways
// One gateway per external detector, all behind the DetectionProvider trait.
// - HttpDetector: JSON detection endpoint over reqwest
// - SimulatedDetector: seeded, deterministic stand-in for offline/demo runs

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::models::{Confidence, ProviderFailure, ProviderResult};
use crate::services::config_store::AppConfig;

/// Provider ids referenced by the built-in strategies.
pub const KNOWN_PROVIDERS: [&str; 5] = ["openai", "gptzero", "sapling", "copyleaks", "huggingface"];

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderErrorKind {
    Timeout,
    Unavailable,
    Invalid,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{provider_id} timed out after {timeout_ms}ms")]
    Timeout { provider_id: String, timeout_ms: u64 },
    #[error("{provider_id} unavailable: {message}")]
    Unavailable { provider_id: String, message: String },
    #[error("{provider_id} returned an invalid response: {message}")]
    Invalid { provider_id: String, message: String },
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Timeout { .. } => ProviderErrorKind::Timeout,
            Self::Unavailable { .. } => ProviderErrorKind::Unavailable,
            Self::Invalid { .. } => ProviderErrorKind::Invalid,
        }
    }

    pub fn provider_id(&self) -> &str {
        match self {
            Self::Timeout { provider_id, .. }
            | Self::Unavailable { provider_id, .. }
            | Self::Invalid { provider_id, .. } => provider_id,
        }
    }

    pub fn unavailable(provider_id: &str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            provider_id: provider_id.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid(provider_id: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            provider_id: provider_id.to_string(),
            message: message.into(),
        }
    }

    fn from_http(provider_id: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider_id: provider_id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }
        } else if err.is_decode() {
            Self::invalid(provider_id, err.to_string())
        } else {
            Self::unavailable(provider_id, err.to_string())
        }
    }
}

impl From<ProviderError> for ProviderFailure {
    fn from(err: ProviderError) -> Self {
        ProviderFailure {
            provider_id: err.provider_id().to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Capability shared by every external AI-content detector.
///
/// Implementations must not keep mutable state across calls; the engine
/// applies the per-provider timeout, so `detect` does not need its own.
/// Retrying, if any, is the gateway's business.
#[async_trait]
pub trait DetectionProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn detect(&self, text: &str) -> Result<ProviderResult, ProviderError>;
}

/// Confidence when the provider does not report one: distance from the 50% line.
pub fn confidence_from_probability(probability: f64) -> Confidence {
    let distance = (probability - 50.0).abs();
    if distance >= 35.0 {
        Confidence::High
    } else if distance >= 15.0 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn parse_confidence(raw: &str) -> Option<Confidence> {
    match raw.trim().to_lowercase().as_str() {
        "low" => Some(Confidence::Low),
        "medium" => Some(Confidence::Medium),
        "high" => Some(Confidence::High),
        _ => None,
    }
}

// ============ HTTP Gateway ============

#[derive(Debug, Clone, Serialize)]
struct DetectRequestBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
struct DetectResponseBody {
    #[serde(default, alias = "aiProbability", alias = "ai_probability")]
    probability: Option<f64>,
    #[serde(default)]
    confidence: Option<String>,
}

pub struct HttpDetector {
    id: String,
    client: Client,
    url: String,
    api_key: String,
    model: Option<String>,
    timeout: Duration,
}

impl HttpDetector {
    pub fn new(
        id: &str,
        url: &str,
        api_key: &str,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::unavailable(id, format!("client build failed: {}", e)))?;

        Ok(Self {
            id: id.to_string(),
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
            model,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn parse_body(&self, body: DetectResponseBody, response_time_ms: f64) -> Result<ProviderResult, ProviderError> {
        let probability = body
            .probability
            .ok_or_else(|| ProviderError::invalid(&self.id, "missing probability"))?;

        if !probability.is_finite() || !(0.0..=100.0).contains(&probability) {
            return Err(ProviderError::invalid(
                &self.id,
                format!("probability out of range: {}", probability),
            ));
        }

        let confidence = body
            .confidence
            .as_deref()
            .and_then(parse_confidence)
            .unwrap_or_else(|| confidence_from_probability(probability));

        Ok(ProviderResult {
            provider_id: self.id.clone(),
            probability,
            confidence,
            response_time_ms,
        })
    }
}

#[async_trait]
impl DetectionProvider for HttpDetector {
    fn id(&self) -> &str {
        &self.id
    }

    async fn detect(&self, text: &str) -> Result<ProviderResult, ProviderError> {
        let request = DetectRequestBody {
            text,
            model: self.model.as_deref(),
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_http(&self.id, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::unavailable(
                &self.id,
                format!("API error: {} - {}", status.as_u16(), body),
            ));
        }

        let body: DetectResponseBody = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid(&self.id, format!("JSON parse error: {}", e)))?;

        let response_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.parse_body(body, response_time_ms)
    }
}

// ============ Simulated Gateway ============

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a; stable across builds and toolchains.
fn stable_hash(value: &str) -> u64 {
    value.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Deterministic detector: output is a pure function of (seed, provider id, text).
pub struct SimulatedDetector {
    id: String,
    seed: u64,
    latency: Option<Duration>,
}

impl SimulatedDetector {
    pub fn new(id: &str, seed: u64) -> Self {
        Self {
            id: id.to_string(),
            seed,
            latency: None,
        }
    }

    /// Adds a fixed artificial delay to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn rng_for(&self, text: &str) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ stable_hash(&self.id) ^ stable_hash(text))
    }
}

#[async_trait]
impl DetectionProvider for SimulatedDetector {
    fn id(&self) -> &str {
        &self.id
    }

    async fn detect(&self, text: &str) -> Result<ProviderResult, ProviderError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut rng = self.rng_for(text);
        let probability: f64 = rng.gen_range(0.0..100.0);
        let confidence = match rng.gen_range(0..3) {
            0 => Confidence::Low,
            1 => Confidence::Medium,
            _ => Confidence::High,
        };
        let response_time_ms = 200.0 + rng.gen_range(0.0..300.0);

        Ok(ProviderResult {
            provider_id: self.id.clone(),
            probability,
            confidence,
            response_time_ms,
        })
    }
}

// ============ Credentials & Endpoints ============

fn env_prefix(provider: &str) -> String {
    provider.to_uppercase().replace('-', "_")
}

/// Get API key from environment or config file
pub fn get_api_key(provider: &str, config: &AppConfig) -> Option<String> {
    let prefix = env_prefix(provider);
    let env_keys = [
        format!("{}_API_KEY", prefix),
        format!("CONTENT_SHIELD_{}_API_KEY", prefix),
    ];

    for key in env_keys.iter() {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    config
        .api_keys
        .get(provider)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Get detection endpoint URL from environment or config file
pub fn get_provider_url(provider: &str, config: &AppConfig) -> Option<String> {
    if let Ok(val) = env::var(format!("{}_API_URL", env_prefix(provider))) {
        let v = val.trim();
        if !v.is_empty() {
            return Some(v.to_string());
        }
    }

    config
        .providers
        .get(provider)
        .and_then(|p| p.base_url.clone())
        .filter(|u| !u.trim().is_empty())
}
