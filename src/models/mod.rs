// Content Shield Data Models
// Shared request/response shapes for the analysis pipeline

use serde::{Deserialize, Serialize};

use crate::services::ProviderErrorKind;

/// Minimum trimmed content length accepted by the boundary layer.
/// Lengths are counted in UTF-16 code units, as web clients count them.
pub const MIN_CONTENT_CHARS: usize = 10;
/// Maximum content length accepted by the boundary layer.
pub const MAX_CONTENT_CHARS: usize = 5000;

// ============ Ordinal Levels ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

// ============ Analysis Request ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub content: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub language: Option<String>,
}

impl AnalysisRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            strategy: None,
            content_type: default_content_type(),
            language: None,
        }
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Boundary-layer precondition: 10..=5000 UTF-16 units (minimum measured after trim).
    /// The core assumes this has already been checked.
    pub fn validate(&self) -> Result<(), crate::services::ValidationError> {
        use crate::services::ValidationError;

        let trimmed = self.content.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }
        if self.content.encode_utf16().count() > MAX_CONTENT_CHARS {
            return Err(ValidationError::TooLong { max: MAX_CONTENT_CHARS });
        }
        if trimmed.encode_utf16().count() < MIN_CONTENT_CHARS {
            return Err(ValidationError::TooShort { min: MIN_CONTENT_CHARS });
        }
        Ok(())
    }
}

// ============ Provider Outcomes ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResult {
    pub provider_id: String,
    /// 0-100
    pub probability: f64,
    pub confidence: Confidence,
    pub response_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFailure {
    pub provider_id: String,
    pub kind: ProviderErrorKind,
    pub message: String,
}

/// One entry per configured provider, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProviderOutcome {
    Success(ProviderResult),
    Failure(ProviderFailure),
}

impl ProviderOutcome {
    pub fn provider_id(&self) -> &str {
        match self {
            Self::Success(r) => &r.provider_id,
            Self::Failure(f) => &f.provider_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn as_success(&self) -> Option<&ProviderResult> {
        match self {
            Self::Success(r) => Some(r),
            Self::Failure(_) => None,
        }
    }
}

// ============ Consensus ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub strategy_name: String,
    pub overall_probability: f64,
    pub confidence: Confidence,
    pub is_ai_generated: bool,
    pub threshold: f64,
    pub per_provider: Vec<ProviderOutcome>,
    /// Number of providers that succeeded
    pub provider_count: usize,
    /// Provider agreement, 1 = perfect agreement
    pub consensus_score: f64,
    pub processing_time_ms: f64,
}

// ============ Sibling Assessments ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalityResult {
    /// 0-100, higher is more original
    pub originality_score: f64,
    pub is_plagiarized: bool,
    #[serde(default)]
    pub matched_sources: Vec<String>,
}

impl Default for OriginalityResult {
    fn default() -> Self {
        Self {
            originality_score: 100.0,
            is_plagiarized: false,
            matched_sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyrightRiskResult {
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub detected_content: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Default for CopyrightRiskResult {
    fn default() -> Self {
        Self {
            risk_level: RiskLevel::Low,
            detected_content: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoAssessment {
    /// 1-5, higher is better
    pub score: u8,
    #[serde(default)]
    pub eeat_violations: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

impl Default for SeoAssessment {
    fn default() -> Self {
        Self {
            score: 3,
            eeat_violations: Vec::new(),
            recommendations: Vec::new(),
            risk_factors: Vec::new(),
        }
    }
}

// ============ Analysis Bundle ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiDetectionSummary {
    pub probability: f64,
    pub confidence: Confidence,
    pub is_ai_generated: bool,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusResult>,
}

impl AiDetectionSummary {
    /// Used when the detection branch itself fails.
    pub fn unavailable() -> Self {
        Self {
            probability: 0.0,
            confidence: Confidence::Low,
            is_ai_generated: false,
            reasoning: "AI detection service unavailable".to_string(),
            consensus: None,
        }
    }
}

impl From<ConsensusResult> for AiDetectionSummary {
    fn from(result: ConsensusResult) -> Self {
        let reasoning = if result.provider_count == 0 {
            format!(
                "No detection provider responded for strategy '{}'",
                result.strategy_name
            )
        } else {
            format!(
                "{} of {} providers agreed at {:.0}% consensus ({} strategy)",
                result.provider_count,
                result.per_provider.len(),
                result.consensus_score * 100.0,
                result.strategy_name
            )
        };
        Self {
            probability: result.overall_probability,
            confidence: result.confidence,
            is_ai_generated: result.is_ai_generated,
            reasoning,
            consensus: Some(result),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBreakdown {
    pub ai_points: u8,
    pub originality_points: u8,
    pub copyright_points: u8,
    pub seo_points: u8,
    pub total: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisBundle {
    pub request_id: String,
    pub ai_detection: AiDetectionSummary,
    pub originality: OriginalityResult,
    pub copyright_risk: CopyrightRiskResult,
    pub seo_assessment: SeoAssessment,
    pub risk_breakdown: RiskBreakdown,
    pub overall_risk: RiskLevel,
    pub disclosure_statement: String,
    pub timestamp: String,
}

// ============ Default Value Functions ============

fn default_content_type() -> String { "general".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ValidationError;

    #[test]
    fn test_validate_bounds() {
        assert!(matches!(
            AnalysisRequest::new("   ").validate(),
            Err(ValidationError::Empty)
        ));
        assert!(matches!(
            AnalysisRequest::new("  short  ").validate(),
            Err(ValidationError::TooShort { min: 10 })
        ));
        assert!(matches!(
            AnalysisRequest::new("x".repeat(5001)).validate(),
            Err(ValidationError::TooLong { max: 5000 })
        ));
        assert!(AnalysisRequest::new("x".repeat(5000)).validate().is_ok());
        assert!(AnalysisRequest::new("ten chars!").validate().is_ok());
    }

    #[test]
    fn test_validate_counts_utf16_units() {
        // each emoji is one char but two UTF-16 units
        assert!(AnalysisRequest::new("\u{1F600}".repeat(2500)).validate().is_ok());
        assert!(matches!(
            AnalysisRequest::new("\u{1F600}".repeat(2501)).validate(),
            Err(ValidationError::TooLong { max: 5000 })
        ));
        assert!(AnalysisRequest::new("\u{1F600}".repeat(5)).validate().is_ok());
    }

    #[test]
    fn test_request_defaults_from_json() {
        let req: AnalysisRequest = serde_json::from_str(r#"{"content":"hello world"}"#).unwrap();
        assert_eq!(req.content_type, "general");
        assert!(req.strategy.is_none());
    }

    #[test]
    fn test_provider_outcome_serialization() {
        let outcome = ProviderOutcome::Failure(ProviderFailure {
            provider_id: "sapling".to_string(),
            kind: ProviderErrorKind::Timeout,
            message: "timed out".to_string(),
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["providerId"], "sapling");
        assert_eq!(json["kind"], "timeout");
    }

    #[test]
    fn test_unavailable_summary() {
        let summary = AiDetectionSummary::unavailable();
        assert_eq!(summary.probability, 0.0);
        assert_eq!(summary.confidence, Confidence::Low);
        assert!(summary.consensus.is_none());
    }
}
