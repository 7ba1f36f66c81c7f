// Content Analyzer
// Request-level orchestration: AI detection consensus plus the three sibling
// assessments run concurrently, each degrading to a safe default on failure,
// then fold into one overall risk verdict.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::{AiDetectionSummary, AnalysisBundle, AnalysisRequest};
use crate::services::assessments::{
    CopyrightAssessor, DisclosureGenerator, LocalCopyrightAssessor, LocalOriginalityChecker,
    LocalSeoAssessor, OriginalityChecker, SeoAssessor, TemplateDisclosureGenerator,
};
use crate::services::detection::{ConsensusEngine, RiskAggregator, Strategy, DEFAULT_STRATEGY};
use crate::services::errors::ShieldError;

pub struct ContentAnalyzer {
    engine: Arc<ConsensusEngine>,
    originality: Arc<dyn OriginalityChecker>,
    copyright: Arc<dyn CopyrightAssessor>,
    seo: Arc<dyn SeoAssessor>,
    disclosure: Arc<dyn DisclosureGenerator>,
    aggregator: RiskAggregator,
    default_strategy: String,
}

impl ContentAnalyzer {
    /// Uses the local sibling analyzers until others are plugged in.
    pub fn new(engine: ConsensusEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            originality: Arc::new(LocalOriginalityChecker),
            copyright: Arc::new(LocalCopyrightAssessor),
            seo: Arc::new(LocalSeoAssessor),
            disclosure: Arc::new(TemplateDisclosureGenerator),
            aggregator: RiskAggregator,
            default_strategy: DEFAULT_STRATEGY.to_string(),
        }
    }

    pub fn with_originality(mut self, checker: Arc<dyn OriginalityChecker>) -> Self {
        self.originality = checker;
        self
    }

    pub fn with_copyright(mut self, assessor: Arc<dyn CopyrightAssessor>) -> Self {
        self.copyright = assessor;
        self
    }

    pub fn with_seo(mut self, assessor: Arc<dyn SeoAssessor>) -> Self {
        self.seo = assessor;
        self
    }

    pub fn with_disclosure(mut self, generator: Arc<dyn DisclosureGenerator>) -> Self {
        self.disclosure = generator;
        self
    }

    /// Fails with UnknownStrategy if the name is not registered.
    pub fn with_default_strategy(mut self, name: &str) -> Result<Self, ShieldError> {
        self.engine.registry().get(name)?;
        self.default_strategy = name.to_string();
        Ok(self)
    }

    pub fn default_strategy(&self) -> &str {
        &self.default_strategy
    }

    pub fn engine(&self) -> &ConsensusEngine {
        &self.engine
    }

    pub fn strategies(&self) -> &[Strategy] {
        self.engine.registry().list()
    }

    /// Assumes the request already passed `AnalysisRequest::validate`.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisBundle, ShieldError> {
        self.analyze_with_cancel(request, &CancellationToken::new())
            .await
    }

    pub async fn analyze_with_cancel(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<AnalysisBundle, ShieldError> {
        let strategy_name = request
            .strategy
            .as_deref()
            .unwrap_or(self.default_strategy.as_str());
        self.engine.registry().get(strategy_name)?;
        if cancel.is_cancelled() {
            return Err(ShieldError::Cancelled);
        }

        let started = Instant::now();
        let content = request.content.as_str();
        info!(
            strategy = strategy_name,
            chars = content.chars().count(),
            content_type = %request.content_type,
            "[ANALYZER] Starting analysis"
        );

        let assessments = async {
            tokio::join!(
                self.engine.analyze_with_cancel(content, strategy_name, cancel),
                self.originality.check(content),
                self.copyright.assess(content),
                self.seo.assess(content),
            )
        };
        let (ai_result, originality, copyright_risk, seo_assessment) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ShieldError::Cancelled),
            results = assessments => results,
        };

        let ai_detection = match ai_result {
            Ok(consensus) => AiDetectionSummary::from(consensus),
            Err(e @ (ShieldError::Cancelled | ShieldError::UnknownStrategy(_))) => return Err(e),
            Err(e) => {
                warn!("[ANALYZER] AI detection failed, using fallback: {}", e);
                AiDetectionSummary::unavailable()
            }
        };
        let originality = originality.unwrap_or_else(|e| {
            warn!("[ANALYZER] Originality check failed, using fallback: {}", e);
            Default::default()
        });
        let copyright_risk = copyright_risk.unwrap_or_else(|e| {
            warn!("[ANALYZER] Copyright assessment failed, using fallback: {}", e);
            Default::default()
        });
        let seo_assessment = seo_assessment.unwrap_or_else(|e| {
            warn!("[ANALYZER] SEO assessment failed, using fallback: {}", e);
            Default::default()
        });

        let disclosure = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ShieldError::Cancelled),
            d = self.disclosure.generate(content, ai_detection.probability, &request.content_type) => d,
        };
        let disclosure_statement = disclosure.unwrap_or_else(|e| {
            warn!("[ANALYZER] Disclosure generation failed: {}", e);
            String::new()
        });

        let risk_breakdown =
            self.aggregator
                .breakdown(&ai_detection, &originality, &copyright_risk, &seo_assessment);
        let overall_risk =
            self.aggregator
                .combine(&ai_detection, &originality, &copyright_risk, &seo_assessment);

        info!(
            strategy = strategy_name,
            ai_probability = ai_detection.probability,
            risk_points = risk_breakdown.total,
            overall_risk = overall_risk.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "[ANALYZER] Analysis complete"
        );

        Ok(AnalysisBundle {
            request_id: uuid::Uuid::new_v4().to_string(),
            ai_detection,
            originality,
            copyright_risk,
            seo_assessment,
            risk_breakdown,
            overall_risk,
            disclosure_statement,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}
