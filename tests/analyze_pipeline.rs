// End-to-end request pipeline against stub and simulated providers

use async_trait::async_trait;
use content_shield_lib::models::{AnalysisRequest, Confidence, ProviderResult, RiskLevel};
use content_shield_lib::services::{
    ConsensusEngine, ContentAnalyzer, DetectionProvider, ProviderError, StrategyRegistry,
};
use content_shield_lib::{build_analyzer, load_config};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FixedProvider {
    id: &'static str,
    probability: Option<f64>,
    calls: AtomicUsize,
}

impl FixedProvider {
    fn ok(id: &'static str, probability: f64) -> Arc<Self> {
        Arc::new(Self { id, probability: Some(probability), calls: AtomicUsize::new(0) })
    }

    fn down(id: &'static str) -> Arc<Self> {
        Arc::new(Self { id, probability: None, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl DetectionProvider for FixedProvider {
    fn id(&self) -> &str {
        self.id
    }

    async fn detect(&self, _text: &str) -> Result<ProviderResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.probability {
            Some(probability) => Ok(ProviderResult {
                provider_id: self.id.to_string(),
                probability,
                confidence: Confidence::High,
                response_time_ms: 5.0,
            }),
            None => Err(ProviderError::unavailable(self.id, "connection refused")),
        }
    }
}

const RISKY_TEXT: &str = "Copyright 2024 Acme. All rights reserved. This short note is for testing.";

#[tokio::test]
async fn test_pipeline_with_partial_provider_failure() {
    let openai = FixedProvider::ok("openai", 90.0);
    let gptzero = FixedProvider::down("gptzero");
    let sapling = FixedProvider::ok("sapling", 80.0);

    let engine = ConsensusEngine::new(
        Arc::new(StrategyRegistry::builtin().clone()),
        Duration::from_secs(5),
    )
    .with_provider(openai.clone())
    .with_provider(gptzero.clone())
    .with_provider(sapling.clone());
    let analyzer = ContentAnalyzer::new(engine);

    let request = AnalysisRequest::new(RISKY_TEXT);
    request.validate().unwrap();
    let bundle = analyzer.analyze(&request).await.unwrap();

    // (90 * 0.40 + 80 * 0.25) / 0.65
    assert!((bundle.ai_detection.probability - 86.1538).abs() < 0.01);
    assert_eq!(bundle.ai_detection.confidence, Confidence::High);
    assert!(bundle.ai_detection.is_ai_generated);

    assert_eq!(bundle.copyright_risk.risk_level, RiskLevel::High);
    assert_eq!(bundle.originality.originality_score, 100.0);
    assert_eq!(bundle.seo_assessment.score, 2);

    let b = bundle.risk_breakdown;
    assert_eq!((b.ai_points, b.originality_points, b.copyright_points, b.seo_points), (3, 0, 3, 3));
    assert_eq!(b.total, 9);
    assert_eq!(bundle.overall_risk, RiskLevel::High);
    assert!(bundle.disclosure_statement.contains("generated with the assistance of AI"));

    for p in [&openai, &gptzero, &sapling] {
        assert_eq!(p.calls.load(Ordering::SeqCst), 1);
    }

    let json = serde_json::to_value(&bundle).unwrap();
    let per_provider = &json["aiDetection"]["consensus"]["perProvider"];
    assert_eq!(per_provider[0]["providerId"], "openai");
    assert_eq!(per_provider[1]["status"], "failure");
    assert_eq!(per_provider[1]["kind"], "unavailable");
    assert_eq!(per_provider[2]["status"], "success");
    assert_eq!(json["overallRisk"], "high");
    assert!(json["requestId"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_pipeline_unknown_strategy_calls_nothing() {
    let openai = FixedProvider::ok("openai", 50.0);
    let engine = ConsensusEngine::new(
        Arc::new(StrategyRegistry::builtin().clone()),
        Duration::from_secs(5),
    )
    .with_provider(openai.clone());
    let analyzer = ContentAnalyzer::new(engine);

    let request = AnalysisRequest::new(RISKY_TEXT).with_strategy("Conservative");
    assert!(analyzer.analyze(&request).await.is_err());
    assert_eq!(openai.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pipeline_from_config_dir_in_simulation() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = load_config(Some(dir.path().to_path_buf())).unwrap();
    config.simulation.enabled = true;
    config.simulation.seed = 7;
    config.default_strategy = "aggressive".to_string();

    let analyzer = build_analyzer(&config).unwrap();
    let request = AnalysisRequest::new(
        "In my experience, seeded simulators make the whole pipeline reproducible.",
    );
    let first = analyzer.analyze(&request).await.unwrap();
    let second = build_analyzer(&config).unwrap().analyze(&request).await.unwrap();

    let consensus = first.ai_detection.consensus.as_ref().unwrap();
    assert_eq!(consensus.strategy_name, "aggressive");
    assert_eq!(consensus.per_provider.len(), 5);
    assert_eq!(consensus.provider_count, 5);
    assert!((0.0..=100.0).contains(&first.ai_detection.probability));
    assert_eq!(first.ai_detection.probability, second.ai_detection.probability);
    assert_eq!(first.risk_breakdown, second.risk_breakdown);
}
