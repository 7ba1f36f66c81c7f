// Overall Risk Aggregation
// Fixed point table: each dimension contributes 0-3 points, summed to 0-12.
// Copyright risk scores 0/2/3 (no 1-point tier); this is kept as-is.

use crate::models::{
    AiDetectionSummary, CopyrightRiskResult, OriginalityResult, RiskBreakdown, RiskLevel, SeoAssessment,
};

const HIGH_RISK_POINTS: u8 = 8;
const MEDIUM_RISK_POINTS: u8 = 4;

pub fn ai_points(probability: f64) -> u8 {
    if probability > 80.0 {
        3
    } else if probability > 50.0 {
        2
    } else if probability > 20.0 {
        1
    } else {
        0
    }
}

pub fn originality_points(originality_score: f64) -> u8 {
    if originality_score < 60.0 {
        3
    } else if originality_score < 80.0 {
        2
    } else if originality_score < 95.0 {
        1
    } else {
        0
    }
}

pub fn copyright_points(risk_level: RiskLevel) -> u8 {
    match risk_level {
        RiskLevel::High => 3,
        RiskLevel::Medium => 2,
        RiskLevel::Low => 0,
    }
}

pub fn seo_points(score: u8) -> u8 {
    if score <= 2 {
        3
    } else if score <= 3 {
        2
    } else if score <= 4 {
        1
    } else {
        0
    }
}

pub fn risk_from_points(total: u8) -> RiskLevel {
    if total >= HIGH_RISK_POINTS {
        RiskLevel::High
    } else if total >= MEDIUM_RISK_POINTS {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Point breakdown for the four raw signals.
pub fn score_breakdown(
    ai_probability: f64,
    originality_score: f64,
    copyright_risk: RiskLevel,
    seo_score: u8,
) -> RiskBreakdown {
    let ai = ai_points(ai_probability);
    let originality = originality_points(originality_score);
    let copyright = copyright_points(copyright_risk);
    let seo = seo_points(seo_score);
    RiskBreakdown {
        ai_points: ai,
        originality_points: originality,
        copyright_points: copyright,
        seo_points: seo,
        total: ai + originality + copyright + seo,
    }
}

/// Stateless aggregator over the four assessment results.
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskAggregator;

impl RiskAggregator {
    pub fn breakdown(
        &self,
        ai_detection: &AiDetectionSummary,
        originality: &OriginalityResult,
        copyright_risk: &CopyrightRiskResult,
        seo_assessment: &SeoAssessment,
    ) -> RiskBreakdown {
        score_breakdown(
            ai_detection.probability,
            originality.originality_score,
            copyright_risk.risk_level,
            seo_assessment.score,
        )
    }

    pub fn combine(
        &self,
        ai_detection: &AiDetectionSummary,
        originality: &OriginalityResult,
        copyright_risk: &CopyrightRiskResult,
        seo_assessment: &SeoAssessment,
    ) -> RiskLevel {
        risk_from_points(
            self.breakdown(ai_detection, originality, copyright_risk, seo_assessment)
                .total,
        )
    }
}
