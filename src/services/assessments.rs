// Sibling Assessments
// Originality, copyright, SEO and disclosure collaborators of the analyzer.
// Each is a trait so real services can be plugged in; the Local* types are
// lightweight offline implementations built on text_processor.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use crate::models::{CopyrightRiskResult, OriginalityResult, RiskLevel, SeoAssessment};
use crate::services::text_processor::{compute_stylometry, tokenize_words};

const PLAGIARISM_THRESHOLD: f64 = 60.0;

#[async_trait]
pub trait OriginalityChecker: Send + Sync {
    async fn check(&self, content: &str) -> anyhow::Result<OriginalityResult>;
}

#[async_trait]
pub trait CopyrightAssessor: Send + Sync {
    async fn assess(&self, content: &str) -> anyhow::Result<CopyrightRiskResult>;
}

#[async_trait]
pub trait SeoAssessor: Send + Sync {
    async fn assess(&self, content: &str) -> anyhow::Result<SeoAssessment>;
}

#[async_trait]
pub trait DisclosureGenerator: Send + Sync {
    async fn generate(&self, content: &str, ai_probability: f64, content_type: &str) -> anyhow::Result<String>;
}

// ============ Originality ============

/// Scores originality from internal 3-gram repetition; no external index.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalOriginalityChecker;

#[async_trait]
impl OriginalityChecker for LocalOriginalityChecker {
    async fn check(&self, content: &str) -> anyhow::Result<OriginalityResult> {
        let metrics = compute_stylometry(content);
        let originality_score = (100.0 - metrics.ngram_repeat_rate * 100.0).clamp(0.0, 100.0);
        Ok(OriginalityResult {
            originality_score,
            is_plagiarized: originality_score < PLAGIARISM_THRESHOLD,
            matched_sources: Vec::new(),
        })
    }
}

// ============ Copyright ============

struct CopyrightMarker {
    label: &'static str,
    pattern: Regex,
    recommendation: &'static str,
}

fn copyright_markers() -> &'static [CopyrightMarker] {
    static MARKERS: OnceLock<Vec<CopyrightMarker>> = OnceLock::new();
    MARKERS.get_or_init(|| {
        let marker = |label, pattern: &str, recommendation| CopyrightMarker {
            label,
            pattern: Regex::new(pattern).expect("valid copyright marker regex"),
            recommendation,
        };
        vec![
            marker(
                "copyright notice",
                r"(?i)(©|\(c\)\s*\d{4}|\bcopyright\b)",
                "Confirm you hold rights to any material carrying a copyright notice",
            ),
            marker(
                "rights reservation",
                r"(?i)all rights reserved",
                "Remove or license text copied from a rights-reserved source",
            ),
            marker(
                "long quotation",
                r#""[^"]{120,}""#,
                "Shorten long quotations and cite the original source",
            ),
            marker(
                "trademark symbol",
                r"[™®]",
                "Check trademark usage follows the owner's guidelines",
            ),
            marker(
                "song lyrics",
                r"(?i)\b(lyrics|chorus|verse \d)\b",
                "Lyrics are rarely fair use; obtain a license or paraphrase",
            ),
        ]
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCopyrightAssessor;

#[async_trait]
impl CopyrightAssessor for LocalCopyrightAssessor {
    async fn assess(&self, content: &str) -> anyhow::Result<CopyrightRiskResult> {
        let hits: Vec<&CopyrightMarker> = copyright_markers()
            .iter()
            .filter(|m| m.pattern.is_match(content))
            .collect();

        let risk_level = match hits.len() {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        };

        Ok(CopyrightRiskResult {
            risk_level,
            detected_content: hits.iter().map(|m| m.label.to_string()).collect(),
            recommendations: hits.iter().map(|m| m.recommendation.to_string()).collect(),
        })
    }
}

// ============ SEO / E-E-A-T ============

const THIN_CONTENT_WORDS: usize = 300;
const VERY_THIN_CONTENT_WORDS: usize = 100;
const LONG_SENTENCE_WORDS: f64 = 25.0;
const LOW_DIVERSITY_TTR: f64 = 0.4;
/// Share of distinct words used 3+ times above which the text reads as stuffed
const KEYWORD_STUFFING_RATIO: f64 = 0.3;
const MIN_WORDS_FOR_DIVERSITY: usize = 50;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSeoAssessor;

#[async_trait]
impl SeoAssessor for LocalSeoAssessor {
    async fn assess(&self, content: &str) -> anyhow::Result<SeoAssessment> {
        let metrics = compute_stylometry(content);
        let mut score: i32 = 5;
        let mut assessment = SeoAssessment {
            score: 5,
            ..SeoAssessment::default()
        };

        if metrics.word_count < THIN_CONTENT_WORDS {
            score -= 1;
            assessment
                .risk_factors
                .push(format!("Thin content ({} words)", metrics.word_count));
            assessment
                .recommendations
                .push(format!("Expand the piece to at least {} words", THIN_CONTENT_WORDS));
        }
        if metrics.word_count < VERY_THIN_CONTENT_WORDS {
            score -= 1;
        }
        if metrics.avg_sentence_words > LONG_SENTENCE_WORDS {
            score -= 1;
            assessment
                .risk_factors
                .push(format!("Long sentences (avg {:.1} words)", metrics.avg_sentence_words));
            assessment
                .recommendations
                .push("Break up long sentences to improve readability".to_string());
        }
        if metrics.word_count >= MIN_WORDS_FOR_DIVERSITY && metrics.ttr < LOW_DIVERSITY_TTR {
            score -= 1;
            assessment.risk_factors.push("Repetitive vocabulary".to_string());
            assessment
                .recommendations
                .push("Vary word choice".to_string());
        }
        if metrics.word_count >= MIN_WORDS_FOR_DIVERSITY && metrics.repeat_ratio > KEYWORD_STUFFING_RATIO {
            score -= 1;
            assessment.risk_factors.push(format!(
                "Keyword stuffing ({:.0}% of distinct words used 3+ times)",
                metrics.repeat_ratio * 100.0
            ));
            assessment
                .recommendations
                .push("Cut repeated keywords down to natural usage".to_string());
        }

        let has_experience_signal = tokenize_words(content).iter().any(|w| {
            matches!(
                w.to_lowercase().as_str(),
                "i" | "my" | "we" | "our" | "i've" | "we've" | "tested" | "experience"
            )
        });
        if !has_experience_signal {
            score -= 1;
            assessment
                .eeat_violations
                .push("No first-hand experience signals".to_string());
            assessment
                .recommendations
                .push("Add first-hand experience, examples or author credentials".to_string());
        }

        assessment.score = score.clamp(1, 5) as u8;
        Ok(assessment)
    }
}

// ============ Disclosure ============

#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateDisclosureGenerator;

#[async_trait]
impl DisclosureGenerator for TemplateDisclosureGenerator {
    async fn generate(&self, _content: &str, ai_probability: f64, content_type: &str) -> anyhow::Result<String> {
        let subject = match content_type.trim() {
            "" | "general" => "This content".to_string(),
            other => format!("This {}", other),
        };

        let statement = if ai_probability > 80.0 {
            format!(
                "{} was generated with the assistance of AI tools and reviewed by a human editor.",
                subject
            )
        } else if ai_probability > 50.0 {
            format!(
                "{} was created with significant AI assistance and edited for accuracy.",
                subject
            )
        } else if ai_probability > 20.0 {
            format!("Portions of {} were drafted with AI assistance.", subject.to_lowercase())
        } else {
            format!("{} was written by a human author.", subject)
        };

        Ok(statement)
    }
}
