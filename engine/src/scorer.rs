//! Blends a raw model probability with reputation facts into the final verdict.
//!
//! Blending is a fold over [`BLENDING_RULES`] in declaration order. Every rule
//! is a pure `(score, facts) -> score` step and the running score is clamped
//! to `[0, 1]` after each one. The verdict threshold, the shortener override
//! and the confidence measure are applied afterwards, in that order.

use crate::{
    reputation::ReputationTables,
    types::{FeatureVector, ReputationFacts, RiskLevel, ScoringResult},
};
use tracing::debug;

pub const TRUSTED_SCORE_CAP: f64 = 0.15;
pub const NO_HTTPS_PENALTY: f64 = 0.08;
pub const SUSPICIOUS_TLD_PENALTY: f64 = 0.10;
pub const UNESTABLISHED_PENALTY: f64 = 0.05;
pub const ESTABLISHED_AGE_THRESHOLD: f64 = 0.5;
pub const PHISHING_THRESHOLD: f64 = 0.70;
pub const SHORTENER_SCORE_FLOOR: f64 = 0.85;
pub const SUSPICIOUS_THRESHOLD: f64 = 0.30;

pub struct AdjustmentRule {
    pub name: &'static str,
    fires: fn(&ReputationFacts) -> bool,
    adjust: fn(f64) -> f64,
}

impl AdjustmentRule {
    pub fn fires(&self, facts: &ReputationFacts) -> bool {
        (self.fires)(facts)
    }

    pub fn apply(&self, score: f64, facts: &ReputationFacts) -> f64 {
        if self.fires(facts) {
            clamp_unit((self.adjust)(score))
        } else {
            score
        }
    }
}

pub static BLENDING_RULES: [AdjustmentRule; 4] = [
    // Trusted domains are capped and exempt from every penalty below.
    AdjustmentRule {
        name: "trusted_domain_cap",
        fires: |facts| facts.trusted_domain,
        adjust: |score| score.min(TRUSTED_SCORE_CAP),
    },
    AdjustmentRule {
        name: "no_https",
        fires: |facts| !facts.trusted_domain && !facts.https,
        adjust: |score| (score + NO_HTTPS_PENALTY).min(1.0),
    },
    AdjustmentRule {
        name: "suspicious_tld",
        fires: |facts| !facts.trusted_domain && facts.suspicious_tld,
        adjust: |score| (score + SUSPICIOUS_TLD_PENALTY).min(1.0),
    },
    AdjustmentRule {
        name: "unestablished_domain",
        fires: |facts| !facts.trusted_domain && facts.age_score < ESTABLISHED_AGE_THRESHOLD,
        adjust: |score| (score + UNESTABLISHED_PENALTY).min(1.0),
    },
];

#[derive(Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        raw_model_probability: f64,
        features: &FeatureVector,
        domain: &str,
        reputation: &ReputationTables,
    ) -> ScoringResult {
        let facts = reputation.facts(domain, features.is_https());
        let (blended, mut reasons) = self.blend(raw_model_probability, &facts);

        let mut final_score = blended;
        let mut is_phishing = !facts.trusted_domain && final_score >= PHISHING_THRESHOLD;
        if is_phishing {
            reasons.push("model_threshold".to_string());
        }

        if facts.is_shortener && !facts.trusted_domain {
            is_phishing = true;
            final_score = final_score.max(SHORTENER_SCORE_FLOOR);
            reasons.push("shortener_override".to_string());
        }

        let confidence = confidence(final_score);
        let risk_level = risk_level(facts.trusted_domain, is_phishing, final_score);

        debug!(
            "Scored {}: raw={:.4} final={:.4} phishing={} reasons={:?}",
            facts.domain, raw_model_probability, final_score, is_phishing, reasons
        );

        ScoringResult {
            raw_model_score: raw_model_probability,
            final_score,
            is_phishing,
            confidence,
            risk_level,
            reasons,
            features: features.clone(),
            facts,
        }
    }

    /// Runs the blending rules and returns the score with the names of the
    /// rules that fired.
    pub fn blend(&self, raw_model_probability: f64, facts: &ReputationFacts) -> (f64, Vec<String>) {
        BLENDING_RULES.iter().fold(
            (clamp_unit(raw_model_probability), Vec::new()),
            |(score, mut reasons), rule| {
                if rule.fires(facts) {
                    reasons.push(rule.name.to_string());
                }
                (rule.apply(score, facts), reasons)
            },
        )
    }
}

/// Distance from the 0.5 decision boundary, scaled to `[0, 1]`.
pub fn confidence(final_score: f64) -> f64 {
    clamp_unit((final_score - 0.5).abs() * 2.0)
}

pub fn risk_level(trusted_domain: bool, is_phishing: bool, final_score: f64) -> RiskLevel {
    if trusted_domain {
        RiskLevel::Trusted
    } else if is_phishing {
        RiskLevel::Danger
    } else if final_score >= SUSPICIOUS_THRESHOLD {
        RiskLevel::Suspicious
    } else {
        RiskLevel::Safe
    }
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reputation::{SHORTENER_DOMAINS, SUSPICIOUS_TLDS, TRUSTED_BASE_DOMAINS};

    const EPS: f64 = 1e-9;

    fn https() -> FeatureVector {
        FeatureVector {
            https: 1.0,
            ..Default::default()
        }
    }

    fn plain_http() -> FeatureVector {
        FeatureVector::default()
    }

    #[test]
    fn trusted_domain_is_capped() {
        let result = RiskScorer::new().score(0.9, &https(), "google.com", &ReputationTables::builtin());
        assert_eq!(result.final_score, 0.15);
        assert!(!result.is_phishing);
        assert!(result.facts.trusted_domain);
        assert_eq!(result.risk_level, RiskLevel::Trusted);
        assert_eq!(result.reasons, vec!["trusted_domain_cap"]);
        assert!((result.confidence - 0.7).abs() < EPS);
    }

    #[test]
    fn trusted_domain_skips_penalties_even_over_http() {
        let result = RiskScorer::new().score(0.05, &plain_http(), "mail.google.com", &ReputationTables::builtin());
        assert_eq!(result.final_score, 0.05);
        assert!(!result.is_phishing);
    }

    #[test]
    fn suspicious_unknown_domain_accumulates_penalties() {
        let result = RiskScorer::new().score(0.5, &plain_http(), "freehost.xyz", &ReputationTables::builtin());
        assert!((result.final_score - 0.73).abs() < EPS);
        assert_eq!(result.final_score, ((0.5_f64 + 0.08) + 0.10) + 0.05);
        assert!(result.is_phishing);
        assert_eq!(result.risk_level, RiskLevel::Danger);
        assert_eq!(
            result.reasons,
            vec!["no_https", "suspicious_tld", "unestablished_domain", "model_threshold"]
        );
    }

    #[test]
    fn penalties_saturate_at_one() {
        let result = RiskScorer::new().score(0.97, &plain_http(), "freehost.xyz", &ReputationTables::builtin());
        assert_eq!(result.final_score, 1.0);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn shortener_override_forces_phishing() {
        let result = RiskScorer::new().score(0.1, &https(), "bit.ly", &ReputationTables::builtin());
        assert!(result.final_score >= 0.85);
        assert_eq!(result.final_score, 0.85);
        assert!(result.is_phishing);
        assert!(result.facts.is_shortener);
        assert!(!result.facts.trusted_domain);
        assert_eq!(result.reasons.last().map(String::as_str), Some("shortener_override"));
    }

    #[test]
    fn shortener_override_applies_even_when_listed_as_trusted() {
        let tables = ReputationTables::new(
            TRUSTED_BASE_DOMAINS.iter().copied().chain(["bit.ly"]),
            SUSPICIOUS_TLDS,
            SHORTENER_DOMAINS,
            std::iter::empty::<&str>(),
        );
        let result = RiskScorer::new().score(0.1, &https(), "bit.ly", &tables);
        assert!(result.is_phishing);
        assert!(result.final_score >= 0.85);
    }

    #[test]
    fn shortener_keeps_higher_blended_score() {
        let result = RiskScorer::new().score(0.95, &plain_http(), "bit.ly", &ReputationTables::builtin());
        assert_eq!(result.final_score, 1.0);
        assert!(result.is_phishing);
    }

    #[test]
    fn threshold_is_inclusive() {
        // https, established, ordinary tld: no penalty applies
        let tables = ReputationTables::new(
            std::iter::empty::<&str>(),
            SUSPICIOUS_TLDS,
            SHORTENER_DOMAINS,
            std::iter::empty::<&str>(),
        );
        let facts = ReputationFacts {
            domain: "example.com".to_string(),
            trusted_domain: false,
            suspicious_tld: false,
            https: true,
            age_score: 1.0,
            is_shortener: false,
        };
        let (score, reasons) = RiskScorer::new().blend(0.70, &facts);
        assert_eq!(score, 0.70);
        assert!(reasons.is_empty());

        let result = RiskScorer::new().score(0.70, &https(), "example.com", &tables);
        // unknown domain still pays the age penalty
        assert!((result.final_score - 0.75).abs() < EPS);
        assert!(result.is_phishing);
    }

    #[test]
    fn risk_levels() {
        assert_eq!(risk_level(true, false, 0.1), RiskLevel::Trusted);
        assert_eq!(risk_level(false, true, 0.9), RiskLevel::Danger);
        assert_eq!(risk_level(false, false, 0.3), RiskLevel::Suspicious);
        assert_eq!(risk_level(false, false, 0.29), RiskLevel::Safe);
    }

    #[test]
    fn confidence_is_symmetric_distance() {
        assert_eq!(confidence(0.5), 0.0);
        assert_eq!(confidence(1.0), 1.0);
        assert_eq!(confidence(0.0), 1.0);
        assert!((confidence(0.25) - confidence(0.75)).abs() < EPS);
    }

    #[test]
    fn scoring_is_pure() {
        let scorer = RiskScorer::new();
        let tables = ReputationTables::builtin();
        let features = plain_http();
        let first = scorer.score(0.42, &features, "login-check.top", &tables);
        let second = scorer.score(0.42, &features, "login-check.top", &tables);
        assert_eq!(first, second);
        assert_eq!(first.final_score.to_bits(), second.final_score.to_bits());
    }
}
