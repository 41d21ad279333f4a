use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const FEATURE_COUNT: usize = 21;

/// Model input schema, in training column order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "url_length",
    "domain_length",
    "path_length",
    "num_dots",
    "num_slashes",
    "num_question",
    "num_equal",
    "num_hyphens",
    "num_at",
    "num_and",
    "num_hash",
    "num_percent",
    "num_digits_url",
    "num_letters_url",
    "https",
    "has_ip",
    "num_subdomains",
    "has_suspicious_words",
    "has_shortening",
    "digit_ratio",
    "special_char_ratio",
];

/// Numeric summary of a URL. Counts and 0/1 flags are stored as `f64` so the
/// vector can be standardized without conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub url_length: f64,
    pub domain_length: f64,
    pub path_length: f64,
    pub num_dots: f64,
    pub num_slashes: f64,
    pub num_question: f64,
    pub num_equal: f64,
    pub num_hyphens: f64,
    pub num_at: f64,
    pub num_and: f64,
    pub num_hash: f64,
    pub num_percent: f64,
    pub num_digits_url: f64,
    pub num_letters_url: f64,
    pub https: f64,
    pub has_ip: f64,
    pub num_subdomains: f64,
    pub has_suspicious_words: f64,
    pub has_shortening: f64,
    pub digit_ratio: f64,
    pub special_char_ratio: f64,
}

impl FeatureVector {
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "url_length" => self.url_length,
            "domain_length" => self.domain_length,
            "path_length" => self.path_length,
            "num_dots" => self.num_dots,
            "num_slashes" => self.num_slashes,
            "num_question" => self.num_question,
            "num_equal" => self.num_equal,
            "num_hyphens" => self.num_hyphens,
            "num_at" => self.num_at,
            "num_and" => self.num_and,
            "num_hash" => self.num_hash,
            "num_percent" => self.num_percent,
            "num_digits_url" => self.num_digits_url,
            "num_letters_url" => self.num_letters_url,
            "https" => self.https,
            "has_ip" => self.has_ip,
            "num_subdomains" => self.num_subdomains,
            "has_suspicious_words" => self.has_suspicious_words,
            "has_shortening" => self.has_shortening,
            "digit_ratio" => self.digit_ratio,
            "special_char_ratio" => self.special_char_ratio,
            _ => return None,
        };
        Some(value)
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES
            .iter()
            .map(move |name| (*name, self.get(name).unwrap_or_default()))
    }

    pub fn is_https(&self) -> bool {
        self.https > 0.5
    }
}

/// Display tier derived from a scoring result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Suspicious,
    Danger,
    Trusted,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Suspicious => "suspicious",
            RiskLevel::Danger => "danger",
            RiskLevel::Trusted => "trusted",
        }
    }
}

/// Reputation facts about one domain, computed before blending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationFacts {
    pub domain: String,
    pub trusted_domain: bool,
    pub suspicious_tld: bool,
    pub https: bool,
    pub age_score: f64,
    pub is_shortener: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub raw_model_score: f64,
    pub final_score: f64,
    pub is_phishing: bool,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub features: FeatureVector,
    #[serde(flatten)]
    pub facts: ReputationFacts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub decision_id: Uuid,
    pub result: ScoringResult,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub total_requests: u64,
    pub phishing_verdicts: u64,
    pub qps: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_schema_name_resolves() {
        let features = FeatureVector::default();
        for name in FEATURE_NAMES {
            assert_eq!(features.get(name), Some(0.0), "{name}");
        }
        assert_eq!(features.get("entropy"), None);
    }

    #[test]
    fn iter_follows_schema_order() {
        let features = FeatureVector {
            url_length: 19.0,
            special_char_ratio: 0.25,
            ..Default::default()
        };
        let pairs: Vec<_> = features.iter().collect();
        assert_eq!(pairs.len(), FEATURE_COUNT);
        assert_eq!(pairs[0], ("url_length", 19.0));
        assert_eq!(pairs[FEATURE_COUNT - 1], ("special_char_ratio", 0.25));
    }

    #[test]
    fn feature_vector_serializes_with_schema_names() {
        let value = serde_json::to_value(FeatureVector::default()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), FEATURE_COUNT);
        for name in FEATURE_NAMES {
            assert!(object.contains_key(name), "{name}");
        }
    }
}
