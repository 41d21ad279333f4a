use crate::{error::AppError, types::FeatureVector};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

const SUSPICIOUS_WORDS: [&str; 5] = ["login", "account", "secure", "update", "verify"];

// Matched as host substrings. The reputation shortener list is a separate,
// label-aligned check; both are kept.
const SHORTENING_MARKERS: [&str; 4] = ["bit.ly", "goo.gl", "tinyurl", "t.co"];

// Shape only, octets are not range-checked.
static IP_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+").expect("ip shape pattern is valid"));

#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Never fails: a URL that does not parse yields the all-zero vector.
    pub fn extract(&self, url: &str) -> FeatureVector {
        match self.try_extract(url) {
            Ok(features) => features,
            Err(e) => {
                debug!("Feature extraction fell back to default vector for {:?}: {}", url, e);
                FeatureVector::default()
            }
        }
    }

    /// Lowercased host of `url`, empty when it does not parse or has no host.
    pub fn domain_of(&self, url: &str) -> String {
        Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
            .unwrap_or_default()
    }

    fn try_extract(&self, url: &str) -> Result<FeatureVector, AppError> {
        let parsed = Url::parse(url)?;
        let domain = parsed.host_str().unwrap_or("").to_lowercase();
        let path = parsed.path();

        let url_length = url.chars().count();
        let count = |needle: char| url.chars().filter(|c| *c == needle).count() as f64;

        let num_dots = count('.');
        let num_hyphens = count('-');
        let num_at = count('@');
        let num_digits_url = url.chars().filter(|c| c.is_ascii_digit()).count() as f64;
        let num_letters_url = url.chars().filter(|c| c.is_ascii_alphabetic()).count() as f64;

        let url_lower = url.to_lowercase();
        let has_suspicious_words = SUSPICIOUS_WORDS.iter().any(|w| url_lower.contains(w));
        let has_shortening = SHORTENING_MARKERS.iter().any(|s| domain.contains(s));

        let num_subdomains = domain.split('.').count().saturating_sub(2);

        let (digit_ratio, special_char_ratio) = if url_length > 0 {
            let len = url_length as f64;
            (num_digits_url / len, (num_dots + num_hyphens + num_at) / len)
        } else {
            (0.0, 0.0)
        };

        Ok(FeatureVector {
            url_length: url_length as f64,
            domain_length: domain.chars().count() as f64,
            path_length: path.chars().count() as f64,
            num_dots,
            num_slashes: count('/'),
            num_question: count('?'),
            num_equal: count('='),
            num_hyphens,
            num_at,
            num_and: count('&'),
            num_hash: count('#'),
            num_percent: count('%'),
            num_digits_url,
            num_letters_url,
            https: flag(parsed.scheme() == "https"),
            has_ip: flag(IP_SHAPE.is_match(&domain)),
            num_subdomains: num_subdomains as f64,
            has_suspicious_words: flag(has_suspicious_words),
            has_shortening: flag(has_shortening),
            digit_ratio,
            special_char_ratio,
        })
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
