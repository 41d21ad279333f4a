use crate::{config::ReputationConfig, error::AppError, types::ReputationFacts};
use std::collections::HashSet;

pub const TRUSTED_BASE_DOMAINS: [&str; 14] = [
    "google.com",
    "drive.google.com",
    "gmail.com",
    "youtube.com",
    "microsoft.com",
    "office.com",
    "live.com",
    "outlook.com",
    "github.com",
    "amazon.com",
    "flipkart.com",
    "facebook.com",
    "instagram.com",
    "whatsapp.com",
];

pub const SUSPICIOUS_TLDS: [&str; 12] = [
    "xyz", "top", "gq", "tk", "ml", "cf", "buzz", "click", "support", "loan", "cam", "rest",
];

pub const SHORTENER_DOMAINS: [&str; 4] = ["bit.ly", "goo.gl", "tinyurl.com", "t.co"];

pub const ESTABLISHED_AGE_SCORE: f64 = 1.0;
pub const UNKNOWN_AGE_SCORE: f64 = 0.3;

/// Immutable reputation snapshot. Built once during initialization and then
/// shared read-only; rebuilding requires a new engine.
#[derive(Debug, Clone, Default)]
pub struct ReputationTables {
    trusted_base_domains: HashSet<String>,
    suspicious_tlds: HashSet<String>,
    shortener_domains: HashSet<String>,
    popular_domains: HashSet<String>,
}

impl ReputationTables {
    pub fn new<T, S, H, P>(trusted: T, suspicious_tlds: S, shorteners: H, popular: P) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
        H: IntoIterator,
        H::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self {
            trusted_base_domains: normalize(trusted),
            suspicious_tlds: normalize(suspicious_tlds),
            shortener_domains: normalize(shorteners),
            popular_domains: normalize(popular),
        }
    }

    /// Built-in static lists with an empty popular-domain corpus.
    pub fn builtin() -> Self {
        Self::new(
            TRUSTED_BASE_DOMAINS,
            SUSPICIOUS_TLDS,
            SHORTENER_DOMAINS,
            std::iter::empty::<&str>(),
        )
    }

    /// Built-in lists extended with operator additions and the popular corpus.
    pub fn from_config(config: &ReputationConfig, popular: HashSet<String>) -> Self {
        Self::new(
            TRUSTED_BASE_DOMAINS
                .iter()
                .copied()
                .chain(config.extra_trusted.iter().map(String::as_str)),
            SUSPICIOUS_TLDS
                .iter()
                .copied()
                .chain(config.extra_suspicious_tlds.iter().map(String::as_str)),
            SHORTENER_DOMAINS
                .iter()
                .copied()
                .chain(config.extra_shorteners.iter().map(String::as_str)),
            popular,
        )
    }

    pub fn trusted_base_domains(&self) -> &HashSet<String> {
        &self.trusted_base_domains
    }

    pub fn suspicious_tlds(&self) -> &HashSet<String> {
        &self.suspicious_tlds
    }

    pub fn shortener_domains(&self) -> &HashSet<String> {
        &self.shortener_domains
    }

    pub fn popular_domains(&self) -> &HashSet<String> {
        &self.popular_domains
    }

    pub fn is_suspicious_tld(&self, domain: &str) -> bool {
        self.suspicious_tlds.contains(&tld(domain))
    }

    /// Allowlist check only; shortener precedence is applied by [`Self::facts`].
    pub fn is_trusted(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        !domain.is_empty()
            && (exact_or_suffix_match(&domain, &self.trusted_base_domains)
                || exact_or_suffix_match(&domain, &self.popular_domains))
    }

    pub fn is_shortener(&self, domain: &str) -> bool {
        exact_or_suffix_match(&domain.to_lowercase(), &self.shortener_domains)
    }

    /// Popularity stands in for domain age; registration age is not observed.
    pub fn age_score(&self, domain: &str) -> f64 {
        if self.popular_domains.contains(&domain.to_lowercase()) {
            ESTABLISHED_AGE_SCORE
        } else {
            UNKNOWN_AGE_SCORE
        }
    }

    pub fn facts(&self, domain: &str, https: bool) -> ReputationFacts {
        let domain = domain.to_lowercase();
        let is_shortener = self.is_shortener(&domain);
        // shortener membership overrides trust
        let trusted_domain = !is_shortener && self.is_trusted(&domain);

        ReputationFacts {
            trusted_domain,
            suspicious_tld: self.is_suspicious_tld(&domain),
            https,
            age_score: self.age_score(&domain),
            is_shortener,
            domain,
        }
    }
}

/// Lowercased label after the last `.`, empty when there is none.
pub fn tld(domain: &str) -> String {
    domain
        .rsplit_once('.')
        .map(|(_, last)| last.to_lowercase())
        .unwrap_or_default()
}

/// Parses the popular-domain corpus, a JSON array of domain strings.
pub fn parse_popular_domains(content: &str) -> Result<HashSet<String>, AppError> {
    let domains: Vec<String> = serde_json::from_str(content)
        .map_err(|e| AppError::ReputationDataUnavailable(format!("invalid popular-domain corpus: {}", e)))?;
    Ok(normalize(domains))
}

fn normalize<I>(items: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().trim().trim_matches('.').to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

// `domain` matches `base` when equal or when it ends with `.base`.
fn exact_or_suffix_match(domain: &str, set: &HashSet<String>) -> bool {
    if set.contains(domain) {
        return true;
    }
    domain
        .match_indices('.')
        .any(|(i, _)| set.contains(&domain[i + 1..]))
}
