use crate::{
    config::Config,
    error::AppError,
    features::FeatureExtractor,
    model::{load_model, validate_probability, InferenceModel},
    reputation::{parse_popular_domains, ReputationTables},
    scaler::{standardize, ScalerParameters},
    scorer::RiskScorer,
    types::ScoringResult,
};
use std::{collections::HashSet, path::Path, sync::Arc};
use tracing::{debug, info, warn};

/// Extraction → standardization → inference → scoring. Everything except the
/// model is immutable after construction, so one engine serves concurrent
/// classifications without locking.
pub struct PhishingEngine {
    extractor: FeatureExtractor,
    scaler: Arc<ScalerParameters>,
    reputation: Arc<ReputationTables>,
    scorer: RiskScorer,
    model: Arc<dyn InferenceModel>,
}

impl PhishingEngine {
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        info!("Initializing PhishGuard engine...");

        let scaler = Self::load_scaler(&config.scaler_path).await?;
        let popular = Self::load_popular_domains(&config.popular_domains_path).await;
        let reputation = ReputationTables::from_config(&config.reputation, popular);
        let model = load_model(&config.model, scaler.len()).await?;

        info!(
            "PhishGuard engine initialized: {} trusted, {} popular, {} suspicious TLDs, {} shorteners, model={}",
            reputation.trusted_base_domains().len(),
            reputation.popular_domains().len(),
            reputation.suspicious_tlds().len(),
            reputation.shortener_domains().len(),
            model.name()
        );

        Ok(Self::from_parts(scaler, reputation, model))
    }

    pub fn from_parts(
        scaler: ScalerParameters,
        reputation: ReputationTables,
        model: Arc<dyn InferenceModel>,
    ) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            scaler: Arc::new(scaler),
            reputation: Arc::new(reputation),
            scorer: RiskScorer::new(),
            model,
        }
    }

    pub async fn classify(&self, url: &str) -> Result<ScoringResult, AppError> {
        let features = self.extractor.extract(url);
        let domain = self.extractor.domain_of(url);

        let row = standardize(&features, &self.scaler)?;
        let raw = validate_probability(self.model.predict(&row).await?)?;

        debug!("Model score for {:?}: {:.4}", domain, raw);

        Ok(self.scorer.score(raw, &features, &domain, &self.reputation))
    }

    pub fn reputation(&self) -> &ReputationTables {
        &self.reputation
    }

    pub fn scaler(&self) -> &ScalerParameters {
        &self.scaler
    }

    async fn load_scaler(path: &Path) -> Result<ScalerParameters, AppError> {
        let content = tokio::fs::read_to_string(path).await?;
        let scaler = ScalerParameters::from_json(&content)?;
        info!("Loaded scaler parameters from {}", path.display());
        Ok(scaler)
    }

    /// The popular corpus is optional: any failure leaves it empty, which only
    /// lowers trust and age signals.
    async fn load_popular_domains(path: &Path) -> HashSet<String> {
        let loaded = match tokio::fs::read_to_string(path).await {
            Ok(content) => parse_popular_domains(&content),
            Err(e) => Err(AppError::ReputationDataUnavailable(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        };

        match loaded {
            Ok(domains) => {
                info!("Loaded {} popular domains from {}", domains.len(), path.display());
                domains
            }
            Err(e) => {
                warn!("{}; continuing with an empty popular-domain set", e);
                HashSet::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureVector, FEATURE_NAMES};
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;

    struct FixedModel(f64);

    #[async_trait]
    impl InferenceModel for FixedModel {
        async fn predict(&self, row: &[f64]) -> Result<f64, AppError> {
            assert_eq!(row.len(), FEATURE_NAMES.len());
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct DownModel;

    #[async_trait]
    impl InferenceModel for DownModel {
        async fn predict(&self, _row: &[f64]) -> Result<f64, AppError> {
            Err(AppError::InferenceUnavailable("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    fn engine(model: Arc<dyn InferenceModel>) -> PhishingEngine {
        PhishingEngine::from_parts(ScalerParameters::identity(), ReputationTables::builtin(), model)
    }

    #[tokio::test]
    async fn classifies_trusted_domain() {
        let result = engine(Arc::new(FixedModel(0.9)))
            .classify("https://mail.google.com/mail/u/0/")
            .await
            .unwrap();
        assert_eq!(result.facts.domain, "mail.google.com");
        assert!(result.facts.trusted_domain);
        assert_eq!(result.raw_model_score, 0.9);
        assert_eq!(result.final_score, 0.15);
        assert!(!result.is_phishing);
    }

    #[tokio::test]
    async fn malformed_url_still_scores() {
        let result = engine(Arc::new(FixedModel(0.6))).classify("not a url").await.unwrap();
        assert_eq!(result.features, FeatureVector::default());
        assert_eq!(result.facts.domain, "");
        // no https, unknown age
        assert!((result.final_score - 0.73).abs() < 1e-9);
        assert!(result.is_phishing);
    }

    #[tokio::test]
    async fn inference_failure_is_surfaced() {
        let err = engine(Arc::new(DownModel))
            .classify("http://freehost.xyz/login")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InferenceUnavailable(_)));
    }

    #[tokio::test]
    async fn out_of_range_model_output_is_rejected() {
        let err = engine(Arc::new(FixedModel(f64::NAN)))
            .classify("https://example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InferenceUnavailable(_)));
    }

    #[tokio::test]
    async fn missing_popular_corpus_degrades_to_empty() {
        let domains = PhishingEngine::load_popular_domains(Path::new("/nonexistent/top.json")).await;
        assert!(domains.is_empty());
    }

    #[tokio::test]
    async fn initializes_from_config_files() {
        let dir = tempfile::tempdir().unwrap();

        let scaler_path = dir.path().join("scaler.json");
        let mut scaler = std::fs::File::create(&scaler_path).unwrap();
        write!(
            scaler,
            "{}",
            json!({
                "mean": vec![0.0; FEATURE_NAMES.len()],
                "scale": vec![1.0; FEATURE_NAMES.len()],
                "feature_names": FEATURE_NAMES,
            })
        )
        .unwrap();

        let weights_path = dir.path().join("weights.json");
        let mut weights = std::fs::File::create(&weights_path).unwrap();
        write!(
            weights,
            "{}",
            json!({
                "version": "zero",
                "layers": [{
                    "weights": [vec![0.0; FEATURE_NAMES.len()]],
                    "bias": [0.0],
                    "activation": "sigmoid"
                }]
            })
        )
        .unwrap();

        let popular_path = dir.path().join("top.json");
        std::fs::write(&popular_path, r#"["example.org"]"#).unwrap();

        let mut config = Config::default();
        config.scaler_path = scaler_path;
        config.popular_domains_path = popular_path;
        config.model.weights_path = weights_path;

        let engine = PhishingEngine::new(&config).await.unwrap();
        assert_eq!(engine.scaler().len(), FEATURE_NAMES.len());
        assert!(engine.reputation().popular_domains().contains("example.org"));

        let result = engine.classify("https://docs.example.org/start").await.unwrap();
        assert_eq!(result.raw_model_score, 0.5);
        assert!(result.facts.trusted_domain);
        assert_eq!(result.final_score, 0.15);
    }

    #[tokio::test]
    async fn missing_scaler_fails_initialization() {
        let mut config = Config::default();
        config.scaler_path = "/nonexistent/scaler.json".into();
        assert!(PhishingEngine::new(&config).await.is_err());
    }
}
