//! PhishGuard URL risk scoring engine.
//!
//! A URL is turned into a [`types::FeatureVector`], standardized with the
//! training-time [`scaler::ScalerParameters`], scored by an
//! [`model::InferenceModel`], and the raw probability is blended with domain
//! reputation by the [`scorer::RiskScorer`] into a [`types::ScoringResult`].

pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod reputation;
pub mod routes;
pub mod scaler;
pub mod scorer;
pub mod types;

pub use engine::PhishingEngine;
pub use error::AppError;
pub use types::{FeatureVector, ReputationFacts, RiskLevel, ScoringResult};
