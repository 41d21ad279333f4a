use crate::{
    config::{ModelBackend, ModelConfig},
    error::AppError,
};
use async_trait::async_trait;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

/// The statistical model behind the risk scorer: one standardized row in,
/// one phishing probability out.
#[async_trait]
pub trait InferenceModel: Send + Sync {
    async fn predict(&self, row: &[f64]) -> Result<f64, AppError>;

    fn name(&self) -> &str;
}

/// A missing or out-of-range output is an inference failure, never a score.
pub fn validate_probability(value: f64) -> Result<f64, AppError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::InferenceUnavailable(format!(
            "model returned {} outside [0, 1]",
            value
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Linear,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Linear => x,
        }
    }
}

/// One layer as exported from training: `weights` is `[outputs][inputs]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerWeights {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkWeights {
    #[serde(default = "default_version")]
    pub version: String,
    pub layers: Vec<LayerWeights>,
}

fn default_version() -> String {
    "unversioned".to_string()
}

#[derive(Debug, Clone)]
struct DenseLayer {
    weights: DMatrix<f64>,
    bias: DVector<f64>,
    activation: Activation,
}

/// Feed-forward network evaluated in process.
#[derive(Debug, Clone)]
pub struct DenseNetwork {
    version: String,
    input_width: usize,
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    pub fn from_json(content: &str, input_width: usize) -> Result<Self, AppError> {
        let weights: NetworkWeights = serde_json::from_str(content)?;
        Self::from_weights(weights, input_width)
    }

    /// Checks that layers chain from `input_width` down to a single output.
    pub fn from_weights(spec: NetworkWeights, input_width: usize) -> Result<Self, AppError> {
        if spec.layers.is_empty() {
            return Err(shape_error("network has no layers".to_string()));
        }

        let mut width = input_width;
        let mut layers = Vec::with_capacity(spec.layers.len());
        for (index, layer) in spec.layers.into_iter().enumerate() {
            let outputs = layer.weights.len();
            if outputs == 0 {
                return Err(shape_error(format!("layer {} has no outputs", index)));
            }
            if let Some(row) = layer.weights.iter().find(|row| row.len() != width) {
                return Err(shape_error(format!(
                    "layer {} expects {} inputs, found a row of {}",
                    index,
                    width,
                    row.len()
                )));
            }
            if layer.bias.len() != outputs {
                return Err(shape_error(format!(
                    "layer {} has {} outputs but {} biases",
                    index,
                    outputs,
                    layer.bias.len()
                )));
            }

            let flat: Vec<f64> = layer.weights.into_iter().flatten().collect();
            layers.push(DenseLayer {
                weights: DMatrix::from_row_slice(outputs, width, &flat),
                bias: DVector::from_vec(layer.bias),
                activation: layer.activation,
            });
            width = outputs;
        }

        if width != 1 {
            return Err(shape_error(format!("network ends with {} outputs, expected 1", width)));
        }

        Ok(Self {
            version: spec.version,
            input_width,
            layers,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn forward(&self, row: &[f64]) -> Result<f64, AppError> {
        if row.len() != self.input_width {
            return Err(AppError::InferenceUnavailable(format!(
                "input row has {} columns, model expects {}",
                row.len(),
                self.input_width
            )));
        }

        let output = self.layers.iter().fold(DVector::from_column_slice(row), |x, layer| {
            (&layer.weights * x + &layer.bias).map(|v| layer.activation.apply(v))
        });

        Ok(output[0])
    }
}

#[async_trait]
impl InferenceModel for DenseNetwork {
    async fn predict(&self, row: &[f64]) -> Result<f64, AppError> {
        self.forward(row)
    }

    fn name(&self) -> &str {
        "dense-network"
    }
}

#[derive(Debug, Serialize)]
struct RemoteRequest<'a> {
    input: [&'a [f64]; 1],
}

#[derive(Debug, Deserialize)]
struct RemoteResponse {
    probability: f64,
}

/// Model served over HTTP: `POST {"input": [[..]]}` → `{"probability": p}`.
pub struct RemoteModel {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteModel {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl InferenceModel for RemoteModel {
    async fn predict(&self, row: &[f64]) -> Result<f64, AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RemoteRequest { input: [row] })
            .send()
            .await?
            .error_for_status()?;

        let body: RemoteResponse = response.json().await?;
        debug!("Remote model {} returned {}", self.endpoint, body.probability);
        Ok(body.probability)
    }

    fn name(&self) -> &str {
        "remote"
    }
}

/// Builds the configured backend. Local weights are read here so a missing
/// model fails initialization.
pub async fn load_model(config: &ModelConfig, input_width: usize) -> Result<Arc<dyn InferenceModel>, AppError> {
    match config.backend {
        ModelBackend::Local => {
            let content = tokio::fs::read_to_string(&config.weights_path).await?;
            let network = DenseNetwork::from_json(&content, input_width)?;
            info!(
                "Loaded dense network {} from {}",
                network.version(),
                config.weights_path.display()
            );
            Ok(Arc::new(network))
        }
        ModelBackend::Remote => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                AppError::InvalidInput("model.endpoint is required for the remote backend".to_string())
            })?;
            let model = RemoteModel::new(endpoint, Duration::from_millis(config.timeout_ms))?;
            info!("Using remote model at {}", endpoint);
            Ok(Arc::new(model))
        }
    }
}

fn shape_error(msg: String) -> AppError {
    AppError::InferenceUnavailable(format!("invalid model weights: {}", msg))
}
