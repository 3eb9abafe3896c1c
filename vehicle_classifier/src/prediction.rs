use crate::candidate::{ImageCandidate, RawFile};
use crate::config::BackendConfig;
use crate::error::ClassifyError;
use async_trait::async_trait;
use reqwest::{header, multipart, Client};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;

const UPLOAD_FIELD: &str = "file";

/// Outcome of a successful classification.
///
/// `distribution[top_label] == top_confidence` is expected but not enforced;
/// `top_label` is trusted as the backend's authoritative choice.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub top_label: String,
    pub top_confidence: f64,
    pub distribution: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    vehicle_type: String,
    confidence: f64,
    all_predictions: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: String,
}

impl TryFrom<PredictionResponse> for PredictionResult {
    type Error = ClassifyError;

    fn try_from(response: PredictionResponse) -> Result<Self, Self::Error> {
        let top_confidence = probability("confidence", response.confidence)?;
        let distribution = response
            .all_predictions
            .into_iter()
            .map(|(label, value)| probability(&label, value).map(|v| (label, v)))
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(PredictionResult {
            top_label: response.vehicle_type,
            top_confidence,
            distribution,
        })
    }
}

/// Softmax output may overshoot [0, 1] by rounding noise.
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Clamps `value` into [0, 1], rejecting anything beyond rounding noise.
fn probability(field: &str, value: f64) -> Result<f64, ClassifyError> {
    if (-PROBABILITY_TOLERANCE..=1.0 + PROBABILITY_TOLERANCE).contains(&value) {
        Ok(value.clamp(0.0, 1.0))
    } else {
        Err(ClassifyError::Decoding(format!(
            "{} is out of range: {}",
            field, value
        )))
    }
}

/// Decodes a 2xx body into a [`PredictionResult`].
pub fn decode_success(body: &[u8]) -> Result<PredictionResult, ClassifyError> {
    let response: PredictionResponse =
        serde_json::from_slice(body).map_err(|e| ClassifyError::Decoding(e.to_string()))?;
    response.try_into()
}

/// Builds the error for a non-2xx response, preferring the backend's `detail`.
pub fn decode_failure(status: u16, body: &[u8]) -> ClassifyError {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(ErrorResponse { detail }) if !detail.is_empty() => ClassifyError::Backend {
            status,
            message: detail,
        },
        _ => ClassifyError::from_status(status),
    }
}

#[async_trait]
pub trait PredictionBackend: Send + Sync + 'static {
    /// Issues exactly one request for `candidate` and awaits its response.
    async fn predict(&self, candidate: &ImageCandidate)
        -> Result<PredictionResult, ClassifyError>;
}

#[async_trait]
pub trait ExampleSource: Send + Sync + 'static {
    async fn fetch_example(&self, url: &str, name: &str) -> Result<RawFile, ClassifyError>;
}

/// HTTP client for the inference backend and the example asset host.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
    predict_url: String,
    health_url: String,
}

impl InferenceClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ClassifyError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            predict_url: config.predict_url(),
            health_url: config.health_url(),
        })
    }

    /// Probes `GET {base_url}/health` and returns the reported status.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<String, ClassifyError> {
        #[derive(Deserialize)]
        struct Health {
            status: String,
        }

        let response = self.client.get(&self.health_url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(decode_failure(status.as_u16(), &body));
        }

        serde_json::from_slice::<Health>(&body)
            .map(|h| h.status)
            .map_err(|e| ClassifyError::Decoding(e.to_string()))
    }
}

#[async_trait]
impl PredictionBackend for InferenceClient {
    #[instrument(
        skip(self, candidate),
        fields(candidate_id = %candidate.id(), file = candidate.origin_filename())
    )]
    async fn predict(&self, candidate: &ImageCandidate) -> Result<PredictionResult, ClassifyError> {
        let form = multipart::Form::new().part(UPLOAD_FIELD, upload_part(candidate));

        let response = self
            .client
            .post(&self.predict_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!("Backend answered {} with {} bytes", status, body.len());

        if status.is_success() {
            decode_success(&body)
        } else {
            Err(decode_failure(status.as_u16(), &body))
        }
    }
}

#[async_trait]
impl ExampleSource for InferenceClient {
    #[instrument(skip(self))]
    async fn fetch_example(&self, url: &str, name: &str) -> Result<RawFile, ClassifyError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClassifyError::AcquisitionFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::AcquisitionFetch(format!(
                "{} returned HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let mime_type = content_type(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClassifyError::AcquisitionFetch(e.to_string()))?;

        Ok(match mime_type {
            Some(mime_type) => RawFile::with_mime_type(name, mime_type, bytes),
            None => RawFile::new(name, bytes),
        })
    }
}

fn content_type(headers: &header::HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| !v.is_empty() && v != "application/octet-stream")
}

fn upload_part(candidate: &ImageCandidate) -> multipart::Part {
    let part = || {
        multipart::Part::bytes(candidate.payload().to_vec())
            .file_name(candidate.origin_filename().to_string())
    };
    part().mime_str(candidate.mime_type()).unwrap_or_else(|_| part())
}
