//! Client for the remote analysis service.
//!
//! The service computes safety/effort/enjoyment scores server-side; this
//! client only transports requests and decodes responses. Hosting can put the
//! backend to sleep, so the hard timeout is generous (see
//! [`crate::config::DEFAULT_REQUEST_TIMEOUT_SECS`]).

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{AppError, ServiceErrorBody};
use crate::models::{
    AnalysisResult, AnalyzeResponse, ExplanationRequest, ExplanationResponse, HealthStatus,
    NearestSpot, Profile, SpotRequest, TimelineDataset, WeatherSnapshot,
};

/// Anything that can produce a timeline for a spot.
///
/// The orchestrator is generic over this so it can be driven without a
/// network in tests.
pub trait TimelineSource {
    fn fetch_timeline(
        &self,
        spot_id: &str,
        profile: Option<&Profile>,
    ) -> impl Future<Output = Result<TimelineDataset, AppError>> + Send;
}

/// Client for the analysis service API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("rumbo-sup-client/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and decode a JSON response.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        decode_response(path, response).await
    }

    /// Timeline for a spot, personalised to `profile` when given.
    pub async fn get_timeline(
        &self,
        spot_id: &str,
        profile: Option<&Profile>,
    ) -> Result<TimelineDataset, AppError> {
        let started = Instant::now();
        tracing::info!("Fetching timeline for spot '{}'", spot_id);

        let dataset: TimelineDataset = self
            .post_json(
                "/timeline",
                &SpotRequest {
                    spot_id,
                    user: profile,
                },
            )
            .await
            .inspect_err(|e| tracing::error!("Error getting timeline: {}", e))?;

        if dataset.timeline.is_empty() {
            return Err(AppError::ExternalServiceError(
                "service returned an empty timeline".to_string(),
            ));
        }

        tracing::info!(
            "Timeline for '{}' received: {} points in {} ms",
            spot_id,
            dataset.timeline.len(),
            started.elapsed().as_millis()
        );
        Ok(dataset)
    }

    /// Single-point analysis.
    pub async fn analyze(
        &self,
        spot_id: &str,
        profile: Option<&Profile>,
    ) -> Result<AnalyzeResponse, AppError> {
        self.post_json(
            "/analyze",
            &SpotRequest {
                spot_id,
                user: profile,
            },
        )
        .await
        .inspect_err(|e| tracing::error!("Error analyzing conditions: {}", e))
    }

    /// Pedagogical explanation (markdown) for one analysed point.
    pub async fn explain(
        &self,
        profile: &Profile,
        weather: &WeatherSnapshot,
        result: &AnalysisResult,
    ) -> Result<ExplanationResponse, AppError> {
        self.post_json(
            "/pedagogy/explain",
            &ExplanationRequest {
                user: profile,
                weather,
                result,
            },
        )
        .await
        .inspect_err(|e| tracing::error!("Error getting explanation: {}", e))
    }

    /// Closest known spot to a coordinate.
    pub async fn nearest_spot(&self, lat: f64, lon: f64) -> Result<NearestSpot, AppError> {
        let response = self
            .client
            .get(self.url("/spots/nearest"))
            .query(&[("lat", lat), ("lon", lon)])
            .send()
            .await?;
        decode_response("/spots/nearest", response)
            .await
            .inspect_err(|e| tracing::error!("Error getting nearest spot: {}", e))
    }

    /// Backend health. `None` when the backend can't be reached.
    pub async fn health(&self) -> Option<HealthStatus> {
        let result: Result<HealthStatus, AppError> = async {
            let response = self.client.get(self.url("/health")).send().await?;
            decode_response("/health", response).await
        }
        .await;

        match result {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!("Backend not available: {}", e);
                None
            }
        }
    }
}

impl TimelineSource for ApiClient {
    async fn fetch_timeline(
        &self,
        spot_id: &str,
        profile: Option<&Profile>,
    ) -> Result<TimelineDataset, AppError> {
        self.get_timeline(spot_id, profile).await
    }
}

/// Map non-success statuses to errors and decode successful bodies.
async fn decode_response<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<ServiceErrorBody>()
            .await
            .map(|b| b.message())
            .unwrap_or_else(|_| "no detail".to_string());
        return Err(AppError::ExternalServiceError(format!(
            "{} returned HTTP {}: {}",
            path, status, detail
        )));
    }

    response.json::<T>().await.map_err(|e| {
        AppError::ExternalServiceError(format!("{} response decode error: {}", path, e))
    })
}
