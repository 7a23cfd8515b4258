//! HTTP transport for the raster-analysis backend.
//!
//! Reductions are synchronous POSTs; a non-2xx status carries the
//! backend's failure text in the body, which is passed through opaque.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::reduce::{
    BatchReduceRequest, ReduceOutput, ReduceRequest, SampleOutput, SampleRequest,
};
use crate::{BackendError, RasterBackend};

/// Client for an HTTP raster-analysis backend.
pub struct HttpRasterBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRasterBackend {
    /// Creates a client against the given base URL.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn post<T: serde::Serialize + Sync, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, BackendError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(BackendError::Remote { message });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Parse {
            message: format!("Failed to parse backend response: {e}"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ReduceResponse {
    #[serde(default)]
    result: Option<f64>,
    #[serde(default)]
    histogram: Option<BTreeMap<String, f64>>,
}

impl ReduceResponse {
    fn into_output(self) -> Result<ReduceOutput, BackendError> {
        match (self.result, self.histogram) {
            (Some(value), None) => Ok(ReduceOutput::Sum(value)),
            (None, Some(counts)) => Ok(ReduceOutput::Histogram(counts)),
            _ => Err(BackendError::Parse {
                message: "Backend response carried neither result nor histogram".to_string(),
            }),
        }
    }
}

#[async_trait]
impl RasterBackend for HttpRasterBackend {
    async fn reduce(&self, request: &ReduceRequest) -> Result<ReduceOutput, BackendError> {
        let response: ReduceResponse = self.post("/v1/reduce", request).await?;
        response.into_output()
    }

    async fn reduce_batch(
        &self,
        request: &BatchReduceRequest,
    ) -> Result<ReduceOutput, BackendError> {
        log::debug!(
            "Batch reduce over {} regions at scale {}",
            request.geometries.len(),
            request.scale_m
        );
        let response: ReduceResponse = self.post("/v1/reduce/batch", request).await?;
        response.into_output()
    }

    async fn sample(&self, request: &SampleRequest) -> Result<SampleOutput, BackendError> {
        self.post("/v1/sample", request).await
    }
}
