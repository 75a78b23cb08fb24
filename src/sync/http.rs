//! HTTP implementation of [`RemoteSync`].
//!
//! Both calls go to the same endpoint: `GET <endpoint>?folderName=<session>` for the
//! baseline and `POST <endpoint>` with a JSON body for a submission. Failures are
//! reported once and never retried here.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::config::ClientConfig;
use crate::config::session::SessionIdentity;
use crate::core::position::RemoteBaseline;
use crate::error::{CaptureError, CaptureResult};
use crate::sync::RemoteSync;
use crate::sync::schema::{BaselineResponse, SubmitAck, SubmitRequest};

/// Client for the remote list endpoint.
#[derive(Debug, Clone)]
pub struct HttpRemoteSync {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRemoteSync {
    /// Create a client for `endpoint` with explicit timeouts.
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> CaptureResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| CaptureError::network("build http client").with_source(e))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a client from validated configuration.
    pub fn from_config(config: &ClientConfig) -> CaptureResult<Self> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn read_success_body(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> CaptureResult<(u16, String)> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            CaptureError::network(operation)
                .with_address(&self.endpoint)
                .with_status(status.as_u16())
                .with_source(e)
        })?;
        if !status.is_success() {
            return Err(CaptureError::network(operation)
                .with_address(&self.endpoint)
                .with_status(status.as_u16())
                .with_reason(format!("server answered {status}"))
                .with_recovery_suggestion("Check the connection and repeat the action"));
        }
        Ok((status.as_u16(), body))
    }
}

#[async_trait]
impl RemoteSync for HttpRemoteSync {
    async fn fetch_baseline(&self, session: &SessionIdentity) -> CaptureResult<RemoteBaseline> {
        let operation = "fetch baseline";
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("folderName", session.as_str())])
            .send()
            .await
            .map_err(|e| {
                CaptureError::network(operation)
                    .with_address(&self.endpoint)
                    .with_source(e)
            })?;

        let (_, body) = self.read_success_body(operation, response).await?;
        let parsed = BaselineResponse::parse(&body)
            .map_err(|e| e.with_address(&self.endpoint))?;
        let baseline = RemoteBaseline::new(parsed.count());
        info!(session = %session, count = baseline.count(), "fetched remote baseline");
        Ok(baseline)
    }

    async fn submit(&self, request: &SubmitRequest) -> CaptureResult<SubmitAck> {
        let operation = "submit record";
        debug!(
            row = %request.row,
            barcode = %request.barcode,
            front_len = request.front_image.len(),
            back_len = request.back_image.len(),
            "posting record"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                CaptureError::network(operation)
                    .with_address(&self.endpoint)
                    .with_source(e)
            })?;

        let (status, body) = self.read_success_body(operation, response).await?;
        Ok(SubmitAck::from_body(status, &body))
    }
}
