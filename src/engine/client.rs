use crate::engine::{RawResponse, Transport};
use crate::error::TransportError;
use crate::form::FormSubmission;
use crate::model::SubmitConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;

/// reqwest-backed transport posting to `{base_url}/api/process_query`.
pub struct QueryClient {
    http: reqwest::Client,
    endpoint: String,
}

impl QueryClient {
    pub fn new(cfg: &SubmitConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(cfg.user_agent.clone());

        if let Some(path) = cfg.certificate_path.as_deref() {
            let raw = std::fs::read(path)
                .with_context(|| format!("read certificate {}", path.display()))?;
            // PEM first, then DER.
            let cert = reqwest::Certificate::from_pem(&raw)
                .or_else(|_| reqwest::Certificate::from_der(&raw))
                .with_context(|| format!("parse certificate {}", path.display()))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder.build().context("build HTTP client")?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Transport for QueryClient {
    async fn post_form(&self, form: FormSubmission) -> Result<RawResponse, TransportError> {
        tracing::debug!(endpoint = %self.endpoint, parts = form.len(), "posting multipart form");
        let multipart = form.into_multipart()?;
        let resp = self
            .http
            .post(&self.endpoint)
            .multipart(multipart)
            .send()
            .await
            .map_err(TransportError::Request)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(TransportError::Body)?;
        tracing::debug!(status, bytes = body.len(), "response received");
        Ok(RawResponse { status, body })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
