mod client;
mod response;

pub use client::QueryClient;
pub use response::interpret;

use crate::error::TransportError;
use crate::form::FormSubmission;
use async_trait::async_trait;
use bytes::Bytes;

/// Status and full body of an answered request, before JSON parsing.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one captured form to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue exactly one request and await the whole response body.
    async fn post_form(&self, form: FormSubmission) -> Result<RawResponse, TransportError>;

    /// Where requests go, for records and logs.
    fn endpoint(&self) -> &str;
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod client_tests;
