//! HTTP plumbing shared by every pipeline stage.
//!
//! One [`ApiClient`] per converter: a single reqwest client (connection
//! pool, rustls, request timeout) plus the endpoint and credentials. Three
//! kinds of request exist, with different auth rules:
//!
//! * job API calls (`get_json`, `post_json`) — bearer-authenticated,
//!   non-2xx classified through [`crate::error`]
//! * upload form posts (`post_form`) — **no** bearer token; the form
//!   parameters returned by the import task carry the authorization
//! * result fetches (`fetch_bytes`) — pre-signed URLs, no auth
//!
//! Classification happens here so the pipeline stages never look at raw
//! status codes.

use serde::de::DeserializeOwned;

use crate::config::ConverterConfig;
use crate::error::{classify_response, map_transport_error, ConvertError};

static USER_AGENT: &str = concat!("paperpress/", env!("CARGO_PKG_VERSION"));

pub(crate) struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    pub(crate) fn new(config: &ConverterConfig) -> Result<Self, ConvertError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ConvertError::InvalidConfig(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            http,
            base_url: config.endpoint.base_url().to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// GET an API path, returning status and body without classification.
    /// The probe uses this to apply its own all-or-nothing rule.
    pub(crate) async fn get_raw(
        &self,
        path: &str,
    ) -> Result<(reqwest::StatusCode, String), ConvertError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        Ok((status, body))
    }

    /// GET an API path and decode the 2xx body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ConvertError> {
        let (status, body) = self.get_raw(path).await?;
        if !status.is_success() {
            return Err(classify_response(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| {
            ConvertError::Protocol(format!("undecodable response from GET {path}: {e}"))
        })
    }

    /// POST a JSON body to an API path. Returns the raw 2xx payload so the
    /// caller can distinguish "not the shape I wanted" from "error payload
    /// with a 2xx status" — job creation treats those differently.
    pub(crate) async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ConvertError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(classify_response(status, &text));
        }
        serde_json::from_str(&text).map_err(|e| {
            ConvertError::Protocol(format!("undecodable response from POST {path}: {e}"))
        })
    }

    /// Multipart POST to an absolute upload URL. Deliberately unauthenticated.
    pub(crate) async fn post_form(
        &self,
        url: &str,
        form: reqwest::multipart::Form,
    ) -> Result<(), ConvertError> {
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_response(status, &body));
        }
        Ok(())
    }

    /// Plain GET of a pre-signed URL, buffering the whole body in memory.
    pub(crate) async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ConvertError> {
        let response = self.http.get(url).send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_response(status, &body));
        }
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        Ok(bytes.to_vec())
    }
}
