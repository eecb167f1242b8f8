use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::OtcError;
use crate::config::{DEFAULT_REGION, Endpoints, PollConfig, ProviderConfig};

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Content type the image service requires for JSON-patch updates.
pub const IMAGE_PATCH_CONTENT_TYPE: &str = "application/openstack-images-v2.1-json-patch";

#[derive(Clone)]
pub struct OtcClient {
    client: reqwest::Client,
    endpoints: Endpoints,
    poll: PollConfig,
    region: String,
}

impl OtcClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, OtcError> {
        Self::create_client(
            &config.token,
            config.endpoints(),
            config.poll.clone(),
            config.region.clone(),
        )
    }

    /// NOTE: Primarily used for testing with mock servers.
    pub fn with_base_url(token: String, base_url: String) -> Result<Self, OtcError> {
        Self::create_client(
            &token,
            Endpoints::uniform(&base_url),
            PollConfig::default(),
            DEFAULT_REGION.to_string(),
        )
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    fn create_client(
        token: &str,
        endpoints: Endpoints,
        poll: PollConfig,
        region: String,
    ) -> Result<Self, OtcError> {
        let mut headers = HeaderMap::new();
        let mut header_value = HeaderValue::from_str(token).map_err(|_| OtcError::Auth {
            status: 0,
            message: "Invalid token format".to_string(),
        })?;
        header_value.set_sensitive(true);
        headers.insert(AUTH_TOKEN_HEADER, header_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(OtcError::Network)?;

        Ok(Self {
            client,
            endpoints,
            poll,
            region,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn poll(&self) -> &PollConfig {
        &self.poll
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, OtcError> {
        let response = self.send(self.client.get(url), Method::GET, url).await?;
        decode(response, url).await
    }

    pub async fn post<B, T>(&self, url: &str, body: &B) -> Result<T, OtcError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.client.post(url).json(body), Method::POST, url)
            .await?;
        decode(response, url).await
    }

    /// POST whose response body is irrelevant (202 Accepted, 204 No Content).
    pub async fn post_no_content<B>(&self, url: &str, body: &B) -> Result<(), OtcError>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.client.post(url).json(body), Method::POST, url)
            .await?;
        Ok(())
    }

    pub async fn put<B, T>(&self, url: &str, body: &B) -> Result<T, OtcError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.client.put(url).json(body), Method::PUT, url)
            .await?;
        decode(response, url).await
    }

    /// PATCH with a caller supplied content type, e.g. JSON-patch documents.
    pub async fn patch<B, T>(&self, url: &str, body: &B, content_type: &str) -> Result<T, OtcError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| OtcError::Decode {
            what: "request body".to_string(),
            message: e.to_string(),
        })?;
        let request = self
            .client
            .patch(url)
            .header(CONTENT_TYPE, content_type)
            .body(payload);
        let response = self.send(request, Method::PATCH, url).await?;
        decode(response, url).await
    }

    pub async fn delete(&self, url: &str) -> Result<(), OtcError> {
        self.send(self.client.delete(url), Method::DELETE, url)
            .await?;
        Ok(())
    }

    async fn send(
        &self,
        request: RequestBuilder,
        method: Method,
        url: &str,
    ) -> Result<Response, OtcError> {
        tracing::debug!(%method, url, "sending request");
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| extract_error_message(&body))
            .unwrap_or_else(|| {
                if text.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                } else {
                    text.trim().to_string()
                }
            });

        tracing::debug!(%method, url, status = status.as_u16(), %message, "request failed");

        match status.as_u16() {
            401 | 403 => Err(OtcError::Auth {
                status: status.as_u16(),
                message,
            }),
            code => Err(OtcError::Api {
                status: code,
                message,
            }),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, OtcError> {
    let text = response.text().await?;
    let body = if text.trim().is_empty() { "null" } else { &text };
    serde_json::from_str(body).map_err(|e| OtcError::Decode {
        what: format!("response from {}", url),
        message: e.to_string(),
    })
}

/// Finds the human readable message in the error envelopes used across the
/// different Open Telekom Cloud services.
pub fn extract_error_message(body: &Value) -> Option<String> {
    const NESTED: &[&str] = &[
        "NeutronError",
        "error",
        "badRequest",
        "itemNotFound",
        "conflictingRequest",
        "forbidden",
        "computeFault",
    ];
    const FLAT: &[&str] = &["error_msg", "errorMessage", "message", "faultstring"];

    for key in NESTED {
        if let Some(message) = body
            .get(*key)
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
        {
            return Some(message.to_string());
        }
    }

    for key in FLAT {
        if let Some(message) = body.get(*key).and_then(Value::as_str) {
            return Some(message.to_string());
        }
    }

    body.get("error")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

impl std::fmt::Debug for OtcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtcClient")
            .field("token", &"[REDACTED]")
            .field("region", &self.region)
            .finish()
    }
}
