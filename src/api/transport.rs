use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{AppError, AppResult};

const GMAIL_API_BASE_URL: &str = "https://gmail.googleapis.com";

/// Status and JSON payload of one provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: 200,
            data: Some(data),
        }
    }

    pub fn with_status(status: u16, data: Option<Value>) -> Self {
        Self { status, data }
    }

    /// Exactly 200 with a payload present.
    pub fn is_good(&self) -> bool {
        self.status == 200 && self.data.is_some()
    }

    pub fn into_good(self) -> AppResult<Value> {
        if self.status != 200 {
            return Err(map_api_error(self.status, self.data.as_ref()));
        }

        self.data
            .ok_or_else(|| AppError::MissingData("response carried no payload".to_string()))
    }
}

/// The wire beneath [`super::GmailClient`]. Implementations report HTTP
/// failures through `ApiResponse::status`; `Err` is reserved for transport
/// breakage.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        access_token: &str,
    ) -> AppResult<ApiResponse>;

    async fn post(&self, endpoint: &str, body: &Value, access_token: &str) -> AppResult<ApiResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            base_url: GMAIL_API_BASE_URL.to_string(),
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> AppResult<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.set_path(endpoint.trim_start_matches('/'));
        Ok(url)
    }

    async fn read_response(&self, response: reqwest::Response) -> AppResult<ApiResponse> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        let data = if body.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&body).unwrap_or(Value::String(body)))
        };

        Ok(ApiResponse { status, data })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        access_token: &str,
    ) -> AppResult<ApiResponse> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;
        self.read_response(response).await
    }

    async fn post(&self, endpoint: &str, body: &Value, access_token: &str) -> AppResult<ApiResponse> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await?;
        self.read_response(response).await
    }
}

#[derive(Debug, Deserialize)]
struct GmailApiErrorEnvelope {
    error: GmailApiError,
}

#[derive(Debug, Deserialize)]
struct GmailApiError {
    code: Option<u16>,
    status: Option<String>,
    message: Option<String>,
    errors: Option<Vec<GmailApiErrorDetail>>,
}

#[derive(Debug, Deserialize)]
struct GmailApiErrorDetail {
    reason: Option<String>,
}

fn map_api_error(status: u16, body: Option<&Value>) -> AppError {
    let message = body
        .and_then(parse_api_error_message)
        .or_else(|| match body {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "no error details in response body".to_string());

    AppError::network(status, format!("gmail api request failed: {message}"))
}

fn parse_api_error_message(body: &Value) -> Option<String> {
    let envelope = GmailApiErrorEnvelope::deserialize(body).ok()?;
    let mut parts = Vec::new();

    if let Some(message) = envelope.error.message {
        parts.push(message);
    }
    if let Some(status) = envelope.error.status {
        parts.push(format!("status={status}"));
    }
    if let Some(code) = envelope.error.code {
        parts.push(format!("code={code}"));
    }
    if let Some(reason) = envelope
        .error
        .errors
        .and_then(|errors| errors.into_iter().find_map(|detail| detail.reason))
    {
        parts.push(format!("reason={reason}"));
    }

    (!parts.is_empty()).then(|| parts.join(", "))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn good_response_needs_200_and_payload() {
        assert!(ApiResponse::ok(json!({})).is_good());
        assert!(!ApiResponse::with_status(200, None).is_good());
        assert!(!ApiResponse::with_status(204, Some(json!({}))).is_good());
    }

    #[test]
    fn empty_200_is_missing_data() {
        let error = ApiResponse::with_status(200, None).into_good().unwrap_err();
        assert!(matches!(error, AppError::MissingData(_)));
    }

    #[test]
    fn maps_not_found_with_envelope_details() {
        let error = ApiResponse::with_status(
            404,
            Some(json!({"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}})),
        )
        .into_good()
        .unwrap_err();

        match error {
            AppError::Network { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("Requested entity was not found"));
                assert!(message.contains("status=NOT_FOUND"));
            }
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[test]
    fn rejected_token_maps_to_auth_failure() {
        let error = ApiResponse::with_status(
            400,
            Some(json!({"error": {"code": 400, "message": "Request had invalid authentication credentials."}})),
        )
        .into_good()
        .unwrap_err();

        assert!(error.is_auth_failure());
    }
}
