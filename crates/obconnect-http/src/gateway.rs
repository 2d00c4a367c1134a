//! External API gateway
//!
//! Sends assembled requests over HTTPS, captures the bank's correlation
//! identifier and classifies failures. Retry policy is a caller concern:
//! idempotency keys are minted fresh per call, so a retry is a new request
//! as far as the bank is concerned.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use obconnect_types::{ConnectorError, ConnectorResult};

use crate::request::{SignedRequestContext, INTERACTION_ID_HEADER};

/// Gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Default per-request timeout; individual calls may override
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// User agent presented to bank APIs
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: format!("obconnect/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A deserialized bank response plus its correlation identifier
///
/// The interaction id is diagnostic only; correctness never depends on it.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub body: T,
    pub interaction_id: Option<String>,
}

/// HTTP gateway to bank external APIs
pub struct ExternalApiGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl ExternalApiGateway {
    pub fn new(config: GatewayConfig) -> ConnectorResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConnectorError::config(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Send a request and deserialize the 2xx response body
    ///
    /// `profile` and `operation` label any bank-side error with enough
    /// context to be actionable without re-deriving network state.
    pub async fn send<T: DeserializeOwned>(
        &self,
        ctx: SignedRequestContext,
        profile: &str,
        operation: &str,
    ) -> ConnectorResult<ApiResponse<T>> {
        let timeout = ctx.timeout.unwrap_or(self.config.request_timeout);
        debug!(%ctx.uri, method = %ctx.method, profile, operation, "sending bank API request");

        let mut request = self
            .client
            .request(ctx.method.clone(), &ctx.uri)
            .timeout(timeout);
        for header in &ctx.headers {
            request = request.header(header.name.as_str(), header.value.as_str());
        }
        if let Some(body) = ctx.body {
            // The body must byte-match what was signed; send it verbatim
            request = request
                .header("content-type", body.content_type.as_str())
                .body(body.content);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        let interaction_id = response
            .headers()
            .get(INTERACTION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body_text = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                profile,
                operation,
                interaction_id = interaction_id.as_deref().unwrap_or("-"),
                "bank API call failed"
            );
            return Err(classify_error_body(
                status.as_u16(),
                &body_text,
                profile,
                operation,
            ));
        }

        match serde_json::from_str::<T>(&body_text) {
            Ok(body) => Ok(ApiResponse {
                body,
                interaction_id,
            }),
            Err(e) => Err(ConnectorError::contract_violation(format!(
                "{profile} {operation}: 2xx body failed to deserialize: {e}: {}",
                truncate(&body_text)
            ))),
        }
    }
}

fn classify_transport(err: reqwest::Error) -> ConnectorError {
    if err.is_timeout() {
        ConnectorError::transport_timeout(err.to_string())
    } else {
        ConnectorError::transport(err.to_string())
    }
}

/// Classify a non-2xx response body
///
/// A parseable bank error body becomes `BankApi`; anything else becomes
/// `UnexpectedResponse`. Neither is retried.
fn classify_error_body(
    http_status: u16,
    body: &str,
    profile: &str,
    operation: &str,
) -> ConnectorError {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return ConnectorError::UnexpectedResponse {
            http_status,
            detail: truncate(body),
        };
    };

    // UK Open Banking error shape: {"Code", "Message", "Errors": [{"ErrorCode", "Message"}]}
    let first_error = value.get("Errors").and_then(|e| e.get(0));
    let code = first_error
        .and_then(|e| e.get("ErrorCode"))
        .or_else(|| value.get("Code"))
        .or_else(|| value.get("error"))
        .and_then(Value::as_str);
    let message = first_error
        .and_then(|e| e.get("Message"))
        .or_else(|| value.get("Message"))
        .or_else(|| value.get("error_description"))
        .and_then(Value::as_str);

    match (code, message) {
        (Some(code), Some(message)) => ConnectorError::BankApi {
            http_status,
            code: code.to_string(),
            message: message.to_string(),
            profile: profile.to_string(),
            operation: operation.to_string(),
        },
        _ => ConnectorError::UnexpectedResponse {
            http_status,
            detail: truncate(body),
        },
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_banking_error_body_is_classified() {
        let body = r#"{"Code":"400","Id":"e-1","Message":"Field invalid","Errors":[{"ErrorCode":"UK.OBIE.Field.Invalid","Message":"Amount malformed"}]}"#;
        let err = classify_error_body(400, body, "Barclays_Sandbox", "consent-create");
        match err {
            ConnectorError::BankApi {
                http_status,
                code,
                message,
                profile,
                operation,
            } => {
                assert_eq!(http_status, 400);
                assert_eq!(code, "UK.OBIE.Field.Invalid");
                assert_eq!(message, "Amount malformed");
                assert_eq!(profile, "Barclays_Sandbox");
                assert_eq!(operation, "consent-create");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn oauth_error_body_is_classified() {
        let body = r#"{"error":"invalid_client","error_description":"unknown client"}"#;
        let err = classify_error_body(401, body, "Hsbc_UkPersonal", "token-grant");
        assert!(matches!(err, ConnectorError::BankApi { code, .. } if code == "invalid_client"));
    }

    #[test]
    fn unparseable_error_body_is_unexpected_response() {
        let err = classify_error_body(502, "<html>Bad Gateway</html>", "p", "op");
        assert!(matches!(
            err,
            ConnectorError::UnexpectedResponse { http_status: 502, .. }
        ));
    }

    #[test]
    fn json_error_body_without_known_fields_is_unexpected_response() {
        let err = classify_error_body(400, r#"{"weird":"shape"}"#, "p", "op");
        assert!(matches!(err, ConnectorError::UnexpectedResponse { .. }));
    }

    #[test]
    fn truncate_caps_detail_length() {
        let long = "x".repeat(2000);
        let err = classify_error_body(500, &long, "p", "op");
        match err {
            ConnectorError::UnexpectedResponse { detail, .. } => {
                assert!(detail.len() < 600);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
