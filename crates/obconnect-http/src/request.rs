//! Signed request construction

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use obconnect_crypto::{jose_headers, sign_detached, SignedPayload, SigningKey};
use obconnect_types::{ConnectorResult, SoftwareStatement};

/// Financial-institution identifier header
pub const FINANCIAL_ID_HEADER: &str = "x-fapi-financial-id";
/// Idempotency key header; fresh value per call, never reused
pub const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";
/// Detached signature header
pub const JWS_SIGNATURE_HEADER: &str = "x-jws-signature";
/// Bank-supplied correlation identifier response header
pub const INTERACTION_ID_HEADER: &str = "x-fapi-interaction-id";

/// A single outbound header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

impl HttpHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Request body plus the media type it travels under
#[derive(Debug, Clone)]
pub struct RequestBody {
    /// Exact body bytes; for signed requests these are the bytes the
    /// signature was computed over
    pub content: String,
    pub content_type: String,
}

/// An assembled outbound request. Ephemeral: constructed per call, discarded
/// after send, never persisted.
#[derive(Debug, Clone)]
pub struct SignedRequestContext {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<HttpHeader>,
    pub body: Option<RequestBody>,
    /// Caller-imposed timeout for this call
    pub timeout: Option<Duration>,
}

impl SignedRequestContext {
    /// Override the gateway's default timeout for this call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Serialize a payload to canonical JSON: null object members are omitted
pub fn to_canonical_json<T: Serialize>(payload: &T) -> ConnectorResult<String> {
    let value = serde_json::to_value(payload)?;
    Ok(strip_null_members(value).to_string())
}

fn strip_null_members(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_null_members(v)))
                .collect(),
        ),
        // Array positions are meaningful; only recurse
        Value::Array(items) => Value::Array(items.into_iter().map(strip_null_members).collect()),
        other => other,
    }
}

/// A signer bound to one signing key and one software statement
///
/// Holds only the material it needs; construct one per key and pass it by
/// reference into the request builder.
pub struct RequestSigner {
    key: SigningKey,
    organisation_id: String,
    software_id: String,
}

impl RequestSigner {
    pub fn new(key: SigningKey, statement: &SoftwareStatement) -> Self {
        Self {
            key,
            organisation_id: statement.organisation_id.clone(),
            software_id: statement.software_id.clone(),
        }
    }

    /// Issuer claim value: `<orgId>/<softwareId>`
    pub fn issuer(&self) -> String {
        format!("{}/{}", self.organisation_id, self.software_id)
    }

    /// Organisation id; doubles as the financial-institution header value
    pub fn organisation_id(&self) -> &str {
        &self.organisation_id
    }

    /// Sign a canonical JSON payload
    pub fn sign(&self, payload_json: &str, use_b64: bool) -> ConnectorResult<SignedPayload> {
        let headers = jose_headers(&self.key.key_id, &self.issuer(), use_b64);
        sign_detached(&headers, payload_json, &self.key)
    }
}

/// Assembles outbound requests in the financial-grade convention
pub struct SignedRequestBuilder<'a> {
    signer: &'a RequestSigner,
}

impl<'a> SignedRequestBuilder<'a> {
    pub fn new(signer: &'a RequestSigner) -> Self {
        Self { signer }
    }

    /// Build a signed POST
    ///
    /// `access_token` is `None` only for the dynamic-registration bootstrap
    /// call, before any credential exists. Fixed headers come first; caller
    /// extras are appended last and never override the fixed set. On a name
    /// collision both headers are sent -- duplicate behavior must match
    /// existing bank expectations exactly, so nothing is deduped.
    pub fn post<T: Serialize>(
        &self,
        uri: impl Into<String>,
        payload: &T,
        access_token: Option<&str>,
        use_b64: bool,
        extra_headers: &[HttpHeader],
    ) -> ConnectorResult<SignedRequestContext> {
        let body = to_canonical_json(payload)?;
        let signed = self.signer.sign(&body, use_b64)?;

        let mut headers = vec![HttpHeader::new(
            FINANCIAL_ID_HEADER,
            self.signer.organisation_id(),
        )];
        if let Some(token) = access_token {
            headers.push(HttpHeader::new("Authorization", format!("Bearer {token}")));
        }
        headers.push(HttpHeader::new(
            IDEMPOTENCY_KEY_HEADER,
            uuid::Uuid::new_v4().to_string(),
        ));
        headers.push(HttpHeader::new(JWS_SIGNATURE_HEADER, signed.detached_signature));
        headers.extend(extra_headers.iter().cloned());

        Ok(SignedRequestContext {
            method: Method::POST,
            uri: uri.into(),
            headers,
            body: Some(RequestBody {
                content: body,
                content_type: "application/json; charset=utf-8".into(),
            }),
            timeout: None,
        })
    }

    /// Build a GET. No body, so no idempotency key and no body signature.
    pub fn get(
        &self,
        uri: impl Into<String>,
        access_token: &str,
        extra_headers: &[HttpHeader],
    ) -> SignedRequestContext {
        let mut headers = vec![
            HttpHeader::new(FINANCIAL_ID_HEADER, self.signer.organisation_id()),
            HttpHeader::new("Authorization", format!("Bearer {access_token}")),
        ];
        headers.extend(extra_headers.iter().cloned());

        SignedRequestContext {
            method: Method::GET,
            uri: uri.into(),
            headers,
            body: None,
            timeout: None,
        }
    }

    /// Build a form-encoded POST for OAuth token endpoints
    ///
    /// Token grants are not body-signed; client authentication is HTTP basic
    /// or form parameters per the registered auth method.
    pub fn post_form(
        &self,
        uri: impl Into<String>,
        params: &[(&str, &str)],
        basic_auth: Option<(&str, &str)>,
        extra_headers: &[HttpHeader],
    ) -> SignedRequestContext {
        let content = params
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    urlencoding::encode(k),
                    urlencoding::encode(v)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        let mut headers = vec![HttpHeader::new(
            FINANCIAL_ID_HEADER,
            self.signer.organisation_id(),
        )];
        if let Some((client_id, client_secret)) = basic_auth {
            let credentials = STANDARD.encode(format!("{client_id}:{client_secret}"));
            headers.push(HttpHeader::new("Authorization", format!("Basic {credentials}")));
        }
        headers.extend(extra_headers.iter().cloned());

        SignedRequestContext {
            method: Method::POST,
            uri: uri.into(),
            headers,
            body: Some(RequestBody {
                content,
                content_type: "application/x-www-form-urlencoded".into(),
            }),
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obconnect_crypto::{mock, verify_detached};
    use serde_json::json;

    fn statement() -> SoftwareStatement {
        SoftwareStatement {
            organisation_id: "0015800001041RE".into(),
            software_id: "Fh7rnOAgdRqkyRv2".into(),
            default_seal_certificate_id: mock::TEST_SEAL_CERTIFICATE_ID.into(),
            default_transport_certificate_id: "wac-1".into(),
            default_query_redirect_url: "https://tpp.example.com/q".into(),
            default_fragment_redirect_url: "https://tpp.example.com/f".into(),
        }
    }

    fn signer() -> RequestSigner {
        RequestSigner::new(mock::test_signing_key(), &statement())
    }

    fn header_values<'a>(ctx: &'a SignedRequestContext, name: &str) -> Vec<&'a str> {
        ctx.headers
            .iter()
            .filter(|h| h.name == name)
            .map(|h| h.value.as_str())
            .collect()
    }

    #[test]
    fn canonical_json_omits_null_members() {
        let payload = json!({
            "Data": {
                "Initiation": {"Amount": "10.00", "Reference": null},
                "Empty": null
            },
            "Risk": {}
        });
        let canonical = to_canonical_json(&payload).unwrap();
        let value: Value = serde_json::from_str(&canonical).unwrap();
        assert!(value["Data"].get("Empty").is_none());
        assert!(value["Data"]["Initiation"].get("Reference").is_none());
        assert_eq!(value["Data"]["Initiation"]["Amount"], "10.00");
    }

    #[test]
    fn canonical_json_keeps_null_array_elements() {
        let payload = json!({"Items": [1, null, 3]});
        let canonical = to_canonical_json(&payload).unwrap();
        let value: Value = serde_json::from_str(&canonical).unwrap();
        assert_eq!(value["Items"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn post_carries_fixed_headers() {
        let signer = signer();
        let ctx = SignedRequestBuilder::new(&signer)
            .post(
                "https://bank.example.com/consents",
                &json!({"Data": {}}),
                Some("token-1"),
                false,
                &[],
            )
            .unwrap();

        assert_eq!(ctx.method, Method::POST);
        assert_eq!(
            header_values(&ctx, FINANCIAL_ID_HEADER),
            vec!["0015800001041RE"]
        );
        assert_eq!(header_values(&ctx, "Authorization"), vec!["Bearer token-1"]);
        assert_eq!(header_values(&ctx, IDEMPOTENCY_KEY_HEADER).len(), 1);
        assert_eq!(header_values(&ctx, JWS_SIGNATURE_HEADER).len(), 1);
        assert_eq!(
            ctx.body.as_ref().unwrap().content_type,
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn bootstrap_post_omits_bearer() {
        let signer = signer();
        let ctx = SignedRequestBuilder::new(&signer)
            .post(
                "https://bank.example.com/register",
                &json!({"client_name": "tpp"}),
                None,
                false,
                &[],
            )
            .unwrap();
        assert!(header_values(&ctx, "Authorization").is_empty());
        assert_eq!(header_values(&ctx, JWS_SIGNATURE_HEADER).len(), 1);
    }

    #[test]
    fn idempotency_keys_are_fresh_per_call() {
        let signer = signer();
        let builder = SignedRequestBuilder::new(&signer);
        let payload = json!({"Data": {}});
        let a = builder
            .post("https://bank.example.com/c", &payload, Some("t"), false, &[])
            .unwrap();
        let b = builder
            .post("https://bank.example.com/c", &payload, Some("t"), false, &[])
            .unwrap();
        assert_ne!(
            header_values(&a, IDEMPOTENCY_KEY_HEADER),
            header_values(&b, IDEMPOTENCY_KEY_HEADER)
        );
    }

    #[test]
    fn detached_signature_matches_body() {
        let signer = signer();
        let ctx = SignedRequestBuilder::new(&signer)
            .post(
                "https://bank.example.com/consents",
                &json!({"Data": {"Initiation": {"Amount": "10.00"}}}),
                Some("token-1"),
                false,
                &[],
            )
            .unwrap();

        let detached = header_values(&ctx, JWS_SIGNATURE_HEADER)[0];
        let body = &ctx.body.as_ref().unwrap().content;
        assert!(verify_detached(detached, body, mock::TEST_SEAL_PUBLIC_PEM).unwrap());
    }

    #[test]
    fn extras_append_after_fixed_and_collisions_duplicate() {
        let signer = signer();
        let extras = vec![
            HttpHeader::new("x-fapi-customer-ip-address", "203.0.113.7"),
            HttpHeader::new(FINANCIAL_ID_HEADER, "caller-supplied"),
        ];
        let ctx = SignedRequestBuilder::new(&signer)
            .post(
                "https://bank.example.com/c",
                &json!({"Data": {}}),
                Some("t"),
                false,
                &extras,
            )
            .unwrap();

        // Both values travel; the fixed one stays first
        let values = header_values(&ctx, FINANCIAL_ID_HEADER);
        assert_eq!(values, vec!["0015800001041RE", "caller-supplied"]);
        assert_eq!(
            header_values(&ctx, "x-fapi-customer-ip-address"),
            vec!["203.0.113.7"]
        );
    }

    #[test]
    fn get_has_no_idempotency_or_signature() {
        let signer = signer();
        let ctx = SignedRequestBuilder::new(&signer).get(
            "https://bank.example.com/consents/123",
            "token-1",
            &[],
        );
        assert_eq!(ctx.method, Method::GET);
        assert!(ctx.body.is_none());
        assert!(header_values(&ctx, IDEMPOTENCY_KEY_HEADER).is_empty());
        assert!(header_values(&ctx, JWS_SIGNATURE_HEADER).is_empty());
        assert_eq!(header_values(&ctx, "Authorization"), vec!["Bearer token-1"]);
    }

    #[test]
    fn form_post_encodes_params_and_basic_auth() {
        let signer = signer();
        let ctx = SignedRequestBuilder::new(&signer).post_form(
            "https://bank.example.com/token",
            &[
                ("grant_type", "client_credentials"),
                ("scope", "payments accounts"),
            ],
            Some(("client-1", "s3cret")),
            &[],
        );

        let body = ctx.body.as_ref().unwrap();
        assert_eq!(body.content_type, "application/x-www-form-urlencoded");
        assert_eq!(
            body.content,
            "grant_type=client_credentials&scope=payments%20accounts"
        );
        let auth = header_values(&ctx, "Authorization");
        assert_eq!(auth.len(), 1);
        assert!(auth[0].starts_with("Basic "));
        assert!(header_values(&ctx, JWS_SIGNATURE_HEADER).is_empty());
    }
}
