//! JOSE header construction, JWS signing and detached-signature assembly

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use serde_json::{json, Map, Value};

use obconnect_types::{ConnectorError, ConnectorResult};

use crate::keystore::SigningKey;

/// Issued-at custom claim named in the `crit` list
pub const OB_IAT_CLAIM: &str = "http://openbanking.org.uk/iat";
/// Issuer custom claim named in the `crit` list
pub const OB_ISS_CLAIM: &str = "http://openbanking.org.uk/iss";
/// Trust-anchor custom claim named in the `crit` list
pub const OB_TAN_CLAIM: &str = "http://openbanking.org.uk/tan";
/// Trust-anchor value for the UK Open Banking directory
pub const TRUST_ANCHOR: &str = "openbanking.org.uk";

/// A signed payload: the full token and its detached form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    /// Full `header.payload.signature` token
    pub token: String,
    /// Detached `header..signature` value carried in the signature header
    pub detached_signature: String,
}

/// Build the JOSE header map for a signed request
///
/// `use_b64` adds the `b64` marker for profile versions still requiring
/// payload-encoding negotiation; the header was removed from the signing
/// profile otherwise.
pub fn jose_headers(key_id: &str, issuer: &str, use_b64: bool) -> Map<String, Value> {
    let crit: Vec<&str> = if use_b64 {
        vec![OB_IAT_CLAIM, OB_ISS_CLAIM, OB_TAN_CLAIM, "b64"]
    } else {
        vec![OB_IAT_CLAIM, OB_ISS_CLAIM, OB_TAN_CLAIM]
    };

    let mut headers = Map::new();
    headers.insert("alg".into(), json!("PS256"));
    headers.insert("kid".into(), json!(key_id));
    headers.insert("cty".into(), json!("application/json"));
    headers.insert("crit".into(), json!(crit));
    headers.insert(OB_IAT_CLAIM.into(), json!(chrono::Utc::now().timestamp()));
    headers.insert(OB_ISS_CLAIM.into(), json!(issuer));
    headers.insert(OB_TAN_CLAIM.into(), json!(TRUST_ANCHOR));
    if use_b64 {
        headers.insert("b64".into(), json!(false));
    }
    headers
}

/// Sign a JSON payload under the given JOSE headers
pub fn sign_detached(
    headers: &Map<String, Value>,
    payload_json: &str,
    key: &SigningKey,
) -> ConnectorResult<SignedPayload> {
    let header_json = serde_json::to_string(headers)?;
    let header_b64 = URL_SAFE_NO_PAD.encode(header_json.as_bytes());
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json.as_bytes());
    let signing_input = format!("{header_b64}.{payload_b64}");

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key_pem.as_bytes())
        .map_err(|e| ConnectorError::signing(format!("invalid signing key: {e}")))?;
    let signature = jsonwebtoken::crypto::sign(
        signing_input.as_bytes(),
        &encoding_key,
        Algorithm::PS256,
    )
    .map_err(|e| ConnectorError::signing(e.to_string()))?;

    Ok(SignedPayload {
        token: format!("{header_b64}.{payload_b64}.{signature}"),
        detached_signature: format!("{header_b64}..{signature}"),
    })
}

/// Derive the detached form of a full token: drop the payload segment
pub fn detach_signature(token: &str) -> ConnectorResult<String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ConnectorError::signing(format!(
            "token has {} segments, expected 3",
            parts.len()
        )));
    }
    Ok(format!("{}..{}", parts[0], parts[2]))
}

/// Reconstruct the full token from a detached signature and the payload it
/// was computed over
pub fn reconstruct(detached: &str, payload_json: &str) -> ConnectorResult<String> {
    let parts: Vec<&str> = detached.split('.').collect();
    if parts.len() != 3 || !parts[1].is_empty() {
        return Err(ConnectorError::signing(
            "detached signature must have the form header..signature".to_string(),
        ));
    }
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json.as_bytes());
    Ok(format!("{}.{payload_b64}.{}", parts[0], parts[2]))
}

/// Verify a detached signature against the payload and the signer's public
/// key counterpart. This is the check banks perform server-side.
pub fn verify_detached(
    detached: &str,
    payload_json: &str,
    public_key_pem: &str,
) -> ConnectorResult<bool> {
    let token = reconstruct(detached, payload_json)?;
    let parts: Vec<&str> = token.split('.').collect();
    let message = format!("{}.{}", parts[0], parts[1]);

    let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
        .map_err(|e| ConnectorError::signing(format!("invalid verification key: {e}")))?;
    jsonwebtoken::crypto::verify(parts[2], message.as_bytes(), &decoding_key, Algorithm::PS256)
        .map_err(|e| ConnectorError::signing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;

    #[test]
    fn headers_carry_mandatory_claims() {
        let headers = jose_headers("kid-1", "org-1/software-1", false);
        assert_eq!(headers["alg"], "PS256");
        assert_eq!(headers["kid"], "kid-1");
        assert_eq!(headers["cty"], "application/json");
        assert_eq!(headers[OB_ISS_CLAIM], "org-1/software-1");
        assert_eq!(headers[OB_TAN_CLAIM], TRUST_ANCHOR);
        assert!(headers[OB_IAT_CLAIM].as_i64().unwrap() > 0);
        let crit: Vec<&str> = headers["crit"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(crit, vec![OB_IAT_CLAIM, OB_ISS_CLAIM, OB_TAN_CLAIM]);
        assert!(headers.get("b64").is_none());
    }

    #[test]
    fn legacy_profiles_negotiate_b64() {
        let headers = jose_headers("kid-1", "org-1/software-1", true);
        let crit = headers["crit"].as_array().unwrap();
        assert_eq!(crit.last().unwrap(), "b64");
        assert_eq!(headers["b64"], false);
    }

    #[test]
    fn detached_form_drops_payload_segment() {
        let key = mock::test_signing_key();
        let headers = jose_headers(&key.key_id, "org/software", false);
        let signed = sign_detached(&headers, r#"{"Data":{}}"#, &key).unwrap();

        let token_parts: Vec<&str> = signed.token.split('.').collect();
        assert_eq!(token_parts.len(), 3);
        assert_eq!(
            signed.detached_signature,
            format!("{}..{}", token_parts[0], token_parts[2])
        );
        assert_eq!(detach_signature(&signed.token).unwrap(), signed.detached_signature);
    }

    #[test]
    fn detached_signature_verifies_after_reconstruction() {
        let key = mock::test_signing_key();
        let payload = r#"{"Data":{"Initiation":{"InstructedAmount":{"Amount":"10.00","Currency":"GBP"}}}}"#;
        let headers = jose_headers(&key.key_id, "org/software", false);
        let signed = sign_detached(&headers, payload, &key).unwrap();

        let verified =
            verify_detached(&signed.detached_signature, payload, mock::TEST_SEAL_PUBLIC_PEM)
                .unwrap();
        assert!(verified);
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let key = mock::test_signing_key();
        let headers = jose_headers(&key.key_id, "org/software", false);
        let signed = sign_detached(&headers, r#"{"Data":{"Amount":"10.00"}}"#, &key).unwrap();

        let verified = verify_detached(
            &signed.detached_signature,
            r#"{"Data":{"Amount":"999.00"}}"#,
            mock::TEST_SEAL_PUBLIC_PEM,
        )
        .unwrap();
        assert!(!verified);
    }

    #[test]
    fn malformed_key_is_a_signing_error() {
        let key = SigningKey::new("seal-1", "kid-1", "not-a-pem", "");
        let headers = jose_headers("kid-1", "org/software", false);
        let result = sign_detached(&headers, "{}", &key);
        assert!(matches!(
            result,
            Err(ConnectorError::SigningError { .. })
        ));
    }

    #[test]
    fn reconstruct_rejects_non_detached_input() {
        assert!(reconstruct("only-one-segment", "{}").is_err());
        assert!(reconstruct("a.b.c", "{}").is_err());
    }
}
