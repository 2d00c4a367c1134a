//! Software statement presented during dynamic client registration

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult};

/// Identity of the registered software client
///
/// Validated on load; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareStatement {
    /// Directory organisation id (also the financial-institution header value)
    pub organisation_id: String,
    /// Directory software id
    pub software_id: String,
    /// Default signing (seal) certificate id
    pub default_seal_certificate_id: String,
    /// Default transport certificate id
    pub default_transport_certificate_id: String,
    /// Default redirect URL for query-mode responses
    pub default_query_redirect_url: String,
    /// Default redirect URL for fragment-mode responses
    pub default_fragment_redirect_url: String,
}

impl SoftwareStatement {
    /// Validate field shape. Called once on load.
    pub fn validate(&self) -> ConnectorResult<()> {
        Self::require_non_whitespace("organisation_id", &self.organisation_id)?;
        Self::require_non_whitespace("software_id", &self.software_id)?;
        Self::require_non_whitespace(
            "default_seal_certificate_id",
            &self.default_seal_certificate_id,
        )?;
        Self::require_non_whitespace(
            "default_transport_certificate_id",
            &self.default_transport_certificate_id,
        )?;
        Self::require_https_url("default_query_redirect_url", &self.default_query_redirect_url)?;
        Self::require_https_url(
            "default_fragment_redirect_url",
            &self.default_fragment_redirect_url,
        )?;
        Ok(())
    }

    /// Issuer claim value for signed requests: `<orgId>/<softwareId>`
    pub fn issuer(&self) -> String {
        format!("{}/{}", self.organisation_id, self.software_id)
    }

    fn require_non_whitespace(field: &str, value: &str) -> ConnectorResult<()> {
        if value.trim().is_empty() {
            return Err(ConnectorError::InvalidSoftwareStatement {
                field: field.into(),
                reason: "must not be empty or whitespace".into(),
            });
        }
        Ok(())
    }

    fn require_https_url(field: &str, value: &str) -> ConnectorResult<()> {
        let rest = value.strip_prefix("https://").unwrap_or("");
        if rest.is_empty() || rest.starts_with('/') || value.contains(char::is_whitespace) {
            return Err(ConnectorError::InvalidSoftwareStatement {
                field: field.into(),
                reason: "must be an absolute https URL".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement() -> SoftwareStatement {
        SoftwareStatement {
            organisation_id: "0015800001041RE".into(),
            software_id: "Fh7rnOAgdRqkyRv2".into(),
            default_seal_certificate_id: "seal-1".into(),
            default_transport_certificate_id: "wac-1".into(),
            default_query_redirect_url: "https://tpp.example.com/auth/query".into(),
            default_fragment_redirect_url: "https://tpp.example.com/auth/fragment".into(),
        }
    }

    #[test]
    fn valid_statement_passes() {
        statement().validate().unwrap();
    }

    #[test]
    fn whitespace_org_id_rejected() {
        let mut s = statement();
        s.organisation_id = "   ".into();
        let result = s.validate();
        assert!(matches!(
            result,
            Err(ConnectorError::InvalidSoftwareStatement { field, .. }) if field == "organisation_id"
        ));
    }

    #[test]
    fn empty_certificate_id_rejected() {
        let mut s = statement();
        s.default_seal_certificate_id = String::new();
        assert!(s.validate().is_err());
    }

    #[test]
    fn non_https_redirect_rejected() {
        let mut s = statement();
        s.default_query_redirect_url = "http://tpp.example.com/auth".into();
        assert!(s.validate().is_err());

        s.default_query_redirect_url = "https://".into();
        assert!(s.validate().is_err());

        s.default_query_redirect_url = "https://tpp.example.com/a b".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn issuer_joins_org_and_software_id() {
        assert_eq!(statement().issuer(), "0015800001041RE/Fh7rnOAgdRqkyRv2");
    }
}
