//! Registration records for dynamic client registration
//!
//! One registration exists per (software statement, registration group)
//! pair. The client credential is mutated only to refresh it and must always
//! correspond to the registration group implied by the bank profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::{BankProfileId, RegistrationId};

/// API scope requested during registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationScope {
    /// Account and transaction information (AISP)
    AccountAndTransaction,
    /// Payment initiation (PISP)
    PaymentInitiation,
    /// Confirmation of funds (CBPII)
    FundsConfirmation,
}

impl RegistrationScope {
    /// OAuth scope string sent to the bank
    pub fn as_scope_str(&self) -> &'static str {
        match self {
            Self::AccountAndTransaction => "accounts",
            Self::PaymentInitiation => "payments",
            Self::FundsConfirmation => "fundsconfirmations",
        }
    }
}

impl fmt::Display for RegistrationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_scope_str())
    }
}

/// Token endpoint auth methods supported by the connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEndpointAuthMethod {
    ClientSecretBasic,
    ClientSecretPost,
    PrivateKeyJwt,
    TlsClientAuth,
}

impl TokenEndpointAuthMethod {
    /// Wire value used in registration requests (RFC 7591 spelling)
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
            Self::PrivateKeyJwt => "private_key_jwt",
            Self::TlsClientAuth => "tls_client_auth",
        }
    }
}

/// A dynamic client registration held against one registration group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Locally generated id
    pub id: RegistrationId,
    /// Bank profile that triggered the registration
    pub profile_id: BankProfileId,
    /// Stable key of the registration group this registration belongs to.
    /// Registrations are never shared across groups.
    pub registration_group: String,
    /// Scope the client was registered for
    pub scope: RegistrationScope,
    /// OAuth client id issued by the bank
    pub client_id: String,
    /// Bearer access credential for external API calls
    pub access_token: String,
    /// Registration id assigned by the bank API
    pub external_api_registration_id: String,
    /// How the client authenticates at the token endpoint
    pub token_endpoint_auth_method: TokenEndpointAuthMethod,
    /// When the registration was created
    pub created_at: DateTime<Utc>,
    /// When the credential was last refreshed
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// Replace the access credential. The only legal mutation of a
    /// registration after creation.
    pub fn refresh_credential(&mut self, access_token: impl Into<String>) {
        self.access_token = access_token.into();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_replaces_credential_only() {
        let mut reg = Registration {
            id: RegistrationId::new(),
            profile_id: BankProfileId::HsbcUkPersonal,
            registration_group: "hsbc-uk-personal".into(),
            scope: RegistrationScope::PaymentInitiation,
            client_id: "client-1".into(),
            access_token: "token-1".into(),
            external_api_registration_id: "ext-reg-1".into(),
            token_endpoint_auth_method: TokenEndpointAuthMethod::TlsClientAuth,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let client_id = reg.client_id.clone();
        reg.refresh_credential("token-2");
        assert_eq!(reg.access_token, "token-2");
        assert_eq!(reg.client_id, client_id);
    }

    #[test]
    fn scope_strings_match_bank_expectations() {
        assert_eq!(RegistrationScope::PaymentInitiation.as_scope_str(), "payments");
        assert_eq!(
            RegistrationScope::AccountAndTransaction.as_scope_str(),
            "accounts"
        );
    }
}
