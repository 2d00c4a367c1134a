//! Bank profile records

use serde::{Deserialize, Serialize};

use obconnect_types::BankProfileId;

use crate::groups::{BankGroup, BankVariant};

/// External API endpoints of one bank environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankEndpoints {
    /// Dynamic client registration endpoint
    pub registration_url: String,
    /// OAuth token endpoint
    pub token_url: String,
    /// Base URL of the payment-initiation consent API (variant path segments
    /// are appended to this)
    pub consent_api_base: String,
}

impl BankEndpoints {
    pub fn new(
        registration_url: impl Into<String>,
        token_url: impl Into<String>,
        consent_api_base: impl Into<String>,
    ) -> Self {
        Self {
            registration_url: registration_url.into(),
            token_url: token_url.into(),
            consent_api_base: consent_api_base.into(),
        }
    }
}

/// One bank environment: group, variant, endpoints and signing behavior
///
/// Immutable; built once at startup from the static profile table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankProfile {
    /// Logical profile identifier
    pub id: BankProfileId,
    /// Bank group
    pub bank_group: BankGroup,
    /// Group-specific variant
    pub variant: BankVariant,
    /// External API endpoints
    pub endpoints: BankEndpoints,
    /// Payload-encoding negotiation flag for profile versions that still
    /// require the `b64` JOSE header. Off for every current profile version.
    pub legacy_b64_signing: bool,
}

impl BankProfile {
    pub fn new(
        id: BankProfileId,
        variant: BankVariant,
        endpoints: BankEndpoints,
    ) -> Self {
        Self {
            id,
            bank_group: variant.bank_group(),
            variant,
            endpoints,
            legacy_b64_signing: false,
        }
    }

    /// Enable the legacy `b64` signing header for this profile
    pub fn with_legacy_b64_signing(mut self) -> Self {
        self.legacy_b64_signing = true;
        self
    }
}
