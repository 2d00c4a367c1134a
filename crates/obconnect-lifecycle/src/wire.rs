//! Wire shapes of the bank external APIs

use serde::{Deserialize, Serialize};

use obconnect_types::BankConsentStatus;

/// Consent resource as returned by create and read calls
#[derive(Debug, Clone, Deserialize)]
pub struct ConsentResponse {
    #[serde(rename = "Data")]
    pub data: ConsentResponseData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsentResponseData {
    #[serde(rename = "ConsentId")]
    pub consent_id: String,
    #[serde(rename = "Status")]
    pub status: BankConsentStatus,
    #[serde(rename = "CreationDateTime")]
    pub creation_date_time: Option<String>,
    #[serde(rename = "StatusUpdateDateTime")]
    pub status_update_date_time: Option<String>,
}

/// Funds confirmation result for an authorized consent
#[derive(Debug, Clone, Deserialize)]
pub struct FundsConfirmationResponse {
    #[serde(rename = "Data")]
    pub data: FundsConfirmationData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FundsConfirmationData {
    #[serde(rename = "FundsAvailableResult")]
    pub funds_available_result: FundsAvailableResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FundsAvailableResult {
    #[serde(rename = "FundsAvailable")]
    pub funds_available: bool,
    #[serde(rename = "FundsAvailableDateTime")]
    pub funds_available_date_time: Option<String>,
}

/// Dynamic client registration request (RFC 7591 field spellings)
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest {
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub grant_types: Vec<String>,
    pub scope: String,
    pub software_id: String,
}

/// Dynamic client registration response
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationResponse {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub registration_access_token: Option<String>,
}

/// Client-credentials token grant response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
