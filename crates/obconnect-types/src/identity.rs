//! Identity types for obconnect entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConnectorError;

/// Locally generated consent identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsentId(pub String);

impl ConsentId {
    /// Generate a new consent ID
    pub fn new() -> Self {
        Self(format!("consent_{}", uuid::Uuid::new_v4()))
    }

    /// Create from an existing string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConsentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConsentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locally generated registration identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationId(pub String);

impl RegistrationId {
    /// Generate a new registration ID
    pub fn new() -> Self {
        Self(format!("reg_{}", uuid::Uuid::new_v4()))
    }

    /// Create from an existing string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical bank profile identifier
///
/// Each value names one concrete bank environment (a bank-group variant such
/// as a sandbox, a personal-banking brand or a corporate channel). The
/// profile registry maps these onto full `BankProfile` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankProfileId {
    #[serde(rename = "Barclays_Sandbox")]
    BarclaysSandbox,
    #[serde(rename = "Barclays_Personal")]
    BarclaysPersonal,
    #[serde(rename = "Barclays_Wealth")]
    BarclaysWealth,
    #[serde(rename = "Barclays_Barclaycard")]
    BarclaysBarclaycard,
    #[serde(rename = "Barclays_Business")]
    BarclaysBusiness,
    #[serde(rename = "Barclays_Corporate")]
    BarclaysCorporate,
    #[serde(rename = "Barclays_BarclaycardCommercialPayments")]
    BarclaysBarclaycardCommercialPayments,
    #[serde(rename = "Hsbc_FirstDirect")]
    HsbcFirstDirect,
    #[serde(rename = "Hsbc_Sandbox")]
    HsbcSandbox,
    #[serde(rename = "Hsbc_UkBusiness")]
    HsbcUkBusiness,
    #[serde(rename = "Hsbc_UkKinetic")]
    HsbcUkKinetic,
    #[serde(rename = "Hsbc_UkPersonal")]
    HsbcUkPersonal,
    #[serde(rename = "Hsbc_HsbcNetUk")]
    HsbcNetUk,
    #[serde(rename = "Obie_Modelo")]
    ObieModelo,
}

impl BankProfileId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BarclaysSandbox => "Barclays_Sandbox",
            Self::BarclaysPersonal => "Barclays_Personal",
            Self::BarclaysWealth => "Barclays_Wealth",
            Self::BarclaysBarclaycard => "Barclays_Barclaycard",
            Self::BarclaysBusiness => "Barclays_Business",
            Self::BarclaysCorporate => "Barclays_Corporate",
            Self::BarclaysBarclaycardCommercialPayments => "Barclays_BarclaycardCommercialPayments",
            Self::HsbcFirstDirect => "Hsbc_FirstDirect",
            Self::HsbcSandbox => "Hsbc_Sandbox",
            Self::HsbcUkBusiness => "Hsbc_UkBusiness",
            Self::HsbcUkKinetic => "Hsbc_UkKinetic",
            Self::HsbcUkPersonal => "Hsbc_UkPersonal",
            Self::HsbcNetUk => "Hsbc_HsbcNetUk",
            Self::ObieModelo => "Obie_Modelo",
        }
    }

    /// All known profile identifiers
    pub fn all() -> &'static [BankProfileId] {
        &[
            Self::BarclaysSandbox,
            Self::BarclaysPersonal,
            Self::BarclaysWealth,
            Self::BarclaysBarclaycard,
            Self::BarclaysBusiness,
            Self::BarclaysCorporate,
            Self::BarclaysBarclaycardCommercialPayments,
            Self::HsbcFirstDirect,
            Self::HsbcSandbox,
            Self::HsbcUkBusiness,
            Self::HsbcUkKinetic,
            Self::HsbcUkPersonal,
            Self::HsbcNetUk,
            Self::ObieModelo,
        ]
    }
}

impl fmt::Display for BankProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BankProfileId {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BankProfileId::all()
            .iter()
            .find(|id| id.as_str() == s)
            .copied()
            .ok_or_else(|| ConnectorError::UnknownProfile {
                profile_id: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_ids_are_unique() {
        assert_ne!(ConsentId::new(), ConsentId::new());
    }

    #[test]
    fn profile_id_round_trips_through_str() {
        for id in BankProfileId::all() {
            assert_eq!(id.as_str().parse::<BankProfileId>().unwrap(), *id);
        }
    }

    #[test]
    fn unknown_profile_id_fails() {
        let result = "Atlantis_Sandbox".parse::<BankProfileId>();
        assert!(matches!(
            result,
            Err(ConnectorError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn profile_id_serde_uses_wire_names() {
        let json = serde_json::to_string(&BankProfileId::HsbcUkPersonal).unwrap();
        assert_eq!(json, "\"Hsbc_UkPersonal\"");
    }
}
