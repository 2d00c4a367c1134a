//! Bank groups, bank-group variants and registration group resolution

use serde::{Deserialize, Serialize};
use std::fmt;

use obconnect_types::{ConnectorError, ConnectorResult, RegistrationScope};

/// Supported bank groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankGroup {
    Barclays,
    Hsbc,
    Obie,
}

/// Barclays bank variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarclaysBank {
    Sandbox,
    Personal,
    Wealth,
    Barclaycard,
    Business,
    Corporate,
    BarclaycardCommercialPayments,
}

/// Barclays registration groups: one sandbox registration, one production
/// registration shared by every live brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarclaysRegistrationGroup {
    Sandbox,
    Production,
}

/// HSBC bank variants. Each variant registers independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HsbcBank {
    FirstDirect,
    Sandbox,
    UkBusiness,
    UkKinetic,
    UkPersonal,
    HsbcNetUk,
}

/// OBIE model bank variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObieBank {
    Modelo,
}

/// Bank-group-specific variant of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankVariant {
    Barclays(BarclaysBank),
    Hsbc(HsbcBank),
    Obie(ObieBank),
}

impl BankVariant {
    /// Bank group this variant belongs to
    pub fn bank_group(&self) -> BankGroup {
        match self {
            Self::Barclays(_) => BankGroup::Barclays,
            Self::Hsbc(_) => BankGroup::Hsbc,
            Self::Obie(_) => BankGroup::Obie,
        }
    }
}

/// A registration group: the partition unit for dynamic client registrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationGroup {
    Barclays(BarclaysRegistrationGroup),
    Hsbc(HsbcBank),
    Obie(ObieBank),
}

impl RegistrationGroup {
    /// Stable key used to index persisted registrations
    pub fn key(&self) -> String {
        match self {
            Self::Barclays(BarclaysRegistrationGroup::Sandbox) => "barclays-sandbox".into(),
            Self::Barclays(BarclaysRegistrationGroup::Production) => "barclays-production".into(),
            Self::Hsbc(HsbcBank::FirstDirect) => "hsbc-first-direct".into(),
            Self::Hsbc(HsbcBank::Sandbox) => "hsbc-sandbox".into(),
            Self::Hsbc(HsbcBank::UkBusiness) => "hsbc-uk-business".into(),
            Self::Hsbc(HsbcBank::UkKinetic) => "hsbc-uk-kinetic".into(),
            Self::Hsbc(HsbcBank::UkPersonal) => "hsbc-uk-personal".into(),
            Self::Hsbc(HsbcBank::HsbcNetUk) => "hsbc-hsbcnet-uk".into(),
            Self::Obie(ObieBank::Modelo) => "obie-modelo".into(),
        }
    }
}

impl fmt::Display for RegistrationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Per-bank-group registration group resolution
///
/// One small strategy value per bank group, selected from the registry built
/// at startup. The resolution must be a pure function of (variant, requested
/// scope): re-resolving the same inputs always yields the same group.
pub trait RegistrationGroupResolver: Send + Sync {
    fn registration_group(
        &self,
        variant: BankVariant,
        scope: RegistrationScope,
    ) -> ConnectorResult<RegistrationGroup>;
}

fn variant_mismatch(group: &str, variant: BankVariant) -> ConnectorError {
    ConnectorError::config(format!(
        "variant {variant:?} does not belong to bank group {group}"
    ))
}

/// Barclays: the sandbox variant has its own registration; every live brand
/// shares one production registration.
pub struct BarclaysResolver;

impl RegistrationGroupResolver for BarclaysResolver {
    fn registration_group(
        &self,
        variant: BankVariant,
        _scope: RegistrationScope,
    ) -> ConnectorResult<RegistrationGroup> {
        let BankVariant::Barclays(bank) = variant else {
            return Err(variant_mismatch("Barclays", variant));
        };
        let group = if bank == BarclaysBank::Sandbox {
            BarclaysRegistrationGroup::Sandbox
        } else {
            BarclaysRegistrationGroup::Production
        };
        Ok(RegistrationGroup::Barclays(group))
    }
}

/// HSBC: each variant is its own registration group.
pub struct HsbcResolver;

impl RegistrationGroupResolver for HsbcResolver {
    fn registration_group(
        &self,
        variant: BankVariant,
        _scope: RegistrationScope,
    ) -> ConnectorResult<RegistrationGroup> {
        let BankVariant::Hsbc(bank) = variant else {
            return Err(variant_mismatch("Hsbc", variant));
        };
        Ok(RegistrationGroup::Hsbc(bank))
    }
}

/// OBIE model bank: single sandbox environment, single group.
pub struct ObieResolver;

impl RegistrationGroupResolver for ObieResolver {
    fn registration_group(
        &self,
        variant: BankVariant,
        _scope: RegistrationScope,
    ) -> ConnectorResult<RegistrationGroup> {
        let BankVariant::Obie(bank) = variant else {
            return Err(variant_mismatch("Obie", variant));
        };
        Ok(RegistrationGroup::Obie(bank))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barclays_sandbox_is_its_own_group() {
        let group = BarclaysResolver
            .registration_group(
                BankVariant::Barclays(BarclaysBank::Sandbox),
                RegistrationScope::PaymentInitiation,
            )
            .unwrap();
        assert_eq!(
            group,
            RegistrationGroup::Barclays(BarclaysRegistrationGroup::Sandbox)
        );
    }

    #[test]
    fn barclays_live_brands_share_production() {
        for bank in [
            BarclaysBank::Personal,
            BarclaysBank::Wealth,
            BarclaysBank::Barclaycard,
            BarclaysBank::Business,
            BarclaysBank::Corporate,
            BarclaysBank::BarclaycardCommercialPayments,
        ] {
            let group = BarclaysResolver
                .registration_group(
                    BankVariant::Barclays(bank),
                    RegistrationScope::PaymentInitiation,
                )
                .unwrap();
            assert_eq!(
                group,
                RegistrationGroup::Barclays(BarclaysRegistrationGroup::Production)
            );
        }
    }

    #[test]
    fn hsbc_group_equals_variant() {
        let group = HsbcResolver
            .registration_group(
                BankVariant::Hsbc(HsbcBank::UkPersonal),
                RegistrationScope::PaymentInitiation,
            )
            .unwrap();
        assert_eq!(group, RegistrationGroup::Hsbc(HsbcBank::UkPersonal));
        assert_eq!(group.key(), "hsbc-uk-personal");
    }

    #[test]
    fn resolver_rejects_foreign_variant() {
        let result = HsbcResolver.registration_group(
            BankVariant::Barclays(BarclaysBank::Personal),
            RegistrationScope::PaymentInitiation,
        );
        assert!(result.is_err());
    }

    #[test]
    fn resolution_is_pure() {
        for _ in 0..3 {
            let a = BarclaysResolver
                .registration_group(
                    BankVariant::Barclays(BarclaysBank::Business),
                    RegistrationScope::PaymentInitiation,
                )
                .unwrap();
            let b = BarclaysResolver
                .registration_group(
                    BankVariant::Barclays(BarclaysBank::Business),
                    RegistrationScope::PaymentInitiation,
                )
                .unwrap();
            assert_eq!(a, b);
        }
    }
}
