//! Bank profile registry
//!
//! The registry is built once at initialization and never mutated after:
//! concurrent-safe by construction rather than by synchronization primitive.

use std::collections::HashMap;

use obconnect_types::{BankProfileId, ConnectorError, ConnectorResult, RegistrationScope};

use crate::groups::{
    BankGroup, BankVariant, BarclaysBank, BarclaysResolver, HsbcBank, HsbcResolver, ObieBank,
    ObieResolver, RegistrationGroup, RegistrationGroupResolver,
};
use crate::profile::{BankEndpoints, BankProfile};

/// Immutable profile lookup plus per-bank-group registration group resolvers
pub struct BankProfileRegistry {
    profiles: HashMap<BankProfileId, BankProfile>,
    resolvers: HashMap<BankGroup, Box<dyn RegistrationGroupResolver>>,
}

impl BankProfileRegistry {
    /// Build a registry over the given profiles with the standard per-group
    /// resolvers
    pub fn new(profiles: Vec<BankProfile>) -> Self {
        let mut resolvers: HashMap<BankGroup, Box<dyn RegistrationGroupResolver>> = HashMap::new();
        resolvers.insert(BankGroup::Barclays, Box::new(BarclaysResolver));
        resolvers.insert(BankGroup::Hsbc, Box::new(HsbcResolver));
        resolvers.insert(BankGroup::Obie, Box::new(ObieResolver));

        Self {
            profiles: profiles.into_iter().map(|p| (p.id, p)).collect(),
            resolvers,
        }
    }

    /// Build a registry with the built-in profile table
    pub fn with_default_profiles() -> Self {
        Self::new(default_profiles())
    }

    /// Resolve a profile id to its profile record
    pub fn resolve(&self, profile_id: BankProfileId) -> ConnectorResult<&BankProfile> {
        self.profiles
            .get(&profile_id)
            .ok_or_else(|| ConnectorError::UnknownProfile {
                profile_id: profile_id.to_string(),
            })
    }

    /// Resolve the registration group for a profile and requested scope
    ///
    /// Pure: the same (bank group, variant, scope) always yields the same
    /// group.
    pub fn registration_group_for(
        &self,
        profile: &BankProfile,
        scope: RegistrationScope,
    ) -> ConnectorResult<RegistrationGroup> {
        let resolver = self.resolvers.get(&profile.bank_group).ok_or_else(|| {
            ConnectorError::config(format!(
                "no registration group resolver for bank group {:?}",
                profile.bank_group
            ))
        })?;
        resolver.registration_group(profile.variant, scope)
    }

    /// All registered profiles
    pub fn profiles(&self) -> impl Iterator<Item = &BankProfile> {
        self.profiles.values()
    }
}

fn barclays(id: BankProfileId, bank: BarclaysBank) -> BankProfile {
    let endpoints = if bank == BarclaysBank::Sandbox {
        BankEndpoints::new(
            "https://token.sandbox.barclays.com/register",
            "https://token.sandbox.barclays.com/token",
            "https://sandbox.api.barclays.com/open-banking/v3.1/pisp",
        )
    } else {
        BankEndpoints::new(
            "https://token.barclays.com/register",
            "https://token.barclays.com/token",
            "https://api.barclays.com/open-banking/v3.1/pisp",
        )
    };
    BankProfile::new(id, BankVariant::Barclays(bank), endpoints)
}

fn hsbc(id: BankProfileId, bank: HsbcBank) -> BankProfile {
    let host = match bank {
        HsbcBank::FirstDirect => "https://api.ob.firstdirect.com",
        HsbcBank::Sandbox => "https://sandbox.ob.hsbc.co.uk",
        HsbcBank::UkBusiness => "https://api.ob.business.hsbc.co.uk",
        HsbcBank::UkKinetic => "https://api.ob.hsbckinetic.co.uk",
        HsbcBank::UkPersonal => "https://api.ob.hsbc.co.uk",
        HsbcBank::HsbcNetUk => "https://api.ob.hsbcnet.com",
    };
    BankProfile::new(
        id,
        BankVariant::Hsbc(bank),
        BankEndpoints::new(
            format!("{host}/obie/open-banking/v1.1/oauth2/register"),
            format!("{host}/obie/open-banking/v1.1/oauth2/token"),
            format!("{host}/obie/open-banking/v3.1/pisp"),
        ),
    )
}

/// Built-in profile table. The OBIE model bank keeps the legacy `b64` signing
/// header: its profile version predates the header's removal.
fn default_profiles() -> Vec<BankProfile> {
    vec![
        barclays(BankProfileId::BarclaysSandbox, BarclaysBank::Sandbox),
        barclays(BankProfileId::BarclaysPersonal, BarclaysBank::Personal),
        barclays(BankProfileId::BarclaysWealth, BarclaysBank::Wealth),
        barclays(BankProfileId::BarclaysBarclaycard, BarclaysBank::Barclaycard),
        barclays(BankProfileId::BarclaysBusiness, BarclaysBank::Business),
        barclays(BankProfileId::BarclaysCorporate, BarclaysBank::Corporate),
        barclays(
            BankProfileId::BarclaysBarclaycardCommercialPayments,
            BarclaysBank::BarclaycardCommercialPayments,
        ),
        hsbc(BankProfileId::HsbcFirstDirect, HsbcBank::FirstDirect),
        hsbc(BankProfileId::HsbcSandbox, HsbcBank::Sandbox),
        hsbc(BankProfileId::HsbcUkBusiness, HsbcBank::UkBusiness),
        hsbc(BankProfileId::HsbcUkKinetic, HsbcBank::UkKinetic),
        hsbc(BankProfileId::HsbcUkPersonal, HsbcBank::UkPersonal),
        hsbc(BankProfileId::HsbcNetUk, HsbcBank::HsbcNetUk),
        BankProfile::new(
            BankProfileId::ObieModelo,
            BankVariant::Obie(ObieBank::Modelo),
            BankEndpoints::new(
                "https://ob19-rs1.o3bank.co.uk:4501/register",
                "https://ob19-auth1.o3bank.co.uk:4201/token",
                "https://ob19-rs1.o3bank.co.uk:4501/open-banking/v3.1/pisp",
            ),
        )
        .with_legacy_b64_signing(),
    ]
}
