//! Consent model and lifecycle state machine
//!
//! A consent is a bank-authorized grant allowing a specific action (payment
//! initiation, account access) on a customer's behalf. Its lifecycle is
//! independent of any OAuth token lifecycle:
//!
//! ```text
//! Created -> PendingAuthorization -> Authorized -> (Used | Revoked | Expired | Rejected)
//! ```
//!
//! `Revoked`, `Expired` and `Rejected` are terminal. No operation may be
//! issued through a consent in a terminal state except idempotent local
//! reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConnectorError, ConnectorResult};
use crate::identity::{BankProfileId, ConsentId, RegistrationId};

/// Lifecycle state of a consent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsentState {
    /// Local record persisted, bank not yet contacted
    Created,
    /// Bank accepted the consent request and returned its external consent id
    PendingAuthorization,
    /// External authorization completion received
    Authorized,
    /// At least one successful dependent action issued against the consent
    Used,
    /// Consent revoked
    Revoked,
    /// Consent expired
    Expired,
    /// Consent rejected by the bank or the authorizing user
    Rejected,
}

impl ConsentState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked | Self::Expired | Self::Rejected)
    }

    /// Check whether external API operations may be issued from this state
    pub fn allows_bank_operations(&self) -> bool {
        !self.is_terminal()
    }

    /// Check whether a transition to `next` is legal
    pub fn can_transition_to(&self, next: ConsentState) -> bool {
        use ConsentState::*;
        matches!(
            (self, next),
            (Created, PendingAuthorization)
                | (Created, Rejected)
                | (PendingAuthorization, Authorized)
                | (PendingAuthorization, Rejected)
                | (PendingAuthorization, Expired)
                | (Authorized, Used)
                | (Authorized, Revoked)
                | (Authorized, Expired)
                | (Used, Revoked)
                | (Used, Expired)
        )
    }
}

impl fmt::Display for ConsentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "Created",
            Self::PendingAuthorization => "PendingAuthorization",
            Self::Authorized => "Authorized",
            Self::Used => "Used",
            Self::Revoked => "Revoked",
            Self::Expired => "Expired",
            Self::Rejected => "Rejected",
        };
        write!(f, "{s}")
    }
}

/// Consent status as reported by the bank API
///
/// Wire values follow the UK Open Banking read/write spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankConsentStatus {
    AwaitingAuthorisation,
    Authorised,
    Consumed,
    Rejected,
    Revoked,
    Expired,
}

impl BankConsentStatus {
    /// Map the bank-reported status onto the local lifecycle state
    pub fn to_consent_state(self) -> ConsentState {
        match self {
            Self::AwaitingAuthorisation => ConsentState::PendingAuthorization,
            Self::Authorised => ConsentState::Authorized,
            Self::Consumed => ConsentState::Used,
            Self::Rejected => ConsentState::Rejected,
            Self::Revoked => ConsentState::Revoked,
            Self::Expired => ConsentState::Expired,
        }
    }
}

/// Payload variant of a consent
///
/// Concrete bank/product variants are data shape differences, not lifecycle
/// differences; they select the external API path and request body shape and
/// nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsentVariant {
    DomesticPayment,
    DomesticScheduledPayment,
    InternationalPayment,
}

impl ConsentVariant {
    /// Path segment of the external consent API for this variant
    pub fn api_path(&self) -> &'static str {
        match self {
            Self::DomesticPayment => "domestic-payment-consents",
            Self::DomesticScheduledPayment => "domestic-scheduled-payment-consents",
            Self::InternationalPayment => "international-payment-consents",
        }
    }
}

impl fmt::Display for ConsentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_path())
    }
}

/// A consent record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consent {
    /// Locally generated id
    pub id: ConsentId,
    /// Payload variant
    pub variant: ConsentVariant,
    /// Bank profile the consent was created against
    pub profile_id: BankProfileId,
    /// Registration used for external API calls
    pub registration_id: Option<RegistrationId>,
    /// Consent id assigned by the bank. Set exactly once at the transition
    /// out of `Created`; immutable afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_api_consent_id: Option<String>,
    /// Current lifecycle state
    pub state: ConsentState,
    /// When the local record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last updated
    pub updated_at: DateTime<Utc>,
    /// Who performed the last modification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
}

impl Consent {
    /// Create a new consent record in the `Created` state
    pub fn new(
        variant: ConsentVariant,
        profile_id: BankProfileId,
        created_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ConsentId::new(),
            variant,
            profile_id,
            registration_id: None,
            external_api_consent_id: None,
            state: ConsentState::Created,
            created_at: now,
            updated_at: now,
            last_modified_by: created_by,
        }
    }

    /// Record the bank-assigned consent id
    ///
    /// Fails if the id has already been set.
    pub fn set_external_consent_id(&mut self, id: impl Into<String>) -> ConnectorResult<()> {
        if self.external_api_consent_id.is_some() {
            return Err(ConnectorError::InvalidState {
                consent_id: self.id.to_string(),
                state: self.state,
                operation: "set-external-consent-id".into(),
            });
        }
        self.external_api_consent_id = Some(id.into());
        Ok(())
    }

    /// Apply a lifecycle transition
    ///
    /// Fails with `InvalidState` if the transition is not legal from the
    /// current state.
    pub fn transition(
        &mut self,
        next: ConsentState,
        modified_by: Option<&str>,
    ) -> ConnectorResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ConnectorError::InvalidState {
                consent_id: self.id.to_string(),
                state: self.state,
                operation: format!("transition-to-{next}"),
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        if let Some(by) = modified_by {
            self.last_modified_by = Some(by.to_string());
        }
        Ok(())
    }

    /// Apply a bank-reported status onto the local state
    ///
    /// A status matching the current state is a no-op. Returns whether the
    /// local state changed.
    pub fn apply_bank_status(
        &mut self,
        status: BankConsentStatus,
        modified_by: Option<&str>,
    ) -> ConnectorResult<bool> {
        let next = status.to_consent_state();
        if next == self.state {
            return Ok(false);
        }
        self.transition(next, modified_by)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consent() -> Consent {
        Consent::new(
            ConsentVariant::DomesticPayment,
            BankProfileId::BarclaysSandbox,
            None,
        )
    }

    #[test]
    fn new_consent_starts_created() {
        let c = consent();
        assert_eq!(c.state, ConsentState::Created);
        assert!(c.external_api_consent_id.is_none());
    }

    #[test]
    fn happy_path_transitions() {
        let mut c = consent();
        c.transition(ConsentState::PendingAuthorization, Some("api"))
            .unwrap();
        c.transition(ConsentState::Authorized, None).unwrap();
        c.transition(ConsentState::Used, None).unwrap();
        assert_eq!(c.state, ConsentState::Used);
        assert_eq!(c.last_modified_by.as_deref(), Some("api"));
    }

    #[test]
    fn created_cannot_jump_to_authorized() {
        let mut c = consent();
        let result = c.transition(ConsentState::Authorized, None);
        assert!(matches!(result, Err(ConnectorError::InvalidState { .. })));
        assert_eq!(c.state, ConsentState::Created);
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        for terminal in [
            ConsentState::Revoked,
            ConsentState::Expired,
            ConsentState::Rejected,
        ] {
            assert!(terminal.is_terminal());
            for next in [
                ConsentState::Created,
                ConsentState::PendingAuthorization,
                ConsentState::Authorized,
                ConsentState::Used,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn external_id_set_exactly_once() {
        let mut c = consent();
        c.set_external_consent_id("obpisp-123").unwrap();
        assert_eq!(c.external_api_consent_id.as_deref(), Some("obpisp-123"));
        let result = c.set_external_consent_id("obpisp-456");
        assert!(matches!(result, Err(ConnectorError::InvalidState { .. })));
        assert_eq!(c.external_api_consent_id.as_deref(), Some("obpisp-123"));
    }

    #[test]
    fn bank_status_maps_onto_local_state() {
        let mut c = consent();
        c.transition(ConsentState::PendingAuthorization, None).unwrap();

        // Same state: no-op
        let changed = c
            .apply_bank_status(BankConsentStatus::AwaitingAuthorisation, None)
            .unwrap();
        assert!(!changed);

        // Bank says authorised
        let changed = c
            .apply_bank_status(BankConsentStatus::Authorised, Some("bank-read"))
            .unwrap();
        assert!(changed);
        assert_eq!(c.state, ConsentState::Authorized);

        // Bank says consumed
        assert!(c.apply_bank_status(BankConsentStatus::Consumed, None).unwrap());
        assert_eq!(c.state, ConsentState::Used);
    }

    #[test]
    fn bank_status_cannot_resurrect_terminal_consent() {
        let mut c = consent();
        c.transition(ConsentState::Rejected, None).unwrap();
        let result = c.apply_bank_status(BankConsentStatus::Authorised, None);
        assert!(matches!(result, Err(ConnectorError::InvalidState { .. })));
        assert_eq!(c.state, ConsentState::Rejected);
    }

    #[test]
    fn variant_selects_api_path_only() {
        assert_eq!(
            ConsentVariant::DomesticPayment.api_path(),
            "domestic-payment-consents"
        );
        assert_eq!(
            ConsentVariant::DomesticScheduledPayment.api_path(),
            "domestic-scheduled-payment-consents"
        );
        assert_eq!(
            ConsentVariant::InternationalPayment.api_path(),
            "international-payment-consents"
        );
    }
}
