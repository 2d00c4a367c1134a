//! Consent lifecycle management
//!
//! Owns the consent state machine. Every operation takes the per-consent
//! lock before touching state, so transitions are atomic with respect to
//! concurrent readers and writers of the same consent; distinct consents
//! proceed fully in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use obconnect_http::{ExternalApiGateway, HttpHeader, RequestSigner, SignedRequestBuilder};
use obconnect_profiles::{BankProfile, BankProfileRegistry};
use obconnect_store::EntityStore;
use obconnect_types::{
    BankProfileId, ConnectorError, ConnectorResult, Consent, ConsentId, ConsentState,
    ConsentVariant, RegistrationScope,
};

use crate::registration::RegistrationManager;
use crate::wire::{ConsentResponse, FundsConfirmationResponse};

/// Request to create a consent
///
/// The bank API payload arrives pre-validated; field-level validation is an
/// upstream concern.
#[derive(Debug, Clone)]
pub struct ConsentCreateRequest {
    pub profile_id: BankProfileId,
    pub variant: ConsentVariant,
    /// Bank API request body
    pub payload: Value,
    pub created_by: Option<String>,
    /// Extra headers appended verbatim after the fixed set
    pub extra_headers: Vec<HttpHeader>,
    /// Caller-imposed timeout for the bank call
    pub timeout: Option<Duration>,
}

impl ConsentCreateRequest {
    pub fn new(profile_id: BankProfileId, variant: ConsentVariant, payload: Value) -> Self {
        Self {
            profile_id,
            variant,
            payload,
            created_by: None,
            extra_headers: Vec::new(),
            timeout: None,
        }
    }

    fn validate(&self) -> ConnectorResult<()> {
        if !self.payload.is_object() {
            return Err(ConnectorError::encoding(
                "consent payload must be a JSON object",
            ));
        }
        Ok(())
    }
}

/// Parameters for reading a consent
#[derive(Debug, Clone, Default)]
pub struct ConsentReadParams {
    /// Skip the bank GET and return the local record only
    pub exclude_external_api_operation: bool,
    pub modified_by: Option<String>,
    pub extra_headers: Vec<HttpHeader>,
    pub timeout: Option<Duration>,
}

/// Where the returned consent data came from
///
/// Callers must be able to distinguish stale local data from fresh bank
/// data; a bank GET failure never changes local state but is surfaced here
/// as a warning beside the last-known record.
#[derive(Debug, Clone)]
pub enum ReadSource {
    /// Refreshed from the bank on this call
    Bank { interaction_id: Option<String> },
    /// Local record only
    LocalOnly { warning: Option<ConnectorError> },
}

/// Result of a consent read
#[derive(Debug, Clone)]
pub struct ConsentRead {
    pub consent: Consent,
    pub source: ReadSource,
}

impl ConsentRead {
    /// Whether the record was refreshed from the bank on this call
    pub fn is_fresh(&self) -> bool {
        matches!(self.source, ReadSource::Bank { .. })
    }
}

/// Funds confirmation result
#[derive(Debug, Clone)]
pub struct FundsConfirmation {
    pub funds_available: bool,
    pub funds_available_at: Option<String>,
    pub interaction_id: Option<String>,
}

/// Outcome of the external authorization-completion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Succeeded,
    Failed,
}

/// Owns consent records and their lifecycle
pub struct ConsentLifecycleManager {
    registry: Arc<BankProfileRegistry>,
    registrations: Arc<RegistrationManager>,
    signer: Arc<RequestSigner>,
    gateway: Arc<ExternalApiGateway>,
    store: Arc<dyn EntityStore<Consent>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConsentLifecycleManager {
    pub fn new(
        registry: Arc<BankProfileRegistry>,
        registrations: Arc<RegistrationManager>,
        signer: Arc<RequestSigner>,
        gateway: Arc<ExternalApiGateway>,
        store: Arc<dyn EntityStore<Consent>>,
    ) -> Self {
        Self {
            registry,
            registrations,
            signer,
            gateway,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a consent: persist the local record, issue the signed create
    /// call, and advance to `PendingAuthorization` on success
    ///
    /// On bank rejection the consent moves to `Rejected` and the bank's
    /// error detail is surfaced. On a transport (or fatal response) failure
    /// the local record is removed again: the local state is never advanced
    /// optimistically, and no `Created` row outlives its failed attempt.
    pub async fn create(&self, request: ConsentCreateRequest) -> ConnectorResult<Consent> {
        request.validate()?;
        let profile = self.registry.resolve(request.profile_id)?;

        let mut consent = Consent::new(
            request.variant,
            request.profile_id,
            request.created_by.clone(),
        );
        let lock = self.lock_for(consent.id.as_str()).await;
        let _guard = lock.lock().await;

        self.store.save(consent.id.as_str(), consent.clone()).await?;

        match self
            .create_against_bank(&mut consent, profile, &request)
            .await
        {
            Ok(()) => {
                self.store.save(consent.id.as_str(), consent.clone()).await?;
                info!(
                    consent = %consent.id,
                    external = consent.external_api_consent_id.as_deref().unwrap_or("-"),
                    "consent awaiting authorisation"
                );
                Ok(consent)
            }
            Err(err @ ConnectorError::BankApi { .. }) => {
                consent.transition(ConsentState::Rejected, request.created_by.as_deref())?;
                self.store.save(consent.id.as_str(), consent.clone()).await?;
                warn!(consent = %consent.id, %err, "bank rejected consent request");
                Err(err)
            }
            Err(err) => {
                // Transport failures and fatal response shapes leave nothing
                // behind
                self.store.delete(consent.id.as_str()).await?;
                Err(err)
            }
        }
    }

    async fn create_against_bank(
        &self,
        consent: &mut Consent,
        profile: &BankProfile,
        request: &ConsentCreateRequest,
    ) -> ConnectorResult<()> {
        let registration = self
            .registrations
            .ensure_registration(request.profile_id, scope_for(request.variant))
            .await?;
        consent.registration_id = Some(registration.id.clone());

        let uri = format!(
            "{}/{}",
            profile.endpoints.consent_api_base,
            request.variant.api_path()
        );
        let builder = SignedRequestBuilder::new(&self.signer);
        let mut ctx = builder.post(
            uri,
            &request.payload,
            Some(registration.access_token.as_str()),
            profile.legacy_b64_signing,
            &request.extra_headers,
        )?;
        ctx.timeout = request.timeout;

        let response = self
            .gateway
            .send::<ConsentResponse>(ctx, request.profile_id.as_str(), "consent-create")
            .await?;

        consent.set_external_consent_id(response.body.data.consent_id)?;
        consent.transition(
            ConsentState::PendingAuthorization,
            request.created_by.as_deref(),
        )?;
        // Banks occasionally report a post-creation status directly
        consent.apply_bank_status(response.body.data.status, request.created_by.as_deref())?;
        Ok(())
    }

    /// Read a consent, by default re-fetching its status from the bank
    ///
    /// The bank GET is skipped for `Created` consents (no external id yet),
    /// terminal consents (local reads only) and when the caller opts out. A
    /// GET failure leaves local state untouched and is returned as a warning
    /// beside the last-known record.
    pub async fn read(
        &self,
        id: &ConsentId,
        params: ConsentReadParams,
    ) -> ConnectorResult<ConsentRead> {
        let lock = self.lock_for(id.as_str()).await;
        let _guard = lock.lock().await;

        let mut consent = self.load(id).await?;

        let skip_bank = params.exclude_external_api_operation
            || consent.external_api_consent_id.is_none()
            || !consent.state.allows_bank_operations();
        if skip_bank {
            return Ok(ConsentRead {
                consent,
                source: ReadSource::LocalOnly { warning: None },
            });
        }

        match self.read_from_bank(&consent, &params).await {
            Ok((status, interaction_id)) => {
                if consent.apply_bank_status(status, params.modified_by.as_deref())? {
                    self.store.save(consent.id.as_str(), consent.clone()).await?;
                }
                Ok(ConsentRead {
                    consent,
                    source: ReadSource::Bank { interaction_id },
                })
            }
            Err(err) => {
                warn!(consent = %consent.id, %err, "bank read failed; returning local record");
                Ok(ConsentRead {
                    consent,
                    source: ReadSource::LocalOnly { warning: Some(err) },
                })
            }
        }
    }

    async fn read_from_bank(
        &self,
        consent: &Consent,
        params: &ConsentReadParams,
    ) -> ConnectorResult<(obconnect_types::BankConsentStatus, Option<String>)> {
        let profile = self.registry.resolve(consent.profile_id)?;
        let registration = self
            .registrations
            .ensure_registration(consent.profile_id, scope_for(consent.variant))
            .await?;
        let external_id = consent.external_api_consent_id.as_deref().ok_or_else(|| {
            ConnectorError::config(format!(
                "consent {} has no external consent id to read",
                consent.id
            ))
        })?;

        let uri = format!(
            "{}/{}/{}",
            profile.endpoints.consent_api_base,
            consent.variant.api_path(),
            external_id
        );
        let builder = SignedRequestBuilder::new(&self.signer);
        let mut ctx = builder.get(uri, &registration.access_token, &params.extra_headers);
        ctx.timeout = params.timeout;

        let response = self
            .gateway
            .send::<ConsentResponse>(ctx, consent.profile_id.as_str(), "consent-read")
            .await?;
        Ok((response.body.data.status, response.interaction_id))
    }

    /// Confirm funds availability against an authorized consent
    ///
    /// Valid only from `Authorized` or `Used`; the first successful
    /// confirmation marks the consent `Used`.
    pub async fn read_funds_confirmation(
        &self,
        id: &ConsentId,
        params: ConsentReadParams,
    ) -> ConnectorResult<FundsConfirmation> {
        let lock = self.lock_for(id.as_str()).await;
        let _guard = lock.lock().await;

        let mut consent = self.load(id).await?;
        if !matches!(consent.state, ConsentState::Authorized | ConsentState::Used) {
            return Err(ConnectorError::InvalidState {
                consent_id: consent.id.to_string(),
                state: consent.state,
                operation: "funds-confirmation".into(),
            });
        }

        let profile = self.registry.resolve(consent.profile_id)?;
        let registration = self
            .registrations
            .ensure_registration(consent.profile_id, scope_for(consent.variant))
            .await?;
        let external_id = consent.external_api_consent_id.as_deref().ok_or_else(|| {
            ConnectorError::config(format!(
                "consent {} is {} without an external consent id",
                consent.id, consent.state
            ))
        })?;

        let uri = format!(
            "{}/{}/{}/funds-confirmation",
            profile.endpoints.consent_api_base,
            consent.variant.api_path(),
            external_id
        );
        let builder = SignedRequestBuilder::new(&self.signer);
        let mut ctx = builder.get(uri, &registration.access_token, &params.extra_headers);
        ctx.timeout = params.timeout;

        let response = self
            .gateway
            .send::<FundsConfirmationResponse>(
                ctx,
                consent.profile_id.as_str(),
                "funds-confirmation",
            )
            .await?;

        if consent.state == ConsentState::Authorized {
            consent.transition(ConsentState::Used, params.modified_by.as_deref())?;
            self.store.save(consent.id.as_str(), consent.clone()).await?;
        }

        let result = response.body.data.funds_available_result;
        Ok(FundsConfirmation {
            funds_available: result.funds_available,
            funds_available_at: result.funds_available_date_time,
            interaction_id: response.interaction_id,
        })
    }

    /// Apply the external authorization-completion signal
    ///
    /// Delivered by the caller's redirect/polling machinery; moves
    /// `PendingAuthorization` to `Authorized` or `Rejected`.
    pub async fn apply_authorization_outcome(
        &self,
        id: &ConsentId,
        outcome: AuthorizationOutcome,
        modified_by: Option<&str>,
    ) -> ConnectorResult<Consent> {
        let lock = self.lock_for(id.as_str()).await;
        let _guard = lock.lock().await;

        let mut consent = self.load(id).await?;
        let next = match outcome {
            AuthorizationOutcome::Succeeded => ConsentState::Authorized,
            AuthorizationOutcome::Failed => ConsentState::Rejected,
        };
        if consent.state != ConsentState::PendingAuthorization {
            return Err(ConnectorError::InvalidState {
                consent_id: consent.id.to_string(),
                state: consent.state,
                operation: "authorization-outcome".into(),
            });
        }
        consent.transition(next, modified_by)?;
        self.store.save(consent.id.as_str(), consent.clone()).await?;
        info!(consent = %consent.id, state = %consent.state, "authorization outcome applied");
        Ok(consent)
    }

    /// Delete the local record only; the bank is never called
    ///
    /// The signing profile has no reliable consent-deletion operation, so
    /// termination of the bank-side consent is the authorizing user's
    /// affair.
    pub async fn delete_local(&self, id: &ConsentId) -> ConnectorResult<()> {
        let lock = self.lock_for(id.as_str()).await;
        let _guard = lock.lock().await;

        if !self.store.delete(id.as_str()).await? {
            return Err(ConnectorError::not_found("Consent", id.as_str()));
        }
        self.locks.lock().await.remove(id.as_str());
        Ok(())
    }

    async fn load(&self, id: &ConsentId) -> ConnectorResult<Consent> {
        self.store
            .load(id.as_str())
            .await?
            .ok_or_else(|| ConnectorError::not_found("Consent", id.as_str()))
    }

    async fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Registration scope implied by a consent variant
fn scope_for(variant: ConsentVariant) -> RegistrationScope {
    match variant {
        ConsentVariant::DomesticPayment
        | ConsentVariant::DomesticScheduledPayment
        | ConsentVariant::InternationalPayment => RegistrationScope::PaymentInitiation,
    }
}
