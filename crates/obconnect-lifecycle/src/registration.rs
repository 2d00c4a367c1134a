//! Dynamic client registration management
//!
//! One registration exists per registration group. Duplicate dynamic
//! registrations against most banks are either rejected or create orphaned
//! clients, so the manager guarantees at most one in-flight registration per
//! group: concurrent callers for the same group await the winner and receive
//! the registration it produced.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use obconnect_http::{ExternalApiGateway, RequestSigner, SignedRequestBuilder};
use obconnect_profiles::{BankProfile, BankProfileRegistry, RegistrationGroup};
use obconnect_store::EntityStore;
use obconnect_types::{
    BankProfileId, ConnectorResult, Registration, RegistrationId, RegistrationScope,
    SoftwareStatement, TokenEndpointAuthMethod,
};

use crate::wire::{RegistrationRequest, RegistrationResponse, TokenResponse};

/// Manages dynamic client registrations per registration group
pub struct RegistrationManager {
    registry: Arc<BankProfileRegistry>,
    signer: Arc<RequestSigner>,
    statement: Arc<SoftwareStatement>,
    gateway: Arc<ExternalApiGateway>,
    store: Arc<dyn EntityStore<Registration>>,
    /// One lock slot per registration group; the only mutable shared
    /// resource in the connector requiring explicit mutual exclusion
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RegistrationManager {
    pub fn new(
        registry: Arc<BankProfileRegistry>,
        signer: Arc<RequestSigner>,
        statement: Arc<SoftwareStatement>,
        gateway: Arc<ExternalApiGateway>,
        store: Arc<dyn EntityStore<Registration>>,
    ) -> Self {
        Self {
            registry,
            signer,
            statement,
            gateway,
            store,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Ensure a registration exists for the profile's registration group
    ///
    /// Idempotent: an existing registration for the resolved group is
    /// returned as-is. Otherwise one registration is performed against the
    /// bank while any concurrent callers for the same group wait on it.
    pub async fn ensure_registration(
        &self,
        profile_id: BankProfileId,
        scope: RegistrationScope,
    ) -> ConnectorResult<Registration> {
        let profile = self.registry.resolve(profile_id)?;
        let group = self.registry.registration_group_for(profile, scope)?;
        let group_key = group.key();

        if let Some(existing) = self.store.load(&group_key).await? {
            return Ok(existing);
        }

        let slot = {
            let mut slots = self.slots.lock().await;
            slots
                .entry(group_key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = slot.lock().await;

        // A racing caller may have finished registering while we waited
        if let Some(existing) = self.store.load(&group_key).await? {
            debug!(group = %group_key, "registration completed by concurrent caller");
            return Ok(existing);
        }

        info!(group = %group_key, profile = %profile_id, "performing dynamic client registration");
        let registration = self
            .register(profile, profile_id, &group, scope)
            .await?;
        self.store.save(&group_key, registration.clone()).await?;
        Ok(registration)
    }

    /// Perform the registration and the initial client-credentials grant
    async fn register(
        &self,
        profile: &BankProfile,
        profile_id: BankProfileId,
        group: &RegistrationGroup,
        scope: RegistrationScope,
    ) -> ConnectorResult<Registration> {
        let builder = SignedRequestBuilder::new(&self.signer);
        let profile_label = profile_id.to_string();

        let request = RegistrationRequest {
            client_name: self.statement.software_id.clone(),
            redirect_uris: vec![
                self.statement.default_query_redirect_url.clone(),
                self.statement.default_fragment_redirect_url.clone(),
            ],
            token_endpoint_auth_method: TokenEndpointAuthMethod::TlsClientAuth
                .as_wire_str()
                .to_string(),
            grant_types: vec!["client_credentials".into(), "authorization_code".into()],
            scope: scope.as_scope_str().to_string(),
            software_id: self.statement.software_id.clone(),
        };
        let ctx = builder.post(
            profile.endpoints.registration_url.as_str(),
            &request,
            None,
            profile.legacy_b64_signing,
            &[],
        )?;
        let response: RegistrationResponse = self
            .gateway
            .send(ctx, &profile_label, "dynamic-registration")
            .await?
            .body;

        // Banks issuing a secret expect basic auth at the token endpoint;
        // the rest authenticate the TLS client
        let auth_method = if response.client_secret.is_some() {
            TokenEndpointAuthMethod::ClientSecretBasic
        } else {
            TokenEndpointAuthMethod::TlsClientAuth
        };

        let token = self
            .client_credentials_grant(profile, &profile_label, &response, scope)
            .await?;

        let now = Utc::now();
        Ok(Registration {
            id: RegistrationId::new(),
            profile_id,
            registration_group: group.key(),
            scope,
            client_id: response.client_id.clone(),
            access_token: token.access_token,
            external_api_registration_id: response.client_id,
            token_endpoint_auth_method: auth_method,
            created_at: now,
            updated_at: now,
        })
    }

    async fn client_credentials_grant(
        &self,
        profile: &BankProfile,
        profile_label: &str,
        registration: &RegistrationResponse,
        scope: RegistrationScope,
    ) -> ConnectorResult<TokenResponse> {
        let builder = SignedRequestBuilder::new(&self.signer);
        let scope_str = scope.as_scope_str();

        let ctx = match registration.client_secret.as_deref() {
            Some(secret) => builder.post_form(
                profile.endpoints.token_url.as_str(),
                &[("grant_type", "client_credentials"), ("scope", scope_str)],
                Some((registration.client_id.as_str(), secret)),
                &[],
            ),
            None => builder.post_form(
                profile.endpoints.token_url.as_str(),
                &[
                    ("grant_type", "client_credentials"),
                    ("scope", scope_str),
                    ("client_id", registration.client_id.as_str()),
                ],
                None,
                &[],
            ),
        };
        Ok(self.gateway.send(ctx, profile_label, "token-grant").await?.body)
    }

    /// Refresh the access credential of an existing registration
    pub async fn refresh_credential(
        &self,
        registration: &Registration,
    ) -> ConnectorResult<Registration> {
        let profile = self.registry.resolve(registration.profile_id)?;
        let profile_label = registration.profile_id.to_string();
        let response = RegistrationResponse {
            client_id: registration.client_id.clone(),
            client_secret: None,
            registration_access_token: None,
        };
        let token = self
            .client_credentials_grant(profile, &profile_label, &response, registration.scope)
            .await?;

        let mut refreshed = registration.clone();
        refreshed.refresh_credential(token.access_token);
        self.store
            .save(&refreshed.registration_group, refreshed.clone())
            .await?;
        Ok(refreshed)
    }
}
