//! Connector configuration and assembly

use std::sync::Arc;

use serde::Deserialize;

use obconnect_crypto::KeyStore;
use obconnect_http::{ExternalApiGateway, GatewayConfig, RequestSigner};
use obconnect_profiles::BankProfileRegistry;
use obconnect_store::EntityStore;
use obconnect_types::{ConnectorResult, Consent, Registration, SoftwareStatement};

use crate::consent::ConsentLifecycleManager;
use crate::registration::RegistrationManager;

/// Top-level connector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// Software statement; validated during assembly
    pub software_statement: SoftwareStatement,
    /// Gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Assembled connector: registration and consent managers over shared
/// collaborators
pub struct Connector {
    pub registrations: Arc<RegistrationManager>,
    pub consents: ConsentLifecycleManager,
}

impl Connector {
    /// Assemble the connector
    ///
    /// Validates the software statement, resolves the signing key named by
    /// it and wires both managers over one gateway and one signer.
    pub fn new(
        config: ConnectorConfig,
        registry: Arc<BankProfileRegistry>,
        key_store: &KeyStore,
        consent_store: Arc<dyn EntityStore<Consent>>,
        registration_store: Arc<dyn EntityStore<Registration>>,
    ) -> ConnectorResult<Self> {
        config.software_statement.validate()?;
        let key = key_store.get(&config.software_statement.default_seal_certificate_id)?;
        let statement = Arc::new(config.software_statement);
        let signer = Arc::new(RequestSigner::new(key, &statement));
        let gateway = Arc::new(ExternalApiGateway::new(config.gateway)?);

        let registrations = Arc::new(RegistrationManager::new(
            registry.clone(),
            signer.clone(),
            statement,
            gateway.clone(),
            registration_store,
        ));
        let consents = ConsentLifecycleManager::new(
            registry,
            registrations.clone(),
            signer,
            gateway,
            consent_store,
        );

        Ok(Self {
            registrations,
            consents,
        })
    }
}
