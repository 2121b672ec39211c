//! Resolves a company's configured provider into a live adapter.
//!
//! This is the only place the system dispatches on a provider code. Errors
//! keep configuration problems (`NoShippingProvider`,
//! `InvalidProviderCredentials`) distinct from carrier failures so operators
//! can tell them apart.

use super::credentials::CredentialCipher;
use super::mock::MockProvider;
use super::shiprocket::ShiprocketProvider;
use super::{ProviderHealth, ShippingProvider};
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::db::DbPool;
use crate::entities::provider_credential::{self, ProviderKind};
use crate::errors::ServiceError;
use dashmap::DashMap;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// A fully resolved provider: adapter, its identity, and its breaker.
#[derive(Clone)]
pub struct ResolvedProvider {
    pub provider_id: Uuid,
    pub kind: ProviderKind,
    pub adapter: Arc<dyn ShippingProvider>,
    pub breaker: Arc<CircuitBreaker>,
}

pub struct ProviderRegistry {
    db: Arc<DbPool>,
    cipher: CredentialCipher,
    provider_timeout: Duration,
    breakers: DashMap<Uuid, Arc<CircuitBreaker>>,
    // Tests install a shared MockProvider here so they can script it.
    mock_override: RwLock<Option<Arc<MockProvider>>>,
}

impl ProviderRegistry {
    pub fn new(db: Arc<DbPool>, credential_key: &str, provider_timeout: Duration) -> Self {
        Self {
            db,
            cipher: CredentialCipher::new(credential_key),
            provider_timeout,
            breakers: DashMap::new(),
            mock_override: RwLock::new(None),
        }
    }

    pub fn cipher(&self) -> &CredentialCipher {
        &self.cipher
    }

    /// Install a shared mock adapter returned for every Mock credential row.
    pub fn install_mock(&self, mock: Arc<MockProvider>) {
        *self
            .mock_override
            .write()
            .unwrap_or_else(|p| p.into_inner()) = Some(mock);
    }

    /// Resolve the company's default enabled provider, or the explicitly
    /// named one.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        company_id: Uuid,
        provider_id: Option<Uuid>,
    ) -> Result<ResolvedProvider, ServiceError> {
        let row = match provider_id {
            Some(id) => {
                let row = provider_credential::Entity::find_by_id(id)
                    .filter(provider_credential::Column::CompanyId.eq(company_id))
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("provider credential {id} not found"))
                    })?;
                if !row.enabled {
                    return Err(ServiceError::NoShippingProvider(format!(
                        "provider {} is disabled for company {company_id}",
                        row.provider
                    )));
                }
                row
            }
            None => provider_credential::Entity::find()
                .filter(provider_credential::Column::CompanyId.eq(company_id))
                .filter(provider_credential::Column::Enabled.eq(true))
                .filter(provider_credential::Column::IsDefault.eq(true))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NoShippingProvider(format!(
                        "no enabled default provider configured for company {company_id}"
                    ))
                })?,
        };

        let credentials = self.cipher.unseal(&row.sealed_payload)?;

        let adapter: Arc<dyn ShippingProvider> = match row.provider {
            ProviderKind::Shiprocket => Arc::new(
                ShiprocketProvider::new(&credentials, self.provider_timeout)
                    .map_err(ServiceError::from)?,
            ),
            ProviderKind::Mock => {
                let installed = self
                    .mock_override
                    .read()
                    .unwrap_or_else(|p| p.into_inner())
                    .clone();
                match installed {
                    Some(mock) => mock,
                    None => Arc::new(MockProvider::new()),
                }
            }
        };

        let breaker = self
            .breakers
            .entry(row.id)
            .or_insert_with(|| Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())))
            .clone();

        Ok(ResolvedProvider {
            provider_id: row.id,
            kind: row.provider,
            adapter,
            breaker,
        })
    }

    /// Health-check a provider without touching any shipment state.
    pub async fn health(
        &self,
        company_id: Uuid,
        provider_id: Option<Uuid>,
    ) -> Result<ProviderHealth, ServiceError> {
        let resolved = self.resolve(company_id, provider_id).await?;
        Ok(resolved.adapter.health_check().await)
    }
}
