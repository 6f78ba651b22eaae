use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::marketplace::{BackendError, MarketplaceBackend};

/// Backend-agnostic connection configuration.
///
/// `backend` must match the [`BackendFactory::backend_name`] of a registered
/// factory. `connection_string` is passed through to that factory unchanged.
///
/// | backend    | connection_string examples          |
/// |------------|-------------------------------------|
/// | `sqlite`   | `marketplace.db`, `:memory:`        |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Lowercase identifier matching a registered factory (e.g. `"sqlite"`).
    pub backend: String,
    /// Opaque value forwarded to the factory's `create` method.
    pub connection_string: String,
    /// Prefix of the hosted payment page for inspection sessions.
    pub checkout_base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
            checkout_base_url: "https://pay.example.com".to_string(),
        }
    }
}

/// One implementation per backend, registered with a [`BackendRegistry`] at
/// startup.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    /// Unique, lowercase identifier for this backend.
    fn backend_name(&self) -> &'static str;

    /// Open (or create) a connection and return a ready-to-use backend.
    async fn create(
        &self,
        config: &BackendConfig,
    ) -> Result<Box<dyn MarketplaceBackend>, BackendError>;
}

/// Registry of [`BackendFactory`] instances, keyed by backend name.
pub struct BackendRegistry {
    factories: HashMap<&'static str, Box<dyn BackendFactory>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory, replacing any with the same name.
    pub fn register(&mut self, factory: Box<dyn BackendFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Names of every registered backend, sorted alphabetically.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// # Errors
    /// * [`BackendError::Configuration`] if no factory is registered for
    ///   `config.backend`.
    /// * Any error the chosen factory itself returns.
    pub async fn create(
        &self,
        config: &BackendConfig,
    ) -> Result<Box<dyn MarketplaceBackend>, BackendError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                BackendError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(config).await
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
