//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::email::{EmailError, EmailService};
use crate::services::{
    CatalogService, ClassService, PublishingService, RegistrationService, SyncService,
};
use crate::square::SquareClient;
use crate::webflow::WebflowClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and API clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    square: SquareClient,
    webflow: Option<WebflowClient>,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state, building API clients from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be created.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, EmailError> {
        let square = SquareClient::new(&config.square);
        let webflow = config.webflow().map(WebflowClient::new);
        let email = config.email().map(EmailService::new).transpose()?;
        Ok(Self::with_clients(config, pool, square, webflow, email))
    }

    /// Create state from already-built clients (used by tests to point the
    /// clients at local servers).
    #[must_use]
    pub fn with_clients(
        config: AdminConfig,
        pool: PgPool,
        square: SquareClient,
        webflow: Option<WebflowClient>,
        email: Option<EmailService>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                square,
                webflow,
                email,
            }),
        }
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Square API client.
    #[must_use]
    pub fn square(&self) -> &SquareClient {
        &self.inner.square
    }

    /// Webflow client, if publishing is configured.
    #[must_use]
    pub fn webflow(&self) -> Option<&WebflowClient> {
        self.inner.webflow.as_ref()
    }

    /// Email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Product service bound to this state's pool and Square client.
    #[must_use]
    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.pool().clone(), self.square().clone())
    }

    #[must_use]
    pub fn classes(&self) -> ClassService {
        ClassService::new(self.pool().clone(), self.webflow().cloned())
    }

    #[must_use]
    pub fn publishing(&self) -> PublishingService {
        PublishingService::new(self.pool().clone(), self.webflow().cloned())
    }

    #[must_use]
    pub fn registrations(&self) -> RegistrationService {
        RegistrationService::new(self.pool().clone(), self.email().cloned())
    }

    #[must_use]
    pub fn sync(&self) -> SyncService {
        SyncService::new(
            self.pool().clone(),
            self.square().clone(),
            self.config().sync_concurrency,
        )
    }
}
