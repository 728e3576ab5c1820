// Infrastructure layer - HTTP, filesystem and terminal
// Implements the ports defined in the application layer

use std::sync::Arc;

use crate::application::captcha::{ChallengeCoordinator, GuardedClient};
use crate::application::ports::HttpTransport;
use crate::error::ApiError;

pub mod config;
pub mod driven;    // Output adapters (back office, downloads)
pub mod driving;   // Input adapters (CLI, captcha prompt)

use config::ClientConfig;
use driven::{LoginRedirectGuard, ReqwestTransport};

/// Everything a command needs, wired once at startup
#[derive(Clone)]
pub struct AppContext {
    pub config: ClientConfig,
    pub guard: Arc<LoginRedirectGuard>,
    pub transport: Arc<dyn HttpTransport>,
    pub client: GuardedClient,
}

impl AppContext {
    pub fn build(config: ClientConfig) -> Result<Self, ApiError> {
        let guard = Arc::new(LoginRedirectGuard::new());
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(&config.api_base_url, guard.clone())?);
        let coordinator = ChallengeCoordinator::new(transport.clone(), config.captcha.clone());
        let client = GuardedClient::new(transport.clone(), coordinator);

        Ok(Self {
            config,
            guard,
            transport,
            client,
        })
    }

    pub fn coordinator(&self) -> &Arc<ChallengeCoordinator> {
        self.client.coordinator()
    }
}
