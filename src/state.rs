use std::sync::Arc;

use crate::{
    auth::jwt::JwtService, config::AppConfig, repository::Repository,
    services::notifications::Notifier, storage::ObjectStorage,
};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStorage>,
    pub jwt: JwtService,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repository>,
        config: AppConfig,
        storage: Arc<dyn ObjectStorage>,
        jwt: JwtService,
        notifier: Notifier,
    ) -> Self {
        Self {
            repo,
            config: Arc::new(config),
            storage,
            jwt,
            notifier,
        }
    }

    pub fn repo(&self) -> &dyn Repository {
        self.repo.as_ref()
    }
}
