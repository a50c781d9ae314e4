use std::sync::Arc;

use async_trait::async_trait;

use crate::application::assistant::AssistantService;
use crate::application::auth::AccessGuard;
use crate::application::content::ContentStore;
use crate::infra::db::PostgresRepositories;

/// Readiness check behind `GET /health`.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl HealthProbe for PostgresRepositories {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        self.health_check().await
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub content: Arc<ContentStore>,
    pub guard: Arc<AccessGuard>,
    pub assistant: Arc<AssistantService>,
    pub health: Arc<dyn HealthProbe>,
}
