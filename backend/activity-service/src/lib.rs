pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod indices;
pub mod models;
pub mod query;
pub mod repository;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

pub use gateway::{OpenSearchGateway, SearchGateway};
pub use indices::{IndexCatalog, IndexCategory, IndexSpec};
pub use repository::ActivityRepository;
pub use services::orchestrator::{BatchOrchestrator, BatchOutcome};

/// Shared state handed to every HTTP worker.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn SearchGateway>,
    pub repository: ActivityRepository,
    pub orchestrator: BatchOrchestrator,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn SearchGateway>,
        clients_index: &str,
        catalog: Arc<IndexCatalog>,
        batch_timeout: Option<Duration>,
    ) -> Self {
        let repository = ActivityRepository::new(gateway.clone(), clients_index);
        let mut orchestrator = BatchOrchestrator::new(repository.clone(), catalog);
        if let Some(timeout) = batch_timeout {
            orchestrator = orchestrator.with_batch_timeout(timeout);
        }

        Self {
            gateway,
            repository,
            orchestrator,
        }
    }
}
