pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {services::reconcile::ReconciliationEngine, std::sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
}
