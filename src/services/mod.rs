use crate::services::answer::AnswerService;
use crate::store::VectorStore;
use std::sync::Arc;

pub mod answer;

// A container for the services injected into routes
#[derive(Clone)]
pub struct AppState {
    pub answer_service: Arc<AnswerService>,
    pub store: Arc<dyn VectorStore>,
}

impl AppState {
    pub fn new(answer_service: AnswerService, store: Arc<dyn VectorStore>) -> Self {
        Self {
            answer_service: Arc::new(answer_service),
            store,
        }
    }
}
