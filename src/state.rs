//! Shared application state.

use crate::executor::Executor;
use std::sync::Arc;

/// State handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<Executor>,
}

impl AppState {
    pub fn new(executor: Executor) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }
}
