use crate::services::AuthHandle;
use crate::sync::SyncEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: SyncEngine,
    pub auth: AuthHandle,
}

impl AppState {
    pub fn new(engine: SyncEngine, auth: AuthHandle) -> Self {
        Self { engine, auth }
    }
}
