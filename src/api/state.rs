use axum::extract::FromRef;
use derive_new::new;

use crate::database::Database;
use crate::session::SessionStore;
use crate::storage::Storage;

use super::render::AppEngine;

/// Everything a handler may need, cheap to clone for every request.
#[derive(Clone, new)]
pub struct AppState {
    pub database: Database,
    pub engine: AppEngine,
    pub sessions: SessionStore,
    pub storage: Storage,
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
