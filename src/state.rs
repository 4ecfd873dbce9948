use crate::config::JwtConfig;
use crate::store::UserStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state handed to every handler through `web::Data`
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub jwt: JwtConfig,
    /// Serializes every conflict-check-then-write so two submissions can't
    /// both pass the check for the same material
    pub submission_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>, jwt: JwtConfig) -> Self {
        Self {
            store,
            jwt,
            submission_lock: Arc::new(Mutex::new(())),
        }
    }
}
