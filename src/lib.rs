pub mod api;
pub mod appresult;
pub mod db;
pub mod relay;
pub mod store;

use std::sync::Arc;

use axum::extract::FromRef;

pub use appresult::{AppError, AppResult};
use relay::Relay;
use store::MessageStore;

pub type SharedStore = Arc<dyn MessageStore>;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: SharedStore,
    pub relay: Relay,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self {
            relay: Relay::new(store.clone()),
            store,
        }
    }
}
