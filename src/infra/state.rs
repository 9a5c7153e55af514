//! Global application state.
//!
//! Handlers pull the parts they need with `State<T>`, e.g. `State<DbPool>`.

use super::{config::Config, database::DbPool};
use crate::core::item::{image_store::DiskImageStore, item_status::TransitionPolicy};
use axum::extract::FromRef;

/// Global application state.
#[derive(Clone, Debug, FromRef)]
pub struct AppState {
    db: DbPool,
    images: DiskImageStore,
    policy: TransitionPolicy,
}

impl AppState {
    /// Constructs a new [`AppState`].
    pub fn new(db: DbPool, config: &Config) -> Self {
        Self {
            db,
            images: DiskImageStore::from_config(&config.upload),
            policy: TransitionPolicy::from(config.marketplace),
        }
    }

    /// Returns the image store.
    pub fn images(&self) -> &DiskImageStore {
        &self.images
    }
}
