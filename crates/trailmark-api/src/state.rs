use std::sync::Arc;

use trailmark_db::Database;

use crate::storage::Storage;

pub type AppState = Arc<AppStateInner>;

/// Constructed once at startup and injected into every handler; there is no
/// module-level client state.
pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
}
