use std::path::PathBuf;
use std::sync::Arc;

use crate::store::{MemoryStore, ReportStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<dyn ReportStore>,
    pub users: Arc<dyn UserStore>,
    /// Staff members a new report may be assigned to.
    pub roster: Arc<Vec<String>>,
    pub upload_dir: PathBuf,
}

impl AppState {
    /// State over a single process-local store.
    pub fn in_memory(store: MemoryStore, roster: Vec<String>, upload_dir: PathBuf) -> Self {
        let store = Arc::new(store);
        Self {
            reports: store.clone(),
            users: store,
            roster: Arc::new(roster),
            upload_dir,
        }
    }
}
