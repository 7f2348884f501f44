use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::notify::WaiterRegistry;
use crate::services::match_engine::MatchEngine;
use crate::services::session_manager::SessionManager;
use crate::store::MatchStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
    pub sessions: Arc<SessionManager>,
    pub registry: WaiterRegistry,
    pub store: Arc<dyn MatchStore>,
    pub config: Arc<Config>,
    pub maintenance: Arc<AtomicBool>,
    pub started_at: Instant,
}

impl AppState {
    pub fn in_maintenance(&self) -> bool {
        self.maintenance.load(std::sync::atomic::Ordering::Relaxed)
    }
}
