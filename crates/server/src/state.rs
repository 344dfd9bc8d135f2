use std::sync::Arc;

use laura_config::Settings;

use crate::calls::OutboundCallService;
use crate::session::SessionManager;
use crate::ServerError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<SessionManager>,
    pub outbound: Arc<OutboundCallService>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, ServerError> {
        let settings = Arc::new(settings);
        let outbound = Arc::new(OutboundCallService::new(settings.media.clone())?);
        let sessions = Arc::new(SessionManager::new(settings.clone()));

        Ok(Self {
            settings,
            sessions,
            outbound,
        })
    }
}
