use crate::application::ports::ViewerSession;
use crate::domain::value_objects::ViewerId;
use std::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub viewer_id: ViewerId,
    pub access_token: Option<String>,
}

/// ログイン状態を保持するインメモリのセッション
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<SessionInfo>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(viewer_id: ViewerId, access_token: Option<String>) -> Self {
        let store = Self::new();
        store.sign_in(viewer_id, access_token);
        store
    }

    pub fn sign_in(&self, viewer_id: ViewerId, access_token: Option<String>) {
        let info = SessionInfo {
            viewer_id,
            access_token: access_token.filter(|token| !token.is_empty()),
        };
        info!(viewer_id = %info.viewer_id, "viewer signed in");
        match self.current.write() {
            Ok(mut guard) => *guard = Some(info),
            Err(poisoned) => *poisoned.into_inner() = Some(info),
        }
    }

    pub fn sign_out(&self) {
        match self.current.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        info!("viewer signed out");
    }

    fn read(&self) -> Option<SessionInfo> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn!("session lock poisoned; reading last value");
                poisoned.into_inner().clone()
            }
        }
    }
}

impl ViewerSession for SessionStore {
    fn current_viewer(&self) -> Option<ViewerId> {
        self.read().map(|info| info.viewer_id)
    }

    fn access_token(&self) -> Option<String> {
        self.read().and_then(|info| info.access_token)
    }
}
