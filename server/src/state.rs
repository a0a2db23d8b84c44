use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::mpsc;
use transatel_mcp_runtime::McpServer;
use uuid::Uuid;

/// Responses queued per SSE client before `POST /messages/` starts waiting.
const SESSION_CHANNEL_CAPACITY: usize = 32;

#[derive(Clone)]
pub struct AppState {
    pub mcp: McpServer,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(mcp: McpServer) -> Self {
        Self {
            mcp,
            sessions: SessionRegistry::default(),
        }
    }
}

/// Open SSE sessions, keyed by the id handed out in the `endpoint` event.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, mpsc::Sender<Value>>>>,
}

impl SessionRegistry {
    /// Register a new session. It stays routable until the guard is dropped.
    pub fn open(&self) -> (SessionGuard, mpsc::Receiver<Value>) {
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let id = Uuid::now_v7();
        self.lock().insert(id, tx);
        let guard = SessionGuard {
            id,
            registry: self.clone(),
        };
        (guard, rx)
    }

    pub fn sender(&self, id: &Uuid) -> Option<mpsc::Sender<Value>> {
        self.lock().get(id).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<Value>>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct SessionGuard {
    id: Uuid,
    registry: SessionRegistry,
}

impl SessionGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
        tracing::info!(event = "sse_session_closed", session_id = %self.id, "SSE client disconnected");
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use transatel_mcp_runtime::OperatorArgs;

    let config = OperatorArgs {
        access_token_url: "http://127.0.0.1:9/oauth/token".to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        scope: "network:read".to_string(),
        api_url: "http://127.0.0.1:9".to_string(),
    }
    .into_config()
    .expect("config should build");
    AppState::new(McpServer::new(Arc::new(config)).expect("server should build"))
}
