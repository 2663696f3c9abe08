//! Per-browser gateway sessions

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::AnalysisWorkflow;
use crate::backend::AnalysisBackend;
use crate::chat::{ChatBackend, ChatSession};
use crate::types::{Notifier, Result, XyraError};
use crate::wallet::{WalletProvider, WalletSession};

/// Seconds between sweeps for expired sessions
const CLEANUP_INTERVAL_SECS: u64 = 300;

fn now_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

/// Everything one user interacts with
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    ttl_secs: u64,
    /// Unix seconds; pushed forward on every lookup
    expires_at: AtomicU64,
    pub notifier: Arc<Notifier>,
    pub workflow: AnalysisWorkflow,
    /// `None` when the gateway runs without a wallet key
    pub wallet: Option<WalletSession>,
    pub chat: ChatSession,
    pub triage: ChatSession,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        now_secs() >= self.expires_at.load(Ordering::Relaxed)
    }

    /// Extend the session by its TTL
    pub fn touch(&self) {
        self.expires_at
            .store(now_secs().saturating_add(self.ttl_secs), Ordering::Relaxed);
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at.load(Ordering::Relaxed)
    }

    pub fn wallet(&self) -> Result<&WalletSession> {
        self.wallet.as_ref().ok_or_else(|| {
            XyraError::Config("no wallet configured on this gateway (set PRIVATE_KEY)".to_string())
        })
    }
}

/// Shared collaborators every session is built from
#[derive(Clone)]
pub struct SessionFactory {
    pub backend: Arc<dyn AnalysisBackend>,
    pub wallet: Option<Arc<dyn WalletProvider>>,
    pub widget: Arc<dyn ChatBackend>,
    pub triage: Arc<dyn ChatBackend>,
}

/// Live sessions by id, expiring after a period of inactivity
pub struct SessionStore {
    factory: SessionFactory,
    sessions: DashMap<Uuid, Arc<Session>>,
    ttl: Duration,
    last_cleanup: AtomicU64,
}

impl SessionStore {
    pub fn new(factory: SessionFactory, ttl: Duration) -> Self {
        Self {
            factory,
            sessions: DashMap::new(),
            ttl,
            last_cleanup: AtomicU64::new(0),
        }
    }

    pub fn create(&self) -> Arc<Session> {
        let notifier = Arc::new(Notifier::default());
        let session = Arc::new(Session {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            ttl_secs: self.ttl.as_secs(),
            expires_at: AtomicU64::new(now_secs().saturating_add(self.ttl.as_secs())),
            workflow: AnalysisWorkflow::new(self.factory.backend.clone(), notifier.clone()),
            wallet: self.factory.wallet.clone().map(WalletSession::new),
            chat: ChatSession::widget(self.factory.widget.clone()),
            triage: ChatSession::triage(self.factory.triage.clone()),
            notifier,
        });
        self.sessions.insert(session.id, session.clone());
        info!("Session {} created ({} live)", session.id, self.sessions.len());

        self.maybe_cleanup();

        session
    }

    /// Look up a live session and extend it; expired sessions are dropped
    pub fn get(&self, id: &str) -> Result<Arc<Session>> {
        let id = Uuid::parse_str(id)
            .map_err(|_| XyraError::NotFound(format!("session {}", id)))?;
        let session = self
            .sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| XyraError::NotFound(format!("session {}", id)))?;

        if session.is_expired() {
            self.remove(&id);
            return Err(XyraError::NotFound(format!("session {} (expired)", id)));
        }
        session.touch();
        Ok(session)
    }

    pub fn remove(&self, id: &Uuid) {
        if self.sessions.remove(id).is_some() {
            debug!("Removed session {}", id);
        }
    }

    fn maybe_cleanup(&self) {
        let now = now_secs();
        let last = self.last_cleanup.load(Ordering::Relaxed);
        if now.saturating_sub(last) < CLEANUP_INTERVAL_SECS {
            return;
        }

        if self
            .last_cleanup
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            self.cleanup();
        }
    }

    /// Drop every expired session
    pub fn cleanup(&self) {
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| *entry.key())
            .collect();

        let count = expired.len();
        for id in expired {
            self.remove(&id);
        }

        if count > 0 {
            info!("Cleaned up {} expired sessions", count);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
