use shared::{ReferralRegistry, SessionConfig, SessionStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use super::actor::SessionActor;
use super::command::SessionCommand;
use super::handle::SessionHandle;

struct DirectoryInner {
    sessions: RwLock<HashMap<i64, SessionHandle>>,
    store: Arc<dyn SessionStore>,
    registry: Arc<dyn ReferralRegistry>,
    config: Arc<SessionConfig>,
    generations: AtomicU64,
}

/// Resolves a user id to its session actor, spawning one on first use.
/// There is exactly one actor per user id. Idle actors retire themselves
/// and a later request spawns a fresh one that reloads from the store.
#[derive(Clone)]
pub struct SessionDirectory {
    inner: Arc<DirectoryInner>,
}

/// Non-owning reference held by actors, so actors do not keep the
/// directory (and through it, themselves) alive.
#[derive(Clone)]
pub(crate) struct WeakSessionDirectory {
    inner: Weak<DirectoryInner>,
}

impl WeakSessionDirectory {
    pub(crate) fn upgrade(&self) -> Option<SessionDirectory> {
        self.inner.upgrade().map(|inner| SessionDirectory { inner })
    }
}

impl SessionDirectory {
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: Arc<dyn ReferralRegistry>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                sessions: RwLock::new(HashMap::new()),
                store,
                registry,
                config: Arc::new(config),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub async fn session(&self, user_id: i64) -> SessionHandle {
        if let Some(handle) = self.inner.sessions.read().await.get(&user_id) {
            return handle.clone();
        }
        let mut sessions = self.inner.sessions.write().await;
        sessions
            .entry(user_id)
            .or_insert_with(|| self.spawn(user_id))
            .clone()
    }

    #[cfg(test)]
    pub async fn active_sessions(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Queue a credit on the referrer's actor without waiting for it.
    pub(crate) async fn credit_referral(&self, referrer: i64, referee: i64) {
        let handle = self.session(referrer).await;
        if let Err(e) = handle.credit_referral(referee).await {
            warn!("Referral credit for user {} from user {} lost: {}", referrer, referee, e);
        }
    }

    /// Drop the directory entry of an idle actor.
    ///
    /// Runs under the write lock, so no new handle can be resolved while the
    /// inbox is checked. A command that is already queued is returned to the
    /// actor instead and nothing is removed. Otherwise the inbox is closed;
    /// anything a stale handle slipped in before the close is left for the
    /// actor to hand over.
    pub(crate) async fn retire(
        &self,
        user_id: i64,
        generation: u64,
        inbox: &mut mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Option<SessionCommand> {
        let mut sessions = self.inner.sessions.write().await;
        if let Ok(command) = inbox.try_recv() {
            return Some(command);
        }
        if sessions
            .get(&user_id)
            .is_some_and(|handle| handle.generation() == generation)
        {
            sessions.remove(&user_id);
        }
        inbox.close();
        debug!("Session actor for user {} retired after idling", user_id);
        None
    }

    fn spawn(&self, user_id: i64) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
        let peers = WeakSessionDirectory {
            inner: Arc::downgrade(&self.inner),
        };
        let actor = SessionActor::new(
            user_id,
            generation,
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.registry),
            Arc::clone(&self.inner.config),
            peers.clone(),
            rx,
        );
        tokio::spawn(actor.run());
        debug!("Spawned session actor for user {} (generation {})", user_id, generation);
        SessionHandle::new(user_id, generation, tx, peers)
    }
}
