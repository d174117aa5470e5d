//! In-process `user_id -> active sessions` registry (`spec.md` §4.5).
//!
//! A session only ever holds its own plain `user_id` and `session_id` —
//! never a handle back into this map — so there is no cyclic ownership
//! between a connection task and the registry that outlives it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Notify, RwLock};
use uuid::Uuid;

use crate::protocol::OutboundMessage;

/// Bounded outbound queue per session (`spec.md` §4.5 backpressure).
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

struct Session {
    tx: mpsc::Sender<OutboundMessage>,
    /// Signaled when a send to this session overflows its queue; the
    /// owning connection task closes with `1011` on the next select tick.
    overflow: Arc<Notify>,
}

#[derive(Clone, Default)]
pub struct SessionMap {
    sessions: Arc<RwLock<HashMap<i64, HashMap<Uuid, Session>>>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session for `user_id`, returning its id, a sender
    /// the connection task can use to reply directly to itself (e.g. a
    /// `pong` for an inbound `ping`), the receiving half of its outbound
    /// queue, and its overflow signal.
    pub async fn register(
        &self,
        user_id: i64,
    ) -> (
        Uuid,
        mpsc::Sender<OutboundMessage>,
        mpsc::Receiver<OutboundMessage>,
        Arc<Notify>,
    ) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let overflow = Arc::new(Notify::new());
        let session_id = Uuid::new_v4();

        let mut sessions = self.sessions.write().await;
        sessions.entry(user_id).or_default().insert(
            session_id,
            Session {
                tx: tx.clone(),
                overflow: overflow.clone(),
            },
        );

        (session_id, tx, rx, overflow)
    }

    pub async fn deregister(&self, user_id: i64, session_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if let Some(user_sessions) = sessions.get_mut(&user_id) {
            user_sessions.remove(&session_id);
            if user_sessions.is_empty() {
                sessions.remove(&user_id);
            }
        }
    }

    /// Fan `message` out to every session of `user_id`, skipping `exclude`
    /// (the sender's own session, for the "other devices mirror it" rule —
    /// `spec.md` §4.5 fan-out contract). A session whose queue is full is
    /// signaled to close with `1011` and dropped from the map; it does not
    /// block the other recipients.
    pub async fn send_to_user(&self, user_id: i64, exclude: Option<Uuid>, message: &OutboundMessage) {
        let overflowed = {
            let sessions = self.sessions.read().await;
            let Some(user_sessions) = sessions.get(&user_id) else {
                return;
            };

            let mut overflowed = Vec::new();
            for (id, session) in user_sessions {
                if Some(*id) == exclude {
                    continue;
                }
                if session.tx.try_send(message.clone()).is_err() {
                    overflowed.push(*id);
                }
            }
            overflowed
        };

        for id in overflowed {
            if let Some(notify) = self.overflow_signal(user_id, id).await {
                notify.notify_one();
            }
            self.deregister(user_id, id).await;
        }
    }

    async fn overflow_signal(&self, user_id: i64, session_id: Uuid) -> Option<Arc<Notify>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&user_id)?
            .get(&session_id)
            .map(|s| s.overflow.clone())
    }
}
