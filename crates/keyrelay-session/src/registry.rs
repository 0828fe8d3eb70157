//! The connection registry: who is signed in right now.
//!
//! One instance lives for the whole process and is shared by every
//! session. It only tracks sessions; it never owns their lifetime. All
//! access goes through its methods, behind a single reader/writer lock:
//! lookups run concurrently, changes are exclusive.

use std::collections::HashMap;

use keyrelay_auth::UserId;
use tokio::sync::RwLock;

use crate::SessionHandle;

/// Live authenticated sessions keyed by user id. At most one entry per user.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<UserId, SessionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `handle` under its user id, overwriting any existing entry.
    ///
    /// Returns the displaced handle, if there was one, so the caller can
    /// close the older session.
    pub async fn add(&self, handle: SessionHandle) -> Option<SessionHandle> {
        let user_id = handle.user_id();
        let previous = self.sessions.write().await.insert(user_id, handle);
        tracing::debug!(%user_id, replaced = previous.is_some(), "session registered");
        previous
    }

    /// Removes whatever entry `id` has. Absent ids are not an error.
    pub async fn remove(&self, id: &UserId) -> Option<SessionHandle> {
        self.sessions.write().await.remove(id)
    }

    /// Removes the entry for `handle`'s user only if it still refers to
    /// that very session.
    ///
    /// A session being torn down after a newer one replaced it must not
    /// evict its successor. Returns `true` if an entry was removed.
    pub async fn remove_session(&self, handle: &SessionHandle) -> bool {
        let mut sessions = self.sessions.write().await;
        let user_id = handle.user_id();
        match sessions.get(&user_id) {
            Some(current) if current.same_session(handle) => {
                sessions.remove(&user_id);
                tracing::debug!(%user_id, "session deregistered");
                true
            }
            _ => false,
        }
    }

    /// Returns the live session for `id`, if any.
    pub async fn lookup(&self, id: &UserId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &UserId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Returns the number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Snapshot of the currently registered user ids.
    pub async fn user_ids(&self) -> Vec<UserId> {
        self.sessions.read().await.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::handle::tests::{handle_for, identity};

    #[tokio::test]
    async fn test_add_then_lookup() {
        let registry = ConnectionRegistry::new();
        let alice = identity("alice_w");
        let (handle, _rx) = handle_for(&alice);

        assert!(registry.add(handle.clone()).await.is_none());

        let found = registry.lookup(&alice.id).await.expect("registered");
        assert!(found.same_session(&handle));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_unknown_is_none() {
        let registry = ConnectionRegistry::new();
        assert!(registry.lookup(&UserId::generate()).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_add_overwrites_and_returns_previous() {
        let registry = ConnectionRegistry::new();
        let alice = identity("alice_w");
        let (first, _rx1) = handle_for(&alice);
        let (second, _rx2) = handle_for(&alice);

        registry.add(first.clone()).await;
        let displaced = registry.add(second.clone()).await.expect("displaced");

        assert!(displaced.same_session(&first));
        assert_eq!(registry.len().await, 1);
        let current = registry.lookup(&alice.id).await.unwrap();
        assert!(current.same_session(&second));
    }

    #[tokio::test]
    async fn test_remove_absent_is_not_an_error() {
        let registry = ConnectionRegistry::new();
        assert!(registry.remove(&UserId::generate()).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_session_spares_successor() {
        let registry = ConnectionRegistry::new();
        let alice = identity("alice_w");
        let (old, _rx1) = handle_for(&alice);
        let (new, _rx2) = handle_for(&alice);
        registry.add(old.clone()).await;
        registry.add(new.clone()).await;

        // The displaced session tears down late.
        assert!(!registry.remove_session(&old).await);
        assert!(registry.contains(&alice.id).await);

        assert!(registry.remove_session(&new).await);
        assert!(!registry.contains(&alice.id).await);
    }

    #[tokio::test]
    async fn test_concurrent_adds_and_removes_stay_consistent() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();

        for i in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let user = identity(&format!("user_{i:03}"));
                let (handle, _rx) = handle_for(&user);
                registry.add(handle.clone()).await;
                assert!(registry.lookup(&user.id).await.is_some());
                if i % 2 == 0 {
                    assert!(registry.remove_session(&handle).await);
                    // Removing twice must be harmless.
                    assert!(!registry.remove_session(&handle).await);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.len().await, 16);
        assert_eq!(registry.user_ids().await.len(), 16);
    }
}
