//! Username → identity resolution.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::RwLock;

use crate::{DirectoryError, Identity, UserId};

/// Resolves usernames to registered identities.
///
/// The relay only reads from the directory during the handshake; `create`
/// exists for registration. A database-backed store implements this the
/// same way [`MemoryDirectory`] does.
///
/// The futures are `Send` because the handshake runs on spawned tasks.
pub trait UserDirectory: Send + Sync + 'static {
    /// Looks up the identity registered under `username`.
    ///
    /// Returns `Ok(None)` if no such user exists.
    fn lookup(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<Identity>, DirectoryError>> + Send;

    /// Registers a new identity with a freshly generated id.
    ///
    /// # Errors
    /// Returns [`DirectoryError::UsernameTaken`] if the name exists.
    fn create(
        &self,
        username: &str,
        public_key: &str,
    ) -> impl Future<Output = Result<Identity, DirectoryError>> + Send;
}

/// An in-process [`UserDirectory`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<String, Identity>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

impl UserDirectory for MemoryDirectory {
    async fn lookup(&self, username: &str) -> Result<Option<Identity>, DirectoryError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn create(
        &self,
        username: &str,
        public_key: &str,
    ) -> Result<Identity, DirectoryError> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(DirectoryError::UsernameTaken(username.to_owned()));
        }

        let identity = Identity {
            id: UserId::generate(),
            username: username.to_owned(),
            public_key: public_key.to_owned(),
        };
        users.insert(username.to_owned(), identity.clone());
        tracing::info!(user_id = %identity.id, username, "user registered");
        Ok(identity)
    }
}

impl<D: UserDirectory> UserDirectory for std::sync::Arc<D> {
    fn lookup(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<Identity>, DirectoryError>> + Send {
        (**self).lookup(username)
    }

    fn create(
        &self,
        username: &str,
        public_key: &str,
    ) -> impl Future<Output = Result<Identity, DirectoryError>> + Send {
        (**self).create(username, public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_unknown_returns_none() {
        let dir = MemoryDirectory::new();
        assert!(dir.lookup("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_then_lookup_returns_same_identity() {
        let dir = MemoryDirectory::new();

        let created = dir.create("alice_w", "KEY").await.unwrap();
        let found = dir.lookup("alice_w").await.unwrap();

        assert_eq!(found, Some(created));
        assert_eq!(dir.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_is_rejected() {
        let dir = MemoryDirectory::new();
        let first = dir.create("alice_w", "KEY1").await.unwrap();

        let err = dir.create("alice_w", "KEY2").await.unwrap_err();

        assert!(matches!(err, DirectoryError::UsernameTaken(name) if name == "alice_w"));
        // The original registration is untouched.
        let found = dir.lookup("alice_w").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.public_key, "KEY1");
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let dir = MemoryDirectory::new();
        dir.create("alice_w", "KEY").await.unwrap();
        assert!(dir.lookup("Alice_W").await.unwrap().is_none());
    }
}
