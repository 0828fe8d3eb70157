//! The shareable face of a live session.

use std::fmt;
use std::sync::Arc;

use keyrelay_auth::{Identity, UserId};
use keyrelay_protocol::OutboundMessage;
use keyrelay_transport::ConnectionId;
use tokio::sync::watch;

use crate::SessionError;
use crate::mailbox::Mailbox;

/// A cheap, clonable reference to an authenticated session.
///
/// This is what the [`ConnectionRegistry`](crate::ConnectionRegistry)
/// stores. It can enqueue messages and ask the session to close, but it
/// never touches the transport: only the session's own loops do.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    user_id: UserId,
    username: String,
    connection_id: ConnectionId,
    mailbox: Mailbox,
    closed: watch::Sender<bool>,
}

impl SessionHandle {
    pub(crate) fn new(
        identity: &Identity,
        connection_id: ConnectionId,
        mailbox: Mailbox,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                user_id: identity.id,
                username: identity.username.clone(),
                connection_id,
                mailbox,
                closed: watch::Sender::new(false),
            }),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.inner.user_id
    }

    pub fn username(&self) -> &str {
        &self.inner.username
    }

    /// The transport connection this session runs on.
    pub fn connection_id(&self) -> ConnectionId {
        self.inner.connection_id
    }

    /// Enqueues `content` for delivery, stamped with the current time.
    ///
    /// Never waits: a full mailbox is reported, not awaited.
    ///
    /// # Errors
    /// - [`SessionError::MailboxFull`] if the mailbox is at capacity
    /// - [`SessionError::MailboxClosed`] if the session is closing
    pub fn send(&self, content: impl Into<String>) -> Result<(), SessionError> {
        self.enqueue(OutboundMessage::new(content))
    }

    /// Enqueues an already built message.
    pub fn enqueue(&self, msg: OutboundMessage) -> Result<(), SessionError> {
        self.inner.mailbox.push(msg)
    }

    /// Asks the session to shut down. Its loops notice, tear down, and
    /// drop it from the registry. Safe to call any number of times.
    pub fn close(&self) {
        self.inner.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Resolves once [`close`](Self::close) has been called, by anyone.
    pub async fn closed(&self) {
        let mut rx = self.inner.closed.subscribe();
        // The sender lives in `inner`, so this cannot fail while `self` does.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Returns `true` if both handles refer to the same session, not
    /// merely the same user.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn mailbox(&self) -> &Mailbox {
        &self.inner.mailbox
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("user_id", &self.inner.user_id)
            .field("username", &self.inner.username)
            .field("connection_id", &self.inner.connection_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mailbox::{MailboxReceiver, mailbox};

    pub(crate) fn identity(name: &str) -> Identity {
        Identity {
            id: UserId::generate(),
            username: name.to_owned(),
            public_key: String::new(),
        }
    }

    pub(crate) fn handle_for(identity: &Identity) -> (SessionHandle, MailboxReceiver) {
        let (mailbox, rx) = mailbox(4);
        (
            SessionHandle::new(identity, ConnectionId::next(), mailbox),
            rx,
        )
    }

    #[tokio::test]
    async fn test_send_reaches_mailbox() {
        let (handle, mut rx) = handle_for(&identity("alice_w"));

        handle.send("hello").unwrap();

        assert_eq!(rx.recv().await.unwrap().content(), "hello");
    }

    #[tokio::test]
    async fn test_close_wakes_waiters() {
        let (handle, _rx) = handle_for(&identity("alice_w"));
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.closed().await })
        };

        handle.close();
        handle.close();

        waiter.await.unwrap();
        assert!(handle.is_closed());
    }

    #[test]
    fn test_same_session_distinguishes_reconnects() {
        let alice = identity("alice_w");
        let (first, _rx1) = handle_for(&alice);
        let (second, _rx2) = handle_for(&alice);

        assert!(first.same_session(&first.clone()));
        assert!(!first.same_session(&second));
        assert_eq!(first.user_id(), second.user_id());
    }
}
