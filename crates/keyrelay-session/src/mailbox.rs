//! A session's bounded, closeable outbound queue.

use std::sync::{Mutex, PoisonError};

use keyrelay_protocol::OutboundMessage;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::SessionError;

/// Creates a mailbox holding at most `capacity` pending messages.
pub(crate) fn mailbox(capacity: usize) -> (Mailbox, MailboxReceiver) {
    // tokio panics on a zero-capacity channel.
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        Mailbox {
            sender: Mutex::new(Some(tx)),
        },
        MailboxReceiver { receiver: rx },
    )
}

/// The producing side of a mailbox.
///
/// It holds the only `Sender`, so [`close`](Self::close) dropping it is
/// what makes the receiver observe the end of the queue once drained.
#[derive(Debug)]
pub(crate) struct Mailbox {
    sender: Mutex<Option<mpsc::Sender<OutboundMessage>>>,
}

impl Mailbox {
    /// Enqueues without waiting.
    ///
    /// # Errors
    /// - [`SessionError::MailboxFull`] if `capacity` messages are pending
    /// - [`SessionError::MailboxClosed`] after [`close`](Self::close)
    pub(crate) fn push(&self, msg: OutboundMessage) -> Result<(), SessionError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = sender.as_ref().ok_or(SessionError::MailboxClosed)?;
        tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SessionError::MailboxFull,
            TrySendError::Closed(_) => SessionError::MailboxClosed,
        })
    }

    /// Closes the mailbox. Returns `true` only for the call that closed it.
    pub(crate) fn close(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// The consuming side, owned by the outbound loop.
#[derive(Debug)]
pub(crate) struct MailboxReceiver {
    receiver: mpsc::Receiver<OutboundMessage>,
}

impl MailboxReceiver {
    /// Waits for the next message. `None` means the mailbox was closed and
    /// everything enqueued before that has been handed out.
    pub(crate) async fn recv(&mut self) -> Option<OutboundMessage> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_come_out_in_order() {
        let (mailbox, mut rx) = mailbox(8);
        for i in 0..5 {
            mailbox.push(OutboundMessage::new(format!("m{i}"))).unwrap();
        }

        for i in 0..5 {
            let msg = rx.recv().await.unwrap();
            assert_eq!(msg.content(), format!("m{i}"));
        }
    }

    #[test]
    fn test_full_mailbox_rejects_without_blocking() {
        let (mailbox, _rx) = mailbox(2);
        mailbox.push(OutboundMessage::new("a")).unwrap();
        mailbox.push(OutboundMessage::new("b")).unwrap();

        let err = mailbox.push(OutboundMessage::new("c")).unwrap_err();

        assert!(matches!(err, SessionError::MailboxFull));
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let (mailbox, mut rx) = mailbox(4);
        mailbox.push(OutboundMessage::new("last")).unwrap();

        assert!(mailbox.close());

        assert_eq!(rx.recv().await.unwrap().content(), "last");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mailbox, _rx) = mailbox(4);

        assert!(mailbox.close());
        assert!(!mailbox.close());
        assert!(mailbox.is_closed());

        let err = mailbox.push(OutboundMessage::new("late")).unwrap_err();
        assert!(matches!(err, SessionError::MailboxClosed));
    }

    #[test]
    fn test_push_after_receiver_dropped_is_closed() {
        let (mailbox, rx) = mailbox(4);
        drop(rx);

        let err = mailbox.push(OutboundMessage::new("x")).unwrap_err();
        assert!(matches!(err, SessionError::MailboxClosed));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (mailbox, _rx) = mailbox(0);
        assert!(mailbox.push(OutboundMessage::new("one")).is_ok());
    }
}
