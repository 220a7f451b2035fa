use crate::{NotificationMessage, Notifier};
use std::sync::Arc;

/// Fire-and-forget front for a [`Notifier`].
///
/// `dispatch` returns immediately; the send runs on a detached task and its outcome is never
/// reported back.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn kind(&self) -> &'static str {
        self.notifier.kind()
    }

    pub fn dispatch(&self, message: NotificationMessage) {
        let notifier = self.notifier.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    notifier.notify(message).await;
                });
            }
            Err(_) => {
                tracing::error!(
                    recipient = %message.recipient,
                    "no async runtime available; notification dropped"
                );
            }
        }
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct ChannelNotifier(mpsc::UnboundedSender<NotificationMessage>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        async fn notify(&self, message: NotificationMessage) {
            let _ = self.0.send(message);
        }

        fn kind(&self) -> &'static str {
            "channel"
        }
    }

    /// Never completes; a dispatcher that awaited it would hang the test.
    struct StuckNotifier;

    #[async_trait]
    impl Notifier for StuckNotifier {
        async fn notify(&self, _message: NotificationMessage) {
            std::future::pending::<()>().await;
        }

        fn kind(&self) -> &'static str {
            "stuck"
        }
    }

    fn message() -> NotificationMessage {
        NotificationMessage {
            recipient: "a@example.com".into(),
            recipient_name: Some("A".into()),
            subject: Some("Hi".into()),
            body: "body".into(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_on_background_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = NotificationDispatcher::new(Arc::new(ChannelNotifier(tx)));

        dispatcher.dispatch(message());

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("notification not delivered")
            .expect("channel closed");
        assert_eq!(received, message());
    }

    #[tokio::test]
    async fn test_dispatch_does_not_wait_for_delivery() {
        let dispatcher = NotificationDispatcher::new(Arc::new(StuckNotifier));
        tokio::time::timeout(Duration::from_millis(100), async {
            dispatcher.dispatch(message());
        })
        .await
        .expect("dispatch blocked on the notifier");
    }

    #[test]
    fn test_dispatch_without_runtime_does_not_panic() {
        let dispatcher = NotificationDispatcher::new(Arc::new(StuckNotifier));
        dispatcher.dispatch(message());
    }
}
