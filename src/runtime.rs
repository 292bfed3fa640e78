use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;

use crate::app::{Dashboard, Effect, Message};
use crate::core::api::Backend;
use crate::core::channel::{ChannelSettings, EventSink, LiveChannel};

/// Owns the dashboard and performs the effects its updates ask for.
///
/// Every message, whether a network result, a push event, a timer, or user
/// input, funnels through one queue and is applied on the task that calls
/// [`Runtime::run`]. The dashboard is never touched concurrently.
pub struct Runtime<B: Backend> {
    dashboard: Dashboard,
    backend: Arc<B>,
    channel_settings: Option<ChannelSettings>,
    channel: Option<LiveChannel>,
    snapshot_task: Option<AbortHandle>,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
    exited: bool,
}

impl<B: Backend> Runtime<B> {
    /// `channel_settings` of `None` runs without live updates.
    pub fn new(backend: B, channel_settings: Option<ChannelSettings>) -> Self {
        let (tx, rx) = unbounded_channel();
        Runtime {
            dashboard: Dashboard::new(channel_settings.is_some()),
            backend: Arc::new(backend),
            channel_settings,
            channel: None,
            snapshot_task: None,
            tx,
            rx,
            exited: false,
        }
    }

    /// Queue for feeding messages in from outside (user input).
    pub fn sender(&self) -> UnboundedSender<Message> {
        self.tx.clone()
    }

    #[cfg(test)]
    fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Start the dashboard and process messages until teardown.
    ///
    /// `shutdown` resolving triggers a teardown. `render` is called after
    /// every processed message.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>, mut render: impl FnMut(&Dashboard)) {
        self.dispatch(Message::Init).await;
        render(&self.dashboard);

        tokio::pin!(shutdown);
        let mut shutdown_fired = false;

        while !self.exited {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(msg) => self.dispatch(msg).await,
                    None => break,
                },
                _ = &mut shutdown, if !shutdown_fired => {
                    shutdown_fired = true;
                    self.dispatch(Message::Teardown).await;
                }
            }
            render(&self.dashboard);
        }

        // Teardown may not have run if the queue closed first.
        self.close_channel().await;
        log::debug!("Runtime exited");
    }

    /// Apply one message and perform the resulting effects in order.
    pub async fn dispatch(&mut self, message: Message) {
        let effects = self.dashboard.update(message);
        for effect in effects {
            self.perform(effect).await;
        }
    }

    /// Wait for and apply the next queued message. Returns false once the
    /// runtime has exited.
    #[cfg(test)]
    async fn next(&mut self) -> bool {
        if self.exited {
            return false;
        }
        match self.rx.recv().await {
            Some(msg) => {
                self.dispatch(msg).await;
                !self.exited
            }
            None => false,
        }
    }

    async fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::FetchSnapshot { generation } => {
                self.abort_snapshot();
                let backend = self.backend.clone();
                let tx = self.tx.clone();
                let handle = tokio::spawn(async move {
                    let result = backend.fetch_snapshot().await;
                    let _ = tx.send(Message::SnapshotLoaded { generation, result });
                });
                self.snapshot_task = Some(handle.abort_handle());
            }
            Effect::CancelSnapshot => self.abort_snapshot(),

            Effect::Mutate { mutation, id } => {
                let backend = self.backend.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend.mutate(mutation, id).await;
                    let _ = tx.send(Message::MutationComplete {
                        mutation,
                        id,
                        result,
                    });
                });
            }

            Effect::ExpireNotice { id, after } => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Message::NoticeExpired(id));
                });
            }

            Effect::Connect => {
                self.close_channel().await;
                if let Some(settings) = self.channel_settings.clone() {
                    let tx = self.tx.clone();
                    let sink: EventSink = Arc::new(move |event| {
                        let _ = tx.send(Message::Live(event));
                    });
                    self.channel = Some(LiveChannel::open(settings, sink));
                }
            }
            Effect::Disconnect => self.close_channel().await,

            Effect::RunProcessor(request) => {
                let backend = self.backend.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend.run_processor(&request).await;
                    let _ = tx.send(Message::ProcessorComplete(result));
                });
            }

            Effect::TestSpam(text) => {
                let backend = self.backend.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend.test_spam(&text).await;
                    let _ = tx.send(Message::SpamTestComplete(result));
                });
            }

            Effect::Exit => self.exited = true,
        }
    }

    fn abort_snapshot(&mut self) {
        if let Some(task) = self.snapshot_task.take() {
            task.abort();
        }
    }

    async fn close_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::app::DashboardState;
    use crate::core::api::ApiError;
    use crate::core::channel::LiveEvent;
    use crate::core::models::{
        EmailId, EmailRecord, Mutation, ProcessOutcome, ProcessRequest, SpamVerdict,
    };
    use crate::core::store::tests::record;

    #[derive(Default)]
    struct FakeBackend {
        snapshot: Vec<EmailRecord>,
        snapshot_delay: Option<Duration>,
        failures: HashMap<(Mutation, EmailId), ApiError>,
        calls: Arc<Mutex<Vec<(Mutation, EmailId)>>>,
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn fetch_snapshot(&self) -> Result<Vec<EmailRecord>, ApiError> {
            if let Some(delay) = self.snapshot_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.snapshot.clone())
        }

        async fn mutate(
            &self,
            mutation: Mutation,
            id: EmailId,
        ) -> Result<Option<EmailRecord>, ApiError> {
            self.calls.lock().unwrap().push((mutation, id));
            match self.failures.get(&(mutation, id)) {
                Some(e) => Err(e.clone()),
                None => Ok(None),
            }
        }

        async fn test_spam(&self, text: &str) -> Result<SpamVerdict, ApiError> {
            Ok(SpamVerdict {
                is_spam: text.contains("FREE"),
                analysis: "checked".into(),
                text: Some(text.to_string()),
            })
        }

        async fn run_processor(
            &self,
            _request: &ProcessRequest,
        ) -> Result<ProcessOutcome, ApiError> {
            Ok(ProcessOutcome {
                success: true,
                ..Default::default()
            })
        }
    }

    fn spam_snapshot() -> Vec<EmailRecord> {
        let mut spam = record(1);
        spam.is_spam = true;
        vec![spam, record(2)]
    }

    async fn started(backend: FakeBackend) -> Runtime<FakeBackend> {
        let mut rt = Runtime::new(backend, None);
        rt.dispatch(Message::Init).await;
        assert!(rt.next().await);
        rt
    }

    #[tokio::test]
    async fn initial_snapshot_populates_store() {
        let rt = started(FakeBackend {
            snapshot: spam_snapshot(),
            ..Default::default()
        })
        .await;
        let m = rt.dashboard().metrics();
        assert_eq!((m.total, m.spam), (2, 1));
    }

    #[tokio::test]
    async fn push_insert_then_confirmed_delete() {
        let mut rt = started(FakeBackend {
            snapshot: spam_snapshot(),
            ..Default::default()
        })
        .await;

        rt.sender()
            .send(Message::Live(LiveEvent::NewEmail(record(3))))
            .unwrap();
        assert!(rt.next().await);
        assert_eq!(rt.dashboard().store().ids(), vec![3, 1, 2]);
        assert_eq!(rt.dashboard().metrics().total, 3);

        rt.dispatch(Message::Delete(2)).await;
        assert!(rt.next().await);
        assert_eq!(rt.dashboard().store().ids(), vec![3, 1]);

        rt.sender()
            .send(Message::Live(LiveEvent::EmailDeleted(2)))
            .unwrap();
        assert!(rt.next().await);
        assert_eq!(rt.dashboard().store().ids(), vec![3, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_mutation_notice_clears_after_three_seconds() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut failures = HashMap::new();
        failures.insert((Mutation::MarkImportant, 1), ApiError::Status(500));
        let mut rt = started(FakeBackend {
            snapshot: spam_snapshot(),
            failures,
            calls: calls.clone(),
            ..Default::default()
        })
        .await;
        let before = rt.dashboard().store().get(1).cloned();

        rt.dispatch(Message::MarkImportant(1)).await;
        assert!(rt.next().await);
        assert_eq!(rt.dashboard().store().get(1).cloned(), before);
        assert!(rt.dashboard().error_notice().is_some());

        let start = Instant::now();
        assert!(rt.next().await);
        assert!(rt.dashboard().error_notice().is_none());
        assert!(start.elapsed() >= Duration::from_secs(3));

        // Exactly one request, no retry.
        assert_eq!(*calls.lock().unwrap(), vec![(Mutation::MarkImportant, 1)]);
    }

    #[tokio::test]
    async fn delete_succeeds_while_offline() {
        let mut rt = started(FakeBackend {
            snapshot: spam_snapshot(),
            ..Default::default()
        })
        .await;
        rt.sender()
            .send(Message::Live(LiveEvent::Disconnected(Some("ping timeout".into()))))
            .unwrap();
        assert!(rt.next().await);
        assert_eq!(rt.dashboard().state(), DashboardState::DegradedConnectivity);

        rt.dispatch(Message::Delete(1)).await;
        assert!(rt.next().await);
        assert_eq!(rt.dashboard().store().ids(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_snapshot() {
        let mut rt = Runtime::new(
            FakeBackend {
                snapshot: spam_snapshot(),
                snapshot_delay: Some(Duration::from_secs(10)),
                ..Default::default()
            },
            None,
        );
        rt.dispatch(Message::Init).await;
        rt.dispatch(Message::Teardown).await;

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(rt.rx.try_recv().is_err());
        assert!(rt.dashboard().store().is_empty());
        assert!(!rt.next().await);
    }

    #[tokio::test(start_paused = true)]
    async fn processor_run_refreshes_and_expires_notice() {
        let mut rt = started(FakeBackend {
            snapshot: spam_snapshot(),
            ..Default::default()
        })
        .await;
        rt.dispatch(Message::RunProcessor(ProcessRequest::default()))
            .await;
        assert!(rt.next().await); // ProcessorComplete
        assert!(rt.dashboard().processing_notice().is_some());

        assert!(rt.next().await); // refreshed snapshot
        assert_eq!(rt.dashboard().store().len(), 2);

        assert!(rt.next().await); // notice expiry
        assert!(rt.dashboard().processing_notice().is_none());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let rt = Runtime::new(
            FakeBackend {
                snapshot: spam_snapshot(),
                ..Default::default()
            },
            None,
        );
        let mut renders = 0;
        rt.run(async {}, |_| renders += 1).await;
        assert!(renders >= 1);
    }
}
