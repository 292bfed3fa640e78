use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use rust_socketio::asynchronous::{Client, ClientBuilder};
use rust_socketio::{Event, Payload, TransportType};
use tokio::task::JoinHandle;

use crate::core::models::{DeletedEmail, EmailId, EmailRecord};

pub const NEW_EMAIL: &str = "new_email";
pub const EMAIL_UPDATED: &str = "email_updated";
pub const EMAIL_DELETED: &str = "email_deleted";
const CONNECTION_RESPONSE: &str = "connection_response";

/// Push event kinds that map onto record store operations.
pub const EVENT_KINDS: [&str; 3] = [NEW_EMAIL, EMAIL_UPDATED, EMAIL_DELETED];

/// What the live channel reports to the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Connected,
    ConnectFailed(String),
    Disconnected(Option<String>),
    NewEmail(EmailRecord),
    EmailUpdated(EmailRecord),
    EmailDeleted(EmailId),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("unknown event '{0}'")]
    UnknownEvent(String),
    #[error("malformed '{event}' payload: {reason}")]
    Malformed { event: String, reason: String },
}

/// Callback the channel pushes events into.
pub type EventSink = Arc<dyn Fn(LiveEvent) + Send + Sync>;

/// Where and how to subscribe.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub url: String,
    pub namespace: String,
    pub token: String,
}

/// Translate one named push payload into a [`LiveEvent`].
pub fn decode_event(event: &str, payload: serde_json::Value) -> Result<LiveEvent, ChannelError> {
    let malformed = |e: serde_json::Error| ChannelError::Malformed {
        event: event.to_string(),
        reason: e.to_string(),
    };
    match event {
        NEW_EMAIL => Ok(LiveEvent::NewEmail(
            serde_json::from_value(payload).map_err(malformed)?,
        )),
        EMAIL_UPDATED => Ok(LiveEvent::EmailUpdated(
            serde_json::from_value(payload).map_err(malformed)?,
        )),
        EMAIL_DELETED => {
            let deleted: DeletedEmail = serde_json::from_value(payload).map_err(malformed)?;
            Ok(LiveEvent::EmailDeleted(deleted.id))
        }
        other => Err(ChannelError::UnknownEvent(other.to_string())),
    }
}

/// A Socket.IO subscription to the backend's email namespace.
///
/// Opening is asynchronous; [`LiveChannel::close`] may be called at any point,
/// including before the connection finished. After close no handler forwards
/// anything to the sink.
pub struct LiveChannel {
    detached: Arc<AtomicBool>,
    client: Arc<Mutex<Option<Client>>>,
    connect_task: Option<JoinHandle<()>>,
}

impl LiveChannel {
    /// Start connecting in the background. Progress is reported to `sink`.
    pub fn open(settings: ChannelSettings, sink: EventSink) -> Self {
        let detached = Arc::new(AtomicBool::new(false));
        let client = Arc::new(Mutex::new(None));

        let task = {
            let detached = detached.clone();
            let client_slot = client.clone();
            tokio::spawn(async move {
                log::info!(
                    "Connecting live channel {}{}",
                    settings.url,
                    settings.namespace
                );
                let mut builder = ClientBuilder::new(settings.url.as_str())
                    .namespace(settings.namespace.as_str())
                    .transport_type(TransportType::Websocket)
                    // Reconnecting is left to the user.
                    .reconnect(false)
                    .auth(serde_json::json!({ "token": settings.token }));

                for kind in EVENT_KINDS {
                    builder = builder.on(kind, forward(kind, sink.clone(), detached.clone()));
                }
                builder = builder
                    .on(CONNECTION_RESPONSE, |payload: Payload, _: Client| {
                        log::info!("Live channel: {:?}", first_value(payload));
                        async {}.boxed()
                    })
                    .on(Event::Connect, {
                        let sink = sink.clone();
                        let detached = detached.clone();
                        move |_: Payload, _: Client| -> BoxFuture<'static, ()> {
                            report(LiveEvent::Connected, &sink, &detached);
                            async {}.boxed()
                        }
                    })
                    .on(Event::Close, {
                        let sink = sink.clone();
                        let detached = detached.clone();
                        move |_: Payload, _: Client| -> BoxFuture<'static, ()> {
                            report(LiveEvent::Disconnected(None), &sink, &detached);
                            async {}.boxed()
                        }
                    })
                    .on(Event::Error, {
                        let sink = sink.clone();
                        let detached = detached.clone();
                        move |payload: Payload, _: Client| -> BoxFuture<'static, ()> {
                            if let Some(event) = error_event(payload) {
                                report(event, &sink, &detached);
                            }
                            async {}.boxed()
                        }
                    });

                match builder.connect().await {
                    Ok(connected) => {
                        if detached.load(Ordering::Acquire) {
                            // Closed while connecting.
                            let _ = connected.disconnect().await;
                            return;
                        }
                        if let Ok(mut slot) = client_slot.lock() {
                            *slot = Some(connected);
                        }
                        log::info!("Live channel connected");
                        report(LiveEvent::Connected, &sink, &detached);
                    }
                    Err(e) => {
                        log::warn!("Live channel connect failed: {}", e);
                        report(LiveEvent::ConnectFailed(e.to_string()), &sink, &detached);
                    }
                }
            })
        };

        LiveChannel {
            detached,
            client,
            connect_task: Some(task),
        }
    }

    #[cfg(test)]
    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Detach every handler and close the socket. Safe to call repeatedly.
    pub async fn close(&mut self) {
        self.detached.store(true, Ordering::Release);

        if let Some(task) = self.connect_task.take() {
            if !task.is_finished() {
                task.abort();
            }
        }

        let client = self.client.lock().ok().and_then(|mut slot| slot.take());
        if let Some(client) = client {
            if let Err(e) = client.disconnect().await {
                log::warn!("Live channel disconnect failed: {}", e);
            } else {
                log::info!("Live channel closed");
            }
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.detached.store(true, Ordering::Release);
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
    }
}

/// Handler for one store-affecting event kind.
fn forward(
    kind: &'static str,
    sink: EventSink,
    detached: Arc<AtomicBool>,
) -> impl FnMut(Payload, Client) -> BoxFuture<'static, ()> + Send + Sync + 'static {
    move |payload: Payload, _client: Client| {
        deliver(kind, payload, &sink, &detached);
        async {}.boxed()
    }
}

/// Decode one push payload and hand it to the sink unless the channel was closed.
fn deliver(kind: &str, payload: Payload, sink: &EventSink, detached: &AtomicBool) {
    if detached.load(Ordering::Acquire) {
        return;
    }
    match first_value(payload) {
        Some(value) => match decode_event(kind, value) {
            Ok(event) => sink(event),
            Err(e) => log::warn!("Dropping push event: {}", e),
        },
        None => log::warn!("Dropping '{}' push event with empty payload", kind),
    }
}

fn report(event: LiveEvent, sink: &EventSink, detached: &AtomicBool) {
    if !detached.load(Ordering::Acquire) {
        sink(event);
    }
}

/// Error strings raised when the socket itself is gone or the server refused
/// the namespace. Anything else is a bad frame on a live socket.
const TRANSPORT_ERRORS: [&str; 5] = [
    "EngineIO Error",
    "Underlying Engine.IO connection has closed",
    "Got an IO-Error",
    "Received an ConnectError frame",
    "Called an action before the connection was established",
];

/// Map an `error` callback onto a connection change, if it is one.
fn error_event(payload: Payload) -> Option<LiveEvent> {
    let reason = first_value(payload)
        .map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| "connection error".into());

    if TRANSPORT_ERRORS.iter().any(|p| reason.starts_with(p)) {
        Some(LiveEvent::Disconnected(Some(reason)))
    } else {
        log::warn!("Live channel dropped a frame: {}", reason);
        None
    }
}

fn first_value(payload: Payload) -> Option<serde_json::Value> {
    match payload {
        Payload::Text(mut values) if !values.is_empty() => Some(values.swap_remove(0)),
        Payload::Text(_) => None,
        other => {
            log::debug!("Ignoring non-text payload: {:?}", other);
            None
        }
    }
}
