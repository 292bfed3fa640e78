mod actions;
mod sync;
mod tools;
mod watch;

use std::time::Duration;

use crate::core::api::ApiError;
use crate::core::channel::LiveEvent;
use crate::core::metrics::Metrics;
use crate::core::models::{
    ConnectionState, EmailId, EmailRecord, Mutation, ProcessOutcome, ProcessRequest, SpamVerdict,
};
use crate::core::store::RecordStore;

/// Load lifecycle of the email list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    /// Initial snapshot failed; only a full reload leaves this state.
    Failed(String),
}

/// What the dashboard as a whole is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardState {
    Loading,
    Ready,
    DegradedConnectivity,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
}

/// Transient banner. Expires through [`Message::NoticeExpired`] with its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpamTestState {
    Idle,
    Running,
    Done(SpamVerdict),
    Failed(String),
}

pub struct Dashboard {
    pub(super) store: RecordStore,
    pub(super) phase: Phase,

    pub(super) live_enabled: bool,
    pub(super) conn_state: ConnectionState,

    /// Generation of the snapshot fetch whose result we still accept.
    pub(super) pending_snapshot: Option<u64>,
    pub(super) snapshot_generation: u64,

    pub(super) error_notice: Option<Notice>,
    pub(super) processing_notice: Option<Notice>,
    pub(super) next_notice_id: u64,

    pub(super) processing: bool,
    pub(super) processor_error: Option<String>,
    pub(super) spam_test: SpamTestState,

    pub(super) torn_down: bool,
    pub(super) status_message: String,
}

#[derive(Debug, Clone)]
pub enum Message {
    // Snapshot lifecycle
    Init,
    SnapshotLoaded {
        generation: u64,
        result: Result<Vec<EmailRecord>, ApiError>,
    },
    Refresh,
    Reload,
    Teardown,

    // Workflow mutations
    MarkImportant(EmailId),
    ToggleArchive(EmailId),
    ToggleRead(EmailId),
    Delete(EmailId),
    MutationComplete {
        mutation: Mutation,
        id: EmailId,
        result: Result<Option<EmailRecord>, ApiError>,
    },
    NoticeExpired(u64),

    // Live channel
    Live(LiveEvent),
    Reconnect,

    // Tools
    RunProcessor(ProcessRequest),
    ProcessorComplete(Result<ProcessOutcome, ApiError>),
    TestSpam(String),
    SpamTestComplete(Result<SpamVerdict, ApiError>),

    Noop,
}

/// Side effects requested by [`Dashboard::update`]. The runtime performs them
/// and feeds results back as messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchSnapshot { generation: u64 },
    CancelSnapshot,
    Mutate { mutation: Mutation, id: EmailId },
    ExpireNotice { id: u64, after: Duration },
    Connect,
    Disconnect,
    RunProcessor(ProcessRequest),
    TestSpam(String),
    Exit,
}

pub type Effects = Vec<Effect>;

impl Dashboard {
    pub fn new(live_enabled: bool) -> Self {
        Dashboard {
            store: RecordStore::new(),
            phase: Phase::Loading,
            live_enabled,
            conn_state: ConnectionState::Disconnected,
            pending_snapshot: None,
            snapshot_generation: 0,
            error_notice: None,
            processing_notice: None,
            next_notice_id: 0,
            processing: false,
            processor_error: None,
            spam_test: SpamTestState::Idle,
            torn_down: false,
            status_message: "Starting up...".into(),
        }
    }

    pub fn update(&mut self, message: Message) -> Effects {
        if self.torn_down && !matches!(message, Message::Noop) {
            log::debug!("Dashboard torn down, dropping {:?}", message);
            return Vec::new();
        }

        match message {
            // Snapshot lifecycle
            Message::Init
            | Message::SnapshotLoaded { .. }
            | Message::Refresh
            | Message::Reload
            | Message::Teardown => self.handle_sync(message),

            // Workflow mutations
            Message::MarkImportant(_)
            | Message::ToggleArchive(_)
            | Message::ToggleRead(_)
            | Message::Delete(_)
            | Message::MutationComplete { .. }
            | Message::NoticeExpired(_) => self.handle_actions(message),

            // Live channel
            Message::Live(_) | Message::Reconnect => self.handle_watch(message),

            // Tools
            Message::RunProcessor(_)
            | Message::ProcessorComplete(_)
            | Message::TestSpam(_)
            | Message::SpamTestComplete(_) => self.handle_tools(message),

            Message::Noop => Vec::new(),
        }
    }

    /// Dispatch a message through the update loop (for recursive calls from handlers).
    pub(super) fn dispatch(&mut self, message: Message) -> Effects {
        self.update(message)
    }

    pub(super) fn push_notice(&mut self, kind: NoticeKind, text: String, ttl: Duration) -> Effect {
        self.next_notice_id += 1;
        let notice = Notice {
            id: self.next_notice_id,
            kind,
            text,
        };
        let id = notice.id;
        match kind {
            NoticeKind::Error => self.error_notice = Some(notice),
            NoticeKind::Success => self.processing_notice = Some(notice),
        }
        Effect::ExpireNotice { id, after: ttl }
    }

    pub fn state(&self) -> DashboardState {
        match self.phase {
            Phase::Loading => DashboardState::Loading,
            Phase::Failed(_) => DashboardState::Failed,
            Phase::Ready if self.conn_state.is_connected() => DashboardState::Ready,
            Phase::Ready => DashboardState::DegradedConnectivity,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Recomputed on every call; never cached.
    pub fn metrics(&self) -> Metrics {
        Metrics::project(self.store.iter())
    }

    pub fn conn_state(&self) -> &ConnectionState {
        &self.conn_state
    }

    pub fn error_notice(&self) -> Option<&Notice> {
        self.error_notice.as_ref()
    }

    pub fn processing_notice(&self) -> Option<&Notice> {
        self.processing_notice.as_ref()
    }

    pub fn processor_error(&self) -> Option<&str> {
        self.processor_error.as_deref()
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn spam_test(&self) -> &SpamTestState {
        &self.spam_test
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}
