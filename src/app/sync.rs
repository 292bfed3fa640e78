use crate::config::MUTATION_NOTICE_TTL;
use crate::core::models::ConnectionState;

use super::{Dashboard, Effect, Effects, Message, NoticeKind, Phase};

impl Dashboard {
    pub(super) fn handle_sync(&mut self, message: Message) -> Effects {
        match message {
            Message::Init => {
                self.phase = Phase::Loading;
                self.status_message = "Loading security data...".into();
                let mut effects = vec![self.begin_snapshot()];
                if self.live_enabled {
                    self.conn_state = ConnectionState::Connecting;
                    effects.push(Effect::Connect);
                }
                return effects;
            }

            Message::SnapshotLoaded { generation, result } => {
                if self.pending_snapshot != Some(generation) {
                    log::debug!(
                        "Discarding snapshot generation {} (expecting {:?})",
                        generation,
                        self.pending_snapshot
                    );
                    return Vec::new();
                }
                self.pending_snapshot = None;

                match result {
                    Ok(records) => {
                        let count = records.len();
                        self.store.apply_snapshot(records);
                        self.phase = Phase::Ready;
                        self.status_message = format!("{} emails", self.store.len());
                        log::info!("Snapshot loaded: {} records", count);
                    }
                    Err(e) if self.phase == Phase::Loading => {
                        log::error!("Failed to load emails: {}", e);
                        self.status_message = format!("Failed to load emails: {e}");
                        self.phase = Phase::Failed(e.to_string());
                    }
                    Err(e) => {
                        // A failed refresh keeps what we already show.
                        log::warn!("Refresh failed: {}", e);
                        self.status_message = format!("Refresh failed: {e}");
                        return vec![self.push_notice(
                            NoticeKind::Error,
                            "Failed to refresh emails".into(),
                            MUTATION_NOTICE_TTL,
                        )];
                    }
                }
            }

            Message::Refresh => match self.phase {
                Phase::Ready => {
                    self.status_message = "Refreshing...".into();
                    return vec![self.begin_snapshot()];
                }
                Phase::Loading => {
                    log::debug!("Refresh ignored, initial load in progress");
                }
                Phase::Failed(_) => {
                    self.status_message = "Load failed, reload to retry".into();
                }
            },

            Message::Reload => {
                log::info!("Full reload");
                self.store.clear();
                self.phase = Phase::Loading;
                self.error_notice = None;
                self.processing_notice = None;
                self.status_message = "Loading security data...".into();

                let mut effects = vec![Effect::CancelSnapshot, self.begin_snapshot()];
                if self.live_enabled {
                    self.conn_state = ConnectionState::Connecting;
                    effects.push(Effect::Disconnect);
                    effects.push(Effect::Connect);
                }
                return effects;
            }

            Message::Teardown => {
                log::info!("Tearing down dashboard");
                self.torn_down = true;
                self.pending_snapshot = None;
                self.conn_state = ConnectionState::Disconnected;
                return vec![Effect::CancelSnapshot, Effect::Disconnect, Effect::Exit];
            }

            _ => {}
        }
        Vec::new()
    }

    /// Start a new snapshot fetch. Any earlier in-flight fetch becomes stale.
    fn begin_snapshot(&mut self) -> Effect {
        self.snapshot_generation += 1;
        self.pending_snapshot = Some(self.snapshot_generation);
        Effect::FetchSnapshot {
            generation: self.snapshot_generation,
        }
    }
}
