use crate::core::channel::LiveEvent;
use crate::core::models::ConnectionState;

use super::{Dashboard, Effect, Effects, Message};

impl Dashboard {
    pub(super) fn handle_watch(&mut self, message: Message) -> Effects {
        match message {
            Message::Live(LiveEvent::Connected) => {
                log::info!("Live updates enabled");
                self.conn_state = ConnectionState::Connected;
            }
            Message::Live(LiveEvent::ConnectFailed(e)) => {
                log::warn!("Live channel connect failed: {}", e);
                self.conn_state = ConnectionState::Error(e);
                self.status_message = "Real-time updates disabled - connection issues".into();
            }
            Message::Live(LiveEvent::Disconnected(reason)) => {
                // Store stays as is; missed events need a manual refresh.
                match reason {
                    Some(e) => {
                        log::warn!("Live channel dropped: {}", e);
                        self.conn_state = ConnectionState::Error(e);
                    }
                    None => {
                        log::info!("Live channel closed by server");
                        self.conn_state = ConnectionState::Disconnected;
                    }
                }
                self.status_message = "Offline mode - refresh to catch up".into();
            }

            Message::Live(LiveEvent::NewEmail(record)) => {
                let id = record.id;
                if self.store.apply_insert(record) {
                    log::debug!("new_email {} applied", id);
                }
            }
            Message::Live(LiveEvent::EmailUpdated(record)) => {
                let id = record.id;
                if self.store.apply_update(record) {
                    log::debug!("email_updated {} applied", id);
                }
            }
            Message::Live(LiveEvent::EmailDeleted(id)) => {
                if self.store.apply_delete(id) {
                    log::debug!("email_deleted {} applied", id);
                }
            }

            Message::Reconnect => {
                if !self.live_enabled {
                    self.status_message = "Live updates are disabled".into();
                    return Vec::new();
                }
                if self.conn_state == ConnectionState::Connecting {
                    return Vec::new();
                }
                self.conn_state = ConnectionState::Connecting;
                self.status_message = "Reconnecting...".into();
                return vec![Effect::Disconnect, Effect::Connect];
            }

            _ => {}
        }
        Vec::new()
    }
}
