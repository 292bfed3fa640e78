use crate::config::MUTATION_NOTICE_TTL;
use crate::core::models::{EmailId, Mutation};

use super::{Dashboard, Effect, Effects, Message, NoticeKind};

impl Dashboard {
    pub(super) fn handle_actions(&mut self, message: Message) -> Effects {
        match message {
            Message::MarkImportant(id) => return self.request(Mutation::MarkImportant, id),
            Message::ToggleArchive(id) => return self.request(Mutation::ToggleArchive, id),
            Message::ToggleRead(id) => return self.request(Mutation::ToggleRead, id),
            Message::Delete(id) => return self.request(Mutation::Delete, id),

            Message::MutationComplete {
                mutation,
                id,
                result,
            } => match result {
                Ok(echoed) => {
                    if mutation == Mutation::Delete {
                        // The matching push event, if any, becomes a no-op.
                        self.store.apply_delete(id);
                        self.status_message = format!("Deleted email {id}");
                    } else if let Some(record) = echoed {
                        // Covers the case where the push channel is down.
                        self.store.apply_update(record);
                        self.status_message = format!("Updated email {id}");
                    }
                    log::debug!("{:?} on email {} succeeded", mutation, id);
                }
                Err(e) => {
                    log::warn!("{:?} on email {} failed: {}", mutation, id, e);
                    self.status_message = format!("{}: {}", mutation.failure_notice(), e);
                    return vec![self.push_notice(
                        NoticeKind::Error,
                        mutation.failure_notice().into(),
                        MUTATION_NOTICE_TTL,
                    )];
                }
            },

            Message::NoticeExpired(notice_id) => {
                if self.error_notice.as_ref().is_some_and(|n| n.id == notice_id) {
                    self.error_notice = None;
                }
                if self
                    .processing_notice
                    .as_ref()
                    .is_some_and(|n| n.id == notice_id)
                {
                    self.processing_notice = None;
                }
            }

            _ => {}
        }
        Vec::new()
    }

    /// One request for one id. Nothing is applied until the response arrives.
    fn request(&self, mutation: Mutation, id: EmailId) -> Effects {
        log::debug!("Requesting {:?} for email {}", mutation, id);
        vec![Effect::Mutate { mutation, id }]
    }
}
