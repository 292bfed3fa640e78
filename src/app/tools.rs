use crate::config::PROCESSING_NOTICE_TTL;
use crate::core::api::validate_spam_text;

use super::{Dashboard, Effect, Effects, Message, NoticeKind, SpamTestState};

impl Dashboard {
    pub(super) fn handle_tools(&mut self, message: Message) -> Effects {
        match message {
            Message::RunProcessor(request) => {
                if self.processing {
                    log::debug!("Processor already running");
                    return Vec::new();
                }
                if let Err(e) = request.validate() {
                    self.processor_error = Some(e);
                    return Vec::new();
                }
                self.processing = true;
                self.processor_error = None;
                self.status_message = "Processing...".into();
                return vec![Effect::RunProcessor(request)];
            }

            Message::ProcessorComplete(result) => {
                self.processing = false;
                match result {
                    Ok(outcome) => {
                        log::info!("Email processor finished: {}", outcome.summary());
                        let mut effects = vec![self.push_notice(
                            NoticeKind::Success,
                            outcome.summary(),
                            PROCESSING_NOTICE_TTL,
                        )];
                        effects.extend(self.dispatch(Message::Refresh));
                        return effects;
                    }
                    Err(e) => {
                        log::warn!("Email processor failed: {}", e);
                        self.processor_error = Some(e.to_string());
                    }
                }
            }

            Message::TestSpam(text) => {
                if self.spam_test == SpamTestState::Running {
                    return Vec::new();
                }
                if let Err(e) = validate_spam_text(&text) {
                    self.spam_test = SpamTestState::Failed(e.to_string());
                    return Vec::new();
                }
                self.spam_test = SpamTestState::Running;
                return vec![Effect::TestSpam(text)];
            }

            Message::SpamTestComplete(result) => {
                self.spam_test = match result {
                    Ok(verdict) => SpamTestState::Done(verdict),
                    Err(e) => SpamTestState::Failed(e.to_string()),
                };
            }

            _ => {}
        }
        Vec::new()
    }
}
