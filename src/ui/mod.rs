pub mod detections;
pub mod header;
pub mod input;
pub mod metric_cards;

use crate::app::{Dashboard, DashboardState, Phase};
use crate::config::RECENT_LIMIT;

/// Render the whole dashboard as text.
pub fn render(dash: &Dashboard) -> String {
    let mut out = header::view(dash);

    match dash.state() {
        DashboardState::Loading => out.push_str("Loading emails...\n"),
        DashboardState::Failed => {
            let reason = match dash.phase() {
                Phase::Failed(e) => e.as_str(),
                _ => "unknown error",
            };
            out.push_str(&format!("Failed to load emails: {reason}\n"));
            out.push_str("Type `reload` to try again.\n");
        }
        DashboardState::Ready | DashboardState::DegradedConnectivity => {
            out.push('\n');
            out.push_str(&metric_cards::view(&dash.metrics()));
            out.push_str("\n\nRecent Detections\n");
            if dash.store().is_empty() {
                out.push_str("No emails analyzed yet\n");
            } else {
                out.push_str(&detections::view(dash.store().recent(RECENT_LIMIT)));
            }
        }
    }

    if let Some(panel) = spam_test::view(dash.spam_test()) {
        out.push('\n');
        out.push_str(&panel);
        out.push('\n');
    }

    out.push_str(&format!("\n{}\n", dash.status_message()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::*;
    use crate::app::Message;
    use crate::core::api::ApiError;

    #[test]
    fn loading_then_ready() {
        let mut dash = Dashboard::new(false);
        dash.update(Message::Init);
        assert!(render(&dash).contains("Loading emails..."));

        let dash = ready((1..=12).map(record).collect());
        let out = render(&dash);
        assert!(out.contains("[Total Detections: 12]"));
        // Only the most recent rows are listed.
        assert_eq!(out.lines().filter(|l| l.contains("Security Scan")).count(), 10);
    }

    #[test]
    fn empty_store_says_so() {
        let out = render(&ready(vec![]));
        assert!(out.contains("No emails analyzed yet"));
        assert!(!out.contains("Subject"));
    }

    #[test]
    fn failed_load_offers_reload() {
        let mut dash = Dashboard::new(false);
        dash.update(Message::Init);
        dash.update(Message::SnapshotLoaded {
            generation: 1,
            result: Err(ApiError::Status(500)),
        });
        let out = render(&dash);
        assert!(out.contains("Failed to load emails"));
        assert!(out.contains("reload"));
    }
}
