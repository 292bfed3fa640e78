use crate::app::{Dashboard, NoticeKind};
use crate::core::models::ConnectionState;

/// Title line with the live-updates indicator, followed by any notices.
pub fn view(dash: &Dashboard) -> String {
    let indicator = match dash.conn_state() {
        ConnectionState::Connected => "● Live Updates",
        ConnectionState::Connecting => "◌ Connecting",
        ConnectionState::Error(_) | ConnectionState::Disconnected => "○ Offline Mode",
    };

    let mut out = format!("Email Security Dashboard   {indicator}\n");

    for notice in [dash.error_notice(), dash.processing_notice()]
        .into_iter()
        .flatten()
    {
        let icon = match notice.kind {
            NoticeKind::Error => "✖",
            NoticeKind::Success => "✔",
        };
        out.push_str(&format!("{icon} {}\n", notice.text));
    }
    if let Some(e) = dash.processor_error() {
        out.push_str(&format!("✖ {e}\n"));
    }
    if dash.is_processing() {
        out.push_str("Processing emails...\n");
    }
    out
}
