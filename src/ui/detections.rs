use crate::core::models::EmailRecord;

const SUBJECT_WIDTH: usize = 36;
const SENDER_WIDTH: usize = 28;

/// Render the recent detections table.
pub fn view<'a>(records: impl IntoIterator<Item = &'a EmailRecord>) -> String {
    let mut out = format!(
        "{:>5}  {:<3} {:<sw$} {:<fw$} {:<8} {:<12} {:<18} {}\n",
        "ID",
        "",
        "Subject",
        "Sender",
        "Priority",
        "Analysis",
        "Rule",
        "Date",
        sw = SUBJECT_WIDTH,
        fw = SENDER_WIDTH,
    );

    let mut rows = 0;
    for msg in records {
        rows += 1;
        let unread = if !msg.is_read { "●" } else { " " };
        let star = if msg.is_important { "★" } else { " " };
        let archived = if msg.is_archived { "A" } else { " " };
        let clip = if msg.has_attachment { "📎 " } else { "" };

        out.push_str(&format!(
            "{:>5}  {}{}{} {:<sw$} {:<fw$} {:<8} {:<12} {:<18} {}\n",
            msg.id,
            unread,
            star,
            archived,
            truncate(&format!("{clip}{}", msg.subject()), SUBJECT_WIDTH),
            truncate(&msg.sender, SENDER_WIDTH),
            msg.priority().label(),
            truncate(msg.analysis_type(), 12),
            msg.rule_type(),
            msg.email_date.as_deref().unwrap_or("-"),
            sw = SUBJECT_WIDTH,
            fw = SENDER_WIDTH,
        ));
    }

    if rows == 0 {
        out.push_str("No detections\n");
    }
    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(width.saturating_sub(1)).collect();
        t.push('…');
        t
    }
}
