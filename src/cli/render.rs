use crate::history::{
    AnnotatedMessage, ContactLists, DataSource, FetchState, GuestIdentity, HistoryView, PagingMode,
};

const CONTENT_WIDTH: usize = 80;

fn truncate(text: &str, width: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn participant(row: &AnnotatedMessage) -> &str {
    row.guest_name
        .as_deref()
        .or(row.message.contact_email.as_deref())
        .or(row.message.contact_phone.as_deref())
        .unwrap_or("-")
}

pub fn render_messages(view: &HistoryView) -> String {
    let mut lines = Vec::with_capacity(view.messages.len() + 3);
    if view.messages.is_empty() {
        lines.push("No messages match the current filters.".to_string());
    }
    for row in &view.messages {
        lines.push(format!(
            "{}  {:<9} {:<24} {}",
            row.message.timestamp.format("%Y-%m-%d %H:%M"),
            truncate(&row.message.sender, 9),
            truncate(participant(row), 24),
            truncate(&row.message.content, CONTENT_WIDTH)
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Page {} of {}{}",
        view.window.page_number,
        view.window.total_pages,
        match view.mode {
            PagingMode::ServerPaged => "",
            PagingMode::ClientPaged => " (filtered locally)",
        }
    ));
    lines.extend(render_failures(view));
    lines.join("\n")
}

/// One line per source that ended the cycle in error.
fn render_failures(view: &HistoryView) -> Vec<String> {
    DataSource::ALL
        .into_iter()
        .filter_map(|source| match view.state(source) {
            FetchState::Failed(reason) => Some(format!("! {source} unavailable: {reason}")),
            _ => None,
        })
        .collect()
}

pub fn render_guests(guests: &[GuestIdentity]) -> String {
    if guests.is_empty() {
        return "No guest conversations.".to_string();
    }
    guests
        .iter()
        .map(|g| format!("{:<10} {}", g.display_name, g.session_id))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_contacts(contacts: &ContactLists) -> String {
    let mut lines = vec![format!("Emails ({})", contacts.emails.len())];
    lines.extend(contacts.emails.iter().map(|e| format!("  {e}")));
    lines.push(format!("Phone numbers ({})", contacts.phone_numbers.len()));
    lines.extend(contacts.phone_numbers.iter().map(|p| format!("  {p}")));
    lines.join("\n")
}
