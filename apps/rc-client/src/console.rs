//! Line-oriented presentation: parses what the user types and renders
//! session events for stdout.

use rc_proto::ConversationId;
use rc_session::{ConversationSummary, Roster, SessionEvent};
use rc_store::StoredMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch to the group conversation.
    Group,
    /// Switch to a one-to-one conversation; argument is an identity prefix
    /// or a display name.
    Dm(String),
    Peers,
    List,
    /// Clear the active conversation's history.
    Clear,
    Quit,
    Say(String),
}

impl Command {
    /// `None` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Say(line.to_string())));
        };
        let (cmd, arg) = match rest.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (rest, ""),
        };
        let parsed = match cmd {
            "group" | "g" => Self::Group,
            "dm" | "d" if !arg.is_empty() => Self::Dm(arg.to_string()),
            "dm" | "d" => return Err("usage: /dm <id-prefix|name>".into()),
            "peers" => Self::Peers,
            "list" | "ls" => Self::List,
            "clear" => Self::Clear,
            "quit" | "q" | "exit" => Self::Quit,
            other => return Err(format!("unknown command /{other}")),
        };
        Ok(Some(parsed))
    }
}

/// Find the single roster peer whose identity starts with `query` or whose
/// display name equals it (case-insensitive).
pub fn resolve_peer(roster: &Roster, query: &str) -> Result<ConversationId, String> {
    let needle = query.to_lowercase();
    let matches: Vec<_> = roster
        .all()
        .filter(|p| p.identity.starts_with(&needle) || p.display_name.to_lowercase() == needle)
        .collect();
    match matches.as_slice() {
        [peer] => Ok(ConversationId::peer(peer.identity.clone())),
        [] => Err(format!("no peer matches '{query}'")),
        many => Err(format!("'{query}' matches {} peers, use a longer prefix", many.len())),
    }
}

pub fn short_id(identity: &str) -> &str {
    identity.get(..8).unwrap_or(identity)
}

pub fn conversation_label(conversation: &ConversationId, roster: &Roster) -> String {
    match conversation {
        ConversationId::Group => "group".to_string(),
        ConversationId::Peer(id) => match roster.get(id) {
            Some(peer) => format!("{} ({})", peer.display_name, short_id(id)),
            None => short_id(id).to_string(),
        },
    }
}

pub fn format_message(message: &StoredMessage) -> String {
    format!(
        "[{}] {}: {}",
        message.sent_at().format("%H:%M:%S"),
        message.sender,
        message.payload
    )
}

pub fn format_summary(summary: &ConversationSummary, active: &ConversationId) -> String {
    let marker = if &summary.conversation == active { '>' } else { ' ' };
    let unread = if summary.has_unread { " *" } else { "" };
    let status = match (&summary.conversation, summary.online) {
        (ConversationId::Group, _) => String::new(),
        (ConversationId::Peer(id), online) => {
            format!(" [{}{}]", short_id(id), if online { "" } else { ", offline" })
        }
    };
    format!("{marker} {}{status}{unread}", summary.label())
}

/// Text for one session event, `None` for events with nothing to show.
pub fn render(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::SystemNotice(notice) => Some(format!("* {notice}")),
        SessionEvent::MessageAppended(message) => Some(format_message(message)),
        SessionEvent::ConversationUpdated {
            conversation,
            has_unread: true,
        } => Some(format!("* new message in {}", short_id(&conversation.to_string()))),
        SessionEvent::ConversationUpdated { .. } => None,
        SessionEvent::ConversationLoaded { conversation, messages } => {
            let mut out = format!("-- {} --", short_id(&conversation.to_string()));
            for message in messages {
                out.push('\n');
                out.push_str(&format_message(message));
            }
            Some(out)
        }
        SessionEvent::ConversationsRefreshed(_) => None,
        SessionEvent::Error(e) => Some(format!("! {e}")),
        SessionEvent::Disconnected => Some("* disconnected from relay".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_session::Peer;

    #[test]
    fn parses_commands_and_text() {
        assert_eq!(Command::parse("   "), Ok(None));
        assert_eq!(Command::parse("hello there"), Ok(Some(Command::Say("hello there".into()))));
        assert_eq!(Command::parse("/group"), Ok(Some(Command::Group)));
        assert_eq!(Command::parse("/dm  ab12 "), Ok(Some(Command::Dm("ab12".into()))));
        assert_eq!(Command::parse("/quit"), Ok(Some(Command::Quit)));
        assert_eq!(Command::parse("/list"), Ok(Some(Command::List)));
        assert!(Command::parse("/dm").is_err());
        assert!(Command::parse("/nope").is_err());
    }

    fn roster() -> Roster {
        let mut roster = Roster::new();
        roster.add(Peer::new("ab12ff", "Alice", "ab12ff"));
        roster.add(Peer::new("ab34ee", "Bob", "ab34ee"));
        roster
    }

    #[test]
    fn resolves_by_prefix_or_name() {
        let roster = roster();
        assert_eq!(resolve_peer(&roster, "ab12"), Ok(ConversationId::peer("ab12ff")));
        assert_eq!(resolve_peer(&roster, "bob"), Ok(ConversationId::peer("ab34ee")));
        assert!(resolve_peer(&roster, "ab").is_err());
        assert!(resolve_peer(&roster, "zz").is_err());
    }

    #[test]
    fn renders_notices_and_hides_bookkeeping() {
        assert_eq!(
            render(&SessionEvent::SystemNotice("Bob joined the chat.".into())).as_deref(),
            Some("* Bob joined the chat.")
        );
        assert!(render(&SessionEvent::ConversationsRefreshed(vec![])).is_none());
        assert!(render(&SessionEvent::ConversationUpdated {
            conversation: ConversationId::Group,
            has_unread: false,
        })
        .is_none());
    }

    #[test]
    fn summary_marks_active_and_unread() {
        let summary = ConversationSummary {
            conversation: ConversationId::peer("ab12ffcafebabe00"),
            display_name: None,
            online: false,
            has_unread: true,
        };
        let line = format_summary(&summary, &ConversationId::Group);
        assert_eq!(line, "  ab12ffcafebabe00 [ab12ffca, offline] *");
    }
}
