//! Append-only message log.
//!
//! Entries are ordered by local append time. System frames (identity
//! assignment, acks) never become entries; the classifier in the client
//! consumes them before they reach this log.
//!
//! No cross-device ordering is provided: two clients observing the same
//! conversation may see near-simultaneous messages in different relative
//! orders. There are no sequence numbers and re-delivered frames are not
//! de-duplicated. Known limitation, not silently fixed.

/// Direction of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by the local user.
    Sent,
    /// Received from another participant.
    Recv,
}

/// One chat message as recorded locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Whether the local user sent or received this message.
    pub kind: Direction,
    /// Display line ("sender: content" for received messages).
    pub text: String,
    /// Bare message content.
    pub content: String,
    /// Wall-clock timestamp, milliseconds since the Unix epoch.
    pub ts: u64,
}

/// Append-only ordered record of sent and received messages.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<LogEntry>,
}

impl MessageLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message sent by the local user.
    pub fn push_sent(&mut self, content: &str, ts: u64) {
        self.entries.push(LogEntry {
            kind: Direction::Sent,
            text: format!("me: {content}"),
            content: content.to_string(),
            ts,
        });
    }

    /// Record a message received from `sender`.
    pub fn push_recv(&mut self, sender: &str, content: &str, ts: u64) {
        self.entries.push(LogEntry {
            kind: Direction::Recv,
            text: format!("{sender}: {content}"),
            content: content.to_string(),
            ts,
        });
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_insertion_order() {
        let mut log = MessageLog::new();
        log.push_sent("first", 1);
        log.push_recv("w2", "second", 2);
        log.push_sent("third", 3);

        let kinds: Vec<Direction> = log.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![Direction::Sent, Direction::Recv, Direction::Sent]);
    }

    #[test]
    fn recv_text_names_the_sender() {
        let mut log = MessageLog::new();
        log.push_recv("w2", "Hi", 42);

        let entry = &log.entries()[0];
        assert!(entry.text.contains("w2"));
        assert!(entry.text.contains("Hi"));
        assert_eq!(entry.content, "Hi");
        assert_eq!(entry.ts, 42);
    }
}
